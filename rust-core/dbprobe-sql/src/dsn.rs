// SPDX-License-Identifier: PMPL-1.0-or-later
//! libpq-style connection strings.
//!
//! [`ConnectionString`] is the single source of connection parameters for
//! the Postgres-protocol builders. It renders the familiar
//! `key=value` DSN for display and diagnostics, and converts into a
//! [`tokio_postgres::Config`] for the actual connect so that no value ever
//! round-trips through string parsing.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use dbprobe_core::consts::SQL_CONNECT_TIMEOUT_SECS;
use dbprobe_core::{Credential, ProbeError, ServerNameCheck};

/// Database the Postgres builder connects to.
pub const DEFAULT_DBNAME: &str = "postgres";

// ---------------------------------------------------------------------------
// SslMode
// ---------------------------------------------------------------------------

/// libpq `sslmode` values.
///
/// Every encrypted mode checks the server certificate against the
/// certificate secret's CA. Only `verify-full` also requires the
/// certificate to name the dialled host; `require` and `verify-ca` accept
/// a pod-addressed server whose certificate lists only the service names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Disable,
    Allow,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }

    /// The opportunistic modes are not supported by the client; both become
    /// `require`.
    pub const fn normalized(self) -> Self {
        match self {
            SslMode::Allow | SslMode::Prefer => SslMode::Require,
            other => other,
        }
    }

    /// `true` when the connection must be encrypted.
    pub const fn requires_tls(self) -> bool {
        !matches!(self.normalized(), SslMode::Disable)
    }

    /// Host-name checking applied by the TLS connector.
    pub const fn server_name_check(self) -> ServerNameCheck {
        match self {
            SslMode::VerifyFull => ServerNameCheck::Verify,
            _ => ServerNameCheck::Skip,
        }
    }

    fn to_driver(self) -> tokio_postgres::config::SslMode {
        if self.requires_tls() {
            tokio_postgres::config::SslMode::Require
        } else {
            tokio_postgres::config::SslMode::Disable
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SslMode {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(ProbeError::Config(format!("unknown sslmode {other:?}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionString
// ---------------------------------------------------------------------------

/// Connection parameters for one Postgres-protocol endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub user: String,
    password: String,
    pub host: String,
    pub port: u16,
    pub connect_timeout_secs: u64,
    pub dbname: String,
    /// Always stored normalised.
    ssl_mode: SslMode,
}

impl ConnectionString {
    /// Parameters with a 10 second connect timeout and TLS disabled.
    pub fn new(
        credential: &Credential,
        host: impl Into<String>,
        port: u16,
        dbname: impl Into<String>,
    ) -> Self {
        Self {
            user: credential.username().to_string(),
            password: credential.password().to_string(),
            host: host.into(),
            port,
            connect_timeout_secs: SQL_CONNECT_TIMEOUT_SECS,
            dbname: dbname.into(),
            ssl_mode: SslMode::Disable,
        }
    }

    pub fn with_ssl_mode(mut self, mode: SslMode) -> Self {
        self.ssl_mode = mode.normalized();
        self
    }

    pub fn ssl_mode(&self) -> SslMode {
        self.ssl_mode
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// `host:port`, for logs and errors.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The full DSN, password included.
    pub fn to_dsn(&self) -> String {
        self.render(&self.password)
    }

    /// The DSN with the password masked.
    pub fn redacted(&self) -> String {
        self.render("********")
    }

    fn render(&self, password: &str) -> String {
        format!(
            "user={} password={} host={} port={} connect_timeout={} dbname={} sslmode={}",
            quote(&self.user),
            quote(password),
            quote(&self.host),
            self.port,
            self.connect_timeout_secs,
            quote(&self.dbname),
            self.ssl_mode,
        )
    }

    /// Driver configuration carrying the same parameters.
    pub fn to_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .user(&self.user)
            .password(&self.password)
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .connect_timeout(self.connect_timeout())
            .ssl_mode(self.ssl_mode.to_driver())
            .application_name("dbprobe");
        config
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("dbname", &self.dbname)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Quote a DSN value when libpq would otherwise split or misread it.
fn quote(value: &str) -> String {
    if !value.is_empty() && !value.contains(|c: char| c.is_whitespace() || c == '\'' || c == '\\')
    {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dsn() -> ConnectionString {
        ConnectionString::new(
            &Credential::new("postgres", "s3cret"),
            "pg-0.pg-pods.demo.svc",
            5432,
            DEFAULT_DBNAME,
        )
    }

    #[test]
    fn test_opportunistic_modes_become_require() {
        assert_eq!(SslMode::Prefer.normalized(), SslMode::Require);
        assert_eq!(SslMode::Allow.normalized(), SslMode::Require);
        assert_eq!(SslMode::VerifyFull.normalized(), SslMode::VerifyFull);
        assert_eq!(SslMode::Disable.normalized(), SslMode::Disable);
        assert!(SslMode::Prefer.requires_tls());
        assert!(!SslMode::Disable.requires_tls());
    }

    #[test]
    fn test_only_verify_full_checks_host_name() {
        assert_eq!(SslMode::VerifyFull.server_name_check(), ServerNameCheck::Verify);
        assert_eq!(SslMode::VerifyCa.server_name_check(), ServerNameCheck::Skip);
        assert_eq!(SslMode::Require.server_name_check(), ServerNameCheck::Skip);
    }

    #[test]
    fn test_parse_ssl_mode() {
        assert_eq!("verify-ca".parse::<SslMode>().unwrap(), SslMode::VerifyCa);
        assert_eq!(" Require ".parse::<SslMode>().unwrap(), SslMode::Require);
        assert!(matches!(
            "sometimes".parse::<SslMode>(),
            Err(ProbeError::Config(_))
        ));
    }

    #[test]
    fn test_dsn_layout() {
        let dsn = dsn().with_ssl_mode(SslMode::Prefer);
        assert_eq!(
            dsn.to_dsn(),
            "user=postgres password=s3cret host=pg-0.pg-pods.demo.svc port=5432 \
             connect_timeout=10 dbname=postgres sslmode=require"
        );
        assert_eq!(dsn.address(), "pg-0.pg-pods.demo.svc:5432");
    }

    #[test]
    fn test_password_never_shown() {
        let dsn = dsn();
        assert!(!format!("{dsn:?}").contains("s3cret"));
        assert!(!dsn.to_string().contains("s3cret"));
        assert!(dsn.redacted().contains("password=********"));
    }

    #[test]
    fn test_values_with_spaces_are_quoted() {
        let dsn = ConnectionString::new(&Credential::new("app", "it's a secret"), "h", 5432, "db");
        assert!(dsn.to_dsn().contains(r"password='it\'s a secret'"));
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_driver_config_matches() {
        let config = dsn().with_ssl_mode(SslMode::VerifyFull).to_config();
        assert_eq!(config.get_user(), Some("postgres"));
        assert_eq!(config.get_dbname(), Some("postgres"));
        assert_eq!(config.get_ports(), &[5432]);
        assert_eq!(config.get_connect_timeout(), Some(&Duration::from_secs(10)));
        assert_eq!(
            config.get_ssl_mode(),
            tokio_postgres::config::SslMode::Require
        );
    }
}

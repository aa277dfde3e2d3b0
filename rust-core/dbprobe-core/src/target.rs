// SPDX-License-Identifier: PMPL-1.0-or-later
//! Database identity and target-address resolution.
//!
//! Addresses follow the in-cluster naming convention
//! `{pod}.{governing-service}.{namespace}.svc[:port]` unless an explicit URL
//! overrides it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::secret::SecretRef;

/// URL scheme of an HTTP-speaking store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub const fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a client authenticates at the TLS layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAuthMode {
    /// Server authentication only; the client presents no certificate.
    #[default]
    Password,
    /// The client presents its certificate.
    Cert,
}

/// TLS settings for a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSpec {
    /// Secret holding `tls.crt`, `tls.key` and `ca.crt`.
    pub cert_secret: SecretRef,
    pub client_auth: ClientAuthMode,
}

/// Namespace-qualified database identity plus the settings builders read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRef {
    pub namespace: String,
    pub name: String,
    /// Headless service fronting the pods.
    pub governing_service: String,
    /// Client-facing service, for families addressed by service.
    pub service: String,
    pub port: u16,
    pub scheme: Scheme,
    pub security_enabled: bool,
    /// Secret holding `username`/`password`.
    pub auth_secret: Option<SecretRef>,
    pub tls: Option<TlsSpec>,
}

impl DatabaseRef {
    /// A reference with conventional service names (`{name}` for the
    /// client service, `{name}-pods` for the governing service) and
    /// security disabled.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, port: u16) -> Self {
        let name = name.into();
        Self {
            namespace: namespace.into(),
            governing_service: format!("{name}-pods"),
            service: name.clone(),
            name,
            port,
            scheme: Scheme::Http,
            security_enabled: false,
            auth_secret: None,
            tls: None,
        }
    }

    pub fn with_governing_service(mut self, service: impl Into<String>) -> Self {
        self.governing_service = service.into();
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Enable security, authenticating with the named secret in the
    /// database's namespace.
    pub fn with_auth_secret(mut self, secret_name: impl Into<String>) -> Self {
        self.security_enabled = true;
        self.auth_secret = Some(SecretRef::new(self.namespace.clone(), secret_name));
        self
    }

    pub fn with_security(mut self, enabled: bool) -> Self {
        self.security_enabled = enabled;
        self
    }

    /// Enable TLS with the named certificate secret; switches the scheme to
    /// `https`.
    pub fn with_tls(mut self, cert_secret: impl Into<String>, client_auth: ClientAuthMode) -> Self {
        self.scheme = Scheme::Https;
        self.tls = Some(TlsSpec {
            cert_secret: SecretRef::new(self.namespace.clone(), cert_secret),
            client_auth,
        });
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// `namespace/name`, for logs and errors.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// `{pod}.{governing-service}.{namespace}.svc`
    pub fn pod_host(&self, pod: &str) -> String {
        format!("{pod}.{}.{}.svc", self.governing_service, self.namespace)
    }

    /// `{service}.{namespace}.svc`
    pub fn service_host(&self) -> String {
        format!("{}.{}.svc", self.service, self.namespace)
    }

    /// Pod name of replica `ordinal`: `{name}-{ordinal}`.
    pub fn replica_pod(&self, ordinal: usize) -> String {
        format!("{}-{ordinal}", self.name)
    }

    /// Resolve the base URL for `endpoint`.
    pub fn base_url(&self, endpoint: &Endpoint) -> String {
        match endpoint {
            Endpoint::Pod(pod) => format!("{}://{}:{}", self.scheme, self.pod_host(pod), self.port),
            Endpoint::Service => format!("{}://{}:{}", self.scheme, self.service_host(), self.port),
            Endpoint::Url(url) => url.clone(),
        }
    }

    /// Resolve the bare host for `endpoint` (SQL families).
    pub fn host(&self, endpoint: &Endpoint) -> String {
        match endpoint {
            Endpoint::Pod(pod) => self.pod_host(pod),
            Endpoint::Service => self.service_host(),
            Endpoint::Url(host) => host.clone(),
        }
    }
}

/// Which address a builder should dial.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// A specific pod, through the governing service.
    Pod(String),
    /// The client-facing service.
    #[default]
    Service,
    /// An explicit address, used verbatim.
    Url(String),
}

impl Endpoint {
    /// Combine builder inputs: a pod wins over an explicit URL; with
    /// neither, the service address is used.
    pub fn select(pod: Option<&str>, url: Option<&str>) -> Self {
        match (pod, url) {
            (Some(pod), _) if !pod.is_empty() => Endpoint::Pod(pod.to_string()),
            (_, Some(url)) if !url.is_empty() => Endpoint::Url(url.to_string()),
            _ => Endpoint::Service,
        }
    }
}

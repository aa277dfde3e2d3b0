// SPDX-License-Identifier: PMPL-1.0-or-later
//! Well-known names shared across client families.
//!
//! Secret field names, readiness-marker locations, default ports, and
//! collection admin actions all live here so call sites never spell them
//! out as ad hoc literals.

use std::fmt;

// ---------------------------------------------------------------------------
// Secret fields
// ---------------------------------------------------------------------------

/// Keys read from credential and certificate secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretField {
    /// Basic-auth username.
    Username,
    /// Basic-auth password.
    Password,
    /// PEM certificate (chain) presented by the client.
    TlsCert,
    /// PEM private key for [`SecretField::TlsCert`].
    TlsKey,
    /// PEM CA bundle.
    CaCert,
}

impl SecretField {
    /// The key under which this field is stored.
    pub const fn key(self) -> &'static str {
        match self {
            SecretField::Username => "username",
            SecretField::Password => "password",
            SecretField::TlsCert => "tls.crt",
            SecretField::TlsKey => "tls.key",
            SecretField::CaCert => "ca.crt",
        }
    }
}

impl fmt::Display for SecretField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Readiness markers
// ---------------------------------------------------------------------------

/// Index holding the search-engine readiness marker.
pub const MARKER_INDEX: &str = "kubedb-system";
/// Document id of the search-engine readiness marker.
pub const MARKER_DOC_ID: &str = "info";
/// Mapping type emitted in V1 bulk headers.
pub const MARKER_DOC_TYPE: &str = "_doc";

/// Collection holding the collection-store readiness marker.
pub const MARKER_COLLECTION: &str = "kubedb-collection";
/// Document id of the collection-store readiness marker.
pub const MARKER_COLLECTION_DOC_ID: u32 = 1;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Search-engine REST port.
pub const SEARCH_REST_PORT: u16 = 9200;
/// Dashboard HTTP port.
pub const DASHBOARD_PORT: u16 = 5601;
/// Postgres port.
pub const POSTGRES_PORT: u16 = 5432;
/// PgBouncer default listening port.
pub const PGBOUNCER_PORT: u16 = 5432;
/// ProxySQL admin interface port.
pub const PROXYSQL_ADMIN_PORT: u16 = 6032;
/// Solr HTTP port.
pub const SOLR_PORT: u16 = 8983;
/// Broker REST proxy port.
pub const REST_PROXY_PORT: u16 = 8082;

/// Seconds passed as `connect_timeout` in relational connection strings.
pub const SQL_CONNECT_TIMEOUT_SECS: u64 = 10;

// ---------------------------------------------------------------------------
// Collection admin actions
// ---------------------------------------------------------------------------

/// Actions accepted by the collections admin endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionAction {
    ClusterStatus,
    List,
    Create,
    Backup,
    Restore,
    DeleteBackup,
    RequestStatus,
    DeleteStatus,
}

impl CollectionAction {
    /// Value of the `action` query parameter.
    pub const fn as_str(self) -> &'static str {
        match self {
            CollectionAction::ClusterStatus => "CLUSTERSTATUS",
            CollectionAction::List => "LIST",
            CollectionAction::Create => "CREATE",
            CollectionAction::Backup => "BACKUP",
            CollectionAction::Restore => "RESTORE",
            CollectionAction::DeleteBackup => "DELETEBACKUP",
            CollectionAction::RequestStatus => "REQUESTSTATUS",
            CollectionAction::DeleteStatus => "DELETESTATUS",
        }
    }
}

impl fmt::Display for CollectionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameter names used by the collections admin endpoint.
pub mod param {
    pub const ACTION: &str = "action";
    pub const NAME: &str = "name";
    pub const COLLECTION: &str = "collection";
    pub const LOCATION: &str = "location";
    pub const REPOSITORY: &str = "repository";
    pub const BACKUP_ID: &str = "backupId";
    pub const ASYNC: &str = "async";
    pub const REQUEST_ID: &str = "requestid";
    pub const PURGE_UNUSED: &str = "purgeUnused";
    pub const NUM_SHARDS: &str = "numShards";
    pub const REPLICATION_FACTOR: &str = "replicationFactor";
}

/// Suffixes appended to a collection name to form default async tokens.
pub mod token_suffix {
    pub const BACKUP: &str = "backup";
    pub const RESTORE: &str = "restore";
    pub const DELETE: &str = "delete";
    pub const PURGE: &str = "purge";
}

/// Collection health reported when every replica is active.
pub const COLLECTION_HEALTHY: &str = "GREEN";

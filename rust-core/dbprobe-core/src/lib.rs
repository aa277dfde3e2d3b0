// SPDX-License-Identifier: PMPL-1.0-or-later
//
// dbprobe core
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared building blocks for the dbprobe client builders: resolving
// credentials and TLS material from secrets, picking a protocol variant
// from an engine version, addressing pods and services, the write-then-read
// readiness protocol, and partial-failure tolerant replica fan-out.
//
// Protocol clients live in `dbprobe-http` (search engine, dashboard,
// collection store, broker REST proxy) and `dbprobe-sql` (Postgres,
// PgBouncer, ProxySQL). Nothing here performs network I/O except through
// the traits those crates implement.
//
// ## Usage
//
// ```
// use dbprobe_core::{resolve_variant, AuthPlugin, ProtocolVariant};
//
// let variant = resolve_variant(AuthPlugin::XPack, "8.11.1").unwrap();
// assert_eq!(variant, ProtocolVariant::V2);
// ```

pub mod config;
pub mod consts;
pub mod credential;
pub mod error;
pub mod fanout;
pub mod health;
pub mod secret;
pub mod target;
pub mod tls;
pub mod version;

pub use config::{TlsVersionCap, TransportConfig};
pub use consts::SecretField;
pub use credential::{resolve_credential, resolve_with_override, Credential};
pub use error::{BoxError, ProbeError, Result};
pub use fanout::{build_replicas, ReplicaClients, ReplicaFailure};
pub use health::{
    document_matches, evaluate_readiness, marker_document, marker_readiness, HealthResult,
    HealthStatus, ReadProbe, Readiness, WriteProbe,
};
pub use secret::{InMemorySecretStore, Secret, SecretRef, SecretStore};
pub use target::{ClientAuthMode, DatabaseRef, Endpoint, Scheme, TlsSpec};
pub use tls::{install_crypto_provider, resolve_tls_material, ServerNameCheck, TlsMaterial};
pub use version::{
    parse_version, resolve_variant, AuthPlugin, EngineVersion, ProtocolVariant, VARIANT_TABLE,
};

// SPDX-License-Identifier: PMPL-1.0-or-later
//
// dbprobe HTTP clients
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client builders and protocol clients for HTTP-speaking stores:
//
// - search engines (Elasticsearch, OpenSearch): eager health probe,
//   version-selected protocol variant, write/read readiness marker
// - dashboards (Kibana, OpenSearch-Dashboards): status parsing for two
//   payload schemas
// - collection stores (Solr): admin actions and the async action protocol
// - broker REST proxies (Kafka): broker listing
//
// Every client shares one `HttpTransport` implementation, and optional
// operations are expressed as separate capability traits.
//
// ## Usage
//
// ```no_run
// use dbprobe_core::{AuthPlugin, DatabaseRef, EngineVersion, InMemorySecretStore};
// use dbprobe_http::SearchClientBuilder;
//
// # async fn run() -> dbprobe_core::Result<()> {
// let store = InMemorySecretStore::new();
// let db = DatabaseRef::new("demo", "es-quickstart", 9200);
// let client = SearchClientBuilder::new(db, &store, EngineVersion::new("8.11.1", AuthPlugin::XPack))
//     .build()
//     .await?;
// let health = client.api().cluster_health().await?;
// println!("{} is {}", health.cluster_name, health.status);
// # Ok(())
// # }
// ```

pub mod capability;
pub mod dashboard;
pub mod restproxy;
pub mod search;
pub mod solr;
pub mod transport;

pub use capability::{
    ClusterHealth, ClusterStatus, CredentialSync, EnsureUserRole, ListBrokers, ListIndices,
    NodeStats, TotalDiskUsage,
};
pub use dashboard::{DashboardClient, DashboardClientBuilder};
pub use restproxy::{RestProxyClient, RestProxyClientBuilder};
pub use search::{SearchApi, SearchClient, SearchClientBuilder};
pub use solr::{SolrClient, SolrClientBuilder};
pub use transport::{HttpTransport, HttpTransportBuilder};

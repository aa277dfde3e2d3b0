// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Search-engine client builder.
//!
//! Stages run in order and the first failure stops the pipeline:
//! 1. target address (pod, explicit URL, or service)
//! 2. credential, when security is enabled
//! 3. TLS material, when the database has TLS configured
//! 4. protocol variant from the engine version
//! 5. transport, then an eager `GET /_cluster/health`
//!
//! A build that returns `Ok` has already talked to the cluster.

use reqwest::Method;
use tracing::{info, instrument, warn};

use dbprobe_core::{
    resolve_credential, resolve_tls_material, DatabaseRef, Endpoint, EngineVersion, ProbeError,
    ProtocolVariant, Result, SecretStore, TlsVersionCap, TransportConfig,
};

use super::api::CLUSTER_HEALTH_PATH;
use super::v1::SearchClientV1;
use super::v2::SearchClientV2;
use super::SearchClient;
use crate::transport::HttpTransport;

/// Builds a [`SearchClient`] for one database.
pub struct SearchClientBuilder<'a> {
    db: DatabaseRef,
    store: &'a dyn SecretStore,
    version: EngineVersion,
    pod: Option<String>,
    url: Option<String>,
    config: TransportConfig,
}

impl<'a> SearchClientBuilder<'a> {
    /// Transport defaults cap TLS at 1.2, which every supported engine
    /// line negotiates.
    pub fn new(db: DatabaseRef, store: &'a dyn SecretStore, version: EngineVersion) -> Self {
        Self {
            db,
            store,
            version,
            pod: None,
            url: None,
            config: TransportConfig::default().with_max_tls_version(TlsVersionCap::Tls12),
        }
    }

    /// Address one pod through the governing service. Wins over [`Self::url`].
    pub fn pod(mut self, pod: impl Into<String>) -> Self {
        self.pod = Some(pod.into());
        self
    }

    /// Use an explicit base URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    #[instrument(
        skip(self),
        fields(db = %self.db.qualified_name(), version = %self.version.version)
    )]
    pub async fn build(self) -> Result<SearchClient> {
        let endpoint = Endpoint::select(self.pod.as_deref(), self.url.as_deref());
        let base_url = self.db.base_url(&endpoint);
        let subject = self.db.qualified_name();

        let credential = resolve_credential(
            self.store,
            self.db.security_enabled,
            self.db.auth_secret.as_ref(),
            &subject,
        )
        .await?;

        let tls = match &self.db.tls {
            Some(spec) => Some(resolve_tls_material(self.store, &spec.cert_secret).await?),
            None => None,
        };

        let variant = self.version.variant()?;

        let mut transport = HttpTransport::builder(base_url.clone())
            .credential(credential)
            .config(self.config);
        if let Some(material) = tls {
            // The certificate secret is a client certificate; always offer it.
            transport = transport.tls(material, true);
        }
        let transport = transport.build()?;

        probe_cluster_health(&transport, &base_url).await?;

        info!(%variant, address = %base_url, "search client ready");
        Ok(match variant {
            ProtocolVariant::V1 => {
                SearchClient::V1(SearchClientV1::new(transport, self.version.auth_plugin))
            }
            ProtocolVariant::V2 => SearchClient::V2(SearchClientV2::new(transport)),
        })
    }
}

async fn probe_cluster_health(transport: &HttpTransport, target: &str) -> Result<()> {
    let failure = |reason: String| ProbeError::ConnectivityFailure {
        target: target.to_string(),
        reason,
    };
    let request = transport.request(Method::GET, CLUSTER_HEALTH_PATH)?;
    let response = transport
        .send("cluster health probe", request)
        .await
        .map_err(|e| failure(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        warn!(address = target, %status, "cluster health probe rejected");
        return Err(failure(format!("cluster health returned {status}")));
    }
    Ok(())
}

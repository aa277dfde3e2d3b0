// SPDX-License-Identifier: PMPL-1.0-or-later
//! Broker REST proxy (Kafka) client.
//!
//! The proxy is healthy when it can list at least one broker.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use dbprobe_core::{
    resolve_credential, resolve_tls_material, ClientAuthMode, DatabaseRef, Endpoint, ProbeError,
    Result, SecretStore, TransportConfig,
};

use crate::capability::ListBrokers;
use crate::transport::{decode_json, HttpTransport};

/// Broker listing endpoint.
pub const BROKERS_PATH: &str = "/brokers";

#[derive(Debug, Deserialize)]
struct BrokerList {
    brokers: Vec<i64>,
}

/// Builds a [`RestProxyClient`] addressed at the proxy service.
pub struct RestProxyClientBuilder<'a> {
    db: DatabaseRef,
    store: &'a dyn SecretStore,
    url: Option<String>,
    config: TransportConfig,
}

impl<'a> RestProxyClientBuilder<'a> {
    pub fn new(db: DatabaseRef, store: &'a dyn SecretStore) -> Self {
        Self {
            db,
            store,
            url: None,
            config: TransportConfig::default(),
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    #[instrument(skip(self), fields(db = %self.db.qualified_name()))]
    pub async fn build(self) -> Result<RestProxyClient> {
        let base_url = self.db.base_url(&Endpoint::select(None, self.url.as_deref()));

        let credential = resolve_credential(
            self.store,
            self.db.security_enabled,
            self.db.auth_secret.as_ref(),
            &self.db.qualified_name(),
        )
        .await?;

        let mut transport = HttpTransport::builder(base_url.clone())
            .credential(credential)
            .config(self.config)
            .accept_json();
        if let Some(spec) = &self.db.tls {
            let material = resolve_tls_material(self.store, &spec.cert_secret).await?;
            transport = transport.tls(material, spec.client_auth == ClientAuthMode::Cert);
        }

        info!(address = %base_url, "rest proxy client ready");
        Ok(RestProxyClient {
            transport: transport.build()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RestProxyClient {
    transport: HttpTransport,
}

impl RestProxyClient {
    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// `true` when the proxy lists at least one broker.
    pub async fn is_broker_available(&self) -> Result<bool> {
        let brokers = self.list_brokers().await?;
        if brokers.is_empty() {
            warn!("no brokers found to serve requests through the rest proxy");
        }
        Ok(!brokers.is_empty())
    }
}

#[async_trait]
impl ListBrokers for RestProxyClient {
    /// Anything but 200 is [`ProbeError::ReadRejected`].
    async fn list_brokers(&self) -> Result<Vec<i64>> {
        let request = self.transport.request(Method::GET, BROKERS_PATH)?;
        let response = self.transport.send("list brokers", request).await?;
        if response.status() != StatusCode::OK {
            return Err(ProbeError::ReadRejected {
                status: response.status().as_u16(),
            });
        }
        let list: BrokerList = decode_json("list brokers", response).await?;
        Ok(list.brokers)
    }
}

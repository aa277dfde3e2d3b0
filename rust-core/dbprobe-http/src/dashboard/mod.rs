// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Dashboard clients (Kibana and OpenSearch-Dashboards).
//!
//! Dashboards have no eager probe: building only resolves inputs and
//! constructs the transport. [`DashboardClient::check_health`] fetches
//! `/api/status` and folds it into a [`HealthResult`]; a dashboard that
//! cannot be reached is a result, not an error.

pub mod schema;

use reqwest::Method;
use tracing::{debug, info, instrument, warn};

use dbprobe_core::{
    resolve_credential, resolve_tls_material, DatabaseRef, Endpoint, EngineVersion, HealthResult,
    ProtocolVariant, Result, SecretStore, TlsVersionCap, TransportConfig,
};

use crate::transport::HttpTransport;

pub use schema::parse_status;

/// Dashboard status endpoint.
pub const STATUS_PATH: &str = "/api/status";

/// Builds a [`DashboardClient`].
///
/// `dashboard` supplies the address and TLS settings; `backend` is the
/// search database the dashboard fronts, whose auth secret authenticates
/// the client.
pub struct DashboardClientBuilder<'a> {
    dashboard: DatabaseRef,
    backend: DatabaseRef,
    store: &'a dyn SecretStore,
    version: EngineVersion,
    url: Option<String>,
    config: TransportConfig,
}

impl<'a> DashboardClientBuilder<'a> {
    pub fn new(
        dashboard: DatabaseRef,
        backend: DatabaseRef,
        store: &'a dyn SecretStore,
        version: EngineVersion,
    ) -> Self {
        Self {
            dashboard,
            backend,
            store,
            version,
            url: None,
            config: TransportConfig::default().with_max_tls_version(TlsVersionCap::Tls13),
        }
    }

    /// Use an explicit base URL instead of the service address.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    #[instrument(skip(self), fields(dashboard = %self.dashboard.qualified_name()))]
    pub async fn build(self) -> Result<DashboardClient> {
        let endpoint = Endpoint::select(None, self.url.as_deref());
        let base_url = self.dashboard.base_url(&endpoint);

        let credential = resolve_credential(
            self.store,
            self.backend.security_enabled,
            self.backend.auth_secret.as_ref(),
            &self.backend.qualified_name(),
        )
        .await?;

        let tls = match &self.dashboard.tls {
            Some(spec) => Some(resolve_tls_material(self.store, &spec.cert_secret).await?),
            None => None,
        };

        let variant = self.version.variant()?;

        let mut transport = HttpTransport::builder(base_url.clone())
            .credential(credential)
            .config(self.config)
            .accept_json();
        if let Some(material) = tls {
            // Same CA for the trust roots and the presented identity.
            transport = transport.tls(material, true);
        }
        let transport = transport.build()?;

        info!(%variant, address = %base_url, "dashboard client ready");
        Ok(DashboardClient { transport, variant })
    }
}

/// Client for one dashboard deployment.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    transport: HttpTransport,
    variant: ProtocolVariant,
}

impl DashboardClient {
    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Fetch and classify `/api/status`.
    ///
    /// Transport failures yield an `Unreachable` result with the error under
    /// the `connection` reason. The body is parsed whatever the status
    /// code: a degraded dashboard answers 503 with a full payload. A body
    /// that does not fit the schema is an error.
    pub async fn check_health(&self) -> Result<HealthResult> {
        let request = self.transport.request(Method::GET, STATUS_PATH)?;
        let response = match self.transport.send("dashboard status", request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "dashboard unreachable");
                return Ok(HealthResult::unreachable(e.to_string()));
            }
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "dashboard status body unreadable");
                return Ok(HealthResult::unreachable(e.to_string()));
            }
        };

        let result = schema::parse_status(self.variant, &body)?;
        debug!(
            %status,
            overall = result.overall.as_deref().unwrap_or_default(),
            failing = result.reasons.len(),
            "dashboard status parsed"
        );
        Ok(result)
    }
}

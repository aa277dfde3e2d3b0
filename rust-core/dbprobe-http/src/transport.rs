// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Shared HTTP transport for every HTTP-speaking store family.
//!
//! [`HttpTransport`] owns the base URL, the pooled `reqwest` client and the
//! basic-auth credential for one store. Family clients build requests
//! through it so timeouts, TLS and authentication are applied in one place.
//! The transport never retries; a failed call is reported once, wrapped with
//! the operation that issued it.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Certificate, Identity, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use dbprobe_core::{
    install_crypto_provider, Credential, ProbeError, Result, TlsMaterial, TlsVersionCap,
    TransportConfig,
};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and constructs an [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    base_url: String,
    credential: Credential,
    tls: Option<(TlsMaterial, bool)>,
    config: TransportConfig,
    accept_json: bool,
}

impl HttpTransportBuilder {
    /// Authenticate every request with `credential` (skipped when anonymous).
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Trust only the material's CA bundle; with `present_client_cert` the
    /// client certificate is offered as well.
    pub fn tls(mut self, material: TlsMaterial, present_client_cert: bool) -> Self {
        self.tls = Some((material, present_client_cert));
        self
    }

    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Send `Accept: application/json` on every request.
    pub fn accept_json(mut self) -> Self {
        self.accept_json = true;
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        install_crypto_provider();

        let base_url = Url::parse(&self.base_url)
            .map_err(|e| ProbeError::InvalidTarget(format!("{}: {e}", self.base_url)))?;

        let max_tls = match self.config.max_tls_version {
            TlsVersionCap::Tls12 => reqwest::tls::Version::TLS_1_2,
            TlsVersionCap::Tls13 => reqwest::tls::Version::TLS_1_3,
        };

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(self.config.connect_timeout())
            .pool_idle_timeout(self.config.idle_timeout())
            .timeout(self.config.request_timeout())
            .max_tls_version(max_tls)
            .danger_accept_invalid_certs(self.config.accept_invalid_certs);

        if self.accept_json {
            let mut headers = HeaderMap::new();
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
            builder = builder.default_headers(headers);
        }

        if let Some((material, present_client_cert)) = &self.tls {
            let invalid = |reason: String| ProbeError::CertificateInvalid {
                secret: material.source().to_string(),
                reason,
            };
            builder = builder.tls_built_in_root_certs(false);
            for cert in Certificate::from_pem_bundle(material.ca_pem())
                .map_err(|e| invalid(format!("CA bundle: {e}")))?
            {
                builder = builder.add_root_certificate(cert);
            }
            if *present_client_cert {
                let identity = Identity::from_pem(&material.identity_pem())
                    .map_err(|e| invalid(format!("client identity: {e}")))?;
                builder = builder.identity(identity);
            }
        }

        let http = builder
            .build()
            .map_err(|e| ProbeError::transport("build http client", e))?;

        debug!(
            base_url = %base_url,
            tls = self.tls.is_some(),
            authenticated = !self.credential.is_anonymous(),
            "http transport ready"
        );

        Ok(HttpTransport {
            base_url,
            http,
            credential: self.credential,
        })
    }
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// Base URL, pooled client and credential for one store.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    http: reqwest::Client,
    credential: Credential,
}

impl HttpTransport {
    pub fn builder(base_url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder {
            base_url: base_url.into(),
            credential: Credential::anonymous(),
            tls: None,
            config: TransportConfig::default(),
            accept_json: false,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ProbeError::InvalidTarget(format!("{}{path}: {e}", self.base_url)))
    }

    /// A request for `path` with authentication applied.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let builder = self.http.request(method, self.url(path)?);
        if self.credential.is_anonymous() {
            Ok(builder)
        } else {
            Ok(builder.basic_auth(self.credential.username(), Some(self.credential.password())))
        }
    }

    /// Send `request`, wrapping transport failures with `operation`.
    pub async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ProbeError::transport(operation, e))?;
        debug!(operation, status = %response.status(), url = %response.url(), "http response");
        Ok(response)
    }

    /// GET `path` and decode a successful JSON body.
    ///
    /// A 404 is [`ProbeError::NotFound`]; any other non-success status is
    /// [`ProbeError::ReadRejected`].
    pub async fn get_json<T: DeserializeOwned>(&self, operation: &'static str, path: &str) -> Result<T> {
        let response = self.send(operation, self.request(Method::GET, path)?).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(ProbeError::NotFound(path.to_string())),
            status if !status.is_success() => Err(ProbeError::ReadRejected {
                status: status.as_u16(),
            }),
            _ => decode_json(operation, response).await,
        }
    }
}

/// Read `response` as text and decode it as JSON.
pub async fn decode_json<T: DeserializeOwned>(operation: &'static str, response: Response) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ProbeError::transport(operation, e))?;
    serde_json::from_str(&body).map_err(|e| ProbeError::parse(operation, e.to_string()))
}

/// Best-effort body of an error response, as JSON when it parses.
pub async fn error_body(response: Response) -> serde_json::Value {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(text) => serde_json::from_str(&text)
            .unwrap_or_else(|_| serde_json::json!({ "status": status, "body": text })),
        Err(_) => serde_json::json!({ "status": status }),
    }
}

//! Kubernetes API Client
//!
//! Thin JSON client over the API server's REST surface. Only the calls paylink
//! needs are exposed: get an object and create an object.

use std::time::Duration;

use reqwest::{Certificate, Client, Identity, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::credentials::ClusterCredentials;
use crate::error::{ClusterError, Result};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Kubernetes REST client
#[derive(Clone)]
pub struct KubeClient {
    http: Client,
    server: String,
    token: Option<String>,
}

impl KubeClient {
    pub fn new(credentials: &ClusterCredentials) -> Result<Self> {
        Self::with_timeout(credentials, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(credentials: &ClusterCredentials, timeout: Duration) -> Result<Self> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .user_agent(concat!("paylink/", env!("CARGO_PKG_VERSION")));

        if let Some(ca_pem) = &credentials.ca_pem {
            for cert in Certificate::from_pem_bundle(ca_pem)? {
                builder = builder.add_root_certificate(cert);
            }
        }
        if let Some(identity_pem) = &credentials.identity_pem {
            builder = builder.identity(Identity::from_pem(identity_pem)?);
        }
        if credentials.insecure_skip_tls_verify {
            tracing::warn!(server = %credentials.server, "TLS verification disabled for cluster API");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            http: builder.build()?,
            server: credentials.server.trim_end_matches('/').to_string(),
            token: credentials.token.clone(),
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET an object at an API path such as `/apis/group/v1/things/name`
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.http.get(format!("{}{path}", self.server));
        let response = self.authorize(request).send().await?;
        Self::decode(response).await
    }

    /// POST a new object to a collection path; returns the created object
    pub async fn create<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self.http.post(format!("{}{path}", self.server)).json(body);
        let response = self.authorize(request).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        // The API server answers errors with a Status object
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(body);

        Err(ClusterError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

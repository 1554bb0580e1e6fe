//! HTTP client for the resource manager
//!
//! Talks to a REST endpoint that exposes service instances per namespace:
//! - `POST {server}/namespaces/{ns}/serviceinstances`
//! - `GET  {server}/namespaces/{ns}/serviceinstances/{name}`

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::client_traits::{
    CatalogResult, Parameters, ProvisionOptions, SecretKeyRef, ServiceCatalog, ServiceInstance,
};
use crate::error::CatalogError;

/// Connection settings for [`HttpCatalog`].
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the resource manager (e.g. "https://catalog.example.com/v1")
    pub server_url: String,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl CatalogConfig {
    /// Create a configuration for a specific server
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            user_agent: format!("svcat/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Load from `SVCAT_SERVER` (required) and `SVCAT_USER_AGENT` (optional).
    pub fn from_env() -> CatalogResult<Self> {
        let server_url = std::env::var("SVCAT_SERVER")
            .map_err(|_| CatalogError::Config("SVCAT_SERVER not set".to_string()))?;
        let mut config = Self::new(server_url);
        if let Ok(agent) = std::env::var("SVCAT_USER_AGENT") {
            config.user_agent = agent;
        }
        Ok(config)
    }

    /// Set a custom per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn instances_url(&self, namespace: &str) -> String {
        format!(
            "{}/namespaces/{}/serviceinstances",
            self.server_url.trim_end_matches('/'),
            namespace
        )
    }

    fn instance_url(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.instances_url(namespace), name)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionBody<'a> {
    name: &'a str,
    class_name: &'a str,
    plan_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_id: Option<&'a str>,
    parameters: &'a Parameters,
    secrets: &'a BTreeMap<String, SecretKeyRef>,
}

/// `ServiceCatalog` backed by the resource manager's REST API.
#[derive(Debug)]
pub struct HttpCatalog {
    config: CatalogConfig,
    http_client: reqwest::Client,
}

impl HttpCatalog {
    /// Create a new client
    pub fn new(config: CatalogConfig) -> CatalogResult<Self> {
        if config.server_url.is_empty() {
            return Err(CatalogError::Config("server URL is empty".to_string()));
        }
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()?;

        Ok(HttpCatalog {
            config,
            http_client,
        })
    }

    /// Create a client from environment variables
    pub fn from_env() -> CatalogResult<Self> {
        Self::new(CatalogConfig::from_env()?)
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }
}

async fn api_error(response: reqwest::Response) -> CatalogError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    CatalogError::Api { status, message }
}

#[async_trait]
impl ServiceCatalog for HttpCatalog {
    #[instrument(skip(self, options), fields(namespace = %options.namespace))]
    async fn provision(
        &self,
        instance_name: &str,
        class_name: &str,
        plan_name: &str,
        options: &ProvisionOptions,
    ) -> CatalogResult<ServiceInstance> {
        let body = ProvisionBody {
            name: instance_name,
            class_name,
            plan_name,
            external_id: options.external_id.as_deref(),
            parameters: &options.params,
            secrets: &options.secrets,
        };
        let url = self.config.instances_url(&options.namespace);
        debug!(%url, "sending provision request");

        let response = self.http_client.post(&url).json(&body).send().await?;
        match response.status() {
            s if s.is_success() => Ok(response.json::<ServiceInstance>().await?),
            StatusCode::CONFLICT => Err(CatalogError::AlreadyExists {
                namespace: options.namespace.clone(),
                name: instance_name.to_string(),
            }),
            _ => Err(api_error(response).await),
        }
    }

    #[instrument(skip(self))]
    async fn retrieve_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> CatalogResult<ServiceInstance> {
        let url = self.config.instance_url(namespace, name);
        let response = self.http_client.get(&url).send().await?;
        match response.status() {
            s if s.is_success() => Ok(response.json::<ServiceInstance>().await?),
            StatusCode::NOT_FOUND => Err(CatalogError::InstanceNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            _ => Err(api_error(response).await),
        }
    }
}

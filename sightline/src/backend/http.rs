//! Elasticsearch binding over HTTP

use super::{render, ClusterHealth, SearchBackend};
use crate::aggregation::SearchResponse;
use crate::config::BackendConfig;
use crate::error::{BackendError, Error};
use crate::query::CompiledRequest;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Talks to one or more cluster nodes, rotating between them per call.
pub struct HttpBackend {
    client: Client,
    endpoints: Vec<Url>,
    next: AtomicUsize,
    username: Option<String>,
    password: Option<String>,
}

impl HttpBackend {
    pub fn new(endpoints: Vec<Url>) -> Result<Self, BackendError> {
        Self::with_client(Client::new(), endpoints)
    }

    pub fn with_client(client: Client, endpoints: Vec<Url>) -> Result<Self, BackendError> {
        if endpoints.is_empty() {
            return Err(BackendError::NoEndpoint);
        }
        Ok(Self {
            client,
            endpoints,
            next: AtomicUsize::new(0),
            username: None,
            password: None,
        })
    }

    pub fn from_config(config: &BackendConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        let backend = Self::with_client(client, config.endpoint_urls()?)
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(match config.credentials() {
            Some((user, password)) => backend.with_basic_auth(user, password),
            None => backend,
        })
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<&str>) -> Self {
        self.username = Some(username.into());
        self.password = password.map(str::to_string);
        self
    }

    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    fn endpoint(&self) -> &Url {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[index]
    }

    /// Join `path` under the next endpoint, keeping any base path it carries
    fn url(&self, path: &str) -> Result<Url, BackendError> {
        let mut base = self.endpoint().clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path)
            .map_err(|e| BackendError::Other(format!("invalid request path '{}': {}", path, e)))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }
}

async fn error_status(response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    BackendError::Status { status, body }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn search(&self, request: &CompiledRequest) -> Result<SearchResponse, BackendError> {
        let mut url = self.url(&format!(
            "{}/{}/_search",
            request.partitions_path(),
            request.document_kind.type_name()
        ))?;
        url.set_query(Some("ignore_unavailable=true"));

        let body = render::search_body(request);
        tracing::debug!(url = %url, body = %body, "Submitting search");

        let response = self.authorize(self.client.post(url).json(&body)).send().await?;
        if !response.status().is_success() {
            return Err(error_status(response).await);
        }

        let bytes = response.bytes().await?;
        let parsed: SearchResponse = serde_json::from_slice(&bytes)?;
        tracing::debug!(took = parsed.took, total = parsed.total(), "Search completed");
        Ok(parsed)
    }

    async fn partition_exists(&self, partition: &str) -> Result<bool, BackendError> {
        let url = self.url(partition)?;
        let response = self.authorize(self.client.head(url)).send().await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(error_status(response).await),
        }
    }

    async fn cluster_health(&self) -> Result<ClusterHealth, BackendError> {
        let url = self.url("_cluster/health")?;
        let response = self.authorize(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(error_status(response).await);
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn name(&self) -> &str {
        "elasticsearch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(endpoints: &[&str]) -> HttpBackend {
        HttpBackend::new(endpoints.iter().map(|e| Url::parse(e).unwrap()).collect()).unwrap()
    }

    #[test]
    fn test_requires_an_endpoint() {
        assert!(matches!(
            HttpBackend::new(Vec::new()),
            Err(BackendError::NoEndpoint)
        ));
    }

    #[test]
    fn test_round_robin() {
        let backend = backend(&["http://es1:9200", "http://es2:9200"]);
        let hosts: Vec<_> = (0..4)
            .map(|_| backend.url("x").unwrap().host_str().unwrap().to_string())
            .collect();
        assert_eq!(hosts, vec!["es1", "es2", "es1", "es2"]);
    }

    #[test]
    fn test_base_path_is_kept() {
        let backend = backend(&["https://proxy.local/es"]);
        let url = backend.url("gravitee-*/request/_search").unwrap();
        assert_eq!(url.as_str(), "https://proxy.local/es/gravitee-*/request/_search");
    }

    #[test]
    fn test_from_config_parses_endpoints() {
        let config = BackendConfig {
            endpoints: vec!["ES.local".to_string(), "https://other:9443".to_string()],
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            ..BackendConfig::default()
        };
        let backend = HttpBackend::from_config(&config).unwrap();
        assert_eq!(backend.endpoints()[0].as_str(), "http://es.local:9200/");
        assert_eq!(backend.endpoints()[1].as_str(), "https://other:9443/");
        assert_eq!(backend.username.as_deref(), Some("admin"));
    }
}

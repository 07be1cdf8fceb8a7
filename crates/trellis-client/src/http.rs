//! reqwest implementation of the backend API

use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;
use trellis_core::{ComponentDescriptor, ComponentRole, WireGraph};

use crate::api::{ApiError, PipelineApi};
use crate::config::ClientConfig;

pub struct HttpPipelineApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpPipelineApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.api_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.api_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.api_url.clone()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| ApiError::Transport {
                url: config.api_url.clone(),
                source,
            })?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &Url) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!("GET {}", url);
        let response = self.send(self.client.get(url.clone()), &url).await?;
        response.json().await.map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PipelineApi for HttpPipelineApi {
    async fn fetch_graph(&self, pipeline_id: &str) -> Result<WireGraph, ApiError> {
        let url = self.endpoint(&["pipelines", pipeline_id, "graph"])?;
        self.get_json(url).await
    }

    async fn replace_graph(&self, pipeline_id: &str, graph: &WireGraph) -> Result<(), ApiError> {
        let url = self.endpoint(&["pipelines", pipeline_id, "graph"])?;
        debug!(
            "POST {} ({} nodes, {} edges)",
            url,
            graph.nodes.len(),
            graph.edges.len()
        );
        self.send(self.client.post(url.clone()).json(graph), &url).await?;
        Ok(())
    }

    async fn list_components(&self, role: ComponentRole) -> Result<Vec<ComponentDescriptor>, ApiError> {
        let mut url = self.endpoint(&["component"])?;
        url.query_pairs_mut().append_pair("type", role.as_str());
        self.get_json(url).await
    }

    async fn component_schema(&self, component_name: &str) -> Result<serde_json::Value, ApiError> {
        let url = self.endpoint(&["component", "schema", component_name])?;
        self.get_json(url).await
    }

    async fn component_ui_schema(&self, component_name: &str) -> Result<serde_json::Value, ApiError> {
        let url = self.endpoint(&["component", "ui-schema", component_name])?;
        self.get_json(url).await
    }

    fn name(&self) -> &str {
        "HTTP backend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(url: &str) -> HttpPipelineApi {
        let config = ClientConfig {
            api_url: url.to_string(),
            ..ClientConfig::default()
        };
        HttpPipelineApi::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let api = api("http://localhost:7890/api/");
        let url = api.endpoint(&["pipelines", "p 1", "graph"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:7890/api/pipelines/p%201/graph");
    }

    #[test]
    fn test_endpoint_without_base_path() {
        let api = api("http://localhost:7890");
        let url = api.endpoint(&["component", "schema", "otlp"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:7890/component/schema/otlp");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = ClientConfig {
            api_url: "not a url".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            HttpPipelineApi::new(&config),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}

//! reqwest implementation of [`JobBackend`].

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use reelsmith_core::defaults;
use reelsmith_core::{
    AnalyzeResponse, BrowseResponse, Error, GenerateResponse, GenerationRequest, JobBackend,
    ProgressReport, Result,
};

use crate::config::ClientConfig;

/// Backend reached over HTTP at `{base_url}/api/...`.
pub struct HttpBackend {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables (see [`ClientConfig::from_env`]).
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}{}/{}", self.config.base_url, defaults::API_PREFIX, name)
    }

    /// Read a reply body as JSON regardless of the HTTP status.
    ///
    /// The backend reports job errors as JSON with a non-2xx status, so the
    /// body wins; only a body that is not JSON at all is treated as a
    /// transport failure.
    async fn read_json(response: reqwest::Response) -> Result<JsonValue> {
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await?;

        match serde_json::from_str::<JsonValue>(&body) {
            Ok(value) => {
                if !status.is_success() {
                    tracing::debug!(%status, url = %url, "Backend returned JSON with error status");
                }
                Ok(value)
            }
            Err(_) => Err(Error::Request(format!(
                "Backend returned {} with non-JSON body: {}",
                status,
                body.chars().take(200).collect::<String>()
            ))),
        }
    }

    async fn post_json(&self, name: &str, body: &JsonValue) -> Result<JsonValue> {
        let url = self.endpoint(name);
        tracing::debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Request(format!("POST {} failed: {}", url, e)))?;
        Self::read_json(response).await
    }

    async fn post_empty(&self, name: &str) -> Result<JsonValue> {
        let url = self.endpoint(name);
        tracing::debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| Error::Request(format!("POST {} failed: {}", url, e)))?;
        Self::read_json(response).await
    }

    async fn get_json(&self, name: &str) -> Result<JsonValue> {
        let url = self.endpoint(name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Request(format!("GET {} failed: {}", url, e)))?;
        Self::read_json(response).await
    }

    /// Download the resource at `path` through the media endpoint.
    pub async fn fetch_media(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.media_url(path)?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Request(format!("GET media failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "Media endpoint returned {} for {}: {}",
                status, path, body
            )));
        }

        let bytes = response.bytes().await?;
        tracing::debug!(path, bytes = bytes.len(), "Fetched media");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl JobBackend for HttpBackend {
    async fn start_analysis(&self, folder_paths: &[String]) -> Result<AnalyzeResponse> {
        let value = self
            .post_json("analyze", &json!({ "folder_paths": folder_paths }))
            .await?;
        AnalyzeResponse::from_value(value)
    }

    async fn start_generation(&self, request: &GenerationRequest) -> Result<GenerateResponse> {
        let body = serde_json::to_value(request)?;
        let value = self.post_json("generate", &body).await?;
        GenerateResponse::from_value(value)
    }

    async fn progress(&self) -> Result<ProgressReport> {
        let value = self.get_json("progress").await?;
        serde_json::from_value(value)
            .map_err(|e| Error::Serialization(format!("Invalid progress reply: {}", e)))
    }

    async fn browse_folder(&self) -> Result<Option<String>> {
        let value = self.post_empty("browse").await?;
        let reply: BrowseResponse = serde_json::from_value(value)?;
        Ok(reply.into_path())
    }

    async fn browse_file(&self) -> Result<Option<String>> {
        let value = self.post_empty("browse_file").await?;
        let reply: BrowseResponse = serde_json::from_value(value)?;
        Ok(reply.into_path())
    }

    fn media_url(&self, path: &str) -> Result<String> {
        let url = reqwest::Url::parse_with_params(&self.endpoint("image"), &[("path", path)])
            .map_err(|e| Error::Config(format!("Invalid backend URL: {}", e)))?;
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HttpBackend {
        HttpBackend::new(ClientConfig::default().with_base_url("http://localhost:8000/")).unwrap()
    }

    #[test]
    fn test_endpoint_layout() {
        let backend = backend();
        assert_eq!(backend.endpoint("analyze"), "http://localhost:8000/api/analyze");
        assert_eq!(backend.endpoint("browse_file"), "http://localhost:8000/api/browse_file");
    }

    #[test]
    fn test_media_url_encodes_path() {
        let url = backend().media_url("/photos/summer trip/a&b.jpg").unwrap();
        assert_eq!(
            url,
            "http://localhost:8000/api/image?path=%2Fphotos%2Fsummer+trip%2Fa%26b.jpg"
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = HttpBackend::new(ClientConfig::default().with_base_url("localhost"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

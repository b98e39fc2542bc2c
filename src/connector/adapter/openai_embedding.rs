use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::application::EmbeddingProvider;
use crate::domain::{DomainError, EmbeddingConfig};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const EMBEDDINGS_PATH: &str = "/v1/embeddings";
/// Default model matches the configured 1536-dimension default.
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

/// HTTP client for an OpenAI-compatible embeddings API.
///
/// Implements [`EmbeddingProvider`] so handlers stay decoupled from transport
/// and serialization details. Every request is bounded by the configured
/// timeout; timeouts and error responses surface as `EmbeddingUnavailable`.
///
/// Environment overrides:
///
/// ```text
/// OPENAI_BASE_URL=https://api.openai.com
/// OPENAI_API_KEY=sk-...
/// EMBEDDING_MODEL=text-embedding-3-small
/// EMBEDDING_DIMENSIONS=1536
/// EMBED_TIMEOUT_SECS=30
/// ```
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    api_key: String,
    config: EmbeddingConfig,
    /// Full endpoint URL (base + EMBEDDINGS_PATH).
    url: String,
}

impl OpenAiEmbedding {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        config: EmbeddingConfig,
        timeout: Duration,
    ) -> Self {
        let base: String = base_url.into();
        let url = format!("{}{EMBEDDINGS_PATH}", base.trim_end_matches('/'));
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            config,
            url,
        }
    }

    /// Construct from environment variables.
    ///
    /// | Variable               | Default                    | Purpose               |
    /// |------------------------|----------------------------|-----------------------|
    /// | `OPENAI_API_KEY`       | — (required)               | API credential        |
    /// | `OPENAI_BASE_URL`      | `https://api.openai.com`   | compatible endpoint   |
    /// | `EMBEDDING_MODEL`      | `text-embedding-3-small`   | model identifier      |
    /// | `EMBEDDING_DIMENSIONS` | `1536`                     | fixed vector size     |
    /// | `EMBED_TIMEOUT_SECS`   | `30`                       | per-request timeout   |
    pub fn from_env() -> Result<Self, DomainError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            DomainError::internal("Missing required environment variable OPENAI_API_KEY")
        })?;
        let base = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model =
            std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let dimensions = read_env_number("EMBEDDING_DIMENSIONS", DEFAULT_DIMENSIONS);
        let timeout_secs = read_env_number("EMBED_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);

        Ok(Self::new(
            api_key,
            base,
            EmbeddingConfig::new(model, dimensions),
            Duration::from_secs(timeout_secs),
        ))
    }
}

fn read_env_number<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {key}={value}");
            default
        }),
        Err(_) => default,
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::embedding_unavailable(
                "refusing to embed empty text",
            ));
        }

        let request = ApiRequest {
            model: &self.config.model,
            input: text,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DomainError::embedding_unavailable(format!("request timed out: {e}"))
                } else {
                    DomainError::embedding_unavailable(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Embeddings API returned {status}: {body}");
            return Err(DomainError::embedding_unavailable(format!(
                "API returned {status}"
            )));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            DomainError::embedding_unavailable(format!("failed to parse response: {e}"))
        })?;

        let vector = api_response
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| {
                DomainError::embedding_unavailable("API returned no embedding data")
            })?;

        if vector.len() != self.config.dimensions {
            return Err(DomainError::embedding_unavailable(format!(
                "expected {} dimensions, got {}",
                self.config.dimensions,
                vector.len()
            )));
        }

        debug!(
            "Embedded {} chars with {} ({} dimensions)",
            text.len(),
            self.config.model,
            vector.len()
        );

        Ok(vector)
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> OpenAiEmbedding {
        OpenAiEmbedding::new(
            "test-key",
            "http://localhost:9",
            EmbeddingConfig::new("test-model", 4),
            Duration::from_millis(200),
        )
    }

    #[test]
    fn endpoint_url_is_joined_without_double_slash() {
        let svc = OpenAiEmbedding::new(
            "k",
            "https://api.openai.com/",
            EmbeddingConfig::default(),
            Duration::from_secs(1),
        );
        assert_eq!(svc.url, "https://api.openai.com/v1/embeddings");
    }

    #[tokio::test]
    async fn blank_text_fails_before_any_request() {
        let err = service().embed(" \n ").await.expect_err("blank should fail");
        assert!(err.is_embedding_unavailable());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_embedding_unavailable() {
        let err = service()
            .embed("coffee")
            .await
            .expect_err("nothing listens on port 9");
        assert!(err.is_embedding_unavailable());
    }
}

use async_trait::async_trait;

use crate::domain::{DomainError, EmbeddingConfig};

/// Generates fixed-dimension vector embeddings from free text.
///
/// `embed` fails explicitly (blank input, provider error, timeout, dimension
/// mismatch); it never substitutes a default vector. `maybe_embed` is the
/// skip-on-absent variant used by write paths: absent or whitespace-only text
/// produces `Ok(None)` without touching the provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    async fn maybe_embed(&self, text: Option<&str>) -> Result<Option<Vec<f32>>, DomainError> {
        match text.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Ok(Some(self.embed(value).await?)),
            None => Ok(None),
        }
    }

    fn config(&self) -> &EmbeddingConfig;
}

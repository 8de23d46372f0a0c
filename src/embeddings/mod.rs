// Embeddings module
// The embedding service contract plus the resume text policy shared by indexing and repair

pub mod ollama;
pub mod text;

use async_trait::async_trait;

pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, ModelInfo, OllamaClient};
pub use text::resume_embedding_text;

/// Turns text into a fixed-length vector.
///
/// Implementations must be deterministic for identical input and must return
/// [`crate::TalentError::Embedding`] instead of an empty vector when the input
/// is empty or the service cannot produce one.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> crate::Result<Vec<f32>>;
}

/// Checks a freshly produced vector before it is stored or used for scoring
#[inline]
pub fn validate_embedding(embedding: &[f32], expected_dimension: usize) -> crate::Result<()> {
    if embedding.is_empty() {
        return Err(crate::TalentError::Embedding(
            "embedding service returned an empty vector".to_string(),
        ));
    }

    if embedding.len() != expected_dimension {
        return Err(crate::TalentError::Embedding(format!(
            "expected {} dimensions, got {}",
            expected_dimension,
            embedding.len()
        )));
    }

    if embedding.iter().any(|value| !value.is_finite()) {
        return Err(crate::TalentError::Embedding(
            "embedding contains non-finite values".to_string(),
        ));
    }

    Ok(())
}

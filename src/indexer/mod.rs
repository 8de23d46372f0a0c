// Indexer module
// Write path for resumes: embeds each record and keeps the store consistent

pub mod consistency;


use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::TalentError;
use crate::config::Config;
use crate::database::sqlite::Database;
use crate::database::sqlite::models::{NewResume, Resume};
use crate::embeddings::{Embedder, OllamaClient, resume_embedding_text, validate_embedding};

pub use consistency::{ConsistencyReport, ConsistencyVerifier};

/// What happened to a resume handed to [`Indexer::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOutcome {
    pub id: i64,
    /// False when the record was stored without an embedding and awaits repair
    pub indexed: bool,
}

/// Stores resumes together with their embeddings
#[derive(Clone)]
pub struct Indexer {
    database: Database,
    embedder: Arc<dyn Embedder>,
    expected_dimension: usize,
}

impl Indexer {
    #[inline]
    pub fn new(database: Database, embedder: Arc<dyn Embedder>, expected_dimension: usize) -> Self {
        Self {
            database,
            embedder,
            expected_dimension,
        }
    }

    /// Open the configured store and embedding service
    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        let database = Database::initialize_from_config_dir(config.get_base_dir())
            .await
            .context("Failed to initialize resume database")?;
        let embedder =
            OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;

        Ok(Self::new(
            database,
            Arc::new(embedder),
            config.embedding_dimension(),
        ))
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    #[inline]
    pub fn verifier(&self) -> ConsistencyVerifier {
        ConsistencyVerifier::new(
            self.database.clone(),
            Arc::clone(&self.embedder),
            self.expected_dimension,
        )
    }

    /// Insert or overwrite a resume by name.
    ///
    /// When the embedding cannot be produced the new fields are still stored,
    /// with an explicit NULL embedding, so no stale vector survives the write.
    pub async fn upsert(&self, resume: &NewResume) -> crate::Result<IndexOutcome> {
        let name = resume.name.trim();
        if name.is_empty() {
            return Err(TalentError::InvalidResume(
                "name cannot be empty".to_string(),
            ));
        }

        let text = resume_embedding_text(resume);
        let embedding = match self.embed_checked(&text).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(
                    "Storing resume {:?} without an embedding, repair will retry: {}",
                    name, e
                );
                None
            }
        };

        let id = self
            .database
            .upsert_resume(resume, embedding.as_deref())
            .await?;

        let outcome = IndexOutcome {
            id,
            indexed: embedding.is_some(),
        };
        info!(
            "Stored resume {} ({}), indexed: {}",
            outcome.id, name, outcome.indexed
        );
        Ok(outcome)
    }

    async fn embed_checked(&self, text: &str) -> crate::Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(TalentError::Embedding(
                "resume has no text to embed".to_string(),
            ));
        }

        let embedding = self.embedder.embed(text).await?;
        validate_embedding(&embedding, self.expected_dimension)?;
        debug!("Generated {}-dimensional embedding", embedding.len());
        Ok(embedding)
    }

    #[inline]
    pub async fn get(&self, id: i64) -> crate::Result<Resume> {
        self.database
            .get_resume(id)
            .await?
            .ok_or(TalentError::NotFound(id))
    }

    #[inline]
    pub async fn list(&self) -> crate::Result<Vec<Resume>> {
        Ok(self.database.list_resumes().await?)
    }

    /// Resumes that are stored but have no embedding yet
    #[inline]
    pub async fn pending_resumes(&self) -> crate::Result<Vec<Resume>> {
        Ok(self.database.list_unindexed_resumes().await?)
    }

    /// Remove every resume and reclaim the freed pages; returns how many were deleted
    #[inline]
    pub async fn delete_all(&self) -> crate::Result<u64> {
        let deleted = self.database.delete_all_resumes().await?;
        if deleted > 0 {
            self.database.optimize().await?;
        }
        Ok(deleted)
    }

    #[inline]
    pub async fn repair(&self) -> crate::Result<usize> {
        self.verifier().repair().await
    }

    #[inline]
    pub async fn verify(&self) -> crate::Result<ConsistencyReport> {
        self.verifier().verify().await
    }
}

// Consistency verification module
// Finds resumes that cannot take part in ranking and re-embeds them


use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::database::sqlite::Database;
use crate::database::sqlite::models::{Resume, StoredEmbedding};
use crate::embeddings::{Embedder, resume_embedding_text, validate_embedding};

/// Result of inspecting every stored resume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Number of stored resumes
    pub total_resumes: usize,
    /// Resumes with a usable vector of the configured dimension
    pub indexed_resumes: usize,
    /// Ids of resumes with no embedding at all
    pub missing_embeddings: Vec<i64>,
    /// Ids of resumes whose stored vector is unreadable or has the wrong length
    pub malformed_embeddings: Vec<i64>,
    pub is_consistent: bool,
}

impl ConsistencyReport {
    fn from_resumes(resumes: &[Resume], expected_dimension: usize) -> Self {
        let mut missing_embeddings = Vec::new();
        let mut malformed_embeddings = Vec::new();

        for resume in resumes {
            match &resume.embedding {
                StoredEmbedding::Missing => missing_embeddings.push(resume.id),
                StoredEmbedding::Malformed(_) => malformed_embeddings.push(resume.id),
                StoredEmbedding::Present(vector) if vector.len() != expected_dimension => {
                    malformed_embeddings.push(resume.id)
                }
                StoredEmbedding::Present(_) => {}
            }
        }

        let is_consistent = missing_embeddings.is_empty() && malformed_embeddings.is_empty();

        Self {
            total_resumes: resumes.len(),
            indexed_resumes: resumes.len() - missing_embeddings.len() - malformed_embeddings.len(),
            missing_embeddings,
            malformed_embeddings,
            is_consistent,
        }
    }

    /// Get a human-readable summary of the consistency report
    #[inline]
    pub fn summary(&self) -> String {
        if self.is_consistent {
            format!(
                "Index is consistent: {} of {} resumes indexed",
                self.indexed_resumes, self.total_resumes
            )
        } else {
            format!(
                "Index inconsistencies found: {} missing embeddings, {} malformed embeddings ({} of {} resumes indexed)",
                self.missing_embeddings.len(),
                self.malformed_embeddings.len(),
                self.indexed_resumes,
                self.total_resumes
            )
        }
    }

    #[inline]
    pub fn total_issues(&self) -> usize {
        self.missing_embeddings.len() + self.malformed_embeddings.len()
    }
}

/// Scans the store for resumes without a usable embedding and repairs them
#[derive(Clone)]
pub struct ConsistencyVerifier {
    database: Database,
    embedder: Arc<dyn Embedder>,
    expected_dimension: usize,
}

impl ConsistencyVerifier {
    #[inline]
    pub fn new(database: Database, embedder: Arc<dyn Embedder>, expected_dimension: usize) -> Self {
        Self {
            database,
            embedder,
            expected_dimension,
        }
    }

    /// Inspect the store without changing it
    pub async fn verify(&self) -> crate::Result<ConsistencyReport> {
        info!("Verifying resume index consistency");

        let resumes = self.database.list_resumes().await?;
        let report = ConsistencyReport::from_resumes(&resumes, self.expected_dimension);

        if report.is_consistent {
            info!("{}", report.summary());
        } else {
            warn!("{}", report.summary());
            if !report.missing_embeddings.is_empty() {
                debug!("Missing embeddings: {:?}", report.missing_embeddings);
            }
            if !report.malformed_embeddings.is_empty() {
                debug!("Malformed embeddings: {:?}", report.malformed_embeddings);
            }
        }

        Ok(report)
    }

    /// Re-embed every resume that is not index-ready; returns how many were fixed
    #[inline]
    pub async fn repair(&self) -> crate::Result<usize> {
        self.repair_with_progress(|_, _| {}).await
    }

    /// Same as [`repair`](Self::repair), reporting `(processed, total)` after each resume
    pub async fn repair_with_progress<F>(&self, mut on_progress: F) -> crate::Result<usize>
    where
        F: FnMut(usize, usize) + Send,
    {
        let broken: Vec<Resume> = self
            .database
            .list_resumes()
            .await?
            .into_iter()
            .filter(|resume| !resume.is_index_ready(self.expected_dimension))
            .collect();

        if broken.is_empty() {
            debug!("No resumes need repair");
            return Ok(0);
        }

        info!("Repairing embeddings for {} resumes", broken.len());

        let total = broken.len();
        let mut repaired = 0;
        for (position, resume) in broken.iter().enumerate() {
            match self.repair_one(resume).await {
                Ok(RepairOutcome::Repaired) => {
                    repaired += 1;
                    debug!("Repaired embedding for resume {} ({})", resume.id, resume.name);
                }
                Ok(RepairOutcome::Superseded) => {
                    debug!(
                        "Resume {} changed while repairing, leaving it to the newer write",
                        resume.id
                    );
                }
                Ok(RepairOutcome::NoText) => {
                    debug!("Resume {} has no text to embed, skipping", resume.id);
                }
                Err(e) => {
                    error!("Failed to repair embedding for resume {}: {}", resume.id, e);
                }
            }
            on_progress(position + 1, total);
        }

        info!("Repaired {} of {} resumes", repaired, total);
        Ok(repaired)
    }

    async fn repair_one(&self, resume: &Resume) -> crate::Result<RepairOutcome> {
        let text = resume_embedding_text(&resume.to_new_resume());
        if text.trim().is_empty() {
            return Ok(RepairOutcome::NoText);
        }

        let embedding = self.embedder.embed(&text).await?;
        validate_embedding(&embedding, self.expected_dimension)?;

        let written = self
            .database
            .set_embedding(resume.id, &embedding, resume.updated_at)
            .await?;
        Ok(if written {
            RepairOutcome::Repaired
        } else {
            RepairOutcome::Superseded
        })
    }
}

enum RepairOutcome {
    Repaired,
    /// A newer write replaced the record after it was read
    Superseded,
    /// Name-only record; stays unindexed until it gains content
    NoText,
}

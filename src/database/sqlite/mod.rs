use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};


pub mod models;
pub mod queries;

pub use models::{
    CandidateStatistics, Distribution, NewResume, Resume, ResumeRow, StoredEmbedding,
};
pub use queries::*;

pub type DbPool = Pool<Sqlite>;

/// Durable store of resumes and their embedding vectors
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    pub async fn initialize_from_config_dir(config_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Self::new(config_dir.join("resumes.db")).await
    }

    /// Insert or overwrite by name; returns the stable id
    pub async fn upsert_resume(&self, resume: &NewResume, embedding: Option<&[f32]>) -> Result<i64> {
        ResumeQueries::upsert(&self.pool, resume, embedding).await
    }

    pub async fn get_resume(&self, id: i64) -> Result<Option<Resume>> {
        ResumeQueries::get_by_id(&self.pool, id).await
    }

    pub async fn get_resume_by_name(&self, name: &str) -> Result<Option<Resume>> {
        ResumeQueries::get_by_name(&self.pool, name).await
    }

    pub async fn list_resumes(&self) -> Result<Vec<Resume>> {
        ResumeQueries::list_all(&self.pool).await
    }

    pub async fn get_resumes_by_ids(&self, ids: &[i64]) -> Result<Vec<Resume>> {
        ResumeQueries::list_by_ids(&self.pool, ids).await
    }

    pub async fn list_unindexed_resumes(&self) -> Result<Vec<Resume>> {
        ResumeQueries::list_unindexed(&self.pool).await
    }

    pub async fn set_embedding(
        &self,
        id: i64,
        embedding: &[f32],
        expected_updated_at: NaiveDateTime,
    ) -> Result<bool> {
        ResumeQueries::set_embedding(&self.pool, id, embedding, expected_updated_at).await
    }

    /// Remove every resume. Ids are never handed out again.
    pub async fn delete_all_resumes(&self) -> Result<u64> {
        let deleted = ResumeQueries::delete_all(&self.pool).await?;
        warn!("Deleted all {} resumes", deleted);
        Ok(deleted)
    }

    pub async fn count_resumes(&self) -> Result<i64> {
        ResumeQueries::count(&self.pool).await
    }

    pub async fn statistics(&self, expected_dimension: usize) -> Result<CandidateStatistics> {
        let resumes = self.list_resumes().await?;
        Ok(CandidateStatistics::from_resumes(&resumes, expected_dimension))
    }

    /// Optimize database performance by running VACUUM and ANALYZE
    pub async fn optimize(&self) -> Result<()> {
        info!("Optimizing database performance");

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .context("Failed to vacuum database")?;

        sqlx::query("ANALYZE")
            .execute(&self.pool)
            .await
            .context("Failed to analyze database")?;

        debug!("Database optimization completed");
        Ok(())
    }
}

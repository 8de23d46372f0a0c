
use super::models::*;
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use itertools::Itertools;
use sqlx::SqlitePool;
use tracing::debug;

const RESUME_COLUMNS: &str = "id, name, skills, experience, education, contact, summary, embedding, created_at, updated_at";

pub struct ResumeQueries;

impl ResumeQueries {
    /// Insert a resume, or overwrite the one with the same name, in one statement.
    ///
    /// `created_at` is only written on insert. A `None` embedding is stored as
    /// NULL so a previous vector never survives a change of text.
    #[inline]
    pub async fn upsert(
        pool: &SqlitePool,
        resume: &NewResume,
        embedding: Option<&[f32]>,
    ) -> Result<i64> {
        let now = Utc::now().naive_utc();
        let skills = serde_json::to_string(&resume.skills).context("Failed to encode skills")?;
        let contact = serde_json::to_string(&resume.contact).context("Failed to encode contact")?;
        let embedding = embedding
            .map(|vector| serde_json::to_string(vector))
            .transpose()
            .context("Failed to encode embedding")?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO resumes (name, skills, experience, education, contact, summary, embedding, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                skills = excluded.skills,
                experience = excluded.experience,
                education = excluded.education,
                contact = excluded.contact,
                summary = excluded.summary,
                embedding = excluded.embedding,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(&resume.name)
        .bind(skills)
        .bind(resume.experience.as_deref())
        .bind(resume.education.as_deref())
        .bind(contact)
        .bind(resume.summary.as_deref())
        .bind(embedding)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to upsert resume {}", resume.name))?;

        debug!("Upserted resume {} as id {}", resume.name, id);
        Ok(id)
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Resume>> {
        let row = sqlx::query_as::<_, ResumeRow>(&format!(
            "SELECT {RESUME_COLUMNS} FROM resumes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get resume by id")?;

        Ok(row.map(Resume::from))
    }

    #[inline]
    pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Resume>> {
        let row = sqlx::query_as::<_, ResumeRow>(&format!(
            "SELECT {RESUME_COLUMNS} FROM resumes WHERE name = ?"
        ))
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get resume by name")?;

        Ok(row.map(Resume::from))
    }

    /// Every resume in insertion order, indexed or not
    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Resume>> {
        let rows = sqlx::query_as::<_, ResumeRow>(&format!(
            "SELECT {RESUME_COLUMNS} FROM resumes ORDER BY id ASC"
        ))
        .fetch_all(pool)
        .await
        .context("Failed to list resumes")?;

        Ok(rows.into_iter().map(Resume::from).collect())
    }

    #[inline]
    pub async fn list_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Resume>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = std::iter::repeat_n("?", ids.len()).join(", ");
        let query_str = format!("SELECT {RESUME_COLUMNS} FROM resumes WHERE id IN ({placeholders})");

        let mut query = sqlx::query_as::<_, ResumeRow>(&query_str);
        for id in ids {
            query = query.bind(*id);
        }

        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to list resumes by ids")?;

        Ok(rows.into_iter().map(Resume::from).collect())
    }

    /// Resumes whose embedding column is NULL or empty
    #[inline]
    pub async fn list_unindexed(pool: &SqlitePool) -> Result<Vec<Resume>> {
        let rows = sqlx::query_as::<_, ResumeRow>(&format!(
            "SELECT {RESUME_COLUMNS} FROM resumes WHERE embedding IS NULL OR embedding = '' ORDER BY id ASC"
        ))
        .fetch_all(pool)
        .await
        .context("Failed to list unindexed resumes")?;

        Ok(rows.into_iter().map(Resume::from).collect())
    }

    /// Write back a vector for an existing resume without touching other fields.
    ///
    /// The write only lands if the row still carries `expected_updated_at`, so a
    /// vector computed from old text never overwrites a newer submission.
    #[inline]
    pub async fn set_embedding(
        pool: &SqlitePool,
        id: i64,
        embedding: &[f32],
        expected_updated_at: NaiveDateTime,
    ) -> Result<bool> {
        let encoded = serde_json::to_string(embedding).context("Failed to encode embedding")?;

        let result = sqlx::query("UPDATE resumes SET embedding = ? WHERE id = ? AND updated_at = ?")
            .bind(encoded)
            .bind(id)
            .bind(expected_updated_at)
            .execute(pool)
            .await
            .context("Failed to update resume embedding")?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn delete_all(pool: &SqlitePool) -> Result<u64> {
        let result = sqlx::query("DELETE FROM resumes")
            .execute(pool)
            .await
            .context("Failed to delete resumes")?;

        Ok(result.rows_affected())
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM resumes")
            .fetch_one(pool)
            .await
            .context("Failed to count resumes")
    }
}

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::TalentError;
use crate::database::sqlite::models::{Resume, StoredEmbedding};

/// Added when a query keyword occurs in the joined skills
pub const SKILL_MATCH_BOOST: f64 = 0.1;
/// Added when a query keyword occurs in the summary
pub const SUMMARY_MATCH_BOOST: f64 = 0.1;

/// One search hit with the fields needed to display it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub record_id: i64,
    /// Cosine similarity plus keyword boosts; may exceed 1.0
    pub score: f64,
    pub name: String,
    pub skills: Vec<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub contact: BTreeMap<String, String>,
    pub summary: Option<String>,
}

impl RankedCandidate {
    fn from_resume(resume: &Resume, score: f64) -> Self {
        Self {
            record_id: resume.id,
            score,
            name: resume.name.clone(),
            skills: resume.skills.clone(),
            experience: resume.experience.clone(),
            education: resume.education.clone(),
            contact: resume.contact.clone(),
            summary: resume.summary.clone(),
        }
    }
}

/// Optional constraints a candidate must satisfy to be ranked at all
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Case-insensitive substring of the contact `location`
    pub location: Option<String>,
    /// Lower bound on the leading number of the experience text
    pub min_experience_years: Option<f64>,
}

impl SearchFilters {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.min_experience_years.is_none()
    }

    #[inline]
    pub fn matches(&self, resume: &Resume) -> bool {
        if let Some(wanted) = self.location.as_deref() {
            let wanted = wanted.trim().to_lowercase();
            let found = resume
                .location()
                .is_some_and(|location| location.to_lowercase().contains(&wanted));
            if !found {
                return false;
            }
        }

        if let Some(min_years) = self.min_experience_years {
            if !resume
                .experience_years()
                .is_some_and(|years| years >= min_years)
            {
                return false;
            }
        }

        true
    }
}

/// Cosine similarity, or `None` when the lengths differ or either vector has zero norm
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (dot + x * y, norm_a + x * x, norm_b + y * y)
        },
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    similarity.is_finite().then_some(similarity)
}

/// Whitespace-separated, lowercased query tokens
#[inline]
pub fn query_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Keyword boost for a resume: 0.0, 0.1 or 0.2
#[inline]
pub fn keyword_boost(keywords: &[String], resume: &Resume) -> f64 {
    let mut boost = 0.0;

    let skills_text = resume.skills.join(" ").to_lowercase();
    if keywords.iter().any(|keyword| skills_text.contains(keyword.as_str())) {
        boost += SKILL_MATCH_BOOST;
    }

    if let Some(summary) = resume.summary.as_deref().filter(|s| !s.is_empty()) {
        let summary_text = summary.to_lowercase();
        if keywords.iter().any(|keyword| summary_text.contains(keyword.as_str())) {
            boost += SUMMARY_MATCH_BOOST;
        }
    }

    boost
}

/// Score every eligible resume against the query and keep the best `top_k`.
///
/// `resumes` must be in insertion order; equal scores keep that order.
/// Resumes without a usable vector of `expected_dimension` length are skipped.
pub fn rank_resumes(
    query_text: &str,
    query_vector: &[f32],
    resumes: &[Resume],
    expected_dimension: usize,
    filters: &SearchFilters,
    top_k: usize,
) -> Vec<RankedCandidate> {
    let keywords = query_keywords(query_text);

    let mut candidates: Vec<RankedCandidate> = resumes
        .iter()
        .filter(|resume| filters.matches(resume))
        .filter_map(|resume| {
            let vector = match resume.index_vector(expected_dimension) {
                Ok(vector) => vector,
                Err(error) => {
                    if matches!(resume.embedding, StoredEmbedding::Missing) {
                        debug!("Skipping resume {}: not indexed yet", resume.id);
                    } else {
                        warn!("Skipping resume {}: {}", resume.id, error);
                    }
                    return None;
                }
            };

            let Some(base_score) = cosine_similarity(query_vector, vector) else {
                debug!("Skipping resume {}: similarity undefined", resume.id);
                return None;
            };

            let score = base_score + keyword_boost(&keywords, resume);
            Some(RankedCandidate::from_resume(resume, score))
        })
        .collect();

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(top_k);

    debug!(
        "Ranked {} of {} resumes for query {:?}",
        candidates.len(),
        resumes.len(),
        query_text
    );

    candidates
}

/// Reject queries that carry no text before they reach the embedder
#[inline]
pub fn validate_query(query_text: &str) -> Result<&str, TalentError> {
    let trimmed = query_text.trim();
    if trimmed.is_empty() {
        return Err(TalentError::EmptyQuery);
    }
    Ok(trimmed)
}

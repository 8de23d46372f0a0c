
use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use tracing::warn;

use crate::TalentError;

/// A finished resume as handed over by the field extraction step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResume {
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub contact: BTreeMap<String, String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Raw row as stored in SQLite; JSON columns are still encoded
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ResumeRow {
    pub id: i64,
    pub name: String,
    pub skills: String,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub contact: String,
    pub summary: Option<String>,
    pub embedding: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// What the store holds in the embedding column of a resume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredEmbedding {
    Missing,
    Malformed(String),
    Present(Vec<f32>),
}

impl StoredEmbedding {
    #[inline]
    pub fn decode(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => StoredEmbedding::Missing,
            Some(json) => match serde_json::from_str::<Vec<f32>>(json) {
                Ok(vector) if vector.is_empty() => StoredEmbedding::Missing,
                Ok(vector) => StoredEmbedding::Present(vector),
                Err(e) => StoredEmbedding::Malformed(e.to_string()),
            },
        }
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        matches!(self, StoredEmbedding::Present(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub id: i64,
    pub name: String,
    pub skills: Vec<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub contact: BTreeMap<String, String>,
    pub summary: Option<String>,
    pub embedding: StoredEmbedding,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<ResumeRow> for Resume {
    fn from(row: ResumeRow) -> Self {
        let skills = serde_json::from_str(&row.skills).unwrap_or_else(|e| {
            warn!("Resume {} has unreadable skills ({}), treating as empty", row.id, e);
            Vec::new()
        });
        let contact = serde_json::from_str(&row.contact).unwrap_or_else(|e| {
            warn!("Resume {} has unreadable contact ({}), treating as empty", row.id, e);
            BTreeMap::new()
        });

        Self {
            id: row.id,
            name: row.name,
            skills,
            experience: row.experience,
            education: row.education,
            contact,
            summary: row.summary,
            embedding: StoredEmbedding::decode(row.embedding.as_deref()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Resume {
    /// The stored vector if it can take part in similarity ranking
    #[inline]
    pub fn index_vector(&self, expected_dimension: usize) -> Result<&[f32], TalentError> {
        match &self.embedding {
            StoredEmbedding::Present(vector) if vector.len() == expected_dimension => Ok(vector),
            StoredEmbedding::Present(vector) => Err(TalentError::MalformedStoredVector {
                id: self.id,
                reason: format!(
                    "expected {} dimensions, found {}",
                    expected_dimension,
                    vector.len()
                ),
            }),
            StoredEmbedding::Malformed(reason) => Err(TalentError::MalformedStoredVector {
                id: self.id,
                reason: reason.clone(),
            }),
            StoredEmbedding::Missing => Err(TalentError::MalformedStoredVector {
                id: self.id,
                reason: "no embedding stored".to_string(),
            }),
        }
    }

    #[inline]
    pub fn is_index_ready(&self, expected_dimension: usize) -> bool {
        self.index_vector(expected_dimension).is_ok()
    }

    #[inline]
    pub fn location(&self) -> Option<&str> {
        self.contact
            .get("location")
            .map(String::as_str)
            .filter(|location| !location.trim().is_empty())
    }

    /// Years of experience read from the leading number of the experience text
    #[inline]
    pub fn experience_years(&self) -> Option<f64> {
        let experience = self.experience.as_deref()?.trim_start();
        let number: String = experience
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        number.parse().ok()
    }

    /// Rebuild the record as it was submitted, without identity or embedding
    #[inline]
    pub fn to_new_resume(&self) -> NewResume {
        NewResume {
            name: self.name.clone(),
            skills: self.skills.clone(),
            experience: self.experience.clone(),
            education: self.education.clone(),
            contact: self.contact.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Share of one value among all occurrences, as shown on a dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub name: String,
    pub value: usize,
}

/// Aggregate view over every stored resume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStatistics {
    pub total_candidates: usize,
    pub indexed_candidates: usize,
    pub pending_candidates: usize,
    pub average_experience: f64,
    pub top_skill: Option<String>,
    pub top_location: Option<String>,
    /// Percentage of all skill mentions, rounded
    pub skill_distribution: Vec<Distribution>,
    /// Number of candidates per location
    pub location_distribution: Vec<Distribution>,
}

impl CandidateStatistics {
    #[inline]
    pub fn from_resumes(resumes: &[Resume], expected_dimension: usize) -> Self {
        let indexed_candidates = resumes
            .iter()
            .filter(|r| r.is_index_ready(expected_dimension))
            .count();

        let years: Vec<f64> = resumes.iter().filter_map(Resume::experience_years).collect();
        let average_experience = if years.is_empty() {
            0.0
        } else {
            let mean = years.iter().sum::<f64>() / years.len() as f64;
            (mean * 10.0).round() / 10.0
        };

        let skill_counts = resumes.iter().flat_map(|r| r.skills.iter()).counts();
        let total_mentions: usize = skill_counts.values().sum();
        let skill_distribution = sorted_by_count(&skill_counts)
            .into_iter()
            .map(|(name, count)| Distribution {
                name: name.clone(),
                value: ((100 * count) as f64 / total_mentions as f64).round() as usize,
            })
            .collect_vec();

        let location_counts = resumes.iter().filter_map(Resume::location).counts();
        let location_distribution = sorted_by_count(&location_counts)
            .into_iter()
            .map(|(name, count)| Distribution {
                name: name.to_string(),
                value: count,
            })
            .collect_vec();

        Self {
            total_candidates: resumes.len(),
            indexed_candidates,
            pending_candidates: resumes.len() - indexed_candidates,
            average_experience,
            top_skill: skill_distribution.first().map(|d| d.name.clone()),
            top_location: location_distribution.first().map(|d| d.name.clone()),
            skill_distribution,
            location_distribution,
        }
    }
}

/// Most frequent first, ties by name so output is stable
fn sorted_by_count<K: Ord + Copy>(counts: &std::collections::HashMap<K, usize>) -> Vec<(K, usize)> {
    counts
        .iter()
        .map(|(key, count)| (*key, *count))
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect()
}


use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, error};

use crate::generation::TextGenerator;
use crate::search::ranker::RankedCandidate;

/// Returned by [`AnswerSynthesizer::explain`] when there is nothing to explain
pub const NO_MATCHES_MESSAGE: &str = "No matching resumes found.";
/// Returned by [`AnswerSynthesizer::explain`] when the generation service fails
pub const GENERATION_ERROR_MESSAGE: &str = "Error generating analysis. Please try again.";

/// Turns ranked candidates into a recruiter-facing analysis
#[derive(Clone)]
pub struct AnswerSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl AnswerSynthesizer {
    #[inline]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Explain why the candidates match the query.
    ///
    /// Never fails: an empty candidate list short-circuits without calling the
    /// service, and a service failure yields [`GENERATION_ERROR_MESSAGE`].
    pub async fn explain(&self, query_text: &str, candidates: &[RankedCandidate]) -> String {
        if candidates.is_empty() {
            debug!("No candidates to explain for query {:?}", query_text);
            return NO_MATCHES_MESSAGE.to_string();
        }

        let prompt = build_prompt(query_text, candidates);
        debug!(
            "Requesting analysis for {} candidates (prompt length: {})",
            candidates.len(),
            prompt.len()
        );

        match self.generator.complete(&prompt).await {
            Ok(analysis) => analysis,
            Err(e) => {
                error!("Failed to generate analysis: {}", e);
                GENERATION_ERROR_MESSAGE.to_string()
            }
        }
    }
}

/// Render one candidate the way the model sees it
pub fn render_candidate(candidate: &RankedCandidate) -> String {
    format!(
        "Name: {}\nSkills: {}\nExperience: {}\nEducation: {}\nSummary: {}",
        candidate.name,
        candidate.skills.iter().join(", "),
        candidate.experience.as_deref().unwrap_or_default(),
        candidate.education.as_deref().unwrap_or_default(),
        candidate.summary.as_deref().unwrap_or_default(),
    )
}

pub fn build_prompt(query_text: &str, candidates: &[RankedCandidate]) -> String {
    let context = candidates.iter().map(render_candidate).join("\n\n");

    format!(
        "A recruiter is searching the resume database.\n\n\
         Recruiter query: \"{query_text}\"\n\n\
         Top matching resumes:\n\n\
         {context}\n\n\
         Using only the resumes above, decide which candidates best fit the query. \
         Structure the answer as:\n\
         1. Best matches, with reasoning for each\n\
         2. How they meet the stated requirements\n\
         3. Potential concerns or missing qualifications"
    )
}

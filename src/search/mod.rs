// Search module
// Ranks stored resumes against a recruiter query and explains the result

pub mod ranker;
pub mod synthesizer;


use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database::sqlite::Database;
use crate::embeddings::{Embedder, OllamaClient, validate_embedding};
use crate::generation::{TextGenerator, generator_from_config};
use crate::indexer::ConsistencyVerifier;

pub use ranker::{
    RankedCandidate, SKILL_MATCH_BOOST, SUMMARY_MATCH_BOOST, SearchFilters, cosine_similarity,
    keyword_boost, query_keywords, rank_resumes, validate_query,
};
pub use synthesizer::{AnswerSynthesizer, GENERATION_ERROR_MESSAGE, NO_MATCHES_MESSAGE};

/// Analysis attached to a [`SearchResponse`] with no matches
pub const NO_RESULTS_ANALYSIS: &str = "No matching resumes found for your query.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub top_k: usize,
    #[serde(default)]
    pub filters: SearchFilters,
    /// Ask the generation service for a narrative analysis
    pub with_analysis: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            filters: SearchFilters::default(),
            with_analysis: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub matches: Vec<RankedCandidate>,
    /// Absent when analysis was not requested
    pub analysis: Option<String>,
}

/// Query-time pipeline: embed, rank, optionally explain
#[derive(Clone)]
pub struct SearchEngine {
    database: Database,
    embedder: Arc<dyn Embedder>,
    synthesizer: AnswerSynthesizer,
    expected_dimension: usize,
    verifier: Option<ConsistencyVerifier>,
}

impl SearchEngine {
    #[inline]
    pub fn new(
        database: Database,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn TextGenerator>,
        expected_dimension: usize,
    ) -> Self {
        Self {
            database,
            embedder,
            synthesizer: AnswerSynthesizer::new(generator),
            expected_dimension,
            verifier: None,
        }
    }

    /// Repair unindexed resumes before every search
    #[inline]
    pub fn with_repair_before_search(mut self) -> Self {
        self.verifier = Some(ConsistencyVerifier::new(
            self.database.clone(),
            Arc::clone(&self.embedder),
            self.expected_dimension,
        ));
        self
    }

    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        let database = Database::initialize_from_config_dir(config.get_base_dir())
            .await
            .context("Failed to initialize resume database")?;
        let embedder =
            OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;
        let generator = generator_from_config(config)?;

        let engine = Self::new(
            database,
            Arc::new(embedder),
            generator,
            config.embedding_dimension(),
        );

        Ok(if config.search.repair_before_search {
            engine.with_repair_before_search()
        } else {
            engine
        })
    }

    /// Top `top_k` resumes for the query, best first
    #[inline]
    pub async fn rank(&self, query_text: &str, top_k: usize) -> crate::Result<Vec<RankedCandidate>> {
        self.rank_with_filters(query_text, &SearchFilters::default(), top_k)
            .await
    }

    pub async fn rank_with_filters(
        &self,
        query_text: &str,
        filters: &SearchFilters,
        top_k: usize,
    ) -> crate::Result<Vec<RankedCandidate>> {
        let query_text = validate_query(query_text)?;
        if !filters.is_empty() {
            debug!("Applying filters: {:?}", filters);
        }

        let query_vector = self.embedder.embed(query_text).await?;
        validate_embedding(&query_vector, self.expected_dimension)?;

        let resumes = self.database.list_resumes().await?;
        debug!("Loaded {} resumes for ranking", resumes.len());

        Ok(rank_resumes(
            query_text,
            &query_vector,
            &resumes,
            self.expected_dimension,
            filters,
            top_k,
        ))
    }

    /// Narrative analysis of already ranked candidates; never fails
    #[inline]
    pub async fn explain(&self, query_text: &str, candidates: &[RankedCandidate]) -> String {
        self.synthesizer.explain(query_text, candidates).await
    }

    /// Rank and, when requested, explain in one call
    pub async fn search(
        &self,
        query_text: &str,
        options: &SearchOptions,
    ) -> crate::Result<SearchResponse> {
        if let Some(verifier) = &self.verifier {
            match verifier.repair().await {
                Ok(0) => {}
                Ok(repaired) => info!("Repaired {} resumes before searching", repaired),
                Err(e) => warn!("Repair before search failed, continuing: {}", e),
            }
        }

        let matches = self
            .rank_with_filters(query_text, &options.filters, options.top_k)
            .await?;

        let analysis = if !options.with_analysis {
            None
        } else if matches.is_empty() {
            Some(NO_RESULTS_ANALYSIS.to_string())
        } else {
            Some(self.explain(query_text.trim(), &matches).await)
        };

        info!(
            "Search for {:?} returned {} matches",
            query_text.trim(),
            matches.len()
        );
        Ok(SearchResponse { matches, analysis })
    }
}

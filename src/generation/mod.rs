// Generation module
// Text generation backends used to explain search results

pub mod ollama;
pub mod openai;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{Config, GenerationProvider};
use crate::embeddings::OllamaClient;

pub use ollama::OllamaGenerator;
pub use openai::ChatCompletionsClient;

/// Completes a prompt with free text.
///
/// Failures are reported as [`crate::TalentError::Generation`]; callers decide
/// whether that is fatal.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> crate::Result<String>;
}

/// Build the configured generation backend.
///
/// Every provider makes a single attempt per prompt; a failed analysis
/// degrades to a fixed message instead of being retried.
#[inline]
pub fn generator_from_config(config: &Config) -> Result<Arc<dyn TextGenerator>> {
    let generation = &config.generation;

    let generator: Arc<dyn TextGenerator> = match generation.provider {
        GenerationProvider::Ollama => {
            let client = OllamaClient::new(&config.ollama)
                .context("Failed to initialize Ollama client for generation")?
                .with_timeout(std::time::Duration::from_secs(generation.timeout_seconds))
                .with_model(generation.model.clone())
                .with_retry_attempts(1);
            Arc::new(OllamaGenerator::new(
                client,
                generation.temperature,
                generation.max_tokens,
            ))
        }
        GenerationProvider::OpenAi => Arc::new(
            ChatCompletionsClient::from_config(generation)
                .context("Failed to initialize chat completions client")?,
        ),
    };

    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{AnswerSynthesizer, GENERATION_ERROR_MESSAGE, RankedCandidate};
    use serial_test::serial;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    #[serial]
    fn builds_ollama_generator_without_credentials() {
        let mut config = Config::with_base_dir("/tmp/talent-search-test");
        config.generation.provider = GenerationProvider::Ollama;
        config.generation.model = "llama3.2".to_string();

        assert!(generator_from_config(&config).is_ok());
    }

    #[test]
    #[serial]
    fn openai_generator_reads_key_from_configured_variable() {
        let mut config = Config::with_base_dir("/tmp/talent-search-test");
        config.generation.api_key_env = "TALENT_SEARCH_TEST_KEY".to_string();

        // SAFETY: serialized with the other environment-dependent tests
        unsafe { std::env::remove_var("TALENT_SEARCH_TEST_KEY") };
        assert!(generator_from_config(&config).is_err());

        // SAFETY: serialized with the other environment-dependent tests
        unsafe { std::env::set_var("TALENT_SEARCH_TEST_KEY", "test-key") };
        assert!(generator_from_config(&config).is_ok());

        // SAFETY: serialized with the other environment-dependent tests
        unsafe { std::env::remove_var("TALENT_SEARCH_TEST_KEY") };
    }

    #[tokio::test]
    async fn ollama_generation_does_not_retry_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503))
            // one request per prompt: the direct call and the synthesizer call
            .expect(2)
            .mount(&server)
            .await;

        let address = server.address();
        let mut config = Config::with_base_dir("/tmp/talent-search-test");
        config.ollama.host = address.ip().to_string();
        config.ollama.port = address.port();
        config.generation.provider = GenerationProvider::Ollama;
        config.generation.model = "llama3.2".to_string();

        let generator = generator_from_config(&config).expect("generator builds");
        let started = std::time::Instant::now();
        let result = generator.complete("hello").await;
        assert!(matches!(result, Err(crate::TalentError::Generation(_))));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        let candidate = RankedCandidate {
            record_id: 1,
            score: 0.9,
            name: "Ana".to_string(),
            skills: vec!["python".to_string()],
            experience: None,
            education: None,
            contact: Default::default(),
            summary: None,
        };
        let analysis = AnswerSynthesizer::new(generator)
            .explain("python developer", &[candidate])
            .await;
        assert_eq!(analysis, GENERATION_ERROR_MESSAGE);
    }
}

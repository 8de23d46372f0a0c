use async_trait::async_trait;

use crate::TalentError;
use crate::embeddings::OllamaClient;
use crate::generation::TextGenerator;

/// Generation through Ollama's `/api/generate`
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(client: OllamaClient, temperature: f32, max_tokens: u32) -> Self {
        Self {
            client,
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn complete(&self, prompt: &str) -> crate::Result<String> {
        let client = self.client.clone();
        let prompt = prompt.to_string();
        let (temperature, max_tokens) = (self.temperature, self.max_tokens);

        tokio::task::spawn_blocking(move || {
            client.generate_completion(&prompt, temperature, max_tokens)
        })
        .await
        .map_err(|e| TalentError::Generation(format!("generation task failed: {e}")))?
        .map_err(|e| TalentError::Generation(format!("{e:#}")))
    }
}

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::TalentError;
use crate::config::GenerationConfig;
use crate::generation::TextGenerator;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant helping recruiters find suitable candidates.";

/// Client for any OpenAI-compatible `/chat/completions` endpoint (Groq, OpenAI, vLLM)
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    agent: ureq::Agent,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl ChatCompletionsClient {
    #[inline]
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 1000,
            agent: ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .build()
                .into(),
        }
    }

    /// Build from settings, reading the API key from the configured environment variable
    #[inline]
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} is not set", config.api_key_env))?;
        if api_key.trim().is_empty() {
            bail!("{} is empty", config.api_key_env);
        }

        Ok(Self::new(
            &config.base_url,
            api_key,
            config.model.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
        .with_sampling(config.temperature, config.max_tokens))
    }

    #[inline]
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Send one chat completion request; no retries
    pub fn chat(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let request_json =
            serde_json::to_string(&body).context("Failed to serialize chat request")?;

        debug!("Calling chat completions at {}", self.endpoint);

        let response_text = self
            .agent
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.api_key.trim()))
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| {
                warn!("Chat completions request failed: {}", e);
                anyhow::anyhow!("Chat completions request failed: {}", e)
            })?;

        let parsed: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;

        let answer = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Chat response contained no content"))?;

        Ok(answer)
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    async fn complete(&self, prompt: &str) -> crate::Result<String> {
        let client = self.clone();
        let prompt = prompt.to_string();

        tokio::task::spawn_blocking(move || client.chat(&prompt))
            .await
            .map_err(|e| TalentError::Generation(format!("generation task failed: {e}")))?
            .map_err(|e| TalentError::Generation(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ChatCompletionsClient {
        ChatCompletionsClient::new(
            &format!("{}/openai/v1/", server.uri()),
            "secret",
            "llama-3.3-70b-versatile",
            Duration::from_secs(5),
        )
    }

    #[test]
    fn endpoint_is_appended_to_base_url() {
        let client = ChatCompletionsClient::new(
            "https://api.groq.com/openai/v1",
            "k",
            "m",
            Duration::from_secs(1),
        );
        assert_eq!(
            client.endpoint,
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn sends_bearer_token_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({"model": "llama-3.3-70b-versatile"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": " Ana is the best match. "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client_for(&server)
            .complete("Who fits?")
            .await
            .expect("completion should succeed");
        assert_eq!(answer, "Ana is the best match.");
    }

    #[tokio::test]
    async fn http_error_is_a_generation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).complete("Who fits?").await;
        assert!(matches!(result, Err(TalentError::Generation(_))));
    }

    #[tokio::test]
    async fn empty_choices_are_a_generation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let result = client_for(&server).complete("Who fits?").await;
        assert!(matches!(result, Err(TalentError::Generation(_))));
    }
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use transpak_core::config::{LlmConfig, LlmProvider};

const BACKOFF_BASE_MS: u64 = 500;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model name recorded alongside cached narratives.
    fn model(&self) -> &str;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenAI and any OpenAI-compatible endpoint (Ollama `/v1`).
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    max_retries: u32,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        model: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build LLM HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            max_retries,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn attempt(&self, prompt: &str) -> Result<String, AttemptError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: 0.2,
        };

        let mut request = self.http.post(self.endpoint()).json(&body);
        if let Some(key) = self.api_key.as_ref() {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|error| AttemptError::Retryable(anyhow!("LLM request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let error = anyhow!("LLM endpoint returned HTTP {}: {}", status.as_u16(), detail);
            return Err(if is_retryable(status) {
                AttemptError::Retryable(error)
            } else {
                AttemptError::Fatal(error)
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|error| AttemptError::Fatal(anyhow!("invalid LLM response body: {error}")))?;
        first_choice(parsed).map_err(AttemptError::Fatal)
    }
}

enum AttemptError {
    Retryable(anyhow::Error),
    Fatal(anyhow::Error),
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0_u32;
        loop {
            match self.attempt(prompt).await {
                Ok(content) => return Ok(content),
                Err(AttemptError::Fatal(error)) => return Err(error),
                Err(AttemptError::Retryable(error)) if attempt >= self.max_retries => {
                    return Err(error.context(format!("gave up after {} attempts", attempt + 1)));
                }
                Err(AttemptError::Retryable(error)) => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        event_name = "llm.request.retry",
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying LLM request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn first_choice(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        bail!("LLM response contained no message content");
    }
    Ok(content)
}

pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// 500 ms, 1 s, 2 s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(1_u64 << attempt.min(16)))
}

/// Builds the configured client, or `None` when the provider is `offline` or
/// OpenAI has no key.
pub fn client_from_config(config: &LlmConfig) -> Result<Option<Arc<dyn LlmClient>>> {
    if config.readiness() != "available" {
        return Ok(None);
    }
    let Some(base_url) = config.resolved_base_url() else {
        return Ok(None);
    };
    let api_key = match config.provider {
        LlmProvider::Ollama if !config.has_api_key() => None,
        _ => config.api_key.clone(),
    };

    let client = OpenAiCompatibleClient::new(
        base_url,
        api_key,
        config.model.clone(),
        Duration::from_secs(config.timeout_secs),
        config.max_retries,
    )?;
    Ok(Some(Arc::new(client)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;
    use secrecy::SecretString;

    use transpak_core::config::{AppConfig, LlmProvider};

    use super::{
        backoff_delay, client_from_config, first_choice, is_retryable, ChatResponse, LlmClient,
        OpenAiCompatibleClient,
    };

    #[test]
    fn retry_policy_covers_throttling_and_server_errors_only() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn backoff_doubles_from_half_a_second() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(1), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(3), Duration::from_millis(4_000));
    }

    #[test]
    fn response_content_is_trimmed_and_required() {
        let parsed: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  Quote ready.\n"}}]
        }))
        .expect("parse");
        assert_eq!(first_choice(parsed).expect("content"), "Quote ready.");

        let empty: ChatResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).expect("parse");
        assert!(first_choice(empty).is_err());
    }

    #[test]
    fn client_is_only_built_for_ready_providers() {
        let mut config = AppConfig::default().llm;
        assert!(client_from_config(&config).expect("offline").is_none());

        config.provider = LlmProvider::OpenAi;
        assert!(client_from_config(&config).expect("no key").is_none());

        config.api_key = Some(SecretString::from("sk-test".to_string()));
        let client = client_from_config(&config).expect("build").expect("client");
        assert_eq!(client.model(), "gpt-4o");

        config.provider = LlmProvider::Ollama;
        config.api_key = None;
        config.model = "llama3.1".to_string();
        assert!(client_from_config(&config).expect("ollama").is_some());
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_without_retries() {
        let client = OpenAiCompatibleClient::new(
            "http://127.0.0.1:1/v1/",
            None,
            "gpt-4o",
            Duration::from_secs(2),
            0,
        )
        .expect("client");
        assert_eq!(client.endpoint(), "http://127.0.0.1:1/v1/chat/completions");

        let error = client.complete("hello").await.expect_err("connection refused");
        assert!(error.to_string().contains("gave up after 1 attempts"));
    }
}

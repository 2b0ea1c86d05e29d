//! Language-model completion client
//!
//! [`Completion`] abstracts over the chat backend so the advisor can be
//! tested with canned responses. The production client posts to an
//! OpenAI-compatible chat-completions endpoint (Groq).

use crate::config::LlmConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

pub struct GroqClient {
    http: reqwest::Client,
    config: LlmConfig,
    api_key: SecretString,
}

impl GroqClient {
    pub fn new(config: LlmConfig, api_key: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            api_key,
        }
    }

    pub fn from_env(config: LlmConfig) -> Result<Self> {
        let key = std::env::var(crate::config::LLM_API_KEY_ENV)
            .map_err(|_| Error::Config(format!("{} not set", crate::config::LLM_API_KEY_ENV)))?;
        Ok(Self::new(config, SecretString::from(key)))
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

#[async_trait]
impl Completion for GroqClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "top_p": 0.95,
        });

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("completion request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "completion API returned {}",
                response.status()
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            Error::UpstreamUnavailable(format!("malformed completion response: {}", e))
        })?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::UpstreamUnavailable("completion had no choices".to_string()))
    }
}

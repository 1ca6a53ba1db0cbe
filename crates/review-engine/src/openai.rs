//! OpenAI-backed reviewer

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::diff::LineMapping;
use crate::errors::ReviewError;
use crate::prompt::{system_prompt, user_prompt};

pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_REVIEW_MODEL: &str = "gpt-4.1-nano";
/// Returned without calling the model when the diff is blank.
pub const NO_CHANGES_REPLY: &str = "No code changes to review.";

/// Produces review text for one diff (a whole file or a single hunk).
#[async_trait]
pub trait CodeReviewer: Send + Sync {
    async fn review(
        &self,
        diff: &str,
        path: Option<&str>,
        mapping: &LineMapping,
    ) -> Result<String, ReviewError>;
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_REVIEW_MODEL.to_string(),
            api_base: DEFAULT_OPENAI_BASE.to_string(),
            temperature: 0.0,
            max_tokens: 1500,
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct OpenAiReviewer {
    client: Client,
    config: OpenAiConfig,
    api_key: String,
}

impl OpenAiReviewer {
    pub fn new(config: OpenAiConfig) -> Result<Self, ReviewError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ReviewError::Config("missing OpenAI API key for reviewer".into()))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ReviewError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl CodeReviewer for OpenAiReviewer {
    async fn review(
        &self,
        diff: &str,
        path: Option<&str>,
        mapping: &LineMapping,
    ) -> Result<String, ReviewError> {
        if diff.trim().is_empty() {
            return Ok(NO_CHANGES_REPLY.to_string());
        }

        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let body = ChatCompletionRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(path, mapping),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(path, diff),
                },
            ],
        };

        debug!(model = %self.config.model, path = ?path, lines = mapping.len(), "Requesting review");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ReviewError::Http(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            warn!(status = status.as_u16(), "OpenAI review request rejected");
            return Err(ReviewError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| ReviewError::Decode(err.to_string()))?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ReviewError::Decode("response has no choices".into()))?;
        Ok(choice.message.content.map(|c| c.into_text()).unwrap_or_default())
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<ChatCompletionContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn into_text(self) -> String {
        match self {
            ChatCompletionContent::Text(value) => value,
            ChatCompletionContent::Parts(parts) => parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

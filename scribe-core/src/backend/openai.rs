// OpenAI-compatible chat backend
// Any server exposing POST {base_url}/chat/completions works (local model servers included)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Capabilities, ProcessRequest, ProcessingBackend};
use crate::error::BackendError;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
}

impl OpenAiConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        OpenAiConfig {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.3,
        }
    }

    /// A key is required; placeholder keys such as "YOUR_API_KEY" count as missing
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && !key.starts_with("YOUR") && !self.base_url.trim().is_empty()
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

pub struct OpenAiBackend {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Result<Self, BackendError> {
        // The overall deadline comes from the processingTimeout preference
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(2)
            .build()?;
        Ok(OpenAiBackend { client, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }
}

/// System prompt for an action
fn instructions(request: &ProcessRequest<'_>) -> String {
    let task = match request.action.id.as_str() {
        "summarize" => "Summarize the text concisely, keeping the key points.".to_string(),
        "rewrite" => format!(
            "Rewrite the text for clarity and impact in a {} tone.",
            request.tone
        ),
        "translate" => format!(
            "Translate the text into {}. Keep names, numbers and technical terms intact.",
            request.language.name()
        ),
        "proofread" => "Correct grammar, spelling and punctuation. Return only the corrected text.".to_string(),
        "expand" => "Expand the text with relevant detail and examples.".to_string(),
        "simplify" => "Rewrite the text in plain, simple language.".to_string(),
        _ => format!("Produce a {} of the text.", request.action.label.to_lowercase()),
    };
    format!("{}\nRespond with ONLY the result, no explanations.", task)
}

#[async_trait]
impl ProcessingBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    fn capabilities(&self) -> Capabilities {
        if self.config.is_configured() {
            Capabilities::all()
        } else {
            Capabilities::none()
        }
    }

    async fn process(&self, request: ProcessRequest<'_>) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: instructions(&request),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.text.to_string(),
                },
            ],
            temperature: self.config.temperature,
        };

        debug!("sending {} request to {}", request.action.id, self.config.endpoint());

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Rejected(format!("HTTP {}: {}", status, detail.trim())));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(BackendError::EmptyResponse)
    }
}

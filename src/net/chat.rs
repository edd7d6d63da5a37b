//! OpenAI-compatible chat-completions backend (blocking).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::analysis::TextGenerator;
use crate::config::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use crate::error::GenerationError;

const SYSTEM_PROMPT: &str = "你是一位熟悉小六壬與五行的占卜顧問。";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Pull the first choice's text out of a response body.
pub fn parse_response(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Malformed(format!("invalid JSON: {}", e)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GenerationError::Malformed("response has no message content".into()))
}

/// Chat-completions client with a bounded request timeout.
#[derive(Clone)]
pub struct ChatCompletionClient {
    api_key: String,
    endpoint: Url,
    model: String,
    client: reqwest::blocking::Client,
}

impl ChatCompletionClient {
    pub fn new(
        api_key: &str,
        endpoint: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| GenerationError::Client(format!("invalid endpoint: {}", e)))?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("xiaoliuren/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            endpoint,
            model: model.to_string(),
            client,
        })
    }

    /// Client against the public OpenAI endpoint.
    pub fn openai(api_key: &str, model: &str) -> Result<Self, GenerationError> {
        Self::new(api_key, DEFAULT_ENDPOINT, model, DEFAULT_TIMEOUT)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

impl TextGenerator for ChatCompletionClient {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
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

        let response = self
            .client
            .post(self.endpoint.as_str())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| GenerationError::Request(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text)
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}

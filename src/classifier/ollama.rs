//! Reasoning backend talking to an Ollama server's chat API

use super::{ClassifyError, ReasoningBackend};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

/// Blocking client for `POST {base_url}/api/chat`
pub struct OllamaBackend {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OllamaBackend {
    /// Create a backend for `model` served at `base_url`
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, model: &str, temperature: f32, timeout: Duration) -> Self {
        OllamaBackend {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.to_string(),
            temperature,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ReasoningBackend for OllamaBackend {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ClassifyError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        let response = self.client.post(&self.endpoint).json(&request).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Status(status.as_u16()));
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| ClassifyError::Decode(e.to_string()))?;

        if body.message.content.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse);
        }

        Ok(body.message.content)
    }
}

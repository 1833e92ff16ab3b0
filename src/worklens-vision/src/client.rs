//! OpenAI-compatible chat client
//!
//! One explicitly constructed client shared by the vision classifier and
//! the refinement calls. Request/response types cover only the fields
//! this pipeline uses.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{LlmError, Result};
use crate::prompt::CLASSIFY_INSTRUCTION;

/// Request timeout; vision calls on large screenshots can be slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Serialize, Debug)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(parts),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize, Debug)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug)]
pub struct ImageUrl {
    pub url: String,
    pub detail: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: String,
}

/// Chat-completions client for an OpenAI-compatible endpoint.
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send a chat completion request and return the first choice's text.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("requesting completion from {} ({})", url, request.model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("completion had no choices".to_string()))
    }

    /// Classify one screenshot with the fixed instruction.
    ///
    /// The image goes inline as a base64 JPEG data URL; the model is asked
    /// for a JSON object with `activity` and `open_windows`.
    pub async fn classify_screenshot(&self, model: &str, jpeg: &[u8]) -> Result<String> {
        let encoded = BASE64.encode(jpeg);
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![Message::user_parts(vec![
                ContentPart::Text {
                    text: CLASSIFY_INSTRUCTION.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/jpeg;base64,{encoded}"),
                        detail: "high".to_string(),
                    },
                },
            ])],
            max_tokens: Some(1000),
            temperature: Some(0.0),
            response_format: Some(ResponseFormat::json_object()),
        };

        self.chat(&request).await
    }
}

/// Seam for plain-text completions, so refinement logic can be exercised
/// against scripted models in tests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// A [`ChatModel`] bound to one model name and call configuration.
pub struct ChatCompletion {
    client: Arc<OpenAiClient>,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    json_object: bool,
}

impl ChatCompletion {
    pub fn new(client: Arc<OpenAiClient>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            max_tokens: None,
            temperature: None,
            json_object: false,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json_object(mut self) -> Self {
        self.json_object = true;
        self
    }
}

#[async_trait]
impl ChatModel for ChatCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user_text(prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: self.json_object.then(ResponseFormat::json_object),
        };

        self.client.chat(&request).await
    }
}

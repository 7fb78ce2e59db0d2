//! Generic OpenAI-compatible provider.
//! Most LLM APIs follow the same `/v1/chat/completions` format, so a single
//! implementation covers OpenAI, OpenRouter, Ollama, and local gateways.

use crate::providers::traits::{ChatMessage, Provider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// A provider that speaks the OpenAI-compatible chat completions API.
pub struct OpenAiCompatibleProvider {
    name: String,
    base_url: String,
    credential: Option<String>,
    auth_header: AuthStyle,
}

/// How the provider expects the API key to be sent.
#[derive(Debug, Clone)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `x-api-key: <key>`
    XApiKey,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        name: &str,
        base_url: &str,
        credential: Option<&str>,
        auth_style: AuthStyle,
    ) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: credential.map(ToString::to_string),
            auth_header: auth_style,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn http_client(&self) -> Client {
        Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default()
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn apply_auth_header(
        &self,
        builder: reqwest::RequestBuilder,
        credential: &str,
    ) -> reqwest::RequestBuilder {
        match &self.auth_header {
            AuthStyle::Bearer => builder.bearer_auth(credential),
            AuthStyle::XApiKey => builder.header("x-api-key", credential),
        }
    }

    /// Map a [`ChatMessage`] to the wire format. Messages with an image become
    /// multi-part content with a `data:` URL, the format every vision-capable
    /// compatible API accepts.
    fn to_api_message(message: &ChatMessage) -> Value {
        match &message.image {
            Some(png_base64) => json!({
                "role": message.role,
                "content": [
                    { "type": "text", "text": message.content },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/png;base64,{png_base64}") }
                    }
                ]
            }),
            None => json!({ "role": message.role, "content": message.content }),
        }
    }
}

#[derive(Serialize)]
struct ApiChatRequest {
    model: String,
    messages: Vec<Value>,
    temperature: f64,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Truncate provider error bodies so huge HTML error pages do not flood logs.
const MAX_API_ERROR_CHARS: usize = 500;

pub(crate) fn sanitize_api_error(input: &str) -> String {
    if input.chars().count() <= MAX_API_ERROR_CHARS {
        return input.to_string();
    }
    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &input[..end])
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    async fn chat_with_history(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let credential = self.credential.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "{} API key not set. Run `webpilot config init` or set WEBPILOT_API_KEY.",
                self.name
            )
        })?;

        let request = ApiChatRequest {
            model: model.to_string(),
            messages: messages.iter().map(Self::to_api_message).collect(),
            temperature,
            stream: false,
        };

        let url = self.chat_completions_url();
        let response = self
            .apply_auth_header(self.http_client().post(&url).json(&request), credential)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await?;
            anyhow::bail!(
                "{} API error ({status}): {}",
                self.name,
                sanitize_api_error(&error)
            );
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            anyhow::anyhow!("{} returned an unparseable chat response: {e}", self.name)
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("No response from {}", self.name))
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single message in a conversation.
///
/// `image` carries an optional base64-encoded PNG (a page screenshot) for
/// vision-capable models; providers that cannot send images ignore it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
            image: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
            image: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
            image: None,
        }
    }

    /// Attach a base64 PNG screenshot to this message.
    pub fn with_image(mut self, png_base64: impl Into<String>) -> Self {
        self.image = Some(png_base64.into());
        self
    }
}

/// The LLM binding each agent role is constructed with.
///
/// Model identity and provider selection live entirely outside the execution
/// engine; agents only see this trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// One-shot chat with an optional system prompt.
    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let mut messages = Vec::new();
        if let Some(sys) = system_prompt {
            messages.push(ChatMessage::system(sys));
        }
        messages.push(ChatMessage::user(message));
        self.chat_with_history(&messages, model, temperature).await
    }

    /// Multi-turn conversation; the primary API for agent callers.
    async fn chat_with_history(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String>;
}

//! Plumbing shared by the three agent roles: one LLM call per invocation and
//! lenient parsing of the structured JSON the model returns.

use crate::providers::{ChatMessage, Provider};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// An agent role's binding to a chat model.
#[derive(Clone)]
pub struct RoleLlm {
    provider: Arc<dyn Provider>,
    pub model: String,
    pub temperature: f64,
}

impl RoleLlm {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f64) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
        }
    }

    /// One chat completion: system prompt plus a single user turn.
    pub async fn complete(&self, system: &str, user: ChatMessage) -> Result<String> {
        let messages = vec![ChatMessage::system(system), user];
        self.provider
            .chat_with_history(&messages, &self.model, self.temperature)
            .await
    }
}

/// Per-agent inputs assembled by the executor before each invocation.
///
/// Same inputs produce the same prompt; agents add nothing non-deterministic.
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// Task text, follow-ups, plan, and recent step outcomes.
    pub task_digest: String,
    /// Current page url/title/tabs block, or an explanation of why the
    /// browser state is unavailable.
    pub page_block: String,
    /// Base64 PNG of the current viewport when vision is enabled.
    pub screenshot: Option<String>,
}

impl AgentContext {
    /// The user turn every role starts from.
    pub fn to_user_message(&self, use_vision: bool) -> ChatMessage {
        let content = format!("{}\n{}", self.task_digest, self.page_block);
        let message = ChatMessage::user(content);
        match (&self.screenshot, use_vision) {
            (Some(shot), true) => message.with_image(shot.clone()),
            _ => message,
        }
    }
}

/// Parse the JSON object an agent expects out of a raw model response.
///
/// Models wrap JSON in markdown fences or prefix it with prose often enough
/// that strict parsing would burn failure budget on formatting noise; this
/// extracts the outermost object before deserializing.
pub fn parse_json_response<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let trimmed = raw.trim();

    // Fast path: the whole response is the object.
    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Ok(value);
    }

    let without_fences = strip_code_fences(trimmed);
    if let Ok(value) = serde_json::from_str::<T>(without_fences.trim()) {
        return Ok(value);
    }

    let start = without_fences
        .find('{')
        .context("model response contains no JSON object")?;
    let end = without_fences
        .rfind('}')
        .context("model response contains no JSON object")?;
    if end < start {
        anyhow::bail!("model response contains no JSON object");
    }

    serde_json::from_str(&without_fences[start..=end])
        .context("model returned malformed JSON")
}

fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json", "JSON", ...) up to the first newline.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").map_or(rest, str::trim_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, PartialEq, Debug)]
    struct Sample {
        verdict: String,
    }

    #[test]
    fn parses_bare_json() {
        let out: Sample = parse_json_response(r#"{"verdict": "continue"}"#).unwrap();
        assert_eq!(out.verdict, "continue");
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"verdict\": \"done\"}\n```";
        let out: Sample = parse_json_response(raw).unwrap();
        assert_eq!(out.verdict, "done");
    }

    #[test]
    fn parses_json_with_prose_around_it() {
        let raw = "Here is my assessment:\n{\"verdict\": \"blocked\"}\nLet me know.";
        let out: Sample = parse_json_response(raw).unwrap();
        assert_eq!(out.verdict, "blocked");
    }

    #[test]
    fn rejects_responses_without_json() {
        let err = parse_json_response::<Sample>("I could not decide.").unwrap_err();
        assert!(err.to_string().contains("no JSON object"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_json_response::<Sample>("{\"verdict\": }").is_err());
    }

    #[test]
    fn user_message_attaches_screenshot_only_when_vision_enabled() {
        let ctx = AgentContext {
            task_digest: "Task: t".into(),
            page_block: "Current page: Example".into(),
            screenshot: Some("cGln".into()),
        };
        assert!(ctx.to_user_message(true).image.is_some());
        assert!(ctx.to_user_message(false).image.is_none());
    }
}

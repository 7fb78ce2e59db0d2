use crate::browser::BrowserContext;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Result of one executed browser action.
#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    /// Content surfaced to the agent history and the UI (extracted text,
    /// confirmation message, final answer).
    pub extracted_content: Option<String>,
    /// Set by the terminal `done` action; stops the step and the task.
    pub is_done: bool,
    /// Whether a `done` action claims the task succeeded. Meaningless unless
    /// `is_done` is set.
    pub success: bool,
}

impl ActionOutcome {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            extracted_content: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn done(success: bool, text: impl Into<String>) -> Self {
        Self {
            extracted_content: Some(text.into()),
            is_done: true,
            success,
        }
    }
}

/// Typed failure modes for action dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("invalid arguments: {0}")]
    InvalidArgument(String),

    #[error("action failed: {0}")]
    Execution(String),

    #[error("action timed out: {0}")]
    Timeout(String),
}

impl ActionError {
    /// Classify a browser failure. Element-lookup timeouts get their own
    /// bucket so the navigator can react differently on the next step.
    pub fn from_browser(err: &anyhow::Error) -> Self {
        let text = format!("{err:#}");
        if text.contains("timed out") {
            Self::Timeout(text)
        } else {
            Self::Execution(text)
        }
    }
}

/// Deserialize an action's argument object, mapping schema violations to
/// [`ActionError::InvalidArgument`].
pub fn parse_args<T: DeserializeOwned>(args: serde_json::Value) -> Result<T, ActionError> {
    serde_json::from_value(args).map_err(|e| ActionError::InvalidArgument(e.to_string()))
}

/// One atomic browser operation the navigator may propose.
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(
        &self,
        browser: &BrowserContext,
        args: serde_json::Value,
    ) -> Result<ActionOutcome, ActionError>;
}

use super::traits::{parse_args, Action, ActionError, ActionOutcome};
use crate::browser::BrowserContext;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Terminal action: the navigator claims the task is finished.
///
/// Executing `done` stops the current step; whether the task actually ends
/// with success is decided by the executor (and the validator, if one is
/// configured).
pub struct DoneAction;

#[derive(Deserialize)]
struct DoneArgs {
    success: bool,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Action for DoneAction {
    fn name(&self) -> &'static str {
        "done"
    }

    fn description(&self) -> &'static str {
        "Declare the task finished. Set success=false if the task cannot be completed, and summarize the result in text"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "success": { "type": "boolean", "description": "Whether the task was accomplished" },
                "text": { "type": "string", "description": "Final answer or summary for the user" }
            },
            "required": ["success"]
        })
    }

    async fn execute(
        &self,
        _browser: &BrowserContext,
        args: serde_json::Value,
    ) -> Result<ActionOutcome, ActionError> {
        let args: DoneArgs = parse_args(args)?;
        Ok(ActionOutcome::done(args.success, args.text))
    }
}

use super::traits::{parse_args, Action, ActionError, ActionOutcome};
use crate::browser::BrowserContext;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Type text into a form field.
pub struct InputTextAction;

#[derive(Deserialize)]
struct InputTextArgs {
    selector: String,
    text: String,
    #[serde(default = "default_clear_first")]
    clear_first: bool,
}

fn default_clear_first() -> bool {
    true
}

#[async_trait]
impl Action for InputTextAction {
    fn name(&self) -> &'static str {
        "input_text"
    }

    fn description(&self) -> &'static str {
        "Type text into the element matching a CSS selector, clearing existing content unless clear_first is false"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "selector": { "type": "string", "description": "CSS selector of the input element" },
                "text": { "type": "string", "description": "Text to type" },
                "clear_first": { "type": "boolean", "description": "Clear the field before typing (default true)" }
            },
            "required": ["selector", "text"]
        })
    }

    async fn execute(
        &self,
        browser: &BrowserContext,
        args: serde_json::Value,
    ) -> Result<ActionOutcome, ActionError> {
        let args: InputTextArgs = parse_args(args)?;
        if args.selector.trim().is_empty() {
            return Err(ActionError::InvalidArgument("selector cannot be empty".into()));
        }
        browser
            .input_text(&args.selector, &args.text, args.clear_first)
            .await
            .map_err(|e| ActionError::from_browser(&e))?;
        Ok(ActionOutcome::message(format!(
            "Typed {} characters into {}",
            args.text.chars().count(),
            args.selector
        )))
    }
}

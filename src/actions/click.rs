use super::traits::{parse_args, Action, ActionError, ActionOutcome};
use crate::browser::BrowserContext;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Click the first element matching a CSS selector.
pub struct ClickAction;

#[derive(Deserialize)]
struct ClickArgs {
    selector: String,
}

#[async_trait]
impl Action for ClickAction {
    fn name(&self) -> &'static str {
        "click"
    }

    fn description(&self) -> &'static str {
        "Click the element matching a CSS selector"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "selector": { "type": "string", "description": "CSS selector of the element to click" }
            },
            "required": ["selector"]
        })
    }

    async fn execute(
        &self,
        browser: &BrowserContext,
        args: serde_json::Value,
    ) -> Result<ActionOutcome, ActionError> {
        let args: ClickArgs = parse_args(args)?;
        if args.selector.trim().is_empty() {
            return Err(ActionError::InvalidArgument("selector cannot be empty".into()));
        }
        browser
            .click(&args.selector)
            .await
            .map_err(|e| ActionError::from_browser(&e))?;
        Ok(ActionOutcome::message(format!("Clicked {}", args.selector)))
    }
}

use super::traits::{parse_args, Action, ActionError, ActionOutcome};
use crate::browser::BrowserContext;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Scroll the page vertically.
pub struct ScrollAction;

#[derive(Deserialize)]
struct ScrollArgs {
    direction: ScrollDirection,
    /// Pixels to scroll; defaults to one viewport-ish page.
    #[serde(default = "default_amount")]
    amount: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum ScrollDirection {
    Up,
    Down,
}

fn default_amount() -> u32 {
    800
}

#[async_trait]
impl Action for ScrollAction {
    fn name(&self) -> &'static str {
        "scroll"
    }

    fn description(&self) -> &'static str {
        "Scroll the page up or down by a pixel amount (default 800)"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "direction": { "type": "string", "enum": ["up", "down"] },
                "amount": { "type": "integer", "minimum": 1, "maximum": 10000 }
            },
            "required": ["direction"]
        })
    }

    async fn execute(
        &self,
        browser: &BrowserContext,
        args: serde_json::Value,
    ) -> Result<ActionOutcome, ActionError> {
        let args: ScrollArgs = parse_args(args)?;
        if args.amount == 0 || args.amount > 10_000 {
            return Err(ActionError::InvalidArgument(
                "amount must be between 1 and 10000".into(),
            ));
        }
        let delta = match args.direction {
            ScrollDirection::Down => i64::from(args.amount),
            ScrollDirection::Up => -i64::from(args.amount),
        };
        browser
            .scroll_by(delta)
            .await
            .map_err(|e| ActionError::from_browser(&e))?;
        Ok(ActionOutcome::message(format!("Scrolled by {delta}px")))
    }
}

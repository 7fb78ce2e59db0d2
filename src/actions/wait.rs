use super::traits::{parse_args, Action, ActionError, ActionOutcome};
use crate::browser::BrowserContext;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Cap on a single wait so a confused model cannot stall the step loop.
const MAX_WAIT_SECONDS: u64 = 30;

/// Pause between actions, e.g. while a page settles after navigation.
pub struct WaitAction;

#[derive(Deserialize)]
struct WaitArgs {
    seconds: u64,
}

#[async_trait]
impl Action for WaitAction {
    fn name(&self) -> &'static str {
        "wait"
    }

    fn description(&self) -> &'static str {
        "Wait for the given number of seconds (max 30), e.g. for a page to finish loading"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "seconds": { "type": "integer", "minimum": 1, "maximum": 30 }
            },
            "required": ["seconds"]
        })
    }

    async fn execute(
        &self,
        _browser: &BrowserContext,
        args: serde_json::Value,
    ) -> Result<ActionOutcome, ActionError> {
        let args: WaitArgs = parse_args(args)?;
        if args.seconds == 0 || args.seconds > MAX_WAIT_SECONDS {
            return Err(ActionError::InvalidArgument(format!(
                "seconds must be between 1 and {MAX_WAIT_SECONDS}"
            )));
        }
        tokio::time::sleep(Duration::from_secs(args.seconds)).await;
        Ok(ActionOutcome::message(format!("Waited {}s", args.seconds)))
    }
}

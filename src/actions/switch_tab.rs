use super::traits::{parse_args, Action, ActionError, ActionOutcome};
use crate::browser::BrowserContext;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Switch focus to another attached tab.
pub struct SwitchTabAction;

#[derive(Deserialize)]
struct SwitchTabArgs {
    tab_id: String,
}

#[async_trait]
impl Action for SwitchTabAction {
    fn name(&self) -> &'static str {
        "switch_tab"
    }

    fn description(&self) -> &'static str {
        "Switch focus to an open tab by id (ids appear in the page state)"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "tab_id": { "type": "string", "description": "Id of the tab to focus" }
            },
            "required": ["tab_id"]
        })
    }

    async fn execute(
        &self,
        browser: &BrowserContext,
        args: serde_json::Value,
    ) -> Result<ActionOutcome, ActionError> {
        let args: SwitchTabArgs = parse_args(args)?;
        browser
            .switch_tab(&args.tab_id)
            .await
            .map_err(|e| ActionError::from_browser(&e))?;
        Ok(ActionOutcome::message(format!("Switched to tab {}", args.tab_id)))
    }
}

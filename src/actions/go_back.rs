use super::traits::{Action, ActionError, ActionOutcome};
use crate::browser::BrowserContext;
use async_trait::async_trait;
use serde_json::json;

/// Go back one entry in the current tab's history.
pub struct GoBackAction;

#[async_trait]
impl Action for GoBackAction {
    fn name(&self) -> &'static str {
        "go_back"
    }

    fn description(&self) -> &'static str {
        "Go back to the previous page in the current tab"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        browser: &BrowserContext,
        _args: serde_json::Value,
    ) -> Result<ActionOutcome, ActionError> {
        browser
            .go_back()
            .await
            .map_err(|e| ActionError::from_browser(&e))?;
        Ok(ActionOutcome::message("Went back one page"))
    }
}

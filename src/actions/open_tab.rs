use super::traits::{parse_args, Action, ActionError, ActionOutcome};
use crate::browser::BrowserContext;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Open a URL in a new tab and switch to it.
pub struct OpenTabAction;

#[derive(Deserialize)]
struct OpenTabArgs {
    url: String,
}

#[async_trait]
impl Action for OpenTabAction {
    fn name(&self) -> &'static str {
        "open_tab"
    }

    fn description(&self) -> &'static str {
        "Open the given URL in a new tab and switch to it"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Absolute URL to open in a new tab" }
            },
            "required": ["url"]
        })
    }

    async fn execute(
        &self,
        browser: &BrowserContext,
        args: serde_json::Value,
    ) -> Result<ActionOutcome, ActionError> {
        let args: OpenTabArgs = parse_args(args)?;
        let url = args.url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ActionError::InvalidArgument(format!(
                "url must be http(s), got '{url}'"
            )));
        }
        let tab_id = browser
            .open_tab(url)
            .await
            .map_err(|e| ActionError::from_browser(&e))?;
        Ok(ActionOutcome::message(format!(
            "Opened {url} in new tab {tab_id}"
        )))
    }
}

use super::traits::{parse_args, Action, ActionError, ActionOutcome};
use crate::browser::BrowserContext;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Navigate the current tab to a URL.
pub struct NavigateAction;

#[derive(Deserialize)]
struct NavigateArgs {
    url: String,
}

#[async_trait]
impl Action for NavigateAction {
    fn name(&self) -> &'static str {
        "navigate"
    }

    fn description(&self) -> &'static str {
        "Navigate the current tab to the given URL"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Absolute URL to open" }
            },
            "required": ["url"]
        })
    }

    async fn execute(
        &self,
        browser: &BrowserContext,
        args: serde_json::Value,
    ) -> Result<ActionOutcome, ActionError> {
        let args: NavigateArgs = parse_args(args)?;
        let url = args.url.trim();
        if url.is_empty() {
            return Err(ActionError::InvalidArgument("url cannot be empty".into()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ActionError::InvalidArgument(format!(
                "url must be http(s), got '{url}'"
            )));
        }
        browser
            .navigate_to(url)
            .await
            .map_err(|e| ActionError::from_browser(&e))?;
        Ok(ActionOutcome::message(format!("Navigated to {url}")))
    }
}

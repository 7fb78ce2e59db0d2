use super::traits::{parse_args, Action, ActionError, ActionOutcome};
use crate::browser::BrowserContext;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Upper bound on extracted text fed back into the step history; beyond this
/// the model gets a truncated view.
const MAX_EXTRACT_CHARS: usize = 8_000;

/// Read visible text from the page or a single element.
pub struct ExtractAction;

#[derive(Deserialize)]
struct ExtractArgs {
    #[serde(default)]
    selector: Option<String>,
}

#[async_trait]
impl Action for ExtractAction {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn description(&self) -> &'static str {
        "Extract visible text from the page, or from the element matching an optional CSS selector"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "selector": { "type": "string", "description": "Optional CSS selector; omit for the whole page" }
            }
        })
    }

    async fn execute(
        &self,
        browser: &BrowserContext,
        args: serde_json::Value,
    ) -> Result<ActionOutcome, ActionError> {
        let args: ExtractArgs = parse_args(args)?;
        let mut text = browser
            .extract_text(args.selector.as_deref())
            .await
            .map_err(|e| ActionError::from_browser(&e))?;
        if text.chars().count() > MAX_EXTRACT_CHARS {
            let cut: String = text.chars().take(MAX_EXTRACT_CHARS).collect();
            text = format!("{cut}\n[truncated]");
        }
        Ok(ActionOutcome::message(text))
    }
}

//! Browser action surface exposed to the navigator.
//!
//! Each action implements the [`Action`] trait defined in [`traits`]: a name,
//! a description, a JSON parameter schema, and an async `execute` against
//! [`BrowserContext`](crate::browser::BrowserContext). Actions are assembled
//! into an [`ActionRegistry`] by [`default_actions`]; the registry validates
//! arguments and maps failures into typed [`ActionError`] values. Unknown
//! action names are a hard validation failure, never silently ignored.

pub mod click;
pub mod done;
pub mod extract;
pub mod go_back;
pub mod input_text;
pub mod navigate;
pub mod open_tab;
pub mod scroll;
pub mod switch_tab;
pub mod traits;
pub mod wait;

pub use click::ClickAction;
pub use done::DoneAction;
pub use extract::ExtractAction;
pub use go_back::GoBackAction;
pub use input_text::InputTextAction;
pub use navigate::NavigateAction;
pub use open_tab::OpenTabAction;
pub use scroll::ScrollAction;
pub use switch_tab::SwitchTabAction;
pub use traits::{Action, ActionError, ActionOutcome};
pub use wait::WaitAction;

use crate::browser::BrowserContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;

/// One action proposed by the navigator: a name plus an argument object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// The closed set of named browser actions.
pub struct ActionRegistry {
    actions: HashMap<&'static str, Box<dyn Action>>,
}

impl ActionRegistry {
    pub fn new(actions: Vec<Box<dyn Action>>) -> Self {
        Self {
            actions: actions.into_iter().map(|a| (a.name(), a)).collect(),
        }
    }

    /// Validate and run one proposed action against the browser.
    pub async fn dispatch(
        &self,
        browser: &BrowserContext,
        call: &ActionCall,
    ) -> Result<ActionOutcome, ActionError> {
        let action = self
            .actions
            .get(call.name.as_str())
            .ok_or_else(|| ActionError::UnknownAction(call.name.clone()))?;
        let args = if call.args.is_null() {
            serde_json::json!({})
        } else {
            call.args.clone()
        };
        action.execute(browser, args).await
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Render the action vocabulary for the navigator's system prompt.
    pub fn prompt_instructions(&self) -> String {
        let mut names: Vec<&&'static str> = self.actions.keys().collect();
        names.sort_unstable();

        let mut instructions = String::from("### Available actions\n\n");
        for name in names {
            let action = &self.actions[*name];
            writeln!(
                &mut instructions,
                "**{}**: {}",
                action.name(),
                action.description()
            )
            .expect("writing to String cannot fail");
            let parameters = serde_json::to_string(&action.parameters_schema())
                .unwrap_or_else(|_| "{}".to_string());
            writeln!(&mut instructions, "Parameters: `{parameters}`")
                .expect("writing to String cannot fail");
            instructions.push('\n');
        }
        instructions
    }
}

/// Create the default action registry the navigator operates with.
pub fn default_actions() -> ActionRegistry {
    ActionRegistry::new(vec![
        Box::new(NavigateAction),
        Box::new(GoBackAction),
        Box::new(ClickAction),
        Box::new(InputTextAction),
        Box::new(ScrollAction),
        Box::new(ExtractAction),
        Box::new(SwitchTabAction),
        Box::new(OpenTabAction),
        Box::new(WaitAction),
        Box::new(DoneAction),
    ])
}

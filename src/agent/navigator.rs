//! Navigator: proposes and narrates the next browser actions.

use crate::actions::ActionCall;
use crate::agent::base::{parse_json_response, AgentContext, RoleLlm};
use anyhow::Result;
use serde::Deserialize;

/// Parsed navigator response: a short narration plus 1..N proposed actions.
#[derive(Debug, Clone, Deserialize)]
pub struct NavigatorDecision {
    /// Assessment of whether the previous step moved the task forward.
    #[serde(default)]
    pub evaluation: Option<String>,
    /// What this step is trying to achieve.
    #[serde(default)]
    pub next_goal: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionCall>,
}

pub struct NavigatorAgent {
    llm: RoleLlm,
    /// Rendered action vocabulary, fixed at construction.
    action_instructions: String,
    max_actions_per_step: usize,
    use_vision: bool,
}

impl NavigatorAgent {
    pub fn new(
        llm: RoleLlm,
        action_instructions: String,
        max_actions_per_step: usize,
        use_vision: bool,
    ) -> Self {
        Self {
            llm,
            action_instructions,
            max_actions_per_step,
            use_vision,
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a browser navigation agent. Each turn you receive the task, the \
             history of previous steps, and the current page state. Decide the next \
             browser actions that move the task forward.\n\n\
             Respond with a single JSON object:\n\
             {{\"evaluation\": \"did the last step work\", \"next_goal\": \"what this step \
             achieves\", \"actions\": [{{\"name\": \"action_name\", \"args\": {{...}}}}]}}\n\n\
             Propose at most {} actions per turn. When the task is finished (or \
             impossible), propose the single `done` action with an honest `success` flag \
             and the final answer in `text`.\n\n{}",
            self.max_actions_per_step, self.action_instructions
        )
    }

    /// One navigation turn. Transport and parse failures surface as `Err` so
    /// the executor can count them against the failure budget uniformly.
    pub async fn run(&self, ctx: &AgentContext) -> Result<NavigatorDecision> {
        let raw = self
            .llm
            .complete(&self.system_prompt(), ctx.to_user_message(self.use_vision))
            .await?;
        let mut decision: NavigatorDecision = parse_json_response(&raw)?;
        // A model that over-proposes gets clipped, not failed.
        decision.actions.truncate(self.max_actions_per_step);
        Ok(decision)
    }
}

//! Planner: periodically assesses progress and decides whether to continue,
//! declare the task done, or report it blocked.

use crate::agent::base::{parse_json_response, AgentContext, RoleLlm};
use anyhow::Result;
use serde::Deserialize;

/// The planner's assessment of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerVerdict {
    Continue,
    Done,
    Blocked,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlannerOutput {
    /// What the planner observed about the current state.
    #[serde(default)]
    pub observation: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub blocked: bool,
    /// High-level steps the navigator should pursue next.
    #[serde(default)]
    pub next_steps: Vec<String>,
    /// Final answer, present when `done` is set.
    #[serde(default)]
    pub final_answer: Option<String>,
}

impl PlannerOutput {
    /// `done` wins over `blocked` when a confused model sets both.
    pub fn verdict(&self) -> PlannerVerdict {
        if self.done {
            PlannerVerdict::Done
        } else if self.blocked {
            PlannerVerdict::Blocked
        } else {
            PlannerVerdict::Continue
        }
    }

    /// Plan text recorded into history for subsequent navigator prompts.
    pub fn plan_text(&self) -> String {
        if self.next_steps.is_empty() {
            self.observation.clone()
        } else {
            self.next_steps.join("; ")
        }
    }
}

pub struct PlannerAgent {
    llm: RoleLlm,
    use_vision: bool,
}

impl PlannerAgent {
    pub fn new(llm: RoleLlm, use_vision: bool) -> Self {
        Self { llm, use_vision }
    }

    fn system_prompt(&self) -> &'static str {
        "You are a planning agent supervising a browser automation task. Review the \
         task, the step history, and the current page state, then judge progress.\n\n\
         Respond with a single JSON object:\n\
         {\"observation\": \"what happened so far\", \"done\": false, \"blocked\": false, \
         \"next_steps\": [\"...\"], \"final_answer\": null}\n\n\
         Set done=true only when the task is genuinely complete (and put the answer in \
         final_answer). Set blocked=true when no further browser action can make \
         progress. Otherwise propose concrete next_steps."
    }

    pub async fn run(&self, ctx: &AgentContext) -> Result<PlannerOutput> {
        let raw = self
            .llm
            .complete(self.system_prompt(), ctx.to_user_message(self.use_vision))
            .await?;
        parse_json_response(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_prefers_done_over_blocked() {
        let out: PlannerOutput =
            parse_json_response(r#"{"observation": "o", "done": true, "blocked": true}"#).unwrap();
        assert_eq!(out.verdict(), PlannerVerdict::Done);
    }

    #[test]
    fn defaults_mean_continue() {
        let out: PlannerOutput = parse_json_response(r#"{"observation": "working"}"#).unwrap();
        assert_eq!(out.verdict(), PlannerVerdict::Continue);
        assert_eq!(out.plan_text(), "working");
    }

    #[test]
    fn plan_text_prefers_next_steps() {
        let out: PlannerOutput = parse_json_response(
            r#"{"observation": "o", "next_steps": ["open site", "find form"]}"#,
        )
        .unwrap();
        assert_eq!(out.plan_text(), "open site; find form");
    }
}

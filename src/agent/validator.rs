//! Validator: checks that a claimed "done" state actually satisfies the task,
//! guarding against hallucinated completion.

use crate::agent::base::{parse_json_response, AgentContext, RoleLlm};
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorOutput {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: String,
    /// The validator's cleaned-up final answer, when it accepts.
    #[serde(default)]
    pub answer: Option<String>,
}

pub struct ValidatorAgent {
    llm: RoleLlm,
    use_vision: bool,
}

impl ValidatorAgent {
    pub fn new(llm: RoleLlm, use_vision: bool) -> Self {
        Self { llm, use_vision }
    }

    fn system_prompt(&self) -> &'static str {
        "You are a validation agent. The navigator claims the browser task is \
         complete; the claimed result is included in the step history. Check the \
         claim against the task and the current page state.\n\n\
         Respond with a single JSON object:\n\
         {\"is_valid\": true, \"reason\": \"why\", \"answer\": \"final answer to report\"}\n\n\
         Reject (is_valid=false) when the page state does not support the claim."
    }

    pub async fn run(&self, ctx: &AgentContext) -> Result<ValidatorOutput> {
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
    fn output_parses_with_and_without_answer() {
        let out: ValidatorOutput =
            parse_json_response(r#"{"is_valid": true, "reason": "title matches", "answer": "Example Domain"}"#)
                .unwrap();
        assert!(out.is_valid);
        assert_eq!(out.answer.as_deref(), Some("Example Domain"));

        let out: ValidatorOutput =
            parse_json_response(r#"{"is_valid": false, "reason": "form not submitted"}"#).unwrap();
        assert!(!out.is_valid);
        assert!(out.answer.is_none());
    }
}

//! Task and step history used to build subsequent prompts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// A user-issued natural-language objective. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), text)
    }

    pub fn with_id(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// One action taken during a step, as remembered for later prompts.
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub name: String,
    pub ok: bool,
    pub detail: Option<String>,
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    Failure(String),
    /// The navigator executed a terminal `done` action this step.
    Done { success: bool },
}

/// Record of one executor loop iteration.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step_index: u32,
    pub actions: Vec<ActionRecord>,
    pub outcome: StepOutcome,
}

/// How many recent steps the prompt digest includes verbatim.
const DIGEST_RECENT_STEPS: usize = 10;

/// In-memory conversation/step history for one executor instance.
///
/// Grows monotonically during a task; cleared only when a brand-new task
/// starts. Follow-up tasks append without resetting.
pub struct MessageHistory {
    tasks: Vec<Task>,
    steps: Vec<StepRecord>,
    latest_plan: Option<String>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            steps: Vec::new(),
            latest_plan: None,
        }
    }

    /// Begin a fresh task, discarding prior history.
    pub fn start_task(&mut self, task: Task) {
        self.tasks.clear();
        self.steps.clear();
        self.latest_plan = None;
        self.tasks.push(task);
    }

    /// Append a follow-up task onto the existing conversation.
    pub fn add_follow_up(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.tasks.last()
    }

    pub fn record_step(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    pub fn record_plan(&mut self, plan: impl Into<String>) {
        self.latest_plan = Some(plan.into());
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Render the conversation so far for an agent prompt: the objective,
    /// any follow-ups, the latest plan, and a window of recent steps.
    pub fn prompt_digest(&self) -> String {
        let mut digest = String::new();

        if let Some(first) = self.tasks.first() {
            writeln!(&mut digest, "Task: {}", first.text).ok();
        }
        for follow_up in self.tasks.iter().skip(1) {
            writeln!(&mut digest, "Follow-up: {}", follow_up.text).ok();
        }
        if let Some(plan) = &self.latest_plan {
            writeln!(&mut digest, "Current plan: {plan}").ok();
        }

        if !self.steps.is_empty() {
            writeln!(&mut digest, "\nRecent steps:").ok();
            let skipped = self.steps.len().saturating_sub(DIGEST_RECENT_STEPS);
            if skipped > 0 {
                writeln!(&mut digest, "  [{skipped} earlier steps omitted]").ok();
            }
            for step in self.steps.iter().skip(skipped) {
                let outcome = match &step.outcome {
                    StepOutcome::Success => "ok".to_string(),
                    StepOutcome::Failure(reason) => format!("failed: {reason}"),
                    StepOutcome::Done { success: true } => "done".to_string(),
                    StepOutcome::Done { success: false } => "done (unsuccessful)".to_string(),
                };
                let actions: Vec<String> = step
                    .actions
                    .iter()
                    .map(|a| {
                        if a.ok {
                            a.name.clone()
                        } else {
                            format!("{}(failed)", a.name)
                        }
                    })
                    .collect();
                writeln!(
                    &mut digest,
                    "  step {}: [{}] -> {}",
                    step.step_index + 1,
                    actions.join(", "),
                    outcome
                )
                .ok();
            }
        }

        digest
    }
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

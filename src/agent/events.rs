//! Execution event stream.
//!
//! Events are the sole unit of observable progress: every state-machine
//! transition in the executor becomes one [`ExecutionEvent`]. Consumers must
//! treat the stream as informational; the executor's internal counters remain
//! authoritative for control decisions.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// The logical role that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    System,
    Planner,
    Navigator,
    Validator,
    User,
}

/// Every transition the executor state machine can report.
///
/// Invariant: `TASK_*` states are only ever emitted with actor
/// [`Actor::System`]; `STEP_*`/`ACT_*` carry the agent that owns the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    TaskStart,
    TaskOk,
    TaskFail,
    TaskCancel,
    TaskPause,
    TaskResume,
    StepStart,
    StepOk,
    StepFail,
    StepCancel,
    ActStart,
    ActOk,
    ActFail,
}

impl ExecutionState {
    /// Terminal states end a run; exactly one is emitted per `execute()`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::TaskOk | Self::TaskFail | Self::TaskCancel)
    }
}

/// Payload shared by every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub task_id: String,
    pub step: u32,
    pub max_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub actor: Actor,
    pub state: ExecutionState,
    pub timestamp: DateTime<Utc>,
    pub data: EventData,
}

impl ExecutionEvent {
    pub fn new(actor: Actor, state: ExecutionState, data: EventData) -> Self {
        Self {
            actor,
            state,
            timestamp: Utc::now(),
            data,
        }
    }

    /// Human-readable line for log output.
    ///
    /// Display routing dispatches on the (actor, state) pair in one place so
    /// adding an actor or state stays a localized change.
    pub fn describe(&self) -> String {
        let detail = self.data.details.as_deref().unwrap_or("");
        match (self.actor, self.state) {
            (Actor::System, ExecutionState::TaskStart) => format!("task started: {detail}"),
            (Actor::System, ExecutionState::TaskOk) => format!("task completed: {detail}"),
            (Actor::System, ExecutionState::TaskFail) => format!("task failed: {detail}"),
            (Actor::System, ExecutionState::TaskCancel) => "task cancelled".to_string(),
            (Actor::System, ExecutionState::TaskPause) => "task paused".to_string(),
            (Actor::System, ExecutionState::TaskResume) => "task resumed".to_string(),
            (Actor::Planner, ExecutionState::StepStart) => {
                format!("planner assessing progress (step {})", self.data.step)
            }
            (Actor::Planner, ExecutionState::StepOk) => format!("plan: {detail}"),
            (Actor::Planner, ExecutionState::StepFail) => format!("planner failed: {detail}"),
            (Actor::Navigator, ExecutionState::StepStart) => format!(
                "step {}/{} started",
                self.data.step + 1,
                self.data.max_steps
            ),
            (Actor::Navigator, ExecutionState::StepOk) => {
                format!("step {} completed", self.data.step + 1)
            }
            (Actor::Navigator, ExecutionState::StepFail) => {
                format!("step {} failed: {detail}", self.data.step + 1)
            }
            (_, ExecutionState::StepCancel) => "step cancelled".to_string(),
            (_, ExecutionState::ActStart) => format!("action {detail}"),
            (_, ExecutionState::ActOk) => format!("action ok: {detail}"),
            (_, ExecutionState::ActFail) => format!("action failed: {detail}"),
            (Actor::Validator, ExecutionState::StepOk) => format!("validated: {detail}"),
            (Actor::Validator, ExecutionState::StepFail) => {
                format!("validation rejected: {detail}")
            }
            (actor, state) => format!("{actor:?} {state:?} {detail}"),
        }
    }
}

/// Single-subscriber event fan-out from the executor.
///
/// Re-subscribing replaces the previous listener rather than stacking, so a
/// reconnecting UI never receives duplicate deliveries.
pub struct EventManager {
    listener: Mutex<Option<UnboundedSender<ExecutionEvent>>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self {
            listener: Mutex::new(None),
        }
    }

    /// Register the single active listener, replacing any previous one.
    pub fn subscribe(&self) -> UnboundedReceiver<ExecutionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.listener.lock() = Some(tx);
        rx
    }

    pub fn clear(&self) {
        *self.listener.lock() = None;
    }

    /// Deliver an event to the listener, if any. Delivery is best-effort;
    /// ordering among delivered events follows emission order.
    pub fn emit(&self, event: ExecutionEvent) {
        let guard = self.listener.lock();
        if let Some(tx) = guard.as_ref() {
            if tx.send(event).is_err() {
                tracing::debug!("event listener dropped; event discarded");
            }
        }
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(actor: Actor, state: ExecutionState) -> ExecutionEvent {
        ExecutionEvent::new(
            actor,
            state,
            EventData {
                task_id: "t1".into(),
                step: 0,
                max_steps: 5,
                details: Some("x".into()),
            },
        )
    }

    #[test]
    fn states_serialize_screaming_snake() {
        let json = serde_json::to_string(&ExecutionState::TaskStart).unwrap();
        assert_eq!(json, "\"TASK_START\"");
        let json = serde_json::to_string(&Actor::Navigator).unwrap();
        assert_eq!(json, "\"NAVIGATOR\"");
    }

    #[test]
    fn terminal_states_are_exactly_task_end_states() {
        for state in [
            ExecutionState::TaskOk,
            ExecutionState::TaskFail,
            ExecutionState::TaskCancel,
        ] {
            assert!(state.is_terminal());
        }
        for state in [
            ExecutionState::TaskStart,
            ExecutionState::TaskPause,
            ExecutionState::StepOk,
            ExecutionState::ActFail,
        ] {
            assert!(!state.is_terminal());
        }
    }

    #[test]
    fn resubscribe_replaces_listener() {
        let manager = EventManager::new();
        let mut first = manager.subscribe();
        let mut second = manager.subscribe();

        manager.emit(event(Actor::System, ExecutionState::TaskStart));

        // The first receiver was replaced; only the second sees the event.
        assert!(first.try_recv().is_err());
        assert!(second.try_recv().is_ok());
    }

    #[test]
    fn emit_without_listener_is_a_no_op() {
        let manager = EventManager::new();
        manager.emit(event(Actor::System, ExecutionState::TaskStart));
        manager.clear();
        manager.emit(event(Actor::System, ExecutionState::TaskOk));
    }

    #[test]
    fn describe_covers_task_lifecycle() {
        let text = event(Actor::System, ExecutionState::TaskStart).describe();
        assert!(text.contains("task started"));
        let text = event(Actor::Navigator, ExecutionState::StepStart).describe();
        assert!(text.contains("step 1/5"));
    }
}

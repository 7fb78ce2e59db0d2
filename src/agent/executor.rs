//! The orchestration state machine.
//!
//! `Executor` turns one task (plus optional follow-ups) into a bounded,
//! cancellable, replannable sequence of browser actions. The step loop is
//! cooperative: pause and cancel flags are observed at safe points (top of
//! step, around every LLM call, before every browser action) and an in-flight
//! action is always allowed to finish. Nothing escapes `execute()` as a raw
//! error; every failure mode is normalized into the event stream.

use crate::actions::ActionRegistry;
use crate::agent::base::AgentContext;
use crate::agent::events::{Actor, EventData, EventManager, ExecutionEvent, ExecutionState};
use crate::agent::history::{ActionRecord, MessageHistory, StepOutcome, StepRecord, Task};
use crate::agent::navigator::NavigatorAgent;
use crate::agent::planner::{PlannerAgent, PlannerVerdict};
use crate::agent::validator::ValidatorAgent;
use crate::browser::BrowserContext;
use crate::config::ExecutionConfig;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Budgets and toggles fixed for the lifetime of one run.
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub max_steps: u32,
    pub max_failures: u32,
    pub max_actions_per_step: usize,
    pub use_vision: bool,
    pub use_vision_for_planner: bool,
    pub planning_interval: u32,
}

impl From<&ExecutionConfig> for ExecutionSettings {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            max_steps: config.max_steps,
            max_failures: config.max_failures,
            max_actions_per_step: config.max_actions_per_step,
            use_vision: config.use_vision,
            use_vision_for_planner: config.use_vision_for_planner,
            planning_interval: config.planning_interval,
        }
    }
}

/// Lifecycle of an executor instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorStatus {
    Idle,
    Running,
    Paused,
    Done,
    Failed,
    Cancelled,
}

impl ExecutorStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

/// Errors surfaced synchronously to callers, before or outside the step loop.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("a run is already in flight for this executor")]
    AlreadyRunning,

    #[error("no runnable task: {0}")]
    NotRunnable(String),

    #[error("cannot add follow-up task: {0}")]
    FollowUpRejected(String),
}

/// What `execute()` reports back to its direct caller. The event stream
/// carries the same information to the UI.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub status: ExecutorStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlSignal {
    Run,
    Pause,
    Cancel,
}

enum Gate {
    Continue,
    Cancelled,
}

/// Terminal outcome of the step loop, resolved into events at the end.
enum Terminal {
    Done(Option<String>),
    Failed(String),
    Cancelled { step_open: bool },
}

/// Cap on detail strings carried inside events.
const MAX_EVENT_DETAIL_CHARS: usize = 400;

fn clip(text: &str) -> String {
    if text.chars().count() <= MAX_EVENT_DETAIL_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_EVENT_DETAIL_CHARS).collect();
    format!("{cut}...")
}

pub struct Executor {
    browser: Arc<BrowserContext>,
    registry: ActionRegistry,
    navigator: NavigatorAgent,
    planner: Option<PlannerAgent>,
    validator: Option<ValidatorAgent>,
    settings: ExecutionSettings,
    history: Mutex<MessageHistory>,
    events: EventManager,
    control: watch::Sender<ControlSignal>,
    status: Mutex<ExecutorStatus>,
    running: AtomicBool,
}

impl Executor {
    pub fn new(
        task: Task,
        browser: Arc<BrowserContext>,
        registry: ActionRegistry,
        navigator: NavigatorAgent,
        planner: Option<PlannerAgent>,
        validator: Option<ValidatorAgent>,
        settings: ExecutionSettings,
    ) -> Self {
        let mut history = MessageHistory::new();
        history.start_task(task);
        let (control, _) = watch::channel(ControlSignal::Run);
        Self {
            browser,
            registry,
            navigator,
            planner,
            validator,
            settings,
            history: Mutex::new(history),
            events: EventManager::new(),
            control,
            status: Mutex::new(ExecutorStatus::Idle),
            running: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> ExecutorStatus {
        *self.status.lock()
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    pub fn browser(&self) -> &Arc<BrowserContext> {
        &self.browser
    }

    /// Register the single event listener, replacing any previous one.
    pub fn subscribe_execution_events(&self) -> UnboundedReceiver<ExecutionEvent> {
        self.events.subscribe()
    }

    pub fn clear_execution_events(&self) {
        self.events.clear();
    }

    /// Request cooperative cancellation. Safe to call at any time, any number
    /// of times; at most one `TASK_CANCEL` is emitted per run.
    pub fn cancel(&self) {
        // `send_replace` stores the signal even when no run loop is
        // subscribed yet, so a cancel issued before `execute()` sticks.
        self.control.send_replace(ControlSignal::Cancel);
    }

    /// Suspend step progression at the next safe point. No-op unless running.
    pub fn pause(&self) {
        self.control.send_if_modified(|signal| {
            if *signal == ControlSignal::Run {
                *signal = ControlSignal::Pause;
                true
            } else {
                false
            }
        });
    }

    /// Clear a pause. No-op unless paused (never un-cancels).
    pub fn resume(&self) {
        self.control.send_if_modified(|signal| {
            if *signal == ControlSignal::Pause {
                *signal = ControlSignal::Run;
                true
            } else {
                false
            }
        });
    }

    /// Append a follow-up task. Valid only after the previous run finished
    /// with `TASK_OK` or `TASK_FAIL`; re-arms the executor for a new
    /// `execute()` call without resetting history.
    pub fn add_follow_up_task(&self, text: impl Into<String>) -> Result<Task, ExecutorError> {
        let mut status = self.status.lock();
        match *status {
            ExecutorStatus::Done | ExecutorStatus::Failed => {
                let task = Task::new(text);
                self.history.lock().add_follow_up(task.clone());
                *status = ExecutorStatus::Idle;
                // Re-arm any leftover pause so the next run starts cleanly;
                // `send_replace` works even with no live receiver.
                self.control.send_replace(ControlSignal::Run);
                Ok(task)
            }
            ExecutorStatus::Running | ExecutorStatus::Paused => Err(
                ExecutorError::FollowUpRejected("a run is still in progress".into()),
            ),
            ExecutorStatus::Idle => Err(ExecutorError::FollowUpRejected(
                "the current task has not been executed yet".into(),
            )),
            ExecutorStatus::Cancelled => Err(ExecutorError::FollowUpRejected(
                "the previous run was cancelled; start a new task".into(),
            )),
        }
    }

    /// Release the browser resources tied to this task. Idempotent and valid
    /// from any state.
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        self.browser.cleanup().await
    }

    /// Run the step loop to a terminal state. At most one run may be in
    /// flight per instance; a second concurrent call is rejected.
    pub async fn execute(&self) -> Result<RunSummary, ExecutorError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ExecutorError::AlreadyRunning);
        }
        if self.status().is_terminal() {
            self.running.store(false, Ordering::SeqCst);
            return Err(ExecutorError::NotRunnable(
                "task already finished; add a follow-up task first".into(),
            ));
        }

        *self.status.lock() = ExecutorStatus::Running;
        let summary = self.run_loop().await;
        *self.status.lock() = summary.status;
        self.running.store(false, Ordering::SeqCst);
        Ok(summary)
    }

    // ── step loop ────────────────────────────────────────────────

    async fn run_loop(&self) -> RunSummary {
        let mut rx = self.control.subscribe();
        let task_text = self
            .history
            .lock()
            .current_task()
            .map(|t| t.text.clone())
            .unwrap_or_default();

        self.emit(Actor::System, ExecutionState::TaskStart, 0, Some(clip(&task_text)));
        info!(task = %clip(&task_text), max_steps = self.settings.max_steps, "Task started");

        let mut step: u32 = 0;
        let mut consecutive_failures: u32 = 0;
        let mut terminal: Option<Terminal> = None;

        while step < self.settings.max_steps {
            if matches!(self.checkpoint(&mut rx, step).await, Gate::Cancelled) {
                terminal = Some(Terminal::Cancelled { step_open: false });
                break;
            }

            // Periodic planning, always including the very first step.
            if self.planner.is_some() && step % self.settings.planning_interval == 0 {
                match self.run_planner(step).await {
                    PlannerStep::Continue => {}
                    PlannerStep::Done(answer) => {
                        terminal = Some(Terminal::Done(answer));
                        break;
                    }
                    PlannerStep::Failed(reason) => {
                        consecutive_failures += 1;
                        if consecutive_failures > self.settings.max_failures {
                            terminal = Some(Terminal::Failed(format!(
                                "exceeded failure budget ({}): {reason}",
                                self.settings.max_failures
                            )));
                            break;
                        }
                        continue;
                    }
                }
                if matches!(self.checkpoint(&mut rx, step).await, Gate::Cancelled) {
                    terminal = Some(Terminal::Cancelled { step_open: false });
                    break;
                }
            }

            match self.run_navigator_step(&mut rx, step).await {
                StepResult::Progress => {
                    consecutive_failures = 0;
                    step += 1;
                }
                StepResult::Done { success, details } => {
                    if success {
                        terminal = Some(Terminal::Done(details));
                    } else {
                        terminal = Some(Terminal::Failed(details.unwrap_or_else(|| {
                            "navigator reported the task cannot be completed".into()
                        })));
                    }
                    break;
                }
                StepResult::Failed(reason) => {
                    consecutive_failures += 1;
                    // Failure budget takes precedence over the step budget:
                    // break before the loop condition can reclassify this run.
                    if consecutive_failures > self.settings.max_failures {
                        terminal = Some(Terminal::Failed(format!(
                            "exceeded failure budget ({}): {reason}",
                            self.settings.max_failures
                        )));
                        break;
                    }
                    step += 1;
                }
                StepResult::Cancelled => {
                    terminal = Some(Terminal::Cancelled { step_open: true });
                    break;
                }
            }
        }

        let terminal = terminal.unwrap_or_else(|| {
            Terminal::Failed(format!(
                "reached maximum steps ({}) without completing the task",
                self.settings.max_steps
            ))
        });

        match terminal {
            Terminal::Done(details) => {
                let details = details.unwrap_or_else(|| "task completed".into());
                self.emit(Actor::System, ExecutionState::TaskOk, step, Some(clip(&details)));
                info!(steps = step, "Task completed");
                RunSummary {
                    status: ExecutorStatus::Done,
                    details: Some(details),
                }
            }
            Terminal::Failed(details) => {
                self.emit(Actor::System, ExecutionState::TaskFail, step, Some(clip(&details)));
                warn!(steps = step, error = %details, "Task failed");
                RunSummary {
                    status: ExecutorStatus::Failed,
                    details: Some(details),
                }
            }
            Terminal::Cancelled { step_open } => {
                if step_open {
                    self.emit(Actor::Navigator, ExecutionState::StepCancel, step, None);
                }
                self.emit(Actor::System, ExecutionState::TaskCancel, step, None);
                info!(steps = step, "Task cancelled");
                RunSummary {
                    status: ExecutorStatus::Cancelled,
                    details: None,
                }
            }
        }
    }

    /// Observe pause/cancel at a safe point. Blocks while paused without
    /// consuming any budget; pause events are emitted exactly when the loop
    /// observes the transition.
    async fn checkpoint(&self, rx: &mut watch::Receiver<ControlSignal>, step: u32) -> Gate {
        // Copy the signal out so the watch guard is dropped before awaiting.
        let signal = *rx.borrow();
        match signal {
            ControlSignal::Run => Gate::Continue,
            ControlSignal::Cancel => Gate::Cancelled,
            ControlSignal::Pause => {
                *self.status.lock() = ExecutorStatus::Paused;
                self.emit(Actor::System, ExecutionState::TaskPause, step, None);
                loop {
                    if rx.changed().await.is_err() {
                        // Sender half lives in self; closure means teardown.
                        return Gate::Cancelled;
                    }
                    let signal = *rx.borrow();
                    match signal {
                        ControlSignal::Pause => {}
                        ControlSignal::Cancel => return Gate::Cancelled,
                        ControlSignal::Run => {
                            *self.status.lock() = ExecutorStatus::Running;
                            self.emit(Actor::System, ExecutionState::TaskResume, step, None);
                            return Gate::Continue;
                        }
                    }
                }
            }
        }
    }

    async fn run_planner(&self, step: u32) -> PlannerStep {
        let Some(planner) = &self.planner else {
            return PlannerStep::Continue;
        };
        self.emit(Actor::Planner, ExecutionState::StepStart, step, None);
        let ctx = self
            .agent_context(self.settings.use_vision_for_planner)
            .await;
        match planner.run(&ctx).await {
            Ok(output) => match output.verdict() {
                PlannerVerdict::Done => {
                    let answer = output.final_answer.clone().or_else(|| {
                        Some(output.observation.clone()).filter(|o| !o.is_empty())
                    });
                    self.emit(
                        Actor::Planner,
                        ExecutionState::StepOk,
                        step,
                        Some(clip(&output.plan_text())),
                    );
                    PlannerStep::Done(answer)
                }
                PlannerVerdict::Blocked => {
                    let reason = if output.observation.is_empty() {
                        "planner reports the task is blocked".to_string()
                    } else {
                        format!("planner blocked: {}", output.observation)
                    };
                    self.emit(
                        Actor::Planner,
                        ExecutionState::StepFail,
                        step,
                        Some(clip(&reason)),
                    );
                    PlannerStep::Failed(reason)
                }
                PlannerVerdict::Continue => {
                    let plan = output.plan_text();
                    if !plan.is_empty() {
                        self.history.lock().record_plan(&plan);
                    }
                    self.emit(Actor::Planner, ExecutionState::StepOk, step, Some(clip(&plan)));
                    PlannerStep::Continue
                }
            },
            Err(e) => {
                let reason = format!("planner error: {e:#}");
                self.emit(
                    Actor::Planner,
                    ExecutionState::StepFail,
                    step,
                    Some(clip(&reason)),
                );
                PlannerStep::Failed(reason)
            }
        }
    }

    async fn run_navigator_step(
        &self,
        rx: &mut watch::Receiver<ControlSignal>,
        step: u32,
    ) -> StepResult {
        self.emit(Actor::Navigator, ExecutionState::StepStart, step, None);

        let ctx = self.agent_context(self.settings.use_vision).await;
        let decision = match self.navigator.run(&ctx).await {
            Ok(decision) => decision,
            Err(e) => {
                let reason = format!("navigator error: {e:#}");
                return self.fail_step(step, reason, Vec::new());
            }
        };

        if matches!(self.checkpoint(rx, step).await, Gate::Cancelled) {
            return StepResult::Cancelled;
        }

        if decision.actions.is_empty() {
            // No proposed actions means no progress; unified with every other
            // non-progress failure.
            return self.fail_step(step, "navigator proposed no actions".into(), Vec::new());
        }

        debug!(
            step,
            goal = decision.next_goal.as_deref().unwrap_or(""),
            actions = decision.actions.len(),
            "Executing navigator actions"
        );

        let mut records: Vec<ActionRecord> = Vec::new();
        let mut done: Option<(bool, Option<String>)> = None;

        for call in &decision.actions {
            if matches!(self.checkpoint(rx, step).await, Gate::Cancelled) {
                return StepResult::Cancelled;
            }
            self.emit(
                Actor::Navigator,
                ExecutionState::ActStart,
                step,
                Some(call.name.clone()),
            );
            match self.registry.dispatch(&self.browser, call).await {
                Ok(outcome) => {
                    let detail = outcome.extracted_content.clone();
                    self.emit(
                        Actor::Navigator,
                        ExecutionState::ActOk,
                        step,
                        detail.as_deref().map(clip),
                    );
                    records.push(ActionRecord {
                        name: call.name.clone(),
                        ok: true,
                        detail: detail.clone(),
                    });
                    if outcome.is_done {
                        done = Some((outcome.success, detail));
                        break;
                    }
                }
                Err(e) => {
                    let reason = format!("{} failed: {e}", call.name);
                    self.emit(
                        Actor::Navigator,
                        ExecutionState::ActFail,
                        step,
                        Some(clip(&reason)),
                    );
                    records.push(ActionRecord {
                        name: call.name.clone(),
                        ok: false,
                        detail: Some(e.to_string()),
                    });
                    return self.fail_step(step, reason, records);
                }
            }
        }

        if let Some((success, details)) = done {
            self.history.lock().record_step(StepRecord {
                step_index: step,
                actions: records,
                outcome: StepOutcome::Done { success },
            });

            if !success {
                self.emit(Actor::Navigator, ExecutionState::StepOk, step, None);
                return StepResult::Done {
                    success: false,
                    details,
                };
            }

            // Validator gates the success claim to prevent premature
            // completion on a hallucinated result.
            if let Some(validator) = &self.validator {
                let mut ctx = self.agent_context(self.settings.use_vision).await;
                ctx.task_digest.push_str(&format!(
                    "\nNavigator claims completion with result: {}\n",
                    details.as_deref().unwrap_or("(no result text)")
                ));
                match validator.run(&ctx).await {
                    Ok(verdict) if verdict.is_valid => {
                        self.emit(
                            Actor::Validator,
                            ExecutionState::StepOk,
                            step,
                            Some(clip(&verdict.reason)),
                        );
                        let final_details = verdict.answer.or(details);
                        self.emit(Actor::Navigator, ExecutionState::StepOk, step, None);
                        return StepResult::Done {
                            success: true,
                            details: final_details,
                        };
                    }
                    Ok(verdict) => {
                        let reason = format!("validation rejected: {}", verdict.reason);
                        self.emit(
                            Actor::Validator,
                            ExecutionState::StepFail,
                            step,
                            Some(clip(&reason)),
                        );
                        self.history.lock().record_step(StepRecord {
                            step_index: step,
                            actions: Vec::new(),
                            outcome: StepOutcome::Failure(reason.clone()),
                        });
                        return StepResult::Failed(reason);
                    }
                    Err(e) => {
                        let reason = format!("validator error: {e:#}");
                        self.emit(
                            Actor::Validator,
                            ExecutionState::StepFail,
                            step,
                            Some(clip(&reason)),
                        );
                        return StepResult::Failed(reason);
                    }
                }
            }

            self.emit(Actor::Navigator, ExecutionState::StepOk, step, None);
            return StepResult::Done {
                success: true,
                details,
            };
        }

        self.history.lock().record_step(StepRecord {
            step_index: step,
            actions: records,
            outcome: StepOutcome::Success,
        });
        self.emit(Actor::Navigator, ExecutionState::StepOk, step, None);
        StepResult::Progress
    }

    fn fail_step(&self, step: u32, reason: String, records: Vec<ActionRecord>) -> StepResult {
        self.emit(
            Actor::Navigator,
            ExecutionState::StepFail,
            step,
            Some(clip(&reason)),
        );
        self.history.lock().record_step(StepRecord {
            step_index: step,
            actions: records,
            outcome: StepOutcome::Failure(reason.clone()),
        });
        StepResult::Failed(reason)
    }

    async fn agent_context(&self, with_screenshot: bool) -> AgentContext {
        let task_digest = self.history.lock().prompt_digest();
        let page_block = match self.browser.page_state().await {
            Ok(state) => state.to_prompt_block(),
            Err(e) => format!("Browser state unavailable: {e:#}\n"),
        };
        let screenshot = if with_screenshot {
            match self.browser.take_screenshot().await {
                Ok(shot) => Some(shot),
                Err(e) => {
                    debug!(error = %e, "Screenshot unavailable; continuing without vision");
                    None
                }
            }
        } else {
            None
        };
        AgentContext {
            task_digest,
            page_block,
            screenshot,
        }
    }

    fn emit(&self, actor: Actor, state: ExecutionState, step: u32, details: Option<String>) {
        let task_id = self
            .history
            .lock()
            .current_task()
            .map(|t| t.id.clone())
            .unwrap_or_default();
        self.events.emit(ExecutionEvent::new(
            actor,
            state,
            EventData {
                task_id,
                step,
                max_steps: self.settings.max_steps,
                details,
            },
        ));
    }
}

enum PlannerStep {
    Continue,
    Done(Option<String>),
    Failed(String),
}

enum StepResult {
    Progress,
    Done {
        success: bool,
        details: Option<String>,
    },
    Failed(String),
    Cancelled,
}

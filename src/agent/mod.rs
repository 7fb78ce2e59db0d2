//! Multi-agent task execution: planner, navigator and validator roles
//! coordinated by the [`Executor`] state machine.

pub mod base;
pub mod events;
pub mod executor;
pub mod history;
pub mod navigator;
pub mod planner;
pub mod validator;


pub use events::{Actor, EventData, ExecutionEvent, ExecutionState};
pub use executor::{ExecutionSettings, Executor, ExecutorError, ExecutorStatus, RunSummary};
pub use history::Task;

use crate::actions::default_actions;
use crate::agent::base::RoleLlm;
use crate::agent::navigator::NavigatorAgent;
use crate::agent::planner::PlannerAgent;
use crate::agent::validator::ValidatorAgent;
use crate::browser::BrowserContext;
use crate::config::{Config, ModelRole};
use crate::providers::Provider;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Wire a ready-to-run executor from configuration.
///
/// Fails synchronously (before any event is emitted) when the configuration
/// cannot yield a working navigator, so callers can surface setup problems
/// on their own channel rather than through the task event stream.
pub fn build_executor(
    config: &Config,
    provider: Arc<dyn Provider>,
    browser: Arc<BrowserContext>,
    task: Task,
) -> Result<Executor> {
    let navigator_model = config
        .model_for_role(ModelRole::Navigator)
        .context("no model configured for the navigator")?;
    let temperature = config.temperature;

    let registry = default_actions();
    let navigator = NavigatorAgent::new(
        RoleLlm::new(provider.clone(), navigator_model, temperature),
        registry.prompt_instructions(),
        config.execution.max_actions_per_step,
        config.execution.use_vision,
    );

    let planner = if config.execution.enable_planner {
        let model = config
            .model_for_role(ModelRole::Planner)
            .context("planner enabled but no model configured for it")?;
        Some(PlannerAgent::new(
            RoleLlm::new(provider.clone(), model, temperature),
            config.execution.use_vision_for_planner,
        ))
    } else {
        None
    };

    let validator = if config.execution.enable_validator {
        let model = config
            .model_for_role(ModelRole::Validator)
            .context("validator enabled but no model configured for it")?;
        Some(ValidatorAgent::new(
            RoleLlm::new(provider, model, temperature),
            config.execution.use_vision,
        ))
    } else {
        None
    };

    Ok(Executor::new(
        task,
        browser,
        registry,
        navigator,
        planner,
        validator,
        ExecutionSettings::from(&config.execution),
    ))
}

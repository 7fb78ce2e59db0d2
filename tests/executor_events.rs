//! End-to-end executor tests through the public crate API.
//!
//! Wires `build_executor` with a scripted provider and a stub WebDriver, then
//! asserts on the observable contract a UI depends on: the event stream, its
//! wire format, and the run summary.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use webpilot::agent::{build_executor, Actor, ExecutionState, ExecutorStatus, Task};
use webpilot::browser::{BrowserContext, WebDriver};
use webpilot::config::Config;
use webpilot::providers::{ChatMessage, Provider};

/// WebDriver stub that records navigation and answers everything else
/// with fixed values.
struct StubDriver {
    visited: Mutex<Vec<String>>,
}

impl StubDriver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            visited: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl WebDriver for StubDriver {
    async fn goto(&self, url: &str) -> anyhow::Result<()> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }
    async fn back(&self) -> anyhow::Result<()> {
        Ok(())
    }
    async fn current_url(&self) -> anyhow::Result<String> {
        Ok(self
            .visited
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_else(|| "about:blank".into()))
    }
    async fn title(&self) -> anyhow::Result<String> {
        Ok("Stub Page".into())
    }
    async fn click(&self, _selector: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn type_text(
        &self,
        _selector: &str,
        _text: &str,
        _clear_first: bool,
    ) -> anyhow::Result<()> {
        Ok(())
    }
    async fn element_text(&self, _selector: &str) -> anyhow::Result<String> {
        Ok("Rust is a systems programming language.".into())
    }
    async fn scroll_by(&self, _delta_y: i64) -> anyhow::Result<()> {
        Ok(())
    }
    async fn screenshot(&self) -> anyhow::Result<Vec<u8>> {
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }
    async fn windows(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec!["w0".into()])
    }
    async fn current_window(&self) -> anyhow::Result<String> {
        Ok("w0".into())
    }
    async fn switch_to_window(&self, _handle: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn new_window(&self) -> anyhow::Result<String> {
        Ok("w1".into())
    }
    async fn close_window(&self, _handle: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn close_session(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Provider returning canned replies in order, then repeating the last one.
struct CannedProvider {
    replies: Vec<&'static str>,
    calls: AtomicUsize,
}

impl CannedProvider {
    fn new(replies: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            replies,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Provider for CannedProvider {
    async fn chat_with_history(
        &self,
        _messages: &[ChatMessage],
        _model: &str,
        _temperature: f64,
    ) -> anyhow::Result<String> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .get(index)
            .or_else(|| self.replies.last())
            .ok_or_else(|| anyhow::anyhow!("no canned reply"))?;
        Ok((*reply).to_string())
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.model = Some("canned-model".into());
    config.execution.enable_planner = false;
    config.execution.enable_validator = false;
    config.execution.use_vision = false;
    config
}

#[tokio::test]
async fn navigate_then_extract_then_done_visits_the_page() {
    let driver = StubDriver::new();
    let browser = Arc::new(BrowserContext::new(driver.clone()));
    let provider = CannedProvider::new(vec![
        r#"{"evaluation":"start","next_goal":"open the page","actions":[
            {"name":"navigate","args":{"url":"https://www.rust-lang.org/"}}]}"#,
        r#"{"evaluation":"page open","next_goal":"read it","actions":[
            {"name":"extract","args":{"selector":"body"}},
            {"name":"done","args":{"success":true,"text":"Rust is a systems programming language."}}]}"#,
    ]);

    let executor = build_executor(
        &test_config(),
        provider,
        browser,
        Task::new("what is Rust?"),
    )
    .expect("wiring should succeed");

    let summary = executor.execute().await.expect("run should start");

    assert_eq!(summary.status, ExecutorStatus::Done);
    assert_eq!(
        summary.details.as_deref(),
        Some("Rust is a systems programming language.")
    );
    assert_eq!(
        driver.visited.lock().unwrap().as_slice(),
        ["https://www.rust-lang.org/"]
    );
}

#[tokio::test]
async fn events_serialize_with_screaming_snake_tags() {
    let browser = Arc::new(BrowserContext::new(StubDriver::new()));
    let provider = CannedProvider::new(vec![
        r#"{"evaluation":"","next_goal":"","actions":[{"name":"done","args":{"success":true,"text":"ok"}}]}"#,
    ]);

    let executor = build_executor(&test_config(), provider, browser, Task::new("t"))
        .expect("wiring should succeed");
    let mut rx = executor.subscribe_execution_events();
    executor.execute().await.expect("run should start");

    let mut states = Vec::new();
    while let Ok(event) = rx.try_recv() {
        let json = serde_json::to_value(&event).expect("events must serialize");
        states.push(json["state"].as_str().expect("state is a string").to_string());
        assert!(json["data"]["task_id"].is_string());
        assert!(json["data"]["max_steps"].is_u64());
    }

    assert_eq!(
        states,
        ["TASK_START", "STEP_START", "ACT_START", "ACT_OK", "STEP_OK", "TASK_OK"]
    );
}

#[tokio::test]
async fn task_events_always_come_from_the_system_actor() {
    let browser = Arc::new(BrowserContext::new(StubDriver::new()));
    let provider = CannedProvider::new(vec![
        r#"{"evaluation":"","next_goal":"","actions":[{"name":"done","args":{"success":false,"text":"cannot"}}]}"#,
    ]);

    let executor = build_executor(&test_config(), provider, browser, Task::new("t"))
        .expect("wiring should succeed");
    let mut rx = executor.subscribe_execution_events();
    executor.execute().await.expect("run should start");

    while let Ok(event) = rx.try_recv() {
        if matches!(
            event.state,
            ExecutionState::TaskStart
                | ExecutionState::TaskOk
                | ExecutionState::TaskFail
                | ExecutionState::TaskCancel
        ) {
            assert_eq!(event.actor, Actor::System);
        }
    }
}

#[tokio::test]
async fn cancelled_run_emits_no_step_events() {
    let browser = Arc::new(BrowserContext::new(StubDriver::new()));
    let provider = CannedProvider::new(vec![
        r#"{"evaluation":"","next_goal":"","actions":[{"name":"go_back","args":{}}]}"#,
    ]);

    let executor = build_executor(&test_config(), provider, browser, Task::new("t"))
        .expect("wiring should succeed");
    let mut rx = executor.subscribe_execution_events();

    executor.cancel();
    let summary = executor.execute().await.expect("run should start");
    assert_eq!(summary.status, ExecutorStatus::Cancelled);

    while let Ok(event) = rx.try_recv() {
        assert!(
            !matches!(event.state, ExecutionState::StepStart),
            "no step should start after cancellation"
        );
    }
}

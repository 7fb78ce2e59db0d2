//! WebSocket task-control handler.
//!
//! Protocol:
//! ```text
//! Client -> Server: {"type":"heartbeat"}
//! Client -> Server: {"type":"new_task","task":"find the cheapest flight"}
//! Client -> Server: {"type":"follow_up_task","task":"now book it"}
//! Client -> Server: {"type":"cancel_task"} | {"type":"pause_task"} | {"type":"resume_task"}
//! Client -> Server: {"type":"screenshot"} | {"type":"state"}
//! Server -> Client: {"type":"execution_event","event":{...}}
//! Server -> Client: {"type":"ack",...} | {"type":"error","message":"..."}
//! ```

use super::AppState;
use crate::agent::{build_executor, Executor, Task};
use crate::browser::{BrowserContext, FantocciniDriver};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// GET /ws — WebSocket upgrade for task control.
pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Events and replies are written by different tasks; funnel everything
    // through one channel so the sink has a single writer.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::new(state, out_tx);

    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            _ => continue,
        };
        session.handle(&text).await;
    }

    session.shutdown().await;
    writer.abort();
}

/// Per-connection task state: at most one executor at a time.
struct Session {
    state: AppState,
    out: UnboundedSender<String>,
    executor: Option<Arc<Executor>>,
    run_handle: Option<JoinHandle<()>>,
    forward_handle: Option<JoinHandle<()>>,
}

impl Session {
    fn new(state: AppState, out: UnboundedSender<String>) -> Self {
        Self {
            state,
            out,
            executor: None,
            run_handle: None,
            forward_handle: None,
        }
    }

    async fn handle(&mut self, text: &str) {
        let parsed: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(_) => {
                self.send_error("invalid JSON");
                return;
            }
        };

        let msg_type = parsed["type"].as_str().unwrap_or("");
        match msg_type {
            "heartbeat" => self.send(serde_json::json!({"type": "heartbeat_ack"})),
            "new_task" => self.handle_new_task(&parsed).await,
            "follow_up_task" => self.handle_follow_up(&parsed),
            "cancel_task" => self.with_executor("cancel_task", |e| e.cancel()),
            "pause_task" => self.with_executor("pause_task", |e| e.pause()),
            "resume_task" => self.with_executor("resume_task", |e| e.resume()),
            "screenshot" => self.handle_screenshot(&parsed).await,
            "close_tab" => self.handle_close_tab(&parsed).await,
            "state" => self.handle_state(),
            other => self.send_error(&format!("unknown message type: {other}")),
        }
    }

    async fn handle_new_task(&mut self, parsed: &serde_json::Value) {
        let Some(task_text) = parsed["task"].as_str().filter(|t| !t.trim().is_empty()) else {
            self.send_error("new_task requires a non-empty \"task\" field");
            return;
        };
        if self.is_busy() {
            self.send_error("a task is already running; cancel it first");
            return;
        }

        // Replacing a finished executor tears down its browser session.
        self.teardown_current().await;

        let browser = &self.state.config.browser;
        let driver = match FantocciniDriver::connect(
            &browser.webdriver_url,
            browser.headless,
            browser.binary_path.as_deref(),
        )
        .await
        {
            Ok(driver) => driver,
            Err(e) => {
                self.send_error(&format!("browser session failed: {e:#}"));
                return;
            }
        };
        let browser = Arc::new(BrowserContext::new(Arc::new(driver)));

        // The client may supply its own task id for correlation.
        let task = match parsed["task_id"].as_str().filter(|id| !id.is_empty()) {
            Some(id) => Task::with_id(id, task_text),
            None => Task::new(task_text),
        };
        let executor = match build_executor(
            &self.state.config,
            self.state.provider.clone(),
            browser,
            task.clone(),
        ) {
            Ok(executor) => Arc::new(executor),
            Err(e) => {
                self.send_error(&format!("setup failed: {e:#}"));
                return;
            }
        };

        self.attach(executor);
        self.send(serde_json::json!({"type": "ack", "command": "new_task", "task_id": task.id}));
        self.spawn_run();
    }

    fn handle_follow_up(&mut self, parsed: &serde_json::Value) {
        let Some(task_text) = parsed["task"].as_str().filter(|t| !t.trim().is_empty()) else {
            self.send_error("follow_up_task requires a non-empty \"task\" field");
            return;
        };
        let Some(executor) = self.executor.clone() else {
            self.send_error("no task to follow up on");
            return;
        };
        match executor.add_follow_up_task(task_text) {
            Ok(task) => {
                self.send(serde_json::json!({
                    "type": "ack", "command": "follow_up_task", "task_id": task.id,
                }));
                self.spawn_forward(&executor);
                self.spawn_run();
            }
            Err(e) => self.send_error(&e.to_string()),
        }
    }

    async fn handle_screenshot(&mut self, parsed: &serde_json::Value) {
        let Some(executor) = &self.executor else {
            self.send_error("no active task");
            return;
        };
        let browser = executor.browser();
        let shot = match parsed["tab_id"].as_str().filter(|id| !id.is_empty()) {
            Some(tab_id) => browser.take_screenshot_of(tab_id).await,
            None => browser.take_screenshot().await,
        };
        match shot {
            Ok(png_base64) => {
                self.send(serde_json::json!({"type": "screenshot", "data": png_base64}));
            }
            Err(e) => self.send_error(&format!("screenshot failed: {e:#}")),
        }
    }

    /// Close a tab the UI no longer wants tracked.
    async fn handle_close_tab(&mut self, parsed: &serde_json::Value) {
        let Some(tab_id) = parsed["tab_id"].as_str().filter(|id| !id.is_empty()) else {
            self.send_error("close_tab requires a \"tab_id\" field");
            return;
        };
        let Some(executor) = &self.executor else {
            self.send_error("no active task");
            return;
        };
        match executor.browser().remove_attached_page(tab_id).await {
            Ok(()) => self.send(serde_json::json!({"type": "ack", "command": "close_tab"})),
            Err(e) => self.send_error(&format!("close_tab failed: {e:#}")),
        }
    }

    fn handle_state(&mut self) {
        let status = self.executor.as_ref().map(|e| e.status());
        let label = match status {
            None => "idle",
            Some(s) => status_label(s),
        };
        self.send(serde_json::json!({"type": "state", "status": label}));
    }

    fn with_executor(&mut self, command: &str, f: impl FnOnce(&Executor)) {
        match self.executor.clone() {
            Some(executor) => {
                f(&executor);
                self.send(serde_json::json!({"type": "ack", "command": command}));
            }
            None => self.send_error("no active task"),
        }
    }

    fn is_busy(&self) -> bool {
        self.executor
            .as_ref()
            .is_some_and(|e| !e.status().is_terminal() && self.run_in_flight())
    }

    fn run_in_flight(&self) -> bool {
        self.run_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn attach(&mut self, executor: Arc<Executor>) {
        self.spawn_forward(&executor);
        self.executor = Some(executor);
    }

    /// Forward execution events to the socket until a terminal event closes
    /// the stream for this run. Re-subscribing replaces any previous
    /// forwarder, matching the single-listener event contract.
    fn spawn_forward(&mut self, executor: &Arc<Executor>) {
        if let Some(handle) = self.forward_handle.take() {
            handle.abort();
        }
        let mut rx = executor.subscribe_execution_events();
        let out = self.out.clone();
        self.forward_handle = Some(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                debug!(event = %event.describe(), "Forwarding execution event");
                let is_terminal = event.state.is_terminal();
                let payload = serde_json::json!({"type": "execution_event", "event": event});
                if out.send(payload.to_string()).is_err() {
                    break;
                }
                if is_terminal {
                    break;
                }
            }
        }));
    }

    fn spawn_run(&mut self) {
        let Some(executor) = self.executor.clone() else {
            return;
        };
        let out = self.out.clone();
        self.run_handle = Some(tokio::spawn(async move {
            if let Err(e) = executor.execute().await {
                let _ = out.send(
                    serde_json::json!({"type": "error", "message": e.to_string()}).to_string(),
                );
            }
        }));
    }

    /// Cancel the in-flight run (if any) and release its browser session.
    /// WebDriver sessions cannot be re-attached, so teardown is deferred to
    /// task replacement or disconnect rather than the terminal event.
    async fn teardown_current(&mut self) {
        if let Some(handle) = self.forward_handle.take() {
            handle.abort();
        }
        if let Some(executor) = self.executor.take() {
            executor.cancel();
            if let Some(handle) = self.run_handle.take() {
                let _ = handle.await;
            }
            if let Err(e) = executor.cleanup().await {
                warn!(error = %e, "Browser cleanup failed");
            }
        }
    }

    async fn shutdown(&mut self) {
        self.teardown_current().await;
    }

    fn send(&self, value: serde_json::Value) {
        let _ = self.out.send(value.to_string());
    }

    fn send_error(&self, message: &str) {
        self.send(serde_json::json!({"type": "error", "message": message}));
    }
}

fn status_label(status: crate::agent::ExecutorStatus) -> &'static str {
    use crate::agent::ExecutorStatus::{Cancelled, Done, Failed, Idle, Paused, Running};
    match status {
        Idle => "idle",
        Running => "running",
        Paused => "paused",
        Done => "done",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

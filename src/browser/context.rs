use crate::browser::driver::WebDriver;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Snapshot of the browser used to build agent prompts.
#[derive(Debug, Clone)]
pub struct PageState {
    pub url: String,
    pub title: String,
    pub tabs: Vec<String>,
}

impl PageState {
    /// Render for inclusion in an LLM prompt.
    pub fn to_prompt_block(&self) -> String {
        let mut block = format!("Current page: {} ({})\n", self.title, self.url);
        if self.tabs.len() > 1 {
            block.push_str(&format!("Open tabs: {}\n", self.tabs.join(", ")));
        }
        block
    }
}

/// Owns the set of attached browser tabs for the duration of one task.
///
/// Exactly one executor owns a context at a time; `cleanup()` is the only
/// sanctioned release path and is idempotent. Tabs opened during the task are
/// tracked so cleanup can close them without touching pre-existing windows.
pub struct BrowserContext {
    driver: Arc<dyn WebDriver>,
    /// Windows opened by this task, candidates for closing on cleanup.
    opened_tabs: Mutex<Vec<String>>,
    cleaned: AtomicBool,
}

impl BrowserContext {
    pub fn new(driver: Arc<dyn WebDriver>) -> Self {
        Self {
            driver,
            opened_tabs: Mutex::new(Vec::new()),
            cleaned: AtomicBool::new(false),
        }
    }

    pub async fn navigate_to(&self, url: &str) -> Result<()> {
        self.driver.goto(url).await
    }

    pub async fn go_back(&self) -> Result<()> {
        self.driver.back().await
    }

    pub async fn click(&self, selector: &str) -> Result<()> {
        self.driver.click(selector).await
    }

    pub async fn input_text(&self, selector: &str, text: &str, clear_first: bool) -> Result<()> {
        self.driver.type_text(selector, text, clear_first).await
    }

    pub async fn scroll_by(&self, delta_y: i64) -> Result<()> {
        self.driver.scroll_by(delta_y).await
    }

    /// Text content of the whole page, or of one element when a selector is
    /// given.
    pub async fn extract_text(&self, selector: Option<&str>) -> Result<String> {
        self.driver.element_text(selector.unwrap_or("body")).await
    }

    /// Switch focus to an already-attached tab.
    pub async fn switch_tab(&self, tab_id: &str) -> Result<()> {
        let known = self.driver.windows().await?;
        if !known.iter().any(|h| h == tab_id) {
            anyhow::bail!("No attached tab with id {tab_id}");
        }
        self.driver.switch_to_window(tab_id).await
    }

    /// Open a new tab at `url`, switch to it, and return its id.
    pub async fn open_tab(&self, url: &str) -> Result<String> {
        let handle = self.driver.new_window().await?;
        self.driver.switch_to_window(&handle).await?;
        self.driver.goto(url).await?;
        self.opened_tabs.lock().push(handle.clone());
        Ok(handle)
    }

    /// Forget (and close) a tab, e.g. when the UI reports it was closed.
    pub async fn remove_attached_page(&self, tab_id: &str) -> Result<()> {
        self.opened_tabs.lock().retain(|h| h != tab_id);
        let known = self.driver.windows().await?;
        if known.iter().any(|h| h == tab_id) {
            self.driver.close_window(tab_id).await?;
        }
        Ok(())
    }

    /// Base64-encoded PNG of the current viewport.
    pub async fn take_screenshot(&self) -> Result<String> {
        let png = self.driver.screenshot().await?;
        Ok(BASE64.encode(png))
    }

    /// Screenshot of a specific tab, restoring focus afterwards.
    pub async fn take_screenshot_of(&self, tab_id: &str) -> Result<String> {
        let current = self.driver.current_window().await?;
        self.switch_tab(tab_id).await?;
        let shot = self.take_screenshot().await;
        if current != tab_id {
            let _ = self.driver.switch_to_window(&current).await;
        }
        shot
    }

    pub async fn page_state(&self) -> Result<PageState> {
        Ok(PageState {
            url: self.driver.current_url().await?,
            title: self.driver.title().await?,
            tabs: self.driver.windows().await?,
        })
    }

    /// Release browser resources tied to this task. Safe to call repeatedly;
    /// only the first call does work.
    pub async fn cleanup(&self) -> Result<()> {
        if self.cleaned.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let opened: Vec<String> = std::mem::take(&mut *self.opened_tabs.lock());
        for handle in opened {
            if let Err(e) = self.driver.close_window(&handle).await {
                tracing::debug!(tab = %handle, error = %e, "Failed to close tab during cleanup");
            }
        }
        self.driver
            .close_session()
            .await
            .context("Failed to release browser session")
    }
}

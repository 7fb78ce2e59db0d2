//! WebDriver abstraction.
//!
//! [`WebDriver`] is the seam between the execution engine and the real
//! browser: production uses the fantoccini implementation below, tests plug
//! in scripted mocks. All methods surface failures as `anyhow` errors that
//! the action layer converts into typed action failures.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::wd::WindowHandle;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// How long to wait for an element lookup before reporting a timeout.
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait WebDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;
    async fn back(&self) -> Result<()>;
    async fn current_url(&self) -> Result<String>;
    async fn title(&self) -> Result<String>;
    async fn click(&self, selector: &str) -> Result<()>;
    /// Type into the element matched by `selector`, clearing it first when
    /// `clear_first` is set.
    async fn type_text(&self, selector: &str, text: &str, clear_first: bool) -> Result<()>;
    async fn element_text(&self, selector: &str) -> Result<String>;
    async fn scroll_by(&self, delta_y: i64) -> Result<()>;
    /// PNG bytes of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;
    async fn windows(&self) -> Result<Vec<String>>;
    async fn current_window(&self) -> Result<String>;
    async fn switch_to_window(&self, handle: &str) -> Result<()>;
    /// Open a new tab and return its window handle (without switching to it).
    async fn new_window(&self) -> Result<String>;
    /// Close the window `handle`, leaving focus on another remaining window.
    async fn close_window(&self, handle: &str) -> Result<()>;
    /// Tear down the WebDriver session. Must be safe to call more than once.
    async fn close_session(&self) -> Result<()>;
}

/// Production driver over a fantoccini WebDriver session.
pub struct FantocciniDriver {
    client: Client,
}

impl FantocciniDriver {
    /// Connect to a chromedriver/geckodriver endpoint.
    pub async fn connect(
        webdriver_url: &str,
        headless: bool,
        binary_path: Option<&str>,
    ) -> Result<Self> {
        let mut capabilities: Map<String, Value> = Map::new();
        let mut chrome_options: Map<String, Value> = Map::new();
        let mut args: Vec<Value> = Vec::new();

        if headless {
            args.push(Value::String("--headless=new".to_string()));
            args.push(Value::String("--disable-gpu".to_string()));
        }
        if !args.is_empty() {
            chrome_options.insert("args".to_string(), Value::Array(args));
        }
        if let Some(path) = binary_path {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                chrome_options.insert("binary".to_string(), Value::String(trimmed.to_string()));
            }
        }
        if !chrome_options.is_empty() {
            capabilities.insert(
                "goog:chromeOptions".to_string(),
                Value::Object(chrome_options),
            );
        }

        let mut builder = ClientBuilder::rustls().context("Failed to initialize rustls connector")?;
        if !capabilities.is_empty() {
            builder.capabilities(capabilities);
        }

        let client = builder.connect(webdriver_url).await.with_context(|| {
            format!(
                "Failed to connect to WebDriver at {webdriver_url}. Start chromedriver/geckodriver first"
            )
        })?;

        Ok(Self { client })
    }

    async fn find_element(&self, selector: &str) -> Result<fantoccini::elements::Element> {
        tokio::time::timeout(ELEMENT_TIMEOUT, self.client.find(Locator::Css(selector)))
            .await
            .map_err(|_| anyhow::anyhow!("timed out locating element: {selector}"))?
            .with_context(|| format!("No element matches selector: {selector}"))
    }

    fn parse_handle(handle: &str) -> Result<WindowHandle> {
        WindowHandle::try_from(handle.to_string())
            .map_err(|_| anyhow::anyhow!("Invalid window handle: {handle}"))
    }
}

#[async_trait]
impl WebDriver for FantocciniDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {url}"))
    }

    async fn back(&self) -> Result<()> {
        self.client.back().await.context("Failed to go back")
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .client
            .current_url()
            .await
            .context("Failed to read current URL")?;
        Ok(url.to_string())
    }

    async fn title(&self) -> Result<String> {
        self.client.title().await.context("Failed to read page title")
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.find_element(selector)
            .await?
            .click()
            .await
            .with_context(|| format!("Failed to click {selector}"))
    }

    async fn type_text(&self, selector: &str, text: &str, clear_first: bool) -> Result<()> {
        let element = self.find_element(selector).await?;
        if clear_first {
            let _ = element.clear().await;
        }
        element
            .send_keys(text)
            .await
            .with_context(|| format!("Failed to type into {selector}"))
    }

    async fn element_text(&self, selector: &str) -> Result<String> {
        self.find_element(selector)
            .await?
            .text()
            .await
            .with_context(|| format!("Failed to read text of {selector}"))
    }

    async fn scroll_by(&self, delta_y: i64) -> Result<()> {
        self.client
            .execute("window.scrollBy(0, arguments[0]);", vec![json!(delta_y)])
            .await
            .context("Failed to scroll")?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.client
            .screenshot()
            .await
            .context("Failed to capture screenshot")
    }

    async fn windows(&self) -> Result<Vec<String>> {
        let handles = self
            .client
            .windows()
            .await
            .context("Failed to list windows")?;
        Ok(handles.into_iter().map(String::from).collect())
    }

    async fn current_window(&self) -> Result<String> {
        let handle = self
            .client
            .window()
            .await
            .context("Failed to read current window")?;
        Ok(String::from(handle))
    }

    async fn switch_to_window(&self, handle: &str) -> Result<()> {
        self.client
            .switch_to_window(Self::parse_handle(handle)?)
            .await
            .with_context(|| format!("Failed to switch to window {handle}"))
    }

    async fn new_window(&self) -> Result<String> {
        let response = self
            .client
            .new_window(true)
            .await
            .context("Failed to open new tab")?;
        Ok(String::from(response.handle))
    }

    async fn close_window(&self, handle: &str) -> Result<()> {
        let current = self.current_window().await?;
        self.switch_to_window(handle).await?;
        self.client
            .close_window()
            .await
            .with_context(|| format!("Failed to close window {handle}"))?;
        // Re-focus a surviving window; the closed one may have been current.
        if current != handle {
            self.switch_to_window(&current).await?;
        } else if let Some(next) = self.windows().await?.into_iter().next() {
            self.switch_to_window(&next).await?;
        }
        Ok(())
    }

    async fn close_session(&self) -> Result<()> {
        // Client::close consumes the handle; clone since Client is a cheap
        // handle to the shared session.
        self.client
            .clone()
            .close()
            .await
            .context("Failed to close WebDriver session")
    }
}

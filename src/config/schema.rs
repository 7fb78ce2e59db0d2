use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

// ── Top-level config ──────────────────────────────────────────────

/// Top-level webpilot configuration, loaded from `config.toml`.
///
/// Resolution order: `WEBPILOT_CONFIG_DIR` env → `~/.webpilot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// API key for the selected provider. Overridden by `WEBPILOT_API_KEY` or `API_KEY` env vars.
    pub api_key: Option<String>,
    /// Base URL override for the provider API (e.g. `"http://localhost:11434/v1"` for Ollama).
    pub api_url: Option<String>,
    /// Provider ID (e.g. `"openai"`, `"openrouter"`, `"ollama"`, `"anthropic"`, `"compatible"`).
    pub provider: Option<String>,
    /// Default model routed through the selected provider. Per-role overrides live
    /// in `[execution]`.
    pub model: Option<String>,
    /// Default model temperature (0.0–2.0). Default: `0.7`.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            api_key: None,
            api_url: None,
            provider: Some("openai".into()),
            model: None,
            temperature: default_temperature(),
            execution: ExecutionConfig::default(),
            browser: BrowserConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

fn default_temperature() -> f64 {
    0.7
}

// ── Execution engine ──────────────────────────────────────────────

/// Budgets and role wiring for the executor step loop.
///
/// These values are read once at executor construction and are immutable for
/// the lifetime of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Hard cap on navigator steps per task.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Consecutive-failure budget; exceeding it is fatal for the task.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    /// Upper bound on actions the navigator may propose in a single step.
    #[serde(default = "default_max_actions_per_step")]
    pub max_actions_per_step: usize,
    /// Attach a screenshot to navigator prompts.
    #[serde(default)]
    pub use_vision: bool,
    /// Attach a screenshot to planner prompts.
    #[serde(default)]
    pub use_vision_for_planner: bool,
    /// Invoke the planner every N steps (and always on step 0).
    #[serde(default = "default_planning_interval")]
    pub planning_interval: u32,
    /// Enable the periodic planner role.
    #[serde(default = "default_true")]
    pub enable_planner: bool,
    /// Enable the completion validator role.
    #[serde(default = "default_true")]
    pub enable_validator: bool,
    /// Model override for the planner; falls back to the top-level model.
    pub planner_model: Option<String>,
    /// Model override for the validator; falls back to the top-level model.
    pub validator_model: Option<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_failures: default_max_failures(),
            max_actions_per_step: default_max_actions_per_step(),
            use_vision: false,
            use_vision_for_planner: false,
            planning_interval: default_planning_interval(),
            enable_planner: true,
            enable_validator: true,
            planner_model: None,
            validator_model: None,
        }
    }
}

fn default_max_steps() -> u32 {
    100
}

fn default_max_failures() -> u32 {
    3
}

fn default_max_actions_per_step() -> usize {
    10
}

fn default_planning_interval() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

// ── Browser backend ───────────────────────────────────────────────

/// WebDriver connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver / geckodriver).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Launch the browser without a visible window.
    #[serde(default)]
    pub headless: bool,
    /// Optional browser binary path passed through to the driver.
    pub binary_path: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: false,
            binary_path: None,
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

// ── Gateway ───────────────────────────────────────────────────────

/// WebSocket gateway bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8321
}

// ── Load / save ───────────────────────────────────────────────────

fn default_config_dir() -> Result<PathBuf> {
    if let Ok(custom) = std::env::var("WEBPILOT_CONFIG_DIR") {
        let custom = custom.trim();
        if !custom.is_empty() {
            return Ok(PathBuf::from(custom));
        }
    }
    let user_dirs = UserDirs::new().context("Could not determine home directory")?;
    Ok(user_dirs.home_dir().join(".webpilot"))
}

impl Config {
    pub async fn load_or_init() -> Result<Self> {
        let config_dir = default_config_dir()?;
        let config_path = config_dir.join("config.toml");

        fs::create_dir_all(&config_dir)
            .await
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

        if config_path.exists() {
            // Warn if the config file is world-readable (it may contain API keys)
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(meta) = fs::metadata(&config_path).await {
                    if meta.permissions().mode() & 0o004 != 0 {
                        tracing::warn!(
                            "Config file {:?} is world-readable. Consider: chmod 600 {:?}",
                            config_path,
                            config_path,
                        );
                    }
                }
            }

            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.clone();
            config.apply_env_overrides();
            config.validate()?;
            tracing::info!(path = %config.config_path.display(), initialized = false, "Config loaded");
            Ok(config)
        } else {
            let mut config = Config::default();
            config.config_path = config_path.clone();
            config.save().await?;

            // Restrict permissions on the newly created config file
            #[cfg(unix)]
            {
                use std::{fs::Permissions, os::unix::fs::PermissionsExt};
                let _ = fs::set_permissions(&config_path, Permissions::from_mode(0o600)).await;
            }

            config.apply_env_overrides();
            config.validate()?;
            tracing::info!(path = %config.config_path.display(), initialized = true, "Config loaded");
            Ok(config)
        }
    }

    pub async fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }
        fs::write(&self.config_path, contents)
            .await
            .with_context(|| format!("Failed to write {}", self.config_path.display()))?;
        Ok(())
    }

    /// Env vars take precedence over file values so deployments can inject
    /// credentials without touching the config file.
    pub fn apply_env_overrides(&mut self) {
        for var in ["WEBPILOT_API_KEY", "API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.trim().is_empty() {
                    self.api_key = Some(key);
                    break;
                }
            }
        }
        if let Ok(url) = std::env::var("WEBPILOT_API_URL") {
            if !url.trim().is_empty() {
                self.api_url = Some(url);
            }
        }
    }

    /// Catch values that would fail at arbitrary runtime points.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            );
        }
        if self.execution.max_steps == 0 {
            anyhow::bail!("execution.max_steps must be at least 1");
        }
        if self.execution.max_actions_per_step == 0 {
            anyhow::bail!("execution.max_actions_per_step must be at least 1");
        }
        if self.execution.planning_interval == 0 {
            anyhow::bail!("execution.planning_interval must be at least 1");
        }
        if self.gateway.port == 0 {
            anyhow::bail!("gateway.port must be non-zero");
        }
        Ok(())
    }

    /// Model for a given role, honoring per-role overrides.
    pub fn model_for_role(&self, role: ModelRole) -> Option<String> {
        let overridden = match role {
            ModelRole::Navigator => None,
            ModelRole::Planner => self.execution.planner_model.clone(),
            ModelRole::Validator => self.execution.validator_model.clone(),
        };
        overridden.or_else(|| self.model.clone())
    }

    pub fn config_dir(&self) -> &Path {
        self.config_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// LLM-backed roles that can carry independent model selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Navigator,
    Planner,
    Validator,
}

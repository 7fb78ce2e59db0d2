use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use webpilot::agent::{build_executor, ExecutorStatus, Task};
use webpilot::browser::{BrowserContext, FantocciniDriver};
use webpilot::config::Config;
use webpilot::gateway;
use webpilot::providers::create_provider;

fn parse_temperature(s: &str) -> std::result::Result<f64, String> {
    let t: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=2.0).contains(&t) {
        return Err("temperature must be between 0.0 and 2.0".to_string());
    }
    Ok(t)
}

/// `webpilot` - an LLM-driven browser automation agent.
#[derive(Parser, Debug)]
#[command(name = "webpilot")]
#[command(version)]
#[command(about = "Drive a real browser from a natural-language task.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single task to completion and print the result
    Run {
        /// The task, in natural language
        task: Vec<String>,

        /// Run the browser without a visible window
        #[arg(long)]
        headless: bool,

        /// Override the configured model for this run
        #[arg(short, long)]
        model: Option<String>,

        /// Sampling temperature (0.0 to 2.0)
        #[arg(short, long, value_parser = parse_temperature)]
        temperature: Option<f64>,
    },

    /// Start the WebSocket gateway for UI-driven tasks
    Serve {
        /// Bind host (loopback only)
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Inspect or initialize the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the active configuration (credentials redacted)
    Show,
    /// Create the default config file if it does not exist
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Both reqwest and fantoccini are built against rustls; pin the process
    // crypto provider before any TLS connection is attempted.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: failed to install default crypto provider: {e:?}");
    }

    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("WEBPILOT_CONFIG_DIR", config_dir);
    }

    // Respects RUST_LOG, defaults to INFO.
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut config = Config::load_or_init().await?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Run {
            task,
            headless,
            model,
            temperature,
        } => {
            let task_text = task.join(" ");
            if task_text.trim().is_empty() {
                bail!("no task given; usage: webpilot run <task...>");
            }
            if let Some(model) = model {
                config.model = Some(model);
            }
            if let Some(temperature) = temperature {
                config.temperature = temperature;
            }
            if headless {
                config.browser.headless = true;
            }
            config.validate()?;
            run_task(&config, &task_text).await
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            config.validate()?;
            gateway::run_gateway(config).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let mut shown = config.clone();
                if shown.api_key.is_some() {
                    shown.api_key = Some("***redacted***".into());
                }
                print!("{}", toml::to_string_pretty(&shown)?);
                Ok(())
            }
            ConfigCommands::Init => {
                println!("Config file: {}", config.config_path.display());
                Ok(())
            }
        },
    }
}

async fn run_task(config: &Config, task_text: &str) -> Result<()> {
    let provider = create_provider(config)?;

    info!(url = %config.browser.webdriver_url, "Connecting to WebDriver");
    let driver = FantocciniDriver::connect(
        &config.browser.webdriver_url,
        config.browser.headless,
        config.browser.binary_path.as_deref(),
    )
    .await?;
    let browser = Arc::new(BrowserContext::new(Arc::new(driver)));

    let executor = Arc::new(build_executor(
        config,
        provider,
        browser,
        Task::new(task_text),
    )?);

    // Print progress lines as the run unfolds.
    let mut events = executor.subscribe_execution_events();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("[{}] {}", event.timestamp.format("%H:%M:%S"), event.describe());
        }
    });

    // First Ctrl-C cancels cooperatively; the run finishes its current action.
    let canceller = executor.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling the task");
            canceller.cancel();
        }
    });

    let summary = executor.execute().await?;
    if let Err(e) = executor.cleanup().await {
        warn!(error = %e, "Browser cleanup failed");
    }
    printer.abort();

    match summary.status {
        ExecutorStatus::Done => {
            println!("\n{}", summary.details.as_deref().unwrap_or("Task completed."));
            Ok(())
        }
        ExecutorStatus::Cancelled => {
            println!("\nTask cancelled.");
            Ok(())
        }
        _ => bail!(
            "task failed: {}",
            summary.details.as_deref().unwrap_or("unknown error")
        ),
    }
}

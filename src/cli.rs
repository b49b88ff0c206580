use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::notifications::{
    classify, selectors, DisplayType, NotificationConfig, NotificationService, RaiseRequest,
    Severity,
};
use crate::replay::{load_script, render_frame, run_script};

/// fintrack-notify - notification queue and banner/toast presentation core
#[derive(Parser)]
#[command(name = "fintrack-notify")]
#[command(about = "Notification queue with banner and toast channels")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file path (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a status code into a severity
    Classify(ClassifyArgs),

    /// Print the effective configuration as TOML
    Config,

    /// Replay a JSON script of bus commands on virtual time
    Replay(ReplayArgs),

    /// Run the live service with real timers and print channel changes
    Demo(DemoArgs),
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// Status code (HTTP-like)
    #[arg(allow_hyphen_values = true)]
    pub status: i32,

    /// Explicit severity, overrides the status code
    #[arg(long)]
    pub severity: Option<Severity>,
}

#[derive(Args)]
pub struct ReplayArgs {
    /// Script file: a JSON array of commands and {"advanceMs": N} steps
    pub script: PathBuf,

    /// Only print the final state
    #[arg(long)]
    pub final_only: bool,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Give up after this many seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

impl clap::ValueEnum for Severity {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            Severity::Error,
            Severity::Warning,
            Severity::Info,
            Severity::Success,
        ]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// Executes CLI subcommands
pub struct CliHandler {
    config: NotificationConfig,
}

impl CliHandler {
    /// Create a handler, loading configuration from `config_path` or the
    /// default location
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = NotificationConfig::load(config_path.as_deref())
            .context("Failed to load notification configuration")?;
        debug!("Using notification config: {:?}", config);
        Ok(Self { config })
    }

    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Classify(args) => self.handle_classify(args),
            Commands::Config => self.handle_config(),
            Commands::Replay(args) => self.handle_replay(args),
            Commands::Demo(args) => self.handle_demo(args).await,
        }
    }

    fn handle_classify(&self, args: ClassifyArgs) -> Result<()> {
        let severity = classify(args.status, args.severity);
        println!("{} {}", severity.icon(), severity);
        Ok(())
    }

    fn handle_config(&self) -> Result<()> {
        let rendered = self
            .config
            .to_toml_string()
            .context("Failed to render configuration")?;
        print!("{}", rendered);
        Ok(())
    }

    fn handle_replay(&self, args: ReplayArgs) -> Result<()> {
        let steps = load_script(&args.script)
            .with_context(|| format!("Failed to load script {}", args.script.display()))?;
        info!("Replaying {} steps from {}", steps.len(), args.script.display());

        let frames = run_script(&self.config, steps);
        if args.final_only {
            if let Some(frame) = frames.last() {
                print!("{}", render_frame(frame));
            }
        } else {
            for frame in &frames {
                print!("{}", render_frame(frame));
            }
        }
        Ok(())
    }

    async fn handle_demo(&self, args: DemoArgs) -> Result<()> {
        let service = NotificationService::spawn(self.config.clone());
        let handle = service.handle();
        let mut changes = handle.subscribe();

        handle.raise_request(
            RaiseRequest::new("Transaction saved", 200)
                .display_type(DisplayType::Toast)
                .severity(Severity::Success),
        )?;
        handle.raise_request(
            RaiseRequest::new("Could not reach the server", 503).display_type(DisplayType::Banner),
        )?;
        handle.raise_request(
            RaiseRequest::new("Budget limit almost reached", 200)
                .display_type(DisplayType::Toast)
                .severity(Severity::Warning),
        )?;

        let deadline = tokio::time::sleep(Duration::from_secs(args.timeout));
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = changes.borrow_and_update().clone();
                    match selectors::banner(&state) {
                        Some(view) => println!(
                            "🔔 banner: {} {}",
                            view.current.notification_type().icon(),
                            view.current.message()
                        ),
                        None => println!("🔔 banner: -"),
                    }
                    let toasts = selectors::toasts(&state);
                    println!("🍞 toasts: {}", toasts.len());
                    for record in toasts {
                        println!("   {} {}", record.notification_type().icon(), record.message());
                    }
                    if state.is_empty() {
                        println!("✅ All notifications expired");
                        break;
                    }
                }
                _ = &mut deadline => {
                    println!("⏱️ Demo timed out after {} seconds", args.timeout);
                    break;
                }
            }
        }

        service.shutdown().await;
        Ok(())
    }
}

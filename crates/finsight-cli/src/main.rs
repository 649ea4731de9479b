use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod render;

use commands::schedule::{handle_schedule_command, ScheduleCommands};
use commands::watch::run_watch;
use finsight_bus::{EventBus, Topic};
use finsight_client::{HttpSchedulerApi, SchedulerApi};
use finsight_scheduler::{
    ConsoleConfig, ControllerError, ControllerOptions, ScheduleRegistry,
    SchedulerStatusController,
};
use finsight_schema::ConsoleEvent;
use render::{event_line, status_lines};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "finsight", version, about = "finsight operator console")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.finsight",
        help = "Config root directory (contains console.yaml and logs/)"
    )]
    config_root: PathBuf,

    #[arg(long, help = "Console config file, overrides <config-root>/console.yaml")]
    config: Option<PathBuf>,

    #[arg(long, help = "Console API base URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show the current scheduler status")]
    Status,
    #[command(about = "Start the workflow scheduler")]
    Start,
    #[command(about = "Stop the workflow scheduler")]
    Stop,
    #[command(about = "Follow scheduler status until interrupted")]
    Watch,
    #[command(subcommand, about = "Manage workflow schedules")]
    Schedule(ScheduleCommands),
}

/// Wired-up console pieces sharing one API client and one bus.
struct Console {
    bus: EventBus,
    registry: Arc<ScheduleRegistry>,
    controller: Arc<SchedulerStatusController>,
}

impl Console {
    fn connect(config: &ConsoleConfig) -> Result<Self> {
        let mut builder =
            HttpSchedulerApi::builder(config.base_url.as_str()).timeout(config.request_timeout());
        if let Some(token) = &config.bearer_token {
            builder = builder.bearer_token(token.as_str());
        }
        let api: Arc<dyn SchedulerApi> = Arc::new(
            builder
                .build()
                .with_context(|| format!("invalid console base url {}", config.base_url))?,
        );

        let bus = EventBus::new(64);
        let registry = Arc::new(ScheduleRegistry::new(api.clone(), bus.publisher()));
        let controller = SchedulerStatusController::new(
            api,
            registry.clone(),
            bus.publisher(),
            ControllerOptions::from(config),
        );
        Ok(Self {
            bus,
            registry,
            controller,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    if cli.config_root.starts_with("~") {
        if let Some(home) = std::env::var_os("HOME") {
            cli.config_root = PathBuf::from(home).join(
                cli.config_root
                    .strip_prefix("~")
                    .unwrap_or(&cli.config_root),
            );
        }
    }

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "finsight.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut config = ConsoleConfig::resolve(cli.config.as_deref(), &cli.config_root)?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    config.validate()?;
    tracing::debug!(base_url = %config.base_url, "console config resolved");

    let console = Console::connect(&config)?;

    match command {
        Commands::Status => {
            let status = console.controller.fetch_status().await?;
            for line in status_lines(&status) {
                println!("{line}");
            }
        }
        Commands::Start => {
            run_action(&console, |controller| async move { controller.start().await }).await?;
        }
        Commands::Stop => {
            run_action(&console, |controller| async move { controller.stop().await }).await?;
        }
        Commands::Watch => {
            run_watch(&console.controller, &console.bus).await?;
        }
        Commands::Schedule(cmd) => {
            let mut notifications = console.bus.subscribe(Topic::Notification).await;
            let result = handle_schedule_command(cmd, &console.registry).await;
            drain_events(&mut notifications);
            result?;
        }
    }

    Ok(())
}

/// Runs a scheduler action, then prints its notification and the reconciled status.
async fn run_action<F, Fut>(console: &Console, action: F) -> Result<()>
where
    F: FnOnce(Arc<SchedulerStatusController>) -> Fut,
    Fut: std::future::Future<Output = Result<(), ControllerError>>,
{
    let mut notifications = console.bus.subscribe(Topic::Notification).await;
    let result = action(console.controller.clone()).await;
    drain_events(&mut notifications);
    result?;

    if let Some(status) = console.controller.snapshot().last_status {
        for line in status_lines(&status) {
            println!("{line}");
        }
    }
    Ok(())
}

fn drain_events(rx: &mut mpsc::Receiver<ConsoleEvent>) {
    while let Ok(event) = rx.try_recv() {
        if let Some(line) = event_line(&event) {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_schedule_create() {
        let cli = Cli::try_parse_from([
            "finsight",
            "schedule",
            "create",
            "--name",
            "Nightly",
            "--workflow",
            "wf-1",
            "--cron",
            "0 2 * * *",
            "--inactive",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Schedule(ScheduleCommands::Create {
                name,
                workflow,
                cron,
                inactive,
            })) => {
                assert_eq!(name, "Nightly");
                assert_eq!(workflow, "wf-1");
                assert_eq!(cron, "0 2 * * *");
                assert!(inactive);
            }
            _ => panic!("expected schedule create"),
        }
    }

    #[test]
    fn cli_defaults_config_root() {
        let cli = Cli::try_parse_from(["finsight", "status"]).unwrap();
        assert_eq!(cli.config_root, PathBuf::from("~/.finsight"));
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Some(Commands::Status)));
    }

    #[test]
    fn cli_requires_schedule_id_for_run() {
        assert!(Cli::try_parse_from(["finsight", "schedule", "run"]).is_err());
    }

    #[test]
    fn console_rejects_unusable_base_url() {
        let config = ConsoleConfig {
            base_url: "not a url".to_string(),
            ..ConsoleConfig::default()
        };
        assert!(Console::connect(&config).is_err());
    }
}

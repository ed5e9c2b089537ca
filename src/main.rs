use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{error, info};
use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;

mod cli;

use cli::{Cli, Commands};
use devhelm_agent::agent::{ControlLoop, LoopConfig, Termination};
use devhelm_agent::config::Config;
use devhelm_agent::logging;
use devhelm_agent::screen::{self, ScreenAutomation};
use devhelm_agent::task::{TaskRequester, TaskResponse, TaskSource, TaskStatus};
use devhelm_agent::ui::{PromptSurface, TemplateSet, UiBridge};

fn build_requester(config: &Config) -> Result<TaskRequester> {
    let timeout = config.api.timeout_secs.map(Duration::from_secs);
    TaskRequester::with_timeout(&config.api.base_url, &config.api.api_key, timeout)
        .context("Failed to create HTTP client")
}

fn build_bridge(config: &Config) -> Result<UiBridge<Box<dyn ScreenAutomation>>> {
    // Templates first: a missing image is a setup problem whatever the backend
    let templates = TemplateSet::resolve(&config.ui).context("Template images are not in place")?;
    let backend = screen::default_backend().context("No screen automation backend")?;
    Ok(UiBridge::new(backend, templates).with_timing(config.ui.settle(), config.ui.keystroke_interval()))
}

/// Resolves on the first interrupt. On unix the handler is registered
/// here rather than on first poll, so an early Ctrl-C is not lost.
#[cfg(unix)]
fn shutdown_signal() -> impl Future<Output = ()> {
    use tokio::signal::unix::{SignalKind, signal};

    let interrupt = signal(SignalKind::interrupt());
    async move {
        match interrupt {
            Ok(mut interrupt) => {
                interrupt.recv().await;
            }
            Err(e) => {
                error!("Could not listen for interrupt signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
fn shutdown_signal() -> impl Future<Output = ()> {
    async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for interrupt signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn run_agent(config: &Config) -> Result<ExitCode> {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let requester = build_requester(config)?;
    let bridge = build_bridge(config)?;

    let started = ControlLoop::start_until(requester, bridge, LoopConfig::from(&config.agent), &mut shutdown).await;
    let mut control = match started {
        Ok(Some(control)) => control,
        Ok(None) => {
            info!("Agent stopped: {}", Termination::Interrupted);
            return Ok(ExitCode::from(Termination::Interrupted.exit_code()));
        }
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::from(e.exit_code()));
        }
    };

    let termination = control.run_until(shutdown).await;
    info!("Agent stopped: {}", termination);
    Ok(ExitCode::from(termination.exit_code()))
}

async fn handle_fetch_command(config: &Config) -> Result<ExitCode> {
    let requester = build_requester(config)?;
    info!("Requesting task from {}", requester.task_url());

    match requester.request_task().await.context("Task request failed")? {
        TaskResponse::Assigned(task) => {
            println!("{} {} - {}", "Task:".green(), task.ticket_id, task.prompt);
            println!("  id: {}", task.id);
        }
        TaskResponse::Status(TaskStatus::Busy) => {
            println!("{}", "Busy: a task is already in progress".yellow());
        }
        TaskResponse::Status(TaskStatus::NoTask) => {
            println!("{}", "No task available".cyan());
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_probe_command(config: &Config) -> Result<ExitCode> {
    let mut bridge = build_bridge(config)?;
    let templates = bridge.templates();
    println!("{} {}", "Ready template:".green(), templates.ready.display());
    println!("{} {}", "Input template:".green(), templates.input_label.display());

    if bridge.is_ready_for_prompt().await {
        println!("{}", "UI is ready for a prompt".green());
    } else {
        println!("{}", "UI is not ready for a prompt".yellow());
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_application(cli: &Cli, config: &Config) -> Result<ExitCode> {
    match cli.subcommand_or_run() {
        Commands::Run => run_agent(config).await,
        Commands::Fetch => handle_fetch_command(config).await,
        Commands::Probe => handle_probe_command(config).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging depends on config, so config problems go straight to stderr
    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.logging, cli.is_verbose()) {
        eprintln!("{} {}", "Error:".red(), e);
        return ExitCode::FAILURE;
    }

    info!("Starting DevHelm Agent...");

    match run_application(&cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {:#}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

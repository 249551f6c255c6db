//! versed - AI poetry translation workflow daemon
//!
//! CLI entry point: wires the store, providers, and orchestrator, then
//! dispatches subcommands.

use std::io::Read;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use versedaemon::cli::{Cli, Command, PoemCommand};
use versedaemon::config::Config;
use versedaemon::domain::{TaskFilter, TaskStatus, WorkflowMode};
use versedaemon::persist::StoreHandle;
use versedaemon::progress::ProgressEventKind;
use versedaemon::services::Services;
use versedaemon::workflow::TranslateRequest;

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let level = match cli_log_level.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            other => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to WARN", other);
                tracing::Level::WARN
            }
        },
        None => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref())?;

    let config = Config::load(cli.config.as_ref())?;
    let store = StoreHandle::spawn(&config.storage.database_path)
        .context("Failed to open verse store")?;

    match cli.command {
        Command::Translate {
            poem_id,
            target_lang,
            mode,
        } => {
            let mode: WorkflowMode = mode.parse().map_err(|e: String| eyre::eyre!(e))?;
            let services = Services::build(config, Arc::new(store))?;
            translate(&services, poem_id, target_lang, mode).await
        }
        Command::Modes => {
            for mode in config.workflow.available_modes() {
                println!("{}", mode);
                if let Some(steps) = config.workflow.steps_for_mode(mode, &config.limits) {
                    for step in steps {
                        println!(
                            "  {} -> {} / {} ({})",
                            step.kind, step.provider, step.model, step.prompt_template
                        );
                    }
                }
            }
            Ok(())
        }
        Command::Tasks { status } => {
            let services = Services::build(config, Arc::new(store))?;
            let filter = TaskFilter {
                status: status.as_deref().map(parse_status).transpose()?,
                poem_id: None,
            };
            for record in services.orchestrator.list_tasks(&filter) {
                println!(
                    "{}  {:<10} {:>3}%  {} -> {}  {}",
                    record.task_id,
                    record.status.as_str(),
                    record.progress_percent,
                    record.job.source_lang,
                    record.job.target_lang,
                    record.job.poem_title,
                );
            }
            Ok(())
        }
        Command::Poems { command } => poems(&store, command).await,
    }
}

fn parse_status(s: &str) -> Result<TaskStatus> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(TaskStatus::Pending),
        "running" => Ok(TaskStatus::Running),
        "completed" => Ok(TaskStatus::Completed),
        "failed" => Ok(TaskStatus::Failed),
        "cancelled" => Ok(TaskStatus::Cancelled),
        other => Err(eyre::eyre!("unknown status: {}", other)),
    }
}

/// Run one workflow to completion, printing progress events as they arrive
async fn translate(
    services: &Services,
    poem_id: String,
    target_lang: String,
    mode: WorkflowMode,
) -> Result<()> {
    let task_id = services
        .orchestrator
        .start(TranslateRequest {
            poem_id,
            target_lang,
            mode,
        })
        .await
        .map_err(|e| eyre::eyre!("{}", e))?;

    info!(%task_id, "Workflow started");
    println!("task {}", task_id);

    let mut subscription = services
        .bus
        .subscribe(&task_id, None)
        .ok_or_else(|| eyre::eyre!("no progress stream for task {}", task_id))?;

    while let Some(event) = subscription.next().await {
        match event.kind {
            ProgressEventKind::Heartbeat => {}
            _ => println!(
                "[{:>3}%] {} {}",
                event.progress_percent,
                event.kind.as_str(),
                event.step.as_deref().unwrap_or(""),
            ),
        }
    }

    let record = services
        .orchestrator
        .get_status(&task_id)
        .ok_or_else(|| eyre::eyre!("task record vanished"))?;

    match record.status {
        TaskStatus::Completed => {
            if let Some(result) = record.result {
                println!("\n{}", result.translated_text);
                if let Some(title) = result.translated_poem_title {
                    println!("— {}", title);
                }
                println!(
                    "\ntokens: {}  cost: ${:.4}  duration: {:.1}s",
                    result.total_tokens,
                    result.total_cost_usd,
                    result.duration_ms as f64 / 1000.0
                );
            }
            for warning in record.warnings {
                eprintln!("warning: {}", warning);
            }
            Ok(())
        }
        status => Err(eyre::eyre!(
            "task finished {}: {}",
            status.as_str(),
            record.error.unwrap_or_default()
        )),
    }
}

async fn poems(store: &StoreHandle, command: PoemCommand) -> Result<()> {
    match command {
        PoemCommand::Add {
            poet,
            title,
            language,
            file,
        } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .context(format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let row = store
                .create_poem(versestore::NewPoem {
                    poet_name: poet,
                    poem_title: title,
                    original_text: text.trim_end().to_string(),
                    source_language: language,
                })
                .await?;
            println!("{}", row.id);
            Ok(())
        }
        PoemCommand::List => {
            for poem in store.list_poems().await? {
                println!(
                    "{}  {:<20} {:<12} {}",
                    poem.id, poem.poet_name, poem.source_language, poem.poem_title
                );
            }
            Ok(())
        }
    }
}

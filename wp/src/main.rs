//! Workpilot CLI entry point
//!
//! Wires configuration, the board client, and the session manager together,
//! then dispatches to the workflow stages.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use boardclient::{BoardApi, BoardClient, BoardCredentials, HttpTransport};

use workpilot::cli::{Cli, Command, SessionCommand, parse_answers};
use workpilot::config::Config;
use workpilot::session::{SessionKey, SessionManager, get_or_create};
use workpilot::stages::{ExecuteOptions, ExecuteStage, PlanStage, SpecifyStage};
use workpilot::{builtin_tools, working_keys};

fn setup_logging(filter: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .context(format!("Invalid log filter '{filter}'"))?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();

    info!("Logging initialized (filter: {})", filter);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let filter = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    setup_logging(&filter).context("Failed to setup logging")?;

    config.validate().context("Invalid configuration")?;
    info!(
        "Workpilot loaded config: organization={}, project={}",
        config.backend.organization_key(),
        config.backend.project
    );

    let transport = Arc::new(
        HttpTransport::new(Duration::from_millis(config.backend.timeout_ms))
            .context("Failed to build HTTP transport")?,
    );
    let credentials = Arc::new(
        BoardCredentials::from_config(&config.backend.credentials, transport.clone())
            .context("Failed to configure credentials")?,
    );
    let api: Arc<dyn BoardApi> = Arc::new(BoardClient::new(
        transport,
        credentials,
        config.retry.clone(),
        &config.backend.organization_url,
        &config.backend.project,
    ));
    let sessions = SessionManager::spawn();

    match cli.command {
        Command::Specify { item, answers } => {
            let answers = parse_answers(&answers).map_err(|e| eyre::eyre!(e))?;
            cmd_specify(&config, api, &sessions, item, answers).await
        }
        Command::Plan { item, approach } => {
            cmd_plan(&config, api, &sessions, item, approach.as_deref()).await
        }
        Command::Execute {
            item,
            dry_run,
            batch_size,
        } => cmd_execute(&config, api, &sessions, item, dry_run, batch_size).await,
        Command::Session { command } => cmd_session(&config, api, &sessions, command).await,
        Command::Tools => cmd_tools(),
    }
}

async fn session_for(
    config: &Config,
    api: &Arc<dyn BoardApi>,
    sessions: &SessionManager,
    item: i64,
) -> Result<workpilot::Session> {
    let key = SessionKey {
        organization: config.backend.organization_key(),
        item_id: item,
    };
    get_or_create(sessions, api.as_ref(), key)
        .await
        .context(format!("Failed to open a session for item {item}"))
}

async fn cmd_specify(
    config: &Config,
    api: Arc<dyn BoardApi>,
    sessions: &SessionManager,
    item: i64,
    answers: HashMap<String, String>,
) -> Result<()> {
    let session = session_for(config, &api, sessions, item).await?;
    let stage = SpecifyStage::new(api, sessions.clone());
    let outcome = stage.run(&session.id, item, &answers).await?;

    if outcome.needs_more_info {
        println!("{}", "More information is needed:".yellow().bold());
        for question in &outcome.clarifying_questions {
            println!("  {} {}", "?".yellow(), question);
        }
        println!(
            "\nAnswer with {} and run specify again.",
            "--answer TOPIC=TEXT".cyan()
        );
    } else if let Some(specification) = outcome.specification {
        println!("{}", "Specification captured.".green().bold());
        println!("\n{specification}");
    }
    Ok(())
}

async fn cmd_plan(
    config: &Config,
    api: Arc<dyn BoardApi>,
    sessions: &SessionManager,
    item: i64,
    approach: Option<&str>,
) -> Result<()> {
    let session = session_for(config, &api, sessions, item).await?;
    let stage = PlanStage::new(api, sessions.clone());
    let plan = stage.run(&session.id, item, approach).await?;

    println!(
        "{} {} subtask(s) for #{} ({}), estimated effort {}",
        "Planned".green().bold(),
        plan.subtasks.len(),
        plan.parent_id,
        plan.parent_title,
        plan.estimated_effort
    );
    let dependencies = plan.resolved_dependencies();
    for (i, subtask) in plan.subtasks.iter().enumerate() {
        let estimate = subtask
            .estimate
            .map(|e| format!("{e}"))
            .unwrap_or_else(|| "-".to_string());
        let depends = if dependencies[i].is_empty() {
            String::new()
        } else {
            format!(
                " (after {})",
                dependencies[i]
                    .iter()
                    .map(|d| format!("#{}", d + 1))
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };
        println!("  {}. {} [{}]{}", i + 1, subtask.title, estimate, depends);
    }
    if let Some(notes) = &plan.notes {
        println!("{} {}", "Note:".yellow(), notes);
    }
    Ok(())
}

async fn cmd_execute(
    config: &Config,
    api: Arc<dyn BoardApi>,
    sessions: &SessionManager,
    item: i64,
    dry_run: bool,
    batch_size: Option<usize>,
) -> Result<()> {
    let session = session_for(config, &api, sessions, item).await?;
    let stage = ExecuteStage::new(api, sessions.clone(), config.execution.clone());
    let result = stage
        .run(&session.id, ExecuteOptions { dry_run, batch_size })
        .await?;

    if result.dry_run {
        println!("{}", "Dry run: nothing was created.".cyan().bold());
    }
    for task in &result.created {
        let link_note = task
            .link_error
            .as_deref()
            .map(|e| format!(" {} {}", "link failed:".yellow(), e))
            .unwrap_or_default();
        println!("  {} {} (#{}){}", "created".green(), task.title, task.id, link_note);
    }
    for task in &result.failed {
        println!("  {} {}: {}", "failed".red(), task.title, task.error);
    }
    if result.success {
        println!(
            "{} {}/{} created",
            "Done.".green().bold(),
            result.created.len(),
            result.total
        );
    } else {
        println!(
            "{} {}/{} created, {} failed. The plan is kept; run execute again to retry.",
            "Incomplete.".red().bold(),
            result.created.len(),
            result.total,
            result.failed.len()
        );
    }
    Ok(())
}

async fn cmd_session(
    config: &Config,
    api: Arc<dyn BoardApi>,
    sessions: &SessionManager,
    command: SessionCommand,
) -> Result<()> {
    match command {
        SessionCommand::List => {
            let all = sessions.list().await?;
            if all.is_empty() {
                println!("No sessions.");
                return Ok(());
            }
            for session in all {
                println!(
                    "  {} item #{} [{:?}] updated {}",
                    session.id,
                    session.key.item_id,
                    session.stage,
                    session.updated_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        SessionCommand::Show { item } => {
            let session = session_for(config, &api, sessions, item).await?;
            println!("{} {}", "Session".bold(), session.id);
            println!("  item:    #{}", session.key.item_id);
            println!("  stage:   {:?}", session.stage);
            println!(
                "  spec:    {}",
                if session.working_data.contains_key(working_keys::SPECIFICATION) {
                    "captured".green()
                } else {
                    "missing".yellow()
                }
            );
            println!(
                "  plan:    {}",
                if session.working_data.contains_key(working_keys::EXECUTION_PLAN) {
                    "stored".green()
                } else {
                    "none".yellow()
                }
            );
            println!("  entries: {}", session.transcript.len());
        }
        SessionCommand::Delete { item } => {
            let key = SessionKey {
                organization: config.backend.organization_key(),
                item_id: item,
            };
            match sessions.get_by_key(&key).await? {
                Some(session) => {
                    sessions.delete(&session.id).await?;
                    println!("Deleted session for item #{item}.");
                }
                None => println!("No session for item #{item}."),
            }
        }
    }
    Ok(())
}

fn cmd_tools() -> Result<()> {
    for tool in builtin_tools() {
        println!("{}", tool.name.cyan().bold());
        println!("  {}", tool.description);
    }
    Ok(())
}

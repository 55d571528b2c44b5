use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use report_workflows::engine::clock::parse_time;
use report_workflows::prelude::*;
use report_workflows::{ExecutionLogEntry, MockClock, WorkflowStatistics};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "report-workflows")]
#[command(about = "Run report approval and publication workflows", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to engine.yaml (default for run-dir: <DIR>/engine.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single workflow definition
    Run {
        /// Path to the workflow YAML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Approve gated steps as this approver (repeatable)
        #[arg(short, long = "approver", value_name = "ID")]
        approvers: Vec<String>,

        /// Run against a fixed virtual time (RFC 3339 or unix seconds)
        #[arg(long, value_name = "TIME")]
        at: Option<String>,

        /// Print the workflow and its execution log as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every workflow definition in a directory
    RunDir {
        /// Path to the workflows directory
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Approve gated steps as this approver (repeatable)
        #[arg(short, long = "approver", value_name = "ID")]
        approvers: Vec<String>,

        /// Run against a fixed virtual time (RFC 3339 or unix seconds)
        #[arg(long, value_name = "TIME")]
        at: Option<String>,
    },

    /// Validate workflow files without running them
    Validate {
        /// Path to workflow file or directory
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "report_workflows=debug"
    } else {
        "report_workflows=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run {
            file,
            approvers,
            at,
            json,
        } => run_single(file, cli.config, approvers, at, json).await,
        Commands::RunDir { dir, approvers, at } => {
            let config = cli.config.or_else(|| {
                let default = dir.join("engine.yaml");
                default.exists().then_some(default)
            });
            run_directory(dir, config, approvers, at).await
        }
        Commands::Validate { path } => validate(path),
    }
}

fn build_engine(config: Option<&Path>, at: Option<&str>) -> anyhow::Result<WorkflowEngine> {
    let config = match config {
        Some(path) => {
            tracing::info!("Using config: {}", path.display());
            EngineConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    let mut engine = WorkflowEngine::from_config(&config)?.with_conditions(DataFlag);
    if let Some(at) = at {
        let time = parse_time(at)?;
        engine = engine.with_clock(MockClock::at(time));
    }
    Ok(engine)
}

/// Create, start, and feed approvals to one workflow until it halts
async fn drive_workflow(
    engine: &WorkflowEngine,
    definition: WorkflowDefinition,
    approvers: &[String],
) -> anyhow::Result<Workflow> {
    let name = definition.name.clone();
    let mut workflow = engine.create(definition).await?;
    if workflow.status == WorkflowStatus::Draft {
        workflow = engine
            .start(workflow.id)
            .await
            .with_context(|| format!("Failed to start workflow '{}'", name))?;
    }

    let mut approvers = approvers.iter();
    while workflow.status == WorkflowStatus::AwaitingApproval {
        let Some(approver) = approvers.next() else {
            break;
        };
        workflow = engine
            .add_approval(
                workflow.id,
                approver.clone(),
                true,
                Some("approved from the command line".to_string()),
            )
            .await?;
    }
    Ok(workflow)
}

async fn run_single(
    file: PathBuf,
    config: Option<PathBuf>,
    approvers: Vec<String>,
    at: Option<String>,
    json: bool,
) -> anyhow::Result<bool> {
    let definition = WorkflowLoader::load_file(&file)?;
    if !json {
        println!("Running workflow: {}\n", file.display());
    }

    let engine = build_engine(config.as_deref(), at.as_deref())?;
    let workflow = drive_workflow(&engine, definition, &approvers).await?;
    let log = engine.execution_log(workflow.id).await?;

    if json {
        let output = serde_json::json!({ "workflow": workflow, "log": log });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_workflow(&workflow, &log);
    }

    Ok(workflow.status == WorkflowStatus::Completed)
}

async fn run_directory(
    dir: PathBuf,
    config: Option<PathBuf>,
    approvers: Vec<String>,
    at: Option<String>,
) -> anyhow::Result<bool> {
    println!("Running workflows from: {}\n", dir.display());

    let definitions = WorkflowLoader::load_directory(&dir)?;
    if definitions.is_empty() {
        println!("No workflows found in: {}", dir.display());
        return Ok(true);
    }

    let engine = build_engine(config.as_deref(), at.as_deref())?;
    let mut all_completed = true;

    println!("=== Results ===\n");
    for definition in definitions {
        let name = definition.name.clone();
        let workflow = drive_workflow(&engine, definition, &approvers).await;
        match workflow {
            Ok(wf) => {
                all_completed &= wf.status == WorkflowStatus::Completed;
                println!(
                    "  {} {} [{}] {}/{} steps",
                    status_mark(wf.status),
                    wf.name,
                    wf.status,
                    wf.completed_steps,
                    wf.total_steps
                );
                if let Some(err) = &wf.error_message {
                    println!("      Error: {}", err);
                }
            }
            Err(e) => {
                all_completed = false;
                println!("  ✗ {} ({:#})", name, e);
            }
        }
    }

    print_statistics(&engine.statistics().await);
    Ok(all_completed)
}

fn validate(path: PathBuf) -> anyhow::Result<bool> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }

    if path.is_dir() {
        let definitions = WorkflowLoader::load_directory(&path)?;
        if definitions.is_empty() {
            println!("No workflows found in: {}", path.display());
            return Ok(true);
        }
        let steps: usize = definitions.iter().map(|d| d.steps.len()).sum();
        println!(
            "✓ {} workflows validated, {} steps",
            definitions.len(),
            steps
        );
    } else {
        let definition = WorkflowLoader::load_file(&path)?;
        println!("✓ {} is valid\n", path.display());
        println!("{} ({})", definition.name, definition.workflow_type);
        for (i, step) in definition.steps.iter().enumerate() {
            let mut line = format!("  {}. [{}] {}", i + 1, step.action, step.name);
            if let Some(condition) = &step.condition {
                line.push_str(&format!(" (if: {})", condition));
            }
            if step.requires_approval {
                line.push_str(" (requires approval)");
            }
            println!("{}", line);
        }
    }

    Ok(true)
}

fn status_mark(status: WorkflowStatus) -> &'static str {
    match status {
        WorkflowStatus::Completed => "✓",
        WorkflowStatus::AwaitingApproval | WorkflowStatus::Paused => "…",
        _ => "✗",
    }
}

fn print_workflow(workflow: &Workflow, log: &[ExecutionLogEntry]) {
    println!("=== Workflow Result ===\n");
    println!("Workflow: {} ({})", workflow.name, workflow.id);
    println!("Status: {}", workflow.status);
    println!(
        "Steps: {} completed, {} skipped, {} failed of {}\n",
        workflow.completed_steps,
        workflow.skipped_steps,
        workflow.failed_steps,
        workflow.total_steps
    );

    for (i, step) in workflow.steps.iter().enumerate() {
        let mark = match step.status {
            StepStatus::Completed => "✓",
            StepStatus::Skipped => "-",
            StepStatus::Failed => "✗",
            StepStatus::InProgress | StepStatus::Pending => " ",
        };
        println!("  {} Step {}: {} [{}]", mark, i + 1, step.name, step.action);
        if let Some(err) = &step.error_message {
            println!("      Error: {}", err);
        }
    }

    println!("\n=== Execution Log ===\n");
    for entry in log {
        println!(
            "  {} {:<7} {:<18} {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            format!("{:?}", entry.severity).to_uppercase(),
            entry.action,
            entry.message
        );
    }
}

fn print_statistics(stats: &WorkflowStatistics) {
    println!("\n=== Statistics ===\n");
    println!("Total: {}", stats.total);
    println!(
        "Active: {}, Paused: {}, Completed: {}, Failed: {}, Cancelled: {}",
        stats.active, stats.paused, stats.completed, stats.failed, stats.cancelled
    );
    println!("Overdue: {}", stats.overdue);
    println!(
        "Average success rate: {:.1}%",
        stats.average_success_rate * 100.0
    );
    for (workflow_type, count) in &stats.by_type {
        println!("  {}: {}", workflow_type, count);
    }
}

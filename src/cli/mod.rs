pub mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::WorkflowEngine;
use crate::connectors::ConnectorRegistry;
use crate::engine::types::{Context, StepStatus, WorkflowDefinition};
use crate::storage::Storage;
use crate::storage::json_store::JsonStore;

use config::ZapFlowConfig;

#[derive(Parser)]
#[command(name = "zapflow", version, about = "Workflow automation engine")]
pub struct Cli {
    /// Path to a .env file to load (default: auto-detect .env in cwd)
    #[arg(long, global = true)]
    dotenv: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow from a JSON definition file and wait for the result
    Run {
        /// Path to the workflow definition JSON file
        workflow: PathBuf,

        /// Initial context as JSON string
        #[arg(short, long)]
        context: Option<String>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Data directory for workflows and runs
        #[arg(long, default_value = "data", env = "ZAPFLOW_DATA_DIR")]
        data_dir: PathBuf,
    },

    /// Validate a workflow definition file without executing
    Validate {
        /// Path to the workflow definition JSON file
        workflow: PathBuf,
    },

    /// List past workflow runs
    List {
        /// Filter by owning workflow id
        #[arg(short, long)]
        workflow_id: Option<String>,

        /// Data directory for workflows and runs
        #[arg(long, default_value = "data", env = "ZAPFLOW_DATA_DIR")]
        data_dir: PathBuf,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Inspect a specific run
    Inspect {
        /// Run ID
        run_id: String,

        /// Data directory for workflows and runs
        #[arg(long, default_value = "data", env = "ZAPFLOW_DATA_DIR")]
        data_dir: PathBuf,
    },

    /// List available connectors
    Connectors,

    /// Start the REST API server
    Serve {
        /// Path to a zapflow.yaml config file (default: auto-detect in cwd)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Data directory for workflows and runs
        #[arg(long, env = "ZAPFLOW_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Maximum request body size in bytes (default: 1048576 = 1 MB)
        #[arg(long, env = "MAX_BODY")]
        max_body: Option<usize>,
    },
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file
    load_dotenv(cli.dotenv.as_deref());

    match cli.command {
        Commands::Run {
            workflow,
            context,
            verbose,
            data_dir,
        } => cmd_run(workflow, context, verbose, data_dir).await,
        Commands::Validate { workflow } => cmd_validate(workflow),
        Commands::List {
            workflow_id,
            data_dir,
            format,
        } => cmd_list(workflow_id, data_dir, format).await,
        Commands::Inspect { run_id, data_dir } => cmd_inspect(run_id, data_dir).await,
        Commands::Connectors => cmd_connectors(),
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            max_body,
        } => {
            let cfg = ZapFlowConfig::load(config.as_deref())?;
            let host = host.or(cfg.host).unwrap_or_else(|| "0.0.0.0".to_string());
            let port = port.or(cfg.port).unwrap_or(3000);
            let data_dir = data_dir
                .or(cfg.data_dir.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("data"));
            let max_body = max_body.or(cfg.max_body).unwrap_or(1_048_576);

            crate::api::serve(&host, port, data_dir, max_body).await
        }
    }
}

/// Load environment variables from a .env file.
/// If an explicit path is given, load from that path (error if missing).
/// Otherwise, auto-detect .env in the current working directory (silently skip if absent).
fn load_dotenv(explicit_path: Option<&std::path::Path>) {
    match explicit_path {
        Some(path) => match dotenvy::from_path(path) {
            Ok(()) => info!("Loaded env from {}", path.display()),
            Err(e) => {
                eprintln!(
                    "Warning: Failed to load dotenv file '{}': {}",
                    path.display(),
                    e
                );
            }
        },
        None => match dotenvy::dotenv() {
            Ok(path) => info!("Loaded env from {}", path.display()),
            Err(dotenvy::Error::Io(_)) => {
                // No .env file found — silently skip
            }
            Err(e) => {
                eprintln!("Warning: Failed to parse .env file: {}", e);
            }
        },
    }
}

fn load_workflow_file(path: &PathBuf) -> Result<WorkflowDefinition> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow file: {}", path.display()))?;
    let workflow: WorkflowDefinition = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse workflow file: {}", path.display()))?;
    Ok(workflow)
}

fn build_engine(data_dir: PathBuf) -> Result<(WorkflowEngine, Arc<JsonStore>)> {
    let registry = Arc::new(ConnectorRegistry::with_builtins()?);
    let storage = Arc::new(JsonStore::new(data_dir));
    let engine = WorkflowEngine::new(registry, storage.clone());
    Ok((engine, storage))
}

async fn cmd_run(
    workflow_path: PathBuf,
    context_json: Option<String>,
    verbose: bool,
    data_dir: PathBuf,
) -> Result<()> {
    let workflow = load_workflow_file(&workflow_path)?;
    workflow.validate()?;

    println!("Workflow: {} ({} steps)", workflow.name, workflow.steps.len());

    if verbose {
        println!("\nSteps:");
        for step in &workflow.steps {
            let next = step.next_step_id.as_deref().unwrap_or("(end)");
            println!("  {} [{}] -> {}", step.id, step.step_type, next);
        }
    }

    let initial_ctx: Context = match context_json {
        Some(json) => {
            serde_json::from_str(&json).with_context(|| "Failed to parse --context JSON")?
        }
        None => Context::new(),
    };

    let (engine, storage) = build_engine(data_dir)?;

    // Upsert the definition so the run references a stored workflow
    if storage.get_workflow(&workflow.id).await.is_ok() {
        engine.update_workflow(&workflow).await?;
    } else {
        engine.create_workflow(&workflow).await?;
    }

    let run = engine.trigger(&workflow.id, initial_ctx).await?;
    println!("\nRun ID: {}", run.id);

    // The trigger call never blocks on execution; poll until terminal.
    let run = loop {
        let run = engine.get_run(&run.id).await?;
        if run.status.is_terminal() {
            break run;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    };

    println!("Status: {}", run.status);
    if let Some(ref err) = run.error {
        println!("Error: {}", err);
    }

    println!("\nSteps:");
    for record in &run.steps {
        let status_icon = match record.status {
            StepStatus::Completed => "✓",
            StepStatus::Failed => "✗",
            StepStatus::Running => "⟳",
            StepStatus::Pending => "○",
        };
        println!("  {} {} [{}]", status_icon, record.step_id, record.status);
        if let Some(ref err) = record.error {
            println!("    Error: {}", err);
        }
        if verbose && let Some(ref output) = record.output {
            println!("    Output: {}", serde_json::to_string(output)?);
        }
    }

    if !run.context.is_empty() {
        println!("\nContext:");
        println!("{}", serde_json::to_string_pretty(&run.context)?);
    }

    Ok(())
}

fn cmd_validate(workflow_path: PathBuf) -> Result<()> {
    let registry = ConnectorRegistry::with_builtins()?;
    let workflow = load_workflow_file(&workflow_path)?;

    println!("Workflow: {}", workflow.name);
    println!("Steps: {}", workflow.steps.len());

    let mut errors = Vec::new();

    if let Err(e) = workflow.validate() {
        errors.push(e.to_string());
    }

    for step in &workflow.steps {
        match registry.get(&step.step_type) {
            None => errors.push(format!(
                "Step '{}' uses unknown step type '{}'",
                step.id, step.step_type
            )),
            Some(entry) => {
                if let Err(e) = entry.validate_config(&step.config) {
                    errors.push(format!("Step '{}' has invalid config: {}", step.id, e));
                }
            }
        }
    }

    if errors.is_empty() {
        println!("Validation: OK");

        println!("\nChain:");
        let mut current = Some(workflow.entry_point.clone());
        let mut visited = std::collections::HashSet::new();
        while let Some(step_id) = current {
            if !visited.insert(step_id.clone()) {
                println!("  (cycle back to '{}')", step_id);
                break;
            }
            if let Some(step) = workflow.step(&step_id) {
                println!("  {} [{}]", step.id, step.step_type);
                current = step.next_step_id.clone();
            } else {
                break;
            }
        }
    } else {
        println!("Validation: FAILED");
        for err in &errors {
            println!("  - {}", err);
        }
        anyhow::bail!("{} validation error(s) found", errors.len());
    }

    Ok(())
}

async fn cmd_list(workflow_id: Option<String>, data_dir: PathBuf, format: String) -> Result<()> {
    let storage = JsonStore::new(data_dir);

    let runs = storage.list_runs(workflow_id.as_deref()).await?;

    if runs.is_empty() {
        println!("No runs found.");
        return Ok(());
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    // Table format
    println!(
        "{:<38} {:<20} {:<10} {:<24}",
        "RUN ID", "WORKFLOW", "STATUS", "CREATED"
    );
    println!("{}", "-".repeat(92));

    for run in &runs {
        println!(
            "{:<38} {:<20} {:<10} {:<24}",
            run.id,
            run.workflow_id,
            run.status.to_string(),
            run.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!("\nTotal: {} run(s)", runs.len());
    Ok(())
}

async fn cmd_inspect(run_id: String, data_dir: PathBuf) -> Result<()> {
    let storage = JsonStore::new(data_dir);

    let run = storage
        .get_run(&run_id)
        .await
        .with_context(|| format!("Run '{}' not found", run_id))?;

    println!("{}", serde_json::to_string_pretty(&run)?);

    Ok(())
}

fn cmd_connectors() -> Result<()> {
    let registry = ConnectorRegistry::with_builtins()?;
    let connectors = registry.list();

    println!("{:<20} DESCRIPTION", "STEP TYPE");
    println!("{}", "-".repeat(60));

    for (name, desc) in &connectors {
        println!("{:<20} {}", name, desc);
    }

    println!("\nTotal: {} connector(s)", connectors.len());
    Ok(())
}

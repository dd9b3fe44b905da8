//! `workflow-toolkit` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server against a remote automation platform.
//! - `validate` — validate a workflow JSON file.
//! - `autofix`  — detect (and optionally repair) defects in a workflow file.
//! - `apply`    — apply a batch of diff operations to a workflow file.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine::{
    autofix::autofix, diff::apply_operations, Confidence, FailurePolicy, FixOptions, PartialUpdateReport,
    ValidationOptions, ValidationProfile, WorkflowGraph, WorkflowService,
};
use remote::{create_client, ClientConfig};

#[derive(Parser)]
#[command(
    name = "workflow-toolkit",
    about = "Edit, validate and repair automation workflows",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind: String,
        /// Base URL of the platform's REST API.
        #[arg(long, env = "N8N_API_URL", default_value = "http://localhost:5678/api/v1")]
        api_url: String,
        #[arg(long, env = "N8N_API_KEY", hide_env_values = true)]
        api_key: String,
        #[arg(long, env = "N8N_TIMEOUT_SECS", default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
        /// minimal, runtime, ai-friendly or strict.
        #[arg(long, default_value = "runtime", value_parser = parse_wire::<ValidationProfile>)]
        profile: ValidationProfile,
    },
    /// Report fixable defects in a workflow file.
    Autofix {
        path: PathBuf,
        /// Apply the fixes; requires `--output`.
        #[arg(long, requires = "output")]
        apply: bool,
        /// low, medium or high.
        #[arg(long, default_value = "medium", value_parser = parse_wire::<Confidence>)]
        confidence: Confidence,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Apply diff operations from a JSON array file to a workflow file.
    Apply {
        path: PathBuf,
        #[arg(long)]
        operations: PathBuf,
        #[arg(long)]
        continue_on_error: bool,
        /// Where to write the updated workflow; omitted means dry run.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            api_url,
            api_key,
            timeout_secs,
        } => {
            let config = ClientConfig {
                base_url: api_url,
                api_key,
                timeout: Duration::from_secs(timeout_secs),
            };
            let client = create_client(&config).context("invalid remote configuration")?;
            let state = api::AppState::new(WorkflowService::new(Arc::new(client)));

            info!("Starting API server on {bind}");
            api::serve(&bind, state).await.context("API server failed")?;
        }
        Command::Validate { path, profile } => {
            let graph: WorkflowGraph = read_json(&path)?;
            let options = ValidationOptions {
                profile,
                ..ValidationOptions::default()
            };
            let report = engine::validate_workflow(&graph, &options);
            print_json(&report)?;
            if !report.valid {
                std::process::exit(1);
            }
        }
        Command::Autofix {
            path,
            apply,
            confidence,
            output,
        } => {
            let mut graph: WorkflowGraph = read_json(&path)?;
            let options = FixOptions {
                apply_fixes: apply,
                confidence_threshold: confidence,
                ..FixOptions::default()
            };
            let summary = autofix(&mut graph, &options);
            print_json(&summary)?;

            if let Some(output) = output.filter(|_| apply) {
                write_json(&output, &graph)?;
                info!("{} fix(es) written to {}", summary.fixes_applied, output.display());
            }
        }
        Command::Apply {
            path,
            operations,
            continue_on_error,
            output,
        } => {
            let graph: WorkflowGraph = read_json(&path)?;
            let ops: Vec<Value> = read_json(&operations)?;
            let outcome = apply_operations(&graph, &ops, FailurePolicy::from_continue_on_error(continue_on_error));

            let dry_run = output.is_none();
            let persist = !dry_run && outcome.is_committable();
            let id = graph.id.clone().unwrap_or_else(|| path.display().to_string());
            print_json(&PartialUpdateReport::from_outcome(&id, &outcome, dry_run, persist))?;

            if let Some(output) = output.filter(|_| persist) {
                write_json(&output, &outcome.workflow)?;
                info!("updated workflow written to {}", output.display());
            }
            if !outcome.failed.is_empty() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Parse a CLI value using the type's JSON wire name.
fn parse_wire<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(Value::String(raw.to_owned())).map_err(|e| e.to_string())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content).with_context(|| format!("cannot write file {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

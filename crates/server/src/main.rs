//! Ideaforge Server
//!
//! Axum server and CLI around the Ideaforge coordinator.

mod api;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ideaforge_core::agents::{EchoGenerator, FailurePolicy};
use ideaforge_core::swarm::{new_workflow_id, Coordinator, CoordinatorConfig};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = ".ideaforge/config.json";

#[derive(Parser, Clone)]
#[command(author, version, about = "Ideaforge - product idea to launch plan")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
    /// Coordinator config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Use the deterministic offline generator instead of an LLM
    #[arg(long, global = true)]
    offline: bool,
    /// Continue from sales to support
    #[arg(long, global = true)]
    support_handoff: bool,
    /// Stop a workflow at the first failed generation
    #[arg(long, global = true)]
    halt_on_error: bool,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the Ideaforge server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// Run the pipeline once and print the transcript (no server)
    Run {
        /// The product idea
        idea: String,
        #[arg(short, long)]
        workflow_id: Option<String>,
    },
}

/// Coordinator config from `path`; defaults when the file does not exist
async fn load_config(path: &Path) -> anyhow::Result<CoordinatorConfig> {
    if !path.exists() {
        return Ok(CoordinatorConfig::default());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
}

fn apply_overrides(config: &mut CoordinatorConfig, args: &Args) {
    if args.support_handoff {
        config.support_handoff = true;
    }
    if args.halt_on_error {
        config.failure_policy = FailurePolicy::Halt;
    }
}

fn build_coordinator(config: CoordinatorConfig, offline: bool) -> Coordinator {
    if offline {
        tracing::info!("Offline mode: using the echo generator");
        Coordinator::with_generator(config, Arc::new(EchoGenerator))
    } else {
        Coordinator::new(config)
    }
}

async fn run_once(
    coordinator: Coordinator,
    idea: &str,
    workflow_id: Option<String>,
) -> anyhow::Result<()> {
    let workflow_id = workflow_id.unwrap_or_else(new_workflow_id);
    println!("Running pipeline {} for: {}", workflow_id, idea);

    let report = coordinator
        .run(idea, &workflow_id)
        .await
        .context("Pipeline did not start")?;

    for line in report.transcript_lines() {
        println!("{}\n", line);
    }
    match report.final_stage {
        Some(stage) => println!("Final stage: {}", stage),
        None => println!("Final stage: none"),
    }
    Ok(())
}

async fn serve(coordinator: Coordinator, port: u16) -> anyhow::Result<()> {
    let state = api::AppState::new(coordinator);
    let app = api::router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("Ideaforge server running at http://{}", addr);
    tracing::info!("   POST /api/process-idea");
    tracing::info!("   GET  /api/v1/workflows/:id, /api/v1/agents, /api/v1/events");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Provider API keys usually live in .env
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = load_config(&args.config).await?;
    apply_overrides(&mut config, &args);
    let coordinator = build_coordinator(config, args.offline);

    match args.command.clone() {
        Some(CliCommand::Run { idea, workflow_id }) => {
            run_once(coordinator, &idea, workflow_id).await
        }
        Some(CliCommand::Serve { port }) => serve(coordinator, port).await,
        None => serve(coordinator, 8080).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_config_falls_back_to_defaults() {
        let config = load_config(Path::new("does/not/exist.json")).await.unwrap();
        assert_eq!(config.generation_timeout_secs, 120);
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "ideaforge",
            "--support-handoff",
            "--halt-on-error",
            "run",
            "smart water bottle",
        ]);
        let mut config = CoordinatorConfig::default();
        apply_overrides(&mut config, &args);

        assert!(config.support_handoff);
        assert_eq!(config.failure_policy, FailurePolicy::Halt);
        assert!(matches!(args.command, Some(CliCommand::Run { ref idea, .. }) if idea == "smart water bottle"));
    }
}

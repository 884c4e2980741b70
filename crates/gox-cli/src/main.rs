//! gox orchestrator binary: loads a declarative config, deploys every cell it
//! names under a default project, and runs until interrupted.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use gox_orchestrator::{Orchestrator, OrchestratorConfig};
use gox_types::ids::ProjectId;
use tracing::info;

/// gox orchestrator command line arguments.
#[derive(Parser, Debug)]
#[command(name = "gox")]
#[command(about = "Deploys gox cells and bridges them to this process")]
struct Args {
	/// Path to the orchestrator config file (support/broker ports, pool and
	/// cells file locations).
	#[arg(short, long, value_name = "PATH")]
	config: PathBuf,

	/// Project id to deploy every loaded cell under.
	#[arg(long, default_value = "default")]
	project: String,

	/// Verbose logging.
	#[arg(long)]
	debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	tracing_subscriber::fmt()
		.with_max_level(if args.debug { tracing::Level::DEBUG } else { tracing::Level::INFO })
		.init();

	match run(args).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("gox: {err:#}");
			ExitCode::FAILURE
		}
	}
}

async fn run(args: Args) -> anyhow::Result<()> {
	let mut config = OrchestratorConfig::load(&args.config).with_context(|| format!("loading orchestrator config from {}", args.config.display()))?;
	config.debug = config.debug || args.debug;

	info!(support_port = config.support.port, broker_port = config.broker.port, "starting gox orchestrator");
	let orchestrator = Orchestrator::start(&config).await.context("starting Support and the broker")?;

	let project_id = ProjectId::new(args.project);
	let data_root = std::env::current_dir().context("resolving data root")?.join(".gox-data");
	let workbench_dir = data_root.join("workbench");
	std::fs::create_dir_all(&workbench_dir).with_context(|| format!("creating workbench directory {}", workbench_dir.display()))?;

	let cell_ids: Vec<_> = orchestrator.cells().iter().map(|c| c.id.clone()).collect();
	if cell_ids.is_empty() {
		tracing::warn!("no cells loaded from configuration; orchestrator is running with nothing deployed");
	}
	for cell_id in cell_ids {
		info!(cell = %cell_id, project = %project_id, "deploying cell");
		orchestrator
			.deploy(&cell_id, project_id.clone(), &data_root, &workbench_dir, &std::collections::HashMap::new())
			.await
			.with_context(|| format!("deploying cell {cell_id} for project {project_id}"))?;
	}

	tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
	info!("shutdown signal received, stopping all cells");
	orchestrator.close().await;
	Ok(())
}

//! Agent framework lifecycle (spec §4.4).

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use gox_broker::{Broker, Specifier, Subscription, parse_specifiers};
use gox_envelope::{Destination, Envelope};
use gox_registry::{RegistryHandle, RetrySchedule};
use gox_types::error::AgentError;
use gox_types::ids::{AgentId, AgentType, ProjectId};
use gox_types::lifecycle::LifecycleState;
use tokio_util::sync::CancellationToken;

use crate::cli::AgentArgs;
use crate::collector::{ChunkCollector, DEFAULT_GROUP_TIMEOUT};
use crate::file_watch::FileWatcher;
use crate::id::resolve_agent_id;
use crate::logic::AgentLogic;
use crate::vfs::Vfs;

/// How often a `file:<glob>` ingress source is re-scanned for new files.
const FILE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Everything the framework needs beyond CLI args and the user's logic:
/// the in-process collaborators an orchestrator-embedded agent is handed
/// directly, standing in for the out-of-process wire connections a
/// truly-distributed deployment would establish over `gox_host`/`port`.
pub struct AgentContext {
	pub registry: RegistryHandle,
	pub broker: Broker,
	pub data_root: PathBuf,
	pub project_id: ProjectId,
	pub capabilities: Vec<String>,
	pub cancel: CancellationToken,
}

/// Runs the ten-step agent lifecycle of spec §4.4 to completion (until
/// cancellation or a fatal configuration error).
pub async fn run<L: AgentLogic>(
	args: AgentArgs,
	agent_type: AgentType,
	context: AgentContext,
	mut logic: L,
) -> Result<(), AgentError> {
	// Step 1: resolve agent id.
	let id = resolve_agent_id(args.agent_id.as_deref(), agent_type.as_str());
	let span = tracing::info_span!("agent", agent_id = %id, agent_type = %agent_type);
	let _entered = span.enter();

	// Step 2: connect to Support. In this in-process embedding the registry
	// handle is already live; the connectivity risk this step exists for
	// (orchestrator starting agents before Support finishes binding) only
	// applies to out-of-process agents, which are not wired up here.
	tracing::info!("connected to support");

	// Step 3: discover the broker address through Support, retrying since
	// the orchestrator may not have called SetBrokerAddress yet.
	let retry = RetrySchedule::support_default();
	retry
		.run("discover-broker", || async {
			context.registry.get_broker().await.ok_or(AgentError::Connectivity(anyhow::anyhow!(
				"broker address not yet published by Support"
			)))
		})
		.await?;

	// Step 4: register with Support, advertising capabilities. Ingress and
	// egress are not yet known (they come from the cell config fetched
	// next), so the descriptor is registered with placeholders.
	context
		.registry
		.register_agent(id.clone(), agent_type.clone(), context.capabilities.clone(), String::new(), String::new())
		.await
		.map_err(|e| AgentError::Connectivity(anyhow::anyhow!(e)))?;

	// Step 5: fetch cell-specific configuration.
	let cell_config = context
		.registry
		.get_agent_cell_config(id.clone())
		.await
		.map_err(|e| AgentError::Connectivity(anyhow::anyhow!(e)))?;
	let file_config = load_file_config(args.config.as_deref());
	let merged_config = merge_configs(file_config, cell_config.config.clone());

	// Step 6: initialise the VFS.
	let vfs = Vfs::new(&context.data_root, &context.project_id, false);

	// Step 7: parse ingress/egress specifiers.
	if cell_config.ingress.is_empty() || cell_config.egress.is_empty() {
		return Err(AgentError::MissingConfiguration { agent: id.clone() });
	}
	let ingress = parse_specifiers(&cell_config.ingress).map_err(|reason| AgentError::Protocol {
		envelope: gox_types::ids::EnvelopeId::generate(),
		reason,
	})?;
	let egress = parse_specifiers(&cell_config.egress).map_err(|reason| AgentError::Protocol {
		envelope: gox_types::ids::EnvelopeId::generate(),
		reason,
	})?;

	context
		.registry
		.report_state_change(id.clone(), LifecycleState::Configured)
		.await
		.map_err(|e| AgentError::Connectivity(anyhow::anyhow!(e)))?;

	// Step 8: user Init.
	logic.init().await?;
	context
		.registry
		.report_state_change(id.clone(), LifecycleState::Running)
		.await
		.map_err(|e| AgentError::Connectivity(anyhow::anyhow!(e)))?;

	// Step 9: message loop.
	let collector = ChunkCollector::new(DEFAULT_GROUP_TIMEOUT);
	collector.spawn_sweeper(Duration::from_secs(60), context.cancel.clone());

	let message_loop = run_message_loop(&id, &context.broker, &ingress, &egress, &collector, &mut logic, &vfs, &merged_config);

	tokio::select! {
		result = message_loop => result?,
		() = context.cancel.cancelled() => {}
	}

	// Step 10: shutdown.
	context
		.registry
		.report_state_change(id.clone(), LifecycleState::Stopping)
		.await
		.map_err(|e| AgentError::Connectivity(anyhow::anyhow!(e)))?;
	logic.cleanup().await?;
	context
		.registry
		.report_state_change(id.clone(), LifecycleState::Stopped)
		.await
		.map_err(|e| AgentError::Connectivity(anyhow::anyhow!(e)))?;
	tracing::info!("agent stopped");
	Ok(())
}

async fn run_message_loop<L: AgentLogic>(
	id: &AgentId,
	broker: &Broker,
	ingress: &[Specifier],
	egress: &[Specifier],
	collector: &std::sync::Arc<ChunkCollector>,
	logic: &mut L,
	_vfs: &Vfs,
	_config: &serde_json::Value,
) -> Result<(), AgentError> {
	let topic = ingress.iter().find_map(|s| match s {
		Specifier::Subscribe(topic) => Some(topic.clone()),
		_ => None,
	});
	let file_glob = ingress.iter().find_map(|s| match s {
		Specifier::File(glob) => Some(glob.clone()),
		_ => None,
	});

	if topic.is_none() && file_glob.is_none() {
		// Pipe-only ingress agents drive their own loop; nothing more for
		// the generic framework loop to do here.
		return Ok(());
	}

	let mut subscription = match topic {
		Some(topic) => Some(broker.subscribe(topic).await.map_err(|e| AgentError::Connectivity(anyhow::anyhow!(e)))?),
		None => None,
	};
	let mut watcher = file_glob.as_deref().map(FileWatcher::new);
	let mut ticker = tokio::time::interval(FILE_POLL_INTERVAL);
	let mut pending: VecDeque<Envelope> = VecDeque::new();

	loop {
		let mut envelope = if let Some(queued) = pending.pop_front() {
			queued
		} else {
			tokio::select! {
				maybe = recv_subscription(&mut subscription) => {
					match maybe {
						Some(env) => env,
						None => {
							subscription = None;
							if watcher.is_none() {
								break;
							}
							continue;
						}
					}
				}
				_ = ticker.tick(), if watcher.is_some() => {
					if let Some(w) = watcher.as_mut() {
						for path in w.poll().await {
							match tokio::fs::read(&path).await {
								Ok(bytes) => pending.push_back(Envelope::new(id.clone(), Destination::Agent(id.clone()), "application/octet-stream", bytes)),
								Err(err) => tracing::warn!(%err, path = %path.display(), "failed to read ingested file"),
							}
						}
					}
					continue;
				}
			}
		};

		envelope.record_hop(id.clone());

		let complete = collector
			.ingest(envelope)
			.await
			.map_err(|e| AgentError::Protocol {
				envelope: gox_types::ids::EnvelopeId::generate(),
				reason: e.to_string(),
			})?;
		let Some(complete) = complete else { continue };

		let outcome = logic.process_message(complete.clone()).await;
		let to_publish = match outcome {
			Ok(Some(out)) => Some(out),
			Ok(None) if logic.is_sink() => Some(complete),
			Ok(None) => None,
			Err(err) => {
				tracing::warn!(%err, "process_message failed, dropping envelope");
				None
			}
		};

		if let Some(mut out) = to_publish {
			out.record_hop(id.clone());
			for spec in egress {
				match spec {
					Specifier::Publish(topic) => {
						broker
							.publish(topic.clone(), out.clone())
							.await
							.map_err(|e| AgentError::Connectivity(anyhow::anyhow!(e)))?;
					}
					Specifier::Pipe(name) => {
						broker
							.send_pipe(name, out.clone())
							.await
							.map_err(|e| AgentError::Connectivity(anyhow::anyhow!(e)))?;
					}
					Specifier::Subscribe(_) | Specifier::File(_) => {}
				}
			}
		}
	}
	Ok(())
}

async fn recv_subscription(sub: &mut Option<Subscription>) -> Option<Envelope> {
	match sub {
		Some(s) => s.recv().await,
		None => std::future::pending().await,
	}
}

fn load_file_config(path: Option<&str>) -> serde_json::Value {
	let Some(path) = path.map(str::to_string).or_else(|| std::env::var("CONFIG_PATH").ok()) else {
		return serde_json::Value::Object(serde_json::Map::new());
	};
	std::fs::read_to_string(&path)
		.ok()
		.and_then(|text| serde_yaml::from_str::<serde_json::Value>(&text).ok())
		.unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
}

/// File config provides defaults; cell config (from Support) overrides
/// (spec §4.3 "Pool & cell loading").
fn merge_configs(file_config: serde_json::Value, cell_config: std::collections::HashMap<String, serde_json::Value>) -> serde_json::Value {
	let mut merged = match file_config {
		serde_json::Value::Object(map) => map,
		_ => serde_json::Map::new(),
	};
	for (key, value) in cell_config {
		merged.insert(key, value);
	}
	serde_json::Value::Object(merged)
}

#[cfg(test)]
mod tests {
	use gox_broker::{Broker, BrokerAddress, BrokerConfig, Codec};
	use gox_envelope::{Destination, Envelope};
	use gox_registry::RegistryService;
	use gox_types::ids::Topic;

	use super::*;

	struct Echo;

	#[async_trait::async_trait]
	impl AgentLogic for Echo {
		async fn process_message(&mut self, envelope: Envelope) -> Result<Option<Envelope>, AgentError> {
			let mut out = envelope.clone();
			out.destination = Destination::Topic(Topic::new("out"));
			Ok(Some(out))
		}
	}

	#[tokio::test]
	async fn missing_ingress_or_egress_fails_with_missing_configuration() {
		let registry = RegistryService::start();
		registry
			.set_broker_address(BrokerAddress {
				protocol: "tcp".into(),
				host: "localhost".into(),
				port: 9000,
				codec: Codec::Json,
			})
			.await;
		registry.load_cells(gox_registry::config::parse_cells("cell:\n  - id: demo\n    agents: []\n").unwrap()).await;

		let broker = Broker::start(BrokerConfig::default());
		let dir = tempfile::tempdir().unwrap();
		let context = AgentContext {
			registry,
			broker,
			data_root: dir.path().to_path_buf(),
			project_id: ProjectId::new("proj-1"),
			capabilities: vec![],
			cancel: CancellationToken::new(),
		};
		let args = AgentArgs {
			gox_host: None,
			agent_id: Some("a1".into()),
			config: None,
			debug: false,
			agent_type: None,
		};

		let result = run(args, AgentType::new("echo"), context, Echo).await;
		assert!(matches!(result, Err(AgentError::MissingConfiguration { .. })));
	}

	#[tokio::test]
	async fn full_lifecycle_echoes_a_message_and_shuts_down_on_cancel() {
		let registry = RegistryService::start();
		registry
			.set_broker_address(BrokerAddress {
				protocol: "tcp".into(),
				host: "localhost".into(),
				port: 9000,
				codec: Codec::Json,
			})
			.await;
		registry
			.load_cells(
				gox_registry::config::parse_cells(
					"cell:\n  - id: demo\n    agents:\n      - id: a1\n        agent_type: echo\n        ingress: \"sub:in\"\n        egress: \"pub:out\"\n",
				)
				.unwrap(),
			)
			.await;

		let broker = Broker::start(BrokerConfig::default());
		let cancel = CancellationToken::new();
		let dir = tempfile::tempdir().unwrap();
		let context = AgentContext {
			registry: registry.clone(),
			broker: broker.clone(),
			data_root: dir.path().to_path_buf(),
			project_id: ProjectId::new("proj-1"),
			capabilities: vec![],
			cancel: cancel.clone(),
		};
		let args = AgentArgs {
			gox_host: None,
			agent_id: Some("a1".into()),
			config: None,
			debug: false,
			agent_type: None,
		};

		let mut out_sub = broker.subscribe(Topic::new("out")).await.unwrap();
		let handle = tokio::spawn(run(args, AgentType::new("echo"), context, Echo));

		broker
			.publish(
				Topic::new("in"),
				Envelope::new(AgentId::new("sender"), Destination::Topic(Topic::new("in")), "text", b"hi".to_vec()),
			)
			.await
			.unwrap();

		let echoed = tokio::time::timeout(Duration::from_secs(1), out_sub.recv()).await.unwrap().unwrap();
		assert_eq!(echoed.payload, b"hi");

		cancel.cancel();
		tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap().unwrap();
	}

	#[tokio::test]
	async fn file_ingress_reads_dropped_file_and_publishes_it() {
		let registry = RegistryService::start();
		registry
			.set_broker_address(BrokerAddress {
				protocol: "tcp".into(),
				host: "localhost".into(),
				port: 9000,
				codec: Codec::Json,
			})
			.await;

		let watch_dir = tempfile::tempdir().unwrap();
		let cells_yaml = format!(
			"cell:\n  - id: demo\n    agents:\n      - id: a1\n        agent_type: echo\n        ingress: \"file:{}/*.txt\"\n        egress: \"pub:raw\"\n",
			watch_dir.path().display()
		);
		registry.load_cells(gox_registry::config::parse_cells(&cells_yaml).unwrap()).await;

		let broker = Broker::start(BrokerConfig::default());
		let cancel = CancellationToken::new();
		let data_dir = tempfile::tempdir().unwrap();
		let context = AgentContext {
			registry: registry.clone(),
			broker: broker.clone(),
			data_root: data_dir.path().to_path_buf(),
			project_id: ProjectId::new("proj-1"),
			capabilities: vec![],
			cancel: cancel.clone(),
		};
		let args = AgentArgs {
			gox_host: None,
			agent_id: Some("a1".into()),
			config: None,
			debug: false,
			agent_type: None,
		};

		let mut raw_sub = broker.subscribe(Topic::new("raw")).await.unwrap();
		let handle = tokio::spawn(run(args, AgentType::new("echo"), context, Echo));

		std::fs::write(watch_dir.path().join("hello.txt"), b"hello world").unwrap();

		let published = tokio::time::timeout(Duration::from_secs(2), raw_sub.recv()).await.unwrap().unwrap();
		assert_eq!(published.payload, b"hello world");

		cancel.cancel();
		tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap().unwrap();
	}
}

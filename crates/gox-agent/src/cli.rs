//! Per-agent CLI flags (spec §6 "Per-agent flags").

use clap::Parser;

/// Flags every gox agent binary accepts, parsed before `Agent::run`.
#[derive(Debug, Clone, Parser)]
#[command(name = "gox-agent", about = "gox agent process")]
pub struct AgentArgs {
	/// Support host, e.g. `localhost:7000`. Overrides the `HOST` env var.
	#[arg(long = "gox-host")]
	pub gox_host: Option<String>,

	/// Overrides agent id resolution (env `AGENT_ID`, then auto-generated).
	#[arg(long = "agent-id")]
	pub agent_id: Option<String>,

	/// Explicit per-agent config file path (env `CONFIG_PATH`).
	#[arg(long = "config")]
	pub config: Option<String>,

	/// Enables debug-level structured logging (env `DEBUG`).
	#[arg(long = "debug")]
	pub debug: bool,

	/// Declared agent type tag, used when not passed to `Agent::run` directly.
	#[arg(long = "type")]
	pub agent_type: Option<String>,
}

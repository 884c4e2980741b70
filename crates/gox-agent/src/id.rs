//! Agent id resolution (spec §4.4 step 1): CLI flag, then environment,
//! then an auto-generated `type-host-pid`.

use gox_types::ids::AgentId;

/// Resolves the agent id by priority: `cli_flag` > `AGENT_ID` env var >
/// an auto-generated id of the form `<agent_type>-<hostname>-<pid>`.
#[must_use]
pub fn resolve_agent_id(cli_flag: Option<&str>, agent_type: &str) -> AgentId {
	if let Some(id) = cli_flag {
		return AgentId::new(id);
	}
	if let Ok(id) = std::env::var("AGENT_ID") {
		return AgentId::new(id);
	}
	AgentId::new(auto_generated(agent_type))
}

fn auto_generated(agent_type: &str) -> String {
	let host = hostname();
	let pid = std::process::id();
	format!("{agent_type}-{host}-{pid}")
}

fn hostname() -> String {
	std::env::var("HOSTNAME")
		.ok()
		.or_else(|| std::env::var("COMPUTERNAME").ok())
		.unwrap_or_else(|| "localhost".to_string())
}

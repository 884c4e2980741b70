//! Agent framework: boilerplate-free agent lifecycle (spec §4.4).

pub mod agent;
pub mod cli;
pub mod collector;
pub mod file_watch;
pub mod id;
pub mod logic;
pub mod vfs;

pub use agent::{AgentContext, run};
pub use cli::AgentArgs;
pub use collector::{ChunkCollector, DEFAULT_GROUP_TIMEOUT};
pub use file_watch::FileWatcher;
pub use id::resolve_agent_id;
pub use logic::AgentLogic;
pub use vfs::Vfs;

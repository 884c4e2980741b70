//! File abstraction rooted at `DATA_ROOT/projects/<projectId>` (spec §6 "VFS").

use std::path::{Path, PathBuf};

use gox_types::error::AgentError;
use gox_types::ids::{AgentId, ProjectId};

/// A file abstraction scoped to one project's directory. Read-only mode is
/// available for query-only agents.
#[derive(Debug, Clone)]
pub struct Vfs {
	root: PathBuf,
	read_only: bool,
}

impl Vfs {
	/// Roots a VFS at `data_root/projects/<project_id>`.
	#[must_use]
	pub fn new(data_root: &Path, project_id: &ProjectId, read_only: bool) -> Self {
		Self {
			root: data_root.join("projects").join(project_id.as_str()),
			read_only,
		}
	}

	#[must_use]
	pub fn root(&self) -> &Path {
		&self.root
	}

	fn resolved(&self, relative: &str) -> PathBuf {
		self.root.join(relative)
	}

	pub async fn read(&self, relative: &str, agent: &AgentId) -> Result<Vec<u8>, AgentError> {
		tokio::fs::read(self.resolved(relative))
			.await
			.map_err(|e| AgentError::Connectivity(anyhow::anyhow!("vfs read failed for {agent}: {e}")))
	}

	pub async fn write(&self, relative: &str, contents: &[u8], agent: &AgentId) -> Result<(), AgentError> {
		if self.read_only {
			return Err(AgentError::Connectivity(anyhow::anyhow!(
				"vfs for {agent} is read-only, cannot write {relative}"
			)));
		}
		if let Some(parent) = self.resolved(relative).parent() {
			tokio::fs::create_dir_all(parent)
				.await
				.map_err(|e| AgentError::Connectivity(anyhow::anyhow!("vfs mkdir failed for {agent}: {e}")))?;
		}
		tokio::fs::write(self.resolved(relative), contents)
			.await
			.map_err(|e| AgentError::Connectivity(anyhow::anyhow!("vfs write failed for {agent}: {e}")))
	}

	pub async fn list(&self, relative: &str) -> Result<Vec<String>, AgentError> {
		let mut entries = tokio::fs::read_dir(self.resolved(relative))
			.await
			.map_err(|e| AgentError::Connectivity(anyhow::anyhow!("vfs list failed: {e}")))?;
		let mut names = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| AgentError::Connectivity(anyhow::anyhow!("vfs list failed: {e}")))?
		{
			names.push(entry.file_name().to_string_lossy().into_owned());
		}
		Ok(names)
	}

	pub async fn delete(&self, relative: &str) -> Result<(), AgentError> {
		if self.read_only {
			return Err(AgentError::Connectivity(anyhow::anyhow!(
				"vfs is read-only, cannot delete {relative}"
			)));
		}
		tokio::fs::remove_file(self.resolved(relative))
			.await
			.map_err(|e| AgentError::Connectivity(anyhow::anyhow!("vfs delete failed: {e}")))
	}

	pub async fn mkdir(&self, relative: &str) -> Result<(), AgentError> {
		if self.read_only {
			return Err(AgentError::Connectivity(anyhow::anyhow!(
				"vfs is read-only, cannot mkdir {relative}"
			)));
		}
		tokio::fs::create_dir_all(self.resolved(relative))
			.await
			.map_err(|e| AgentError::Connectivity(anyhow::anyhow!("vfs mkdir failed: {e}")))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn write_then_read_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let vfs = Vfs::new(dir.path(), &ProjectId::new("proj-1"), false);
		let agent = AgentId::new("a1");
		vfs.write("out/result.txt", b"hello", &agent).await.unwrap();
		let contents = vfs.read("out/result.txt", &agent).await.unwrap();
		assert_eq!(contents, b"hello");
	}

	#[tokio::test]
	async fn read_only_vfs_rejects_write() {
		let dir = tempfile::tempdir().unwrap();
		let vfs = Vfs::new(dir.path(), &ProjectId::new("proj-1"), true);
		let agent = AgentId::new("a1");
		let result = vfs.write("x.txt", b"no", &agent).await;
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn root_is_scoped_under_projects_directory() {
		let dir = tempfile::tempdir().unwrap();
		let vfs = Vfs::new(dir.path(), &ProjectId::new("proj-1"), false);
		assert_eq!(vfs.root(), dir.path().join("projects").join("proj-1"));
	}
}

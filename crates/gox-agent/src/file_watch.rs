//! Polling file-ingestion for `file:<glob>` ingress (spec §4.2's "opaque to
//! the broker, interpreted by the agent's own file-ingestion handler").

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Polls a directory for files matching a single-wildcard glob, yielding
/// each matching path at most once across the watcher's lifetime.
pub struct FileWatcher {
	dir: PathBuf,
	pattern: String,
	seen: HashSet<PathBuf>,
}

impl FileWatcher {
	/// Builds a watcher from a `dir/pattern` glob such as `./in/*.txt`. A
	/// bare pattern with no directory component watches the current directory.
	#[must_use]
	pub fn new(glob: &str) -> Self {
		let path = Path::new(glob);
		let (dir, pattern) = match (path.parent(), path.file_name()) {
			(Some(parent), Some(name)) if !parent.as_os_str().is_empty() => (parent.to_path_buf(), name.to_string_lossy().to_string()),
			_ => (PathBuf::from("."), glob.to_string()),
		};
		Self {
			dir,
			pattern,
			seen: HashSet::new(),
		}
	}

	/// Returns every file in the watched directory matching the glob that
	/// hasn't been returned by a previous call.
	pub async fn poll(&mut self) -> Vec<PathBuf> {
		let mut found = Vec::new();
		let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
			return found;
		};
		while let Ok(Some(entry)) = entries.next_entry().await {
			let path = entry.path();
			let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
				continue;
			};
			if matches_glob(name, &self.pattern) && !self.seen.contains(&path) {
				self.seen.insert(path.clone());
				found.push(path);
			}
		}
		found
	}
}

/// Matches `name` against `pattern`, which may contain at most one `*`
/// wildcard standing for any sequence of characters.
#[must_use]
pub fn matches_glob(name: &str, pattern: &str) -> bool {
	match pattern.split_once('*') {
		Some((prefix, suffix)) => name.len() >= prefix.len() + suffix.len() && name.starts_with(prefix) && name.ends_with(suffix),
		None => name == pattern,
	}
}

//! Per-file, per-worker, and system-wide metrics plus alerting
//! (spec §4.6 "Metrics").

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How many recent completion events the throughput window keeps.
const THROUGHPUT_WINDOW: usize = 32;

/// Metrics for a single file's chunk processing run.
#[derive(Debug, Clone)]
pub struct FileMetrics {
	pub total_chunks: u32,
	pub completed: u32,
	pub failed: u32,
	pub in_flight: u32,
	pub(crate) events_seen: u64,
	started_at: Instant,
	recent_events: VecDeque<Instant>,
}

impl FileMetrics {
	#[must_use]
	pub fn new(total_chunks: u32) -> Self {
		Self {
			total_chunks,
			completed: 0,
			failed: 0,
			in_flight: 0,
			events_seen: 0,
			started_at: Instant::now(),
			recent_events: VecDeque::with_capacity(THROUGHPUT_WINDOW),
		}
	}

	/// Records a completion or failure event for the throughput window.
	pub fn record_event(&mut self) {
		self.events_seen += 1;
		if self.recent_events.len() == THROUGHPUT_WINDOW {
			self.recent_events.pop_front();
		}
		self.recent_events.push_back(Instant::now());
	}

	/// Completions+failures per second over the last [`THROUGHPUT_WINDOW`] events.
	#[must_use]
	pub fn throughput_per_sec(&self) -> f64 {
		let Some(first) = self.recent_events.front() else {
			return 0.0;
		};
		let span = first.elapsed().as_secs_f64();
		if span <= 0.0 {
			return 0.0;
		}
		self.recent_events.len() as f64 / span
	}

	/// Average per-chunk processing time across the whole run so far.
	#[must_use]
	pub fn average_processing_time(&self) -> Duration {
		let finished = self.completed + self.failed;
		if finished == 0 {
			return Duration::ZERO;
		}
		self.started_at.elapsed() / finished
	}
}

/// Metrics for a single worker slot in the chunk coordinator's pool.
#[derive(Debug, Clone, Default)]
pub struct WorkerMetrics {
	pub completed_count: u64,
	pub bytes_processed: u64,
	pub last_active: Option<Instant>,
}

/// Totals across every file processed by one coordinator.
#[derive(Debug, Clone, Default)]
pub struct SystemMetrics {
	pub total_chunks: u64,
	pub total_completed: u64,
	pub total_failed: u64,
	pub async_capable_chunks: u64,
}

impl SystemMetrics {
	/// Rolls one file's metrics into the running system totals.
	pub fn absorb(&mut self, file: &FileMetrics, async_capable_chunks: u64) {
		self.total_chunks += u64::from(file.total_chunks);
		self.total_completed += u64::from(file.completed);
		self.total_failed += u64::from(file.failed);
		self.async_capable_chunks += async_capable_chunks;
	}

	#[must_use]
	pub fn failure_rate_pct(&self) -> f64 {
		let finished = self.total_completed + self.total_failed;
		if finished == 0 {
			return 0.0;
		}
		100.0 * self.total_failed as f64 / finished as f64
	}

	#[must_use]
	pub fn async_capable_pct(&self) -> f64 {
		if self.total_chunks == 0 {
			return 0.0;
		}
		100.0 * self.async_capable_chunks as f64 / self.total_chunks as f64
	}
}

/// Configurable alert thresholds, checked against a [`SystemMetrics`]
/// snapshot plus a throughput/stall reading to produce human-readable
/// alert strings.
#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
	pub max_failure_rate_pct: f64,
	pub min_throughput_per_sec: f64,
	pub max_average_processing_time: Duration,
	pub stall_detection_window: Duration,
}

impl Default for AlertThresholds {
	fn default() -> Self {
		Self {
			max_failure_rate_pct: 5.0,
			min_throughput_per_sec: 1.0,
			max_average_processing_time: Duration::from_secs(30),
			stall_detection_window: Duration::from_secs(60),
		}
	}
}

impl AlertThresholds {
	/// Checks `system` plus a live `file` reading against the thresholds,
	/// returning one human-readable string per violated threshold.
	#[must_use]
	pub fn check(&self, system: &SystemMetrics, file: &FileMetrics, since_last_completion: Duration) -> Vec<String> {
		let mut alerts = Vec::new();
		let failure_rate = system.failure_rate_pct();
		if failure_rate > self.max_failure_rate_pct {
			alerts.push(format!(
				"failure rate {failure_rate:.1}% exceeds threshold {:.1}%",
				self.max_failure_rate_pct
			));
		}
		let throughput = file.throughput_per_sec();
		if file.events_seen > 0 && throughput < self.min_throughput_per_sec {
			alerts.push(format!(
				"throughput {throughput:.2}/s is below threshold {:.2}/s",
				self.min_throughput_per_sec
			));
		}
		let avg = file.average_processing_time();
		if avg > self.max_average_processing_time {
			alerts.push(format!(
				"average processing time {avg:?} exceeds threshold {:?}",
				self.max_average_processing_time
			));
		}
		if since_last_completion > self.stall_detection_window {
			alerts.push(format!(
				"no completions in {since_last_completion:?}, exceeding stall window {:?}",
				self.stall_detection_window
			));
		}
		alerts
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn failure_rate_is_zero_with_no_finished_chunks() {
		let system = SystemMetrics::default();
		assert_eq!(system.failure_rate_pct(), 0.0);
	}

	#[test]
	fn failure_rate_reflects_absorbed_file_metrics() {
		let mut file = FileMetrics::new(4);
		file.completed = 3;
		file.failed = 1;
		let mut system = SystemMetrics::default();
		system.absorb(&file, 2);
		assert_eq!(system.failure_rate_pct(), 25.0);
		assert_eq!(system.async_capable_pct(), 50.0);
	}

	#[test]
	fn stall_alert_fires_past_the_window() {
		let thresholds = AlertThresholds::default();
		let system = SystemMetrics::default();
		let file = FileMetrics::new(1);
		let alerts = thresholds.check(&system, &file, Duration::from_secs(120));
		assert!(alerts.iter().any(|a| a.contains("stall window")));
	}

	#[test]
	fn no_alerts_when_everything_is_within_threshold() {
		let thresholds = AlertThresholds::default();
		let mut system = SystemMetrics::default();
		let mut file = FileMetrics::new(1);
		file.completed = 1;
		system.absorb(&file, 1);
		let alerts = thresholds.check(&system, &file, Duration::from_secs(1));
		assert!(!alerts.iter().any(|a| a.contains("failure rate") || a.contains("stall window")));
	}
}

//! Retry discipline for reaching Support (spec §4.3 "Retry discipline").
//!
//! A fixed interval, bounded to roughly fifteen minutes of total wall-clock
//! time. The first retry logs a "likely misconfiguration" hint, since a
//! connectivity failure that persists past one interval is far more often a
//! typo'd host/port than a transient network blip.

use std::time::Duration;

/// Drives a bounded, fixed-interval retry loop.
#[derive(Debug, Clone, Copy)]
pub struct RetrySchedule {
	interval: Duration,
	cap: Duration,
}

impl RetrySchedule {
	/// The default schedule: retry every 30 seconds for up to ~15 minutes.
	#[must_use]
	pub fn support_default() -> Self {
		Self {
			interval: Duration::from_secs(30),
			cap: Duration::from_secs(15 * 60),
		}
	}

	#[must_use]
	pub fn new(interval: Duration, cap: Duration) -> Self {
		Self { interval, cap }
	}

	/// Runs `attempt` until it returns `Ok`, sleeping `interval` between
	/// tries, until the cumulative elapsed time exceeds `cap`, at which
	/// point the last error is returned.
	pub async fn run<T, E, F, Fut>(&self, label: &str, mut attempt: F) -> Result<T, E>
	where
		F: FnMut() -> Fut,
		Fut: std::future::Future<Output = Result<T, E>>,
	{
		let mut elapsed = Duration::ZERO;
		let mut tries = 0u32;
		loop {
			match attempt().await {
				Ok(value) => return Ok(value),
				Err(err) => {
					tries += 1;
					if elapsed >= self.cap {
						tracing::error!(%label, tries, "retry budget exhausted, giving up");
						return Err(err);
					}
					if tries == 1 {
						tracing::warn!(
							%label,
							"connection attempt failed; this is often a misconfigured host/port rather than a transient outage"
						);
					} else {
						tracing::warn!(%label, tries, "retrying after failure");
					}
					tokio::time::sleep(self.interval).await;
					elapsed += self.interval;
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;

	#[tokio::test(start_paused = true)]
	async fn succeeds_once_attempt_stops_failing() {
		let schedule = RetrySchedule::new(Duration::from_millis(10), Duration::from_secs(1));
		let count = AtomicU32::new(0);
		let result: Result<u32, &'static str> = schedule
			.run("test", || async {
				let n = count.fetch_add(1, Ordering::SeqCst) + 1;
				if n < 3 { Err("not yet") } else { Ok(n) }
			})
			.await;
		assert_eq!(result, Ok(3));
	}

	#[tokio::test(start_paused = true)]
	async fn gives_up_after_cap_exceeded() {
		let schedule = RetrySchedule::new(Duration::from_millis(10), Duration::from_millis(25));
		let result: Result<(), &'static str> = schedule.run("test", || async { Err("always fails") }).await;
		assert_eq!(result, Err("always fails"));
	}
}

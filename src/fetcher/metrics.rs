// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token lifecycle and session recovery.
#[derive(Debug, Default)]
pub struct FetcherMetrics {
	refresh_attempts: AtomicU64,
	refresh_successes: AtomicU64,
	refresh_failures: AtomicU64,
	invalid_sessions: AtomicU64,
	retried_requests: AtomicU64,
	revocations: AtomicU64,
}
impl FetcherMetrics {
	/// Returns the total number of refresh-token grant exchanges started.
	pub fn refresh_attempts(&self) -> u64 {
		self.refresh_attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes that stored a new access token.
	pub fn refresh_successes(&self) -> u64 {
		self.refresh_successes.load(Ordering::Relaxed)
	}

	/// Returns the number of failed refreshes.
	pub fn refresh_failures(&self) -> u64 {
		self.refresh_failures.load(Ordering::Relaxed)
	}

	/// Returns the number of `INVALID_SESSION_ID` responses observed.
	pub fn invalid_sessions(&self) -> u64 {
		self.invalid_sessions.load(Ordering::Relaxed)
	}

	/// Returns the number of requests replayed after session recovery.
	pub fn retried_requests(&self) -> u64 {
		self.retried_requests.load(Ordering::Relaxed)
	}

	/// Returns the number of successful revocations.
	pub fn revocations(&self) -> u64 {
		self.revocations.load(Ordering::Relaxed)
	}

	pub(crate) fn record_refresh_attempt(&self) {
		self.refresh_attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_success(&self) {
		self.refresh_successes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh_failure(&self) {
		self.refresh_failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_invalid_session(&self) {
		self.invalid_sessions.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_retries(&self, count: usize) {
		self.retried_requests.fetch_add(count as u64, Ordering::Relaxed);
	}

	pub(crate) fn record_revocation(&self) {
		self.revocations.fetch_add(1, Ordering::Relaxed);
	}
}

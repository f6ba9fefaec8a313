//! Observability helpers for fetcher operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to emit structured spans named
//!   `salesforce_fetcher.operation` with the `operation` and `stage` fields, plus log events for
//!   token refreshes, revocations, and invalid-session replays.
//! - Enable `metrics` to increment the `salesforce_fetcher_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`.
//!
//! Token lifecycle notifications ([`FetcherEvent`]) are always available through
//! [`FetcherObserver`] registrations, independent of both features.

mod events;
mod metrics;
mod tracing;

pub use events::*;
pub use metrics::*;
pub use tracing::*;

pub(crate) use tracing::log_event;

// self
use crate::_prelude::*;

/// Operations observed by the fetcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Refresh-token grant exchange.
	Refresh,
	/// Access token revocation.
	Revoke,
	/// Authenticated JSON request.
	FetchJson,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Refresh => "refresh",
			OperationKind::Revoke => "revoke",
			OperationKind::FetchJson => "fetch_json",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to a fetcher operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

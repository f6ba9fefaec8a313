//! Token store state and the pending-request queue.

// crates.io
use futures::channel::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret, request::FetchResponse, request::RequestOptions};

/// Completion handle for a parked request.
pub(super) type Completion = oneshot::Sender<Result<FetchResponse>>;

/// Mutable state owned by one fetcher; every field is read and written under one lock.
#[derive(Debug, Default)]
pub(super) struct TokenState {
	pub(super) access_token: Option<TokenSecret>,
	pub(super) refreshed_at: Option<OffsetDateTime>,
	pub(super) is_refreshing_access_token: bool,
	pub(super) pending_requests: Vec<PendingRequest>,
}
impl TokenState {
	/// Decides how to recover from an invalid-session response produced with `used`.
	///
	/// The request is parked whenever a refresh is (or is about to be) in flight. When the
	/// token that failed has already been replaced, nothing is parked and the caller replays
	/// immediately with the current token.
	pub(super) fn recover(&mut self, used: &TokenSecret, request: PendingRequest) -> Recovery {
		if self.is_refreshing_access_token {
			self.pending_requests.push(request);

			return Recovery::Queued;
		}
		if self.access_token.as_ref() != Some(used) {
			return Recovery::RetryNow;
		}

		self.is_refreshing_access_token = true;
		self.pending_requests.push(request);

		Recovery::StartRefresh
	}

	/// Ends the refresh window: clears the flag and hands back every parked request in
	/// enqueue order.
	pub(super) fn finish_refresh(&mut self) -> Vec<PendingRequest> {
		self.is_refreshing_access_token = false;

		std::mem::take(&mut self.pending_requests)
	}

	pub(super) fn store_token(&mut self, token: TokenSecret, now: OffsetDateTime) {
		self.access_token = Some(token);
		self.refreshed_at = Some(now);
	}

	pub(super) fn clear_token(&mut self) {
		self.access_token = None;
		self.refreshed_at = None;
	}
}

/// What the coordinator should do after an invalid-session response.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Recovery {
	/// This caller owns the refresh and the replay wave.
	StartRefresh,
	/// Parked; the in-flight refresh will replay it.
	Queued,
	/// The failing token is already stale; replay without refreshing.
	RetryNow,
}

/// Request parked until the in-flight refresh completes.
pub(super) struct PendingRequest {
	pub(super) request_url: String,
	pub(super) request_options: RequestOptions,
	/// Invalid-session responses this request has received so far.
	pub(super) attempts: u32,
	pub(super) completion: Completion,
}
impl Debug for PendingRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PendingRequest")
			.field("request_url", &self.request_url)
			.field("request_options", &self.request_options)
			.field("attempts", &self.attempts)
			.finish()
	}
}

/// Clears the refresh window if the task driving it is dropped mid-flight.
///
/// Dropping the parked completions wakes their callers with `RetryAbandoned` instead of
/// leaving them (and every later invalid-session detection) waiting forever.
pub(super) struct RefreshWindow<'a> {
	state: &'a Mutex<TokenState>,
	armed: bool,
}
impl<'a> RefreshWindow<'a> {
	pub(super) fn open(state: &'a Mutex<TokenState>) -> Self {
		Self { state, armed: true }
	}

	/// Closes the window normally and returns the parked requests.
	pub(super) fn close(mut self) -> Vec<PendingRequest> {
		self.armed = false;

		self.state.lock().finish_refresh()
	}
}
impl Drop for RefreshWindow<'_> {
	fn drop(&mut self) {
		if self.armed {
			let abandoned = self.state.lock().finish_refresh();

			drop(abandoned);
		}
	}
}

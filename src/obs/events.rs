// self
use crate::_prelude::*;

/// Token lifecycle notifications emitted by a fetcher.
///
/// Events carry no payload; they mark the points where the token store starts and finishes
/// talking to the OAuth endpoints so logging or telemetry hooks can follow along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetcherEvent {
	/// A refresh-token grant is about to be sent.
	AccessTokenRefreshing,
	/// A new access token was stored.
	AccessTokenRefreshed,
	/// A revoke request is about to be sent.
	AccessTokenRevoking,
	/// The cached access token was revoked and cleared.
	AccessTokenRevoked,
}
impl FetcherEvent {
	/// Returns the stable event name.
	pub const fn as_str(self) -> &'static str {
		match self {
			FetcherEvent::AccessTokenRefreshing => "accessTokenRefreshing",
			FetcherEvent::AccessTokenRefreshed => "accessTokenRefreshed",
			FetcherEvent::AccessTokenRevoking => "accessTokenRevoking",
			FetcherEvent::AccessTokenRevoked => "accessTokenRevoked",
		}
	}
}
impl Display for FetcherEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Receives [`FetcherEvent`] notifications.
///
/// Observers run inline on the task that triggered the event, so implementations should
/// return quickly (forward into a channel when real work is needed). Any
/// `Fn(FetcherEvent) + Send + Sync` closure is an observer.
pub trait FetcherObserver
where
	Self: Send + Sync,
{
	/// Handles a single lifecycle event.
	fn on_event(&self, event: FetcherEvent);
}
impl<F> FetcherObserver for F
where
	F: Fn(FetcherEvent) + Send + Sync,
{
	fn on_event(&self, event: FetcherEvent) {
		self(event)
	}
}

/// Registry of observers attached to one fetcher.
#[derive(Clone, Default)]
pub struct FetcherObservers(Arc<RwLock<Vec<Arc<dyn FetcherObserver>>>>);
impl FetcherObservers {
	/// Registers an observer; it receives every event emitted afterwards.
	pub fn subscribe(&self, observer: Arc<dyn FetcherObserver>) {
		self.0.write().push(observer);
	}

	/// Number of registered observers.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nobody is listening.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub(crate) fn emit(&self, event: FetcherEvent) {
		let observers = self.0.read().clone();

		for observer in observers {
			observer.on_event(event);
		}
	}
}
impl Debug for FetcherObservers {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("FetcherObservers").field(&self.len()).finish()
	}
}

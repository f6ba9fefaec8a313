//! Token lifecycle and request coordination for one credential set.
//!
//! A [`Fetcher`] owns the cached access token, the refresh-in-flight flag, and the queue of
//! requests waiting for a new token. [`Fetcher::fetch_json`] attaches the bearer token, and
//! when the remote API answers with `INVALID_SESSION_ID` the request is parked while exactly
//! one refresh-token grant runs; every request parked during that window is replayed once the
//! new token is stored.

mod coordinator;
mod metrics;
mod state;
mod token;

pub use metrics::FetcherMetrics;

// crates.io
use oauth2::{HttpRequest, HttpResponse};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	http::FetchHttpClient,
	oauth::TransportErrorMapper,
	obs::{FetcherObserver, FetcherObservers, OperationKind, log_event},
	options::FetcherOptions,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};
use state::TokenState;

#[cfg(feature = "reqwest")]
/// Fetcher specialized for the crate's default reqwest transport stack.
pub type ReqwestFetcher = Fetcher<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Issues authenticated JSON requests, refreshing the access token when the session expires.
///
/// Clones are cheap handles to the same token store and retry queue; independent credential
/// sets need independent fetchers.
pub struct Fetcher<C, M>
where
	C: ?Sized + FetchHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	options: Arc<FetcherOptions>,
	state: Arc<Mutex<TokenState>>,
	refresh_guard: Arc<AsyncMutex<()>>,
	observers: FetcherObservers,
	metrics: Arc<FetcherMetrics>,
}
impl<C, M> Fetcher<C, M>
where
	C: ?Sized + FetchHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a fetcher that reuses the caller-provided transport + mapper pair.
	///
	/// A pre-populated [`FetcherOptions::access_token`] is discarded: the fetcher only trusts
	/// tokens it obtained itself, so the first request always performs a refresh.
	pub fn with_http_client(
		mut options: FetcherOptions,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		if options.access_token.take().is_some() {
			log_event!(debug, "Discarding caller-supplied access token.");
		}

		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			options: Arc::new(options),
			state: Default::default(),
			refresh_guard: Default::default(),
			observers: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Registers an observer and returns the fetcher for chaining.
	pub fn with_observer(self, observer: impl FetcherObserver + 'static) -> Self {
		self.observers.subscribe(Arc::new(observer));

		self
	}

	/// Registers an observer on a live fetcher.
	pub fn subscribe(&self, observer: Arc<dyn FetcherObserver>) {
		self.observers.subscribe(observer);
	}

	/// Options this fetcher was built with (without the discarded access token).
	pub fn options(&self) -> &FetcherOptions {
		&self.options
	}

	/// Counters for refreshes, invalid sessions, replays, and revocations.
	pub fn metrics(&self) -> &FetcherMetrics {
		&self.metrics
	}

	/// Currently cached access token, if any.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.state.lock().access_token.clone()
	}

	/// Returns `true` while a session-recovery refresh is outstanding.
	pub fn is_refreshing_access_token(&self) -> bool {
		self.state.lock().is_refreshing_access_token
	}

	/// Number of requests parked until the in-flight refresh completes.
	pub fn pending_request_count(&self) -> usize {
		self.state.lock().pending_requests.len()
	}

	/// Instant the cached token was stored.
	pub fn last_refreshed_at(&self) -> Option<OffsetDateTime> {
		self.state.lock().refreshed_at
	}

	async fn send(&self, operation: OperationKind, request: HttpRequest) -> Result<HttpResponse> {
		self.http_client
			.execute(request)
			.await
			.map_err(|err| self.transport_mapper.map_transport_error(operation, err))
	}
}
#[cfg(feature = "reqwest")]
impl Fetcher<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a new fetcher backed by its own reqwest transport.
	pub fn new(options: FetcherOptions) -> Self {
		Self::with_http_client(
			options,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Clone for Fetcher<C, M>
where
	C: ?Sized + FetchHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			options: self.options.clone(),
			state: self.state.clone(),
			refresh_guard: self.refresh_guard.clone(),
			observers: self.observers.clone(),
			metrics: self.metrics.clone(),
		}
	}
}
impl<C, M> Debug for Fetcher<C, M>
where
	C: ?Sized + FetchHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("Fetcher")
			.field("base_url", &self.options.base_url.as_str())
			.field("client_id", &self.options.client_id)
			.field("access_token_set", &state.access_token.is_some())
			.field("is_refreshing_access_token", &state.is_refreshing_access_token)
			.field("pending_requests", &state.pending_requests.len())
			.finish()
	}
}

fn parse_json(request_url: &str, response: &HttpResponse) -> Result<Value> {
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| Error::ResponseParse {
		request_url: request_url.to_owned(),
		status: response.status().as_u16(),
		source,
	})
}

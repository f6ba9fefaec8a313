//! Authenticated JSON requests with invalid-session recovery.
//!
//! An `INVALID_SESSION_ID` response parks the request in the pending queue. The first request
//! to park opens a refresh window and drives one refresh; once it resolves, the window closes
//! and every parked request is replayed as one wave, each replay resolving the future of the
//! caller that originally issued it.

// crates.io
use futures::{channel::oneshot, future::join_all};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	fetcher::{
		Fetcher, parse_json,
		state::{PendingRequest, Recovery, RefreshWindow},
	},
	http::FetchHttpClient,
	interpret,
	oauth::TransportErrorMapper,
	obs::{self, OperationKind, OperationOutcome, OperationSpan, log_event},
	request::{self, FetchResponse, RawResponse, RequestOptions},
};

type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<FetchResponse>> + 'a + Send>>;

impl<C, M> Fetcher<C, M>
where
	C: ?Sized + FetchHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Issues an authenticated request and resolves with its JSON payload.
	///
	/// `request_url` may be absolute or relative to the configured base URL. Any
	/// `Authorization` header in `request_options` is replaced with the fetcher's bearer token.
	/// `204 No Content` resolves with [`FetchResponse::NoContent`] and an unread body.
	///
	/// When the remote API reports `INVALID_SESSION_ID`, the returned future stays pending
	/// until the access token has been refreshed and the request replayed; the replay's
	/// outcome is what the caller receives.
	pub async fn fetch_json(
		&self,
		request_url: &str,
		request_options: RequestOptions,
	) -> Result<FetchResponse> {
		const KIND: OperationKind = OperationKind::FetchJson;

		let span = OperationSpan::new(KIND, "fetch_json");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result =
			span.instrument(self.dispatch(request_url.to_owned(), request_options, 0)).await;

		match &result {
			Ok(_) => obs::record_operation_outcome(KIND, OperationOutcome::Success),
			Err(_) => obs::record_operation_outcome(KIND, OperationOutcome::Failure),
		}

		result
	}

	fn dispatch(
		&self,
		request_url: String,
		request_options: RequestOptions,
		attempts: u32,
	) -> FetchFuture<'_> {
		Box::pin(async move {
			let url = self.options.resolve_url(&request_url)?;
			let token = self.get_access_token().await?;
			let request = request_options.authorized(&token).to_http_request(&url)?;

			log_event!(
				debug,
				method = %request_options.method,
				url = %url,
				attempts,
				"Dispatching request."
			);

			let response = self.send(OperationKind::FetchJson, request).await?;

			if request::is_no_content(response.status()) {
				return Ok(FetchResponse::NoContent(RawResponse::from_http(response)));
			}

			let status = response.status().as_u16();
			let body = parse_json(url.as_str(), &response)?;

			if interpret::is_invalid_session(&body) {
				return self
					.recover_session(request_url, request_options, token, attempts + 1)
					.await;
			}

			let body = interpret::interpret(url.as_str(), &request_options, status, body)?;

			Ok(FetchResponse::Json { status, body })
		})
	}

	async fn recover_session(
		&self,
		request_url: String,
		request_options: RequestOptions,
		used: TokenSecret,
		attempts: u32,
	) -> Result<FetchResponse> {
		self.metrics.record_invalid_session();

		log_event!(
			warn,
			request_url = %request_url,
			attempts,
			"Remote API reported an invalid session."
		);

		if attempts > self.options.session_retry_limit {
			log_event!(
				error,
				request_url = %request_url,
				attempts,
				"Giving up on session recovery."
			);

			return Err(Error::SessionRetriesExhausted { request_url, attempts });
		}

		let (completion, receiver) = oneshot::channel();
		let pending = PendingRequest {
			request_url: request_url.clone(),
			request_options: request_options.clone(),
			attempts,
			completion,
		};
		let recovery = self.state.lock().recover(&used, pending);

		match recovery {
			Recovery::StartRefresh => self.run_retry_wave().await,
			Recovery::Queued => {
				log_event!(debug, request_url = %request_url, "Parked behind in-flight refresh.");
			},
			Recovery::RetryNow => {
				self.metrics.record_retries(1);

				return self.dispatch(request_url, request_options, attempts).await;
			},
		}

		receiver.await.unwrap_or_else(|_| Err(Error::RetryAbandoned { request_url }))
	}

	async fn run_retry_wave(&self) {
		let window = RefreshWindow::open(&self.state);
		let refreshed = self.refresh_access_token().await;
		let pending = window.close();

		match refreshed {
			Ok(_) => {
				self.metrics.record_retries(pending.len());

				log_event!(info, count = pending.len(), "Replaying parked requests.");

				join_all(pending.into_iter().map(|request| async move {
					let result = self
						.dispatch(
							request.request_url.clone(),
							request.request_options,
							request.attempts,
						)
						.await;

					if request.completion.send(result).is_err() {
						log_event!(
							debug,
							request_url = %request.request_url,
							"Caller dropped before its replay completed."
						);
					}
				}))
				.await;
			},
			Err(err) => {
				let err = Arc::new(err);

				for request in pending {
					if request.completion.send(Err(Error::RefreshFailed(err.clone()))).is_err() {
						log_event!(
							debug,
							request_url = %request.request_url,
							"Caller dropped before the refresh failure was delivered."
						);
					}
				}
			},
		}
	}
}

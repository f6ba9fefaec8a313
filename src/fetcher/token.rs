//! Token store operations: cached reads, the refresh-token grant, and revocation.

// crates.io
use oauth2::http::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::{TokenResponse, TokenSecret},
	error::RevokeError,
	fetcher::{Fetcher, parse_json},
	http::FetchHttpClient,
	oauth::{self, TransportErrorMapper},
	obs::{self, FetcherEvent, OperationKind, OperationOutcome, OperationSpan, log_event},
};

impl<C, M> Fetcher<C, M>
where
	C: ?Sized + FetchHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns the cached access token, performing a refresh when none is cached.
	///
	/// Concurrent callers that find the cache empty share one refresh.
	pub async fn get_access_token(&self) -> Result<TokenSecret> {
		if let Some(token) = self.access_token() {
			return Ok(token);
		}

		let _singleflight = self.refresh_guard.lock().await;

		if let Some(token) = self.access_token() {
			return Ok(token);
		}

		self.exchange_refresh_token().await.map(|response| response.access_token)
	}

	/// Performs a `grant_type=refresh_token` exchange and stores the new access token.
	///
	/// Emits [`FetcherEvent::AccessTokenRefreshing`] before the call and
	/// [`FetcherEvent::AccessTokenRefreshed`] after the token is stored.
	pub async fn refresh_access_token(&self) -> Result<TokenResponse> {
		let _singleflight = self.refresh_guard.lock().await;

		self.exchange_refresh_token().await
	}

	/// Revokes the cached access token and clears it.
	///
	/// Fails with [`Error::RevokeWithoutToken`] without any network call when nothing is
	/// cached.
	pub async fn revoke_access_token(&self) -> Result<()> {
		const KIND: OperationKind = OperationKind::Revoke;

		if self.access_token().is_none() {
			return Err(Error::RevokeWithoutToken);
		}

		let _singleflight = self.refresh_guard.lock().await;
		// A concurrent revoke may have won the guard first.
		let token = self.access_token().ok_or(Error::RevokeWithoutToken)?;
		let span = OperationSpan::new(KIND, "revoke_access_token");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);
		self.observers.emit(FetcherEvent::AccessTokenRevoking);

		let result = span
			.instrument(async {
				let revoke_url = &self.options.service_urls.revoke;
				let form = oauth::revoke_form(&token);
				let request = form.options.to_http_request(revoke_url)?;
				let response = self.send(KIND, request).await?;

				if response.status() != StatusCode::OK {
					return Err(RevokeError {
						request_url: revoke_url.to_string(),
						request_options: form.diagnostic,
						status: response.status().as_u16(),
						body: String::from_utf8_lossy(response.body()).into_owned(),
					}
					.into());
				}

				Ok(())
			})
			.await;

		match &result {
			Ok(()) => {
				self.state.lock().clear_token();
				self.metrics.record_revocation();
				obs::record_operation_outcome(KIND, OperationOutcome::Success);
				log_event!(info, "Access token revoked.");
				self.observers.emit(FetcherEvent::AccessTokenRevoked);
			},
			Err(err) => {
				obs::record_operation_outcome(KIND, OperationOutcome::Failure);
				log_event!(error, error = %err, "Access token revocation failed.");
			},
		}

		result
	}

	/// Runs the refresh-token grant; callers must hold `refresh_guard`.
	async fn exchange_refresh_token(&self) -> Result<TokenResponse> {
		const KIND: OperationKind = OperationKind::Refresh;

		let span = OperationSpan::new(KIND, "refresh_access_token");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);
		self.metrics.record_refresh_attempt();
		self.observers.emit(FetcherEvent::AccessTokenRefreshing);

		let result = span
			.instrument(async {
				let token_url = &self.options.service_urls.token;
				let form = oauth::refresh_grant_form(&self.options);
				let request = form.options.to_http_request(token_url)?;
				let response = self.send(KIND, request).await?;
				let payload = parse_json(token_url.as_str(), &response)?;

				oauth::map_token_response(
					token_url.as_str(),
					&form.diagnostic,
					response.status().as_u16(),
					payload,
				)
			})
			.await;

		match &result {
			Ok(response) => {
				let now = OffsetDateTime::now_utc();

				self.state.lock().store_token(response.access_token.clone(), now);
				self.metrics.record_refresh_success();
				obs::record_operation_outcome(KIND, OperationOutcome::Success);
				log_event!(
					info,
					instance_url = response.instance_url.as_deref().unwrap_or_default(),
					"Access token refreshed."
				);
				self.observers.emit(FetcherEvent::AccessTokenRefreshed);
			},
			Err(err) => {
				self.metrics.record_refresh_failure();
				obs::record_operation_outcome(KIND, OperationOutcome::Failure);
				log_event!(error, error = %err, "Access token refresh failed.");
			},
		}

		result
	}
}

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use futures::future::join_all;
use parking_lot::Mutex;
// self
use salesforce_fetcher::{
	error::{Error, TransportError},
	fetcher::Fetcher,
	http::{FetchHttpClient, HttpFuture},
	oauth::{
		TransportErrorMapper, map_generic_transport_error,
		oauth2::{
			HttpClientError, HttpRequest, HttpResponse,
			http::{StatusCode, header::AUTHORIZATION},
		},
	},
	obs::OperationKind,
	options::FetcherOptions,
	request::RequestOptions,
	serde_json::{Value, json},
	url::Url,
};

const ACCOUNT_URL: &str = "/services/data/v33.0/sobjects/Account/001";

#[derive(Debug)]
struct FakeTransportError;
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Connection reset by fake transport.")
	}
}
impl StdError for FakeTransportError {}

/// In-process stand-in for an org: the token endpoint mints `tok1`, `tok2`, ... and the data
/// API accepts exactly one bearer token at a time.
#[derive(Default)]
struct ScriptedOrg {
	issued: AtomicUsize,
	resource_calls: AtomicUsize,
	accepted: Mutex<String>,
	token_bodies: Mutex<Vec<String>>,
	token_delay: Mutex<Option<Duration>>,
	token_endpoint_down: Mutex<bool>,
	refresh_error: Mutex<Option<Value>>,
}
impl ScriptedOrg {
	fn accepting(token: &str) -> Arc<Self> {
		let org = Self::default();

		*org.accepted.lock() = token.into();

		Arc::new(org)
	}

	fn token_calls(&self) -> usize {
		self.issued.load(Ordering::SeqCst)
	}

	fn resource_calls(&self) -> usize {
		self.resource_calls.load(Ordering::SeqCst)
	}

	fn handle_token(&self, request: &HttpRequest) -> Result<HttpResponse, FakeTransportError> {
		self.token_bodies.lock().push(String::from_utf8_lossy(request.body()).into_owned());

		if *self.token_endpoint_down.lock() {
			return Err(FakeTransportError);
		}
		if let Some(error) = self.refresh_error.lock().clone() {
			self.issued.fetch_add(1, Ordering::SeqCst);

			return Ok(json_response(400, &error));
		}

		let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

		Ok(json_response(
			200,
			&json!({
				"access_token": format!("tok{n}"),
				"instance_url": "https://org.example",
				"token_type": "Bearer",
				"issued_at": "1700000000000"
			}),
		))
	}

	fn handle_resource(&self, request: &HttpRequest) -> HttpResponse {
		self.resource_calls.fetch_add(1, Ordering::SeqCst);

		let expected = format!("Bearer {}", self.accepted.lock());
		let presented =
			request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok());

		if presented == Some(expected.as_str()) {
			json_response(200, &json!({ "Id": "001", "Name": "Acme" }))
		} else {
			let expired = json!([
				{ "errorCode": "INVALID_SESSION_ID", "message": "Session expired or invalid" }
			]);

			json_response(401, &expired)
		}
	}
}
impl FetchHttpClient for ScriptedOrg {
	type TransportError = FakeTransportError;

	fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		Box::pin(async move {
			if request.uri().path().ends_with("/services/oauth2/token") {
				let delay = *self.token_delay.lock();

				if let Some(delay) = delay {
					tokio::time::sleep(delay).await;
				}

				return self
					.handle_token(&request)
					.map_err(|err| HttpClientError::Reqwest(Box::new(err)));
			}

			Ok(self.handle_resource(&request))
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	operations: Arc<Mutex<Vec<OperationKind>>>,
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(
		&self,
		operation: OperationKind,
		err: HttpClientError<FakeTransportError>,
	) -> Error {
		self.operations.lock().push(operation);

		map_generic_transport_error(operation, err)
	}
}

type ScriptedFetcher = Fetcher<ScriptedOrg, RecordingTransportErrorMapper>;

fn json_response(status: u16, body: &Value) -> HttpResponse {
	let mut response = HttpResponse::new(body.to_string().into_bytes());

	*response.status_mut() =
		StatusCode::from_u16(status).expect("Scripted status codes should be valid.");

	response
}

fn build_fetcher(
	org: &Arc<ScriptedOrg>,
	retry_limit: u32,
) -> (ScriptedFetcher, RecordingTransportErrorMapper) {
	let options = FetcherOptions::builder(
		Url::parse("https://org.example/").expect("Failed to parse scripted base URL."),
		"c1",
		"r1",
	)
	.session_retry_limit(retry_limit)
	.build()
	.expect("Failed to build scripted fetcher options.");
	let mapper = RecordingTransportErrorMapper::default();

	(Fetcher::with_http_client(options, org.clone(), Arc::new(mapper.clone())), mapper)
}

#[tokio::test]
async fn invalid_session_refreshes_once_and_replays_with_new_token() {
	let org = ScriptedOrg::accepting("tok2");
	let (fetcher, _) = build_fetcher(&org, FetcherOptions::DEFAULT_SESSION_RETRY_LIMIT);
	let response = fetcher
		.fetch_json(ACCOUNT_URL, RequestOptions::get())
		.await
		.expect("Request should succeed after one session recovery.");

	assert_eq!(response.status(), 200);
	assert_eq!(response.json(), Some(&json!({ "Id": "001", "Name": "Acme" })));
	assert_eq!(org.token_calls(), 2);
	assert_eq!(org.resource_calls(), 2);
	assert_eq!(
		fetcher.access_token().map(|token| token.expose().to_owned()).as_deref(),
		Some("tok2")
	);
	assert!(!fetcher.is_refreshing_access_token());
	assert_eq!(fetcher.pending_request_count(), 0);
	assert_eq!(fetcher.metrics().invalid_sessions(), 1);
	assert_eq!(fetcher.metrics().retried_requests(), 1);
	assert_eq!(
		org.token_bodies.lock().first().map(String::as_str),
		Some("grant_type=refresh_token&refresh_token=r1&client_id=c1&format=json")
	);
}

#[tokio::test]
async fn concurrent_invalidations_share_one_refresh_wave() {
	let org = ScriptedOrg::accepting("tok2");
	let (fetcher, _) = build_fetcher(&org, FetcherOptions::DEFAULT_SESSION_RETRY_LIMIT);

	fetcher.get_access_token().await.expect("Initial refresh should succeed.");

	*org.token_delay.lock() = Some(Duration::from_millis(50));

	let requests = (0..8).map(|_| fetcher.fetch_json(ACCOUNT_URL, RequestOptions::get()));
	let results = join_all(requests).await;

	for result in results {
		let response = result.expect("Every parked request should be replayed successfully.");

		assert_eq!(response.json().and_then(|body| body.get("Id")), Some(&json!("001")));
	}

	assert_eq!(org.token_calls(), 2, "Eight invalidations must collapse into one refresh.");
	assert_eq!(fetcher.metrics().refresh_attempts(), 2);
	assert_eq!(fetcher.metrics().invalid_sessions(), 8);
	assert_eq!(fetcher.metrics().retried_requests(), 8);
	assert!(!fetcher.is_refreshing_access_token());
	assert_eq!(fetcher.pending_request_count(), 0);
}

#[tokio::test]
async fn later_invalidation_starts_a_new_wave() {
	let org = ScriptedOrg::accepting("tok2");
	let (fetcher, _) = build_fetcher(&org, FetcherOptions::DEFAULT_SESSION_RETRY_LIMIT);

	fetcher
		.fetch_json(ACCOUNT_URL, RequestOptions::get())
		.await
		.expect("First wave should recover the session.");

	*org.accepted.lock() = "tok3".into();

	fetcher
		.fetch_json(ACCOUNT_URL, RequestOptions::get())
		.await
		.expect("Second wave should recover the session as well.");

	assert_eq!(org.token_calls(), 3);
	assert_eq!(fetcher.metrics().invalid_sessions(), 2);
}

#[tokio::test]
async fn repeated_invalid_sessions_exhaust_the_retry_limit() {
	let org = ScriptedOrg::accepting("never-issued");
	let (fetcher, _) = build_fetcher(&org, 2);
	let err = fetcher
		.fetch_json(ACCOUNT_URL, RequestOptions::get())
		.await
		.expect_err("A session that never recovers must eventually fail.");

	match err {
		Error::SessionRetriesExhausted { request_url, attempts } => {
			assert_eq!(request_url, ACCOUNT_URL);
			assert_eq!(attempts, 3);
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(org.token_calls(), 3);
	assert!(!fetcher.is_refreshing_access_token());
}

#[tokio::test]
async fn refresh_failure_rejects_every_parked_request() {
	let org = ScriptedOrg::accepting("tok2");
	let (fetcher, _) = build_fetcher(&org, FetcherOptions::DEFAULT_SESSION_RETRY_LIMIT);

	fetcher.get_access_token().await.expect("Initial refresh should succeed.");

	*org.token_delay.lock() = Some(Duration::from_millis(50));
	*org.refresh_error.lock() = Some(json!({
		"error": "invalid_grant",
		"error_description": "expired access/refresh token"
	}));

	let requests = (0..3).map(|_| fetcher.fetch_json(ACCOUNT_URL, RequestOptions::get()));
	let results = join_all(requests).await;

	for result in results {
		let err = result.expect_err("Parked requests must fail with the refresh error.");

		assert!(matches!(err, Error::RefreshFailed(_)), "Unexpected error: {err:?}.");
		assert_eq!(err.remote().and_then(|remote| remote.error_code()), Some("invalid_grant"));
	}

	assert_eq!(org.token_calls(), 2);
	assert_eq!(fetcher.metrics().refresh_failures(), 1);
	assert!(!fetcher.is_refreshing_access_token());
	assert_eq!(fetcher.pending_request_count(), 0);
}

#[tokio::test]
async fn dropping_the_wave_driver_abandons_parked_requests() {
	let org = ScriptedOrg::accepting("tok2");
	let (fetcher, _) = build_fetcher(&org, FetcherOptions::DEFAULT_SESSION_RETRY_LIMIT);

	fetcher.get_access_token().await.expect("Initial refresh should succeed.");

	*org.token_delay.lock() = Some(Duration::from_secs(60));

	let mut driver = Box::pin(fetcher.fetch_json(ACCOUNT_URL, RequestOptions::get()));

	assert!(
		tokio::time::timeout(Duration::from_millis(20), &mut driver).await.is_err(),
		"The driver should still be waiting on the slow refresh."
	);
	assert!(fetcher.is_refreshing_access_token());

	let waiter = tokio::spawn({
		let fetcher = fetcher.clone();

		async move { fetcher.fetch_json(ACCOUNT_URL, RequestOptions::get()).await }
	});

	for _ in 0..100 {
		if fetcher.pending_request_count() == 2 {
			break;
		}

		tokio::time::sleep(Duration::from_millis(5)).await;
	}

	assert_eq!(fetcher.pending_request_count(), 2);

	drop(driver);

	let err = waiter
		.await
		.expect("Waiter task should not panic.")
		.expect_err("Parked request must be abandoned with its driver.");

	assert!(matches!(err, Error::RetryAbandoned { .. }), "Unexpected error: {err:?}.");
	assert!(!fetcher.is_refreshing_access_token());
	assert_eq!(fetcher.pending_request_count(), 0);
}

#[tokio::test]
async fn transport_failures_flow_through_the_mapper() {
	let org = ScriptedOrg::accepting("tok1");

	*org.token_endpoint_down.lock() = true;

	let (fetcher, mapper) = build_fetcher(&org, FetcherOptions::DEFAULT_SESSION_RETRY_LIMIT);
	let err = fetcher
		.fetch_json(ACCOUNT_URL, RequestOptions::get())
		.await
		.expect_err("Transport failure during refresh must surface.");

	match err {
		Error::Transport(TransportError::Network { operation, .. }) =>
			assert_eq!(operation, OperationKind::Refresh),
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert_eq!(mapper.operations.lock().as_slice(), [OperationKind::Refresh]);
	assert_eq!(org.resource_calls(), 0);
	assert!(fetcher.access_token().is_none());
}

#[tokio::test]
async fn unparseable_bodies_report_the_request_url() {
	struct PlainText;
	impl FetchHttpClient for PlainText {
		type TransportError = FakeTransportError;

		fn execute(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
			Box::pin(async move {
				if request.uri().path().ends_with("/token") {
					return Ok(json_response(200, &json!({ "access_token": "tok1" })));
				}

				Ok(HttpResponse::new(b"<html>maintenance</html>".to_vec()))
			})
		}
	}

	let options = FetcherOptions::builder(
		Url::parse("https://org.example/").expect("Failed to parse scripted base URL."),
		"c1",
		"r1",
	)
	.build()
	.expect("Failed to build options.");
	let fetcher: Fetcher<PlainText, RecordingTransportErrorMapper> = Fetcher::with_http_client(
		options,
		PlainText,
		RecordingTransportErrorMapper::default(),
	);
	let err = fetcher
		.fetch_json(ACCOUNT_URL, RequestOptions::get())
		.await
		.expect_err("HTML bodies cannot be parsed as JSON.");

	match err {
		Error::ResponseParse { request_url, status, .. } => {
			assert_eq!(request_url, format!("https://org.example{ACCOUNT_URL}"));
			assert_eq!(status, 200);
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn wave_completes_when_a_parked_caller_goes_away() {
	let org = ScriptedOrg::accepting("tok2");
	let (fetcher, _) = build_fetcher(&org, FetcherOptions::DEFAULT_SESSION_RETRY_LIMIT);

	fetcher.get_access_token().await.expect("Initial refresh should succeed.");

	*org.token_delay.lock() = Some(Duration::from_millis(200));

	let driver = tokio::spawn({
		let fetcher = fetcher.clone();

		async move { fetcher.fetch_json(ACCOUNT_URL, RequestOptions::get()).await }
	});
	let waiter = tokio::spawn({
		let fetcher = fetcher.clone();

		async move { fetcher.fetch_json(ACCOUNT_URL, RequestOptions::get()).await }
	});

	for _ in 0..100 {
		if fetcher.pending_request_count() == 2 {
			break;
		}

		tokio::time::sleep(Duration::from_millis(5)).await;
	}

	assert_eq!(fetcher.pending_request_count(), 2);

	waiter.abort();

	assert!(waiter.await.is_err_and(|err| err.is_cancelled()));

	let response = driver
		.await
		.expect("Driver task should not panic.")
		.expect("The remaining caller should still receive its replay.");

	assert_eq!(response.json().and_then(|body| body.get("Id")), Some(&json!("001")));
	assert_eq!(org.token_calls(), 2);
	assert_eq!(fetcher.metrics().retried_requests(), 2);
	assert!(!fetcher.is_refreshing_access_token());
	assert_eq!(fetcher.pending_request_count(), 0);
}

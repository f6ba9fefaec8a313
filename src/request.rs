//! Request options handed to [`Fetcher::fetch_json`](crate::fetcher::Fetcher::fetch_json) and
//! the responses it resolves with.

// crates.io
use oauth2::{
	HttpRequest, HttpResponse,
	http::{HeaderMap, Method, StatusCode, header::AUTHORIZATION},
};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

const REDACTED: &str = "<redacted>";

/// Method, headers, and body of an outbound request.
///
/// Header names are kept as provided; the fetcher replaces any `Authorization` header
/// (matched case-insensitively) with its own bearer token on every dispatch.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestOptions {
	/// HTTP method.
	pub method: Method,
	/// Caller-supplied headers.
	pub headers: BTreeMap<String, String>,
	/// Optional request body.
	pub body: Option<String>,
}
impl RequestOptions {
	/// Creates options for the provided method with no headers or body.
	pub fn new(method: Method) -> Self {
		Self { method, headers: BTreeMap::new(), body: None }
	}

	/// `GET` request.
	pub fn get() -> Self {
		Self::new(Method::GET)
	}

	/// `POST` request.
	pub fn post() -> Self {
		Self::new(Method::POST)
	}

	/// `PATCH` request.
	pub fn patch() -> Self {
		Self::new(Method::PATCH)
	}

	/// `DELETE` request.
	pub fn delete() -> Self {
		Self::new(Method::DELETE)
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Sets a raw body.
	pub fn with_body(mut self, body: impl Into<String>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `body` as JSON and sets `Content-Type: application/json`.
	pub fn with_json_body<T>(self, body: &T) -> Result<Self, serde_json::Error>
	where
		T: ?Sized + Serialize,
	{
		let encoded = serde_json::to_string(body)?;

		Ok(self.with_header("Content-Type", "application/json").with_body(encoded))
	}

	/// Returns a copy carrying `Authorization: Bearer <token>`, replacing any authorization
	/// header the caller set.
	pub fn authorized(&self, token: &TokenSecret) -> Self {
		let mut options = self.clone();

		options.headers.retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION.as_str()));
		options.headers.insert("Authorization".into(), token.bearer());

		options
	}

	/// Looks up a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	pub(crate) fn to_http_request(&self, url: &Url) -> Result<HttpRequest> {
		let mut builder =
			oauth2::http::Request::builder().method(self.method.clone()).uri(url.as_str());

		for (name, value) in &self.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}

		let body = self.body.clone().map(String::into_bytes).unwrap_or_default();

		builder.body(body).map_err(|e| ConfigError::from(e).into())
	}
}
impl Default for RequestOptions {
	fn default() -> Self {
		Self::get()
	}
}
impl Debug for RequestOptions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				let shown = if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
					REDACTED
				} else {
					value.as_str()
				};

				(name.as_str(), shown)
			})
			.collect::<BTreeMap<_, _>>();

		f.debug_struct("RequestOptions")
			.field("method", &self.method)
			.field("headers", &headers)
			.field("body", &self.body)
			.finish()
	}
}

/// Response resolved by [`Fetcher::fetch_json`](crate::fetcher::Fetcher::fetch_json).
#[derive(Debug)]
pub enum FetchResponse {
	/// Parsed JSON body that passed generic error interpretation.
	Json {
		/// HTTP status code.
		status: u16,
		/// Parsed payload, returned verbatim.
		body: Value,
	},
	/// `204 No Content`, returned without touching the body.
	NoContent(RawResponse),
}
impl FetchResponse {
	/// HTTP status code of the response.
	pub fn status(&self) -> u16 {
		match self {
			Self::Json { status, .. } => *status,
			Self::NoContent(raw) => raw.status,
		}
	}

	/// Parsed JSON payload, when the response carried one.
	pub fn json(&self) -> Option<&Value> {
		match self {
			Self::Json { body, .. } => Some(body),
			Self::NoContent(_) => None,
		}
	}

	/// Consumes the response and returns the JSON payload, if any.
	pub fn into_json(self) -> Option<Value> {
		match self {
			Self::Json { body, .. } => Some(body),
			Self::NoContent(_) => None,
		}
	}
}

/// Unparsed HTTP response whose body has not been read by the fetcher.
#[derive(Debug)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderMap,
	body: Option<Vec<u8>>,
}
impl RawResponse {
	pub(crate) fn from_http(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status.as_u16(), headers: parts.headers, body: Some(body) }
	}

	/// Returns `true` once [`take_body`](Self::take_body) has been called.
	pub fn body_used(&self) -> bool {
		self.body.is_none()
	}

	/// Takes the body bytes; subsequent calls return `None`.
	pub fn take_body(&mut self) -> Option<Vec<u8>> {
		self.body.take()
	}
}

pub(crate) fn is_no_content(status: StatusCode) -> bool {
	status == StatusCode::NO_CONTENT
}

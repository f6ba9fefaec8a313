//! Fetcher-level error types shared by the token store, the request coordinator, and
//! transports.

// self
use crate::{_prelude::*, obs::OperationKind, request::RequestOptions};

/// Fetcher-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical fetcher error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Remote API answered with an empty payload or an `error` field.
	#[error(transparent)]
	RemoteRequest(#[from] Box<RemoteRequestError>),
	/// Response body could not be parsed as the expected JSON shape.
	#[error("Response from {request_url} could not be parsed.")]
	ResponseParse {
		/// URL of the request whose response failed to parse.
		request_url: String,
		/// HTTP status code of the response.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},

	/// Revocation was requested while no access token is cached.
	#[error("No access token to revoke.")]
	RevokeWithoutToken,
	/// Revoke endpoint answered with a non-200 status.
	#[error(transparent)]
	Revoke(#[from] Box<RevokeError>),
	/// The refresh that a queued request was waiting on failed.
	#[error("Access token refresh failed while requests were waiting for it: {0}")]
	RefreshFailed(#[source] Arc<Error>),
	/// A request kept reporting an invalid session after repeated refreshes.
	#[error("Request to {request_url} reported an invalid session {attempts} times in a row.")]
	SessionRetriesExhausted {
		/// URL of the request that kept failing.
		request_url: String,
		/// Number of invalid-session responses observed for the request.
		attempts: u32,
	},
	/// The task driving a retry wave was dropped before this request was replayed.
	#[error("Retry of {request_url} was abandoned before it could be dispatched.")]
	RetryAbandoned {
		/// URL of the abandoned request.
		request_url: String,
	},
}
impl Error {
	/// Returns the remote error context when the failure came from the remote API.
	pub fn remote(&self) -> Option<&RemoteRequestError> {
		match self {
			Self::RemoteRequest(err) => Some(&**err),
			Self::RefreshFailed(inner) => inner.remote(),
			_ => None,
		}
	}
}
impl From<RemoteRequestError> for Error {
	fn from(e: RemoteRequestError) -> Self {
		Self::RemoteRequest(Box::new(e))
	}
}
impl From<RevokeError> for Error {
	fn from(e: RevokeError) -> Self {
		Self::Revoke(Box::new(e))
	}
}

/// Configuration and validation failures raised by the fetcher.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Request URL could not be resolved against the base URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidRequestUrl {
		/// Offending URL or path.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Options failed validation.
	#[error(transparent)]
	Options(#[from] crate::options::OptionsError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred during the {operation} call.")]
	Network {
		/// Operation that was in flight.
		operation: OperationKind,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The transport gave up waiting for the remote endpoint.
	#[error("The {operation} call timed out.")]
	Timeout {
		/// Operation that was in flight.
		operation: OperationKind,
	},
	/// Transport failed without a structured error.
	#[error("HTTP client error occurred during the {operation} call: {message}.")]
	Other {
		/// Operation that was in flight.
		operation: OperationKind,
		/// Transport-supplied message.
		message: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the remote API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		operation: OperationKind,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { operation, source: Box::new(src) }
	}
}

/// Diagnostic context for a remote call whose parsed response was empty or carried an
/// `error` field.
#[derive(Debug)]
pub struct RemoteRequestError {
	/// URL of the failing request.
	pub request_url: String,
	/// Options the request was issued with (authorization header redacted in `Debug`).
	pub request_options: RequestOptions,
	/// HTTP status code of the response.
	pub status: u16,
	/// Parsed response payload, `Value::Null` when the body was empty JSON.
	pub response: Value,
}
impl RemoteRequestError {
	/// Returns the remote error code, reading the OAuth `error` field or the first element's
	/// `errorCode` for REST error arrays.
	pub fn error_code(&self) -> Option<&str> {
		match &self.response {
			Value::Object(map) => map.get("error").and_then(Value::as_str),
			Value::Array(items) => items.first()?.get("errorCode").and_then(Value::as_str),
			_ => None,
		}
	}

	/// Returns the human-readable description accompanying the error code.
	pub fn error_description(&self) -> Option<&str> {
		match &self.response {
			Value::Object(map) => map.get("error_description").and_then(Value::as_str),
			Value::Array(items) => items.first()?.get("message").and_then(Value::as_str),
			_ => None,
		}
	}
}
impl Display for RemoteRequestError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Remote request to {} failed", self.request_url)?;

		if let Some(code) = self.error_code() {
			write!(f, " with `{code}`")?;
		}

		f.write_str(".")
	}
}
impl StdError for RemoteRequestError {}

/// Context for a revoke call that the remote endpoint refused.
#[derive(Debug, ThisError)]
#[error("Revoke endpoint {request_url} answered with HTTP {status}.")]
pub struct RevokeError {
	/// Revoke endpoint URL.
	pub request_url: String,
	/// Options the revoke request was issued with (token redacted).
	pub request_options: RequestOptions,
	/// HTTP status code of the response.
	pub status: u16,
	/// Raw response body, lossily decoded as UTF-8.
	pub body: String,
}

//! Generic response interpretation shared by token refreshes and resource fetches.
//!
//! Parsed payloads are judged with JavaScript truthiness: `null`, `false`, `0`, and `""`
//! count as absent, while empty arrays and objects count as present. Only one shape, a
//! non-empty array whose first element carries `errorCode: "INVALID_SESSION_ID"`, is treated
//! as an expired session.

// self
use crate::{_prelude::*, error::RemoteRequestError, request::RequestOptions};

/// Error code the remote API uses for expired or revoked sessions.
pub const INVALID_SESSION_ID: &str = "INVALID_SESSION_ID";

/// Returns `response` unchanged when it is truthy and has no truthy `error` field; raises a
/// [`RemoteRequestError`] carrying the request context otherwise.
pub fn interpret(
	request_url: &str,
	request_options: &RequestOptions,
	status: u16,
	response: Value,
) -> Result<Value> {
	let failed = !is_truthy(&response) || response.get("error").is_some_and(is_truthy);

	if failed {
		return Err(RemoteRequestError {
			request_url: request_url.to_owned(),
			request_options: request_options.clone(),
			status,
			response,
		}
		.into());
	}

	Ok(response)
}

/// Returns `true` for the invalid-session error array.
pub fn is_invalid_session(response: &Value) -> bool {
	response
		.as_array()
		.and_then(|items| items.first())
		.and_then(|first| first.get("errorCode"))
		.and_then(Value::as_str)
		.is_some_and(|code| code == INVALID_SESSION_ID)
}

/// JavaScript truthiness for JSON values.
pub fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(flag) => *flag,
		Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
		Value::String(text) => !text.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

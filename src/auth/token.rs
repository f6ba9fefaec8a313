//! Typed view over a successful refresh-token grant response.

// crates.io
use serde::Deserializer;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Successful refresh-token grant response.
///
/// Only `access_token` is required; Salesforce also returns the instance URL, identity URL,
/// issue timestamp (milliseconds since the epoch, as a string), and an HMAC signature. The
/// complete payload is kept in [`raw`](Self::raw) for callers that need provider extras.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Instance URL the token is valid for.
	#[serde(default, deserialize_with = "lenient_string")]
	pub instance_url: Option<String>,
	/// Identity URL of the authenticated user.
	#[serde(default, deserialize_with = "lenient_string")]
	pub id: Option<String>,
	/// Token type, usually `Bearer`.
	#[serde(default, deserialize_with = "lenient_string")]
	pub token_type: Option<String>,
	/// Issue timestamp in epoch milliseconds.
	#[serde(default, deserialize_with = "lenient_string")]
	pub issued_at: Option<String>,
	/// Base64 HMAC-SHA256 signature over `id` + `issued_at`.
	#[serde(default, deserialize_with = "lenient_string")]
	pub signature: Option<String>,
	/// Space-delimited scopes granted to the token.
	#[serde(default, deserialize_with = "lenient_string")]
	pub scope: Option<String>,
	/// Full response payload.
	#[serde(skip)]
	pub raw: Value,
}
impl TokenResponse {
	/// Parses the `issued_at` millisecond timestamp.
	pub fn issued_at_time(&self) -> Option<OffsetDateTime> {
		let millis = self.issued_at.as_deref()?.trim().parse::<i128>().ok()?;

		OffsetDateTime::from_unix_timestamp_nanos(millis.checked_mul(1_000_000)?).ok()
	}
}

/// Reads an optional extra as text: numbers and booleans are rendered, other shapes are dropped.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match Value::deserialize(deserializer)? {
		Value::String(value) => Some(value),
		Value::Number(value) => Some(value.to_string()),
		Value::Bool(value) => Some(value.to_string()),
		_ => None,
	})
}

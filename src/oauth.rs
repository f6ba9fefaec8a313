//! OAuth 2.0 endpoint plumbing: refresh-token grant and revoke request bodies, token
//! response mapping, and transport error mapping.

pub use oauth2;

// crates.io
use oauth2::HttpClientError;
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::{TokenResponse, TokenSecret},
	error::{RemoteRequestError, TransportError},
	interpret,
	obs::OperationKind,
	options::FetcherOptions,
	request::RequestOptions,
};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const REDACTED: &str = "<redacted>";

/// Maps HTTP transport failures into fetcher [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a fetcher error.
	fn map_transport_error(&self, operation: OperationKind, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		operation: OperationKind,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(operation, *inner),
			other => map_generic_transport_error(operation, other),
		}
	}
}

/// Maps the transport-agnostic [`HttpClientError`] variants; transports with their own error
/// type only need to handle `HttpClientError::Reqwest`.
pub fn map_generic_transport_error<E>(operation: OperationKind, err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(operation, *inner).into(),
		HttpClientError::Http(inner) => crate::error::ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Other { operation, message }.into(),
		_ => TransportError::Other { operation, message: "unknown transport failure".into() }
			.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(operation: OperationKind, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransportError::Timeout { operation }.into();
	}

	TransportError::network(operation, err).into()
}

/// Form-encoded request for the token or revoke endpoint.
///
/// `options` is what goes on the wire; `diagnostic` is the same request with secrets
/// replaced so it can travel inside errors and logs.
#[derive(Clone, Debug)]
pub(crate) struct FormRequest {
	pub(crate) options: RequestOptions,
	pub(crate) diagnostic: RequestOptions,
}
impl FormRequest {
	fn new(fields: &[(&str, &str, bool)]) -> Self {
		let mut wire = Serializer::new(String::new());
		let mut redacted = Serializer::new(String::new());

		for (name, value, secret) in fields {
			wire.append_pair(name, value);
			redacted.append_pair(name, if *secret { REDACTED } else { *value });
		}

		let base = RequestOptions::post().with_header("Content-Type", FORM_CONTENT_TYPE);

		Self {
			options: base.clone().with_body(wire.finish()),
			diagnostic: base.with_body(redacted.finish()),
		}
	}
}

/// Builds the `grant_type=refresh_token` form.
pub(crate) fn refresh_grant_form(options: &FetcherOptions) -> FormRequest {
	let mut fields = vec![
		("grant_type", "refresh_token", false),
		("refresh_token", options.refresh_token.expose(), true),
		("client_id", options.client_id.as_str(), false),
		("format", "json", false),
	];

	if let Some(secret) = &options.client_secret {
		fields.push(("client_secret", secret.expose(), true));
	}

	FormRequest::new(&fields)
}

/// Builds the `token=<access token>` revoke form.
pub(crate) fn revoke_form(token: &TokenSecret) -> FormRequest {
	FormRequest::new(&[("token", token.expose(), true)])
}

/// Interprets a token endpoint payload: generic errors first, then the `access_token`
/// requirement, then the typed view.
pub(crate) fn map_token_response(
	request_url: &str,
	diagnostic: &RequestOptions,
	status: u16,
	response: Value,
) -> Result<TokenResponse> {
	let response = interpret::interpret(request_url, diagnostic, status, response)?;
	let has_token = response
		.get("access_token")
		.and_then(Value::as_str)
		.is_some_and(|token| !token.is_empty());

	if !has_token {
		return Err(RemoteRequestError {
			request_url: request_url.to_owned(),
			request_options: diagnostic.clone(),
			status,
			response,
		}
		.into());
	}

	let mut token: TokenResponse = serde_path_to_error::deserialize(&response).map_err(
		|source| Error::ResponseParse { request_url: request_url.to_owned(), status, source },
	)?;

	token.raw = response;

	Ok(token)
}

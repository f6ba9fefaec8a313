// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	options::{ApiVersion, FetcherOptions, ServiceUrls},
};

/// Errors raised while constructing or validating options.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum OptionsError {
	/// Client identifier is required for every token exchange.
	#[error("Client identifier cannot be empty.")]
	EmptyClientId,
	/// Refresh token is required to mint access tokens.
	#[error("Refresh token cannot be empty.")]
	EmptyRefreshToken,
	/// The base URL must accept path segments.
	#[error("Base URL cannot be used as a base: {url}.")]
	InvalidBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// The session retry limit must allow at least one replay.
	#[error("Session retry limit must be at least 1.")]
	ZeroSessionRetryLimit,
}

/// Builder for [`FetcherOptions`] values.
#[derive(Debug)]
pub struct FetcherOptionsBuilder {
	/// Instance or login base URL.
	pub base_url: Url,
	/// Connected app consumer key.
	pub client_id: String,
	/// Long-lived refresh token.
	pub refresh_token: TokenSecret,
	/// Optional consumer secret.
	pub client_secret: Option<TokenSecret>,
	/// Optional caller-supplied access token.
	pub access_token: Option<TokenSecret>,
	/// Optional API version override.
	pub api_version: ApiVersion,
	/// Optional community identifier.
	pub community_id: Option<String>,
	/// Optional redirect URI.
	pub redirect_uri: Option<Url>,
	/// Optional authorization endpoint override.
	pub authorization_url: Option<Url>,
	/// Optional token endpoint override.
	pub token_url: Option<Url>,
	/// Optional revocation endpoint override.
	pub revoke_url: Option<Url>,
	/// Invalid-session replay ceiling.
	pub session_retry_limit: u32,
}
impl FetcherOptionsBuilder {
	/// Creates a new builder seeded with the required credential triple.
	pub fn new(
		base_url: Url,
		client_id: impl Into<String>,
		refresh_token: impl Into<TokenSecret>,
	) -> Self {
		Self {
			base_url,
			client_id: client_id.into(),
			refresh_token: refresh_token.into(),
			client_secret: None,
			access_token: None,
			api_version: ApiVersion::default(),
			community_id: None,
			redirect_uri: None,
			authorization_url: None,
			token_url: None,
			revoke_url: None,
			session_retry_limit: FetcherOptions::DEFAULT_SESSION_RETRY_LIMIT,
		}
	}

	/// Sets the consumer secret sent with refresh-token grants.
	pub fn client_secret(mut self, secret: impl Into<TokenSecret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets a caller-supplied access token.
	///
	/// Fetchers discard this value on construction and always obtain their own token.
	pub fn access_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.access_token = Some(token.into());

		self
	}

	/// Overrides the REST API version.
	pub fn api_version(mut self, version: ApiVersion) -> Self {
		self.api_version = version;

		self
	}

	/// Sets the community identifier.
	pub fn community_id(mut self, id: impl Into<String>) -> Self {
		self.community_id = Some(id.into());

		self
	}

	/// Sets the redirect URI.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Overrides the authorization endpoint.
	pub fn authorization_url(mut self, url: Url) -> Self {
		self.authorization_url = Some(url);

		self
	}

	/// Overrides the token endpoint.
	pub fn token_url(mut self, url: Url) -> Self {
		self.token_url = Some(url);

		self
	}

	/// Overrides the revocation endpoint.
	pub fn revoke_url(mut self, url: Url) -> Self {
		self.revoke_url = Some(url);

		self
	}

	/// Overrides how many invalid-session responses one request may receive.
	pub fn session_retry_limit(mut self, limit: u32) -> Self {
		self.session_retry_limit = limit;

		self
	}

	/// Consumes the builder and validates the resulting options.
	pub fn build(self) -> Result<FetcherOptions, OptionsError> {
		if self.client_id.trim().is_empty() {
			return Err(OptionsError::EmptyClientId);
		}
		if self.refresh_token.expose().trim().is_empty() {
			return Err(OptionsError::EmptyRefreshToken);
		}
		if self.base_url.cannot_be_a_base() {
			return Err(OptionsError::InvalidBaseUrl { url: self.base_url.to_string() });
		}
		if self.session_retry_limit == 0 {
			return Err(OptionsError::ZeroSessionRetryLimit);
		}

		let derived = ServiceUrls::derive(&self.base_url);
		let service_urls = ServiceUrls {
			authorization: self.authorization_url.unwrap_or(derived.authorization),
			token: self.token_url.unwrap_or(derived.token),
			revoke: self.revoke_url.unwrap_or(derived.revoke),
		};

		Ok(FetcherOptions {
			base_url: self.base_url,
			client_id: self.client_id,
			client_secret: self.client_secret,
			refresh_token: self.refresh_token,
			access_token: self.access_token,
			api_version: self.api_version,
			community_id: self.community_id,
			redirect_uri: self.redirect_uri,
			service_urls,
			session_retry_limit: self.session_retry_limit,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn builder(base: &str) -> FetcherOptionsBuilder {
		FetcherOptionsBuilder::new(Url::parse(base).expect("Failed to parse base URL."), "c1", "r1")
	}

	#[test]
	fn build_derives_service_urls_under_the_base_path() {
		let options = builder("https://instance.example/requiredtest")
			.build()
			.expect("Options with a path prefix should build.");

		assert_eq!(
			options.service_urls.token.as_str(),
			"https://instance.example/requiredtest/services/oauth2/token"
		);
		assert_eq!(
			options.service_urls.revoke.as_str(),
			"https://instance.example/requiredtest/services/oauth2/revoke"
		);
		assert_eq!(
			options.service_urls.authorization.as_str(),
			"https://instance.example/requiredtest/services/oauth2/authorize"
		);
		assert_eq!(options.api_version, ApiVersion::DEFAULT);
		assert_eq!(options.session_retry_limit, FetcherOptions::DEFAULT_SESSION_RETRY_LIMIT);
	}

	#[test]
	fn explicit_endpoints_win_over_derived_ones() {
		let token = Url::parse("https://login.example/services/oauth2/token")
			.expect("Failed to parse token URL.");
		let options = builder("https://org.example/")
			.token_url(token.clone())
			.community_id("0DBxx")
			.build()
			.expect("Options with overrides should build.");

		assert_eq!(options.service_urls.token, token);
		assert_eq!(
			options.service_urls.revoke.as_str(),
			"https://org.example/services/oauth2/revoke"
		);
		assert_eq!(options.community_id.as_deref(), Some("0DBxx"));
	}

	#[test]
	fn build_rejects_missing_credentials_and_bad_limits() {
		let base = Url::parse("https://org.example/").expect("Failed to parse base URL.");

		assert_eq!(
			FetcherOptionsBuilder::new(base.clone(), " ", "r1").build().map(|_| ()),
			Err(OptionsError::EmptyClientId)
		);
		assert_eq!(
			FetcherOptionsBuilder::new(base, "c1", "").build().map(|_| ()),
			Err(OptionsError::EmptyRefreshToken)
		);
		assert_eq!(
			builder("mailto:ops@org.example").build().map(|_| ()),
			Err(OptionsError::InvalidBaseUrl { url: "mailto:ops@org.example".into() })
		);
		assert_eq!(
			builder("https://org.example/").session_retry_limit(0).build().map(|_| ()),
			Err(OptionsError::ZeroSessionRetryLimit)
		);
	}
}

//! Credential configuration consumed by a [`Fetcher`](crate::fetcher::Fetcher).
//!
//! `FetcherOptions` is immutable once built. The three OAuth service URLs default to
//! `/services/oauth2/{authorize,token,revoke}` appended to the base URL path, and relative
//! request paths handed to the fetcher are resolved the same way.

/// API version labels (`v33.0`).
pub mod api_version;
/// Builder API for assembling validated options.
pub mod builder;

pub use api_version::*;
pub use builder::*;

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// OAuth 2.0 service endpoints used by the token store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUrls {
	/// Authorization endpoint for interactive flows driven by collaborators.
	pub authorization: Url,
	/// Token endpoint used for refresh-token grants.
	pub token: Url,
	/// Revocation endpoint.
	pub revoke: Url,
}
impl ServiceUrls {
	/// Derives the default service URLs from the base URL.
	pub fn derive(base_url: &Url) -> Self {
		Self {
			authorization: join_url(base_url, "/services/oauth2/authorize"),
			token: join_url(base_url, "/services/oauth2/token"),
			revoke: join_url(base_url, "/services/oauth2/revoke"),
		}
	}
}

/// Immutable credential set for one fetcher.
#[derive(Clone, Debug)]
pub struct FetcherOptions {
	/// Instance or login base URL.
	pub base_url: Url,
	/// Connected app consumer key.
	pub client_id: String,
	/// Optional connected app consumer secret.
	pub client_secret: Option<TokenSecret>,
	/// Long-lived refresh token.
	pub refresh_token: TokenSecret,
	/// Caller-supplied access token; fetchers never trust it and drop it on construction.
	pub access_token: Option<TokenSecret>,
	/// REST API version used by resource collaborators.
	pub api_version: ApiVersion,
	/// Community (Experience Cloud site) identifier used by collaborators.
	pub community_id: Option<String>,
	/// Redirect URI registered for interactive flows.
	pub redirect_uri: Option<Url>,
	/// OAuth service endpoints.
	pub service_urls: ServiceUrls,
	/// Maximum number of invalid-session responses tolerated for one request before the
	/// fetcher stops replaying it.
	pub session_retry_limit: u32,
}
impl FetcherOptions {
	/// Default value for [`session_retry_limit`](Self::session_retry_limit).
	pub const DEFAULT_SESSION_RETRY_LIMIT: u32 = 3;

	/// Creates a new builder for the required credential triple.
	pub fn builder(
		base_url: Url,
		client_id: impl Into<String>,
		refresh_token: impl Into<TokenSecret>,
	) -> FetcherOptionsBuilder {
		FetcherOptionsBuilder::new(base_url, client_id, refresh_token)
	}

	/// Resolves a request target: absolute URLs pass through, anything else is treated as a
	/// path appended to the base URL.
	pub fn resolve_url(&self, target: &str) -> Result<Url> {
		match Url::parse(target) {
			Ok(url) => Ok(url),
			Err(url::ParseError::RelativeUrlWithoutBase) => Ok(join_url(&self.base_url, target)),
			Err(source) =>
				Err(ConfigError::InvalidRequestUrl { url: target.to_owned(), source }.into()),
		}
	}

	/// Returns the versioned REST data path (`/services/data/v33.0`).
	pub fn data_path(&self) -> String {
		format!("/services/data/{}", self.api_version)
	}
}

/// Appends `path` to the base URL path, keeping any base path prefix (url-join semantics).
pub(crate) fn join_url(base: &Url, path: &str) -> Url {
	let (path, query) = match path.split_once('?') {
		Some((path, query)) => (path, Some(query)),
		None => (path, None),
	};
	let mut url = base.clone();

	// Joined as text so already-escaped segments keep their `%XX` sequences.
	if !url.cannot_be_a_base() {
		let joined = base
			.path()
			.split('/')
			.chain(path.split('/'))
			.filter(|segment| !segment.is_empty())
			.collect::<Vec<_>>()
			.join("/");

		url.set_path(&format!("/{joined}"));
	}

	url.set_query(query);
	url.set_fragment(None);

	url
}

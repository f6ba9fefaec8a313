//! Token-aware Salesforce REST fetcher: single-flight refresh-token grants, invalid-session
//! replay, and transport-aware observability for one credential set per fetcher.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod interpret;
pub mod oauth;
pub mod obs;
pub mod options;
pub mod request;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		fetcher::Fetcher,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		options::{FetcherOptions, FetcherOptionsBuilder},
	};

	/// Fetcher type alias used by reqwest-backed integration tests.
	pub type ReqwestTestFetcher = Fetcher<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Client identifier shared by the test fixtures.
	pub const TEST_CLIENT_ID: &str = "client-test";
	/// Refresh token shared by the test fixtures.
	pub const TEST_REFRESH_TOKEN: &str = "refresh-test";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Returns an options builder seeded with the shared client id + refresh token.
	pub fn test_options_builder(base_url: &str) -> FetcherOptionsBuilder {
		FetcherOptions::builder(
			Url::parse(base_url).expect("Failed to parse test base URL."),
			TEST_CLIENT_ID,
			TEST_REFRESH_TOKEN,
		)
	}

	/// Constructs a [`Fetcher`] for the provided options backed by the reqwest transport used
	/// across integration tests.
	pub fn build_reqwest_test_fetcher(options: FetcherOptions) -> ReqwestTestFetcher {
		Fetcher::with_http_client(
			options,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde_json;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

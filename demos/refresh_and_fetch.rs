//! Refreshes an access token, fetches a record with it, and revokes the token afterwards,
//! all against a local mock org so the demo runs offline.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use salesforce_fetcher::{
	fetcher::ReqwestFetcher, obs::FetcherEvent, options::FetcherOptions,
	request::RequestOptions, url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/services/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"00Dxx!demo\",\"instance_url\":\"https://demo.my.salesforce.com\"}",
			);
		})
		.await;
	let account_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/services/data/v33.0/sobjects/Account/001")
				.header("authorization", "Bearer 00Dxx!demo");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"Id\":\"001\",\"Name\":\"Acme\"}");
		})
		.await;
	let revoke_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/services/oauth2/revoke");
			then.status(200);
		})
		.await;
	let options =
		FetcherOptions::builder(Url::parse(&server.base_url())?, "demo-client", "demo-refresh")
			.build()?;
	let path = format!("{}/sobjects/Account/001", options.data_path());
	let fetcher = ReqwestFetcher::new(options)
		.with_observer(|event: FetcherEvent| println!("Lifecycle event: {event}."));
	let account = fetcher.fetch_json(&path, RequestOptions::get()).await?;

	println!("Fetched account: {:?}.", account.json());

	fetcher.revoke_access_token().await?;

	println!("Token cached after revoke: {}.", fetcher.access_token().is_some());

	token_mock.assert_async().await;
	account_mock.assert_async().await;
	revoke_mock.assert_async().await;

	Ok(())
}

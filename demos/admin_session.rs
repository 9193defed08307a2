//! Demonstrates an admin session against a mock backend: log in, let the access credential
//! expire, fire concurrent protected calls that share one renewal, then log out.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use session_renewal::{
	cell::{CredentialCell, MemoryCell},
	config::SessionConfig,
	credential::Credential,
	http::{ApiRequest, ReqwestTransport},
	session::ReqwestSessionClient,
	terminate::{LoginRedirect, SessionTerminator},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.header("set-cookie", "refresh_token=demo; Path=/api/admin/auth; HttpOnly")
				.body("{\"accessToken\":\"login-token\",\"expiresInSeconds\":1}");
		})
		.await;
	let expired_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/stats").header("authorization", "Bearer login-token");
			then.status(401).body("token expired");
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/admin/auth/refresh")
				.header("cookie", "refresh_token=demo");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"renewed-token\",\"expiresInSeconds\":900}");
		})
		.await;
	let stats_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/admin/stats")
				.header("authorization", "Bearer renewed-token");
			then.status(200).header("content-type", "application/json").body("{\"count\":42}");
		})
		.await;
	let logout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/logout");
			then.status(204);
		})
		.await;
	let config = SessionConfig::builder(Url::parse(&server.base_url())?).build()?;
	let cell = Arc::new(MemoryCell::default());
	let terminator = Arc::new(LoginRedirect::new(&config.login_route));
	let session = ReqwestSessionClient::with_transport(
		config,
		ReqwestTransport::default(),
		Arc::clone(&cell) as Arc<dyn CredentialCell>,
		Arc::clone(&terminator) as Arc<dyn SessionTerminator>,
	);
	let credential = session.login("admin@example.com", "correct horse").await?;

	println!("Logged in; credential fingerprint {}.", credential.fingerprint());

	let stats = |range: &str| -> Result<ApiRequest> {
		let url = Url::parse(&server.url(format!("/api/admin/stats?range={range}")))?;

		Ok(ApiRequest::get(url))
	};
	let (daily, weekly, monthly) = (stats("daily")?, stats("weekly")?, stats("monthly")?);
	let (daily, weekly, monthly) = tokio::join!(
		session.dispatch(daily),
		session.dispatch(weekly),
		session.dispatch(monthly),
	);

	for response in [daily?, weekly?, monthly?] {
		println!("{} answered {}: {}.", response.url, response.status, response.text());
	}

	let metrics = session.pipeline().coordinator().metrics();

	println!(
		"Renewal attempts: {}, joined waiters: {}, current credential: {:?}.",
		metrics.attempts(),
		metrics.joined(),
		cell.get().as_ref().map(Credential::fingerprint),
	);

	session.logout().await;

	println!("Logged out; session present: {}.", session.is_logged_in());

	login_mock.assert_async().await;
	expired_mock.assert_calls_async(3).await;
	refresh_mock.assert_async().await;
	stats_mock.assert_calls_async(3).await;
	logout_mock.assert_async().await;

	Ok(())
}

#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use session_renewal::{
	cell::{CredentialCell, MemoryCell},
	config::SessionConfig,
	credential::Credential,
	http::{ApiRequest, ReqwestTransport},
	session::ReqwestSessionClient,
	terminate::{LoginRedirect, SessionTerminator, TerminationReason},
	url::Url,
};

const SESSION_COOKIE: &str = "refresh_token=rt-1; Path=/api/admin/auth; HttpOnly";

struct Setup {
	session: ReqwestSessionClient,
	cell: Arc<MemoryCell>,
	terminator: Arc<LoginRedirect>,
}

fn setup(server: &MockServer, cell: MemoryCell) -> Setup {
	let origin = Url::parse(&server.base_url()).expect("Mock server base URL should parse.");
	let config = SessionConfig::builder(origin).build().expect("Loopback config should validate.");
	let cell = Arc::new(cell);
	let terminator = Arc::new(LoginRedirect::new(&config.login_route));
	let session = ReqwestSessionClient::with_transport(
		config,
		ReqwestTransport::default(),
		Arc::clone(&cell) as Arc<dyn CredentialCell>,
		Arc::clone(&terminator) as Arc<dyn SessionTerminator>,
	);

	Setup { session, cell, terminator }
}

fn held(cell: &MemoryCell) -> Option<String> {
	cell.get().map(|credential| credential.expose().to_owned())
}

#[tokio::test]
async fn login_stores_credential_and_session_cookie() {
	let server = MockServer::start_async().await;
	let Setup { session, cell, .. } = setup(&server, MemoryCell::default());
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/admin/auth/login")
				.json_body(json!({ "email": "admin@example.com", "password": "hunter2" }));
			then.status(200)
				.header("content-type", "application/json")
				.header("set-cookie", SESSION_COOKIE)
				.body("{\"accessToken\":\"login-token\",\"expiresInSeconds\":900}");
		})
		.await;
	let credential = session
		.login("admin@example.com", "hunter2")
		.await
		.expect("Login with valid credentials should succeed.");

	login.assert_calls_async(1).await;

	assert_eq!(credential.expose(), "login-token");
	assert!(credential.expires_at().is_some());
	assert!(session.is_logged_in());
	assert_eq!(held(&cell).as_deref(), Some("login-token"));

	let protected = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/admin/profile")
				.header("authorization", "Bearer login-token")
				.header_missing("cookie");
			then.status(200).body("{}");
		})
		.await;
	let url = Url::parse(&server.url("/api/admin/profile")).expect("Mock URL should parse.");

	session.dispatch(ApiRequest::get(url)).await.expect("Protected call should succeed.");
	protected.assert_calls_async(1).await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/admin/auth/refresh")
				.header("cookie", "refresh_token=rt-1")
				.header_missing("authorization");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"renewed-token\"}");
		})
		.await;
	let renewed = session.refresh().await.expect("Refresh with the session cookie should succeed.");

	refresh.assert_calls_async(1).await;

	assert_eq!(renewed.expose(), "renewed-token");
	assert_eq!(held(&cell).as_deref(), Some("renewed-token"));
}

#[tokio::test]
async fn login_without_token_is_rejected() {
	let server = MockServer::start_async().await;
	let Setup { session, cell, .. } = setup(&server, MemoryCell::default());

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/login");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;

	let err = session
		.login("admin@example.com", "hunter2")
		.await
		.expect_err("Login without an access token should fail.");

	assert!(err.status().is_none());
	assert!(held(&cell).is_none());
}

#[tokio::test]
async fn logout_clears_credential_even_when_server_fails() {
	let server = MockServer::start_async().await;
	let Setup { session, cell, terminator } =
		setup(&server, MemoryCell::with_credential(Credential::new("held")));
	let logout = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/logout").header_missing("authorization");
			then.status(500).body("boom");
		})
		.await;

	session.logout().await;

	logout.assert_calls_async(1).await;

	assert!(held(&cell).is_none());
	assert!(!session.is_logged_in());
	assert_eq!(terminator.terminations(), 0);
}

#[tokio::test]
async fn ensure_session_short_circuits_when_logged_in() {
	let server = MockServer::start_async().await;
	let Setup { session, .. } =
		setup(&server, MemoryCell::with_credential(Credential::new("held")));
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/refresh");
			then.status(200).body("{\"accessToken\":\"unused\"}");
		})
		.await;

	assert!(session.ensure_session().await);

	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn ensure_session_renews_silently() {
	let server = MockServer::start_async().await;
	let Setup { session, cell, terminator } = setup(&server, MemoryCell::default());
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"silent\"}");
		})
		.await;

	assert!(session.ensure_session().await);

	refresh.assert_calls_async(1).await;

	assert_eq!(held(&cell).as_deref(), Some("silent"));
	assert_eq!(terminator.terminations(), 0);
}

#[tokio::test]
async fn ensure_session_fails_and_terminates_when_renewal_is_rejected() {
	let server = MockServer::start_async().await;
	let Setup { session, cell, terminator } = setup(&server, MemoryCell::default());

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/refresh");
			then.status(401).body("no session");
		})
		.await;

	assert!(!session.ensure_session().await);
	assert!(held(&cell).is_none());
	assert_eq!(terminator.terminations(), 1);
	assert_eq!(terminator.take().as_deref(), Some("/admin/login?reason=expired"));
}

#[tokio::test]
async fn logout_and_redirect_clears_and_terminates() {
	let server = MockServer::start_async().await;
	let Setup { session, cell, terminator } =
		setup(&server, MemoryCell::with_credential(Credential::new("held")));

	session.logout_and_redirect(TerminationReason::Unauthorized);

	assert!(held(&cell).is_none());
	assert_eq!(terminator.take().as_deref(), Some("/admin/login?reason=unauthorized"));
}

#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use session_renewal::{
	StatusCode,
	cell::{CredentialCell, MemoryCell},
	config::SessionConfig,
	credential::Credential,
	http::{ApiRequest, ReqwestTransport},
	pipeline::ReqwestPipeline,
	terminate::{LoginRedirect, SessionTerminator},
	url::Url,
};

struct Setup {
	pipeline: ReqwestPipeline,
	cell: Arc<MemoryCell>,
	terminator: Arc<LoginRedirect>,
}

fn setup(server: &MockServer, cell: MemoryCell) -> Setup {
	let origin = Url::parse(&server.base_url()).expect("Mock server base URL should parse.");
	let config = SessionConfig::builder(origin).build().expect("Loopback config should validate.");
	let cell = Arc::new(cell);
	let terminator = Arc::new(LoginRedirect::new(&config.login_route));
	let pipeline = ReqwestPipeline::new(
		&config,
		ReqwestTransport::default(),
		Arc::clone(&cell) as Arc<dyn CredentialCell>,
		Arc::clone(&terminator) as Arc<dyn SessionTerminator>,
	);

	Setup { pipeline, cell, terminator }
}

fn url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock endpoint should parse.")
}

#[tokio::test]
async fn missing_credential_is_renewed_and_replayed() {
	let server = MockServer::start_async().await;
	let Setup { pipeline, cell, terminator } = setup(&server, MemoryCell::default());
	let anonymous = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/donations").header_missing("authorization");
			then.status(401).body("unauthorized");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/refresh").header_missing("authorization");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"fresh\",\"expiresInSeconds\":900}");
		})
		.await;
	let signed = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/donations").header("authorization", "Bearer fresh");
			then.status(200).header("content-type", "application/json").body("{\"total\":3}");
		})
		.await;
	let response = pipeline
		.dispatch(ApiRequest::get(url(&server, "/api/admin/donations")))
		.await
		.expect("Replay with the renewed credential should succeed.");

	anonymous.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	signed.assert_calls_async(1).await;

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.text(), "{\"total\":3}");
	assert_eq!(cell.get().as_ref().map(Credential::expose), Some("fresh"));
	assert_eq!(terminator.terminations(), 0);
}

#[tokio::test]
async fn login_rejection_does_not_renew() {
	let server = MockServer::start_async().await;
	let Setup { pipeline, cell, terminator } = setup(&server, MemoryCell::default());
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/login");
			then.status(401).body("bad credentials");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/refresh");
			then.status(200).body("{\"accessToken\":\"never\"}");
		})
		.await;
	let err = pipeline
		.dispatch(ApiRequest::post(url(&server, "/api/admin/auth/login")))
		.await
		.expect_err("Login rejection should reach the caller.");

	login.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(err.is_unauthorized());
	assert!(cell.get().is_none());
	assert_eq!(terminator.terminations(), 0);
	assert_eq!(pipeline.coordinator().cycles(), 0);
}

#[tokio::test]
async fn auth_endpoints_never_carry_the_bearer() {
	let server = MockServer::start_async().await;
	let Setup { pipeline, .. } =
		setup(&server, MemoryCell::with_credential(Credential::new("held")));
	let logout = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/logout").header_missing("authorization");
			then.status(204);
		})
		.await;
	let signed = ApiRequest::post(url(&server, "/api/admin/auth/logout"))
		.with_bearer(&Credential::new("held"))
		.expect("Bearer header should encode.");

	pipeline.dispatch(signed).await.expect("Logout call should succeed.");

	logout.assert_calls_async(1).await;
}

#[tokio::test]
async fn unprotected_requests_pass_through() {
	let server = MockServer::start_async().await;
	let Setup { pipeline, .. } =
		setup(&server, MemoryCell::with_credential(Credential::new("held")));
	let public = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/public/campaigns").header_missing("authorization");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/refresh");
			then.status(200).body("{\"accessToken\":\"never\"}");
		})
		.await;
	let err = pipeline
		.dispatch(ApiRequest::get(url(&server, "/api/public/campaigns")))
		.await
		.expect_err("Unprotected 401 should be surfaced unchanged.");

	public.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert!(err.is_unauthorized());
}

#[tokio::test]
async fn second_rejection_is_surfaced_after_one_renewal() {
	let server = MockServer::start_async().await;
	let Setup { pipeline, terminator, .. } =
		setup(&server, MemoryCell::with_credential(Credential::new("revoked")));
	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/settings");
			then.status(401).body("still unauthorized");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"fresh\"}");
		})
		.await;
	let err = pipeline
		.dispatch(ApiRequest::get(url(&server, "/api/admin/settings")))
		.await
		.expect_err("A replay rejected again should be surfaced.");

	protected.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;

	assert!(err.is_unauthorized());
	assert_eq!(terminator.terminations(), 0);
}

#[tokio::test]
async fn failed_renewal_surfaces_original_unauthorized() {
	let server = MockServer::start_async().await;
	let Setup { pipeline, cell, terminator } =
		setup(&server, MemoryCell::with_credential(Credential::new("expired")));
	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/donations");
			then.status(401).body("token expired");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/auth/refresh");
			then.status(401).body("session expired");
		})
		.await;
	let err = pipeline
		.dispatch(ApiRequest::get(url(&server, "/api/admin/donations")))
		.await
		.expect_err("Failed renewal should fail the request.");

	protected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	assert!(err.is_unauthorized());
	assert!(err.to_string().contains("/api/admin/donations"), "{err}");
	assert!(cell.get().is_none());
	assert_eq!(terminator.take().as_deref(), Some("/admin/login?reason=expired"));
}

#[tokio::test]
async fn dispatch_json_decodes_signed_responses() {
	#[derive(Debug, serde::Deserialize)]
	struct Page {
		total: u32,
		items: Vec<String>,
	}

	let server = MockServer::start_async().await;
	let Setup { pipeline, .. } =
		setup(&server, MemoryCell::with_credential(Credential::new("held")));

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/receipts").header("authorization", "Bearer held");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"total\":2,\"items\":[\"r-1\",\"r-2\"]}");
		})
		.await;

	let page = pipeline
		.dispatch_json::<Page>(ApiRequest::get(url(&server, "/api/admin/receipts")))
		.await
		.expect("Signed page should decode.");

	assert_eq!(page.total, 2);
	assert_eq!(page.items, ["r-1", "r-2"]);
	assert_eq!(pipeline.coordinator().cycles(), 0);
}

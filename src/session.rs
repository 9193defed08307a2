//! Session-level helpers built on the request pipeline: login, logout, guards, and explicit
//! termination.

// self
use crate::{
	_prelude::*,
	cell::CredentialCell,
	config::SessionConfig,
	credential::{AccessTokenResponse, Credential},
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	pipeline::RequestPipeline,
	terminate::{SessionTerminator, TerminationReason},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Session client specialized for the crate's default reqwest transport.
pub type ReqwestSessionClient = SessionClient<ReqwestTransport>;

#[derive(Serialize)]
struct LoginRequest<'a> {
	email: &'a str,
	password: &'a str,
}

/// Admin session facade owning the pipeline, its coordinator, and the auth endpoints.
pub struct SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	config: SessionConfig,
	pipeline: RequestPipeline<T>,
}
impl<T> SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a session client over the caller-provided transport.
	pub fn with_transport(
		config: SessionConfig,
		transport: impl Into<Arc<T>>,
		cell: Arc<dyn CredentialCell>,
		terminator: Arc<dyn SessionTerminator>,
	) -> Self {
		let pipeline = RequestPipeline::new(&config, transport, cell, terminator);

		Self { config, pipeline }
	}

	/// Session configuration.
	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Pipeline used for every call made through this session.
	pub fn pipeline(&self) -> &RequestPipeline<T> {
		&self.pipeline
	}

	/// Dispatches an arbitrary request through the pipeline.
	pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.pipeline.dispatch(request).await
	}

	/// Returns true while a credential is held.
	pub fn is_logged_in(&self) -> bool {
		self.pipeline.cell().is_present()
	}

	/// Logs in with a password; stores and returns the issued credential.
	///
	/// The login endpoint lives in the auth sub-namespace, so a 401 for bad credentials is
	/// surfaced immediately without a renewal attempt.
	pub async fn login(&self, email: &str, password: &str) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = ApiRequest::post(self.config.endpoints.login.clone())
					.json(&LoginRequest { email, password })?;
				let response = self.pipeline.dispatch(request).await?;
				let credential =
					AccessTokenResponse::from_response(&response)?.into_credential()?;

				self.pipeline.cell().set(Some(credential.clone()));

				Ok::<_, Error>(credential)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Renews the credential through the shared coordinator.
	pub async fn refresh(&self) -> Result<Credential> {
		self.pipeline.coordinator().renew().await
	}

	/// Revokes the ambient session; the local credential is cleared whatever the server says.
	pub async fn logout(&self) {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = ApiRequest::post(self.config.endpoints.logout.clone());

				self.pipeline.dispatch(request).await
			})
			.await;

		#[cfg(feature = "tracing")]
		if let Err(e) = &result {
			tracing::debug!(error = %e, "logout call failed; clearing the credential anyway");
		}

		obs::record_result(KIND, &result);
		self.pipeline.cell().clear();
	}

	/// Guard helper: `true` if a credential is held or a silent renewal succeeds.
	///
	/// A failed renewal leaves the cell cleared; the coordinator has already notified the
	/// terminator.
	pub async fn ensure_session(&self) -> bool {
		if self.is_logged_in() {
			return true;
		}

		match self.refresh().await {
			Ok(_) => true,
			Err(_) => {
				self.pipeline.cell().clear();

				false
			},
		}
	}

	/// Clears the credential and hands control to the terminator.
	pub fn logout_and_redirect(&self, reason: TerminationReason) {
		self.pipeline.cell().clear();
		self.pipeline.coordinator().terminator().terminate(reason);
	}
}
impl<T> Debug for SessionClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionClient")
			.field("config", &self.config)
			.field("logged_in", &self.is_logged_in())
			.finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use httpmock::prelude::*;
	// self
	use crate::{_preludet::*, terminate::TerminationReason};

	#[tokio::test]
	async fn debug_reports_login_state_without_secrets() {
		let server = MockServer::start_async().await;
		let TestSessionParts { session, terminator, .. } =
			build_reqwest_test_session(test_session_config(&server.base_url()));

		server
			.mock_async(|when, then| {
				when.method(POST).path("/api/admin/auth/login");
				then.status(200)
					.header("content-type", "application/json")
					.body("{\"accessToken\":\"very-secret\"}");
			})
			.await;

		assert!(format!("{session:?}").contains("logged_in: false"));

		session.login("admin@example.com", "hunter2").await.expect("Login should succeed.");

		let debug = format!("{session:?}");

		assert!(debug.contains("logged_in: true"));
		assert!(!debug.contains("very-secret"));

		session.logout_and_redirect(TerminationReason::Expired);

		assert!(!session.is_logged_in());
		assert_eq!(terminator.terminations(), 1);
	}
}

//! Per-request middleware: classify, attach the bearer credential, dispatch, and recover from a
//! single 401 by renewing and replaying once.

// self
use crate::{
	_prelude::*,
	cell::CredentialCell,
	classify::{Classifier, RequestClass},
	config::SessionConfig,
	credential::Credential,
	http::{ApiRequest, ApiResponse, CredentialsMode, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	renewal::RenewalCoordinator,
	terminate::SessionTerminator,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Pipeline specialized for the crate's default reqwest transport.
pub type ReqwestPipeline = RequestPipeline<ReqwestTransport>;

/// Routes every outbound call through classification, bearer attachment, and renewal.
///
/// Each logical request gets at most one renewal and one replay. Unprotected requests and auth
/// endpoint requests are never renewed; their failures reach the caller unchanged.
pub struct RequestPipeline<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	classifier: Classifier,
	coordinator: RenewalCoordinator<T>,
}
impl<T> RequestPipeline<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a pipeline and its renewal coordinator over one shared transport.
	pub fn new(
		config: &SessionConfig,
		transport: impl Into<Arc<T>>,
		cell: Arc<dyn CredentialCell>,
		terminator: Arc<dyn SessionTerminator>,
	) -> Self {
		let transport = transport.into();
		let coordinator =
			RenewalCoordinator::new(config, Arc::clone(&transport), cell, terminator);

		Self::with_coordinator(config, transport, coordinator)
	}

	/// Creates a pipeline that shares an existing coordinator.
	pub fn with_coordinator(
		config: &SessionConfig,
		transport: impl Into<Arc<T>>,
		coordinator: RenewalCoordinator<T>,
	) -> Self {
		Self { transport: transport.into(), classifier: Classifier::new(config), coordinator }
	}

	/// Classifier applied to every request.
	pub fn classifier(&self) -> &Classifier {
		&self.classifier
	}

	/// Coordinator used for 401 recovery.
	pub fn coordinator(&self) -> &RenewalCoordinator<T> {
		&self.coordinator
	}

	/// Credential cell read at attach time.
	pub fn cell(&self) -> &Arc<dyn CredentialCell> {
		self.coordinator.cell()
	}

	/// Dispatches `request`, transparently recovering from one expired credential.
	///
	/// Fails with [`Error::Upstream`] for any non-2xx/3xx outcome that renewal did not fix. When
	/// the renewal itself fails, the original 401 is returned; the coordinator has already
	/// cleared the credential and terminated the session.
	pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Dispatch;

		let class = self.classifier.classify(&request.url);
		let span = FlowSpan::new(KIND, class.as_str());

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		obs::record_request_class(class);

		let result = span
			.instrument(async move {
				match class {
					RequestClass::Unprotected => self.send(request, CredentialsMode::Omit).await,
					RequestClass::RenewalEndpoint =>
						self.send(request.without_authorization(), CredentialsMode::Include).await,
					RequestClass::Protected => self.dispatch_protected(request).await,
				}
			})
			.await;

		span.record_status(&result);
		obs::record_result(KIND, &result);

		result
	}

	/// Decodes the JSON body of a successful dispatch.
	pub async fn dispatch_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: serde::de::DeserializeOwned,
	{
		self.dispatch(request).await?.json()
	}

	async fn dispatch_protected(&self, request: ApiRequest) -> Result<ApiResponse> {
		let attached = self.cell().get();
		let first = sign(&request, attached.as_ref())?;
		let unauthorized = match self.send(first, CredentialsMode::Omit).await {
			Err(Error::Upstream(e)) if e.is_unauthorized() => e,
			other => return other,
		};

		#[cfg(feature = "tracing")]
		tracing::debug!(url = %request.url, "protected request unauthorized; awaiting renewal");

		let credential = match self.coordinator.renew_after(attached.as_ref()).await {
			Ok(credential) => credential,
			Err(_e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(url = %request.url, error = %_e, "renewal failed; surfacing 401");

				return Err(unauthorized.into());
			},
		};

		let replay = self.send(request.with_bearer(&credential)?, CredentialsMode::Omit).await;

		obs::record_replay(match replay {
			Ok(_) => FlowOutcome::Success,
			Err(_) => FlowOutcome::Failure,
		});

		replay
	}

	async fn send(&self, request: ApiRequest, mode: CredentialsMode) -> Result<ApiResponse> {
		let response = self.transport.execute(request, mode).await?;

		Ok(response.error_for_status()?)
	}
}
impl<T> Debug for RequestPipeline<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestPipeline")
			.field("classifier", &self.classifier)
			.field("coordinator", &self.coordinator)
			.finish()
	}
}

fn sign(request: &ApiRequest, credential: Option<&Credential>) -> Result<ApiRequest> {
	match credential {
		Some(credential) => Ok(request.with_bearer(credential)?),
		None => Ok(request.clone()),
	}
}

//! Transport primitives for dispatching request descriptors.
//!
//! The module exposes the [`ApiRequest`] / [`ApiResponse`] values that flow through the
//! pipeline, the [`HttpTransport`] trait that executes them, and [`CredentialsMode`], which
//! tells a transport whether the ambient session proof (the cookie jar) may ride along. Request
//! construction code never sees that proof: only transports handle cookies, and only for
//! [`CredentialsMode::Include`] requests.

// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
#[cfg(feature = "reqwest")] use ::http::header::{COOKIE, SET_COOKIE};
#[cfg(feature = "reqwest")] use reqwest::cookie::{CookieStore, Jar};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	credential::Credential,
	error::{ConfigError, TransportError, UpstreamError},
};

/// Whether the ambient session proof accompanies a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CredentialsMode {
	/// No cookies are attached and `Set-Cookie` responses are ignored.
	#[default]
	Omit,
	/// The session cookie jar is attached and updated from the response.
	Include,
}

/// Immutable description of one outbound call.
///
/// Adding the bearer header produces a clone; the descriptor handed to the pipeline is never
/// mutated after dispatch.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Target URL.
	pub url: Url,
	/// Request headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request with no headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(url: Url) -> Self {
		Self::new(Method::PUT, url)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(url: Url) -> Self {
		Self::new(Method::DELETE, url)
	}

	/// Sets a header, replacing previous values.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `body` as JSON and sets the content type.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body)?);
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Returns the bearer secret carried by the request, if any.
	pub fn bearer_token(&self) -> Option<&str> {
		self.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
	}

	/// Clones the request with `Authorization: Bearer <credential>`.
	pub fn with_bearer(&self, credential: &Credential) -> Result<Self, ConfigError> {
		let mut request = self.clone();

		request.headers.insert(AUTHORIZATION, credential.bearer_header()?);

		Ok(request)
	}

	/// Drops any `Authorization` header.
	pub fn without_authorization(mut self) -> Self {
		self.headers.remove(AUTHORIZATION);

		self
	}
}

/// Fully buffered response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
	/// URL the response answered.
	pub url: Url,
}
impl ApiResponse {
	/// Returns true for 2xx and 3xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success() || self.status.is_redirection()
	}

	/// Converts non-2xx/3xx responses into [`UpstreamError`].
	pub fn error_for_status(self) -> Result<Self, UpstreamError> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(UpstreamError::new(self.status, self.url, &self.body))
		}
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source, url: self.url.clone() })
	}

	/// Lossily decodes the body as UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing [`ApiRequest`] values.
///
/// The trait is the crate's only dependency on an HTTP client. Implementations resolve with an
/// [`ApiResponse`] for every status (including 4xx/5xx) and reserve [`TransportError`] for
/// failures where no response was received. Implementations must be `Send + Sync + 'static`
/// so one transport can be shared by the pipeline and the renewal coordinator.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request`, attaching the ambient session proof only for
	/// [`CredentialsMode::Include`].
	fn execute(&self, request: ApiRequest, mode: CredentialsMode) -> TransportFuture<'_>;
}

/// reqwest-backed transport with a private cookie jar for the ambient session.
///
/// The wrapped client must not have its own cookie store enabled; cookies are attached by hand
/// so [`CredentialsMode::Omit`] requests never carry the session cookie.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	jar: Arc<Jar>,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`] with an empty cookie jar.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, jar: Default::default() }
	}

	/// Replaces the cookie jar, e.g. to share it with another transport.
	pub fn with_jar(mut self, jar: Arc<Jar>) -> Self {
		self.jar = jar;

		self
	}

	/// Cookie jar holding the ambient session proof.
	pub fn jar(&self) -> &Arc<Jar> {
		&self.jar
	}

	async fn send(
		&self,
		request: ApiRequest,
		mode: CredentialsMode,
	) -> Result<ApiResponse, TransportError> {
		let ApiRequest { method, url, mut headers, body } = request;

		if mode == CredentialsMode::Include {
			if let Some(cookies) = self.jar.cookies(&url) {
				headers.insert(COOKIE, cookies);
			}
		} else {
			headers.remove(COOKIE);
		}

		let mut builder = self.client.request(method, url.clone()).headers(headers);

		if let Some(body) = body {
			builder = builder.body(body);
		}

		let response =
			builder.send().await.map_err(|e| TransportError::network(url.clone(), e))?;
		let status = response.status();
		let headers = response.headers().to_owned();

		if mode == CredentialsMode::Include {
			let mut set_cookies = headers.get_all(SET_COOKIE).iter();

			self.jar.set_cookies(&mut set_cookies, &url);
		}

		let body = response
			.bytes()
			.await
			.map_err(|e| TransportError::network(url.clone(), e))?
			.to_vec();

		Ok(ApiResponse { status, headers, body, url })
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: ApiRequest, mode: CredentialsMode) -> TransportFuture<'_> {
		Box::pin(self.send(request, mode))
	}
}

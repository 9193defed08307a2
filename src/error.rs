//! Crate-level error types shared by the pipeline, the renewal coordinator, and transports.

// crates.io
use ::http::{StatusCode, header::InvalidHeaderValue};
// self
use crate::{_prelude::*, config::SessionConfigError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Upstream answered with a status outside the 2xx/3xx range.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),

	/// The renewal cycle this caller waited on failed; every waiter of the cycle sees the same
	/// source.
	#[error("Session renewal failed.")]
	RenewalFailed {
		/// Failure reported by the renewal endpoint call.
		#[source]
		source: Arc<Error>,
	},
	/// A response body could not be decoded into the requested type.
	#[error("Response body from {url} does not match the expected shape.")]
	Decode {
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// URL of the response that failed to decode.
		url: Url,
	},
}
impl Error {
	/// Returns the upstream HTTP status behind this error, if any.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::Upstream(e) => Some(e.status),
			Self::RenewalFailed { source } => source.status(),
			_ => None,
		}
	}

	/// Returns true when the error carries a 401 from upstream.
	pub fn is_unauthorized(&self) -> bool {
		self.status() == Some(StatusCode::UNAUTHORIZED)
	}
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Session config failed validation.
	#[error(transparent)]
	Session(#[from] SessionConfigError),
	/// Credential cannot be encoded as an `Authorization` header value.
	#[error("Credential cannot be used as a header value.")]
	InvalidCredential(#[from] InvalidHeaderValue),
	/// Request body could not be serialized.
	#[error("Request body could not be serialized as JSON.")]
	RequestBody(#[from] serde_json::Error),
	/// Auth endpoint answered successfully but without an access token.
	#[error("Auth endpoint response is missing accessToken.")]
	MissingAccessToken,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target of the failed request.
		url: Url,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url, source: Box::new(src) }
	}
}

/// Non-2xx/3xx response surfaced to the caller.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Upstream responded with {status} for {url}.")]
pub struct UpstreamError {
	/// HTTP status returned by the upstream.
	pub status: StatusCode,
	/// URL of the failed request.
	pub url: Url,
	/// Leading part of the response body, lossily decoded.
	pub body_preview: String,
}
impl UpstreamError {
	const MAX_PREVIEW: usize = 256;

	/// Builds an error from a status and raw body, truncating the body preview.
	pub fn new(status: StatusCode, url: Url, body: &[u8]) -> Self {
		let end = body.len().min(Self::MAX_PREVIEW);
		let body_preview = String::from_utf8_lossy(&body[..end]).into_owned();

		Self { status, url, body_preview }
	}

	/// Returns true for 401 responses.
	pub fn is_unauthorized(&self) -> bool {
		self.status == StatusCode::UNAUTHORIZED
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url() -> Url {
		Url::parse("https://api.example.com/api/admin/donations")
			.expect("Fixture URL should parse.")
	}

	#[test]
	fn renewal_failure_exposes_upstream_status_and_source() {
		let upstream = UpstreamError::new(StatusCode::UNAUTHORIZED, url(), b"expired");
		let err = Error::RenewalFailed { source: Arc::new(upstream.clone().into()) };

		assert!(err.is_unauthorized());
		assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

		let source = StdError::source(&err).expect("Renewal failure should expose its source.");

		assert_eq!(source.to_string(), upstream.to_string());
	}

	#[test]
	fn body_preview_is_truncated() {
		let body = vec![b'x'; 1024];
		let err = UpstreamError::new(StatusCode::INTERNAL_SERVER_ERROR, url(), &body);

		assert_eq!(err.body_preview.len(), 256);
		assert!(!err.is_unauthorized());
		assert_eq!(Error::from(err).status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
	}
}

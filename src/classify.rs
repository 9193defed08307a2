//! Request classification against the protected namespace.

// crates.io
use url::Origin;
// self
use crate::{_prelude::*, config::SessionConfig};

/// How the pipeline treats an outbound request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestClass {
	/// Outside the protected namespace; passed through unchanged.
	Unprotected,
	/// Auth endpoints (login, refresh, logout); ambient session only, never renewed on 401.
	RenewalEndpoint,
	/// Everything else under the protected namespace; bearer attached, renewed on 401.
	Protected,
}
impl RequestClass {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestClass::Unprotected => "unprotected",
			RequestClass::RenewalEndpoint => "renewal_endpoint",
			RequestClass::Protected => "protected",
		}
	}

	/// Whether requests in this class receive a bearer header.
	pub const fn attaches_bearer(self) -> bool {
		matches!(self, RequestClass::Protected)
	}

	/// Whether a 401 in this class triggers renewal.
	pub const fn renews_on_unauthorized(self) -> bool {
		matches!(self, RequestClass::Protected)
	}
}
impl Display for RequestClass {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fixed prefix rules derived from a [`SessionConfig`].
#[derive(Clone, Debug)]
pub struct Classifier {
	origin: Origin,
	protected_prefix: String,
	auth_prefix: String,
}
impl Classifier {
	/// Captures the origin and prefixes of the provided config.
	pub fn new(config: &SessionConfig) -> Self {
		Self {
			origin: config.origin.origin(),
			protected_prefix: config.namespace.protected_prefix.clone(),
			auth_prefix: config.namespace.auth_prefix.clone(),
		}
	}

	/// Classifies a target URL. Pure: the same URL always yields the same class.
	pub fn classify(&self, url: &Url) -> RequestClass {
		if url.origin() != self.origin {
			return RequestClass::Unprotected;
		}

		let path = url.path();

		if under(path, &self.auth_prefix) {
			RequestClass::RenewalEndpoint
		} else if under(path, &self.protected_prefix) {
			RequestClass::Protected
		} else {
			RequestClass::Unprotected
		}
	}
}

// Prefixes end with `/`, so the bare directory path (`/api/admin`) stays outside.
fn under(path: &str, prefix: &str) -> bool {
	path.starts_with(prefix)
}

//! Session configuration describing the protected namespace and its auth endpoints.
//!
//! A [`SessionConfig`] is built once per application and shared by the classifier, the renewal
//! coordinator, and the session client. Prefixes are absolute URL paths that start and end with
//! `/`; endpoint paths are resolved against the origin.

/// Builder API for assembling session configs.
pub mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

/// Path prefixes that partition the API surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
	/// Requests under this prefix carry bearer credentials and renew on 401.
	pub protected_prefix: String,
	/// Sub-prefix of the protected namespace served with the ambient session cookie only.
	pub auth_prefix: String,
}
impl Default for Namespace {
	fn default() -> Self {
		Self {
			protected_prefix: SessionConfig::DEFAULT_PROTECTED_PREFIX.into(),
			auth_prefix: SessionConfig::DEFAULT_AUTH_PREFIX.into(),
		}
	}
}

/// Resolved auth endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpoints {
	/// Password login endpoint; sets the session cookie and returns a credential.
	pub login: Url,
	/// Renewal endpoint; exchanges the session cookie for a fresh credential.
	pub refresh: Url,
	/// Logout endpoint; revokes the session cookie.
	pub logout: Url,
}

/// Immutable, validated session configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
	/// Scheme, host, and port of the API.
	pub origin: Url,
	/// Prefix rules used by the classifier.
	pub namespace: Namespace,
	/// Auth endpoints resolved against the origin.
	pub endpoints: AuthEndpoints,
	/// Application route users are sent to when the session ends.
	pub login_route: String,
}
impl SessionConfig {
	/// Default protected namespace.
	pub const DEFAULT_PROTECTED_PREFIX: &'static str = "/api/admin/";
	/// Default auth sub-namespace.
	pub const DEFAULT_AUTH_PREFIX: &'static str = "/api/admin/auth/";
	/// Default login route for re-authentication.
	pub const DEFAULT_LOGIN_ROUTE: &'static str = "/admin/login";

	/// Creates a new builder for the provided origin.
	pub fn builder(origin: Url) -> SessionConfigBuilder {
		SessionConfigBuilder::new(origin)
	}
}

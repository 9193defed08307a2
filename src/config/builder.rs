// self
use crate::{
	_prelude::*,
	config::{AuthEndpoints, Namespace, SessionConfig},
};

/// Errors raised while constructing or validating session configs.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SessionConfigError {
	/// Origin must be an absolute URL with a host.
	#[error("Origin `{url}` has no host.")]
	MissingHost {
		/// Origin URL that failed validation.
		url: String,
	},
	/// Origin must use HTTPS unless it points at a loopback host.
	#[error("The origin must use HTTPS: {url}.")]
	InsecureOrigin {
		/// Origin URL that failed validation.
		url: String,
	},
	/// Prefixes must be absolute paths ending in `/`.
	#[error("The {name} prefix must start and end with `/`: {prefix}.")]
	InvalidPrefix {
		/// Which prefix failed validation.
		name: &'static str,
		/// Prefix that failed validation.
		prefix: String,
	},
	/// Auth prefix must live inside the protected namespace.
	#[error("Auth prefix `{auth}` is not nested under `{protected}`.")]
	AuthPrefixOutsideNamespace {
		/// Auth prefix supplied.
		auth: String,
		/// Protected prefix supplied.
		protected: String,
	},
	/// Endpoint path could not be resolved against the origin.
	#[error("The {endpoint} endpoint path is invalid: {path}.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// Endpoint must be served under the auth prefix so it never triggers renewal.
	#[error("The {endpoint} endpoint `{path}` must live under the auth prefix.")]
	EndpointOutsideAuthPrefix {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Resolved endpoint path.
		path: String,
	},
}

/// Builder for [`SessionConfig`] values.
#[derive(Debug)]
pub struct SessionConfigBuilder {
	/// Origin of the API.
	pub origin: Url,
	/// Prefix rules.
	pub namespace: Namespace,
	/// Login endpoint path, relative to the auth prefix or absolute.
	pub login_path: String,
	/// Refresh endpoint path, relative to the auth prefix or absolute.
	pub refresh_path: String,
	/// Logout endpoint path, relative to the auth prefix or absolute.
	pub logout_path: String,
	/// Application route used for re-authentication.
	pub login_route: String,
}
impl SessionConfigBuilder {
	/// Creates a new builder seeded with defaults for the provided origin.
	pub fn new(origin: Url) -> Self {
		Self {
			origin,
			namespace: Namespace::default(),
			login_path: "login".into(),
			refresh_path: "refresh".into(),
			logout_path: "logout".into(),
			login_route: SessionConfig::DEFAULT_LOGIN_ROUTE.into(),
		}
	}

	/// Overrides the protected namespace prefix.
	pub fn protected_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.namespace.protected_prefix = prefix.into();

		self
	}

	/// Overrides the auth sub-namespace prefix.
	pub fn auth_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.namespace.auth_prefix = prefix.into();

		self
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the logout endpoint path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.logout_path = path.into();

		self
	}

	/// Overrides the re-authentication route.
	pub fn login_route(mut self, route: impl Into<String>) -> Self {
		self.login_route = route.into();

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<SessionConfig, SessionConfigError> {
		validate_origin(&self.origin)?;
		validate_prefix("protected", &self.namespace.protected_prefix)?;
		validate_prefix("auth", &self.namespace.auth_prefix)?;

		let nested = self.namespace.auth_prefix.len() > self.namespace.protected_prefix.len()
			&& self.namespace.auth_prefix.starts_with(&self.namespace.protected_prefix);

		if !nested {
			return Err(SessionConfigError::AuthPrefixOutsideNamespace {
				auth: self.namespace.auth_prefix,
				protected: self.namespace.protected_prefix,
			});
		}

		let mut origin = self.origin;

		origin.set_path("/");
		origin.set_query(None);
		origin.set_fragment(None);

		let endpoints = AuthEndpoints {
			login: resolve(&origin, &self.namespace, "login", &self.login_path)?,
			refresh: resolve(&origin, &self.namespace, "refresh", &self.refresh_path)?,
			logout: resolve(&origin, &self.namespace, "logout", &self.logout_path)?,
		};

		Ok(SessionConfig {
			origin,
			namespace: self.namespace,
			endpoints,
			login_route: self.login_route,
		})
	}
}

fn validate_origin(origin: &Url) -> Result<(), SessionConfigError> {
	let host = origin
		.host_str()
		.ok_or_else(|| SessionConfigError::MissingHost { url: origin.to_string() })?;
	let loopback = matches!(host, "localhost" | "127.0.0.1" | "[::1]");

	if origin.scheme() == "https" || (origin.scheme() == "http" && loopback) {
		Ok(())
	} else {
		Err(SessionConfigError::InsecureOrigin { url: origin.to_string() })
	}
}

fn validate_prefix(name: &'static str, prefix: &str) -> Result<(), SessionConfigError> {
	if prefix.len() > 1 && prefix.starts_with('/') && prefix.ends_with('/') {
		Ok(())
	} else {
		Err(SessionConfigError::InvalidPrefix { name, prefix: prefix.into() })
	}
}

fn resolve(
	origin: &Url,
	namespace: &Namespace,
	endpoint: &'static str,
	path: &str,
) -> Result<Url, SessionConfigError> {
	let invalid = || SessionConfigError::InvalidEndpoint { endpoint, path: path.into() };
	let trimmed = path.trim();

	if trimmed.is_empty() {
		return Err(invalid());
	}

	let absolute = if trimmed.starts_with('/') {
		trimmed.to_owned()
	} else {
		format!("{}{trimmed}", namespace.auth_prefix)
	};
	let url = origin.join(&absolute).map_err(|_| invalid())?;

	if url.path().starts_with(&namespace.auth_prefix) {
		Ok(url)
	} else {
		Err(SessionConfigError::EndpointOutsideAuthPrefix { endpoint, path: url.path().into() })
	}
}

//! Bearer credential wrapper that redacts sensitive material, plus the auth endpoint payload that
//! mints it.

// crates.io
use ::http::HeaderValue;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, error::ConfigError, http::ApiResponse};

/// Short-lived bearer credential issued by the auth endpoints.
///
/// The secret is opaque to the client; its real expiry is only discovered when the API answers
/// 401. The advisory lifetime reported by the server is kept for observability and is never used
/// to decide when to renew.
#[derive(Clone)]
pub struct Credential {
	secret: String,
	issued_at: OffsetDateTime,
	expires_in: Option<Duration>,
}
impl Credential {
	const FINGERPRINT_LEN: usize = 12;

	/// Wraps a bearer secret issued now.
	pub fn new(secret: impl Into<String>) -> Self {
		Self { secret: secret.into(), issued_at: OffsetDateTime::now_utc(), expires_in: None }
	}

	/// Attaches the server's advisory lifetime.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
		self.expires_in = if expires_in.is_positive() { Some(expires_in) } else { None };

		self
	}

	/// Overrides the issue instant.
	pub fn with_issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = instant;

		self
	}

	/// Returns the inner secret. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.secret
	}

	/// Instant the credential was stored by this client.
	pub fn issued_at(&self) -> OffsetDateTime {
		self.issued_at
	}

	/// Advisory expiry derived from the server's `expiresInSeconds`, when provided.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.expires_in.map(|ttl| self.issued_at + ttl)
	}

	/// Short, stable, non-reversible identifier that is safe to log.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.secret.as_bytes());
		let mut encoded = URL_SAFE_NO_PAD.encode(digest);

		encoded.truncate(Self::FINGERPRINT_LEN);

		encoded
	}

	/// Renders the `Authorization: Bearer <secret>` header value, marked sensitive.
	pub fn bearer_header(&self) -> Result<HeaderValue, ConfigError> {
		let mut value = HeaderValue::from_str(&format!("Bearer {}", self.secret))?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl PartialEq for Credential {
	fn eq(&self, other: &Self) -> bool {
		self.secret == other.secret
	}
}
impl Eq for Credential {}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("secret", &"<redacted>")
			.field("fingerprint", &self.fingerprint())
			.field("issued_at", &self.issued_at)
			.finish()
	}
}
impl Display for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Payload returned by the login and refresh endpoints.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
	/// Freshly minted bearer secret.
	#[serde(default)]
	pub access_token: Option<String>,
	/// Advisory lifetime in seconds.
	#[serde(default)]
	pub expires_in_seconds: Option<i64>,
}
impl AccessTokenResponse {
	/// Decodes the payload from a successful auth endpoint response.
	pub fn from_response(response: &ApiResponse) -> Result<Self> {
		response.json()
	}

	/// Converts the payload into a [`Credential`], rejecting empty tokens.
	pub fn into_credential(self) -> Result<Credential, ConfigError> {
		let secret = self
			.access_token
			.filter(|token| !token.trim().is_empty())
			.ok_or(ConfigError::MissingAccessToken)?;
		let credential = Credential::new(secret);

		Ok(match self.expires_in_seconds {
			Some(secs) => credential.with_expires_in(Duration::seconds(secs)),
			None => credential,
		})
	}
}

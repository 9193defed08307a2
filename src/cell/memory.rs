//! Session-scoped in-memory [`CredentialCell`].

// self
use crate::{_prelude::*, cell::CredentialCell, credential::Credential};

/// Thread-safe cell keeping the credential in-process for the lifetime of the session.
#[derive(Clone, Debug, Default)]
pub struct MemoryCell(Arc<RwLock<Option<Credential>>>);
impl MemoryCell {
	/// Creates a cell seeded with the provided credential.
	pub fn with_credential(credential: Credential) -> Self {
		Self(Arc::new(RwLock::new(Some(credential))))
	}
}
impl CredentialCell for MemoryCell {
	fn get(&self) -> Option<Credential> {
		self.0.read().clone()
	}

	fn set(&self, credential: Option<Credential>) {
		*self.0.write() = credential;
	}
}

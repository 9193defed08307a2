//! Credential cell contract and the built-in in-memory implementation.

pub mod memory;

pub use memory::MemoryCell;

// self
use crate::{_prelude::*, credential::Credential};

/// Holder of the current access credential.
///
/// The cell carries no concurrency logic of its own beyond being safe to share. It is read by
/// every protected request and written by the renewal coordinator, the login flow, and session
/// termination. Implementations must not call back into the renewal coordinator, because the
/// coordinator writes to the cell while settling a cycle.
pub trait CredentialCell
where
	Self: Send + Sync,
{
	/// Returns the current credential; `None` before anything was stored.
	fn get(&self) -> Option<Credential>;

	/// Replaces (or clears, with `None`) the current credential.
	fn set(&self, credential: Option<Credential>);

	/// Clears the current credential.
	fn clear(&self) {
		self.set(None);
	}

	/// Returns true if a credential is present.
	fn is_present(&self) -> bool {
		self.get().is_some()
	}
}

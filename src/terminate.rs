//! Session termination hooks invoked when a session cannot be recovered.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// Why the session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
	/// The ambient session could not be renewed.
	Expired,
	/// The application revoked access explicitly.
	Unauthorized,
}
impl TerminationReason {
	/// Returns a stable label suitable for query strings and log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TerminationReason::Expired => "expired",
			TerminationReason::Unauthorized => "unauthorized",
		}
	}
}
impl Display for TerminationReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Collaborator that clears ambient UI state and sends the user back to re-authenticate.
///
/// The renewal coordinator calls [`terminate`](SessionTerminator::terminate) at most once per
/// failed renewal cycle, after the credential cell has been cleared.
pub trait SessionTerminator
where
	Self: Send + Sync,
{
	/// Ends the session for `reason`.
	fn terminate(&self, reason: TerminationReason);
}
impl<F> SessionTerminator for F
where
	F: Fn(TerminationReason) + Send + Sync,
{
	fn terminate(&self, reason: TerminationReason) {
		self(reason)
	}
}

/// Terminator that records the login route the host application should navigate to.
#[derive(Debug)]
pub struct LoginRedirect {
	route: String,
	pending: Mutex<Option<String>>,
	count: AtomicU64,
}
impl LoginRedirect {
	/// Creates a terminator targeting `route` (e.g. `/admin/login`).
	pub fn new(route: impl Into<String>) -> Self {
		Self { route: route.into(), pending: Mutex::new(None), count: AtomicU64::new(0) }
	}

	/// Takes the pending redirect target, if a termination happened since the last call.
	pub fn take(&self) -> Option<String> {
		self.pending.lock().take()
	}

	/// Number of terminations observed so far.
	pub fn terminations(&self) -> u64 {
		self.count.load(Ordering::Relaxed)
	}
}
impl SessionTerminator for LoginRedirect {
	fn terminate(&self, reason: TerminationReason) {
		let target = format!("{}?reason={reason}", self.route);

		#[cfg(feature = "tracing")]
		tracing::info!(%reason, route = %target, "session terminated; redirecting to login");

		self.count.fetch_add(1, Ordering::Relaxed);
		*self.pending.lock() = Some(target);
	}
}

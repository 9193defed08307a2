//! Executors that run renewal cycles independently of their waiters.

// crates.io
use futures::future::BoxFuture;
// self
use crate::_prelude::*;

/// Takes ownership of a renewal cycle and polls it to completion in the background.
///
/// The coordinator hands every new cycle to its driver, so the cycle settles (stores or clears
/// the credential and resets to idle) even if every waiter is dropped first.
pub trait CycleDriver
where
	Self: Send + Sync,
{
	/// Runs `cycle` to completion.
	fn drive(&self, cycle: BoxFuture<'static, ()>);
}
impl<F> CycleDriver for F
where
	F: Fn(BoxFuture<'static, ()>) + Send + Sync,
{
	fn drive(&self, cycle: BoxFuture<'static, ()>) {
		self(cycle)
	}
}

/// Spawns cycles onto the ambient Tokio runtime.
#[cfg(feature = "tokio")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioDriver;
#[cfg(feature = "tokio")]
impl CycleDriver for TokioDriver {
	fn drive(&self, cycle: BoxFuture<'static, ()>) {
		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				handle.spawn(cycle);
			},
			Err(_e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(
					error = %_e,
					"no tokio runtime; renewal cycle runs only while awaited"
				);
			},
		}
	}
}

/// Driver used by [`RenewalCoordinator::new`](crate::renewal::RenewalCoordinator::new).
pub(crate) fn default_driver() -> Option<Arc<dyn CycleDriver>> {
	#[cfg(feature = "tokio")]
	{
		Some(Arc::new(TokioDriver))
	}
	#[cfg(not(feature = "tokio"))]
	{
		None
	}
}

//! Single-flight credential renewal with fan-out to every waiting request.
//!
//! [`RenewalCoordinator`] guarantees that at most one call to the refresh endpoint is in flight.
//! The first caller that needs a fresh credential starts a cycle: the coordinator stores a shared
//! pending future in its state and every later caller clones it instead of issuing a second call.
//! When the call settles, the coordinator stores (or clears) the credential and resets its state
//! to idle in one locked step, and only then does the shared future release the waiters. A
//! caller that arrives after the reset starts a new cycle and can never observe the previous
//! cycle's outcome.
//!
//! Waiters may be dropped at any time. Every cycle is handed to a [`CycleDriver`] (the Tokio
//! runtime by default) that polls it to completion, so a cycle always settles even when the
//! caller that started it, or every waiter, is gone.

mod driver;
mod metrics;

#[cfg(feature = "tokio")] pub use driver::TokioDriver;
pub use driver::CycleDriver;
pub use metrics::RenewalMetrics;

// std
use std::{
	mem,
	sync::atomic::{AtomicU64, Ordering},
};
// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	cell::CredentialCell,
	config::SessionConfig,
	credential::{AccessTokenResponse, Credential},
	http::{ApiRequest, CredentialsMode, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	terminate::{SessionTerminator, TerminationReason},
};

type Outcome = std::result::Result<Credential, Arc<Error>>;
type PendingRenewal = Shared<BoxFuture<'static, Outcome>>;

enum RenewalState {
	Idle,
	InFlight { cycle: u64, pending: PendingRenewal },
}

struct CoordinatorInner<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	cell: Arc<dyn CredentialCell>,
	terminator: Arc<dyn SessionTerminator>,
	refresh_endpoint: Url,
	driver: Option<Arc<dyn CycleDriver>>,
	state: Mutex<RenewalState>,
	cycles: AtomicU64,
	metrics: RenewalMetrics,
}
impl<T> CoordinatorInner<T>
where
	T: ?Sized + HttpTransport,
{
	async fn request_credential(&self) -> Result<Credential> {
		let request =
			ApiRequest::post(self.refresh_endpoint.clone()).json(&serde_json::json!({}))?;
		let response = self
			.transport
			.execute(request, CredentialsMode::Include)
			.await?
			.error_for_status()?;

		Ok(AccessTokenResponse::from_response(&response)?.into_credential()?)
	}

	fn settle(&self, cycle: u64, result: Result<Credential>) -> Outcome {
		let outcome = result.map_err(Arc::new);
		let finished = {
			let mut state = self.state.lock();

			match &outcome {
				Ok(credential) => self.cell.set(Some(credential.clone())),
				Err(_) => self.cell.clear(),
			}

			if matches!(&*state, RenewalState::InFlight { cycle: current, .. } if *current == cycle)
			{
				mem::replace(&mut *state, RenewalState::Idle)
			} else {
				RenewalState::Idle
			}
		};

		drop(finished);

		match &outcome {
			Ok(_credential) => {
				self.metrics.record_success();

				#[cfg(feature = "tracing")]
				tracing::debug!(
					cycle,
					fingerprint = %_credential.fingerprint(),
					"renewal succeeded"
				);
			},
			Err(_e) => {
				self.metrics.record_failure();

				#[cfg(feature = "tracing")]
				tracing::warn!(cycle, error = %_e, "renewal failed; terminating session");

				self.terminator.terminate(TerminationReason::Expired);
			},
		}

		outcome
	}
}

/// Owns the renewal state for one application session.
///
/// Cloning the coordinator shares the same state, so every clone participates in the same
/// cycles. Build one per session and inject it wherever renewals may start.
pub struct RenewalCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	inner: Arc<CoordinatorInner<T>>,
}
impl<T> RenewalCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an idle coordinator that renews against the config's refresh endpoint.
	///
	/// Cycles are driven on the ambient Tokio runtime when the `tokio` feature is enabled; use
	/// [`with_driver`](Self::with_driver) for other executors.
	pub fn new(
		config: &SessionConfig,
		transport: impl Into<Arc<T>>,
		cell: Arc<dyn CredentialCell>,
		terminator: Arc<dyn SessionTerminator>,
	) -> Self {
		Self::with_driver(config, transport, cell, terminator, driver::default_driver())
	}

	/// Creates an idle coordinator whose cycles are run by `driver`.
	///
	/// With `None`, a cycle only makes progress while some caller awaits it.
	pub fn with_driver(
		config: &SessionConfig,
		transport: impl Into<Arc<T>>,
		cell: Arc<dyn CredentialCell>,
		terminator: Arc<dyn SessionTerminator>,
		driver: Option<Arc<dyn CycleDriver>>,
	) -> Self {
		Self {
			inner: Arc::new(CoordinatorInner {
				transport: transport.into(),
				cell,
				terminator,
				refresh_endpoint: config.endpoints.refresh.clone(),
				driver,
				state: Mutex::new(RenewalState::Idle),
				cycles: AtomicU64::new(0),
				metrics: RenewalMetrics::default(),
			}),
		}
	}

	/// Obtains a fresh credential, joining the in-flight cycle when there is one.
	///
	/// Every caller of one cycle receives the same credential, or the same
	/// [`Error::RenewalFailed`]. A failed cycle clears the credential cell and invokes the session
	/// terminator exactly once, regardless of how many callers were waiting.
	pub async fn renew(&self) -> Result<Credential> {
		let (pending, started) = self.join_or_start(&mut self.inner.state.lock());

		if started {
			self.drive(&pending);
		}

		Self::wait(pending).await
	}

	/// Like [`renew`](Self::renew), for a request that was rejected while carrying `rejected`.
	///
	/// If no cycle is in flight and the cell already holds a different credential, a cycle has
	/// settled since the request was signed; that credential is returned without a new call.
	pub async fn renew_after(&self, rejected: Option<&Credential>) -> Result<Credential> {
		let (pending, started) = {
			let mut state = self.inner.state.lock();

			if matches!(*state, RenewalState::Idle) {
				if let Some(current) =
					self.inner.cell.get().filter(|current| Some(current) != rejected)
				{
					self.inner.metrics.record_superseded();

					return Ok(current);
				}
			}

			self.join_or_start(&mut state)
		};

		if started {
			self.drive(&pending);
		}

		Self::wait(pending).await
	}

	/// Returns true while a renewal cycle has not settled.
	pub fn is_in_flight(&self) -> bool {
		matches!(*self.inner.state.lock(), RenewalState::InFlight { .. })
	}

	/// Number of cycles started so far.
	pub fn cycles(&self) -> u64 {
		self.inner.cycles.load(Ordering::Relaxed)
	}

	/// Counters describing renewal activity.
	pub fn metrics(&self) -> &RenewalMetrics {
		&self.inner.metrics
	}

	/// Credential cell written by this coordinator.
	pub fn cell(&self) -> &Arc<dyn CredentialCell> {
		&self.inner.cell
	}

	/// Terminator invoked when a cycle fails.
	pub fn terminator(&self) -> &Arc<dyn SessionTerminator> {
		&self.inner.terminator
	}

	// Returns the cycle to wait on and whether this call started it.
	fn join_or_start(&self, state: &mut RenewalState) -> (PendingRenewal, bool) {
		match state {
			RenewalState::InFlight { pending, .. } => {
				self.inner.metrics.record_join();

				(pending.clone(), false)
			},
			RenewalState::Idle => {
				let cycle = self.inner.cycles.fetch_add(1, Ordering::Relaxed) + 1;
				let pending = self.start_cycle(cycle);

				*state = RenewalState::InFlight { cycle, pending: pending.clone() };

				(pending, true)
			},
		}
	}

	// Called after the state lock is released; the driver may poll the cycle immediately.
	fn drive(&self, pending: &PendingRenewal) {
		if let Some(driver) = &self.inner.driver {
			let cycle = pending.clone();

			driver.drive(
				async move {
					let _ = cycle.await;
				}
				.boxed(),
			);
		}
	}

	fn start_cycle(&self, cycle: u64) -> PendingRenewal {
		const KIND: FlowKind = FlowKind::Renewal;

		let inner = Arc::clone(&self.inner);

		async move {
			let span = FlowSpan::new(KIND, "renew");

			span.record_cycle(cycle);
			obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
			inner.metrics.record_attempt();

			let result = span.instrument(inner.request_credential()).await;

			obs::record_result(KIND, &result);

			inner.settle(cycle, result)
		}
		.boxed()
		.shared()
	}

	async fn wait(pending: PendingRenewal) -> Result<Credential> {
		pending.await.map_err(|source| Error::RenewalFailed { source })
	}
}
impl<T> Clone for RenewalCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { inner: Arc::clone(&self.inner) }
	}
}
impl<T> Debug for RenewalCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RenewalCoordinator")
			.field("refresh_endpoint", &self.inner.refresh_endpoint.as_str())
			.field("in_flight", &self.is_in_flight())
			.field("cycles", &self.cycles())
			.finish()
	}
}

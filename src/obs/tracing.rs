// self
use crate::{_prelude::*, obs::FlowKind};

/// Instrumented future when tracing is enabled; the bare future otherwise.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Instrumented future when tracing is enabled; the bare future otherwise.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// `session_renewal.flow` span shared by dispatches, renewal cycles, and session calls.
///
/// The `cycle` and `status` fields start empty and are filled once known, so a renewal span
/// names the cycle it drove and a dispatch span carries the final HTTP status.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span for `kind`; `stage` is the request class or call site.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"session_renewal.flow",
				flow = kind.as_str(),
				stage,
				cycle = tracing::field::Empty,
				status = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Tags the span with the renewal cycle it belongs to.
	pub fn record_cycle(&self, cycle: u64) {
		#[cfg(feature = "tracing")]
		self.span.record("cycle", cycle);
		#[cfg(not(feature = "tracing"))]
		let _ = cycle;
	}

	/// Tags the span with the HTTP status a flow ended on, if it reached the server.
	pub fn record_status<T>(&self, result: &Result<T>)
	where
		T: HasStatus,
	{
		let status = match result {
			Ok(value) => Some(value.status()),
			Err(e) => e.status(),
		};

		#[cfg(feature = "tracing")]
		if let Some(status) = status {
			self.span.record("status", status.as_u16());
		}
		#[cfg(not(feature = "tracing"))]
		let _ = status;
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Values that carry the HTTP status a flow ended on.
pub trait HasStatus {
	/// Status of the final response.
	fn status(&self) -> ::http::StatusCode;
}
impl HasStatus for crate::http::ApiResponse {
	fn status(&self) -> ::http::StatusCode {
		self.status
	}
}

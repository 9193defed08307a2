// self
use crate::{
	classify::RequestClass,
	obs::{FlowKind, FlowOutcome},
};

/// Increments `session_renewal_flow_total{flow,outcome}` (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"session_renewal_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Increments `session_renewal_requests_total{class}` for every dispatched request.
pub fn record_request_class(class: RequestClass) {
	#[cfg(feature = "metrics")]
	metrics::counter!("session_renewal_requests_total", "class" => class.as_str()).increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = class;
}

/// Increments `session_renewal_replays_total{outcome}` after a post-renewal replay.
pub fn record_replay(outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!("session_renewal_replays_total", "outcome" => outcome.as_str()).increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = outcome;
}

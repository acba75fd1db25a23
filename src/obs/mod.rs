//! Observability: component-kind spans and outcome labels, gated behind the
//! optional `tracing`/`metrics` features so the core crate stays
//! instrumentation-agnostic.

// self
use crate::_prelude::*;

/// Which runtime component produced a span or metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentKind {
	/// Connection lifecycle operations.
	Connection,
	/// Capability invocation pipeline.
	Capability,
	/// Webhook delivery processing.
	Webhook,
	/// Sync cursor/outbox dispatch.
	Sync,
}
impl ComponentKind {
	/// Dotted label used in span/metric names.
	pub fn label(self) -> &'static str {
		match self {
			Self::Connection => "connection",
			Self::Capability => "capability",
			Self::Webhook => "webhook",
			Self::Sync => "sync",
		}
	}
}

/// Outcome recorded at the end of a component span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentOutcome {
	/// The operation completed successfully.
	Success,
	/// The operation failed with a retryable error.
	Retryable,
	/// The operation failed terminally.
	Terminal,
}
impl ComponentOutcome {
	/// Dotted label used in span/metric names.
	pub fn label(self) -> &'static str {
		match self {
			Self::Success => "success",
			Self::Retryable => "retryable",
			Self::Terminal => "terminal",
		}
	}
}

/// Records a component's outcome as a counter increment, when the `metrics` feature is enabled.
pub fn record_outcome(component: ComponentKind, outcome: ComponentOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			format!("integrations_broker_{}_total", component.label()),
			"outcome" => outcome.label()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (component, outcome);
	}
}

/// Emits a debug-level tracing event for a component span, when the `tracing` feature is enabled.
pub fn trace_span_event(component: ComponentKind, message: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(target: "integrations_broker", component = component.label(), message);
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (component, message);
	}
}

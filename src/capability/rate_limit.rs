//! Per-connection, per-bucket rate-limit policy evaluated before dispatch and
//! updated from response headers afterward.

// self
use crate::_prelude::*;

/// Context passed to a [`RateLimitPolicy`] before a capability invocation is dispatched.
pub struct RateLimitContext<'a> {
	/// Current token count and the instant the window started, if previously recorded.
	pub state: Option<(u32, OffsetDateTime)>,
	/// Bucket key, typically the capability name or a provider-declared rate-limit group.
	pub bucket: &'a str,
}

/// Decision returned by [`RateLimitPolicy::evaluate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// Proceed with dispatch; the policy's updated state to persist afterward.
	Proceed {
		/// Updated token count.
		tokens: u32,
		/// Updated window start.
		window_start: OffsetDateTime,
	},
	/// Refuse to dispatch; retry no earlier than this directive.
	Throttled(RetryDirective),
}

/// How long the caller should wait before retrying a throttled invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Suggested wait duration.
	pub retry_after: Duration,
}

/// Fixed-window token-bucket policy: `limit` tokens refill every `window`.
pub struct FixedWindowPolicy {
	/// Maximum tokens per window.
	pub limit: u32,
	/// Window duration.
	pub window: Duration,
}
impl FixedWindowPolicy {
	/// Evaluates whether a request should proceed given prior state.
	pub fn evaluate(&self, context: RateLimitContext<'_>) -> RateLimitDecision {
		let now = OffsetDateTime::now_utc();

		let (tokens, window_start) = match context.state {
			Some((tokens, window_start)) if now < window_start + self.window => (tokens, window_start),
			_ => (0, now),
		};

		if tokens >= self.limit {
			let retry_after = (window_start + self.window) - now;

			return RateLimitDecision::Throttled(RetryDirective {
				retry_after: retry_after.max(Duration::ZERO),
			});
		}

		RateLimitDecision::Proceed { tokens: tokens + 1, window_start }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn throttles_past_the_limit() {
		let policy = FixedWindowPolicy { limit: 2, window: Duration::seconds(60) };
		let mut state = None;

		for _ in 0..2 {
			match policy.evaluate(RateLimitContext { state, bucket: "default" }) {
				RateLimitDecision::Proceed { tokens, window_start } => state = Some((tokens, window_start)),
				RateLimitDecision::Throttled(_) => panic!("Should not throttle within the limit."),
			}
		}

		assert!(matches!(
			policy.evaluate(RateLimitContext { state, bucket: "default" }),
			RateLimitDecision::Throttled(_)
		));
	}
}

//! Broker-level error taxonomy shared across auth, connection, capability, and ledger code.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// Each variant maps to exactly one taxonomy kind from the design doc: callers
/// should match on variants rather than message text.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Malformed scope, missing required field, unsupported enum value.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Semantically invalid request for the operation being attempted.
	#[error("{0}")]
	BadInput(String),
	/// Connection, subscription, profile, or cursor could not be located.
	#[error("{resource} not found: {detail}.")]
	NotFound {
		/// Resource kind (e.g. "connection", "cursor").
		resource: &'static str,
		/// Lookup detail included for diagnostics.
		detail: String,
	},
	/// Ambiguous connection resolution or duplicate external account.
	#[error(transparent)]
	Conflict(#[from] ConflictError),
	/// Token endpoint rejection, signature/audience/time-window violation, replay.
	#[error(transparent)]
	AuthFailed(#[from] AuthFailedError),
	/// Capability blocked by missing required grants.
	#[error("Capability `{capability}` is blocked: missing grants {missing:?}.")]
	PolicyDenied {
		/// Capability name that was evaluated.
		capability: String,
		/// Required grants absent from the snapshot.
		missing: Vec<String>,
	},
	/// Policy throttle or provider 429, with an optional retry hint.
	#[error("Rate limited; retry after {retry_after:?}.")]
	RateLimited {
		/// Suggested wait duration before retrying, when known.
		retry_after: Option<Duration>,
	},
	/// Network, 5xx, or context timeout — safe to retry upstream.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, I/O).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Missing dependency or invariant violation.
	#[error("Internal invariant violated: {0}.")]
	Internal(String),
}
impl Error {
	/// Shorthand constructor for [`Error::NotFound`].
	pub fn not_found(resource: &'static str, detail: impl Into<String>) -> Self {
		Self::NotFound { resource, detail: detail.into() }
	}

	/// Shorthand constructor for [`Error::BadInput`].
	pub fn bad_input(message: impl Into<String>) -> Self {
		Self::BadInput(message.into())
	}

	/// Shorthand constructor for [`Error::Internal`].
	pub fn internal(message: impl Into<String>) -> Self {
		Self::Internal(message.into())
	}

	/// Returns `true` when retrying the same operation later might succeed.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient(_) | Self::Transport(_) | Self::RateLimited { .. })
	}
}

/// Field-level validation failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// A required field was empty.
	#[error("Field `{field}` cannot be empty.")]
	EmptyField {
		/// Offending field name.
		field: &'static str,
	},
	/// An enum-like value did not match any accepted variant.
	#[error("Unsupported value `{value}` for field `{field}`.")]
	UnsupportedValue {
		/// Offending field name.
		field: &'static str,
		/// Value that failed validation.
		value: String,
	},
	/// Scope validation failed.
	#[error(transparent)]
	Scope(#[from] crate::scope::ScopeValidationError),
	/// Identifier validation failed.
	#[error(transparent)]
	Identifier(#[from] crate::ids::IdentifierError),
	/// Grant set validation failed.
	#[error(transparent)]
	Grant(#[from] crate::grant::GrantValidationError),
}

/// Ambiguity and uniqueness failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConflictError {
	/// Multiple active connections exist for `(provider, scope)` and no explicit id was given.
	#[error(
		"Multiple active connections exist for this provider/scope; supply an explicit connection id."
	)]
	ConnectionResolutionAmbiguous,
	/// An external account is already bound to a different connection.
	#[error("External account `{external_account_id}` is already bound to another connection.")]
	DuplicateExternalAccount {
		/// External account identifier that collided.
		external_account_id: String,
	},
}

/// Authentication/authorization failures raised by strategies or embedded session exchange.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthFailedError {
	/// Provider rejected the grant (e.g., bad code or refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Requested scopes exceed what was granted.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Credential has been revoked and must not be reused.
	#[error("Credential has been revoked.")]
	Revoked,
	/// Embedded session token failed signature, audience, or time-window checks.
	#[error("Embedded session token rejected: {reason}.")]
	SessionRejected {
		/// Human-readable rejection reason.
		reason: String,
	},
	/// A `jti` was already consumed within the replay window.
	#[error("Replay detected for jti `{jti}`.")]
	ReplayDetected {
		/// The replayed JWT id.
		jti: String,
	},
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Neither an explicit redirect URI nor a callback resolver was supplied.
	#[error("No redirect URI was supplied and no callback URL resolver is configured.")]
	MissingCallbackResolver,
	/// Descriptor does not enable the requested auth kind's capability.
	#[error("Provider `{provider}` does not support auth kind `{auth_kind}`.")]
	UnsupportedAuthKind {
		/// Provider identifier string.
		provider: String,
		/// Disabled auth kind label.
		auth_kind: &'static str,
	},
	/// Cached record is missing a refresh secret.
	#[error("Cached credential is missing a refresh token.")]
	MissingRefreshToken,
	/// Key material could not be parsed (PEM, JWK, etc).
	#[error("Unable to parse key material: {reason}.")]
	InvalidKeyMaterial {
		/// Human-readable parse failure.
		reason: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Provider endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Provider- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Provider responded with malformed JSON that could not be parsed.
	#[error("Provider endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// A lock or lease could not be acquired before the caller's deadline.
	#[error("Timed out waiting for a lock/lease: {0}.")]
	LockTimeout(String),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling a provider endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling a provider endpoint.")]
	Io(#[from] std::io::Error),
	/// Response exceeded the configured maximum body size.
	#[error("Response body exceeded the maximum of {limit} bytes.")]
	ResponseTooLarge {
		/// Configured maximum body size.
		limit: usize,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		Self::network(e)
	}
}

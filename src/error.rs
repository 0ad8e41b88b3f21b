//! Crate-level error types shared across channels, binding elements, and stores.

// self
use crate::{
	_prelude::*,
	binding::Protections,
	store::{StoreEntity, StoreError},
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
///
/// Security verdicts ([`Error::Rejected`]) are kept apart from infrastructure failures
/// ([`Error::Storage`]) so callers can tell an untrustworthy message from an unavailable backend.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure unrelated to message trust.
	#[error("{0}")]
	Storage(#[source] StoreError),
	/// Local configuration problem detected while assembling a channel.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A binding element refused the message.
	#[error("Message rejected: {0}")]
	Rejected(#[from] Rejection),
	/// Timestamp could not be rendered for the wire.
	#[error("Timestamp could not be formatted.")]
	Timestamp(#[from] time::error::Format),

	/// Unknown consumer or token; treat the caller as unauthenticated.
	#[error("{entity} `{key}` was not found.")]
	NotFound {
		/// Kind of record that was looked up.
		entity: StoreEntity,
		/// Key used for the lookup.
		key: String,
	},
	/// Token/consumer mismatch or a token that was already consumed.
	#[error("Token is invalid: {reason}.")]
	InvalidToken {
		/// Store- or issuer-supplied reason string.
		reason: String,
	},
}
impl Error {
	/// Returns the rejection reason when this error is a security verdict on a message.
	pub fn rejection(&self) -> Option<&Rejection> {
		match self {
			Self::Rejected(rejection) => Some(rejection),
			_ => None,
		}
	}

	/// Returns `true` if the error is a security verdict rather than an infrastructure failure.
	pub fn is_rejection(&self) -> bool {
		matches!(self, Self::Rejected(_))
	}
}
impl From<StoreError> for Error {
	fn from(e: StoreError) -> Self {
		match e {
			StoreError::NotFound { entity, key } => Self::NotFound { entity, key },
			StoreError::Expired { token } =>
				Self::InvalidToken { reason: format!("token `{token}` has expired") },
			StoreError::InvalidToken { reason } => Self::InvalidToken { reason },
			other => Self::Storage(other),
		}
	}
}

/// Tagged reasons a binding element gives for refusing a message.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Rejection {
	/// Signature missing, undecodable, or not matching the message contents.
	#[error("Message signature is invalid.")]
	InvalidSignature,
	/// The message nonce was already recorded inside the validity window.
	#[error("Message nonce was already used.")]
	ReplayDetected,
	/// The message timestamp is older than the configured window.
	#[error("Message issued at {issued_at} has expired.")]
	Expired {
		/// Instant embedded in the message.
		issued_at: OffsetDateTime,
	},
	/// The message references an unknown or consumed token.
	#[error("Message token is invalid: {reason}.")]
	InvalidToken {
		/// Human-readable detail.
		reason: String,
	},
	/// The message could not be interpreted.
	#[error("Message is malformed: {reason}.")]
	Malformed {
		/// Human-readable detail.
		reason: String,
	},
	/// An assertion arrived without a request this party issued.
	#[error("Unsolicited assertions are rejected by the security settings.")]
	UnsolicitedAssertion,
	/// The message conflicts with the configured security settings.
	#[error("Message violates the security policy: {reason}.")]
	PolicyViolation {
		/// Human-readable detail.
		reason: String,
	},
}
impl Rejection {
	/// Builds a [`Rejection::Malformed`] from any displayable reason.
	pub fn malformed(reason: impl Into<String>) -> Self {
		Self::Malformed { reason: reason.into() }
	}

	/// Builds a [`Rejection::PolicyViolation`] from any displayable reason.
	pub fn policy(reason: impl Into<String>) -> Self {
		Self::PolicyViolation { reason: reason.into() }
	}

	/// Stable label suitable for span or metric fields.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::InvalidSignature => "invalid_signature",
			Self::ReplayDetected => "replay_detected",
			Self::Expired { .. } => "expired",
			Self::InvalidToken { .. } => "invalid_token",
			Self::Malformed { .. } => "malformed",
			Self::UnsolicitedAssertion => "unsolicited_assertion",
			Self::PolicyViolation { .. } => "policy_violation",
		}
	}
}

/// Construction-time failures raised while assembling settings or channels.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// Unsolicited assertion rejection needs the context nonce element, which this
	/// configuration cannot build.
	#[error("Rejecting unsolicited assertions requires a {missing}.")]
	UnsolicitedAssertionRejectionUnavailable {
		/// Collaborator that was not supplied.
		missing: &'static str,
	},
	/// The skip-security element was combined with a real security element.
	#[error("The skip-security element cannot share a channel with the `{element}` element.")]
	SkipSecurityNotExclusive {
		/// Conflicting element name.
		element: &'static str,
	},
	/// Two elements claim the same protection.
	#[error("Multiple binding elements provide {protection} protection.")]
	DuplicateProtection {
		/// Protection claimed twice.
		protection: Protections,
	},
	/// A protection element was registered outside a layer that must wrap it.
	#[error("The `{element}` element must be registered before the `{outer}` element.")]
	ProtectionOutOfOrder {
		/// Element registered too late.
		element: &'static str,
		/// Outer element that was registered ahead of it.
		outer: &'static str,
	},
	/// An extension namespace was registered more than once.
	#[error("Extension namespace `{type_uri}` is already registered.")]
	DuplicateExtension {
		/// Namespace identifier.
		type_uri: String,
	},
	/// Security settings contain an unusable value.
	#[error("Security settings are invalid: {reason}.")]
	InvalidSettings {
		/// Human-readable detail.
		reason: String,
	},
}

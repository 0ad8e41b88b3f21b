//! Stored token records and their lifecycle helpers.

// self
use crate::{
	_prelude::*,
	auth::{ConsumerKey, TokenParameters, TokenSecret},
};

/// Whether a record tracks an unauthorized request token or an authorized access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
	/// Request token awaiting exchange.
	Request,
	/// Access token minted by an exchange.
	Access,
}
impl TokenKind {
	/// Returns a stable label suitable for logs and errors.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Request => "request",
			Self::Access => "access",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Current lifecycle status for a token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token may be used.
	Active,
	/// Token was consumed by an exchange or otherwise expired.
	Expired,
}

/// Record describing an issued token.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Consumer that owns the token.
	pub consumer: ConsumerKey,
	/// Request or access token.
	pub kind: TokenKind,
	/// Secret bound to the token; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Application parameters (scope) attached to the token.
	pub parameters: TokenParameters,
	/// Instant the store accepted the token.
	pub issued_at: OffsetDateTime,
	/// Instant the token was consumed or expired, if it has been.
	pub expired_at: Option<OffsetDateTime>,
}
impl TokenRecord {
	/// Creates an active record issued at `issued_at`.
	pub fn new(
		consumer: ConsumerKey,
		kind: TokenKind,
		secret: TokenSecret,
		parameters: TokenParameters,
		issued_at: OffsetDateTime,
	) -> Self {
		Self { consumer, kind, secret, parameters, issued_at, expired_at: None }
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		match self.expired_at {
			Some(expired_at) if instant >= expired_at => TokenStatus::Expired,
			_ => TokenStatus::Active,
		}
	}

	/// Returns `true` if the record has been expired at any point.
	pub fn is_expired(&self) -> bool {
		self.expired_at.is_some()
	}

	/// Marks the record as expired.
	pub fn expire(&mut self, instant: OffsetDateTime) {
		self.expired_at = Some(instant);
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("consumer", &self.consumer)
			.field("kind", &self.kind)
			.field("secret", &"<redacted>")
			.field("parameters", &self.parameters)
			.field("issued_at", &self.issued_at)
			.field("expired_at", &self.expired_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn expiry_changes_status_and_redacts_secret() {
		let issued = macros::datetime!(2025-11-10 12:00 UTC);
		let mut record = TokenRecord::new(
			ConsumerKey::new("consumer-1").expect("Consumer fixture should be valid."),
			TokenKind::Request,
			TokenSecret::new("s3cr3t"),
			TokenParameters::default(),
			issued,
		);

		assert_eq!(record.status_at(issued), TokenStatus::Active);

		record.expire(issued + Duration::minutes(5));

		assert!(record.is_expired());
		assert_eq!(record.status_at(issued), TokenStatus::Active);
		assert_eq!(record.status_at(issued + Duration::minutes(5)), TokenStatus::Expired);
		assert!(!format!("{record:?}").contains("s3cr3t"));
	}
}

//! Issue-instant stamping and stale-message rejection.

// self
use crate::{
	_prelude::*,
	binding::{BindingElement, Disposition, ElementRole, Protections},
	message::{self, Message, field},
	settings::SecuritySettings,
};

/// Stamps `issued` on send and refuses messages older than the message age plus clock skew.
///
/// Messages dated further in the future than the clock skew are malformed rather than expired.
#[derive(Clone, Debug)]
pub struct ExpirationElement {
	settings: SecuritySettings,
}
impl ExpirationElement {
	/// Creates the element for the given settings.
	pub fn new(settings: SecuritySettings) -> Self {
		Self { settings }
	}

	pub(crate) fn prepare_outgoing_at(
		&self,
		message: &mut Message,
		now: OffsetDateTime,
	) -> Result<Disposition> {
		message.set(field::ISSUED, message::format_instant(now)?);

		Ok(Disposition::Applied)
	}

	pub(crate) fn process_incoming_at(
		&self,
		message: &mut Message,
		now: OffsetDateTime,
	) -> Result<Disposition> {
		let Some(issued) = message.field(field::ISSUED) else {
			return Ok(Disposition::NotApplicable);
		};
		let issued_at = message::parse_instant(issued)?;
		let skew = self.settings.maximum_clock_skew();
		// Differences between two instants always fit a `Duration`; sums may not.
		let age = now - issued_at;

		if age > self.settings.maximum_message_age() + skew {
			return Err(Rejection::Expired { issued_at }.into());
		}
		if -age > skew {
			return Err(Rejection::malformed(format!(
				"message issued at {issued} lies beyond the tolerated clock skew"
			))
			.into());
		}

		message.remove(field::ISSUED);

		Ok(Disposition::Applied)
	}
}
impl BindingElement for ExpirationElement {
	fn name(&self) -> &'static str {
		"expiration"
	}

	fn role(&self) -> ElementRole {
		ElementRole::Security
	}

	fn protection(&self) -> Protections {
		Protections::EXPIRATION
	}

	fn prepare_outgoing(&self, message: &mut Message) -> Result<Disposition> {
		self.prepare_outgoing_at(message, OffsetDateTime::now_utc())
	}

	fn process_incoming(&self, message: &mut Message) -> Result<Disposition> {
		self.process_incoming_at(message, OffsetDateTime::now_utc())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::message::{MessageMode, ProtocolVersion};

	fn stamped(at: OffsetDateTime) -> (ExpirationElement, Message) {
		let element = ExpirationElement::new(SecuritySettings::default());
		let mut message = Message::new(MessageMode::PositiveAssertion, ProtocolVersion::V2);

		element.prepare_outgoing_at(&mut message, at).expect("Stamping should succeed.");

		(element, message)
	}

	#[test]
	fn messages_inside_the_window_are_accepted_and_unstamped() {
		let issued = macros::datetime!(2025-11-10 12:00 UTC);
		let (element, mut message) = stamped(issued);

		assert_eq!(message.field(field::ISSUED), Some("2025-11-10T12:00:00Z"));
		assert_eq!(
			element
				.process_incoming_at(&mut message, issued + Duration::minutes(22))
				.expect("Message within age plus skew should pass."),
			Disposition::Applied
		);
		assert!(!message.has_field(field::ISSUED));
	}

	#[test]
	fn stale_messages_expire() {
		let issued = macros::datetime!(2025-11-10 12:00 UTC);
		let (element, mut message) = stamped(issued);
		let err = element
			.process_incoming_at(&mut message, issued + Duration::minutes(24))
			.expect_err("Message older than age plus skew must expire.");

		assert_eq!(err.rejection(), Some(&Rejection::Expired { issued_at: issued }));
	}

	#[test]
	fn future_dated_messages_are_malformed() {
		let issued = macros::datetime!(2025-11-10 12:00 UTC);
		let (element, mut message) = stamped(issued);
		let err = element
			.process_incoming_at(&mut message, issued - Duration::minutes(11))
			.expect_err("Message beyond the skew must be rejected.");

		assert!(matches!(err.rejection(), Some(Rejection::Malformed { .. })));
	}

	#[test]
	fn extreme_stamps_are_refused_without_overflowing() {
		let element = ExpirationElement::new(SecuritySettings::default());
		let now = macros::datetime!(2025-11-10 12:00 UTC);
		let mut far_future = Message::new(MessageMode::PositiveAssertion, ProtocolVersion::V2)
			.with_field(field::ISSUED, "9999-12-31T23:59:59Z");
		let err = element
			.process_incoming_at(&mut far_future, now)
			.expect_err("A stamp near the end of time must be refused.");

		assert!(matches!(err.rejection(), Some(Rejection::Malformed { .. })));

		let mut far_past = Message::new(MessageMode::PositiveAssertion, ProtocolVersion::V2)
			.with_field(field::ISSUED, "0000-01-01T00:00:00Z");
		let err = element
			.process_incoming_at(&mut far_past, now)
			.expect_err("A stamp near the start of time must expire.");

		assert!(matches!(err.rejection(), Some(Rejection::Expired { .. })));
	}

	#[test]
	fn unstamped_messages_are_not_applicable() {
		let element = ExpirationElement::new(SecuritySettings::default());
		let mut message = Message::new(MessageMode::NegativeAssertion, ProtocolVersion::V2);

		assert_eq!(
			element.process_incoming(&mut message).expect("Missing stamp is not an error."),
			Disposition::NotApplicable
		);
	}
}

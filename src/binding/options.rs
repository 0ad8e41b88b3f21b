//! Enforcement of the version and transport requirements in [`SecuritySettings`].

// self
use crate::{
	_prelude::*,
	binding::{BindingElement, Disposition, ElementRole},
	message::{Message, field},
	settings::SecuritySettings,
};

const SECURE_SCHEME: &str = "https://";

/// Refuses messages below the minimum protocol version or with plain-text return addresses.
#[derive(Clone, Debug)]
pub struct SecurityOptionsElement {
	settings: SecuritySettings,
}
impl SecurityOptionsElement {
	/// Creates the element for the given settings.
	pub fn new(settings: SecuritySettings) -> Self {
		Self { settings }
	}

	fn check(&self, message: &Message) -> Result<Disposition> {
		let version = message.version();

		if version < self.settings.minimum_version() {
			return Err(Rejection::policy(format!(
				"protocol version {version} is below the required {}",
				self.settings.minimum_version()
			))
			.into());
		}
		if self.settings.require_ssl() {
			for name in [field::RETURN_TO, field::REALM, field::TRUST_ROOT] {
				if message.field(name).is_some_and(|value| !value.starts_with(SECURE_SCHEME)) {
					return Err(Rejection::policy(format!("`{name}` must use https")).into());
				}
			}
		}

		Ok(Disposition::Applied)
	}
}
impl BindingElement for SecurityOptionsElement {
	fn name(&self) -> &'static str {
		"security_options"
	}

	fn role(&self) -> ElementRole {
		ElementRole::Transform
	}

	fn prepare_outgoing(&self, message: &mut Message) -> Result<Disposition> {
		self.check(message)
	}

	fn process_incoming(&self, message: &mut Message) -> Result<Disposition> {
		self.check(message)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::message::{MessageMode, ProtocolVersion};

	fn strict() -> SecurityOptionsElement {
		SecurityOptionsElement::new(
			SecuritySettings::builder()
				.require_ssl(true)
				.minimum_version(ProtocolVersion::V2)
				.build()
				.expect("Settings fixture should build."),
		)
	}

	#[test]
	fn legacy_versions_are_refused_when_a_minimum_is_set() {
		let mut message = Message::new(MessageMode::PositiveAssertion, ProtocolVersion::V1);
		let err = strict().process_incoming(&mut message).expect_err("1.x must be refused.");

		assert!(matches!(err.rejection(), Some(Rejection::PolicyViolation { .. })));
	}

	#[test]
	fn plain_text_addresses_are_refused_in_both_directions() {
		let mut message = Message::new(MessageMode::AuthenticationRequest, ProtocolVersion::V2)
			.with_field(field::RETURN_TO, "http://rp.example.com/return");

		assert!(strict().prepare_outgoing(&mut message.clone()).is_err());
		assert!(strict().process_incoming(&mut message).is_err());

		let mut secure = Message::new(MessageMode::AuthenticationRequest, ProtocolVersion::V2)
			.with_field(field::RETURN_TO, "https://rp.example.com/return");

		assert_eq!(
			strict().process_incoming(&mut secure).expect("https addresses pass."),
			Disposition::Applied
		);
	}

	#[test]
	fn default_settings_accept_everything() {
		let element = SecurityOptionsElement::new(SecuritySettings::default());
		let mut message = Message::new(MessageMode::AuthenticationRequest, ProtocolVersion::V1)
			.with_field(field::RETURN_TO, "http://rp.example.com/return");

		assert!(element.process_incoming(&mut message).is_ok());
	}
}

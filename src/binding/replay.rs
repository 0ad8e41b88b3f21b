//! Response-nonce stamping and replay detection.

// self
use crate::{
	_prelude::*,
	binding::{self, BindingElement, Disposition, ElementRole, Protections},
	message::{Message, field},
	store::NonceStore,
};

/// Stamps a fresh `response_nonce` on send and records it on receive.
///
/// A nonce the store has already seen (or one too old for the store to vouch for) is a replay.
#[derive(Clone, Debug)]
pub struct ReplayProtectionElement {
	nonces: Arc<dyn NonceStore>,
}
impl ReplayProtectionElement {
	/// Creates the element over a shared nonce store.
	pub fn new(nonces: Arc<dyn NonceStore>) -> Self {
		Self { nonces }
	}
}
impl BindingElement for ReplayProtectionElement {
	fn name(&self) -> &'static str {
		"replay_protection"
	}

	fn role(&self) -> ElementRole {
		ElementRole::Security
	}

	fn protection(&self) -> Protections {
		Protections::REPLAY
	}

	fn prepare_outgoing(&self, message: &mut Message) -> Result<Disposition> {
		message.set(field::RESPONSE_NONCE, binding::mint_nonce(OffsetDateTime::now_utc())?);

		Ok(Disposition::Applied)
	}

	fn process_incoming(&self, message: &mut Message) -> Result<Disposition> {
		let Some(nonce) = message.remove(field::RESPONSE_NONCE) else {
			return Ok(Disposition::NotApplicable);
		};
		let issued_at = binding::nonce_instant(&nonce)?;

		if !self.nonces.record_if_new(None, &nonce, issued_at).map_err(Error::Storage)? {
			return Err(Rejection::ReplayDetected.into());
		}

		Ok(Disposition::Applied)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		message::{MessageMode, ProtocolVersion},
		store::MemoryNonceStore,
	};

	#[test]
	fn second_delivery_is_a_replay() {
		let element = ReplayProtectionElement::new(Arc::new(MemoryNonceStore::default()));
		let mut message = Message::new(MessageMode::PositiveAssertion, ProtocolVersion::V2);

		element.prepare_outgoing(&mut message).expect("Stamping should succeed.");

		let mut replayed = message.clone();

		assert_eq!(
			element.process_incoming(&mut message).expect("First delivery is accepted."),
			Disposition::Applied
		);
		assert!(!message.has_field(field::RESPONSE_NONCE));

		let err = element.process_incoming(&mut replayed).expect_err("Second delivery must fail.");

		assert_eq!(err.rejection(), Some(&Rejection::ReplayDetected));
	}

	#[test]
	fn undated_nonces_are_malformed() {
		let element = ReplayProtectionElement::new(Arc::new(MemoryNonceStore::default()));
		let mut message = Message::new(MessageMode::PositiveAssertion, ProtocolVersion::V2)
			.with_field(field::RESPONSE_NONCE, "no-timestamp");

		assert!(matches!(
			element.process_incoming(&mut message).map_err(|e| e.rejection().cloned()),
			Err(Some(Rejection::Malformed { .. }))
		));
	}
}

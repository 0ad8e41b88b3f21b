//! Request-context elements: a nonce this party stamps into its own requests and a signature
//! that keeps that nonce and the return address from being altered while they round-trip
//! through the peer.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::Mac;
// self
use crate::{
	_prelude::*,
	binding::{self, BindingElement, Disposition, ElementRole, KeyRing, hmac_sha256},
	message::{Message, MessageMode, field},
	settings::SecuritySettings,
	store::{CryptoKeyStore, NonceStore},
};

/// Nonce store context under which request nonces are recorded.
pub const CONTEXT_NONCE_SCOPE: &str = "rp_nonce";
/// Crypto key store bucket holding the context signing keys.
pub const CONTEXT_SIGNING_BUCKET: &str = "context_signing";

const SIGNED_CONTEXT: [&str; 3] = [field::CONTEXT_HANDLE, field::CONTEXT_NONCE, field::RETURN_TO];

/// Stamps `rp_nonce` into outgoing authentication requests and checks it on returning assertions.
///
/// An assertion without the nonce is unsolicited; with
/// [`SecuritySettings::reject_unsolicited_assertions`] set it is refused.
#[derive(Clone, Debug)]
pub struct ContextNonceElement {
	nonces: Arc<dyn NonceStore>,
	settings: SecuritySettings,
}
impl ContextNonceElement {
	/// Creates the element over a shared nonce store.
	pub fn new(nonces: Arc<dyn NonceStore>, settings: SecuritySettings) -> Self {
		Self { nonces, settings }
	}
}
impl BindingElement for ContextNonceElement {
	fn name(&self) -> &'static str {
		"context_nonce"
	}

	fn role(&self) -> ElementRole {
		ElementRole::Security
	}

	fn prepare_outgoing(&self, message: &mut Message) -> Result<Disposition> {
		if message.mode() != MessageMode::AuthenticationRequest {
			return Ok(Disposition::NotApplicable);
		}

		message.set(field::CONTEXT_NONCE, binding::mint_nonce(OffsetDateTime::now_utc())?);

		Ok(Disposition::Applied)
	}

	fn process_incoming(&self, message: &mut Message) -> Result<Disposition> {
		let Some(nonce) = message.field(field::CONTEXT_NONCE).map(str::to_owned) else {
			if message.mode() == MessageMode::PositiveAssertion
				&& self.settings.reject_unsolicited_assertions()
			{
				return Err(Rejection::UnsolicitedAssertion.into());
			}

			return Ok(Disposition::NotApplicable);
		};
		let issued_at = binding::nonce_instant(&nonce)?;
		let window = self.settings.maximum_message_age() + self.settings.maximum_clock_skew();

		if OffsetDateTime::now_utc() - issued_at > window {
			return Err(Rejection::Expired { issued_at }.into());
		}
		if !self
			.nonces
			.record_if_new(Some(CONTEXT_NONCE_SCOPE), &nonce, issued_at)
			.map_err(Error::Storage)?
		{
			return Err(Rejection::ReplayDetected.into());
		}

		message.remove(field::CONTEXT_NONCE);

		Ok(Disposition::Applied)
	}
}

/// Signs the context fields of outgoing requests and verifies them on the way back.
///
/// The signature covers `rp_handle`, `rp_nonce`, and `return_to`; an incoming message that
/// carries a request nonce without a valid context signature is refused.
#[derive(Clone, Debug)]
pub struct ContextSignatureElement {
	keys: KeyRing,
}
impl ContextSignatureElement {
	/// Creates the element over a shared crypto key store.
	pub fn new(keys: Arc<dyn CryptoKeyStore>, settings: &SecuritySettings) -> Self {
		Self {
			keys: KeyRing::new(
				keys,
				CONTEXT_SIGNING_BUCKET,
				settings.signing_key_lifetime(),
				settings.maximum_message_age() + settings.maximum_clock_skew(),
			),
		}
	}
}
impl BindingElement for ContextSignatureElement {
	fn name(&self) -> &'static str {
		"context_signature"
	}

	fn role(&self) -> ElementRole {
		ElementRole::Security
	}

	fn prepare_outgoing(&self, message: &mut Message) -> Result<Disposition> {
		if message.mode() != MessageMode::AuthenticationRequest
			|| !message.has_field(field::CONTEXT_NONCE)
		{
			return Ok(Disposition::NotApplicable);
		}

		let (handle, key) = self.keys.current(OffsetDateTime::now_utc())?;

		message.set(field::CONTEXT_HANDLE, handle);

		let signature = hmac_sha256(key.material(), &signed_context(message))?.finalize();

		message.set(field::CONTEXT_SIG, STANDARD.encode(signature.into_bytes()));

		Ok(Disposition::Applied)
	}

	fn process_incoming(&self, message: &mut Message) -> Result<Disposition> {
		let Some(signature) = message.field(field::CONTEXT_SIG) else {
			if message.has_field(field::CONTEXT_NONCE) {
				return Err(Rejection::InvalidSignature.into());
			}

			return Ok(Disposition::NotApplicable);
		};
		let signature = STANDARD.decode(signature).map_err(|_| Rejection::InvalidSignature)?;
		let handle = message.field(field::CONTEXT_HANDLE).ok_or(Rejection::InvalidSignature)?;
		let key = self
			.keys
			.find(handle, OffsetDateTime::now_utc())?
			.ok_or(Rejection::InvalidSignature)?;

		hmac_sha256(key.material(), &signed_context(message))?
			.verify_slice(&signature)
			.map_err(|_| Rejection::InvalidSignature)?;

		message.remove(field::CONTEXT_SIG);
		message.remove(field::CONTEXT_HANDLE);

		Ok(Disposition::Applied)
	}
}

fn signed_context(message: &Message) -> String {
	binding::canonical_form(
		SIGNED_CONTEXT.into_iter().filter_map(|name| message.field(name).map(|value| (name, value))),
	)
}

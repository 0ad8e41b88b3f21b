//! Whole-message HMAC-SHA256 signatures and the key sources behind them.

// std
use std::collections::BTreeSet;
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::Mac;
// self
use crate::{
	_prelude::*,
	auth::{ConsumerKey, TokenSecret},
	binding::{self, BindingElement, Disposition, ElementRole, KeyRing, Protections, hmac_sha256},
	message::{Message, field},
	settings::SecuritySettings,
	store::{CryptoKeyStore, StoreError, TokenStore},
};

/// Crypto key store bucket holding association signing keys.
pub const MESSAGE_SIGNING_BUCKET: &str = "message_signing";

/// Source of the HMAC key for a message.
pub trait SigningKeys
where
	Self: Debug + Send + Sync,
{
	/// Resolves the key for an outgoing message, stamping any fields that identify it.
	fn signing_key(&self, message: &mut Message) -> Result<Vec<u8>>;

	/// Resolves the key that must have signed an incoming message.
	fn verification_key(&self, message: &Message) -> Result<Vec<u8>>;

	/// Fields [`SigningKeys::signing_key`] stamps; removed again once a message verifies.
	fn stamped_fields(&self) -> &'static [&'static str] {
		&[]
	}
}

/// Keys drawn from a crypto key store and identified on the wire by `assoc_handle`.
#[derive(Clone, Debug)]
pub struct AssociationKeys {
	keys: KeyRing,
}
impl AssociationKeys {
	/// Creates a key source over the store's message-signing bucket.
	pub fn new(store: Arc<dyn CryptoKeyStore>, settings: &SecuritySettings) -> Self {
		Self {
			keys: KeyRing::new(
				store,
				MESSAGE_SIGNING_BUCKET,
				settings.signing_key_lifetime(),
				settings.maximum_message_age() + settings.maximum_clock_skew(),
			),
		}
	}
}
impl SigningKeys for AssociationKeys {
	fn signing_key(&self, message: &mut Message) -> Result<Vec<u8>> {
		let (handle, key) = self.keys.current(OffsetDateTime::now_utc())?;

		message.set(field::ASSOC_HANDLE, handle);

		Ok(key.material().to_vec())
	}

	fn verification_key(&self, message: &Message) -> Result<Vec<u8>> {
		let handle = message.field(field::ASSOC_HANDLE).ok_or(Rejection::InvalidSignature)?;
		let key = self
			.keys
			.find(handle, OffsetDateTime::now_utc())?
			.ok_or(Rejection::InvalidSignature)?;

		Ok(key.material().to_vec())
	}

	fn stamped_fields(&self) -> &'static [&'static str] {
		&[field::ASSOC_HANDLE]
	}
}

/// OAuth-style keys: `consumer_secret&token_secret`, looked up from the token store.
///
/// The message names its consumer in `consumer_key` and, once a token was issued, the token in
/// `token`. Unknown consumers are rejected as [`Rejection::InvalidSignature`]; unknown or consumed
/// tokens as [`Rejection::InvalidToken`].
#[derive(Clone, Debug)]
pub struct ConsumerKeys {
	store: Arc<dyn TokenStore>,
}
impl ConsumerKeys {
	/// Creates a key source over a token store.
	pub fn new(store: Arc<dyn TokenStore>) -> Self {
		Self { store }
	}

	fn key_for(&self, message: &Message) -> Result<Vec<u8>> {
		let consumer = message.field(field::CONSUMER_KEY).ok_or(Rejection::InvalidSignature)?;
		let consumer = ConsumerKey::new(consumer)
			.map_err(|e| Rejection::malformed(format!("consumer key is invalid: {e}")))?;
		let consumer_secret = self.store.consumer_secret(&consumer).map_err(|e| match e {
			StoreError::NotFound { .. } => Rejection::InvalidSignature.into(),
			other => Error::from(other),
		})?;
		let token_secret =
			message.field(field::TOKEN).map(|token| self.token_secret(token)).transpose()?;
		let key = format!(
			"{}&{}",
			consumer_secret.expose(),
			token_secret.as_ref().map(TokenSecret::expose).unwrap_or_default()
		);

		Ok(key.into_bytes())
	}

	fn token_secret(&self, token: &str) -> Result<TokenSecret> {
		self.store.token_secret(token).map_err(|e| match e {
			StoreError::NotFound { .. } | StoreError::Expired { .. } =>
				Rejection::InvalidToken { reason: e.to_string() }.into(),
			other => Error::from(other),
		})
	}
}
impl SigningKeys for ConsumerKeys {
	fn signing_key(&self, message: &mut Message) -> Result<Vec<u8>> {
		self.key_for(message)
	}

	fn verification_key(&self, message: &Message) -> Result<Vec<u8>> {
		self.key_for(message)
	}
}

/// Signs every outgoing field and verifies that incoming messages were signed in full.
///
/// `signed` lists the covered field names and `sig` carries the base64 HMAC-SHA256 over their
/// canonical `key:value\n` form in key order. On receive, an unsigned message passes through only
/// when its mode does not demand tamper protection and it carries nothing the inner elements
/// would trust (`issued`, `response_nonce`); any other mismatch is an invalid signature. No inner
/// element ever records or evaluates unauthenticated content.
#[derive(Clone, Debug)]
pub struct SigningElement {
	keys: Arc<dyn SigningKeys>,
}
impl SigningElement {
	/// Creates the element over a key source.
	pub fn new(keys: Arc<dyn SigningKeys>) -> Self {
		Self { keys }
	}
}
impl BindingElement for SigningElement {
	fn name(&self) -> &'static str {
		"signing"
	}

	fn role(&self) -> ElementRole {
		ElementRole::Security
	}

	fn protection(&self) -> Protections {
		Protections::TAMPER
	}

	fn prepare_outgoing(&self, message: &mut Message) -> Result<Disposition> {
		message.remove(field::SIG);
		message.remove(field::SIGNED);

		let secret = self.keys.signing_key(message)?;
		let content = binding::canonical_form(
			message.fields().iter().map(|(key, value)| (key.as_str(), value.as_str())),
		);
		let signed = message.fields().keys().map(String::as_str).collect::<Vec<_>>().join(",");
		let signature = hmac_sha256(&secret, &content)?.finalize();

		message.set(field::SIGNED, signed);
		message.set(field::SIG, STANDARD.encode(signature.into_bytes()));

		Ok(Disposition::Applied)
	}

	fn process_incoming(&self, message: &mut Message) -> Result<Disposition> {
		let (signature, signed) = match (message.field(field::SIG), message.field(field::SIGNED)) {
			(None, None) if unsigned_is_acceptable(message) => return Ok(Disposition::NotApplicable),
			(Some(signature), Some(signed)) => (signature, signed),
			_ => return Err(Rejection::InvalidSignature.into()),
		};
		let listed = signed.split(',').collect::<BTreeSet<_>>();
		let present = message
			.fields()
			.keys()
			.map(String::as_str)
			.filter(|key| *key != field::SIG && *key != field::SIGNED)
			.collect::<BTreeSet<_>>();

		if listed != present {
			return Err(Rejection::InvalidSignature.into());
		}

		let signature = STANDARD.decode(signature).map_err(|_| Rejection::InvalidSignature)?;
		let secret = self.keys.verification_key(message)?;
		let content = binding::canonical_form(
			message
				.fields()
				.iter()
				.filter(|(key, _)| listed.contains(key.as_str()))
				.map(|(key, value)| (key.as_str(), value.as_str())),
		);

		hmac_sha256(&secret, &content)?
			.verify_slice(&signature)
			.map_err(|_| Rejection::InvalidSignature)?;

		message.remove(field::SIG);
		message.remove(field::SIGNED);

		for name in self.keys.stamped_fields() {
			message.remove(name);
		}

		Ok(Disposition::Applied)
	}
}

fn unsigned_is_acceptable(message: &Message) -> bool {
	!message.mode().required_protections().contains(Protections::TAMPER)
		&& !message.has_field(field::ISSUED)
		&& !message.has_field(field::RESPONSE_NONCE)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{build_test_token_store, sample_assertion},
		auth::{RequestToken, TokenParameters},
		message::{MessageMode, ProtocolVersion},
		store::MemoryCryptoKeyStore,
	};

	fn association_element() -> SigningElement {
		let keys = AssociationKeys::new(
			Arc::new(MemoryCryptoKeyStore::default()),
			&SecuritySettings::default(),
		);

		SigningElement::new(Arc::new(keys))
	}

	#[test]
	fn signed_messages_verify_and_lose_their_signature_fields() {
		let element = association_element();
		let original = sample_assertion();
		let mut message = original.clone();

		element.prepare_outgoing(&mut message).expect("Signing should succeed.");

		assert!(message.has_field(field::ASSOC_HANDLE));
		assert_eq!(
			message.field(field::SIGNED),
			Some("assoc_handle,claimed_id,identity,mode,ns,return_to")
		);
		assert_eq!(
			element.process_incoming(&mut message).expect("Signature should verify."),
			Disposition::Applied
		);
		assert_eq!(message, original);
	}

	#[test]
	fn tampering_is_detected() {
		let element = association_element();
		let mut signed = sample_assertion();

		element.prepare_outgoing(&mut signed).expect("Signing should succeed.");

		let cases: [fn(&mut Message); 5] = [
			|m| {
				m.set("claimed_id", "https://mallory.example.com/");
			},
			|m| {
				m.set("extra", "injected");
			},
			|m| {
				m.remove("identity");
			},
			|m| {
				m.remove(field::SIG);
			},
			|m| {
				m.set(field::ASSOC_HANDLE, "unknown");
			},
		];

		for tamper in cases {
			let mut message = signed.clone();

			tamper(&mut message);

			let err = element.process_incoming(&mut message).expect_err("Tampering must fail.");

			assert_eq!(err.rejection(), Some(&Rejection::InvalidSignature));
		}
	}

	#[test]
	fn unsigned_messages_pass_only_when_nothing_depends_on_a_signature() {
		let element = association_element();
		let mut cancel = Message::new(MessageMode::NegativeAssertion, ProtocolVersion::V2);

		assert_eq!(
			element.process_incoming(&mut cancel).expect("Nothing to verify."),
			Disposition::NotApplicable
		);

		let unsigned: [Message; 3] = [
			sample_assertion(),
			Message::new(MessageMode::NegativeAssertion, ProtocolVersion::V2)
				.with_field(field::RESPONSE_NONCE, "2025-11-10T12:00:00ZAbCdEfGh"),
			Message::new(MessageMode::Unknown, ProtocolVersion::V2)
				.with_field(field::ISSUED, "2025-11-10T12:00:00Z"),
		];

		for mut message in unsigned {
			let err = element
				.process_incoming(&mut message)
				.expect_err("Unsigned content that needs a signature must be refused.");

			assert_eq!(err.rejection(), Some(&Rejection::InvalidSignature));
		}
	}

	#[test]
	fn consumer_keys_combine_consumer_and_token_secrets() {
		let (store, consumer) = build_test_token_store("consumer-1", "consumer-secret");
		let request = RequestToken::new("request-1").expect("Token fixture should be valid.");

		store
			.store_new_request_token(
				&consumer,
				&request,
				&TokenSecret::new("token-secret"),
				TokenParameters::default(),
			)
			.expect("Storing the request token should succeed.");

		let keys = ConsumerKeys::new(Arc::new(store));
		let mut message = sample_assertion()
			.with_field(field::CONSUMER_KEY, consumer.to_string())
			.with_field(field::TOKEN, request.to_string());

		assert_eq!(
			keys.signing_key(&mut message).expect("Key should resolve."),
			b"consumer-secret&token-secret".to_vec()
		);

		message.set(field::TOKEN, "unknown");

		assert!(matches!(
			keys.verification_key(&message).map_err(|e| e.rejection().cloned()),
			Err(Some(Rejection::InvalidToken { .. }))
		));

		message.set(field::CONSUMER_KEY, "stranger");

		assert_eq!(
			keys.verification_key(&message).expect_err("Unknown consumers must be refused.").rejection(),
			Some(&Rejection::InvalidSignature)
		);
	}
}

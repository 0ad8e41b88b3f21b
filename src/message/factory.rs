//! Conversion of wire fields into typed messages.

// self
use crate::{
	_prelude::*,
	message::{Message, WireMessage},
};

/// Builds typed messages from raw wire fields.
pub trait MessageFactory
where
	Self: Debug + Send + Sync,
{
	/// Creates a message from the received fields, rejecting structurally unusable input.
	fn create(&self, wire: WireMessage) -> Result<Message, Rejection>;
}

/// Default factory: validates field syntax and keeps interpretation lazy.
///
/// Mode and version are derived from the fields on demand so that tampered mode or namespace
/// values are caught by signature verification rather than rejected here. Messages whose mode
/// is still unrecognized after verification are refused by the channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardMessageFactory;
impl MessageFactory for StandardMessageFactory {
	fn create(&self, wire: WireMessage) -> Result<Message, Rejection> {
		validate_fields(wire.fields())?;

		Ok(Message::from_fields(wire.into_fields()))
	}
}

/// Ensures every field survives the canonical `key:value\n` signing form unambiguously.
///
/// Receiving channels run this while parsing, before any signature is checked. An empty field
/// name, a name holding `:`, `,`, or a newline, or a value holding a newline is therefore
/// reported as [`Rejection::Malformed`] even when tampering with a signed message introduced it;
/// every other alteration of a signed message surfaces as [`Rejection::InvalidSignature`].
pub fn validate_fields(fields: &BTreeMap<String, String>) -> Result<(), Rejection> {
	for (key, value) in fields {
		if key.is_empty() {
			return Err(Rejection::malformed("field names cannot be empty"));
		}
		if key.contains([':', ',', '\n']) {
			return Err(Rejection::malformed(format!(
				"field name `{key}` contains a reserved character"
			)));
		}
		if value.contains('\n') {
			return Err(Rejection::malformed(format!("field `{key}` contains a line break")));
		}
	}

	Ok(())
}

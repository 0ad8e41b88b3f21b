//! Typed protocol messages, their wire form, the message factory, and extension payloads.

pub mod extension;
pub mod factory;
pub mod wire;

pub use extension::*;
pub use factory::*;
pub use wire::*;

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{_prelude::*, binding::Protections};

/// Well-known field names shared by the binding elements.
pub mod field {
	/// Protocol version marker; absent on legacy (1.x) messages.
	pub const NS: &str = "ns";
	/// Message mode selecting the message type.
	pub const MODE: &str = "mode";
	/// Address the peer returns the user agent to.
	pub const RETURN_TO: &str = "return_to";
	/// Realm requesting authentication (2.0 name).
	pub const REALM: &str = "realm";
	/// Realm requesting authentication (1.x name).
	pub const TRUST_ROOT: &str = "trust_root";
	/// Consumer key used by consumer-secret signing.
	pub const CONSUMER_KEY: &str = "consumer_key";
	/// Token whose secret joins the consumer secret in consumer-secret signing.
	pub const TOKEN: &str = "token";
	/// Handle of the association key that signed the message.
	pub const ASSOC_HANDLE: &str = "assoc_handle";
	/// Comma-separated list of signed field names.
	pub const SIGNED: &str = "signed";
	/// Base64 HMAC-SHA256 signature.
	pub const SIG: &str = "sig";
	/// Replay-protection nonce stamped by the sender.
	pub const RESPONSE_NONCE: &str = "response_nonce";
	/// Issue instant checked by the expiration element.
	pub const ISSUED: &str = "issued";
	/// Nonce this party stamped into its own request.
	pub const CONTEXT_NONCE: &str = "rp_nonce";
	/// Handle of the key that signed the context fields.
	pub const CONTEXT_HANDLE: &str = "rp_handle";
	/// Signature over the context fields.
	pub const CONTEXT_SIG: &str = "rp_sig";
	/// Prefix of extension namespace declarations (`ns.<alias>`).
	pub const EXTENSION_NS_PREFIX: &str = "ns.";
}

/// Namespace value marking a 2.0 message.
pub const V2_NAMESPACE: &str = "http://specs.openid.net/auth/2.0";

/// Protocol revision a message was written for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
	/// Legacy 1.x messages (no `ns` marker).
	#[serde(rename = "1.x")]
	V1,
	/// 2.0 messages.
	#[serde(rename = "2.0")]
	V2,
}
impl Display for ProtocolVersion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(match self {
			Self::V1 => "1.x",
			Self::V2 => "2.0",
		})
	}
}

/// Message type selected by the `mode` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageMode {
	/// Indirect authentication request sent by this party.
	AuthenticationRequest,
	/// Positive assertion returned by the peer.
	PositiveAssertion,
	/// Negative assertion (user cancelled).
	NegativeAssertion,
	/// Missing or unrecognized mode.
	Unknown,
}
impl MessageMode {
	/// Returns the wire value for the mode.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AuthenticationRequest => "checkid_setup",
			Self::PositiveAssertion => "id_res",
			Self::NegativeAssertion => "cancel",
			Self::Unknown => "unknown",
		}
	}

	/// Parses a wire value, mapping anything unrecognized to [`MessageMode::Unknown`].
	pub fn parse(value: Option<&str>) -> Self {
		match value {
			Some("checkid_setup") => Self::AuthenticationRequest,
			Some("id_res") => Self::PositiveAssertion,
			Some("cancel") => Self::NegativeAssertion,
			_ => Self::Unknown,
		}
	}

	/// Protections a verifying channel must have applied before surfacing this message.
	///
	/// Only the subset the channel is able to provide is enforced, so replay protection is
	/// required only when a nonce store was configured.
	pub const fn required_protections(self) -> Protections {
		match self {
			Self::PositiveAssertion => Protections::ALL,
			_ => Protections::NONE,
		}
	}
}
impl Display for MessageMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Typed protocol message flowing through a [`crate::channel::Channel`].
///
/// Equality compares fields and extensions only; the protections recorded by a receiving
/// channel are metadata about how the message was checked, not part of its content.
#[derive(Clone, Debug, Default)]
pub struct Message {
	fields: BTreeMap<String, String>,
	extensions: BTreeMap<String, Extension>,
	protections: Protections,
}
impl Message {
	/// Creates a message of the given mode and version.
	pub fn new(mode: MessageMode, version: ProtocolVersion) -> Self {
		let mut message = Self::default();

		message.set(field::MODE, mode.as_str());

		if version == ProtocolVersion::V2 {
			message.set(field::NS, V2_NAMESPACE);
		}

		message
	}

	/// Wraps raw fields without interpretation.
	pub fn from_fields(fields: BTreeMap<String, String>) -> Self {
		Self { fields, ..Default::default() }
	}

	/// Builder-style [`Message::set`].
	pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.set(key, value);

		self
	}

	/// Builder-style [`Message::add_extension`].
	pub fn with_extension(mut self, extension: Extension) -> Self {
		self.add_extension(extension);

		self
	}

	/// Mode derived from the `mode` field.
	pub fn mode(&self) -> MessageMode {
		MessageMode::parse(self.field(field::MODE))
	}

	/// Version derived from the presence of the 2.0 namespace marker.
	pub fn version(&self) -> ProtocolVersion {
		match self.field(field::NS) {
			Some(V2_NAMESPACE) => ProtocolVersion::V2,
			_ => ProtocolVersion::V1,
		}
	}

	/// Looks up a field value.
	pub fn field(&self, key: &str) -> Option<&str> {
		self.fields.get(key).map(String::as_str)
	}

	/// Returns `true` if the field is present.
	pub fn has_field(&self, key: &str) -> bool {
		self.fields.contains_key(key)
	}

	/// Inserts or replaces a field, returning the previous value.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
		self.fields.insert(key.into(), value.into())
	}

	/// Removes a field, returning its value.
	pub fn remove(&mut self, key: &str) -> Option<String> {
		self.fields.remove(key)
	}

	/// All fields in key order.
	pub fn fields(&self) -> &BTreeMap<String, String> {
		&self.fields
	}

	pub(crate) fn fields_mut(&mut self) -> &mut BTreeMap<String, String> {
		&mut self.fields
	}

	/// Attaches an extension payload, replacing any payload with the same namespace.
	pub fn add_extension(&mut self, extension: Extension) -> Option<Extension> {
		self.extensions.insert(extension.type_uri.clone(), extension)
	}

	/// Looks up an extension payload by namespace.
	pub fn extension(&self, type_uri: &str) -> Option<&Extension> {
		self.extensions.get(type_uri)
	}

	/// Iterator over attached extension payloads in namespace order.
	pub fn extensions(&self) -> impl Iterator<Item = &Extension> {
		self.extensions.values()
	}

	pub(crate) fn take_extensions(&mut self) -> BTreeMap<String, Extension> {
		std::mem::take(&mut self.extensions)
	}

	/// Protections a receiving channel verified on this message.
	///
	/// Empty for outgoing messages and for anything read through a preview channel.
	pub fn protections(&self) -> Protections {
		self.protections
	}

	pub(crate) fn set_protections(&mut self, protections: Protections) {
		self.protections = protections;
	}

	/// Converts the message into its wire form. Extensions must already be encoded.
	pub fn into_wire(self) -> WireMessage {
		WireMessage::from(self.fields)
	}
}
impl PartialEq for Message {
	fn eq(&self, other: &Self) -> bool {
		self.fields == other.fields && self.extensions == other.extensions
	}
}
impl Eq for Message {}

/// Renders an instant the way timestamps travel on the wire.
pub(crate) fn format_instant(instant: OffsetDateTime) -> Result<String> {
	Ok(instant.format(&Rfc3339)?)
}

/// Parses a wire timestamp.
pub(crate) fn parse_instant(value: &str) -> Result<OffsetDateTime, Rejection> {
	OffsetDateTime::parse(value, &Rfc3339)
		.map_err(|e| Rejection::malformed(format!("timestamp `{value}` is invalid: {e}")))
}

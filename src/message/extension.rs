//! Extension payloads and the registry mapping namespaces to codecs.

// self
use crate::_prelude::*;

/// Extension payload attached to a message under a namespace identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
	/// Namespace identifier (type URI).
	pub type_uri: String,
	/// Extension fields without the alias prefix.
	pub fields: BTreeMap<String, String>,
}
impl Extension {
	/// Creates an empty payload for the namespace.
	pub fn new(type_uri: impl Into<String>) -> Self {
		Self { type_uri: type_uri.into(), fields: BTreeMap::new() }
	}

	/// Builder-style field insertion.
	pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.fields.insert(key.into(), value.into());

		self
	}
}

/// Encode/decode handler for one extension namespace.
pub trait ExtensionCodec
where
	Self: Debug + Send + Sync,
{
	/// Namespace identifier handled by the codec.
	fn type_uri(&self) -> &str;

	/// Alias preferred when declaring the namespace on the wire.
	fn preferred_alias(&self) -> &str;

	/// Serializes a payload into alias-relative fields.
	fn encode(&self, extension: &Extension) -> Result<BTreeMap<String, String>, Rejection>;

	/// Builds a payload from alias-relative fields.
	fn decode(&self, fields: BTreeMap<String, String>) -> Result<Extension, Rejection>;
}

/// Codec that copies fields verbatim, optionally enforcing required field names.
#[derive(Clone, Debug)]
pub struct PassthroughCodec {
	type_uri: String,
	alias: String,
	required: Vec<String>,
}
impl PassthroughCodec {
	/// Creates a codec for `type_uri` declared under `alias`.
	pub fn new(type_uri: impl Into<String>, alias: impl Into<String>) -> Self {
		Self { type_uri: type_uri.into(), alias: alias.into(), required: Vec::new() }
	}

	/// Requires `field` to be present when decoding.
	pub fn require(mut self, field: impl Into<String>) -> Self {
		self.required.push(field.into());

		self
	}
}
impl ExtensionCodec for PassthroughCodec {
	fn type_uri(&self) -> &str {
		&self.type_uri
	}

	fn preferred_alias(&self) -> &str {
		&self.alias
	}

	fn encode(&self, extension: &Extension) -> Result<BTreeMap<String, String>, Rejection> {
		Ok(extension.fields.clone())
	}

	fn decode(&self, fields: BTreeMap<String, String>) -> Result<Extension, Rejection> {
		if let Some(missing) = self.required.iter().find(|name| !fields.contains_key(*name)) {
			return Err(Rejection::malformed(format!(
				"extension `{}` is missing the `{missing}` field",
				self.type_uri
			)));
		}

		Ok(Extension { type_uri: self.type_uri.clone(), fields })
	}
}

/// Maps extension namespaces to their codecs.
#[derive(Clone, Debug, Default)]
pub struct ExtensionRegistry {
	codecs: BTreeMap<String, Arc<dyn ExtensionCodec>>,
}
impl ExtensionRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a codec; each namespace may be registered once.
	pub fn register(mut self, codec: impl 'static + ExtensionCodec) -> Result<Self, ConfigError> {
		let type_uri = codec.type_uri().to_owned();

		if self.codecs.contains_key(&type_uri) {
			return Err(ConfigError::DuplicateExtension { type_uri });
		}

		self.codecs.insert(type_uri, Arc::new(codec));

		Ok(self)
	}

	/// Looks up the codec for a namespace.
	pub fn get(&self, type_uri: &str) -> Option<&Arc<dyn ExtensionCodec>> {
		self.codecs.get(type_uri)
	}

	/// Number of registered namespaces.
	pub fn len(&self) -> usize {
		self.codecs.len()
	}

	/// Returns `true` if nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.codecs.is_empty()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const SREG: &str = "http://openid.net/extensions/sreg/1.1";

	#[test]
	fn registry_refuses_duplicate_namespaces() {
		let registry = ExtensionRegistry::new()
			.register(PassthroughCodec::new(SREG, "sreg"))
			.expect("First registration should succeed.");
		let err = registry
			.clone()
			.register(PassthroughCodec::new(SREG, "other"))
			.expect_err("Duplicate registration must fail.");

		assert_eq!(err, ConfigError::DuplicateExtension { type_uri: SREG.into() });
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn passthrough_enforces_required_fields() {
		let codec = PassthroughCodec::new(SREG, "sreg").require("nickname");
		let missing = codec.decode(BTreeMap::new()).expect_err("Missing field must be rejected.");

		assert!(matches!(missing, Rejection::Malformed { .. }));

		let decoded = codec
			.decode(BTreeMap::from([("nickname".to_string(), "alice".to_string())]))
			.expect("Complete payload should decode.");

		assert_eq!(decoded, Extension::new(SREG).with_field("nickname", "alice"));
	}
}

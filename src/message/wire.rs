//! Wire representation exchanged with the transport layer.

// self
use crate::_prelude::*;

/// Flat field map a channel emits on send and accepts on receive.
///
/// Encoding the map into a concrete transport form (query string, key-value form, POST body)
/// belongs to the transport layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireMessage(BTreeMap<String, String>);
impl WireMessage {
	/// Creates an empty wire message.
	pub fn new() -> Self {
		Self::default()
	}

	/// Looks up a field value.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str)
	}

	/// Inserts or replaces a field.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
		self.0.insert(key.into(), value.into())
	}

	/// Removes a field.
	pub fn remove(&mut self, key: &str) -> Option<String> {
		self.0.remove(key)
	}

	/// Number of fields.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` if there are no fields.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Borrows the fields.
	pub fn fields(&self) -> &BTreeMap<String, String> {
		&self.0
	}

	/// Mutably borrows the fields.
	pub fn fields_mut(&mut self) -> &mut BTreeMap<String, String> {
		&mut self.0
	}

	/// Consumes the wire message, returning its fields.
	pub fn into_fields(self) -> BTreeMap<String, String> {
		self.0
	}
}
impl From<BTreeMap<String, String>> for WireMessage {
	fn from(value: BTreeMap<String, String>) -> Self {
		Self(value)
	}
}
impl<K, V> FromIterator<(K, V)> for WireMessage
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

//! Application-defined parameters carried from a request token to its access token.

// std
use std::collections::btree_map::Iter;
// self
use crate::_prelude::*;

/// Errors emitted when validating token parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ParameterValidationError {
	/// Parameter names cannot be empty.
	#[error("Parameter names cannot be empty.")]
	EmptyName,
	/// Parameter names cannot contain whitespace characters.
	#[error("Parameter name contains whitespace: {name}.")]
	ContainsWhitespace {
		/// The offending parameter name.
		name: String,
	},
	/// Each parameter name may appear only once.
	#[error("Parameter `{name}` was supplied more than once.")]
	Duplicate {
		/// The repeated parameter name.
		name: String,
	},
}

/// Ordered mapping of unique parameter names to opaque values.
///
/// The mapping is the privilege scope of a token: the store copies it byte-for-byte from a
/// request token onto the access token that replaces it, so equality here is exact string
/// equality of every name and value.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct TokenParameters(BTreeMap<String, String>);
impl TokenParameters {
	/// Builds a parameter mapping, rejecting invalid or repeated names.
	pub fn new<I, K, V>(pairs: I) -> Result<Self, ParameterValidationError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let mut map = BTreeMap::new();

		for (name, value) in pairs {
			let name = name.into();

			validate_name(&name)?;

			if map.insert(name.clone(), value.into()).is_some() {
				return Err(ParameterValidationError::Duplicate { name });
			}
		}

		Ok(Self(map))
	}

	/// Number of parameters.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no parameters are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Looks up a parameter value by name.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}

	/// Iterator over `(name, value)` pairs in name order.
	pub fn iter(&self) -> Iter<'_, String, String> {
		self.0.iter()
	}

	/// Borrows the underlying map.
	pub fn as_map(&self) -> &BTreeMap<String, String> {
		&self.0
	}
}
impl Debug for TokenParameters {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenParameters").field(&self.0).finish()
	}
}
impl TryFrom<BTreeMap<String, String>> for TokenParameters {
	type Error = ParameterValidationError;

	fn try_from(value: BTreeMap<String, String>) -> Result<Self, Self::Error> {
		for name in value.keys() {
			validate_name(name)?;
		}

		Ok(Self(value))
	}
}
impl From<TokenParameters> for BTreeMap<String, String> {
	fn from(value: TokenParameters) -> Self {
		value.0
	}
}
impl<'a> IntoIterator for &'a TokenParameters {
	type IntoIter = Iter<'a, String, String>;
	type Item = (&'a String, &'a String);

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

fn validate_name(name: &str) -> Result<(), ParameterValidationError> {
	if name.is_empty() {
		return Err(ParameterValidationError::EmptyName);
	}
	if name.chars().any(char::is_whitespace) {
		return Err(ParameterValidationError::ContainsWhitespace { name: name.to_owned() });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parameters_reject_duplicates_and_bad_names() {
		let err = TokenParameters::new([("scope", "read"), ("scope", "write")])
			.expect_err("Repeated names must be rejected.");

		assert_eq!(err, ParameterValidationError::Duplicate { name: "scope".into() });
		assert!(TokenParameters::new([("", "x")]).is_err());
		assert!(TokenParameters::new([("has space", "x")]).is_err());
	}

	#[test]
	fn values_stay_opaque() {
		let params = TokenParameters::new([("scope", " read  write "), ("callback", "")])
			.expect("Values are opaque and should not be validated.");

		assert_eq!(params.get("scope"), Some(" read  write "));
		assert_eq!(params.get("callback"), Some(""));
		assert_eq!(params.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(), ["callback", "scope"]);
	}

	#[test]
	fn serde_enforces_validation() {
		let params: TokenParameters = serde_json::from_str(r#"{"scope":"read"}"#)
			.expect("Parameters should deserialize successfully.");

		assert_eq!(params.len(), 1);
		assert!(serde_json::from_str::<TokenParameters>(r#"{"bad name":"x"}"#).is_err());
	}
}

//! Strongly typed consumer and token identifiers.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
	($name:ident, $doc:literal, $kind:literal, generated) => {
		def_id! { $name, $doc, $kind }

		impl $name {
			/// Wraps a value minted by a [`crate::token::TokenGenerator`] implementation that only
			/// emits URL-safe characters.
			pub(crate) fn generated(value: String) -> Self {
				debug_assert!(validate_view($kind, &value).is_ok());

				Self(value)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 256;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (consumer, request token, access token).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (consumer, request token, access token).
		kind: &'static str,
	},
	/// The identifier contains a character reserved by the canonical signing form.
	#[error("{kind} identifier contains the reserved character {character:?}.")]
	ReservedCharacter {
		/// Kind of identifier (consumer, request token, access token).
		kind: &'static str,
		/// Offending character.
		character: char,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (consumer, request token, access token).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { ConsumerKey, "Key identifying a registered consumer (client application).", "Consumer" }
def_id! {
	RequestToken,
	"Unauthorized request token awaiting exchange for an access token.",
	"RequestToken",
	generated
}
def_id! {
	AccessToken,
	"Authorized access token minted by a request token exchange.",
	"AccessToken",
	generated
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if let Some(character) = view.chars().find(|c| matches!(c, ':' | ',')) {
		return Err(IdentifierError::ReservedCharacter { kind, character });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

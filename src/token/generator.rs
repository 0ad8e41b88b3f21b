//! Pluggable generation of unguessable token and secret strings.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ConsumerKey, RequestToken, TokenSecret},
};

const TOKEN_ENTROPY_BYTES: usize = 32;
const SECRET_ENTROPY_BYTES: usize = 32;

/// Algorithm hosts may inject to mint tokens and secrets.
///
/// Implementations must not persist anything; storage happens through
/// [`crate::store::TokenStore::store_new_request_token`] and
/// [`crate::store::TokenStore::expire_request_token_and_store_new_access_token`].
pub trait TokenGenerator
where
	Self: Debug + Send + Sync,
{
	/// Generates a token representing a not-yet-authorized request.
	fn generate_request_token(&self, consumer: &ConsumerKey) -> RequestToken;

	/// Generates a token representing an authorized grant.
	fn generate_access_token(&self, consumer: &ConsumerKey) -> AccessToken;

	/// Generates a cryptographically strong secret for a token.
	fn generate_secret(&self) -> TokenSecret;
}

/// Default generator drawing from the thread-local CSPRNG.
///
/// Values are URL-safe base64 (no padding) encodings of 32 random bytes. The RNG panics if the
/// operating system entropy source is unavailable, which is treated as fatal to the process.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomTokenGenerator;
impl TokenGenerator for RandomTokenGenerator {
	fn generate_request_token(&self, _consumer: &ConsumerKey) -> RequestToken {
		RequestToken::generated(random_url_safe(TOKEN_ENTROPY_BYTES))
	}

	fn generate_access_token(&self, _consumer: &ConsumerKey) -> AccessToken {
		AccessToken::generated(random_url_safe(TOKEN_ENTROPY_BYTES))
	}

	fn generate_secret(&self) -> TokenSecret {
		TokenSecret::new(random_url_safe(SECRET_ENTROPY_BYTES))
	}
}

fn random_url_safe(len: usize) -> String {
	let mut bytes = vec![0_u8; len];

	rand::rng().fill(bytes.as_mut_slice());

	URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn generated_values_are_fresh_and_valid() {
		let generator = RandomTokenGenerator;
		let consumer = ConsumerKey::new("consumer-1").expect("Consumer fixture should be valid.");
		let tokens = (0..64)
			.map(|_| generator.generate_request_token(&consumer).to_string())
			.collect::<HashSet<_>>();

		assert_eq!(tokens.len(), 64, "Every generated request token must be unique.");

		let access = generator.generate_access_token(&consumer);

		AccessToken::new(access.as_ref()).expect("Generated access tokens must pass validation.");
		assert!(!tokens.contains(access.as_ref()));
		assert_ne!(generator.generate_secret(), generator.generate_secret());
	}

	#[test]
	fn generated_values_have_expected_length() {
		let secret = RandomTokenGenerator.generate_secret();

		// 32 bytes encode to 43 unpadded base64 characters.
		assert_eq!(secret.expose().len(), 43);
	}
}

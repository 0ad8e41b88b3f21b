//! Token issuance facade pairing a [`TokenGenerator`] with a [`TokenStore`].

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ConsumerKey, RequestToken, TokenParameters, TokenSecret},
	store::TokenStore,
	token::{RandomTokenGenerator, TokenGenerator},
};

/// Token value together with the secret bound to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken<T> {
	/// Issued token.
	pub token: T,
	/// Secret the holder signs with alongside the consumer secret.
	pub secret: TokenSecret,
}

/// Mints request tokens and exchanges them for access tokens.
#[derive(Clone, Debug)]
pub struct TokenIssuer {
	store: Arc<dyn TokenStore>,
	generator: Arc<dyn TokenGenerator>,
}
impl TokenIssuer {
	/// Creates an issuer over a store, using [`RandomTokenGenerator`].
	pub fn new(store: Arc<dyn TokenStore>) -> Self {
		Self { store, generator: Arc::new(RandomTokenGenerator) }
	}

	/// Replaces the token generator.
	pub fn with_generator(mut self, generator: impl 'static + TokenGenerator) -> Self {
		self.generator = Arc::new(generator);

		self
	}

	/// Issues a request token for a registered consumer.
	///
	/// Fails with [`Error::NotFound`] for unknown consumers.
	pub fn issue_request_token(
		&self,
		consumer: &ConsumerKey,
		parameters: TokenParameters,
	) -> Result<IssuedToken<RequestToken>> {
		self.store.consumer_secret(consumer)?;

		let token = self.generator.generate_request_token(consumer);
		let secret = self.generator.generate_secret();

		self.store.store_new_request_token(consumer, &token, &secret, parameters)?;

		#[cfg(feature = "tracing")]
		tracing::debug!(consumer = %consumer, "issued request token");

		Ok(IssuedToken { token, secret })
	}

	/// Exchanges an authorized request token for an access token.
	///
	/// The request token is expired in the same step; a second exchange fails with
	/// [`Error::InvalidToken`].
	pub fn exchange_request_token(
		&self,
		consumer: &ConsumerKey,
		request_token: &RequestToken,
	) -> Result<IssuedToken<AccessToken>> {
		let token = self.generator.generate_access_token(consumer);
		let secret = self.generator.generate_secret();

		self.store.expire_request_token_and_store_new_access_token(
			consumer,
			request_token,
			&token,
			&secret,
		)?;

		#[cfg(feature = "tracing")]
		tracing::debug!(consumer = %consumer, "exchanged request token");

		Ok(IssuedToken { token, secret })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::build_test_token_store;

	#[derive(Debug)]
	struct SequentialGenerator(Mutex<u32>);
	impl SequentialGenerator {
		fn next(&self, prefix: &str) -> String {
			let mut counter = self.0.lock();

			*counter += 1;

			format!("{prefix}-{counter}")
		}
	}
	impl TokenGenerator for SequentialGenerator {
		fn generate_request_token(&self, _: &ConsumerKey) -> RequestToken {
			RequestToken::new(self.next("request")).expect("Generated token should be valid.")
		}

		fn generate_access_token(&self, _: &ConsumerKey) -> AccessToken {
			AccessToken::new(self.next("access")).expect("Generated token should be valid.")
		}

		fn generate_secret(&self) -> TokenSecret {
			TokenSecret::new(self.next("secret"))
		}
	}

	#[test]
	fn issuance_and_exchange_use_the_injected_generator() {
		let (store, consumer) = build_test_token_store("consumer-1", "consumer-secret");
		let store = Arc::new(store);
		let issuer =
			TokenIssuer::new(store.clone()).with_generator(SequentialGenerator(Mutex::new(0)));
		let parameters =
			TokenParameters::new([("scope", "photos")]).expect("Parameters fixture should be valid.");
		let request = issuer
			.issue_request_token(&consumer, parameters.clone())
			.expect("Registered consumers can request tokens.");

		assert_eq!(request.token.to_string(), "request-1");
		assert_eq!(request.secret.expose(), "secret-2");

		let access = issuer
			.exchange_request_token(&consumer, &request.token)
			.expect("First exchange should succeed.");

		assert_eq!(access.token.to_string(), "access-3");
		assert_eq!(store.token_parameters(&access.token).expect("Parameters move."), parameters);
		assert!(matches!(
			issuer.exchange_request_token(&consumer, &request.token),
			Err(Error::InvalidToken { .. })
		));
	}

	#[test]
	fn unknown_consumers_cannot_request_tokens() {
		let (store, _) = build_test_token_store("consumer-1", "consumer-secret");
		let issuer = TokenIssuer::new(Arc::new(store));
		let stranger = ConsumerKey::new("stranger").expect("Consumer fixture should be valid.");

		assert!(matches!(
			issuer.issue_request_token(&stranger, TokenParameters::default()),
			Err(Error::NotFound { .. })
		));
	}
}

//! Storage contracts (tokens, nonces, signing keys) and the bundled store implementations.

pub mod file;
pub mod memory;

pub use file::FileTokenStore;
pub use memory::{MemoryCryptoKeyStore, MemoryNonceStore, MemoryTokenStore};

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ConsumerKey, ConsumerSecret, CryptoKey, RequestToken, TokenParameters, TokenSecret},
};

/// Persistence contract OAuth hosts implement for consumers, tokens, and secrets.
pub trait TokenStore
where
	Self: Debug + Send + Sync,
{
	/// Looks up the secret registered for a consumer.
	///
	/// Fails with [`StoreError::NotFound`] if the consumer is not registered.
	fn consumer_secret(&self, consumer: &ConsumerKey) -> Result<ConsumerSecret, StoreError>;

	/// Looks up the secret bound to a request or access token.
	///
	/// Fails with [`StoreError::NotFound`] for unknown tokens and [`StoreError::Expired`] for
	/// consumed ones.
	fn token_secret(&self, token: &str) -> Result<TokenSecret, StoreError>;

	/// Looks up the parameters attached to a request or access token.
	fn token_parameters(&self, token: &str) -> Result<TokenParameters, StoreError>;

	/// Stores a freshly generated request token, its secret, and optional parameters.
	fn store_new_request_token(
		&self,
		consumer: &ConsumerKey,
		request_token: &RequestToken,
		request_token_secret: &TokenSecret,
		parameters: TokenParameters,
	) -> Result<(), StoreError>;

	/// Atomically expires a request token and stores the access token replacing it.
	///
	/// The request token's parameters move to the access token unchanged. Fails with
	/// [`StoreError::InvalidToken`] if the request token is unknown, belongs to another consumer,
	/// or was already expired; on failure nothing changes.
	fn expire_request_token_and_store_new_access_token(
		&self,
		consumer: &ConsumerKey,
		request_token: &RequestToken,
		access_token: &AccessToken,
		access_token_secret: &TokenSecret,
	) -> Result<(), StoreError>;
}

/// Replay-detection contract backing the nonce binding elements.
pub trait NonceStore
where
	Self: Debug + Send + Sync,
{
	/// Records `nonce` under `context` if it has not been seen inside the validity window.
	///
	/// Returns `false` for duplicates and for timestamps too old to be checked; the
	/// check-and-record must be atomic.
	fn record_if_new(
		&self,
		context: Option<&str>,
		nonce: &str,
		timestamp: OffsetDateTime,
	) -> Result<bool, StoreError>;
}

/// Keyed signing material, grouped into buckets and addressed by handle.
pub trait CryptoKeyStore
where
	Self: Debug + Send + Sync,
{
	/// Fetches the key stored under `bucket`/`handle`, if present.
	fn key(&self, bucket: &str, handle: &str) -> Result<Option<CryptoKey>, StoreError>;

	/// Lists every key in `bucket`, latest expiry first.
	fn keys(&self, bucket: &str) -> Result<Vec<(String, CryptoKey)>, StoreError>;

	/// Stores a new key; fails with [`StoreError::Conflict`] if the handle is taken.
	fn store_key(&self, bucket: &str, handle: &str, key: CryptoKey) -> Result<(), StoreError>;

	/// Removes a key if present.
	fn remove_key(&self, bucket: &str, handle: &str) -> Result<(), StoreError>;
}

/// Kind of record a store lookup targeted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreEntity {
	/// Registered consumer.
	Consumer,
	/// Request or access token.
	Token,
}
impl StoreEntity {
	/// Returns a stable label suitable for logs and errors.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Consumer => "Consumer",
			Self::Token => "Token",
		}
	}
}
impl Display for StoreEntity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// The consumer or token is unknown.
	#[error("{entity} `{key}` was not found.")]
	NotFound {
		/// Kind of record that was looked up.
		entity: StoreEntity,
		/// Lookup key.
		key: String,
	},
	/// The token was consumed or expired.
	#[error("Token `{token}` has expired.")]
	Expired {
		/// Token value.
		token: String,
	},
	/// Token exchange refused: mismatch, unknown, or already consumed request token.
	#[error("Token is invalid: {reason}.")]
	InvalidToken {
		/// Human-readable detail.
		reason: String,
	},
	/// A write would overwrite or reuse existing material.
	#[error("Store conflict: {message}.")]
	Conflict {
		/// Human-readable detail.
		message: String,
	},
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl StoreError {
	pub(crate) fn consumer_not_found(consumer: &str) -> Self {
		Self::NotFound { entity: StoreEntity::Consumer, key: consumer.to_owned() }
	}

	pub(crate) fn token_not_found(token: &str) -> Self {
		Self::NotFound { entity: StoreEntity::Token, key: token.to_owned() }
	}

	pub(crate) fn invalid_token(reason: impl Into<String>) -> Self {
		Self::InvalidToken { reason: reason.into() }
	}

	pub(crate) fn conflict(message: impl Into<String>) -> Self {
		Self::Conflict { message: message.into() }
	}
}

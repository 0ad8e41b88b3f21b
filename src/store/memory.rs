//! Thread-safe in-memory stores for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{
		AccessToken, ConsumerKey, ConsumerSecret, CryptoKey, RequestToken, TokenParameters,
		TokenSecret,
	},
	settings::SecuritySettings,
	store::{CryptoKeyStore, NonceStore, StoreError, TokenStore},
	token::{TokenKind, TokenRecord},
};

/// Consumers and token records shared by the memory and file token stores.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct TokenBook {
	consumers: HashMap<String, ConsumerSecret>,
	tokens: HashMap<String, TokenRecord>,
	#[serde(skip)]
	secrets: HashSet<TokenSecret>,
}
impl TokenBook {
	/// Rebuilds the secret index after deserialization.
	pub(crate) fn reindexed(mut self) -> Self {
		self.secrets = self.tokens.values().map(|record| record.secret.clone()).collect();

		self
	}

	pub(crate) fn register_consumer(
		&mut self,
		consumer: ConsumerKey,
		secret: ConsumerSecret,
	) -> Result<(), StoreError> {
		match self.consumers.get(consumer.as_ref()) {
			Some(existing) if existing == &secret => Ok(()),
			Some(_) => Err(StoreError::conflict(format!(
				"consumer `{consumer}` is already registered with a different secret"
			))),
			None => {
				self.consumers.insert(consumer.into(), secret);

				Ok(())
			},
		}
	}

	pub(crate) fn consumer_secret(&self, consumer: &str) -> Result<ConsumerSecret, StoreError> {
		self.consumers
			.get(consumer)
			.cloned()
			.ok_or_else(|| StoreError::consumer_not_found(consumer))
	}

	pub(crate) fn token_secret(&self, token: &str) -> Result<TokenSecret, StoreError> {
		self.active_record(token).map(|record| record.secret.clone())
	}

	pub(crate) fn token_parameters(&self, token: &str) -> Result<TokenParameters, StoreError> {
		self.active_record(token).map(|record| record.parameters.clone())
	}

	pub(crate) fn store_request(
		&mut self,
		consumer: &ConsumerKey,
		token: &RequestToken,
		secret: &TokenSecret,
		parameters: TokenParameters,
		now: OffsetDateTime,
	) -> Result<(), StoreError> {
		if !self.consumers.contains_key(consumer.as_ref()) {
			return Err(StoreError::consumer_not_found(consumer));
		}

		self.ensure_fresh(token, secret)?;

		let record =
			TokenRecord::new(consumer.clone(), TokenKind::Request, secret.clone(), parameters, now);

		self.insert(token, record);

		Ok(())
	}

	pub(crate) fn exchange(
		&mut self,
		consumer: &ConsumerKey,
		request_token: &RequestToken,
		access_token: &AccessToken,
		access_token_secret: &TokenSecret,
		now: OffsetDateTime,
	) -> Result<(), StoreError> {
		let parameters = match self.tokens.get(request_token.as_ref()) {
			None => return Err(StoreError::invalid_token("request token is unknown")),
			Some(record) if record.kind != TokenKind::Request =>
				return Err(StoreError::invalid_token("token is not a request token")),
			Some(record) if &record.consumer != consumer =>
				return Err(StoreError::invalid_token(format!(
					"request token does not belong to consumer `{consumer}`"
				))),
			Some(record) if record.is_expired() =>
				return Err(StoreError::invalid_token("request token was already exchanged")),
			Some(record) => record.parameters.clone(),
		};

		self.ensure_fresh(access_token, access_token_secret)?;

		if let Some(record) = self.tokens.get_mut(request_token.as_ref()) {
			record.expire(now);
		}

		let record = TokenRecord::new(
			consumer.clone(),
			TokenKind::Access,
			access_token_secret.clone(),
			parameters,
			now,
		);

		self.insert(access_token, record);

		Ok(())
	}

	fn active_record(&self, token: &str) -> Result<&TokenRecord, StoreError> {
		match self.tokens.get(token) {
			Some(record) if record.is_expired() =>
				Err(StoreError::Expired { token: token.to_owned() }),
			Some(record) => Ok(record),
			None => Err(StoreError::token_not_found(token)),
		}
	}

	fn ensure_fresh(&self, token: &str, secret: &TokenSecret) -> Result<(), StoreError> {
		if self.tokens.contains_key(token) {
			return Err(StoreError::conflict(format!("token `{token}` is already stored")));
		}
		if self.secrets.contains(secret) {
			return Err(StoreError::conflict("secret is already bound to another token"));
		}

		Ok(())
	}

	fn insert(&mut self, token: &str, record: TokenRecord) {
		self.secrets.insert(record.secret.clone());
		self.tokens.insert(token.to_owned(), record);
	}
}

/// Token store that keeps consumers and tokens in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore(Arc<RwLock<TokenBook>>);
impl MemoryTokenStore {
	/// Registers a consumer; re-registering with the same secret is a no-op.
	pub fn register_consumer(
		&self,
		consumer: ConsumerKey,
		secret: ConsumerSecret,
	) -> Result<(), StoreError> {
		self.0.write().register_consumer(consumer, secret)
	}
}
impl TokenStore for MemoryTokenStore {
	fn consumer_secret(&self, consumer: &ConsumerKey) -> Result<ConsumerSecret, StoreError> {
		self.0.read().consumer_secret(consumer)
	}

	fn token_secret(&self, token: &str) -> Result<TokenSecret, StoreError> {
		self.0.read().token_secret(token)
	}

	fn token_parameters(&self, token: &str) -> Result<TokenParameters, StoreError> {
		self.0.read().token_parameters(token)
	}

	fn store_new_request_token(
		&self,
		consumer: &ConsumerKey,
		request_token: &RequestToken,
		request_token_secret: &TokenSecret,
		parameters: TokenParameters,
	) -> Result<(), StoreError> {
		self.0.write().store_request(
			consumer,
			request_token,
			request_token_secret,
			parameters,
			OffsetDateTime::now_utc(),
		)
	}

	fn expire_request_token_and_store_new_access_token(
		&self,
		consumer: &ConsumerKey,
		request_token: &RequestToken,
		access_token: &AccessToken,
		access_token_secret: &TokenSecret,
	) -> Result<(), StoreError> {
		self.0.write().exchange(
			consumer,
			request_token,
			access_token,
			access_token_secret,
			OffsetDateTime::now_utc(),
		)
	}
}

type NonceKey = (Option<String>, String);

/// Nonce store that remembers nonces for a fixed validity window.
#[derive(Clone, Debug)]
pub struct MemoryNonceStore {
	window: Duration,
	seen: Arc<Mutex<HashMap<NonceKey, OffsetDateTime>>>,
}
impl MemoryNonceStore {
	/// Creates a store that remembers nonces for `window`.
	pub fn new(window: Duration) -> Self {
		Self { window, seen: Default::default() }
	}

	/// Creates a store whose window covers the message age plus clock skew allowed by `settings`.
	pub fn for_settings(settings: &SecuritySettings) -> Self {
		Self::new(settings.maximum_message_age() + settings.maximum_clock_skew())
	}

	/// Validity window applied to recorded nonces.
	pub fn window(&self) -> Duration {
		self.window
	}

	/// Number of nonces currently remembered.
	pub fn len(&self) -> usize {
		self.seen.lock().len()
	}

	/// Returns `true` if no nonces are remembered.
	pub fn is_empty(&self) -> bool {
		self.seen.lock().is_empty()
	}

	/// [`NonceStore::record_if_new`] evaluated against an explicit clock reading.
	pub fn record_if_new_at(
		&self,
		context: Option<&str>,
		nonce: &str,
		timestamp: OffsetDateTime,
		now: OffsetDateTime,
	) -> bool {
		let oldest = now - self.window;
		let mut seen = self.seen.lock();

		seen.retain(|_, recorded| *recorded >= oldest);

		if timestamp < oldest {
			return false;
		}

		let key = (context.map(str::to_owned), nonce.to_owned());

		if seen.contains_key(&key) {
			return false;
		}

		seen.insert(key, timestamp);

		true
	}
}
impl Default for MemoryNonceStore {
	fn default() -> Self {
		Self::for_settings(&SecuritySettings::default())
	}
}
impl NonceStore for MemoryNonceStore {
	fn record_if_new(
		&self,
		context: Option<&str>,
		nonce: &str,
		timestamp: OffsetDateTime,
	) -> Result<bool, StoreError> {
		Ok(self.record_if_new_at(context, nonce, timestamp, OffsetDateTime::now_utc()))
	}
}

type KeyBuckets = Arc<RwLock<HashMap<String, HashMap<String, CryptoKey>>>>;

/// Crypto key store that keeps signing keys in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryCryptoKeyStore(KeyBuckets);
impl CryptoKeyStore for MemoryCryptoKeyStore {
	fn key(&self, bucket: &str, handle: &str) -> Result<Option<CryptoKey>, StoreError> {
		Ok(self.0.read().get(bucket).and_then(|keys| keys.get(handle)).cloned())
	}

	fn keys(&self, bucket: &str) -> Result<Vec<(String, CryptoKey)>, StoreError> {
		let mut keys = self
			.0
			.read()
			.get(bucket)
			.map(|keys| keys.iter().map(|(h, k)| (h.clone(), k.clone())).collect::<Vec<_>>())
			.unwrap_or_default();

		keys.sort_by(|(_, a), (_, b)| b.expires_at.cmp(&a.expires_at));

		Ok(keys)
	}

	fn store_key(&self, bucket: &str, handle: &str, key: CryptoKey) -> Result<(), StoreError> {
		let mut buckets = self.0.write();
		let keys = buckets.entry(bucket.to_owned()).or_default();

		if keys.contains_key(handle) {
			return Err(StoreError::conflict(format!(
				"key handle `{handle}` already exists in bucket `{bucket}`"
			)));
		}

		keys.insert(handle.to_owned(), key);

		Ok(())
	}

	fn remove_key(&self, bucket: &str, handle: &str) -> Result<(), StoreError> {
		if let Some(keys) = self.0.write().get_mut(bucket) {
			keys.remove(handle);
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn nonce_store_rejects_duplicates_per_context() {
		let store = MemoryNonceStore::new(Duration::minutes(10));
		let now = macros::datetime!(2025-11-10 12:00 UTC);

		assert!(store.record_if_new_at(None, "n-1", now, now));
		assert!(!store.record_if_new_at(None, "n-1", now, now));
		assert!(store.record_if_new_at(Some("rp"), "n-1", now, now));
		assert!(!store.record_if_new_at(Some("rp"), "n-1", now, now));
	}

	#[test]
	fn nonce_store_refuses_and_prunes_stale_entries() {
		let store = MemoryNonceStore::new(Duration::minutes(10));
		let now = macros::datetime!(2025-11-10 12:00 UTC);

		assert!(!store.record_if_new_at(None, "old", now - Duration::minutes(11), now));
		assert!(store.record_if_new_at(None, "fresh", now, now));
		assert_eq!(store.len(), 1);

		let later = now + Duration::minutes(11);

		assert!(store.record_if_new_at(None, "other", later, later));
		assert_eq!(store.len(), 1, "Entries outside the window should be pruned.");
	}

	#[test]
	fn key_store_orders_by_expiry_and_refuses_overwrites() {
		let store = MemoryCryptoKeyStore::default();
		let base = macros::datetime!(2030-01-01 00:00 UTC);

		store
			.store_key("bucket", "older", CryptoKey::new(vec![1], base))
			.expect("Storing the first key should succeed.");
		store
			.store_key("bucket", "newer", CryptoKey::new(vec![2], base + Duration::days(1)))
			.expect("Storing the second key should succeed.");

		let handles = store
			.keys("bucket")
			.expect("Listing keys should succeed.")
			.into_iter()
			.map(|(handle, _)| handle)
			.collect::<Vec<_>>();

		assert_eq!(handles, ["newer", "older"]);
		assert!(matches!(
			store.store_key("bucket", "older", CryptoKey::new(vec![3], base)),
			Err(StoreError::Conflict { .. })
		));

		store.remove_key("bucket", "older").expect("Removing a key should succeed.");

		assert!(store.key("bucket", "older").expect("Lookup should succeed.").is_none());
		assert!(store.keys("missing").expect("Unknown buckets should list empty.").is_empty());
	}
}

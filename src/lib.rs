//! Ordered binding-element channels that sign, verify, and replay-protect OAuth/OpenID messages,
//! together with the token generation and token storage contracts those channels rely on.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod binding;
pub mod channel;
pub mod error;
pub mod issuer;
pub mod message;
pub mod obs;
pub mod settings;
pub mod store;
pub mod token;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ConsumerKey, ConsumerSecret},
		channel::{Channel, ChannelFactory},
		message::{Message, MessageMode, ProtocolVersion},
		settings::SecuritySettings,
		store::{CryptoKeyStore, MemoryCryptoKeyStore, MemoryNonceStore, MemoryTokenStore, NonceStore},
	};

	/// Collaborators backing a fully configured test channel.
	#[derive(Clone, Debug)]
	pub struct TestStores {
		/// Crypto key store shared by the signing elements.
		pub keys: Arc<MemoryCryptoKeyStore>,
		/// Nonce store shared by the replay-protection elements.
		pub nonces: Arc<MemoryNonceStore>,
	}

	/// Builds a verifying channel with in-memory key and nonce stores.
	pub fn build_test_channel(settings: SecuritySettings) -> (Channel, TestStores) {
		let keys = Arc::new(MemoryCryptoKeyStore::default());
		let nonces = Arc::new(MemoryNonceStore::for_settings(&settings));
		let key_store: Arc<dyn CryptoKeyStore> = keys.clone();
		let nonce_store: Arc<dyn NonceStore> = nonces.clone();
		let channel = ChannelFactory::default()
			.verifying(Some(key_store), Some(nonce_store), settings)
			.expect("Failed to build verifying test channel.");

		(channel, TestStores { keys, nonces })
	}

	/// Builds a memory token store with a single registered consumer.
	pub fn build_test_token_store(consumer: &str, secret: &str) -> (MemoryTokenStore, ConsumerKey) {
		let store = MemoryTokenStore::default();
		let consumer = ConsumerKey::new(consumer).expect("Consumer fixture should be valid.");

		store
			.register_consumer(consumer.clone(), ConsumerSecret::new(secret))
			.expect("Registering the consumer fixture should succeed.");

		(store, consumer)
	}

	/// Positive assertion fixture carrying a handful of payload fields.
	pub fn sample_assertion() -> Message {
		Message::new(MessageMode::PositiveAssertion, ProtocolVersion::V2)
			.with_field("claimed_id", "https://alice.example.com/")
			.with_field("identity", "https://alice.example.com/")
			.with_field("return_to", "https://rp.example.com/return")
	}

	/// Authentication request fixture.
	pub fn sample_request() -> Message {
		Message::new(MessageMode::AuthenticationRequest, ProtocolVersion::V2)
			.with_field("claimed_id", "https://alice.example.com/")
			.with_field("realm", "https://rp.example.com/")
			.with_field("return_to", "https://rp.example.com/return")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{ConfigError, Error, Rejection, Result};
}

#[cfg(test)] use color_eyre as _;

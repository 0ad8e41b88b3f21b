//! Symmetric signing key material held by a [`crate::store::CryptoKeyStore`].

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

const KEY_LEN: usize = 32;

/// Secret key bytes plus the instant after which they must no longer sign or verify.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoKey {
	material: Vec<u8>,
	/// Expiry instant; the key is unusable at or after this point.
	pub expires_at: OffsetDateTime,
}
impl CryptoKey {
	/// Wraps existing key material.
	pub fn new(material: impl Into<Vec<u8>>, expires_at: OffsetDateTime) -> Self {
		Self { material: material.into(), expires_at }
	}

	/// Mints fresh random key material valid until `expires_at`.
	pub fn generate(expires_at: OffsetDateTime) -> Self {
		let mut material = vec![0_u8; KEY_LEN];

		rand::rng().fill(material.as_mut_slice());

		Self { material, expires_at }
	}

	/// Returns the raw key bytes. Callers must avoid logging them.
	pub fn material(&self) -> &[u8] {
		&self.material
	}

	/// Returns `true` if the key can no longer be used at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}
impl Debug for CryptoKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CryptoKey")
			.field("material", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn generated_keys_are_distinct_and_redacted() {
		let expires = macros::datetime!(2030-01-01 00:00 UTC);
		let a = CryptoKey::generate(expires);
		let b = CryptoKey::generate(expires);

		assert_eq!(a.material().len(), KEY_LEN);
		assert_ne!(a.material(), b.material());
		assert!(!format!("{a:?}").contains(&format!("{:?}", a.material())));
	}

	#[test]
	fn expiry_is_exclusive() {
		let expires = macros::datetime!(2030-01-01 00:00 UTC);
		let key = CryptoKey::new(vec![1, 2, 3], expires);

		assert!(!key.is_expired_at(expires - Duration::SECOND));
		assert!(key.is_expired_at(expires));
	}
}

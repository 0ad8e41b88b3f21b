//! Immutable security settings consumed by the channel factory and binding elements.

// self
use crate::{_prelude::*, message::ProtocolVersion};

/// Toggles and windows that decide which elements a channel carries and how they behave.
///
/// Settings are immutable once built; derive a new value through [`SecuritySettings::builder`]
/// or [`SecuritySettings::to_builder`] instead of mutating a shared instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SecuritySettingsBuilder")]
pub struct SecuritySettings {
	reject_unsolicited_assertions: bool,
	require_ssl: bool,
	minimum_version: ProtocolVersion,
	maximum_message_age: Duration,
	maximum_clock_skew: Duration,
	signing_key_lifetime: Duration,
}
impl SecuritySettings {
	/// Default lifetime of a message before the expiration element refuses it.
	pub const DEFAULT_MAXIMUM_MESSAGE_AGE: Duration = Duration::minutes(13);
	/// Default tolerance for clock differences between the parties.
	pub const DEFAULT_MAXIMUM_CLOCK_SKEW: Duration = Duration::minutes(10);
	/// Default lifetime of keys minted by the signing elements.
	pub const DEFAULT_SIGNING_KEY_LIFETIME: Duration = Duration::days(14);

	/// Returns a builder seeded with the defaults.
	pub fn builder() -> SecuritySettingsBuilder {
		SecuritySettingsBuilder::default()
	}

	/// Returns a builder seeded with these settings.
	pub fn to_builder(&self) -> SecuritySettingsBuilder {
		SecuritySettingsBuilder {
			reject_unsolicited_assertions: self.reject_unsolicited_assertions,
			require_ssl: self.require_ssl,
			minimum_version: self.minimum_version,
			maximum_message_age: self.maximum_message_age,
			maximum_clock_skew: self.maximum_clock_skew,
			signing_key_lifetime: self.signing_key_lifetime,
		}
	}

	/// Whether assertions without a matching request nonce are refused.
	pub fn reject_unsolicited_assertions(&self) -> bool {
		self.reject_unsolicited_assertions
	}

	/// Whether return addresses and realms must use `https`.
	pub fn require_ssl(&self) -> bool {
		self.require_ssl
	}

	/// Oldest protocol version accepted in either direction.
	pub fn minimum_version(&self) -> ProtocolVersion {
		self.minimum_version
	}

	/// Maximum age of a message before it is considered expired.
	pub fn maximum_message_age(&self) -> Duration {
		self.maximum_message_age
	}

	/// Tolerated clock difference between the parties.
	pub fn maximum_clock_skew(&self) -> Duration {
		self.maximum_clock_skew
	}

	/// Lifetime of signing keys minted on demand.
	pub fn signing_key_lifetime(&self) -> Duration {
		self.signing_key_lifetime
	}
}
impl Default for SecuritySettings {
	fn default() -> Self {
		Self {
			reject_unsolicited_assertions: false,
			require_ssl: false,
			minimum_version: ProtocolVersion::V1,
			maximum_message_age: Self::DEFAULT_MAXIMUM_MESSAGE_AGE,
			maximum_clock_skew: Self::DEFAULT_MAXIMUM_CLOCK_SKEW,
			signing_key_lifetime: Self::DEFAULT_SIGNING_KEY_LIFETIME,
		}
	}
}
impl TryFrom<SecuritySettingsBuilder> for SecuritySettings {
	type Error = ConfigError;

	fn try_from(value: SecuritySettingsBuilder) -> Result<Self, Self::Error> {
		value.build()
	}
}

/// Builder for [`SecuritySettings`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettingsBuilder {
	reject_unsolicited_assertions: bool,
	require_ssl: bool,
	minimum_version: ProtocolVersion,
	maximum_message_age: Duration,
	maximum_clock_skew: Duration,
	signing_key_lifetime: Duration,
}
impl SecuritySettingsBuilder {
	/// Refuses assertions that do not answer a request this party sent.
	pub fn reject_unsolicited_assertions(mut self, enabled: bool) -> Self {
		self.reject_unsolicited_assertions = enabled;

		self
	}

	/// Requires `https` return addresses and realms.
	pub fn require_ssl(mut self, enabled: bool) -> Self {
		self.require_ssl = enabled;

		self
	}

	/// Sets the oldest protocol version accepted.
	pub fn minimum_version(mut self, version: ProtocolVersion) -> Self {
		self.minimum_version = version;

		self
	}

	/// Sets the maximum message age.
	pub fn maximum_message_age(mut self, age: Duration) -> Self {
		self.maximum_message_age = age;

		self
	}

	/// Sets the tolerated clock skew.
	pub fn maximum_clock_skew(mut self, skew: Duration) -> Self {
		self.maximum_clock_skew = skew;

		self
	}

	/// Sets the lifetime of signing keys minted on demand.
	pub fn signing_key_lifetime(mut self, lifetime: Duration) -> Self {
		self.signing_key_lifetime = lifetime;

		self
	}

	/// Validates the configured windows and produces immutable settings.
	pub fn build(self) -> Result<SecuritySettings, ConfigError> {
		if !self.maximum_message_age.is_positive() {
			return Err(ConfigError::InvalidSettings {
				reason: "maximum message age must be positive".into(),
			});
		}
		if self.maximum_clock_skew.is_negative() {
			return Err(ConfigError::InvalidSettings {
				reason: "maximum clock skew cannot be negative".into(),
			});
		}
		if self.signing_key_lifetime <= self.maximum_message_age {
			return Err(ConfigError::InvalidSettings {
				reason: "signing keys must outlive the maximum message age".into(),
			});
		}

		Ok(SecuritySettings {
			reject_unsolicited_assertions: self.reject_unsolicited_assertions,
			require_ssl: self.require_ssl,
			minimum_version: self.minimum_version,
			maximum_message_age: self.maximum_message_age,
			maximum_clock_skew: self.maximum_clock_skew,
			signing_key_lifetime: self.signing_key_lifetime,
		})
	}
}
impl Default for SecuritySettingsBuilder {
	fn default() -> Self {
		SecuritySettings::default().to_builder()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_validates_windows() {
		let err = SecuritySettings::builder()
			.maximum_message_age(Duration::ZERO)
			.build()
			.expect_err("A zero message age must be rejected.");

		assert!(matches!(err, ConfigError::InvalidSettings { .. }));
		assert!(
			SecuritySettings::builder().maximum_clock_skew(Duration::seconds(-1)).build().is_err()
		);
		assert!(
			SecuritySettings::builder().signing_key_lifetime(Duration::minutes(1)).build().is_err()
		);
	}

	#[test]
	fn builder_round_trips_existing_settings() {
		let settings = SecuritySettings::builder()
			.reject_unsolicited_assertions(true)
			.minimum_version(ProtocolVersion::V2)
			.build()
			.expect("Settings fixture should build.");

		assert_eq!(settings.to_builder().build().expect("Rebuild should succeed."), settings);
		assert!(settings.reject_unsolicited_assertions());
		assert_eq!(settings.minimum_version(), ProtocolVersion::V2);
	}

	#[test]
	fn deserialization_fills_defaults_and_validates() {
		let settings: SecuritySettings =
			serde_json::from_str(r#"{"require_ssl":true,"minimum_version":"2.0"}"#)
				.expect("Partial settings should deserialize with defaults.");

		assert!(settings.require_ssl());
		assert_eq!(settings.maximum_message_age(), SecuritySettings::DEFAULT_MAXIMUM_MESSAGE_AGE);

		let payload = serde_json::to_string(&settings).expect("Settings should serialize.");
		let round_trip: SecuritySettings =
			serde_json::from_str(&payload).expect("Serialized settings should deserialize.");

		assert_eq!(round_trip, settings);

		let invalid =
			serde_json::to_string(&SecuritySettings::builder().maximum_message_age(Duration::ZERO))
				.expect("Builders should serialize.");

		assert!(serde_json::from_str::<SecuritySettings>(&invalid).is_err());
	}
}

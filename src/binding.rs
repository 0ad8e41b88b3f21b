//! Binding elements: the ordered stages a [`crate::channel::Channel`] runs over every message.
//!
//! Outgoing messages visit elements in registration order; incoming messages visit them in
//! reverse, so the element registered last (signing) is the outermost layer on the wire.

pub mod compat;
pub mod context;
pub mod expiration;
pub mod extensions;
pub mod options;
pub mod replay;
pub mod signing;
pub mod skip;

pub use compat::*;
pub use context::*;
pub use expiration::*;
pub use extensions::*;
pub use options::*;
pub use replay::*;
pub use signing::*;
pub use skip::*;

// std
use std::ops::{BitAnd, BitOr, BitOrAssign};
// crates.io
use hmac::{Hmac, Mac};
use rand::{Rng, distr::Alphanumeric};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	auth::CryptoKey,
	message::{self, Message},
	store::CryptoKeyStore,
};

const NONCE_SUFFIX_LEN: usize = 8;
const KEY_HANDLE_LEN: usize = 16;

/// Set of protections a binding element provides or a message received.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Protections(u8);
impl Protections {
	/// No protection.
	pub const NONE: Self = Self(0);
	/// Tampering is detected by a signature.
	pub const TAMPER: Self = Self(1);
	/// Stale messages are refused.
	pub const EXPIRATION: Self = Self(1 << 1);
	/// Duplicate messages are refused.
	pub const REPLAY: Self = Self(1 << 2);
	/// Every protection.
	pub const ALL: Self = Self(Self::TAMPER.0 | Self::EXPIRATION.0 | Self::REPLAY.0);

	const NAMED: [(Self, &'static str); 3] =
		[(Self::REPLAY, "replay"), (Self::EXPIRATION, "expiration"), (Self::TAMPER, "tamper")];

	/// Returns `true` if every protection in `other` is present.
	pub const fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}

	/// Returns `true` if no protection is present.
	pub const fn is_empty(self) -> bool {
		self.0 == 0
	}

	/// Protections present in `self` but not in `other`.
	pub const fn difference(self, other: Self) -> Self {
		Self(self.0 & !other.0)
	}

	/// Iterates over the individual protections, innermost first.
	pub fn iter(self) -> impl Iterator<Item = Self> {
		Self::NAMED.into_iter().map(|(flag, _)| flag).filter(move |flag| self.contains(*flag))
	}

	/// Layer index of a single protection: replay is innermost, tamper outermost.
	pub(crate) fn layer(self) -> usize {
		Self::NAMED.iter().position(|(flag, _)| *flag == self).unwrap_or(Self::NAMED.len())
	}
}
impl BitOr for Protections {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self::Output {
		Self(self.0 | rhs.0)
	}
}
impl BitOrAssign for Protections {
	fn bitor_assign(&mut self, rhs: Self) {
		self.0 |= rhs.0;
	}
}
impl BitAnd for Protections {
	type Output = Self;

	fn bitand(self, rhs: Self) -> Self::Output {
		Self(self.0 & rhs.0)
	}
}
impl Display for Protections {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		if self.is_empty() {
			return f.write_str("none");
		}

		let names = Self::NAMED
			.iter()
			.filter(|(flag, _)| self.contains(*flag))
			.map(|(_, name)| *name)
			.collect::<Vec<_>>();

		f.write_str(&names.join("+"))
	}
}
impl Debug for Protections {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Protections({self})")
	}
}

/// Result of running an element over a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Disposition {
	/// The element changed or checked the message.
	Applied,
	/// The message did not concern the element.
	NotApplicable,
}
impl Disposition {
	/// Returns a stable label suitable for span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Applied => "applied",
			Self::NotApplicable => "not_applicable",
		}
	}
}

/// What an element contributes to a channel; used when validating element lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementRole {
	/// Reshapes messages without making trust decisions.
	Transform,
	/// Makes trust decisions (signatures, nonces, timestamps).
	Security,
	/// Stands in for every security element in preview channels.
	SkipSecurity,
}

/// One stage of a channel.
///
/// A rejection is returned as `Err(Error::Rejected(..))`; the channel stops at the first error
/// in either direction.
pub trait BindingElement
where
	Self: Debug + Send + Sync,
{
	/// Stable element name used in logs and configuration errors.
	fn name(&self) -> &'static str;

	/// Role of the element in the channel.
	fn role(&self) -> ElementRole;

	/// Protection the element provides once it applies to an incoming message.
	fn protection(&self) -> Protections {
		Protections::NONE
	}

	/// Transforms a message about to be sent.
	fn prepare_outgoing(&self, message: &mut Message) -> Result<Disposition>;

	/// Verifies and transforms a received message.
	fn process_incoming(&self, message: &mut Message) -> Result<Disposition>;
}

/// Mints a nonce whose leading characters encode the issue instant at second precision.
pub(crate) fn mint_nonce(now: OffsetDateTime) -> Result<String> {
	let truncated =
		now.to_offset(time::UtcOffset::UTC) - Duration::nanoseconds(now.nanosecond().into());

	Ok(format!("{}{}", message::format_instant(truncated)?, random_alphanumeric(NONCE_SUFFIX_LEN)))
}

/// Recovers the issue instant from a nonce minted by [`mint_nonce`].
pub(crate) fn nonce_instant(nonce: &str) -> Result<OffsetDateTime, Rejection> {
	let end = nonce
		.find('Z')
		.ok_or_else(|| Rejection::malformed(format!("nonce `{nonce}` carries no timestamp")))?;

	message::parse_instant(&nonce[..=end])
}

pub(crate) fn random_alphanumeric(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

/// Renders the canonical `key:value\n` form covered by a signature.
pub(crate) fn canonical_form<'a, I>(fields: I) -> String
where
	I: IntoIterator<Item = (&'a str, &'a str)>,
{
	fields.into_iter().fold(String::new(), |mut out, (key, value)| {
		out.push_str(key);
		out.push(':');
		out.push_str(value);
		out.push('\n');

		out
	})
}

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// Keys an HMAC-SHA256 over `content`; finish with `finalize` or `verify_slice`.
pub(crate) fn hmac_sha256(key: &[u8], content: &str) -> Result<HmacSha256> {
	let mut mac = HmacSha256::new_from_slice(key).map_err(|_| Rejection::InvalidSignature)?;

	mac.update(content.as_bytes());

	Ok(mac)
}

/// Rotating set of keys kept in one bucket of a [`CryptoKeyStore`].
///
/// Signing uses the live key that expires last, as long as it outlives `reserve`; otherwise a
/// fresh key valid for `lifetime` is minted and stored.
#[derive(Clone, Debug)]
pub(crate) struct KeyRing {
	store: Arc<dyn CryptoKeyStore>,
	bucket: &'static str,
	lifetime: Duration,
	reserve: Duration,
}
impl KeyRing {
	pub(crate) fn new(
		store: Arc<dyn CryptoKeyStore>,
		bucket: &'static str,
		lifetime: Duration,
		reserve: Duration,
	) -> Self {
		Self { store, bucket, lifetime, reserve }
	}

	pub(crate) fn current(&self, now: OffsetDateTime) -> Result<(String, CryptoKey)> {
		let usable = self
			.store
			.keys(self.bucket)
			.map_err(Error::Storage)?
			.into_iter()
			.find(|(_, key)| !key.is_expired_at(now + self.reserve));

		if let Some(entry) = usable {
			return Ok(entry);
		}

		let handle = random_alphanumeric(KEY_HANDLE_LEN);
		let key = CryptoKey::generate(now + self.lifetime);

		self.store.store_key(self.bucket, &handle, key.clone()).map_err(Error::Storage)?;

		#[cfg(feature = "tracing")]
		tracing::debug!(bucket = self.bucket, handle = %handle, "minted signing key");

		Ok((handle, key))
	}

	pub(crate) fn find(&self, handle: &str, now: OffsetDateTime) -> Result<Option<CryptoKey>> {
		let key = self.store.key(self.bucket, handle).map_err(Error::Storage)?;

		Ok(key.filter(|key| !key.is_expired_at(now)))
	}
}

//! Channels that run messages through an ordered list of binding elements, plus the factory that
//! assembles those lists from the available collaborators.

// self
use crate::{
	_prelude::*,
	binding::{
		AssociationKeys, BackwardCompatibilityElement, BindingElement, ConsumerKeys,
		ContextNonceElement, ContextSignatureElement, Disposition, ElementRole, ExpirationElement,
		ExtensionsElement, Protections, ReplayProtectionElement, SecurityOptionsElement,
		SigningElement, SigningKeys, SkipSecurityElement,
	},
	message::{
		ExtensionRegistry, Message, MessageFactory, MessageMode, StandardMessageFactory,
		WireMessage, field, validate_fields,
	},
	obs::{self, Direction, MessageOutcome, MessageSpan},
	settings::SecuritySettings,
	store::{CryptoKeyStore, MemoryCryptoKeyStore, NonceStore, TokenStore},
};

/// Whether a channel verifies what it receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelMode {
	/// Security elements sign, stamp, and verify messages.
	Verifying,
	/// Messages are read without any verification; never trust what such a channel returns.
	Preview,
}

/// Immutable, ordered pipeline of binding elements.
///
/// Cheap to clone and safe to share across threads; all mutable state lives in the stores the
/// elements were built with.
#[derive(Clone, Debug)]
pub struct Channel {
	elements: Arc<[Arc<dyn BindingElement>]>,
	factory: Arc<dyn MessageFactory>,
	mode: ChannelMode,
	provided: Protections,
}
impl Channel {
	/// Validates an element list and freezes it into a channel.
	///
	/// The skip-security element cannot share a channel with security elements, each protection
	/// may be provided once, and protections must be registered replay first, then expiration,
	/// then tamper so that signing stays the outermost layer.
	pub fn new(
		factory: Arc<dyn MessageFactory>,
		elements: Vec<Arc<dyn BindingElement>>,
	) -> Result<Self, ConfigError> {
		let skip = elements.iter().any(|e| e.role() == ElementRole::SkipSecurity);
		let mut registered: Vec<(Protections, &'static str)> = Vec::new();
		let mut provided = Protections::NONE;

		for element in &elements {
			if skip && element.role() == ElementRole::Security {
				return Err(ConfigError::SkipSecurityNotExclusive { element: element.name() });
			}

			for protection in element.protection().iter() {
				if provided.contains(protection) {
					return Err(ConfigError::DuplicateProtection { protection });
				}
				if let Some((_, outer)) =
					registered.iter().find(|(earlier, _)| earlier.layer() > protection.layer())
				{
					return Err(ConfigError::ProtectionOutOfOrder {
						element: element.name(),
						outer: *outer,
					});
				}

				registered.push((protection, element.name()));
				provided |= protection;
			}
		}

		let mode = if skip { ChannelMode::Preview } else { ChannelMode::Verifying };

		Ok(Self { elements: elements.into(), factory, mode, provided })
	}

	/// Whether the channel verifies incoming messages.
	pub fn mode(&self) -> ChannelMode {
		self.mode
	}

	/// Protections the channel's elements can apply.
	pub fn protections(&self) -> Protections {
		self.provided
	}

	/// Element names in registration order.
	pub fn element_names(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.elements.iter().map(|e| e.name())
	}

	/// Runs a message through every element in registration order and returns its wire form.
	pub fn send(&self, message: Message) -> Result<WireMessage> {
		let _guard = MessageSpan::new(Direction::Outgoing, message.mode()).entered();

		obs::record_message_outcome(Direction::Outgoing, MessageOutcome::Attempt);

		let result = self.send_inner(message);

		obs::record_message_outcome(Direction::Outgoing, MessageOutcome::of(&result));

		result
	}

	/// Builds a message from wire fields and runs it through every element in reverse order.
	///
	/// The first refusal aborts processing; no partially verified message is ever returned.
	pub fn receive(&self, wire: WireMessage) -> Result<Message> {
		let mode = MessageMode::parse(wire.get(field::MODE));
		let _guard = MessageSpan::new(Direction::Incoming, mode).entered();

		obs::record_message_outcome(Direction::Incoming, MessageOutcome::Attempt);

		let result = self.receive_inner(wire);

		obs::record_message_outcome(Direction::Incoming, MessageOutcome::of(&result));

		result
	}

	fn send_inner(&self, mut message: Message) -> Result<WireMessage> {
		for element in self.elements.iter() {
			run(element.as_ref(), |e| e.prepare_outgoing(&mut message))?;
		}

		validate_fields(message.fields())?;

		Ok(message.into_wire())
	}

	fn receive_inner(&self, wire: WireMessage) -> Result<Message> {
		let mut message = self.factory.create(wire)?;
		let mut applied = Protections::NONE;

		for element in self.elements.iter().rev() {
			let disposition = run(element.as_ref(), |e| e.process_incoming(&mut message))?;

			if disposition == Disposition::Applied {
				applied |= element.protection();
			}
		}

		let mode = message.mode();

		if self.mode == ChannelMode::Verifying {
			let missing = (mode.required_protections() & self.provided).difference(applied);

			if missing.contains(Protections::TAMPER) {
				return Err(Rejection::InvalidSignature.into());
			}
			if !missing.is_empty() {
				return Err(Rejection::malformed(format!(
					"{mode} messages must carry {missing} protection"
				))
				.into());
			}
		}
		if mode == MessageMode::Unknown {
			return Err(Rejection::malformed("message mode is missing or unrecognized").into());
		}

		message.set_protections(applied);

		Ok(message)
	}
}

fn run<F>(element: &dyn BindingElement, f: F) -> Result<Disposition>
where
	F: FnOnce(&dyn BindingElement) -> Result<Disposition>,
{
	match f(element) {
		Ok(disposition) => {
			obs::trace_element(element.name(), disposition);

			Ok(disposition)
		},
		Err(e) => {
			obs::trace_refusal(element.name(), &e);

			Err(e)
		},
	}
}

/// Assembles channels from the collaborators a host has available.
///
/// Every channel starts with extensions, security options, and backward compatibility. A crypto
/// key store together with a nonce store adds the context nonce; a crypto key store adds the
/// context signature. Verifying channels then append replay protection (with a nonce store),
/// expiration, and signing.
#[derive(Clone, Debug)]
pub struct ChannelFactory {
	extensions: Arc<ExtensionRegistry>,
	message_factory: Arc<dyn MessageFactory>,
}
impl ChannelFactory {
	/// Creates a factory whose channels encode and decode the registered extensions.
	pub fn new(extensions: ExtensionRegistry) -> Self {
		Self { extensions: Arc::new(extensions), message_factory: Arc::new(StandardMessageFactory) }
	}

	/// Replaces the message factory used by receiving channels.
	pub fn with_message_factory(mut self, factory: impl 'static + MessageFactory) -> Self {
		self.message_factory = Arc::new(factory);

		self
	}

	/// Builds a channel that signs, stamps, and verifies messages.
	///
	/// Without a crypto key store the signing keys live in a private in-memory store, so only
	/// this channel (and its clones) can verify what it signs. Without a nonce store replays are
	/// not detected.
	pub fn verifying(
		&self,
		key_store: Option<Arc<dyn CryptoKeyStore>>,
		nonce_store: Option<Arc<dyn NonceStore>>,
		settings: SecuritySettings,
	) -> Result<Channel, ConfigError> {
		let signing_store: Arc<dyn CryptoKeyStore> = match &key_store {
			Some(store) => store.clone(),
			None => Arc::new(MemoryCryptoKeyStore::default()),
		};
		let keys = AssociationKeys::new(signing_store, &settings);

		self.build(key_store, nonce_store, settings, Some(Arc::new(keys)))
	}

	/// Builds a channel whose messages are signed with consumer and token secrets.
	pub fn consumer_signed(
		&self,
		token_store: Arc<dyn TokenStore>,
		nonce_store: Option<Arc<dyn NonceStore>>,
		settings: SecuritySettings,
	) -> Result<Channel, ConfigError> {
		self.build(None, nonce_store, settings, Some(Arc::new(ConsumerKeys::new(token_store))))
	}

	/// Builds a preview channel that performs no security checks at all.
	///
	/// Use it only to peek at a message before a verifying channel processes it.
	pub fn non_verifying(&self, settings: SecuritySettings) -> Result<Channel, ConfigError> {
		self.build(None, None, settings, None)
	}

	fn build(
		&self,
		key_store: Option<Arc<dyn CryptoKeyStore>>,
		nonce_store: Option<Arc<dyn NonceStore>>,
		settings: SecuritySettings,
		signing: Option<Arc<dyn SigningKeys>>,
	) -> Result<Channel, ConfigError> {
		let elements = self.binding_elements(key_store, nonce_store, settings, signing)?;

		Channel::new(self.message_factory.clone(), elements)
	}

	pub(crate) fn binding_elements(
		&self,
		key_store: Option<Arc<dyn CryptoKeyStore>>,
		nonce_store: Option<Arc<dyn NonceStore>>,
		settings: SecuritySettings,
		signing: Option<Arc<dyn SigningKeys>>,
	) -> Result<Vec<Arc<dyn BindingElement>>, ConfigError> {
		if settings.reject_unsolicited_assertions() {
			if nonce_store.is_none() {
				return Err(ConfigError::UnsolicitedAssertionRejectionUnavailable {
					missing: "nonce store",
				});
			}
			if key_store.is_none() {
				return Err(ConfigError::UnsolicitedAssertionRejectionUnavailable {
					missing: "crypto key store",
				});
			}
		}

		let mut elements: Vec<Arc<dyn BindingElement>> = vec![
			Arc::new(ExtensionsElement::new(self.extensions.clone())),
			Arc::new(SecurityOptionsElement::new(settings.clone())),
			Arc::new(BackwardCompatibilityElement),
		];

		if let Some(keys) = &key_store {
			if let Some(nonces) = &nonce_store {
				elements.push(Arc::new(ContextNonceElement::new(nonces.clone(), settings.clone())));
			}

			elements.push(Arc::new(ContextSignatureElement::new(keys.clone(), &settings)));
		}

		let Some(signing) = signing else {
			elements.push(Arc::new(SkipSecurityElement::new()));

			return Ok(elements);
		};

		if let Some(nonces) = nonce_store {
			elements.push(Arc::new(ReplayProtectionElement::new(nonces)));
		}

		elements.push(Arc::new(ExpirationElement::new(settings)));
		elements.push(Arc::new(SigningElement::new(signing)));

		Ok(elements)
	}
}
impl Default for ChannelFactory {
	fn default() -> Self {
		Self::new(ExtensionRegistry::default())
	}
}

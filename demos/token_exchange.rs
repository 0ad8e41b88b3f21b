//! Demonstrates issuing and exchanging a request token, then signing a message with the resulting
//! access token over a consumer-signed channel.
//!
//! 1. Register a consumer in a [`MemoryTokenStore`].
//! 2. Let a [`TokenIssuer`] mint a request token and exchange it for an access token.
//! 3. Send a message through a channel built by [`ChannelFactory::consumer_signed`] and receive it
//!    again, which verifies the signature and the replay nonce.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
// self
use oauth_channel::{
	auth::{ConsumerKey, ConsumerSecret, TokenParameters},
	channel::ChannelFactory,
	issuer::TokenIssuer,
	message::{Message, MessageMode, ProtocolVersion, field},
	settings::SecuritySettings,
	store::{MemoryNonceStore, MemoryTokenStore, NonceStore, TokenStore},
};

fn main() -> Result<()> {
	color_eyre::install()?;

	let store = Arc::new(MemoryTokenStore::default());
	let consumer = ConsumerKey::new("demo-consumer")?;

	store.register_consumer(consumer.clone(), ConsumerSecret::new("demo-consumer-secret"))?;

	let issuer = TokenIssuer::new(store.clone());
	let request = issuer.issue_request_token(
		&consumer,
		TokenParameters::new([("scope", "photos:read"), ("callback", "https://rp.example.com/cb")])?,
	)?;
	let access = issuer.exchange_request_token(&consumer, &request.token)?;

	println!("Exchanged {} for {}.", request.token, access.token);

	let settings = SecuritySettings::default();
	let token_store: Arc<dyn TokenStore> = store.clone();
	let nonce_store: Arc<dyn NonceStore> = Arc::new(MemoryNonceStore::for_settings(&settings));
	let channel = ChannelFactory::default().consumer_signed(token_store, Some(nonce_store), settings)?;
	let message = Message::new(MessageMode::PositiveAssertion, ProtocolVersion::V2)
		.with_field(field::CONSUMER_KEY, consumer.to_string())
		.with_field(field::TOKEN, access.token.to_string())
		.with_field(field::RETURN_TO, "https://rp.example.com/return");
	let wire = channel.send(message)?;

	for (key, value) in wire.fields() {
		println!("  {key} = {value}");
	}

	let received = channel.receive(wire.clone())?;

	println!("Verified with protections: {}.", received.protections());

	match channel.receive(wire) {
		Ok(_) => println!("Replay went unnoticed."),
		Err(e) => println!("Replay refused: {e}"),
	}

	Ok(())
}

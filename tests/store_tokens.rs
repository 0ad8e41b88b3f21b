// std
use std::{
	env, fs,
	path::PathBuf,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	thread,
};
// self
use oauth_channel::{
	auth::{AccessToken, ConsumerKey, ConsumerSecret, RequestToken, TokenParameters, TokenSecret},
	error::Error,
	issuer::TokenIssuer,
	store::{FileTokenStore, MemoryTokenStore, StoreEntity, StoreError, TokenStore},
};

fn consumer(value: &str) -> ConsumerKey {
	ConsumerKey::new(value).expect("Consumer fixture should be valid.")
}

fn request(value: &str) -> RequestToken {
	RequestToken::new(value).expect("Request token fixture should be valid.")
}

fn access(value: &str) -> AccessToken {
	AccessToken::new(value).expect("Access token fixture should be valid.")
}

fn scope() -> TokenParameters {
	TokenParameters::new([("scope", "photos:read"), ("callback", "https://rp.example.com/cb")])
		.expect("Parameter fixture should be valid.")
}

fn memory_store() -> (MemoryTokenStore, ConsumerKey) {
	let store = MemoryTokenStore::default();
	let key = consumer("consumer-1");

	store
		.register_consumer(key.clone(), ConsumerSecret::new("consumer-secret"))
		.expect("Registering the consumer fixture should succeed.");

	(store, key)
}

fn temp_path(name: &str) -> PathBuf {
	let path = env::temp_dir().join(format!("oauth-channel-{}-{name}.json", std::process::id()));
	let _ = fs::remove_file(&path);

	path
}

#[test]
fn stored_request_secrets_can_be_read_back() {
	let (store, consumer) = memory_store();
	let token = request("request-1");

	store
		.store_new_request_token(&consumer, &token, &TokenSecret::new("secret-1"), scope())
		.expect("Storing a request token should succeed.");

	assert_eq!(
		store.token_secret(&token).expect("Stored secret should be readable."),
		TokenSecret::new("secret-1")
	);
	assert_eq!(
		store.consumer_secret(&consumer).expect("Registered consumer should resolve."),
		ConsumerSecret::new("consumer-secret")
	);
	assert_eq!(
		store.token_secret("missing"),
		Err(StoreError::NotFound { entity: StoreEntity::Token, key: "missing".into() })
	);
}

#[test]
fn exchange_moves_parameters_and_expires_the_request_token() {
	let (store, consumer) = memory_store();
	let token = request("request-1");
	let granted = access("access-1");

	store
		.store_new_request_token(&consumer, &token, &TokenSecret::new("secret-1"), scope())
		.expect("Storing a request token should succeed.");
	store
		.expire_request_token_and_store_new_access_token(
			&consumer,
			&token,
			&granted,
			&TokenSecret::new("secret-2"),
		)
		.expect("First exchange should succeed.");

	assert_eq!(store.token_parameters(&granted).expect("Access token should resolve."), scope());
	assert_eq!(store.token_secret(&token), Err(StoreError::Expired { token: "request-1".into() }));
}

#[test]
fn request_tokens_are_exchanged_at_most_once() {
	let (store, consumer) = memory_store();
	let token = request("request-1");

	store
		.store_new_request_token(&consumer, &token, &TokenSecret::new("secret-1"), scope())
		.expect("Storing a request token should succeed.");
	store
		.expire_request_token_and_store_new_access_token(
			&consumer,
			&token,
			&access("access-1"),
			&TokenSecret::new("secret-2"),
		)
		.expect("First exchange should succeed.");

	let err = store
		.expire_request_token_and_store_new_access_token(
			&consumer,
			&token,
			&access("access-2"),
			&TokenSecret::new("secret-3"),
		)
		.expect_err("Second exchange must fail.");

	assert!(matches!(err, StoreError::InvalidToken { .. }));
	assert!(matches!(store.token_secret("access-2"), Err(StoreError::NotFound { .. })));
}

#[test]
fn foreign_consumers_cannot_exchange_and_nothing_changes() {
	let (store, owner) = memory_store();
	let intruder = consumer("consumer-2");
	let token = request("request-1");

	store
		.register_consumer(intruder.clone(), ConsumerSecret::new("other-secret"))
		.expect("Registering a second consumer should succeed.");
	store
		.store_new_request_token(&owner, &token, &TokenSecret::new("secret-1"), scope())
		.expect("Storing a request token should succeed.");

	let err = store
		.expire_request_token_and_store_new_access_token(
			&intruder,
			&token,
			&access("access-1"),
			&TokenSecret::new("secret-2"),
		)
		.expect_err("Exchange by another consumer must fail.");

	assert!(matches!(err, StoreError::InvalidToken { .. }));
	assert_eq!(
		store.token_secret(&token).expect("Request token should still be active."),
		TokenSecret::new("secret-1")
	);
}

#[test]
fn secrets_are_never_shared_between_tokens() {
	let (store, consumer) = memory_store();
	let secret = TokenSecret::new("shared");

	store
		.store_new_request_token(&consumer, &request("request-1"), &secret, scope())
		.expect("Storing the first token should succeed.");

	assert!(matches!(
		store.store_new_request_token(&consumer, &request("request-2"), &secret, scope()),
		Err(StoreError::Conflict { .. })
	));
}

#[test]
fn concurrent_exchanges_have_a_single_winner() {
	let (store, consumer) = memory_store();
	let token = request("request-1");
	let store = Arc::new(store);
	let winners = AtomicUsize::new(0);

	store
		.store_new_request_token(&consumer, &token, &TokenSecret::new("secret-0"), scope())
		.expect("Storing a request token should succeed.");

	thread::scope(|s| {
		for i in 1..=16 {
			let (store, consumer, token, winners) = (&store, &consumer, &token, &winners);

			s.spawn(move || {
				let outcome = store.expire_request_token_and_store_new_access_token(
					consumer,
					token,
					&access(&format!("access-{i}")),
					&TokenSecret::new(format!("secret-{i}")),
				);

				match outcome {
					Ok(()) => {
						winners.fetch_add(1, Ordering::SeqCst);
					},
					Err(e) => assert!(matches!(e, StoreError::InvalidToken { .. })),
				}
			});
		}
	});

	assert_eq!(winners.load(Ordering::SeqCst), 1);
}

#[test]
fn issuer_round_trip_survives_a_file_store_reopen() {
	let path = temp_path("issuer");
	let store = FileTokenStore::open(&path).expect("File store should open.");
	let key = consumer("consumer-1");

	store
		.register_consumer(key.clone(), ConsumerSecret::new("consumer-secret"))
		.expect("Registering the consumer should persist.");

	let issuer = TokenIssuer::new(Arc::new(store));
	let issued = issuer.issue_request_token(&key, scope()).expect("Request token should be issued.");
	let exchanged =
		issuer.exchange_request_token(&key, &issued.token).expect("Exchange should succeed.");
	let reopened = FileTokenStore::open(&path).expect("File store should reopen.");

	assert_eq!(
		reopened.token_secret(&exchanged.token).expect("Access token should be persisted."),
		exchanged.secret
	);
	assert_eq!(reopened.token_parameters(&exchanged.token).expect("Scope persists."), scope());
	assert!(matches!(
		TokenIssuer::new(Arc::new(reopened)).exchange_request_token(&key, &issued.token),
		Err(Error::InvalidToken { .. })
	));

	let _ = fs::remove_file(&path);
}

#[test]
fn unknown_consumers_surface_as_not_found() {
	let (store, _) = memory_store();
	let issuer = TokenIssuer::new(Arc::new(store));

	assert!(matches!(
		issuer.issue_request_token(&consumer("stranger"), TokenParameters::default()),
		Err(Error::NotFound { entity: StoreEntity::Consumer, .. })
	));
}

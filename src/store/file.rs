//! File-backed [`TokenStore`] for lightweight single-process deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ConsumerKey, ConsumerSecret, RequestToken, TokenParameters, TokenSecret},
	store::{StoreError, TokenStore, memory::TokenBook},
};

/// Persists consumers and token records to a JSON file after each mutation.
///
/// Every mutation holds the write lock while the snapshot is written, so the request token
/// exchange stays atomic for every thread sharing the store. A mutation whose snapshot cannot be
/// written leaves the store unchanged.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
	path: PathBuf,
	inner: Arc<RwLock<TokenBook>>,
}
impl FileTokenStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let book = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(book)) })
	}

	/// Registers a consumer and persists the change; re-registering with the same secret is a
	/// no-op.
	pub fn register_consumer(
		&self,
		consumer: ConsumerKey,
		secret: ConsumerSecret,
	) -> Result<(), StoreError> {
		self.mutate(|book| book.register_consumer(consumer, secret))
	}

	fn load_snapshot(path: &Path) -> Result<TokenBook, StoreError> {
		if !path.exists() {
			return Ok(TokenBook::default());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(TokenBook::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let book: TokenBook =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(book.reindexed())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn mutate<T>(
		&self,
		f: impl FnOnce(&mut TokenBook) -> Result<T, StoreError>,
	) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		// Changes become visible only once the snapshot holding them is on disk.
		let mut next = guard.clone();
		let value = f(&mut next)?;

		self.persist_locked(&next)?;

		*guard = next;

		Ok(value)
	}

	fn persist_locked(&self, book: &TokenBook) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(book).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenStore for FileTokenStore {
	fn consumer_secret(&self, consumer: &ConsumerKey) -> Result<ConsumerSecret, StoreError> {
		self.inner.read().consumer_secret(consumer)
	}

	fn token_secret(&self, token: &str) -> Result<TokenSecret, StoreError> {
		self.inner.read().token_secret(token)
	}

	fn token_parameters(&self, token: &str) -> Result<TokenParameters, StoreError> {
		self.inner.read().token_parameters(token)
	}

	fn store_new_request_token(
		&self,
		consumer: &ConsumerKey,
		request_token: &RequestToken,
		request_token_secret: &TokenSecret,
		parameters: TokenParameters,
	) -> Result<(), StoreError> {
		self.mutate(|book| {
			book.store_request(
				consumer,
				request_token,
				request_token_secret,
				parameters,
				OffsetDateTime::now_utc(),
			)
		})
	}

	fn expire_request_token_and_store_new_access_token(
		&self,
		consumer: &ConsumerKey,
		request_token: &RequestToken,
		access_token: &AccessToken,
		access_token_secret: &TokenSecret,
	) -> Result<(), StoreError> {
		self.mutate(|book| {
			book.exchange(
				consumer,
				request_token,
				access_token,
				access_token_secret,
				OffsetDateTime::now_utc(),
			)
		})
	}
}

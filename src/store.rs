//! Storage contracts and built-in store implementations for the session's credential pair.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable key-value storage for the access/refresh token pair.
///
/// Writes follow last-write-wins semantics. The store itself is not a coordination point:
/// [`crate::client::ApiClient`] is the only writer and orders its own writes.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Loads both tokens.
	fn load(&self) -> StoreFuture<'_, CredentialPair>;

	/// Replaces the access token.
	fn set_access(&self, access: TokenSecret) -> StoreFuture<'_, ()>;

	/// Replaces the refresh token.
	fn set_refresh(&self, refresh: TokenSecret) -> StoreFuture<'_, ()>;

	/// Writes the halves of `pair` that are present, leaving the others untouched.
	fn set_both(&self, pair: CredentialPair) -> StoreFuture<'_, ()>;

	/// Removes both tokens.
	fn clear(&self) -> StoreFuture<'_, ()>;
}
impl dyn TokenStore {
	/// Loads the access token.
	pub async fn access(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.load().await?.access)
	}

	/// Loads the refresh token.
	pub async fn refresh(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.load().await?.refresh)
	}
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
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

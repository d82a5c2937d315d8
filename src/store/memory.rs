//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	store::{StoreError, StoreFuture, TokenStore},
};

type StoreCell = Arc<RwLock<CredentialPair>>;

/// Thread-safe storage backend that keeps the credential pair in-process.
///
/// Clones share the same cell, so a test can keep a handle and inspect what the client wrote.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreCell);
impl MemoryStore {
	/// Creates a store seeded with `pair`.
	pub fn with_pair(pair: CredentialPair) -> Self {
		Self(Arc::new(RwLock::new(pair)))
	}

	/// Returns a copy of the stored pair without going through the async contract.
	pub fn snapshot(&self) -> CredentialPair {
		self.0.read().clone()
	}

	fn write_now(cell: StoreCell, f: impl FnOnce(&mut CredentialPair)) -> Result<(), StoreError> {
		f(&mut cell.write());

		Ok(())
	}
}
impl TokenStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, CredentialPair> {
		let cell = self.0.clone();

		Box::pin(async move { Ok(cell.read().clone()) })
	}

	fn set_access(&self, access: TokenSecret) -> StoreFuture<'_, ()> {
		let cell = self.0.clone();

		Box::pin(async move { Self::write_now(cell, |pair| pair.access = Some(access)) })
	}

	fn set_refresh(&self, refresh: TokenSecret) -> StoreFuture<'_, ()> {
		let cell = self.0.clone();

		Box::pin(async move { Self::write_now(cell, |pair| pair.refresh = Some(refresh)) })
	}

	fn set_both(&self, update: CredentialPair) -> StoreFuture<'_, ()> {
		let cell = self.0.clone();

		Box::pin(async move { Self::write_now(cell, |pair| pair.merge(update)) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let cell = self.0.clone();

		Box::pin(async move { Self::write_now(cell, |pair| *pair = CredentialPair::default()) })
	}
}

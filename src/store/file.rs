//! JSON-file [`TokenStore`] so a session survives process restarts.

// std
use std::{
	fs,
	io::{self, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	store::{StoreError, StoreFuture, TokenStore},
};

/// Keeps the credential pair in memory and mirrors every write to a JSON file.
///
/// The file holds a single object, `{"access": "...", "refresh": "..."}`, with absent halves
/// omitted. A missing or blank file reads as an empty pair. Writes go to a sibling `.tmp` file
/// that is renamed over the target, so a crash never leaves a half-written snapshot behind.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	cached: Arc<RwLock<CredentialPair>>,
}
impl FileStore {
	/// Opens the snapshot at `path`, creating parent directories when needed.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		create_parent(&path)?;

		let pair = read_snapshot(&path)?;

		Ok(Self { path, cached: Arc::new(RwLock::new(pair)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn update(&self, apply: impl FnOnce(&mut CredentialPair)) -> Result<(), StoreError> {
		let mut cached = self.cached.write();
		let mut next = cached.clone();

		apply(&mut next);
		write_snapshot(&self.path, &next)?;
		*cached = next;

		Ok(())
	}
}
impl TokenStore for FileStore {
	fn load(&self) -> StoreFuture<'_, CredentialPair> {
		Box::pin(async move { Ok(self.cached.read().clone()) })
	}

	fn set_access(&self, access: TokenSecret) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.update(|pair| pair.access = Some(access)) })
	}

	fn set_refresh(&self, refresh: TokenSecret) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.update(|pair| pair.refresh = Some(refresh)) })
	}

	fn set_both(&self, update: CredentialPair) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.update(|pair| pair.merge(update)) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.update(|pair| *pair = CredentialPair::default()) })
	}
}

fn io_failure(action: &str, path: &Path, err: io::Error) -> StoreError {
	StoreError::Backend { message: format!("Could not {action} {}: {err}", path.display()) }
}

fn create_parent(path: &Path) -> Result<(), StoreError> {
	match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() =>
			fs::create_dir_all(parent).map_err(|e| io_failure("create directory", parent, e)),
		_ => Ok(()),
	}
}

fn read_snapshot(path: &Path) -> Result<CredentialPair, StoreError> {
	let raw = match fs::read(path) {
		Ok(raw) => raw,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CredentialPair::default()),
		Err(e) => return Err(io_failure("read", path, e)),
	};

	if raw.iter().all(u8::is_ascii_whitespace) {
		return Ok(CredentialPair::default());
	}

	serde_json::from_slice(&raw).map_err(|e| StoreError::Serialization {
		message: format!("{} is not a credential snapshot: {e}", path.display()),
	})
}

fn write_snapshot(path: &Path, pair: &CredentialPair) -> Result<(), StoreError> {
	let json = serde_json::to_vec_pretty(pair)
		.map_err(|e| StoreError::Serialization { message: format!("Could not encode tokens: {e}") })?;
	let staging = path.with_extension("tmp");
	let mut file = fs::File::create(&staging).map_err(|e| io_failure("create", &staging, e))?;

	file.write_all(&json).map_err(|e| io_failure("write", &staging, e))?;
	file.sync_all().map_err(|e| io_failure("sync", &staging, e))?;
	drop(file);

	fs::rename(&staging, path).map_err(|e| io_failure("replace", path, e))
}

#[cfg(test)]
mod tests {
	// std
	use std::env;
	// self
	use super::*;

	struct Scratch(PathBuf);
	impl Scratch {
		fn new(label: &str) -> Self {
			let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();

			Self(env::temp_dir().join(format!("crm_session_{label}_{}_{nanos}", std::process::id())))
		}

		fn file(&self) -> PathBuf {
			self.0.join("session.json")
		}
	}
	impl Drop for Scratch {
		fn drop(&mut self) {
			let _ = fs::remove_dir_all(&self.0);
		}
	}

	#[tokio::test]
	async fn writes_survive_reopening() {
		let scratch = Scratch::new("reopen");
		let store = FileStore::open(scratch.file()).expect("Opening a fresh snapshot should work.");

		assert!(store.load().await.expect("Fresh snapshot should load.").is_empty());

		store.set_both(CredentialPair::new("A1", "R1")).await.expect("Seeding should persist.");
		store.set_access("A2".into()).await.expect("Replacing the access token should persist.");
		drop(store);

		let reopened = FileStore::open(scratch.file()).expect("Reopening should work.");

		assert_eq!(
			reopened.load().await.expect("Reopened snapshot should load."),
			CredentialPair::new("A2", "R1"),
		);
		assert!(!scratch.file().with_extension("tmp").exists());
	}

	#[tokio::test]
	async fn clearing_leaves_an_empty_object() {
		let scratch = Scratch::new("clear");
		let store = FileStore::open(scratch.file()).expect("Opening a fresh snapshot should work.");

		store.set_both(CredentialPair::new("A1", "R1")).await.expect("Seeding should persist.");
		store.clear().await.expect("Clearing should persist.");

		let raw = fs::read_to_string(scratch.file()).expect("Cleared snapshot should exist.");

		assert_eq!(raw.trim(), "{}");
	}

	#[test]
	fn blank_and_corrupt_snapshots() {
		let scratch = Scratch::new("corrupt");

		fs::create_dir_all(&scratch.0).expect("Scratch directory should be creatable.");
		fs::write(scratch.file(), "  \n").expect("Blank fixture should be writable.");

		assert!(FileStore::open(scratch.file()).is_ok());

		fs::write(scratch.file(), "not json").expect("Corrupt fixture should be writable.");

		let err = FileStore::open(scratch.file()).expect_err("Corrupt snapshots should be rejected.");

		assert!(matches!(err, StoreError::Serialization { .. }));
	}
}

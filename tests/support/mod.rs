//! Shared fixtures for integration tests: a scripted transport and client builders.

#![allow(dead_code)]

// std
use std::{future::Future, pin::Pin, sync::Arc};
// crates.io
use parking_lot::Mutex;
// self
use crm_session::{
	auth::{CredentialPair, TokenSecret},
	client::ApiClient,
	config::ClientConfig,
	error::TransportError,
	http::{ApiRequest, ApiResponse, ApiTransport, TransportFuture},
	store::{MemoryStore, StoreError, StoreFuture, TokenStore},
};

pub const BASE_URL: &str = "http://crm.test/api/";
pub const REFRESH_PATH: &str = "/api/auth/token/refresh/";

type Handler = Box<
	dyn Fn(ApiRequest) -> Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send>>
		+ Send
		+ Sync,
>;

/// Transport that answers every request with a test-provided handler and records what it saw.
pub struct ScriptedTransport {
	handler: Handler,
	log: Mutex<Vec<ApiRequest>>,
}
impl ScriptedTransport {
	pub fn new<F, Fut>(handler: F) -> Self
	where
		F: 'static + Fn(ApiRequest) -> Fut + Send + Sync,
		Fut: 'static + Future<Output = Result<ApiResponse, TransportError>> + Send,
	{
		Self { handler: Box::new(move |request| Box::pin(handler(request))), log: Mutex::new(Vec::new()) }
	}

	pub fn requests(&self) -> Vec<ApiRequest> {
		self.log.lock().clone()
	}

	pub fn calls_to(&self, path: &str) -> usize {
		self.log.lock().iter().filter(|request| request.url.path() == path).count()
	}
}
impl ApiTransport for ScriptedTransport {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		self.log.lock().push(request.clone());

		Box::pin((self.handler)(request))
	}
}

pub fn pair(access: Option<&str>, refresh: Option<&str>) -> CredentialPair {
	CredentialPair { access: access.map(Into::into), refresh: refresh.map(Into::into) }
}

pub fn test_config(base_url: &str) -> ClientConfig {
	ClientConfig::builder(base_url).build().expect("Test base URL should produce a valid config.")
}

/// Builds a client over `transport` with a memory store seeded from `seed`.
pub fn scripted_client(
	transport: ScriptedTransport,
	seed: CredentialPair,
) -> (ApiClient<ScriptedTransport>, MemoryStore, Arc<ScriptedTransport>) {
	let store = MemoryStore::with_pair(seed);
	let shared: Arc<dyn TokenStore> = Arc::new(store.clone());
	let transport = Arc::new(transport);
	let client = ApiClient::with_transport(test_config(BASE_URL), shared, transport.clone());

	(client, store, transport)
}

/// Builds a client over `transport` backed by a caller-provided store.
pub fn client_with_store(
	transport: ScriptedTransport,
	store: Arc<dyn TokenStore>,
) -> (ApiClient<ScriptedTransport>, Arc<ScriptedTransport>) {
	let transport = Arc::new(transport);
	let client = ApiClient::with_transport(test_config(BASE_URL), store, transport.clone());

	(client, transport)
}

/// Store that serves and clears `inner` but refuses every token write.
pub struct WriteFailingStore(pub MemoryStore);
impl WriteFailingStore {
	fn refuse(&self) -> StoreFuture<'_, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "disk is read-only".into() }) })
	}
}
impl TokenStore for WriteFailingStore {
	fn load(&self) -> StoreFuture<'_, CredentialPair> {
		self.0.load()
	}

	fn set_access(&self, _: TokenSecret) -> StoreFuture<'_, ()> {
		self.refuse()
	}

	fn set_refresh(&self, _: TokenSecret) -> StoreFuture<'_, ()> {
		self.refuse()
	}

	fn set_both(&self, _: CredentialPair) -> StoreFuture<'_, ()> {
		self.refuse()
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		self.0.clear()
	}
}

/// Builds a reqwest-backed client pointed at `base_url` with a memory store seeded from `seed`.
#[cfg(feature = "reqwest")]
pub fn reqwest_client(
	base_url: &str,
	seed: CredentialPair,
) -> (crm_session::client::ReqwestApiClient, MemoryStore) {
	let store = MemoryStore::with_pair(seed);
	let shared: Arc<dyn TokenStore> = Arc::new(store.clone());

	(ApiClient::new(test_config(base_url), shared), store)
}

pub fn json(status: u16, body: serde_json::Value) -> Result<ApiResponse, TransportError> {
	Ok(ApiResponse::json(status, &body))
}

pub fn bearer(request: &ApiRequest) -> Option<&str> {
	request.authorization()
}

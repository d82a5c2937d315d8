//! Authenticated API client: bearer-token pipeline, single-flight refresh, and session helpers.
//!
//! Every outbound call runs through an explicit decorator around the bare [`ApiTransport`]:
//!
//! 1. **Pre-hook** ([`ApiClient::execute`] → `prepare`): resolve the path against the base URL,
//!    encode the query and JSON body, and attach `Authorization: Bearer <access>` when the
//!    request opts into authentication and an access token is stored.
//! 2. **Transport**: a single [`ApiTransport::send`].
//! 3. **Post-hook** (`classify`): a first-time 401 on an authenticated, non-refresh request is
//!    recovered by obtaining a new access token through the client's [`RefreshGate`] and resending
//!    the request once. Everything else is surfaced unchanged.

pub mod refresh;
pub mod request;
pub mod session;

pub use refresh::*;
pub use request::*;
pub use session::*;

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	http::ApiTransport,
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Authenticated HTTP client for one logged-in session.
///
/// The refresh coordinator (in-flight flag + waiter queue) is owned by the client instance rather
/// than by the process, so independent clients never share refresh state. Clones share the
/// transport, store, and coordinator, and therefore behave as the same session.
pub struct ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Bare transport used for every outbound call, including refreshes.
	pub transport: Arc<T>,
	/// Store holding the session's credential pair.
	pub store: Arc<dyn TokenStore>,
	/// Base URL, endpoint paths, and deadlines.
	pub config: ClientConfig,
	/// Shared metrics recorder for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	gate: Arc<RefreshGate>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn TokenStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			config,
			refresh_metrics: Default::default(),
			gate: Default::default(),
		}
	}

	/// Returns `true` while a refresh call is outstanding.
	pub fn refresh_in_flight(&self) -> bool {
		self.gate.is_in_flight()
	}

	/// Number of requests currently parked behind the in-flight refresh.
	pub fn queued_waiters(&self) -> usize {
		self.gate.queued()
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a new client backed by a default reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default())
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			gate: self.gate.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh_in_flight", &self.gate.is_in_flight())
			.field("queued_waiters", &self.gate.queued())
			.field("refresh_stats", &self.refresh_metrics.snapshot())
			.finish()
	}
}

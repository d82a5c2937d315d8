//! Access-token refresh with single-flight coordination and session teardown on failure.
//!
//! [`ApiClient::refresh_access_token`] (and the request pipeline's 401 recovery) funnel through
//! the client's [`RefreshGate`]: the leader exchanges the stored refresh token at the refresh
//! endpoint over the bare transport, stores the new access token, and settles the gate; every
//! request that arrived meanwhile receives the same outcome. A refresh the server rejects clears
//! both stored tokens before the waiters are released.

mod gate;
mod metrics;

pub use gate::*;
pub use metrics::{RefreshMetrics, RefreshStats};

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
	client::{ApiClient, request::Deadline},
	error::RefreshError,
	http::{ApiRequest, ApiTransport, CONTENT_TYPE, JSON_CONTENT_TYPE, Method},
	obs::{self, OpKind, RefreshRole},
};

#[derive(Deserialize)]
struct RefreshResponse {
	access: TokenSecret,
	#[serde(default)]
	refresh: Option<TokenSecret>,
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Obtains a new access token, joining the in-flight refresh when one is running.
	///
	/// A rejected or unusable refresh clears both stored tokens and is returned as
	/// [`Error::Refresh`].
	pub async fn refresh_access_token(&self) -> Result<TokenSecret> {
		obs::observe(OpKind::Refresh, "refresh_access_token", self.await_refreshed_access(None))
			.await
	}

	/// Leads a refresh or waits on the running one.
	///
	/// Only the wait is bounded by `deadline`. A follower whose leader went away re-enters the
	/// gate and takes the refresh over.
	pub(crate) async fn await_refreshed_access(
		&self,
		deadline: Option<Deadline>,
	) -> Result<TokenSecret> {
		loop {
			match self.gate.admit() {
				Admission::Leader(lease) => {
					obs::record_refresh_role(RefreshRole::Leader);

					return self.lead_refresh(lease).await;
				},
				Admission::Follower(waiter) => {
					self.refresh_metrics.record_coalesced();
					obs::record_refresh_role(RefreshRole::Follower);

					#[cfg(feature = "tracing")]
					tracing::debug!("Waiting on the in-flight token refresh.");

					let outcome =
						Deadline::bound(deadline, async { Ok::<_, Error>(waiter.wait().await) })
							.await?;

					match outcome {
						Err(RefreshError::Abandoned) => {
							#[cfg(feature = "tracing")]
							tracing::debug!("In-flight token refresh was abandoned; taking it over.");
						},
						outcome => return Ok(outcome?),
					}
				},
			}
		}
	}

	async fn lead_refresh(&self, lease: RefreshLease<'_>) -> Result<TokenSecret> {
		self.refresh_metrics.record_attempt();

		#[cfg(feature = "tracing")]
		tracing::debug!("Refreshing the access token.");

		match self.exchange_refresh_token().await {
			Ok(access) => {
				self.refresh_metrics.record_success();
				lease.resolve(&access);

				Ok(access)
			},
			Err(err) => {
				self.refresh_metrics.record_failure();

				if err.ends_session() {
					#[cfg(feature = "tracing")]
					tracing::warn!(error = %err, "Token refresh failed; clearing the stored session.");

					if let Err(clear_err) = self.store.clear().await {
						#[cfg(feature = "tracing")]
						tracing::warn!(error = %clear_err, "Failed to clear stored tokens.");
						#[cfg(not(feature = "tracing"))]
						let _ = clear_err;
					}
				} else {
					#[cfg(feature = "tracing")]
					tracing::warn!(error = %err, "Token refresh failed; keeping the stored session.");
				}

				lease.reject(&err);

				Err(err.into())
			},
		}
	}

	async fn exchange_refresh_token(&self) -> Result<TokenSecret, RefreshError> {
		let refresh = self.store.refresh().await?.ok_or(RefreshError::MissingRefreshToken)?;
		let mut request = ApiRequest::new(Method::Post, self.config.refresh_url().clone());

		request.set_header(CONTENT_TYPE, JSON_CONTENT_TYPE);
		request.body =
			Some(serde_json::json!({ "refresh": refresh.expose() }).to_string().into_bytes());

		let response = self.transport.send(request).await?;

		if !response.is_success() {
			return Err(RefreshError::Rejected { status: response.status, body: response.text() });
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
		let payload: RefreshResponse = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| RefreshError::MalformedResponse { source: Arc::new(source) })?;

		match payload.refresh {
			Some(rotated) =>
				self.store
					.set_both(CredentialPair {
						access: Some(payload.access.clone()),
						refresh: Some(rotated),
					})
					.await?,
			None => self.store.set_access(payload.access.clone()).await?,
		}

		Ok(payload.access)
	}
}

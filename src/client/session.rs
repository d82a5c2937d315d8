//! Session-level operations built on the authenticated pipeline: login, registration, logout,
//! session restore, and the auth guard used before rendering protected views.

// self
use crate::{
	_prelude::*,
	auth::{AuthTokens, TokenSecret},
	client::{ApiClient, RequestOptions},
	http::{AUTHORIZATION, ApiRequest, ApiTransport, Method},
	obs::{self, OpKind},
};

/// Result of [`ApiClient::restore_session`].
#[derive(Debug)]
pub enum SessionRestore {
	/// No access token was stored.
	Anonymous,
	/// The stored tokens are valid; carries the current user profile.
	Active(serde_json::Value),
	/// The stored tokens were rejected and have been cleared.
	Ended(Error),
}

/// Result of [`ApiClient::guard`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
	/// The stored access token was accepted as-is.
	Authenticated,
	/// The access token was rejected but a refresh produced a new one.
	Refreshed,
	/// No usable session exists; stored tokens have been cleared.
	Unauthenticated,
}
impl GuardOutcome {
	/// Returns `true` when the protected view may be shown.
	pub fn is_allowed(self) -> bool {
		!matches!(self, Self::Unauthenticated)
	}
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Logs in with `credentials` and stores the returned token pair.
	pub async fn login<B>(&self, credentials: &B) -> Result<AuthTokens>
	where
		B: ?Sized + Serialize,
	{
		obs::observe(OpKind::Login, "login", self.issue_tokens(&self.config.login_path, credentials))
			.await
	}

	/// Registers a new account and stores the returned token pair.
	pub async fn register<B>(&self, payload: &B) -> Result<AuthTokens>
	where
		B: ?Sized + Serialize,
	{
		obs::observe(OpKind::Register, "register", self.issue_tokens(&self.config.register_path, payload))
			.await
	}

	/// Revokes the refresh token server-side and clears the stored pair.
	///
	/// Local tokens are cleared even when the server call fails; that failure is still returned.
	pub async fn logout(&self) -> Result<serde_json::Value> {
		obs::observe(OpKind::Logout, "logout", async {
			let refresh = self.store.refresh().await?;
			let options = RequestOptions::new(Method::Post, self.config.logout_path.as_str())
				.json(serde_json::json!({ "refresh": refresh.as_ref().map(TokenSecret::expose) }));
			let result = self.request(options).await;

			self.store.clear().await?;

			result
		})
		.await
	}

	/// Re-establishes a session from stored tokens by fetching the current user.
	///
	/// Authentication failures end the session (tokens cleared). Transport failures, timeouts,
	/// storage failures, and non-401 HTTP errors are returned with the tokens left in place.
	pub async fn restore_session(&self) -> Result<SessionRestore> {
		obs::observe(OpKind::RestoreSession, "restore_session", async {
			if self.store.access().await?.is_none() {
				return Ok(SessionRestore::Anonymous);
			}

			match self.get(&self.config.current_user_path).await {
				Ok(user) => Ok(SessionRestore::Active(user)),
				Err(err) if err.is_auth_failure() => {
					self.store.clear().await?;

					Ok(SessionRestore::Ended(err))
				},
				Err(err) => Err(err),
			}
		})
		.await
	}

	/// Checks whether a protected view may be shown, refreshing the access token when needed.
	///
	/// Tokens are cleared only when nothing is stored or the refresh proves the session unusable.
	pub async fn guard(&self) -> Result<GuardOutcome> {
		obs::observe(OpKind::Guard, "guard", async {
			let pair = self.store.load().await?;

			if pair.is_empty() {
				self.store.clear().await?;

				return Ok(GuardOutcome::Unauthenticated);
			}
			if let Some(access) = &pair.access {
				if self.verify_access(access).await? {
					return Ok(GuardOutcome::Authenticated);
				}
			}
			if pair.refresh.is_some() {
				match self.await_refreshed_access(None).await {
					Ok(_) => return Ok(GuardOutcome::Refreshed),
					Err(Error::Refresh(err)) if err.ends_session() => {},
					Err(err) => return Err(err),
				}
			}

			self.store.clear().await?;

			Ok(GuardOutcome::Unauthenticated)
		})
		.await
	}

	async fn issue_tokens<B>(&self, path: &str, payload: &B) -> Result<AuthTokens>
	where
		B: ?Sized + Serialize,
	{
		let options = RequestOptions::new(Method::Post, path).try_json(payload)?.without_auth();
		let tokens: AuthTokens = self.request_json(options).await?;

		self.store.set_both(tokens.credentials()).await?;

		Ok(tokens)
	}

	async fn verify_access(&self, access: &TokenSecret) -> Result<bool> {
		let mut request =
			ApiRequest::new(Method::Get, self.config.endpoint(&self.config.current_user_path)?);

		request.set_header(AUTHORIZATION, access.bearer());

		Ok(self.transport.send(request).await?.is_success())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn only_unauthenticated_outcomes_block_views() {
		assert!(GuardOutcome::Authenticated.is_allowed());
		assert!(GuardOutcome::Refreshed.is_allowed());
		assert!(!GuardOutcome::Unauthenticated.is_allowed());
	}
}

//! Credential pair held by token stores and the payloads that populate it.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access/refresh token pair for the logged-in session.
///
/// Either half may be missing transiently (for example after a partial write); such a pair is
/// treated as not authenticated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived bearer token attached to API calls.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access: Option<TokenSecret>,
	/// Long-lived token exchanged for new access tokens.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh: Option<TokenSecret>,
}
impl CredentialPair {
	/// Builds a complete pair.
	pub fn new(access: impl Into<TokenSecret>, refresh: impl Into<TokenSecret>) -> Self {
		Self { access: Some(access.into()), refresh: Some(refresh.into()) }
	}

	/// Returns `true` only when both tokens are present.
	pub fn is_authenticated(&self) -> bool {
		self.access.is_some() && self.refresh.is_some()
	}

	/// Returns `true` when neither token is present.
	pub fn is_empty(&self) -> bool {
		self.access.is_none() && self.refresh.is_none()
	}

	/// Overlays the present halves of `update` onto `self`.
	pub fn merge(&mut self, update: CredentialPair) {
		if let Some(access) = update.access {
			self.access = Some(access);
		}
		if let Some(refresh) = update.refresh {
			self.refresh = Some(refresh);
		}
	}
}

/// Token payload returned by the login, registration, and refresh endpoints.
///
/// The refresh endpoint only returns `access` unless the server rotates refresh tokens.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthTokens {
	/// Newly issued access token.
	pub access: Option<TokenSecret>,
	/// Newly issued (or rotated) refresh token.
	#[serde(default)]
	pub refresh: Option<TokenSecret>,
	/// User profile returned alongside the tokens, when the endpoint includes one.
	#[serde(default)]
	pub user: Option<serde_json::Value>,
}
impl AuthTokens {
	/// Returns the token halves as a [`CredentialPair`] update.
	pub fn credentials(&self) -> CredentialPair {
		CredentialPair { access: self.access.clone(), refresh: self.refresh.clone() }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn partial_pairs_are_not_authenticated() {
		let mut pair = CredentialPair::default();

		assert!(pair.is_empty());
		assert!(!pair.is_authenticated());

		pair.merge(CredentialPair { access: Some("A1".into()), refresh: None });

		assert!(!pair.is_empty());
		assert!(!pair.is_authenticated());

		pair.merge(CredentialPair { access: None, refresh: Some("R1".into()) });

		assert!(pair.is_authenticated());
		assert_eq!(pair.access.as_ref().map(TokenSecret::expose), Some("A1"));
	}

	#[test]
	fn auth_tokens_accept_login_and_refresh_shapes() {
		let login: AuthTokens = serde_json::from_str(
			"{\"access\":\"A1\",\"refresh\":\"R1\",\"user\":{\"username\":\"alice\"}}",
		)
		.expect("Login payload should deserialize.");

		assert!(login.credentials().is_authenticated());
		assert_eq!(login.user, Some(serde_json::json!({ "username": "alice" })));

		let refresh: AuthTokens =
			serde_json::from_str("{\"access\":\"A2\"}").expect("Refresh payload should deserialize.");

		assert_eq!(refresh.credentials(), CredentialPair { access: Some("A2".into()), refresh: None });
	}
}

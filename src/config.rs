//! Client configuration: API base URL, auth endpoint paths, and request deadlines.

// self
use crate::{_prelude::*, error::ConfigError};

/// Validated client configuration.
///
/// Endpoint paths are relative to [`ClientConfig::base_url`]; the refresh endpoint is resolved once
/// at build time because the refresh exchange must never fail on URL construction.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// API root every request path is joined onto; always ends with `/`.
	pub base_url: Url,
	/// Path of the token refresh endpoint.
	pub refresh_path: String,
	/// Path of the login endpoint.
	pub login_path: String,
	/// Path of the registration endpoint.
	pub register_path: String,
	/// Path of the logout endpoint.
	pub logout_path: String,
	/// Path returning the current user profile.
	pub current_user_path: String,
	/// Default deadline applied to every request; `None` disables it.
	pub request_timeout: Option<Duration>,
	refresh_url: Url,
}
impl ClientConfig {
	/// Default API root used by the dashboard during development.
	pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000/api/";
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "auth/token/refresh/";
	/// Default login endpoint path.
	pub const DEFAULT_LOGIN_PATH: &'static str = "auth/login/";
	/// Default registration endpoint path.
	pub const DEFAULT_REGISTER_PATH: &'static str = "auth/register/";
	/// Default logout endpoint path.
	pub const DEFAULT_LOGOUT_PATH: &'static str = "auth/logout/";
	/// Default current-user endpoint path.
	pub const DEFAULT_CURRENT_USER_PATH: &'static str = "users/me/";

	/// Starts a builder for the provided base URL.
	pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves a request path against the base URL.
	///
	/// Leading slashes are ignored so `/users/me/` and `users/me/` address the same endpoint.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		join_path(&self.base_url, path)
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> &Url {
		&self.refresh_url
	}

	/// Returns `true` when `path` addresses the refresh endpoint.
	pub fn is_refresh_path(&self, path: &str) -> bool {
		let path = path.split(['?', '#']).next().unwrap_or_default();

		normalize(path) == normalize(&self.refresh_path)
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Raw base URL; validated by [`ClientConfigBuilder::build`].
	pub base_url: String,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Login endpoint path.
	pub login_path: String,
	/// Registration endpoint path.
	pub register_path: String,
	/// Logout endpoint path.
	pub logout_path: String,
	/// Current-user endpoint path.
	pub current_user_path: String,
	/// Default request deadline.
	pub request_timeout: Option<Duration>,
}
impl ClientConfigBuilder {
	/// Creates a builder seeded with the default endpoint paths.
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
			login_path: ClientConfig::DEFAULT_LOGIN_PATH.into(),
			register_path: ClientConfig::DEFAULT_REGISTER_PATH.into(),
			logout_path: ClientConfig::DEFAULT_LOGOUT_PATH.into(),
			current_user_path: ClientConfig::DEFAULT_CURRENT_USER_PATH.into(),
			request_timeout: None,
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the registration endpoint path.
	pub fn register_path(mut self, path: impl Into<String>) -> Self {
		self.register_path = path.into();

		self
	}

	/// Overrides the logout endpoint path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.logout_path = path.into();

		self
	}

	/// Overrides the current-user endpoint path.
	pub fn current_user_path(mut self, path: impl Into<String>) -> Self {
		self.current_user_path = path.into();

		self
	}

	/// Sets the default request deadline; negative values clamp to zero.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(if timeout.is_negative() { Duration::ZERO } else { timeout });

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let mut base_url = Url::parse(&self.base_url)
			.map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
			return Err(ConfigError::UnsupportedBaseUrl { url: self.base_url });
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let refresh_url = join_path(&base_url, &self.refresh_path)?;

		for path in [&self.login_path, &self.register_path, &self.logout_path, &self.current_user_path]
		{
			join_path(&base_url, path)?;
		}

		Ok(ClientConfig {
			base_url,
			refresh_path: self.refresh_path,
			login_path: self.login_path,
			register_path: self.register_path,
			logout_path: self.logout_path,
			current_user_path: self.current_user_path,
			request_timeout: self.request_timeout,
			refresh_url,
		})
	}
}

fn normalize(path: &str) -> &str {
	path.trim_start_matches('/')
}

fn join_path(base: &Url, path: &str) -> Result<Url, ConfigError> {
	base.join(normalize(path))
		.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_appends_trailing_slash_and_resolves_refresh_url() {
		let config = ClientConfig::builder("https://crm.example.com/api")
			.build()
			.expect("Config builder should accept an https base URL.");

		assert_eq!(config.base_url.as_str(), "https://crm.example.com/api/");
		assert_eq!(config.refresh_url().as_str(), "https://crm.example.com/api/auth/token/refresh/");
		assert_eq!(
			config.endpoint("/users/me/").expect("Absolute-looking paths should join.").as_str(),
			"https://crm.example.com/api/users/me/",
		);
	}

	#[test]
	fn builder_rejects_unsupported_base_urls() {
		let err = ClientConfig::builder("ftp://crm.example.com/api/")
			.build()
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedBaseUrl { .. }));

		let err = ClientConfig::builder("mailto:ops@example.com")
			.build()
			.expect_err("Cannot-be-a-base URLs should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedBaseUrl { .. }));

		let err = ClientConfig::builder("not a url")
			.build()
			.expect_err("Unparseable base URLs should be rejected.");

		assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
	}

	#[test]
	fn refresh_path_detection_ignores_slashes_and_query() {
		let config = ClientConfig::builder(ClientConfig::DEFAULT_BASE_URL)
			.build()
			.expect("Config builder should accept the default base URL.");

		assert!(config.is_refresh_path("/auth/token/refresh/"));
		assert!(config.is_refresh_path("auth/token/refresh/?source=manual"));
		assert!(!config.is_refresh_path("/auth/login/"));
		assert_eq!(config.refresh_url().as_str(), "http://localhost:8000/api/auth/token/refresh/");
	}

	#[test]
	fn negative_timeouts_clamp_to_zero() {
		let config = ClientConfig::builder(ClientConfig::DEFAULT_BASE_URL)
			.request_timeout(Duration::seconds(-5))
			.build()
			.expect("Config builder should accept the default base URL.");

		assert_eq!(config.request_timeout, Some(Duration::ZERO));
	}
}

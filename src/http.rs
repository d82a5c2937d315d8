//! Transport primitives for API calls.
//!
//! The module exposes [`ApiTransport`] alongside the owned [`ApiRequest`] and [`ApiResponse`]
//! values it exchanges, so downstream crates can plug in custom HTTP stacks (or scripted fakes in
//! tests) without touching the token handling in [`crate::client`]. A transport is a *bare* call:
//! it never attaches tokens and never retries. Authentication lives entirely in the client's
//! pre- and post-hooks wrapped around it.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing a single API call.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// in-flight request of a client. Non-2xx statuses are *responses*, not errors: only failures to
/// obtain a response at all (DNS, TCP, TLS, IO) map to [`TransportError`].
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches `request` and resolves with the complete response.
	fn send(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// HTTP methods used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully resolved outbound call handed to an [`ApiTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	/// Request method.
	pub method: Method,
	/// Absolute request URL, query string included.
	pub url: Url,
	/// Request headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
	/// Serialized request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: BTreeMap::new(), body: None }
	}

	/// Sets a header, replacing any previous value with the same (case-insensitive) name.
	pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
		self.headers.insert(name.to_ascii_lowercase(), value.into());
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Returns the `Authorization` header value, if any.
	pub fn authorization(&self) -> Option<&str> {
		self.header(AUTHORIZATION)
	}
}

/// Complete response returned by an [`ApiTransport`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response with the given status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Creates a JSON response.
	pub fn json(status: u16, body: &serde_json::Value) -> Self {
		let mut response = Self::new(status, body.to_string());

		response.headers.insert(CONTENT_TYPE.into(), JSON_CONTENT_TYPE.into());

		response
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Decodes the body lossily as UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Parses the `Retry-After` header as a relative duration.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(self.header(RETRY_AFTER)?)
	}
}

pub(crate) const AUTHORIZATION: &str = "authorization";
pub(crate) const CONTENT_TYPE: &str = "content-type";
pub(crate) const JSON_CONTENT_TYPE: &str = "application/json";
const RETRY_AFTER: &str = "retry-after";

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

fn parse_retry_after(raw: &str) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn headers_are_case_insensitive() {
		let url = Url::parse("http://localhost:8000/api/users/me/").expect("Fixture URL should parse.");
		let mut request = ApiRequest::new(Method::Get, url);

		request.set_header("Authorization", "Bearer A1");
		request.set_header("AUTHORIZATION", "Bearer A2");

		assert_eq!(request.headers.len(), 1);
		assert_eq!(request.authorization(), Some("Bearer A2"));
	}

	#[test]
	fn retry_after_accepts_seconds_and_rejects_garbage() {
		let mut response = ApiResponse::new(429, Vec::new());

		response.headers.insert(RETRY_AFTER.into(), " 30 ".into());

		assert_eq!(response.retry_after(), Some(Duration::seconds(30)));

		response.headers.insert(RETRY_AFTER.into(), "soon".into());

		assert_eq!(response.retry_after(), None);
		assert_eq!(parse_retry_after("Mon, 01 Jan 2001 00:00:00 +0000"), None);
	}

	#[test]
	fn json_response_sets_content_type() {
		let response = ApiResponse::json(200, &serde_json::json!({ "ok": true }));

		assert!(response.is_success());
		assert_eq!(response.header("Content-Type"), Some(JSON_CONTENT_TYPE));
		assert_eq!(response.text(), "{\"ok\":true}");
	}

	#[test]
	fn method_labels_are_upper_case() {
		assert_eq!(Method::Patch.to_string(), "PATCH");
		assert_eq!(
			serde_json::to_string(&Method::Delete).expect("Method should serialize."),
			"\"DELETE\"",
		);
	}
}

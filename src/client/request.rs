//! Request options, the authenticated request pipeline, and method shortcuts.

// crates.io
use serde::de::DeserializeOwned;
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::ApiClient,
	error::{ConfigError, HttpError},
	http::{
		AUTHORIZATION, ApiRequest, ApiResponse, ApiTransport, CONTENT_TYPE, JSON_CONTENT_TYPE,
		Method,
	},
	obs::{self, OpKind},
};

/// Description of one API call before it is resolved against the client configuration.
#[derive(Clone, Debug)]
pub struct RequestOptions {
	/// Request method.
	pub method: Method,
	/// Path relative to the API base URL.
	pub path: String,
	/// JSON request body.
	pub body: Option<serde_json::Value>,
	/// Query parameters appended in order.
	pub query: Vec<(String, String)>,
	/// Extra headers merged over the defaults.
	pub headers: BTreeMap<String, String>,
	/// Attaches the stored access token and enables 401 recovery when `true`.
	pub attach_auth: bool,
	/// Per-request deadline overriding [`crate::config::ClientConfig::request_timeout`].
	pub timeout: Option<Duration>,
}
impl RequestOptions {
	/// Creates authenticated options for `method` + `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			body: None,
			query: Vec::new(),
			headers: BTreeMap::new(),
			attach_auth: true,
			timeout: None,
		}
	}

	/// Sets the JSON body.
	pub fn json(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Serializes `body` and sets it as the JSON body.
	pub fn try_json<B>(self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		Ok(self.json(serde_json::to_value(body)?))
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Sends the request without a bearer token; its 401s are never intercepted.
	pub fn without_auth(mut self) -> Self {
		self.attach_auth = false;

		self
	}

	/// Overrides the deadline for this request; negative values clamp to zero.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(if timeout.is_negative() { Duration::ZERO } else { timeout });

		self
	}
}

struct Attempt {
	request: ApiRequest,
	retried: bool,
}

enum Disposition {
	Done,
	Refresh,
}

/// Point after which a request stops waiting on the transport or on someone else's refresh.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Deadline {
	at: Instant,
	after: Duration,
}
impl Deadline {
	fn start(after: Duration) -> Self {
		Self { at: Instant::now() + after.unsigned_abs(), after }
	}

	/// Runs `fut`, failing with [`Error::Timeout`] once the deadline passes.
	pub(crate) async fn bound<R, Fut>(deadline: Option<Self>, fut: Fut) -> Result<R>
	where
		Fut: Future<Output = Result<R>>,
	{
		match deadline {
			Some(Self { at, after }) => tokio::time::timeout_at(at, fut)
				.await
				.unwrap_or_else(|_| Err(Error::Timeout { after })),
			None => fut.await,
		}
	}

	pub(crate) fn check(deadline: Option<Self>) -> Result<()> {
		match deadline {
			Some(Self { at, after }) if Instant::now() >= at => Err(Error::Timeout { after }),
			_ => Ok(()),
		}
	}
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Executes `options` and returns the parsed JSON body (`null` for empty bodies).
	pub async fn request(&self, options: RequestOptions) -> Result<serde_json::Value> {
		self.request_json(options).await
	}

	/// Executes `options` and deserializes the body into `R`.
	pub async fn request_json<R>(&self, options: RequestOptions) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let path = options.path.clone();
		let response = self.execute(options).await?;

		decode(&path, &response)
	}

	/// Executes `options` and returns the raw 2xx response.
	///
	/// Non-2xx responses become [`Error::Http`] unless a first-time 401 is recovered by a refresh.
	/// The timeout covers the transport calls and any wait behind another request's refresh.
	pub async fn execute(&self, options: RequestOptions) -> Result<ApiResponse> {
		let deadline = options.timeout.or(self.config.request_timeout).map(Deadline::start);

		obs::observe(OpKind::Request, "execute", self.dispatch(options, deadline)).await
	}

	/// Authenticated `GET`.
	pub async fn get(&self, path: &str) -> Result<serde_json::Value> {
		self.request(RequestOptions::new(Method::Get, path)).await
	}

	/// Authenticated `POST` with a JSON body.
	pub async fn post<B>(&self, path: &str, body: &B) -> Result<serde_json::Value>
	where
		B: ?Sized + Serialize,
	{
		self.request(RequestOptions::new(Method::Post, path).try_json(body)?).await
	}

	/// Authenticated `PUT` with a JSON body.
	pub async fn put<B>(&self, path: &str, body: &B) -> Result<serde_json::Value>
	where
		B: ?Sized + Serialize,
	{
		self.request(RequestOptions::new(Method::Put, path).try_json(body)?).await
	}

	/// Authenticated `PATCH` with a JSON body.
	pub async fn patch<B>(&self, path: &str, body: &B) -> Result<serde_json::Value>
	where
		B: ?Sized + Serialize,
	{
		self.request(RequestOptions::new(Method::Patch, path).try_json(body)?).await
	}

	/// Authenticated `DELETE`.
	pub async fn delete(&self, path: &str) -> Result<serde_json::Value> {
		self.request(RequestOptions::new(Method::Delete, path)).await
	}

	async fn dispatch(
		&self,
		options: RequestOptions,
		deadline: Option<Deadline>,
	) -> Result<ApiResponse> {
		let mut attempt = self.prepare(&options).await?;

		loop {
			let response = Deadline::bound(deadline, async {
				self.transport.send(attempt.request.clone()).await.map_err(Error::from)
			})
			.await?;

			obs::record_response_status(response.status);

			match self.classify(&options, &attempt, &response) {
				Disposition::Done => return finish(&options, response),
				Disposition::Refresh => {
					attempt.retried = true;

					let stored = self.store.load().await?;

					if stored.refresh.is_none() {
						// Another writer may have stored a newer token since this request went out.
						if stored.access.as_ref().map(TokenSecret::bearer).as_deref()
							== attempt.request.authorization()
						{
							#[cfg(feature = "tracing")]
							tracing::debug!(path = %options.path, "No refresh token stored; ending the session.");

							self.store.clear().await?;
						}

						return finish(&options, response);
					}

					let access = self.await_refreshed_access(deadline).await?;

					// A leader finishes its refresh for the waiters even after its own deadline.
					Deadline::check(deadline)?;
					attempt.request.set_header(AUTHORIZATION, access.bearer());
				},
			}
		}
	}

	async fn prepare(&self, options: &RequestOptions) -> Result<Attempt> {
		let mut url = self.config.endpoint(&options.path)?;

		if !options.query.is_empty() {
			let mut pairs = url.query_pairs_mut();

			for (key, value) in &options.query {
				pairs.append_pair(key, value);
			}
		}

		let mut request = ApiRequest::new(options.method, url);

		if let Some(body) = &options.body {
			request.set_header(CONTENT_TYPE, JSON_CONTENT_TYPE);
			request.body = Some(serde_json::to_vec(body).map_err(ConfigError::from)?);
		}
		for (name, value) in &options.headers {
			request.set_header(name, value.clone());
		}
		if options.attach_auth {
			if let Some(access) = self.store.access().await? {
				request.set_header(AUTHORIZATION, access.bearer());
			}
		}

		Ok(Attempt { request, retried: false })
	}

	fn classify(
		&self,
		options: &RequestOptions,
		attempt: &Attempt,
		response: &ApiResponse,
	) -> Disposition {
		if response.status == 401
			&& options.attach_auth
			&& !attempt.retried
			&& !self.config.is_refresh_path(&options.path)
		{
			Disposition::Refresh
		} else {
			Disposition::Done
		}
	}
}

fn finish(options: &RequestOptions, response: ApiResponse) -> Result<ApiResponse> {
	if response.is_success() {
		return Ok(response);
	}

	Err(HttpError {
		method: options.method,
		path: options.path.clone(),
		status: response.status,
		body: response.text(),
		retry_after: response.retry_after(),
	}
	.into())
}

fn decode<R>(path: &str, response: &ApiResponse) -> Result<R>
where
	R: DeserializeOwned,
{
	let body: &[u8] =
		if response.body.iter().all(u8::is_ascii_whitespace) { b"null" } else { &response.body };
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| Error::ResponseParse {
		path: path.to_owned(),
		status: response.status,
		source,
	})
}

//! Client-level error types shared across the request pipeline, refresh coordinator, and stores.

// self
use crate::{_prelude::*, http::Method};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Non-2xx response that the client did not recover from.
	#[error(transparent)]
	Http(#[from] HttpError),
	/// The access token expired and could not be renewed.
	#[error(transparent)]
	Refresh(#[from] RefreshError),

	/// A 2xx response carried a body that could not be parsed into the requested type.
	#[error("Response body from `{path}` could not be parsed.")]
	ResponseParse {
		/// Request path relative to the API base.
		path: String,
		/// HTTP status code of the response.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The request did not settle within its deadline.
	///
	/// A request leading a refresh still finishes that refresh before reporting this.
	#[error("Request did not complete within {after}.")]
	Timeout {
		/// Deadline that elapsed.
		after: Duration,
	},
}
impl Error {
	/// Returns the HTTP status carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Http(err) => Some(err.status),
			Self::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
			Self::ResponseParse { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Returns `true` when the caller should treat the session as logged out.
	pub fn is_auth_failure(&self) -> bool {
		match self {
			Self::Http(err) => err.is_unauthorized(),
			Self::Refresh(err) => err.ends_session(),
			_ => false,
		}
	}
}

/// Configuration and validation failures raised while building a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than HTTP(S) or cannot carry a path.
	#[error("Base URL must be an http(s) URL that can carry a path: {url}.")]
	UnsupportedBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// An endpoint path cannot be joined onto the base URL.
	#[error("Path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Non-2xx response surfaced to the caller unchanged.
#[derive(Clone, Debug, ThisError)]
#[error("{method} `{path}` failed with HTTP {status}.")]
pub struct HttpError {
	/// Request method.
	pub method: Method,
	/// Request path relative to the API base.
	pub path: String,
	/// HTTP status code.
	pub status: u16,
	/// Response body, decoded lossily as UTF-8.
	pub body: String,
	/// Retry-After hint from upstream, if supplied.
	pub retry_after: Option<Duration>,
}
impl HttpError {
	/// Returns `true` for HTTP 401 responses.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Parses the body as JSON, returning `None` for non-JSON payloads.
	pub fn json_body(&self) -> Option<serde_json::Value> {
		serde_json::from_str(&self.body).ok()
	}
}

/// Failure of a token refresh; shared verbatim with every request waiting on that refresh.
#[derive(Clone, Debug, ThisError)]
pub enum RefreshError {
	/// No refresh token is stored, so the session cannot be renewed.
	#[error("No refresh token is available.")]
	MissingRefreshToken,
	/// The refresh endpoint answered with a non-2xx status.
	#[error("Refresh endpoint rejected the refresh token with HTTP {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Response body, decoded lossily as UTF-8.
		body: String,
	},
	/// The refresh call failed at the transport layer.
	#[error("Refresh call failed at the transport layer.")]
	Transport {
		/// Shared transport failure.
		#[source]
		source: Arc<TransportError>,
	},
	/// The refresh endpoint returned a body without a usable access token.
	#[error("Refresh endpoint returned a malformed body.")]
	MalformedResponse {
		/// Shared parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// The new token could not be written to the store.
	#[error("Refreshed token could not be stored: {0}")]
	Storage(#[from] crate::store::StoreError),
	/// The request driving the refresh was dropped before the refresh settled.
	///
	/// Requests inside the client never see this; they take the refresh over instead.
	#[error("Refresh was abandoned before it settled.")]
	Abandoned,
}
impl RefreshError {
	/// Returns `true` when the refresh attempt proved the session unusable.
	///
	/// Storage failures and abandoned refreshes say nothing about the tokens themselves, so they
	/// leave the session in place.
	pub fn ends_session(&self) -> bool {
		!matches!(self, Self::Storage(_) | Self::Abandoned)
	}
}
impl From<TransportError> for RefreshError {
	fn from(e: TransportError) -> Self {
		Self::Transport { source: Arc::new(e) }
	}
}

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, StatusCode};
use std::borrow::Cow;

/// HTTP Response representation
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	/// Create a new Response with the given status code
	///
	/// # Examples
	///
	/// ```
	/// use bow_http::{Response, StatusCode};
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	pub fn bad_request() -> Self {
		Self::new(StatusCode::BAD_REQUEST)
	}

	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR)
	}

	/// Plain-text error response.
	///
	/// The body is terminated by a newline and the response is marked
	/// `nosniff` so browsers never interpret it as markup.
	///
	/// # Examples
	///
	/// ```
	/// use bow_http::{Response, StatusCode};
	///
	/// let response = Response::text_error(StatusCode::NOT_FOUND, "Not Found");
	/// assert_eq!(response.body_str(), "Not Found\n");
	/// assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
	/// ```
	pub fn text_error(status: StatusCode, message: &str) -> Self {
		Self::new(status)
			.with_content_type("text/plain; charset=utf-8")
			.with_header("x-content-type-options", "nosniff")
			.with_body(format!("{message}\n"))
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Set a header, replacing existing values. Invalid names or values are ignored.
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let Some((name, value)) = header_pair(name, value) {
			self.headers.insert(name, value);
		}
		self
	}

	/// Add a header value without replacing existing ones, as needed for `Set-Cookie`.
	pub fn append_header(&mut self, name: &str, value: &str) {
		if let Some((name, value)) = header_pair(name, value) {
			self.headers.append(name, value);
		}
	}

	pub fn with_content_type(self, content_type: &str) -> Self {
		self.with_header(hyper::header::CONTENT_TYPE.as_str(), content_type)
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Body decoded as UTF-8, lossily.
	pub fn body_str(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}
}

fn header_pair(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
	let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
	let value = HeaderValue::from_str(value).ok()?;
	Some((name, value))
}

impl From<crate::Error> for Response {
	fn from(error: crate::Error) -> Self {
		let status = error.status_code();
		Response::text_error(status, status.canonical_reason().unwrap_or("Error"))
	}
}

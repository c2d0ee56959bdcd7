//! Incoming HTTP request.

mod methods;

use bytes::Bytes;
use hyper::{HeaderMap, Method, Uri, Version};
use std::net::SocketAddr;

use crate::{Error, Extensions, Result};

/// HTTP request as seen by handlers and middleware.
///
/// The body is fully buffered. Cloning is cheap: the body is reference
/// counted and the extensions are shared between clones.
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	body: Bytes,
	remote_addr: Option<SocketAddr>,
	is_secure: bool,
	pub extensions: Extensions,
}

impl Request {
	/// Start building a request.
	///
	/// # Examples
	///
	/// ```
	/// use bow_http::{Method, Request};
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("/users?page=2")
	///     .header("content-type", "application/x-www-form-urlencoded")
	///     .body("name=alice")
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.path(), "/users");
	/// assert_eq!(request.form_value("name").as_deref(), Some("alice"));
	/// assert_eq!(request.form_value("page").as_deref(), Some("2"));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	pub fn body(&self) -> &Bytes {
		&self.body
	}

	pub fn path(&self) -> &str {
		self.uri.path()
	}

	pub fn query(&self) -> Option<&str> {
		self.uri.query()
	}

	pub fn remote_addr(&self) -> Option<SocketAddr> {
		self.remote_addr
	}

	/// First value of the named header, if it is valid visible ASCII.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}
}

/// Builder for [`Request`].
#[derive(Debug, Default)]
pub struct RequestBuilder {
	method: Option<Method>,
	uri: Option<String>,
	version: Option<Version>,
	headers: HeaderMap,
	body: Bytes,
	remote_addr: Option<SocketAddr>,
	is_secure: bool,
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	pub fn version(mut self, version: Version) -> Self {
		self.version = Some(version);
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	/// Append a header. Invalid names or values are ignored.
	pub fn header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			hyper::header::HeaderName::from_bytes(name.as_bytes()),
			hyper::header::HeaderValue::from_str(value),
		) {
			self.headers.append(name, value);
		}
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
		self.remote_addr = Some(addr);
		self
	}

	pub fn secure(mut self, is_secure: bool) -> Self {
		self.is_secure = is_secure;
		self
	}

	/// Finish the request.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidUri`] when the URI does not parse.
	pub fn build(self) -> Result<Request> {
		let uri = match self.uri {
			Some(uri) => uri
				.parse::<Uri>()
				.map_err(|e| Error::InvalidUri(format!("{uri}: {e}")))?,
			None => Uri::from_static("/"),
		};

		Ok(Request {
			method: self.method.unwrap_or(Method::GET),
			uri,
			version: self.version.unwrap_or(Version::HTTP_11),
			headers: self.headers,
			body: self.body,
			remote_addr: self.remote_addr,
			is_secure: self.is_secure,
			extensions: Extensions::new(),
		})
	}
}

//! Protective response headers.

use async_trait::async_trait;
use bow_http::{Handler, Middleware, Request, Response, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Secure header configuration
#[derive(Debug, Clone)]
pub struct SecureHeadersConfig {
	/// CSP directives (e.g., "default-src", "img-src"), rendered in name order
	pub csp: BTreeMap<String, String>,
	pub referrer_policy: String,
	pub content_type_options: String,
	pub frame_options: String,
	pub xss_protection: String,
}

impl Default for SecureHeadersConfig {
	fn default() -> Self {
		let mut csp = BTreeMap::new();
		csp.insert("default-src".to_string(), "'self'".to_string());

		Self {
			csp,
			referrer_policy: "origin-when-cross-origin".to_string(),
			content_type_options: "nosniff".to_string(),
			frame_options: "deny".to_string(),
			xss_protection: "0".to_string(),
		}
	}
}

impl SecureHeadersConfig {
	/// Add or replace one CSP directive
	///
	/// # Examples
	///
	/// ```
	/// use bow_middleware::SecureHeadersConfig;
	///
	/// let config = SecureHeadersConfig::default()
	///     .with_csp_directive("img-src", "'self' data:")
	///     .with_csp_directive("default-src", "'none'");
	/// assert_eq!(
	///     config.content_security_policy(),
	///     "default-src 'none'; img-src 'self' data:"
	/// );
	/// ```
	pub fn with_csp_directive(mut self, name: &str, value: &str) -> Self {
		self.csp.insert(name.to_string(), value.to_string());
		self
	}

	/// Merge extra directives over the current ones
	pub fn with_csp_directives<I, K, V>(mut self, directives: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.csp.extend(
			directives
				.into_iter()
				.map(|(name, value)| (name.into(), value.into())),
		);
		self
	}

	/// Build CSP header value
	pub fn content_security_policy(&self) -> String {
		self.csp
			.iter()
			.map(|(name, value)| format!("{} {}", name, value))
			.collect::<Vec<_>>()
			.join("; ")
	}

	fn headers(&self) -> Vec<(&'static str, String)> {
		vec![
			("content-security-policy", self.content_security_policy()),
			("referrer-policy", self.referrer_policy.clone()),
			("x-content-type-options", self.content_type_options.clone()),
			("x-frame-options", self.frame_options.clone()),
			("x-xss-protection", self.xss_protection.clone()),
		]
	}
}

/// Adds the configured secure headers to every response.
///
/// A header the handler already set is left untouched.
#[derive(Debug, Clone)]
pub struct SecureHeadersMiddleware {
	headers: Vec<(&'static str, String)>,
}

impl SecureHeadersMiddleware {
	pub fn new() -> Self {
		Self::with_config(SecureHeadersConfig::default())
	}

	pub fn with_config(config: SecureHeadersConfig) -> Self {
		Self {
			headers: config.headers(),
		}
	}
}

impl Default for SecureHeadersMiddleware {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl Middleware for SecureHeadersMiddleware {
	async fn process(&self, request: Request, handler: Arc<dyn Handler>) -> Result<Response> {
		let mut response = handler.handle(request).await?;

		for (name, value) in &self.headers {
			if !response.headers.contains_key(*name) {
				response = response.with_header(name, value);
			}
		}

		Ok(response)
	}
}

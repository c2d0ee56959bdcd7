//! Double-submit cookie CSRF protection.
//!
//! A random secret lives in the `csrf_token` cookie. Every request gets a
//! freshly masked copy of that secret (see [`csrf_token`]) which templates
//! embed in forms. Unsafe requests must echo a masked token back through the
//! `X-CSRF-Token` header or the `csrf_token` form field; the token is unmasked
//! and compared against the cookie secret in constant time.

use async_trait::async_trait;
use bow_http::{Handler, Method, Middleware, Request, Response, Result, StatusCode, Uri, header};
use rand::Rng;
use std::sync::Arc;

/// CSRF token length (64 characters)
pub const CSRF_TOKEN_LENGTH: usize = 64;

/// CSRF secret length (32 characters)
pub const CSRF_SECRET_LENGTH: usize = 32;

/// Allowed characters for CSRF secrets and tokens
pub const CSRF_ALLOWED_CHARS: &[u8] =
	b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const CSRF_COOKIE_NAME: &str = "csrf_token";
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";
pub const CSRF_FORM_FIELD: &str = "csrf_token";

// Rejection reasons
pub const REASON_NO_CSRF_COOKIE: &str = "CSRF cookie not set.";
pub const REASON_CSRF_TOKEN_MISSING: &str = "CSRF token missing.";
pub const REASON_INCORRECT_TOKEN: &str = "CSRF token incorrect.";
pub const REASON_NO_REFERER: &str = "Referer checking failed - no Referer.";
pub const REASON_MALFORMED_REFERER: &str = "Referer checking failed - Referer is malformed.";
pub const REASON_BAD_REFERER: &str = "Referer checking failed - Referer does not match the host.";

/// CSRF cookie configuration
#[derive(Debug, Clone)]
pub struct CsrfConfig {
	pub cookie_name: String,
	pub cookie_path: String,
	pub cookie_secure: bool,
	pub cookie_httponly: bool,
	pub cookie_max_age: Option<u64>,
}

impl Default for CsrfConfig {
	fn default() -> Self {
		Self {
			cookie_name: CSRF_COOKIE_NAME.to_string(),
			cookie_path: "/".to_string(),
			cookie_secure: false,
			cookie_httponly: true,
			cookie_max_age: Some(365 * 24 * 60 * 60),
		}
	}
}

/// Masked token for the current request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(pub String);

impl CsrfToken {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

/// Masked CSRF token of the request, or an empty string when the request
/// did not pass through [`CsrfMiddleware`].
pub fn csrf_token(request: &Request) -> String {
	request
		.extensions
		.get::<CsrfToken>()
		.map(|token| token.0)
		.unwrap_or_default()
}

fn char_index(c: u8) -> Option<usize> {
	CSRF_ALLOWED_CHARS.iter().position(|&allowed| allowed == c)
}

fn random_chars(len: usize) -> Vec<u8> {
	let mut rng = rand::thread_rng();
	(0..len)
		.map(|_| CSRF_ALLOWED_CHARS[rng.gen_range(0..CSRF_ALLOWED_CHARS.len())])
		.collect()
}

/// Generate a new random secret
pub fn generate_secret() -> String {
	random_chars(CSRF_SECRET_LENGTH)
		.into_iter()
		.map(char::from)
		.collect()
}

fn is_well_formed(value: &str, len: usize) -> bool {
	value.len() == len && value.bytes().all(|c| char_index(c).is_some())
}

/// Mask a CSRF secret to create a token
///
/// The token is a random mask followed by the secret shifted by the mask, so
/// every call yields a different token for the same secret.
pub fn mask_cipher_secret(secret: &str) -> String {
	let mask = random_chars(CSRF_SECRET_LENGTH);
	let n = CSRF_ALLOWED_CHARS.len();

	let masked: Vec<u8> = secret
		.bytes()
		.zip(&mask)
		.map(|(s, &m)| {
			let s_idx = char_index(s).unwrap_or(0);
			let m_idx = char_index(m).unwrap_or(0);
			CSRF_ALLOWED_CHARS[(s_idx + m_idx) % n]
		})
		.collect();

	mask.iter().chain(&masked).copied().map(char::from).collect()
}

/// Unmask a CSRF token to get the secret.
///
/// Returns `None` when the token has the wrong length or foreign characters.
pub fn unmask_cipher_token(token: &str) -> Option<String> {
	if !is_well_formed(token, CSRF_TOKEN_LENGTH) {
		return None;
	}

	let n = CSRF_ALLOWED_CHARS.len();
	let (mask, masked) = token.as_bytes().split_at(CSRF_SECRET_LENGTH);

	mask.iter()
		.zip(masked)
		.map(|(&m, &c)| {
			let m_idx = char_index(m)?;
			let c_idx = char_index(c)?;
			Some(char::from(CSRF_ALLOWED_CHARS[(c_idx + n - m_idx) % n]))
		})
		.collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	if a.len() != b.len() {
		return false;
	}
	a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Check a submitted token against the cookie secret
pub fn check_token(request_token: &str, secret: &str) -> bool {
	unmask_cipher_token(request_token)
		.is_some_and(|unmasked| constant_time_eq(unmasked.as_bytes(), secret.as_bytes()))
}

fn is_safe_method(method: &Method) -> bool {
	matches!(
		*method,
		Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
	)
}

/// CSRF protection middleware
#[derive(Debug, Clone, Default)]
pub struct CsrfMiddleware {
	config: CsrfConfig,
}

impl CsrfMiddleware {
	/// Create new CSRF middleware with default configuration
	///
	/// # Examples
	///
	/// ```
	/// use bow_http::{Middleware, Request, Response, handler_fn};
	/// use bow_middleware::CsrfMiddleware;
	/// use std::sync::Arc;
	///
	/// # tokio_test::block_on(async {
	/// let middleware = CsrfMiddleware::new();
	/// let handler = Arc::new(handler_fn(|_req| async { Ok(Response::ok()) }));
	///
	/// let request = Request::builder().uri("/form").build().unwrap();
	/// let response = middleware.process(request, handler).await.unwrap();
	/// assert!(response.headers.contains_key("set-cookie"));
	/// # });
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	/// Create middleware with custom configuration
	pub fn with_config(config: CsrfConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &CsrfConfig {
		&self.config
	}

	/// Secret from the request cookie, if it is well formed
	fn cookie_secret(&self, request: &Request) -> Option<String> {
		request
			.cookie(&self.config.cookie_name)
			.filter(|secret| is_well_formed(secret, CSRF_SECRET_LENGTH))
	}

	/// Extract the submitted token, header first
	fn submitted_token(request: &Request) -> Option<String> {
		request
			.header(CSRF_HEADER_NAME)
			.map(str::to_string)
			.filter(|token| !token.is_empty())
			.or_else(|| request.form_value(CSRF_FORM_FIELD))
	}

	/// Referer must be present and share the origin of a secure request.
	fn check_referer(request: &Request) -> std::result::Result<(), &'static str> {
		let referer = request.header("referer").ok_or(REASON_NO_REFERER)?;
		let referer: Uri = referer.parse().map_err(|_| REASON_MALFORMED_REFERER)?;

		let same_origin = referer.scheme_str() == Some(request.scheme())
			&& referer.authority().map(|a| a.as_str()) == request.host();
		if !same_origin {
			return Err(REASON_BAD_REFERER);
		}

		Ok(())
	}

	fn verify(
		&self,
		request: &Request,
		secret: Option<&str>,
	) -> std::result::Result<(), &'static str> {
		if request.is_secure() {
			Self::check_referer(request)?;
		}

		let secret = secret.ok_or(REASON_NO_CSRF_COOKIE)?;
		let token = Self::submitted_token(request).ok_or(REASON_CSRF_TOKEN_MISSING)?;

		if !check_token(&token, secret) {
			return Err(REASON_INCORRECT_TOKEN);
		}

		Ok(())
	}

	/// Build Set-Cookie header
	fn build_set_cookie_header(&self, secret: &str) -> String {
		let mut cookie = format!(
			"{}={}; Path={}",
			self.config.cookie_name, secret, self.config.cookie_path
		);

		if let Some(max_age) = self.config.cookie_max_age {
			cookie.push_str(&format!("; Max-Age={}", max_age));
		}

		if self.config.cookie_httponly {
			cookie.push_str("; HttpOnly");
		}

		if self.config.cookie_secure {
			cookie.push_str("; Secure");
		}

		cookie
	}

	fn finish(&self, mut response: Response, new_secret: Option<&str>) -> Response {
		response.append_header(header::VARY.as_str(), "Cookie");
		if let Some(secret) = new_secret {
			response.append_header(
				header::SET_COOKIE.as_str(),
				&self.build_set_cookie_header(secret),
			);
		}
		response
	}
}

#[async_trait]
impl Middleware for CsrfMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let existing = self.cookie_secret(&request);

		if !is_safe_method(&request.method)
			&& let Err(reason) = self.verify(&request, existing.as_deref())
		{
			tracing::warn!(
				method = %request.method,
				path = request.path(),
				reason,
				"CSRF verification failed"
			);
			let response = Response::text_error(StatusCode::BAD_REQUEST, "Bad Request");
			return Ok(self.finish(response, None));
		}

		let (secret, is_new) = match existing {
			Some(secret) => (secret, false),
			None => (generate_secret(), true),
		};

		request
			.extensions
			.insert(CsrfToken(mask_cipher_secret(&secret)));

		let response = next.handle(request).await?;
		Ok(self.finish(response, is_new.then_some(secret.as_str())))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bow_http::handler_fn;
	use rstest::rstest;

	const SECRET: &str = "abcdefghijklmnopqrstuvwxyz012345";

	fn echo_token() -> Arc<dyn Handler> {
		Arc::new(handler_fn(|req: Request| async move {
			Ok(Response::ok().with_body(csrf_token(&req)))
		}))
	}

	#[rstest]
	fn test_mask_unmask() {
		let token = mask_cipher_secret(SECRET);
		assert_eq!(token.len(), CSRF_TOKEN_LENGTH);
		assert_eq!(unmask_cipher_token(&token).as_deref(), Some(SECRET));
	}

	#[rstest]
	fn test_masking_is_randomized() {
		assert_ne!(mask_cipher_secret(SECRET), mask_cipher_secret(SECRET));
	}

	#[rstest]
	#[case("short")]
	#[case("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-!")]
	fn test_unmask_rejects_malformed(#[case] token: &str) {
		assert_eq!(unmask_cipher_token(token), None);
	}

	#[rstest]
	fn test_generated_secret_format() {
		let secret = generate_secret();
		assert!(is_well_formed(&secret, CSRF_SECRET_LENGTH));
	}

	#[rstest]
	fn test_constant_time_eq() {
		assert!(constant_time_eq(b"abc", b"abc"));
		assert!(!constant_time_eq(b"abc", b"abd"));
		assert!(!constant_time_eq(b"abc", b"ab"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_safe_request_sets_cookie_and_token() {
		let request = Request::builder().uri("/").build().unwrap();
		let response = CsrfMiddleware::new().process(request, echo_token()).await.unwrap();

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(response.body.len(), CSRF_TOKEN_LENGTH);
		let cookie = response.header("set-cookie").unwrap();
		assert!(cookie.starts_with("csrf_token="));
		assert!(cookie.contains("HttpOnly"));
		assert_eq!(response.header("vary"), Some("Cookie"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_existing_cookie_is_reused() {
		let request = Request::builder()
			.uri("/")
			.header("cookie", &format!("csrf_token={SECRET}"))
			.build()
			.unwrap();
		let response = CsrfMiddleware::new().process(request, echo_token()).await.unwrap();

		assert!(response.header("set-cookie").is_none());
		let token = response.body_str().into_owned();
		assert_eq!(unmask_cipher_token(&token).as_deref(), Some(SECRET));
	}

	#[rstest]
	#[tokio::test]
	async fn test_post_without_token_is_rejected() {
		let request = Request::builder()
			.method(Method::POST)
			.uri("/")
			.header("cookie", &format!("csrf_token={SECRET}"))
			.build()
			.unwrap();
		let response = CsrfMiddleware::new().process(request, echo_token()).await.unwrap();

		assert_eq!(response.status, StatusCode::BAD_REQUEST);
	}

	#[rstest]
	#[tokio::test]
	async fn test_post_with_header_token_passes() {
		let request = Request::builder()
			.method(Method::POST)
			.uri("/")
			.header("cookie", &format!("csrf_token={SECRET}"))
			.header("x-csrf-token", &mask_cipher_secret(SECRET))
			.build()
			.unwrap();
		let response = CsrfMiddleware::new().process(request, echo_token()).await.unwrap();

		assert_eq!(response.status, StatusCode::OK);
	}

	#[rstest]
	#[tokio::test]
	async fn test_post_with_form_token_passes() {
		let body = format!("csrf_token={}&name=x", mask_cipher_secret(SECRET));
		let request = Request::builder()
			.method(Method::POST)
			.uri("/")
			.header("cookie", &format!("csrf_token={SECRET}"))
			.header("content-type", "application/x-www-form-urlencoded")
			.body(body)
			.build()
			.unwrap();
		let response = CsrfMiddleware::new().process(request, echo_token()).await.unwrap();

		assert_eq!(response.status, StatusCode::OK);
	}

	#[rstest]
	#[tokio::test]
	async fn test_token_for_other_secret_is_rejected() {
		let other = generate_secret();
		let request = Request::builder()
			.method(Method::DELETE)
			.uri("/")
			.header("cookie", &format!("csrf_token={SECRET}"))
			.header("x-csrf-token", &mask_cipher_secret(&other))
			.build()
			.unwrap();
		let response = CsrfMiddleware::new().process(request, echo_token()).await.unwrap();

		assert_eq!(response.status, StatusCode::BAD_REQUEST);
	}

	#[rstest]
	#[case(None, StatusCode::BAD_REQUEST)]
	#[case(Some("https://evil.example/form"), StatusCode::BAD_REQUEST)]
	#[case(Some("https://app.example/form"), StatusCode::OK)]
	#[tokio::test]
	async fn test_secure_request_checks_referer(
		#[case] referer: Option<&str>,
		#[case] expected: StatusCode,
	) {
		let mut builder = Request::builder()
			.method(Method::POST)
			.uri("/submit")
			.secure(true)
			.header("host", "app.example")
			.header("cookie", &format!("csrf_token={SECRET}"))
			.header("x-csrf-token", &mask_cipher_secret(SECRET));
		if let Some(referer) = referer {
			builder = builder.header("referer", referer);
		}
		let request = builder.build().unwrap();

		let response = CsrfMiddleware::new().process(request, echo_token()).await.unwrap();
		assert_eq!(response.status, expected);
	}
}

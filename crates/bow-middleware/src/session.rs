//! Encrypted cookie sessions.
//!
//! Session values live entirely in the client cookie. The payload is JSON,
//! sealed with AES-256-GCM under a 32-byte application key, with the random
//! nonce prepended and the whole thing URL-safe base64 encoded. The cookie
//! name is bound as associated data, so a value cannot be replayed under
//! another cookie.

use aes_gcm::{
	Aes256Gcm, Nonce,
	aead::{Aead, KeyInit, Payload},
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bow_http::{Error, Handler, Middleware, Request, Response, Result, header};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Required session key length in bytes (AES-256)
pub const SESSION_KEY_LENGTH: usize = 32;

/// Largest `Set-Cookie` value a session may produce; browsers drop longer ones
pub const MAX_COOKIE_SIZE: usize = 4096;

const NONCE_LENGTH: usize = 12;

/// The session key does not have [`SESSION_KEY_LENGTH`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("session key must be {SESSION_KEY_LENGTH} bytes long, got {0}")]
pub struct InvalidSessionKey(pub usize);

/// Session cookie configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
	/// Cookie name
	pub cookie_name: String,
	/// Lifetime of a session, counted from its creation
	pub ttl: Duration,
	/// HTTPS-only cookie
	pub secure: bool,
	/// HttpOnly flag
	pub http_only: bool,
	/// SameSite attribute
	pub same_site: Option<String>,
	/// Domain
	pub domain: Option<String>,
	/// Path
	pub path: String,
}

impl SessionConfig {
	/// Create a new configuration
	///
	/// # Examples
	///
	/// ```
	/// use std::time::Duration;
	/// use bow_middleware::SessionConfig;
	///
	/// let config = SessionConfig::new("session".to_string(), Duration::from_secs(3600));
	/// assert_eq!(config.cookie_name, "session");
	/// assert!(config.http_only);
	/// ```
	pub fn new(cookie_name: String, ttl: Duration) -> Self {
		Self {
			cookie_name,
			ttl,
			secure: false,
			http_only: true,
			same_site: Some("Lax".to_string()),
			domain: None,
			path: "/".to_string(),
		}
	}

	/// Enable secure cookie
	pub fn with_secure(mut self) -> Self {
		self.secure = true;
		self
	}

	pub fn with_same_site(mut self, same_site: String) -> Self {
		self.same_site = Some(same_site);
		self
	}

	pub fn with_domain(mut self, domain: String) -> Self {
		self.domain = Some(domain);
		self
	}

	pub fn with_path(mut self, path: String) -> Self {
		self.path = path;
		self
	}
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self::new("session".to_string(), Duration::from_secs(12 * 60 * 60))
	}
}

/// Serialized form of a session, as stored in the cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionPayload {
	deadline: DateTime<Utc>,
	values: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
	Unmodified,
	Modified,
	Destroyed,
}

#[derive(Debug)]
struct SessionState {
	deadline: DateTime<Utc>,
	values: HashMap<String, serde_json::Value>,
	status: Status,
}

/// Handle to the session of the current request.
///
/// Inserted into request extensions by [`SessionMiddleware`]. Clones share
/// state, so changes made by a handler are seen by the middleware when it
/// writes the response cookie.
#[derive(Clone)]
pub struct Session {
	state: Arc<Mutex<SessionState>>,
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("Session")
			.field("deadline", &state.deadline)
			.field("keys", &state.values.keys().collect::<Vec<_>>())
			.field("status", &state.status)
			.finish()
	}
}

impl Session {
	fn fresh(ttl: Duration) -> Self {
		let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
		let deadline = Utc::now()
			.checked_add_signed(ttl)
			.unwrap_or(DateTime::<Utc>::MAX_UTC);
		Self::from_payload(SessionPayload {
			deadline,
			values: HashMap::new(),
		})
	}

	fn from_payload(payload: SessionPayload) -> Self {
		Self {
			state: Arc::new(Mutex::new(SessionState {
				deadline: payload.deadline,
				values: payload.values,
				status: Status::Unmodified,
			})),
		}
	}

	/// Session of the request, if it passed through [`SessionMiddleware`].
	pub fn from_request(request: &Request) -> Option<Self> {
		request.extensions.get::<Session>()
	}

	/// Get a value
	pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		let state = self.state.lock();
		state
			.values
			.get(key)
			.and_then(|v| serde_json::from_value(v.clone()).ok())
	}

	/// Get a string value; `None` when absent or not a string.
	pub fn get_string(&self, key: &str) -> Option<String> {
		self.get::<String>(key)
	}

	/// Set a value
	pub fn put<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
		let value = serde_json::to_value(value)?;
		let mut state = self.state.lock();
		state.values.insert(key.to_string(), value);
		state.status = Status::Modified;
		Ok(())
	}

	/// Remove a value and return it
	pub fn pop<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		let mut state = self.state.lock();
		let value = state.values.remove(key)?;
		state.status = Status::Modified;
		serde_json::from_value(value).ok()
	}

	pub fn pop_string(&self, key: &str) -> Option<String> {
		self.pop::<String>(key)
	}

	/// Delete a value
	pub fn remove(&self, key: &str) {
		let mut state = self.state.lock();
		if state.values.remove(key).is_some() {
			state.status = Status::Modified;
		}
	}

	pub fn contains(&self, key: &str) -> bool {
		self.state.lock().values.contains_key(key)
	}

	/// Drop all values and expire the cookie.
	pub fn destroy(&self) {
		let mut state = self.state.lock();
		state.values.clear();
		state.status = Status::Destroyed;
	}

	pub fn is_modified(&self) -> bool {
		self.state.lock().status != Status::Unmodified
	}

	pub fn deadline(&self) -> DateTime<Utc> {
		self.state.lock().deadline
	}

	fn snapshot(&self) -> (Status, SessionPayload) {
		let state = self.state.lock();
		(
			state.status,
			SessionPayload {
				deadline: state.deadline,
				values: state.values.clone(),
			},
		)
	}
}

/// Seals and opens session cookies.
#[derive(Clone)]
pub struct SessionManager {
	cipher: Aes256Gcm,
	config: SessionConfig,
}

impl fmt::Debug for SessionManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionManager")
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

impl SessionManager {
	/// Create a manager from a 32-byte key.
	///
	/// # Examples
	///
	/// ```
	/// use bow_middleware::{SessionConfig, SessionManager};
	///
	/// let manager = SessionManager::new(&[7u8; 32], SessionConfig::default()).unwrap();
	/// assert_eq!(manager.config().cookie_name, "session");
	/// assert!(SessionManager::new(b"short", SessionConfig::default()).is_err());
	/// ```
	pub fn new(key: &[u8], config: SessionConfig) -> std::result::Result<Self, InvalidSessionKey> {
		if key.len() != SESSION_KEY_LENGTH {
			return Err(InvalidSessionKey(key.len()));
		}
		let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| InvalidSessionKey(key.len()))?;
		Ok(Self { cipher, config })
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Session carried by the request cookie, or a fresh one when the cookie
	/// is missing, tampered with or expired.
	pub fn load(&self, request: &Request) -> Session {
		request
			.cookie(&self.config.cookie_name)
			.and_then(|value| self.open(&value))
			.filter(|payload| payload.deadline > Utc::now())
			.map(Session::from_payload)
			.unwrap_or_else(|| Session::fresh(self.config.ttl))
	}

	fn seal(&self, payload: &SessionPayload) -> Result<String> {
		let plaintext = serde_json::to_vec(payload)?;

		let mut nonce_bytes = [0u8; NONCE_LENGTH];
		rand::thread_rng().fill_bytes(&mut nonce_bytes);
		let nonce = Nonce::from_slice(&nonce_bytes);

		let ciphertext = self
			.cipher
			.encrypt(
				nonce,
				Payload {
					msg: &plaintext,
					aad: self.config.cookie_name.as_bytes(),
				},
			)
			.map_err(|e| Error::Session(format!("Encryption failed: {}", e)))?;

		let mut sealed = nonce_bytes.to_vec();
		sealed.extend_from_slice(&ciphertext);
		Ok(URL_SAFE_NO_PAD.encode(sealed))
	}

	fn open(&self, value: &str) -> Option<SessionPayload> {
		let sealed = URL_SAFE_NO_PAD.decode(value).ok()?;
		if sealed.len() < NONCE_LENGTH {
			return None;
		}

		let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LENGTH);
		let plaintext = self
			.cipher
			.decrypt(
				Nonce::from_slice(nonce_bytes),
				Payload {
					msg: ciphertext,
					aad: self.config.cookie_name.as_bytes(),
				},
			)
			.map_err(|_| tracing::debug!("discarding session cookie that fails to decrypt"))
			.ok()?;

		serde_json::from_slice(&plaintext).ok()
	}

	/// Build Set-Cookie header
	fn build_cookie_header(&self, value: &str, max_age: i64) -> String {
		let mut parts = vec![format!("{}={}", self.config.cookie_name, value)];

		parts.push(format!("Path={}", self.config.path));

		if let Some(domain) = &self.config.domain {
			parts.push(format!("Domain={}", domain));
		}

		parts.push(format!("Max-Age={}", max_age));

		if self.config.http_only {
			parts.push("HttpOnly".to_string());
		}

		if self.config.secure {
			parts.push("Secure".to_string());
		}

		if let Some(same_site) = &self.config.same_site {
			parts.push(format!("SameSite={}", same_site));
		}

		parts.join("; ")
	}

	/// Set-Cookie value for the session, or `None` when it is unchanged.
	///
	/// # Errors
	///
	/// Returns [`Error::Session`] when the sealed cookie is longer than
	/// [`MAX_COOKIE_SIZE`].
	pub fn set_cookie_header(&self, session: &Session) -> Result<Option<String>> {
		let (status, payload) = session.snapshot();
		match status {
			Status::Unmodified => Ok(None),
			Status::Destroyed => Ok(Some(self.build_cookie_header("", -1))),
			Status::Modified => {
				let max_age = (payload.deadline - Utc::now()).num_seconds().max(1);
				let value = self.seal(&payload)?;
				let cookie = self.build_cookie_header(&value, max_age);
				if cookie.len() > MAX_COOKIE_SIZE {
					return Err(Error::Session(format!(
						"session cookie is {} bytes, over the {MAX_COOKIE_SIZE} byte limit",
						cookie.len()
					)));
				}
				Ok(Some(cookie))
			}
		}
	}
}

/// Session middleware
///
/// Loads the session from the request cookie into request extensions and
/// writes the cookie back when a handler changed the session.
#[derive(Debug, Clone)]
pub struct SessionMiddleware {
	manager: Arc<SessionManager>,
}

impl SessionMiddleware {
	pub fn new(manager: SessionManager) -> Self {
		Self {
			manager: Arc::new(manager),
		}
	}

	pub fn manager(&self) -> &SessionManager {
		&self.manager
	}
}

#[async_trait]
impl Middleware for SessionMiddleware {
	async fn process(&self, request: Request, handler: Arc<dyn Handler>) -> Result<Response> {
		let session = self.manager.load(&request);
		request.extensions.insert(session.clone());

		let mut response = handler.handle(request).await?;

		if let Some(cookie) = self.manager.set_cookie_header(&session)? {
			response.append_header(header::SET_COOKIE.as_str(), &cookie);
			response.append_header(header::VARY.as_str(), "Cookie");
		}

		Ok(response)
	}
}

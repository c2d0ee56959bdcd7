//! Middleware used by bow applications.
//!
//! - [`RecoverMiddleware`]: turns panics and handler errors into error pages
//! - [`LoggingMiddleware`]: one log event per request
//! - [`SecureHeadersMiddleware`]: CSP and other protective headers
//! - [`MethodOverrideMiddleware`]: PUT/PATCH/DELETE from HTML forms
//! - [`CsrfMiddleware`]: double-submit cookie CSRF protection
//! - [`SessionMiddleware`]: encrypted cookie sessions with flash messages

pub mod csrf;
pub mod logging;
pub mod method_override;
pub mod recover;
pub mod security;
pub mod session;

pub use csrf::{CsrfConfig, CsrfMiddleware, CsrfToken, csrf_token};
pub use logging::LoggingMiddleware;
pub use method_override::MethodOverrideMiddleware;
pub use recover::{HandlerPanic, RecoverMiddleware};
pub use security::{SecureHeadersConfig, SecureHeadersMiddleware};
pub use session::{
	InvalidSessionKey, MAX_COOKIE_SIZE, SESSION_KEY_LENGTH, Session, SessionConfig, SessionManager,
	SessionMiddleware,
};

//! Error type shared by handlers and middleware.

use hyper::StatusCode;

/// Errors a handler or middleware can return instead of a response.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Bad request: {0}")]
	BadRequest(String),

	#[error("Forbidden: {0}")]
	Forbidden(String),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Method not allowed: {0}")]
	MethodNotAllowed(String),

	#[error("Invalid URI: {0}")]
	InvalidUri(String),

	#[error("Serialization error: {0}")]
	Serialization(String),

	#[error("Session error: {0}")]
	Session(String),

	#[error("Internal error: {0}")]
	Internal(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	/// Status code this error maps to when turned into a response.
	pub fn status_code(&self) -> StatusCode {
		match self {
			Error::BadRequest(_) | Error::InvalidUri(_) => StatusCode::BAD_REQUEST,
			Error::Forbidden(_) => StatusCode::FORBIDDEN,
			Error::NotFound(_) => StatusCode::NOT_FOUND,
			Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
			Error::Serialization(_) | Error::Session(_) | Error::Internal(_) | Error::Io(_) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}

	/// Returns true when the error describes a problem with the incoming request.
	pub fn is_client_error(&self) -> bool {
		self.status_code().is_client_error()
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;

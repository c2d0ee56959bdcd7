//! HTTP/1 server for bow handlers.

mod error;
mod http;

pub use error::ServerError;
pub use http::{DEFAULT_GRACE_PERIOD, HttpServer, shutdown_signal};

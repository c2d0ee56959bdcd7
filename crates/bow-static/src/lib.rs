//! Static files with content-hashed names.
//!
//! Templates ask [`HashedFiles::hash_name`] for `static/app-<sha256>.css`
//! instead of `static/app.css`; [`FileServer`] maps the hashed name back to
//! the file on disk and, when the hash is current, lets clients cache the
//! response forever.

mod hashed;
mod server;

pub use hashed::{HashedFiles, format_name, parse_name};
pub use server::{CACHE_CONTROL_IMMUTABLE, FileServer, STATIC_DIR};

//! HTTP primitives for bow.
//!
//! This crate provides the request and response types every other bow crate
//! works with, together with the [`Handler`] and [`Middleware`] traits and the
//! chains that compose them, and a small [`Router`].
//!
//! ## Handlers and chains
//!
//! ```rust
//! use bow_http::{Chain, Handler, Request, Response, handler_fn};
//! use std::sync::Arc;
//!
//! # async fn example() -> bow_http::Result<()> {
//! let handler = handler_fn(|_request: Request| async { Ok(Response::ok().with_body("hello")) });
//! let app = Chain::new().then(Arc::new(handler));
//!
//! let request = Request::builder().uri("/").build()?;
//! let response = app.handle(request).await?;
//! assert_eq!(response.body_str(), "hello");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extensions;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;

pub use error::{Error, Result};
pub use extensions::Extensions;
pub use middleware::{Chain, FnHandler, Handler, Middleware, MiddlewareChain, handler_fn};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use router::{PathParams, Router};

pub use bytes::Bytes;
pub use hyper::{HeaderMap, Method, StatusCode, Uri, Version, header};

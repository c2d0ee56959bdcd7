//! Middleware and handler traits for HTTP request processing.
//!
//! ## Handler
//!
//! ```rust
//! use bow_http::{Handler, Request, Response};
//! use async_trait::async_trait;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Handler for Hello {
//!     async fn handle(&self, _request: Request) -> bow_http::Result<Response> {
//!         Ok(Response::ok().with_body("Hello!"))
//!     }
//! }
//! ```
//!
//! ## Middleware
//!
//! ```rust
//! use bow_http::{Handler, Middleware, Request, Response};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct NoCache;
//!
//! #[async_trait]
//! impl Middleware for NoCache {
//!     async fn process(&self, request: Request, next: Arc<dyn Handler>) -> bow_http::Result<Response> {
//!         let response = next.handle(request).await?;
//!         Ok(response.with_header("cache-control", "no-store"))
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::{Request, Response, Result};

/// Handler trait for processing requests.
#[async_trait]
pub trait Handler: Send + Sync {
	/// Handles an HTTP request and produces a response.
	///
	/// # Errors
	///
	/// Returns an error if the request cannot be processed.
	async fn handle(&self, request: Request) -> Result<Response>;
}

/// Blanket implementation for `Arc<T>` where T: Handler.
#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
	async fn handle(&self, request: Request) -> Result<Response> {
		(**self).handle(request).await
	}
}

/// Middleware trait for request/response processing.
///
/// Middleware can modify requests before passing them to the next handler,
/// or modify responses after the handler processed the request.
#[async_trait]
pub trait Middleware: Send + Sync {
	/// Processes a request through this middleware.
	///
	/// # Errors
	///
	/// Returns an error if the middleware or next handler fails.
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response>;

	/// Whether this middleware runs for the given request.
	///
	/// Skipped middleware is left out of the composed chain entirely.
	/// Defaults to `true`.
	fn should_continue(&self, _request: &Request) -> bool {
		true
	}
}

/// Middleware chain - composes multiple middleware into a single handler.
///
/// Middleware runs in the order it was added: the first one added is the
/// outermost and sees the request first and the response last.
pub struct MiddlewareChain {
	middlewares: Vec<Arc<dyn Middleware>>,
	handler: Arc<dyn Handler>,
}

impl MiddlewareChain {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			middlewares: Vec::new(),
			handler,
		}
	}

	pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);
		self
	}

	pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
		self.middlewares.push(middleware);
	}
}

#[async_trait]
impl Handler for MiddlewareChain {
	async fn handle(&self, request: Request) -> Result<Response> {
		if self.middlewares.is_empty() {
			return self.handler.handle(request).await;
		}

		let mut current_handler = self.handler.clone();

		for middleware in self
			.middlewares
			.iter()
			.rev()
			.filter(|mw| mw.should_continue(&request))
		{
			current_handler = Arc::new(ComposedHandler {
				middleware: middleware.clone(),
				next: current_handler,
			});
		}

		current_handler.handle(request).await
	}
}

struct ComposedHandler {
	middleware: Arc<dyn Middleware>,
	next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for ComposedHandler {
	async fn handle(&self, request: Request) -> Result<Response> {
		self.middleware.process(request, self.next.clone()).await
	}
}

/// Ordered, reusable list of middleware not yet bound to a handler.
///
/// Chains are cheap to clone and can be combined with [`Chain::extend`]
/// before being closed over a handler with [`Chain::then`].
#[derive(Clone, Default)]
pub struct Chain {
	middlewares: Vec<Arc<dyn Middleware>>,
}

impl Chain {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a middleware, which will run inside the ones already present.
	pub fn append(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);
		self
	}

	/// Append all middleware of `other` after this chain's.
	pub fn extend(mut self, other: Chain) -> Self {
		self.middlewares.extend(other.middlewares);
		self
	}

	pub fn len(&self) -> usize {
		self.middlewares.len()
	}

	pub fn is_empty(&self) -> bool {
		self.middlewares.is_empty()
	}

	/// Bind the chain to a handler.
	pub fn then(&self, handler: Arc<dyn Handler>) -> MiddlewareChain {
		self.middlewares
			.iter()
			.cloned()
			.fold(MiddlewareChain::new(handler), MiddlewareChain::with_middleware)
	}
}

impl std::fmt::Debug for Chain {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Chain")
			.field("len", &self.middlewares.len())
			.finish()
	}
}

/// Handler backed by an async closure. See [`handler_fn`].
pub struct FnHandler<F> {
	func: F,
}

/// Wrap an async closure as a [`Handler`].
pub fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
	F: Fn(Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Response>> + Send + 'static,
{
	FnHandler { func }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
	F: Fn(Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Response>> + Send + 'static,
{
	async fn handle(&self, request: Request) -> Result<Response> {
		(self.func)(request).await
	}
}

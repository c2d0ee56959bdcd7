//! Per-request layout selection.

use async_trait::async_trait;
use bow_http::{Handler, Middleware, Request, Response, Result};
use std::sync::Arc;

/// Layout used when a request does not choose one.
pub const DEFAULT_LAYOUT: &str = "base";

/// Layout resolved for the current request.
///
/// Stored in the request extensions. Templates only see the resolved name;
/// handlers change it through [`with_layout`] or the [`ApplyLayout`]
/// middleware before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
	layout: String,
}

impl RenderContext {
	pub fn new(layout: impl Into<String>) -> Self {
		Self {
			layout: layout.into(),
		}
	}

	/// Context attached to `request`, or the default one.
	pub fn from_request(request: &Request) -> Self {
		request.extensions.get::<RenderContext>().unwrap_or_default()
	}

	pub fn layout(&self) -> &str {
		&self.layout
	}
}

impl Default for RenderContext {
	fn default() -> Self {
		Self::new(DEFAULT_LAYOUT)
	}
}

/// Select the layout pages rendered for `request` are wrapped in.
///
/// # Examples
///
/// ```
/// use bow_http::Request;
/// use bow_views::{RenderContext, with_layout};
///
/// let request = Request::builder().uri("/admin").build().unwrap();
/// assert_eq!(RenderContext::from_request(&request).layout(), "base");
///
/// let request = with_layout(request, "admin");
/// assert_eq!(RenderContext::from_request(&request).layout(), "admin");
/// ```
pub fn with_layout(request: Request, layout: impl Into<String>) -> Request {
	request.extensions.insert(RenderContext::new(layout));
	request
}

/// Middleware selecting a fixed layout for every request it wraps.
pub struct ApplyLayout {
	layout: String,
}

impl ApplyLayout {
	pub fn new(layout: impl Into<String>) -> Self {
		Self {
			layout: layout.into(),
		}
	}
}

#[async_trait]
impl Middleware for ApplyLayout {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		next.handle(with_layout(request, self.layout.clone())).await
	}
}

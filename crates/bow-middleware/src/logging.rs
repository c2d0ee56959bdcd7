use async_trait::async_trait;
use bow_http::{Handler, Middleware, Request, Response, Result};
use chrono::Utc;
use std::sync::Arc;

/// Logging middleware
///
/// Emits one `info` event per request with the remote address, protocol,
/// method, URI, status and duration. Handler errors are logged at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl Middleware for LoggingMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let start = Utc::now();
		let method = request.method.to_string();
		let uri = request.uri.to_string();
		let proto = format!("{:?}", request.version);
		let remote_addr = request
			.remote_addr()
			.map(|addr| addr.to_string())
			.unwrap_or_else(|| "-".to_string());

		let result = next.handle(request).await;

		let duration = Utc::now().signed_duration_since(start);

		match &result {
			Ok(response) => {
				tracing::info!(
					remote_addr = %remote_addr,
					proto = %proto,
					method = %method,
					uri = %uri,
					status = response.status.as_u16(),
					duration_ms = duration.num_milliseconds(),
					"request"
				);
			}
			Err(err) => {
				tracing::warn!(
					remote_addr = %remote_addr,
					proto = %proto,
					method = %method,
					uri = %uri,
					error = %err,
					duration_ms = duration.num_milliseconds(),
					"request failed"
				);
			}
		}

		result
	}
}

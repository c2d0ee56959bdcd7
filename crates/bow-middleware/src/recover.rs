//! Panic and error recovery.

use async_trait::async_trait;
use bow_http::{Error, Handler, Middleware, Request, Response, Result};
use bow_views::Views;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Dispatch;
use tracing::instrument::WithSubscriber;

/// A handler panicked while serving a request.
#[derive(Debug, thiserror::Error)]
#[error("handler panicked: {0}")]
pub struct HandlerPanic(pub String);

impl HandlerPanic {
	fn from_payload(payload: &(dyn Any + Send)) -> Self {
		let message = payload
			.downcast_ref::<&str>()
			.map(|s| s.to_string())
			.or_else(|| payload.downcast_ref::<String>().cloned())
			.unwrap_or_else(|| "non-string panic payload".to_string());
		Self(message)
	}
}

/// Outermost middleware of the standard chain.
///
/// Handler errors become error pages through [`Views`]: 4xx errors are
/// answered as client errors, anything else as a logged server error.
/// Panics are caught and answered with a 500 and `Connection: close`.
///
/// When a [`Dispatch`] is configured, the rest of the chain runs with it as
/// the default subscriber.
#[derive(Debug, Clone)]
pub struct RecoverMiddleware {
	views: Views,
	dispatch: Option<Dispatch>,
}

impl RecoverMiddleware {
	pub fn new(views: Views) -> Self {
		Self {
			views,
			dispatch: None,
		}
	}

	pub fn with_dispatch(mut self, dispatch: Option<Dispatch>) -> Self {
		self.dispatch = dispatch;
		self
	}

	fn error_response(&self, error: &Error) -> Response {
		if error.is_client_error() {
			self.views.client_error(error.status_code())
		} else {
			self.views.server_error(error)
		}
	}

	fn recover(&self, outcome: std::thread::Result<Result<Response>>) -> Response {
		match outcome {
			Ok(Ok(response)) => response,
			Ok(Err(error)) => self.error_response(&error),
			Err(payload) => {
				let panic = HandlerPanic::from_payload(payload.as_ref());
				self.views
					.server_error(&panic)
					.with_header("connection", "close")
			}
		}
	}
}

#[async_trait]
impl Middleware for RecoverMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let guarded = AssertUnwindSafe(next.handle(request)).catch_unwind();

		match &self.dispatch {
			Some(dispatch) => {
				let outcome = guarded.with_subscriber(dispatch.clone()).await;
				Ok(tracing::dispatcher::with_default(dispatch, || {
					self.recover(outcome)
				}))
			}
			None => Ok(self.recover(guarded.await)),
		}
	}
}

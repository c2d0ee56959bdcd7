use async_trait::async_trait;
use bow_http::{Handler, Method, Middleware, Request, Response, Result};
use std::sync::Arc;

/// Form field carrying the overriding method
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// Header carrying the overriding method
pub const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";

/// Lets HTML forms, which can only POST, reach PUT, PATCH and DELETE routes.
///
/// The `_method` form field wins over the `X-HTTP-Method-Override` header.
/// Only the exact names `PUT`, `PATCH` and `DELETE` are honored; any other
/// value, lowercase spellings included, leaves the request untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodOverrideMiddleware;

impl MethodOverrideMiddleware {
	pub fn new() -> Self {
		Self
	}

	fn override_method(request: &Request) -> Option<Method> {
		let value = request
			.form_value(METHOD_OVERRIDE_FIELD)
			.filter(|value| !value.is_empty())
			.or_else(|| request.header(METHOD_OVERRIDE_HEADER).map(str::to_string))?;

		[Method::PUT, Method::PATCH, Method::DELETE]
			.into_iter()
			.find(|method| method.as_str() == value)
	}
}

#[async_trait]
impl Middleware for MethodOverrideMiddleware {
	async fn process(&self, mut request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		if let Some(method) = Self::override_method(&request) {
			tracing::debug!(from = %request.method, to = %method, "method override");
			request.method = method;
		}
		next.handle(request).await
	}

	fn should_continue(&self, request: &Request) -> bool {
		request.method == Method::POST
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bow_http::{MiddlewareChain, handler_fn};
	use rstest::rstest;

	fn echo_method() -> Arc<dyn Handler> {
		Arc::new(handler_fn(|req: Request| async move {
			Ok(Response::ok().with_body(req.method.to_string()))
		}))
	}

	fn chain() -> MiddlewareChain {
		MiddlewareChain::new(echo_method()).with_middleware(Arc::new(MethodOverrideMiddleware))
	}

	fn form_post(body: &str) -> Request {
		Request::builder()
			.method(Method::POST)
			.uri("/items/1")
			.header("content-type", "application/x-www-form-urlencoded")
			.body(body.to_string())
			.build()
			.unwrap()
	}

	#[rstest]
	#[case("_method=PUT", "PUT")]
	#[case("_method=PATCH", "PATCH")]
	#[case("_method=patch", "POST")]
	#[case("_method=Delete", "POST")]
	#[case("_method=DELETE&name=x", "DELETE")]
	#[case("_method=GET", "POST")]
	#[case("_method=CONNECT", "POST")]
	#[case("name=x", "POST")]
	#[tokio::test]
	async fn test_form_field_override(#[case] body: &str, #[case] expected: &str) {
		let response = chain().handle(form_post(body)).await.unwrap();
		assert_eq!(response.body_str(), expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_header_override() {
		let request = Request::builder()
			.method(Method::POST)
			.uri("/items/1")
			.header("x-http-method-override", "DELETE")
			.build()
			.unwrap();
		let response = chain().handle(request).await.unwrap();
		assert_eq!(response.body_str(), "DELETE");
	}

	#[rstest]
	#[tokio::test]
	async fn test_form_field_wins_over_header() {
		let request = Request::builder()
			.method(Method::POST)
			.uri("/items/1")
			.header("content-type", "application/x-www-form-urlencoded")
			.header("x-http-method-override", "DELETE")
			.body("_method=PATCH")
			.build()
			.unwrap();
		let response = chain().handle(request).await.unwrap();
		assert_eq!(response.body_str(), "PATCH");
	}

	#[rstest]
	#[tokio::test]
	async fn test_get_is_never_overridden() {
		let request = Request::builder()
			.method(Method::GET)
			.uri("/items/1?_method=DELETE")
			.build()
			.unwrap();
		let response = chain().handle(request).await.unwrap();
		assert_eq!(response.body_str(), "GET");
	}
}

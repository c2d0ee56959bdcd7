//! Method and path routing.
//!
//! Patterns are matched segment by segment. A `{name}` segment matches any
//! non-empty segment and is captured, percent-decoded, into [`PathParams`].
//! Mounts hand every
//! request below a prefix to one handler and are tried before routes.

use async_trait::async_trait;
use hyper::Method;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::{Error, Handler, Request, Response, Result, handler_fn};

/// Path parameters captured by the matching route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl Request {
	/// Value of a path parameter captured by a [`Router`].
	pub fn path_param(&self, name: &str) -> Option<String> {
		self.extensions
			.get::<PathParams>()
			.and_then(|params| params.get(name).map(str::to_string))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Param(String),
}

struct Route {
	method: Method,
	segments: Vec<Segment>,
	handler: Arc<dyn Handler>,
}

impl Route {
	fn matches(&self, path: &str) -> Option<PathParams> {
		let parts: Vec<&str> = split(path).collect();
		if parts.len() != self.segments.len() {
			return None;
		}

		let mut params = HashMap::new();
		for (segment, part) in self.segments.iter().zip(parts) {
			match segment {
				Segment::Literal(literal) if literal == part => {}
				Segment::Param(name) if !part.is_empty() => {
					let value = percent_decode_str(part).decode_utf8_lossy().into_owned();
					params.insert(name.clone(), value);
				}
				_ => return None,
			}
		}
		Some(PathParams(params))
	}

	/// GET routes also answer HEAD.
	fn accepts(&self, method: &Method) -> bool {
		self.method == method || (self.method == Method::GET && method == Method::HEAD)
	}
}

fn split(path: &str) -> impl Iterator<Item = &str> {
	path.strip_prefix('/').unwrap_or(path).split('/')
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
	split(pattern)
		.map(|part| match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
			Some(name) => Segment::Param(name.to_string()),
			None => Segment::Literal(part.to_string()),
		})
		.collect()
}

/// Dispatches requests to handlers by method and path.
///
/// Unknown paths fail with [`Error::NotFound`], known paths with another
/// method with [`Error::MethodNotAllowed`].
///
/// # Examples
///
/// ```
/// use bow_http::{Handler, Method, Request, Response, Router};
///
/// # async fn example() -> bow_http::Result<()> {
/// let router = Router::new().function(Method::GET, "/users/{id}", |req: Request| async move {
///     let id = req.path_param("id").unwrap_or_default();
///     Ok(Response::ok().with_body(format!("user {id}")))
/// });
///
/// let request = Request::builder().uri("/users/7").build()?;
/// let response = router.handle(request).await?;
/// assert_eq!(response.body_str(), "user 7");
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Router {
	routes: Vec<Route>,
	mounts: Vec<(String, Arc<dyn Handler>)>,
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a route. Earlier routes win when several patterns match.
	pub fn route(mut self, method: Method, pattern: &str, handler: Arc<dyn Handler>) -> Self {
		self.routes.push(Route {
			method,
			segments: parse_pattern(pattern),
			handler,
		});
		self
	}

	/// Add a route backed by an async closure.
	pub fn function<F, Fut>(self, method: Method, pattern: &str, func: F) -> Self
	where
		F: Fn(Request) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Response>> + Send + 'static,
	{
		self.route(method, pattern, Arc::new(handler_fn(func)))
	}

	/// Send every request whose path starts with `prefix` to `handler`.
	pub fn mount(mut self, prefix: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
		self.mounts.push((prefix.into(), handler));
		self
	}

	pub fn len(&self) -> usize {
		self.routes.len() + self.mounts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl std::fmt::Debug for Router {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Router")
			.field("routes", &self.routes.len())
			.field(
				"mounts",
				&self.mounts.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>(),
			)
			.finish()
	}
}

#[async_trait]
impl Handler for Router {
	async fn handle(&self, request: Request) -> Result<Response> {
		let path = request.path().to_string();

		if let Some((_, handler)) = self.mounts.iter().find(|(prefix, _)| path.starts_with(prefix.as_str())) {
			return handler.handle(request).await;
		}

		let mut allowed = Vec::new();
		for route in &self.routes {
			let Some(params) = route.matches(&path) else {
				continue;
			};
			if route.accepts(&request.method) {
				request.extensions.insert(params);
				return route.handler.handle(request).await;
			}
			allowed.push(route.method.as_str());
		}

		if allowed.is_empty() {
			Err(Error::NotFound(path))
		} else {
			Err(Error::MethodNotAllowed(format!(
				"{} {path} (allowed: {})",
				request.method,
				allowed.join(", ")
			)))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	async fn echo_params(req: Request) -> Result<Response> {
		let body = format!(
			"{}:{}",
			req.path_param("user").unwrap_or_default(),
			req.path_param("post").unwrap_or_default()
		);
		Ok(Response::ok().with_body(body))
	}

	#[fixture]
	fn router() -> Router {
		Router::new()
			.function(Method::GET, "/", |_req| async { Ok(Response::ok().with_body("home")) })
			.function(Method::GET, "/users/{user}/posts/{post}", echo_params)
			.function(Method::POST, "/users/{user}/posts/{post}", |_req| async {
				Ok(Response::ok().with_body("created"))
			})
			.mount(
				"/static/",
				Arc::new(handler_fn(|_req| async { Ok(Response::ok().with_body("asset")) })),
			)
	}

	fn request(method: Method, uri: &str) -> Request {
		Request::builder().method(method).uri(uri).build().unwrap()
	}

	#[rstest]
	#[case(Method::GET, "/", "home")]
	#[case(Method::HEAD, "/", "home")]
	#[case(Method::GET, "/users/ann/posts/3", "ann:3")]
	#[case(Method::GET, "/users/ann%20lee/posts/%233", "ann lee:#3")]
	#[case(Method::POST, "/users/ann/posts/3", "created")]
	#[case(Method::GET, "/static/app.css", "asset")]
	#[case(Method::DELETE, "/static/app.css", "asset")]
	#[tokio::test]
	async fn test_dispatch(
		router: Router,
		#[case] method: Method,
		#[case] uri: &str,
		#[case] body: &str,
	) {
		let response = router.handle(request(method, uri)).await.unwrap();
		assert_eq!(response.body_str(), body);
	}

	#[rstest]
	#[case("/users")]
	#[case("/users/ann/posts")]
	#[case("/users//posts/3")]
	#[case("/users/ann/posts/3/")]
	#[tokio::test]
	async fn test_not_found(router: Router, #[case] uri: &str) {
		let error = router.handle(request(Method::GET, uri)).await.unwrap_err();
		assert!(matches!(error, Error::NotFound(_)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_method_not_allowed(router: Router) {
		let error = router
			.handle(request(Method::DELETE, "/users/ann/posts/3"))
			.await
			.unwrap_err();

		assert!(matches!(error, Error::MethodNotAllowed(_)));
		assert!(error.to_string().contains("GET, POST"));
	}

	#[rstest]
	fn test_pattern_segments() {
		let route = Route {
			method: Method::GET,
			segments: parse_pattern("/a/{b}"),
			handler: Arc::new(handler_fn(|_req| async { Ok(Response::ok()) })),
		};

		assert_eq!(route.matches("/a/x").unwrap().get("b"), Some("x"));
		assert!(route.matches("/a/").is_none());
		assert_eq!(
			route.matches("/a/caf%C3%A9%20au%20lait").unwrap().get("b"),
			Some("café au lait")
		);
		assert_eq!(
			parse_pattern("/a/{b}"),
			vec![Segment::Literal("a".into()), Segment::Param("b".into())]
		);
	}
}

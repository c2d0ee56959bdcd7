//! Page and partial rendering.

use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use bow_http::{Request, Response, StatusCode};
use serde::Serialize;
use tera::{Context, Function, Value};

use crate::functions::{FunctionCatalog, required_arg};
use crate::layout::RenderContext;
use crate::registry::{CompiledTemplate, PARTIAL_FUNCTION, ViewRegistry};
use crate::ViewError;

pub const HTML_CONTENT_TYPE: &str = "text/html";

/// Compiled views plus the helpers bound into every render.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct Views {
	inner: Arc<Inner>,
}

struct Inner {
	registry: ViewRegistry,
	catalog: FunctionCatalog,
	debug: bool,
}

impl Views {
	/// Discover and compile the templates under `<root>/views`.
	///
	/// # Errors
	///
	/// Fails when the views directory cannot be read or a template does not
	/// parse.
	pub fn load(root: impl AsRef<Path>, catalog: FunctionCatalog, debug: bool) -> Result<Self, ViewError> {
		let registry = ViewRegistry::load(root.as_ref(), &catalog)?;
		Ok(Self::from_registry(registry, catalog, debug))
	}

	pub fn from_registry(registry: ViewRegistry, catalog: FunctionCatalog, debug: bool) -> Self {
		Self {
			inner: Arc::new(Inner {
				registry,
				catalog,
				debug,
			}),
		}
	}

	pub fn registry(&self) -> &ViewRegistry {
		&self.inner.registry
	}

	pub fn catalog(&self) -> &FunctionCatalog {
		&self.inner.catalog
	}

	pub fn is_debug(&self) -> bool {
		self.inner.debug
	}

	/// Render a page or partial, turning failures into a server error response.
	pub fn render<T>(&self, request: &Request, status: StatusCode, name: &str, data: &T) -> Response
	where
		T: Serialize + ?Sized,
	{
		self.try_render(request, status, name, data)
			.unwrap_or_else(|error| self.server_error(&error))
	}

	/// Render a page or partial.
	///
	/// A partial is rendered standalone. A page is wrapped in the layout of
	/// the request's [`RenderContext`]. The response, status included, only
	/// exists once the whole body rendered successfully.
	pub fn try_render<T>(
		&self,
		request: &Request,
		status: StatusCode,
		name: &str,
		data: &T,
	) -> Result<Response, ViewError>
	where
		T: Serialize + ?Sized,
	{
		let body = self.render_to_string(request, name, data)?;
		Ok(Response::new(status)
			.with_content_type(HTML_CONTENT_TYPE)
			.with_body(body))
	}

	/// Render a page or partial into a string.
	pub fn render_to_string<T>(&self, request: &Request, name: &str, data: &T) -> Result<String, ViewError>
	where
		T: Serialize + ?Sized,
	{
		let data = to_value(data)?;
		let registry = self.registry();

		if let Some(partial) = registry.partial(name) {
			return self.execute(partial, name, request, data, None);
		}

		let page = registry
			.page(name)
			.ok_or_else(|| ViewError::PageNotFound(name.to_string()))?;

		let context = RenderContext::from_request(request);
		if !page.has_layout(context.layout()) {
			return Err(ViewError::LayoutNotFound {
				layout: context.layout().to_string(),
				page: name.to_string(),
			});
		}

		self.execute(page, context.layout(), request, data, Some(context.layout()))
	}

	/// Render a partial into a string. Pages are not considered.
	pub fn render_partial<T>(&self, request: &Request, name: &str, data: &T) -> Result<String, ViewError>
	where
		T: Serialize + ?Sized,
	{
		let partial = self
			.registry()
			.partial(name)
			.ok_or_else(|| ViewError::PartialNotFound(name.to_string()))?;
		self.execute(partial, name, request, to_value(data)?, None)
	}

	fn execute(
		&self,
		template: &CompiledTemplate,
		entry: &str,
		request: &Request,
		data: Value,
		layout: Option<&str>,
	) -> Result<String, ViewError> {
		let mut tera = template.tera().clone();
		tera.register_function(
			PARTIAL_FUNCTION,
			PartialFunction {
				views: self.clone(),
				request: request.clone(),
			},
		);
		self.inner.catalog.bind(&mut tera, request);

		let mut context = build_context(data)?;
		if let Some(layout) = layout
			&& !context.contains_key("layout")
		{
			context.insert("layout", layout);
		}

		tera.render(entry, &context)
			.map_err(|source| ViewError::Execution {
				name: template.name().to_string(),
				source,
			})
	}

	/// Log `error` with a backtrace and answer with a 500.
	///
	/// In debug mode the body is the full diagnostic, otherwise only the
	/// status text.
	pub fn server_error(&self, error: &(dyn std::error::Error + 'static)) -> Response {
		let trace = diagnostic_trace(error);
		tracing::error!("{}", trace);

		let status = StatusCode::INTERNAL_SERVER_ERROR;
		if self.is_debug() {
			Response::text_error(status, &trace)
		} else {
			Response::text_error(status, status.canonical_reason().unwrap_or_default())
		}
	}

	/// Answer with `status` and its reason phrase.
	pub fn client_error(&self, status: StatusCode) -> Response {
		Response::text_error(status, status.canonical_reason().unwrap_or_default())
	}
}

impl std::fmt::Debug for Views {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Views")
			.field("registry", &self.inner.registry)
			.field("debug", &self.inner.debug)
			.finish()
	}
}

/// Error message, its chain of causes and a captured backtrace.
pub fn diagnostic_trace(error: &(dyn std::error::Error + 'static)) -> String {
	let mut trace = error.to_string();
	let mut source = error.source();
	while let Some(cause) = source {
		trace.push_str("\n  caused by: ");
		trace.push_str(&cause.to_string());
		source = cause.source();
	}

	format!("{trace}\n\n{}", Backtrace::force_capture())
}

fn to_value<T: Serialize + ?Sized>(data: &T) -> Result<Value, ViewError> {
	serde_json::to_value(data).map_err(|e| ViewError::Data(e.to_string()))
}

/// Objects become the template context, null an empty one, anything else is
/// exposed as `data`.
fn build_context(data: Value) -> Result<Context, ViewError> {
	match data {
		Value::Null => Ok(Context::new()),
		Value::Object(_) => Context::from_value(data).map_err(|e| ViewError::Data(e.to_string())),
		other => {
			let mut context = Context::new();
			context.insert("data", &other);
			Ok(context)
		}
	}
}

/// `partial(name=..., data=...)` bound to the request being rendered.
struct PartialFunction {
	views: Views,
	request: Request,
}

impl Function for PartialFunction {
	fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
		let name: String = required_arg(args, "name")?;
		let data = args.get("data").cloned().unwrap_or(Value::Null);

		self.views
			.render_partial(&self.request, &name, &data)
			.map(Value::String)
			.map_err(|e| tera::Error::chain(format!("failed to render partial {name}"), e))
	}

	fn is_safe(&self) -> bool {
		true
	}
}

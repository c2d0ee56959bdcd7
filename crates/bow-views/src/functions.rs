//! Template helper catalog.
//!
//! A helper is either static (one callable shared by every render) or
//! request-bound (a factory producing a callable for the current request).
//! Compilation registers static helpers as-is and an empty-string
//! placeholder for every request-bound name; [`FunctionCatalog::bind`]
//! replaces the placeholders on a per-render clone of the template.

use bow_http::Request;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tera::{Function, Tera, Value};

/// Factory evaluated once per render for a request-bound helper.
pub type RequestFactory = Arc<dyn Fn(&Request) -> Box<dyn Function> + Send + Sync>;

/// One entry of a [`FunctionCatalog`].
#[derive(Clone)]
pub enum Helper {
	Static(Arc<dyn Function>),
	RequestBound(RequestFactory),
}

impl Helper {
	pub fn is_request_bound(&self) -> bool {
		matches!(self, Helper::RequestBound(_))
	}
}

impl std::fmt::Debug for Helper {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Helper::Static(_) => f.write_str("Static"),
			Helper::RequestBound(_) => f.write_str("RequestBound"),
		}
	}
}

/// Named template helpers.
///
/// Registering a name twice replaces the earlier entry, whatever its kind.
///
/// # Examples
///
/// ```
/// use bow_http::Request;
/// use bow_views::{FunctionCatalog, Value};
/// use std::collections::HashMap;
///
/// let mut catalog = FunctionCatalog::new();
/// catalog.register("site_name", |_: &HashMap<String, Value>| -> tera::Result<Value> {
///     Ok(Value::from("bow"))
/// });
/// catalog.register_request("path", |request: &Request| {
///     let path = request.path().to_string();
///     move |_: &HashMap<String, Value>| -> tera::Result<Value> { Ok(Value::from(path.clone())) }
/// });
///
/// assert!(catalog.get("path").unwrap().is_request_bound());
/// assert_eq!(catalog.len(), 2);
/// ```
#[derive(Clone, Default, Debug)]
pub struct FunctionCatalog {
	helpers: BTreeMap<String, Helper>,
}

impl FunctionCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a static helper.
	pub fn register<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
	where
		F: Function + 'static,
	{
		self.helpers
			.insert(name.into(), Helper::Static(Arc::new(function)));
		self
	}

	/// Register a helper built from the current request on every render.
	pub fn register_request<F, R>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
	where
		F: Fn(&Request) -> R + Send + Sync + 'static,
		R: Function + 'static,
	{
		let factory: RequestFactory =
			Arc::new(move |request| Box::new(factory(request)) as Box<dyn Function>);
		self.helpers
			.insert(name.into(), Helper::RequestBound(factory));
		self
	}

	/// Insert every helper of `other`, replacing entries with the same name.
	pub fn merge(&mut self, other: FunctionCatalog) -> &mut Self {
		self.helpers.extend(other.helpers);
		self
	}

	pub fn get(&self, name: &str) -> Option<&Helper> {
		self.helpers.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.helpers.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.helpers.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.helpers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.helpers.is_empty()
	}

	/// Register static helpers and placeholders on a template being compiled.
	pub fn attach(&self, tera: &mut Tera) {
		for (name, helper) in &self.helpers {
			match helper {
				Helper::Static(function) => {
					tera.register_function(name, SharedFunction(function.clone()))
				}
				Helper::RequestBound(_) => tera.register_function(name, placeholder),
			}
		}
	}

	/// Bind request-bound helpers to `request` on a per-render template clone.
	pub fn bind(&self, tera: &mut Tera, request: &Request) {
		for (name, helper) in &self.helpers {
			if let Helper::RequestBound(factory) = helper {
				tera.register_function(name, BoxedFunction(factory(request)));
			}
		}
	}
}

/// Stand-in for request-bound helpers while no request is available.
pub(crate) fn placeholder(_: &HashMap<String, Value>) -> tera::Result<Value> {
	Ok(Value::String(String::new()))
}

struct SharedFunction(Arc<dyn Function>);

impl Function for SharedFunction {
	fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
		self.0.call(args)
	}

	fn is_safe(&self) -> bool {
		self.0.is_safe()
	}
}

struct BoxedFunction(Box<dyn Function>);

impl Function for BoxedFunction {
	fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
		self.0.call(args)
	}

	fn is_safe(&self) -> bool {
		self.0.is_safe()
	}
}

/// Deserialize a named helper argument, failing when it is absent.
pub fn required_arg<T: DeserializeOwned>(args: &HashMap<String, Value>, name: &str) -> tera::Result<T> {
	let value = args
		.get(name)
		.ok_or_else(|| tera::Error::msg(format!("missing argument `{name}`")))?;
	tera::from_value(value.clone())
		.map_err(|e| tera::Error::chain(format!("invalid argument `{name}`"), e))
}

/// Deserialize a named helper argument if present.
pub fn optional_arg<T: DeserializeOwned>(
	args: &HashMap<String, Value>,
	name: &str,
) -> tera::Result<Option<T>> {
	match args.get(name) {
		None | Some(Value::Null) => Ok(None),
		Some(_) => required_arg(args, name).map(Some),
	}
}

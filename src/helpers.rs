//! Built-in template helpers.

use crate::config::{AUTO_LOCALE, GlobalsFn};
use bow_http::Request;
use bow_i18n::{DEFAULT_LOCALE, Translator, format_value, lang_from_locale};
use bow_middleware::{Session, csrf_token};
use bow_static::HashedFiles;
use bow_views::tera;
use bow_views::{Function, FunctionCatalog, Value, required_arg};
use std::collections::HashMap;
use std::sync::Arc;

/// Session key holding the pending flash message.
pub const FLASH_KEY: &str = "flash";

type Args = HashMap<String, Value>;

/// `hash(path)`, `format(value, layout)` and `csrf()`.
pub(crate) fn defaults(files: Arc<HashedFiles>) -> FunctionCatalog {
	let mut catalog = FunctionCatalog::new();
	catalog.register("hash", move |args: &Args| -> tera::Result<Value> {
		let path: String = required_arg(args, "path")?;
		let hashed = files.hash_name(&path);
		Ok(Value::String(if path.starts_with('/') {
			format!("/{hashed}")
		} else {
			hashed
		}))
	});
	catalog.register("format", format_in(DEFAULT_LOCALE.to_string()));
	catalog.register_request("csrf", |request: &Request| {
		constant(Value::String(csrf_token(request)))
	});
	catalog
}

/// `translate(msg)`, `lang()` and a localized `format(value, layout)`.
pub(crate) fn translation(translator: Arc<Translator>, locale: &str) -> FunctionCatalog {
	let mut catalog = FunctionCatalog::new();

	if locale == AUTO_LOCALE {
		let t = translator.clone();
		catalog.register_request("translate", move |request: &Request| {
			translate_in(t.clone(), t.req_locale(request))
		});
		let t = translator.clone();
		catalog.register_request("lang", move |request: &Request| {
			constant(Value::String(lang_from_locale(&t.req_locale(request)).to_string()))
		});
		catalog.register_request("format", move |request: &Request| {
			format_in(translator.req_locale(request))
		});
	} else {
		catalog.register("translate", translate_in(translator, locale.to_string()));
		catalog.register("lang", constant(Value::String(lang_from_locale(locale).to_string())));
		catalog.register("format", format_in(locale.to_string()));
	}

	catalog
}

/// `flash()`: pops the pending flash message, empty when there is none.
pub(crate) fn flash() -> FunctionCatalog {
	let mut catalog = FunctionCatalog::new();
	catalog.register_request("flash", |request: &Request| {
		let session = Session::from_request(request);
		move |_: &Args| -> tera::Result<Value> {
			let message = session
				.as_ref()
				.and_then(|s| s.pop_string(FLASH_KEY))
				.unwrap_or_default();
			Ok(Value::String(message))
		}
	});
	catalog
}

/// `globals()`: the configured callback, evaluated when a template calls it.
pub(crate) fn globals(callback: GlobalsFn) -> FunctionCatalog {
	let mut catalog = FunctionCatalog::new();
	catalog.register_request("globals", move |request: &Request| {
		let callback = callback.clone();
		let request = request.clone();
		move |_: &Args| -> tera::Result<Value> { Ok(callback(&request)) }
	});
	catalog
}

fn constant(value: Value) -> impl Function {
	move |_: &Args| -> tera::Result<Value> { Ok(value.clone()) }
}

fn translate_in(translator: Arc<Translator>, locale: String) -> impl Function {
	move |args: &Args| -> tera::Result<Value> {
		let msg: String = required_arg(args, "msg")?;
		Ok(Value::String(translator.translate(&msg, &locale)))
	}
}

fn format_in(locale: String) -> impl Function {
	move |args: &Args| -> tera::Result<Value> {
		let value: String = required_arg(args, "value")?;
		let layout: String = required_arg(args, "layout")?;
		format_value(&value, &layout, &locale)
			.map(Value::String)
			.map_err(|e| tera::Error::chain("format failed", e))
	}
}

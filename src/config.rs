//! Application configuration.
//!
//! [`CoreConfig`] is assembled in code with `with_*` methods, or loaded from a
//! TOML document holding the serializable [`Settings`] subset:
//!
//! ```toml
//! root = "app"
//! debug = true
//! database_url = "db/app.sqlite"
//! session_key = "0123456789abcdef0123456789abcdef"
//! translator_locale = "auto"
//!
//! [csp]
//! img-src = "'self' data:"
//! ```

use bow_http::Request;
use bow_i18n::is_valid_locale;
use bow_middleware::SESSION_KEY_LENGTH;
use bow_views::{Function, FunctionCatalog, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Dispatch;

/// Translator locale that resolves the locale from each request.
pub const AUTO_LOCALE: &str = "auto";

/// Callback producing the value of the `globals()` template helper.
pub type GlobalsFn = Arc<dyn Fn(&Request) -> Value + Send + Sync>;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	Read {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("failed to parse config: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("session key must be {SESSION_KEY_LENGTH} bytes long, got {0}")]
	SessionKeyLength(usize),

	#[error("translator locale {0:?} is neither \"auto\" nor a valid locale")]
	InvalidLocale(String),

	#[error("database url is empty")]
	EmptyDatabaseUrl,

	#[error("content security policy directive name is empty")]
	EmptyCspDirective,
}

/// Serializable configuration subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub root: PathBuf,
	pub debug: bool,
	pub csp: BTreeMap<String, String>,
	pub database_url: Option<String>,
	pub session_key: Option<String>,
	pub translator_locale: Option<String>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			root: PathBuf::from("."),
			debug: false,
			csp: BTreeMap::new(),
			database_url: None,
			session_key: None,
			translator_locale: None,
		}
	}
}

/// Everything [`Core::new`](crate::Core::new) needs.
///
/// Only the root is required. A translator, sessions and the database are
/// enabled by setting their option.
#[derive(Clone)]
pub struct CoreConfig {
	pub root: PathBuf,
	pub logger: Option<Dispatch>,
	pub csp: BTreeMap<String, String>,
	pub debug: bool,
	pub database_url: Option<String>,
	pub session_key: Option<Vec<u8>>,
	pub translator_locale: Option<String>,
	pub helpers: FunctionCatalog,
	pub globals: Option<GlobalsFn>,
}

impl fmt::Debug for CoreConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CoreConfig")
			.field("root", &self.root)
			.field("logger", &self.logger.is_some())
			.field("csp", &self.csp)
			.field("debug", &self.debug)
			.field("database_url", &self.database_url)
			.field("session_key", &self.session_key.as_ref().map(|_| "<redacted>"))
			.field("translator_locale", &self.translator_locale)
			.field("helpers", &self.helpers)
			.field("globals", &self.globals.is_some())
			.finish()
	}
}

impl CoreConfig {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			logger: None,
			csp: BTreeMap::new(),
			debug: false,
			database_url: None,
			session_key: None,
			translator_locale: None,
			helpers: FunctionCatalog::new(),
			globals: None,
		}
	}

	/// Build a configuration from its serializable subset.
	pub fn from_settings(settings: Settings) -> Self {
		Self {
			csp: settings.csp,
			debug: settings.debug,
			database_url: settings.database_url,
			session_key: settings.session_key.map(String::into_bytes),
			translator_locale: settings.translator_locale,
			..Self::new(settings.root)
		}
	}

	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let settings: Settings = toml::from_str(source)?;
		Ok(Self::from_settings(settings))
	}

	/// Load a TOML file. A relative `root` is resolved against the file's
	/// directory.
	pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		let mut settings: Settings = toml::from_str(&source)?;

		if settings.root.is_relative()
			&& let Some(parent) = path.parent()
		{
			settings.root = parent.join(&settings.root);
		}

		Ok(Self::from_settings(settings))
	}

	/// Run request handling and startup logging under `logger` instead of
	/// the global subscriber.
	pub fn with_logger(mut self, logger: Dispatch) -> Self {
		self.logger = Some(logger);
		self
	}

	/// Add Content-Security-Policy directives; later values replace earlier
	/// ones for the same directive.
	pub fn with_csp<I, K, V>(mut self, directives: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.csp.extend(
			directives
				.into_iter()
				.map(|(name, value)| (name.into(), value.into())),
		);
		self
	}

	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	/// Open an SQLite database and apply `migrations/*.sql` at startup.
	pub fn with_database(mut self, url: impl Into<String>) -> Self {
		self.database_url = Some(url.into());
		self
	}

	/// Enable encrypted cookie sessions with a 32-byte key.
	pub fn with_session(mut self, key: impl AsRef<[u8]>) -> Self {
		self.session_key = Some(key.as_ref().to_vec());
		self
	}

	/// Load `translations/*.csv`. `locale` is either a fixed locale or
	/// [`AUTO_LOCALE`].
	pub fn with_translator(mut self, locale: impl Into<String>) -> Self {
		self.translator_locale = Some(locale.into());
		self
	}

	/// Add template helpers. They replace built-in helpers of the same name.
	pub fn with_helpers(mut self, helpers: FunctionCatalog) -> Self {
		self.helpers.merge(helpers);
		self
	}

	pub fn with_helper<F>(mut self, name: impl Into<String>, function: F) -> Self
	where
		F: Function + 'static,
	{
		self.helpers.register(name, function);
		self
	}

	pub fn with_request_helper<F, R>(mut self, name: impl Into<String>, factory: F) -> Self
	where
		F: Fn(&Request) -> R + Send + Sync + 'static,
		R: Function + 'static,
	{
		self.helpers.register_request(name, factory);
		self
	}

	/// Expose the callback's value to templates as `globals()`.
	pub fn with_globals<F>(mut self, globals: F) -> Self
	where
		F: Fn(&Request) -> Value + Send + Sync + 'static,
	{
		self.globals = Some(Arc::new(globals));
		self
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if let Some(key) = &self.session_key
			&& key.len() != SESSION_KEY_LENGTH
		{
			return Err(ConfigError::SessionKeyLength(key.len()));
		}

		if let Some(locale) = &self.translator_locale
			&& locale != AUTO_LOCALE
			&& !is_valid_locale(locale)
		{
			return Err(ConfigError::InvalidLocale(locale.clone()));
		}

		if let Some(url) = &self.database_url
			&& url.trim().is_empty()
		{
			return Err(ConfigError::EmptyDatabaseUrl);
		}

		if self.csp.keys().any(|name| name.trim().is_empty()) {
			return Err(ConfigError::EmptyCspDirective);
		}

		Ok(())
	}
}

//! The application core.

use crate::config::CoreConfig;
use crate::error::Result;
use crate::helpers::{self, FLASH_KEY};
use bow_http::{Chain, Request};
use bow_i18n::Translator;
use bow_middleware::{
	CsrfMiddleware, LoggingMiddleware, MethodOverrideMiddleware, RecoverMiddleware,
	SecureHeadersConfig, SecureHeadersMiddleware, Session, SessionConfig, SessionManager,
	SessionMiddleware,
};
use bow_static::{FileServer, HashedFiles};
use bow_views::Views;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Dispatch;
use tracing::instrument::WithSubscriber;

#[cfg(feature = "database")]
use bow_db::Db;

/// Views, sessions, translations and the database of one application, plus
/// the middleware chains that tie them to requests.
///
/// Handlers are composed from the two chains:
///
/// ```rust,no_run
/// use bow::{Core, CoreConfig};
/// use bow::http::{Handler, Method, Request, Response, Router, StatusCode};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let core = Arc::new(Core::new(CoreConfig::new("app").with_session([0u8; 32])).await?);
///
/// let views = core.views().clone();
/// let home = core.dyn_chain().then(Arc::new(bow::http::handler_fn(move |req: Request| {
///     let views = views.clone();
///     async move { Ok(views.render(&req, StatusCode::OK, "home", &())) }
/// })));
///
/// let router = Router::new()
///     .mount("/static/", Arc::new(core.file_server()))
///     .route(Method::GET, "/", Arc::new(home));
///
/// core.run("127.0.0.1:8080".parse()?, Arc::new(core.std_chain().then(Arc::new(router))))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Core {
	root: PathBuf,
	logger: Option<Dispatch>,
	views: Views,
	files: Arc<HashedFiles>,
	secure_headers: SecureHeadersConfig,
	sessions: Option<SessionManager>,
	translator: Option<Arc<Translator>>,
	#[cfg(feature = "database")]
	db: Option<Db>,
}

impl std::fmt::Debug for Core {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Core")
			.field("root", &self.root)
			.field("views", &self.views)
			.field("sessions", &self.sessions.is_some())
			.field("translator", &self.translator.is_some())
			.finish_non_exhaustive()
	}
}

impl Core {
	/// Validate `config` and build every configured subsystem.
	///
	/// Translations are loaded before the views so their helpers are known
	/// when templates compile. Pending migrations are applied when a database
	/// is configured.
	///
	/// # Errors
	///
	/// Fails on invalid configuration and on the first subsystem that cannot
	/// be set up.
	pub async fn new(config: CoreConfig) -> Result<Self> {
		config.validate()?;

		match config.logger.clone() {
			Some(logger) => Self::build(config).with_subscriber(logger).await,
			None => Self::build(config).await,
		}
	}

	async fn build(config: CoreConfig) -> Result<Self> {
		let CoreConfig {
			root,
			logger,
			csp,
			debug,
			database_url,
			session_key,
			translator_locale,
			helpers: user_helpers,
			globals,
		} = config;

		let files = Arc::new(HashedFiles::new(&root));
		let mut catalog = helpers::defaults(files.clone());

		let translator = match &translator_locale {
			Some(locale) => {
				let translator = Arc::new(Translator::load(&root)?);
				tracing::info!(
					locale = %locale,
					locales = ?translator.locales().collect::<Vec<_>>(),
					"translations loaded"
				);
				catalog.merge(helpers::translation(translator.clone(), locale));
				Some(translator)
			}
			None => None,
		};

		#[cfg(feature = "database")]
		let db = match &database_url {
			Some(url) => {
				let db = Db::open(url, &root).await?;
				let applied = db.migrate().await?;
				tracing::info!(url = %url, applied = applied.len(), "database ready");
				Some(db)
			}
			None => None,
		};
		#[cfg(not(feature = "database"))]
		if database_url.is_some() {
			return Err(crate::error::CoreError::FeatureDisabled("database"));
		}

		let sessions = match &session_key {
			Some(key) => {
				let manager = SessionManager::new(key, SessionConfig::default())?;
				catalog.merge(helpers::flash());
				Some(manager)
			}
			None => None,
		};

		if let Some(callback) = globals {
			catalog.merge(helpers::globals(callback));
		}
		catalog.merge(user_helpers);

		let views = Views::load(&root, catalog, debug)?;
		let debug_enabled = debug;
		tracing::info!(
			root = %root.display(),
			pages = views.registry().page_names().count(),
			partials = views.registry().partial_names().count(),
			debug = debug_enabled,
			"views loaded"
		);

		let secure_headers = SecureHeadersConfig::default().with_csp_directives(csp);

		Ok(Self {
			root,
			logger,
			views,
			files,
			secure_headers,
			sessions,
			translator,
			#[cfg(feature = "database")]
			db,
		})
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn views(&self) -> &Views {
		&self.views
	}

	pub fn files(&self) -> &HashedFiles {
		&self.files
	}

	pub fn translator(&self) -> Option<&Translator> {
		self.translator.as_deref()
	}

	pub fn sessions(&self) -> Option<&SessionManager> {
		self.sessions.as_ref()
	}

	#[cfg(feature = "database")]
	pub fn db(&self) -> Option<&Db> {
		self.db.as_ref()
	}

	/// Middleware for every route: panic and error recovery, request
	/// logging, security headers and method override, outermost first.
	pub fn std_chain(&self) -> Chain {
		Chain::new()
			.append(Arc::new(
				RecoverMiddleware::new(self.views.clone()).with_dispatch(self.logger.clone()),
			))
			.append(Arc::new(LoggingMiddleware::new()))
			.append(Arc::new(SecureHeadersMiddleware::with_config(
				self.secure_headers.clone(),
			)))
			.append(Arc::new(MethodOverrideMiddleware::new()))
	}

	/// Middleware for dynamic routes: CSRF protection, then sessions when a
	/// session key is configured.
	pub fn dyn_chain(&self) -> Chain {
		let chain = Chain::new().append(Arc::new(CsrfMiddleware::new()));
		match &self.sessions {
			Some(manager) => chain.append(Arc::new(SessionMiddleware::new(manager.clone()))),
			None => chain,
		}
	}

	/// Handler serving `static/` below the root.
	pub fn file_server(&self) -> FileServer {
		FileServer::new(&self.root)
	}

	/// Store a message shown once by the `flash()` template helper.
	///
	/// # Errors
	///
	/// Fails when the request did not pass through a session middleware.
	pub fn flash(&self, request: &Request, message: &str) -> bow_http::Result<()> {
		let session = Session::from_request(request)
			.ok_or_else(|| bow_http::Error::Session("sessions are not enabled".to_string()))?;
		session.put(FLASH_KEY, message)
	}

	/// Serve `handler` on `addr` until Ctrl-C, then drain connections for up
	/// to five seconds.
	#[cfg(feature = "server")]
	pub async fn run(
		&self,
		addr: std::net::SocketAddr,
		handler: Arc<dyn bow_http::Handler>,
	) -> Result<()> {
		use bow_server::{DEFAULT_GRACE_PERIOD, HttpServer, shutdown_signal};

		let server = HttpServer::new(handler).listen_with_shutdown(
			addr,
			shutdown_signal(),
			DEFAULT_GRACE_PERIOD,
		);
		match self.logger.clone() {
			Some(logger) => server.with_subscriber(logger).await?,
			None => server.await?,
		}
		Ok(())
	}

	/// Release the database connections.
	pub async fn close(&self) {
		#[cfg(feature = "database")]
		if let Some(db) = &self.db {
			db.close().await;
		}
	}
}

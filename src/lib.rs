//! # bow
//!
//! A small convenience layer for server-rendered web applications.
//!
//! bow ties a handful of subsystems to one [`Core`] value an application
//! embeds:
//!
//! - **Views**: Tera templates under `views/`, with layouts, partials, Turbo
//!   stream fragments and request-scoped helpers
//! - **Sessions**: AES-GCM encrypted cookie sessions with flash messages
//! - **CSRF**: double-submit cookie protection for unsafe methods
//! - **Translations**: CSV phrase tables under `translations/` with locale
//!   negotiation
//! - **Database**: SQLite with `migrations/*.sql` applied at startup
//! - **Static files**: content-hashed names and a caching file server
//!
//! ## Feature Flags
//!
//! - `full` (default) - everything below
//! - `database` - SQLite and migrations ([`bow_db`])
//! - `forms` - form validation ([`bow_forms`])
//! - `server` - the hyper server behind [`Core::run`]
//!
//! ## Application layout
//!
//! ```text
//! app/
//! ├── views/
//! │   ├── layouts/base.html
//! │   ├── home.html
//! │   └── _flash.html
//! ├── translations/fr_FR.csv
//! ├── migrations/001_init.sql
//! └── static/app.css
//! ```
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use bow::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CoreConfig::new("app")
//!     .with_session(b"0123456789abcdef0123456789abcdef")
//!     .with_translator("auto")
//!     .with_database("db/app.sqlite");
//! let core = Core::new(config).await?;
//!
//! let views = core.views().clone();
//! let home = core.dyn_chain().then(Arc::new(handler_fn(move |req: Request| {
//!     let views = views.clone();
//!     async move { Ok(views.render(&req, StatusCode::OK, "home", &())) }
//! })));
//!
//! let router = Router::new()
//!     .mount("/static/", Arc::new(core.file_server()))
//!     .route(Method::GET, "/", Arc::new(home));
//!
//! let app = core.std_chain().then(Arc::new(router));
//! core.run("127.0.0.1:8080".parse()?, Arc::new(app)).await?;
//! core.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod helpers;

pub use bow_http as http;
pub use bow_i18n as i18n;
pub use bow_middleware as middleware;
pub use bow_static as files;
pub use bow_views as views;

#[cfg(feature = "database")]
pub use bow_db as db;
#[cfg(feature = "forms")]
pub use bow_forms as forms;
#[cfg(feature = "server")]
pub use bow_server as server;

pub use crate::config::{AUTO_LOCALE, ConfigError, CoreConfig, GlobalsFn, Settings};
pub use crate::core::Core;
pub use crate::error::{CoreError, Result};
pub use crate::helpers::FLASH_KEY;

/// Everything a typical application needs in scope.
pub mod prelude {
	pub use crate::{Core, CoreConfig, CoreError};

	pub use bow_http::{
		Chain, Error, Handler, Method, Middleware, Request, Response, Router, StatusCode,
		handler_fn,
	};
	pub use bow_middleware::{Session, csrf_token};
	pub use bow_views::{StreamAction, Views, with_layout};

	#[cfg(feature = "database")]
	pub use bow_db::Db;
	#[cfg(feature = "forms")]
	pub use bow_forms::Form;

	pub use async_trait::async_trait;
	pub use serde::{Deserialize, Serialize};
}

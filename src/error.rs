//! Startup errors.

use crate::config::ConfigError;
use bow_i18n::I18nError;
use bow_middleware::InvalidSessionKey;
use bow_views::ViewError;

/// Errors raised while building or running a [`Core`](crate::Core).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
	#[error("invalid configuration: {0}")]
	Config(#[from] ConfigError),

	#[error("failed to load translations: {0}")]
	Translations(#[from] I18nError),

	#[error("failed to load views: {0}")]
	Views(#[from] ViewError),

	#[error("failed to set up sessions: {0}")]
	Session(#[from] InvalidSessionKey),

	#[cfg(feature = "database")]
	#[error("database error: {0}")]
	Database(#[from] bow_db::DbError),

	#[cfg(feature = "server")]
	#[error("server error: {0}")]
	Server(#[from] bow_server::ServerError),

	#[error("{0} support is not enabled in this build")]
	FeatureDisabled(&'static str),
}

pub type Result<T> = std::result::Result<T, CoreError>;

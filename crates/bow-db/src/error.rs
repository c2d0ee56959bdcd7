use std::path::PathBuf;

/// Database errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("database url required")]
	MissingUrl,

	#[error("cannot create database directory {path}: {source}")]
	CreateDir {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("cannot read migrations from {path}: {source}")]
	ReadMigrations {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("migration error: name={name:?}: {source}")]
	Migration {
		name: String,
		#[source]
		source: sqlx::Error,
	},

	#[error("database error: {0}")]
	Sqlx(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

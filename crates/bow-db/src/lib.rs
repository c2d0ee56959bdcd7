//! SQLite access for bow applications.
//!
//! [`Db::open`] connects with WAL journaling, `NORMAL` synchronous mode,
//! foreign key enforcement and a busy timeout. [`Db::migrate`] applies the
//! scripts in `<root>/migrations/*.sql` once each, in file name order.

mod error;
mod migrate;

pub use error::{DbError, Result};
pub use migrate::{MIGRATIONS_DIR, MIGRATIONS_TABLE};

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// In-memory database marker
pub const MEMORY: &str = ":memory:";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to an SQLite database and the directory holding its migrations.
#[derive(Debug, Clone)]
pub struct Db {
	pool: SqlitePool,
	url: String,
	root: PathBuf,
}

impl Db {
	/// Open the database at `url`.
	///
	/// `url` is a file path, an `sqlite:` URL or `:memory:`. For file
	/// databases the parent directory is created first. An in-memory database
	/// is held by a single pooled connection so every query sees the same data.
	///
	/// # Examples
	///
	/// ```
	/// use bow_db::Db;
	///
	/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
	/// let db = Db::open(":memory:", ".").await.unwrap();
	/// assert!(db.is_memory());
	/// db.close().await;
	/// # });
	/// ```
	pub async fn open(url: &str, root: impl AsRef<Path>) -> Result<Self> {
		if url.is_empty() {
			return Err(DbError::MissingUrl);
		}

		let memory = is_memory_url(url);
		let options = if memory {
			SqliteConnectOptions::from_str("sqlite::memory:")?
		} else if url.starts_with("sqlite:") {
			SqliteConnectOptions::from_str(url)?.create_if_missing(true)
		} else {
			create_parent_dir(Path::new(url))?;
			SqliteConnectOptions::new()
				.filename(url)
				.create_if_missing(true)
		};

		let options = options
			.journal_mode(SqliteJournalMode::Wal)
			.synchronous(SqliteSynchronous::Normal)
			.foreign_keys(true)
			.busy_timeout(BUSY_TIMEOUT);

		let pool_options = if memory {
			SqlitePoolOptions::new()
				.min_connections(1)
				.max_connections(1)
				.idle_timeout(None)
				.max_lifetime(None)
		} else {
			SqlitePoolOptions::new()
		};

		let pool = pool_options.connect_with(options).await?;
		tracing::debug!(url, "database opened");

		Ok(Self {
			pool,
			url: url.to_string(),
			root: root.as_ref().to_path_buf(),
		})
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub fn is_memory(&self) -> bool {
		is_memory_url(&self.url)
	}

	/// Start a transaction
	pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
		Ok(self.pool.begin().await?)
	}

	/// Close every pooled connection
	pub async fn close(&self) {
		self.pool.close().await;
	}
}

fn is_memory_url(url: &str) -> bool {
	matches!(url, MEMORY | "sqlite::memory:" | "sqlite://:memory:")
}

fn create_parent_dir(path: &Path) -> Result<()> {
	match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
			.map_err(|source| DbError::CreateDir {
				path: parent.to_path_buf(),
				source,
			}),
		_ => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_empty_url_is_rejected() {
		let result = Db::open("", ".").await;
		assert!(matches!(result, Err(DbError::MissingUrl)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_file_database_creates_parent_dir() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("data").join("app.db");

		let db = Db::open(path.to_str().unwrap(), dir.path()).await.unwrap();
		assert!(path.exists());
		assert!(!db.is_memory());

		let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
			.fetch_one(db.pool())
			.await
			.unwrap();
		assert_eq!(mode, "wal");
		db.close().await;
	}

	#[rstest]
	#[tokio::test]
	async fn test_pragmas_are_applied() {
		let db = Db::open(MEMORY, ".").await.unwrap();

		let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
			.fetch_one(db.pool())
			.await
			.unwrap();
		assert_eq!(foreign_keys, 1);

		let busy_timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
			.fetch_one(db.pool())
			.await
			.unwrap();
		assert_eq!(busy_timeout, 5000);
		db.close().await;
	}

	#[rstest]
	#[tokio::test]
	async fn test_memory_database_is_shared_by_queries() {
		let db = Db::open(MEMORY, ".").await.unwrap();
		sqlx::query("CREATE TABLE notes (id INTEGER PRIMARY KEY)")
			.execute(db.pool())
			.await
			.unwrap();

		let mut tx = db.begin().await.unwrap();
		sqlx::query("INSERT INTO notes (id) VALUES (1)")
			.execute(&mut *tx)
			.await
			.unwrap();
		tx.commit().await.unwrap();

		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
			.fetch_one(db.pool())
			.await
			.unwrap();
		assert_eq!(count, 1);
	}
}

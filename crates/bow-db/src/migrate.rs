use crate::{Db, DbError, Result};
use std::path::{Path, PathBuf};

/// Directory below the application root holding `*.sql` scripts.
pub const MIGRATIONS_DIR: &str = "migrations";

/// Table recording applied migrations.
pub const MIGRATIONS_TABLE: &str = "migrations";

impl Db {
	/// Apply pending migrations and return the names applied by this call.
	///
	/// Each script runs in its own transaction together with its record in
	/// the `migrations` table, so a failing script leaves no trace and stops
	/// the run. Scripts already recorded are skipped. A missing migrations
	/// directory means there is nothing to apply.
	pub async fn migrate(&self) -> Result<Vec<String>> {
		sqlx::query("CREATE TABLE IF NOT EXISTS migrations (name TEXT PRIMARY KEY)")
			.execute(self.pool())
			.await?;

		let mut applied = Vec::new();
		for (name, path) in migration_files(&self.root).await? {
			if self.migrate_file(&name, &path).await? {
				tracing::info!(name = %name, "migration applied");
				applied.push(name);
			}
		}

		Ok(applied)
	}

	/// Run one script unless it already ran. Returns whether it ran.
	async fn migrate_file(&self, name: &str, path: &Path) -> Result<bool> {
		let script = tokio::fs::read_to_string(path)
			.await
			.map_err(|source| DbError::ReadMigrations {
				path: path.to_path_buf(),
				source,
			})?;

		let migration_error = |source| DbError::Migration {
			name: name.to_string(),
			source,
		};

		let mut tx = self.pool().begin().await.map_err(migration_error)?;

		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations WHERE name = ?")
			.bind(name)
			.fetch_one(&mut *tx)
			.await
			.map_err(migration_error)?;
		if count != 0 {
			return Ok(false);
		}

		sqlx::raw_sql(&script)
			.execute(&mut *tx)
			.await
			.map_err(migration_error)?;

		sqlx::query("INSERT INTO migrations (name) VALUES (?)")
			.bind(name)
			.execute(&mut *tx)
			.await
			.map_err(migration_error)?;

		tx.commit().await.map_err(migration_error)?;
		Ok(true)
	}
}

/// `migrations/*.sql` under `root`, sorted by name.
///
/// Names are recorded relative to the root, e.g. `migrations/0001_init.sql`.
async fn migration_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
	let dir = root.join(MIGRATIONS_DIR);
	let read_error = |source| DbError::ReadMigrations {
		path: dir.clone(),
		source,
	};
	let mut entries = match tokio::fs::read_dir(&dir).await {
		Ok(entries) => entries,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
		Err(source) => return Err(read_error(source)),
	};

	let mut files = Vec::new();
	while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
		let path = entry.path();
		if path.extension().is_none_or(|ext| ext != "sql") {
			continue;
		}
		// Follows symlinks, unlike the entry's own file type.
		let is_file = tokio::fs::metadata(&path)
			.await
			.is_ok_and(|meta| meta.is_file());
		if !is_file {
			continue;
		}
		if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
			files.push((format!("{MIGRATIONS_DIR}/{file_name}"), path));
		}
	}

	files.sort_by(|a, b| a.0.cmp(&b.0));
	Ok(files)
}

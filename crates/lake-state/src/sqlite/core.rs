use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub struct SqliteDatabase {
    pub(super) pool: SqlitePool,
}

fn sqlite_database_file_path(database_url: &str) -> Option<PathBuf> {
    let raw = if let Some(rest) = database_url.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = database_url.strip_prefix("sqlite:") {
        rest
    } else {
        return None;
    };

    let path = raw.split('?').next().unwrap_or(raw);
    if path.is_empty() || path == ":memory:" || path.starts_with("file:") {
        return None;
    }

    Some(PathBuf::from(path))
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

impl SqliteDatabase {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::new_with_pool_size(database_url, 5).await
    }

    pub async fn new_with_pool_size(database_url: &str, max_connections: u32) -> Result<Self> {
        if let Some(path) = sqlite_database_file_path(database_url) {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!(
                            "Failed to create SQLite database directory: {}",
                            parent.display()
                        )
                    })?;
                }
            }
        }

        let in_memory = is_in_memory(database_url);
        let mut options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid SQLite database URL: {}", database_url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            // WAL allows concurrent reads while a claim or completion is being written
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        // An in-memory database lives as long as its single connection.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };
        let pool = pool_options
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations_sqlite")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::{is_in_memory, sqlite_database_file_path};
    use std::path::PathBuf;

    #[test]
    fn test_sqlite_database_file_path_extracts_file_paths() {
        assert_eq!(
            sqlite_database_file_path("sqlite://./.lake/lake.db?mode=rwc"),
            Some(PathBuf::from("./.lake/lake.db"))
        );
        assert_eq!(
            sqlite_database_file_path("sqlite:///var/lib/lake/lake.db"),
            Some(PathBuf::from("/var/lib/lake/lake.db"))
        );
        assert_eq!(
            sqlite_database_file_path("sqlite:./local.db"),
            Some(PathBuf::from("./local.db"))
        );
    }

    #[test]
    fn test_sqlite_database_file_path_ignores_memory_and_non_file_urls() {
        assert_eq!(sqlite_database_file_path(":memory:"), None);
        assert_eq!(sqlite_database_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_database_file_path("sqlite://:memory:"), None);
        assert_eq!(
            sqlite_database_file_path("sqlite://file:memdb1?mode=memory&cache=shared"),
            None
        );
        assert_eq!(
            sqlite_database_file_path("postgres://localhost/lake"),
            None
        );
    }

    #[test]
    fn test_in_memory_detection() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:memdb1?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://./lake.db"));
    }
}

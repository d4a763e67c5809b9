//! Database connection and schema management.
//!
//! This module provides SQLite database connectivity with:
//! - Connection pool management
//! - WAL mode and a busy timeout on every connection
//! - Embedded migrations
//! - A startup integrity check for the tables ingestion depends on
//! - Read-only opens and in-memory snapshots for dry runs
//!
//! # Example
//!
//! ```no_run
//! use hansard_core::{Database, DatabaseOptions};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("hansard.db"), &DatabaseOptions::default()).await?;
//! db.verify_schema().await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Default maximum number of connections in the pool.
/// Kept low for SQLite since it uses file-level locking.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default time a connection waits on a locked database before `SQLITE_BUSY`.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Tables ingestion reads or writes, in foreign-key dependency order.
pub const REQUIRED_TABLES: [&str; 5] = [
    "parliamentary_terms",
    "mps",
    "download_records",
    "sessions",
    "statements",
];

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to connect to the database or run a query.
    #[error("failed to connect to database: {0}")]
    Connection(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A table ingestion depends on does not exist.
    #[error(
        "required table '{table}' is missing from {database}\n  Suggestion: run without --no-migrate, or apply the migrations in ./migrations to this database"
    )]
    MissingTable {
        /// The missing table.
        table: &'static str,
        /// Database location, for the operator.
        database: String,
    },

    /// A dry-run snapshot was requested for a database with no backing file.
    #[error("cannot snapshot an in-memory database")]
    SnapshotUnavailable,
}

/// Pool and migration settings.
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// How long a connection waits on a lock.
    pub busy_timeout: Duration,
    /// Whether embedded migrations run on open.
    pub run_migrations: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            run_migrations: true,
        }
    }
}

/// Database connection wrapper with connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl Database {
    /// Opens (creating if needed) the database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the connection fails,
    /// or `DbError::Migration` if migrations fail.
    #[instrument(skip(db_path, options), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path, options: &DatabaseOptions) -> Result<Self, DbError> {
        let connect = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(options.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections.max(1))
            .connect_with(connect)
            .await?;

        if options.run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
            debug!("migrations applied");
        }

        Ok(Self {
            pool,
            path: Some(db_path.to_path_buf()),
        })
    }

    /// Creates a migrated in-memory database.
    ///
    /// The pool holds a single connection that is never recycled, so the
    /// database lives as long as the `Database`.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the connection fails,
    /// or `DbError::Migration` if migrations fail.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = memory_pool().await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool, path: None })
    }

    /// Returns a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the backing file, or `None` for in-memory databases.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Checks that every table in [`REQUIRED_TABLES`] exists.
    ///
    /// # Errors
    ///
    /// Returns `DbError::MissingTable` for the first absent table.
    #[instrument(skip(self))]
    pub async fn verify_schema(&self) -> Result<(), DbError> {
        for table in REQUIRED_TABLES {
            let found: Option<(String,)> =
                sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                    .bind(table)
                    .fetch_optional(&self.pool)
                    .await?;
            if found.is_none() {
                return Err(DbError::MissingTable {
                    table,
                    database: self.describe(),
                });
            }
        }
        debug!("schema integrity check passed");
        Ok(())
    }

    /// Opens an existing database without writing to it.
    ///
    /// The journal mode is left as the file has it and migrations never run.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the file cannot be opened.
    #[instrument(skip(db_path, options), fields(path = %db_path.display()))]
    pub async fn open_read_only(db_path: &Path, options: &DatabaseOptions) -> Result<Self, DbError> {
        let connect = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .read_only(true)
            .busy_timeout(options.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections.max(1))
            .connect_with(connect)
            .await?;

        Ok(Self {
            pool,
            path: Some(db_path.to_path_buf()),
        })
    }

    /// Copies every required table into a fresh in-memory database.
    ///
    /// Rows travel as one JSON array per table, so the copy needs nothing
    /// from this database beyond read access. Writes to the snapshot never
    /// reach this database.
    ///
    /// # Errors
    ///
    /// Returns `DbError::SnapshotUnavailable` for in-memory sources, or a
    /// connection error if the copy fails.
    #[instrument(skip(self))]
    pub async fn dry_run_snapshot(&self) -> Result<Self, DbError> {
        let source = self.path.as_ref().ok_or(DbError::SnapshotUnavailable)?;

        let pool = memory_pool().await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        let mut conn = pool.acquire().await?;
        // Rows reference each other across tables (record <-> session).
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;
        for table in REQUIRED_TABLES {
            let columns: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?)")
                .bind(table)
                .fetch_all(&mut *conn)
                .await?;
            let columns: Vec<String> = columns.into_iter().map(|(name,)| name).collect();

            let pairs = columns
                .iter()
                .map(|c| format!("'{c}', \"{c}\""))
                .collect::<Vec<_>>()
                .join(", ");
            let (rows,): (String,) = sqlx::query_as(&format!(
                "SELECT json_group_array(json_object({pairs})) FROM \"{table}\""
            ))
            .fetch_one(&self.pool)
            .await?;

            let names = columns
                .iter()
                .map(|c| format!("\"{c}\""))
                .collect::<Vec<_>>()
                .join(", ");
            let values = columns
                .iter()
                .map(|c| format!("json_extract(value, '$.\"{c}\"')"))
                .collect::<Vec<_>>()
                .join(", ");
            let copied = sqlx::query(&format!(
                "INSERT INTO \"{table}\" ({names}) SELECT {values} FROM json_each(?)"
            ))
            .bind(rows)
            .execute(&mut *conn)
            .await?;
            debug!(table, rows = copied.rows_affected(), "copied table into snapshot");
        }
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await?;
        drop(conn);

        info!(source = %source.display(), "dry run: working on in-memory database snapshot");
        Ok(Self { pool, path: None })
    }

    /// Checks if WAL mode is enabled.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the query fails.
    pub async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0.eq_ignore_ascii_case("wal"))
    }

    /// Gracefully closes all connections in the pool.
    pub async fn close(self) {
        self.pool.close().await;
    }

    fn describe(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| ":memory:".to_string(), |p| p.display().to_string())
    }
}

async fn memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let connect = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(connect)
        .await
}

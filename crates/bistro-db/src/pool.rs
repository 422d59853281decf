//! # Database Pool Management
//!
//! Connection pool creation, configuration, and the session scope every
//! repository call runs in.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  DbConfig::new(url) / DbConfig::from_env()                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + create schema             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ one connection per open Session                                │
//! │       ▼                                                                 │
//! │  scoped(f):  open ─► f(session) ─┬─ Ok  ─► commit (auto) / release     │
//! │                                  └─ Err ─► rollback ─► same Err        │
//! │                                                                         │
//! │  unit_of_work(f): scoped(f + commit)                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Better concurrent read performance
//! - Readers don't block writers
//! - Writers don't block readers

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::menu::MenuRepository;
use crate::repository::order::OrderRepository;
use crate::repository::reservation::ReservationRepository;
use crate::repository::restaurant::RestaurantRepository;
use crate::repository::table::TableRepository;
use crate::session::Session;

/// Environment variable holding the database URL.
pub const ENV_DATABASE_URL: &str = "BISTRO_DATABASE_URL";
/// Environment variable enabling SQL statement echo.
pub const ENV_ECHO: &str = "BISTRO_DB_ECHO";
/// Environment variable enabling auto-commit of scoped sessions.
pub const ENV_AUTO_COMMIT: &str = "BISTRO_DB_AUTO_COMMIT";
/// Environment variable overriding the pool size.
pub const ENV_MAX_CONNECTIONS: &str = "BISTRO_DB_MAX_CONNECTIONS";

const IN_MEMORY_URL: &str = "sqlite::memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust
/// use bistro_db::DbConfig;
///
/// let config = DbConfig::new("sqlite://bistro.db?mode=rwc")
///     .echo(true)
///     .max_connections(5);
/// assert!(!config.auto_commit);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite connection URL (`sqlite://path?mode=rwc`, `sqlite::memory:`).
    pub database_url: String,

    /// Log every executed SQL statement.
    /// Default: false
    pub echo: bool,

    /// Commit a scoped session that finished without error.
    /// Default: false (only `unit_of_work` commits)
    pub auto_commit: bool,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Timeout for acquiring a connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// Maximum lifetime of a pooled connection.
    /// Default: 30 minutes
    pub max_lifetime: Option<Duration>,

    /// Whether to create the schema on connect.
    /// Default: true
    pub create_schema: bool,
}

impl DbConfig {
    /// Creates a configuration for the given connection URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        DbConfig {
            database_url: database_url.into(),
            echo: false,
            auto_commit: false,
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            create_schema: true,
        }
    }

    /// Creates a configuration for a database file, created if missing.
    ///
    /// ## Example
    /// ```rust
    /// use bistro_db::DbConfig;
    ///
    /// let config = DbConfig::from_path("./data/bistro.db");
    /// assert_eq!(config.database_url, "sqlite://./data/bistro.db?mode=rwc");
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::new(format!("sqlite://{}?mode=rwc", path.as_ref().display()))
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Note
    /// Every connection to `:memory:` opens its own empty database, so the
    /// pool is pinned to a single connection that never expires. A second
    /// session only opens after the first one has finished.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            max_lifetime: None,
            ..Self::new(IN_MEMORY_URL)
        }
    }

    /// Builds a configuration from `BISTRO_*` environment variables.
    ///
    /// ## Variables
    /// - `BISTRO_DATABASE_URL` (default: in-memory)
    /// - `BISTRO_DB_ECHO` (`true`/`false`/`1`/`0`)
    /// - `BISTRO_DB_AUTO_COMMIT` (`true`/`false`/`1`/`0`)
    /// - `BISTRO_DB_MAX_CONNECTIONS` (positive integer)
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let mut config = match lookup(ENV_DATABASE_URL) {
            Some(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::in_memory(),
        };

        if let Some(raw) = lookup(ENV_ECHO) {
            config.echo = parse_flag(ENV_ECHO, &raw)?;
        }

        if let Some(raw) = lookup(ENV_AUTO_COMMIT) {
            config.auto_commit = parse_flag(ENV_AUTO_COMMIT, &raw)?;
        }

        if let Some(raw) = lookup(ENV_MAX_CONNECTIONS) {
            config.max_connections = raw.trim().parse().map_err(|_| {
                DbError::Configuration(format!("{ENV_MAX_CONNECTIONS}: '{raw}' is not a number"))
            })?;
        }

        Ok(config)
    }

    /// Sets statement echo.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Sets auto-commit of scoped sessions.
    pub fn auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to create the schema on connect.
    pub fn create_schema(mut self, create: bool) -> Self {
        self.create_schema = create;
        self
    }

    fn validate(&self) -> DbResult<()> {
        if !self.database_url.starts_with("sqlite:") {
            return Err(DbError::Configuration(format!(
                "database_url must start with 'sqlite:', got '{}'",
                self.database_url
            )));
        }

        if self.max_connections == 0 {
            return Err(DbError::Configuration(
                "max_connections must be at least 1".to_string(),
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(DbError::Configuration(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }

        Ok(())
    }
}

fn parse_flag(key: &str, raw: &str) -> DbResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(DbError::Configuration(format!(
            "{key}: '{raw}' is not a boolean"
        ))),
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle: the session factory behind every repository.
///
/// Cheap to clone; all clones share one pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::in_memory()).await?;
///
/// let saved = db
///     .unit_of_work(|session| async move {
///         let restaurants = RestaurantRepository::with_session(session.clone());
///         let tables = TableRepository::with_session(session);
///
///         let restaurant = restaurants.save(restaurant).await?;
///         let rid = restaurant.id.unwrap_or_default();
///         tables.save(Table::new("Table1", 4, rid)).await?;
///         Ok(restaurant)
///     })
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Commit scoped sessions that finish without error.
    auto_commit: bool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Validates the configuration
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled (needed for cascades)
    ///    - Statement echo on or off
    /// 3. Creates the connection pool
    /// 4. Creates the schema (if enabled)
    ///
    /// ## Errors
    /// - `Configuration` for an invalid config or URL
    /// - `ConnectionFailed` if SQLite can't be opened
    /// - `MigrationFailed` if the schema can't be created
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        config.validate()?;

        info!(
            url = %config.database_url,
            auto_commit = config.auto_commit,
            "Initializing database connection"
        );

        let connect_options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| DbError::Configuration(format!("{}: {e}", config.database_url)))?
            // WAL mode: Better concurrent read performance
            .journal_mode(SqliteJournalMode::Wal)
            // NORMAL synchronous: Good balance of durability and speed
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has foreign keys disabled by default
            .foreign_keys(true)
            // Sessions queue for the write lock this long
            .busy_timeout(config.connect_timeout)
            .create_if_missing(true);

        let connect_options = if config.echo {
            connect_options.log_statements(log::LevelFilter::Info)
        } else {
            connect_options.disable_statement_logging()
        };

        debug!(echo = config.echo, "Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            auto_commit: config.auto_commit,
        };

        if config.create_schema {
            db.create_schema().await?;
        }

        Ok(db)
    }

    /// Creates all tables, indexes and constraints.
    ///
    /// Idempotent: already-applied migrations are skipped.
    pub async fn create_schema(&self) -> DbResult<()> {
        info!("Creating database schema");
        migrations::run_migrations(&self.pool).await
    }

    /// Drops every table created by [`Database::create_schema`].
    ///
    /// Idempotent: missing tables are skipped. Data is lost.
    pub async fn drop_schema(&self) -> DbResult<()> {
        info!("Dropping database schema");
        migrations::drop_schema(&self.pool).await
    }

    /// Whether scoped sessions commit on success.
    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Returns a reference to the connection pool.
    ///
    /// ## Usage
    /// For diagnostics only. Writes belong in a [`Session`].
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Opens a new session (a fresh transaction).
    ///
    /// The caller owns it and must commit, roll back or release it.
    pub async fn open_session(&self) -> DbResult<Session> {
        Session::begin(&self.pool).await
    }

    /// Runs `f` in a fresh session and closes the session afterwards.
    ///
    /// ## Outcome
    /// - `f` succeeded, auto-commit on: commit (if `f` didn't already)
    /// - `f` succeeded, auto-commit off: uncommitted writes are discarded
    /// - `f` failed: rollback, then the same error is returned
    /// - the rollback failed too: `RollbackFailed` carrying the error
    /// - `f` panicked: the transaction rolls back when it is dropped
    pub async fn scoped<T, F, Fut>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let session = self.open_session().await?;

        match f(session.clone()).await {
            Ok(value) => {
                if self.auto_commit && session.is_active().await {
                    session.commit().await?;
                } else {
                    session.release().await?;
                }
                Ok(value)
            }
            Err(err) => {
                error!(session = session.id(), error = %err, "Session rollback because of error");

                if let Err(rollback_err) = session.rollback().await {
                    return Err(DbError::RollbackFailed {
                        cause: Box::new(err),
                        reason: rollback_err.to_string(),
                    });
                }

                Err(err)
            }
        }
    }

    /// Runs `action` in one session and commits if it succeeds.
    ///
    /// Every repository built with [`Session`] handles from `action`
    /// shares the same transaction: all of their writes commit together
    /// or none do.
    ///
    /// ## Errors
    /// Whatever `action` returned (after a rollback), or the commit error.
    pub async fn unit_of_work<T, F, Fut>(&self, action: F) -> DbResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        self.scoped(|session| async move {
            let value = action(session.clone()).await?;
            session.commit().await?;
            info!(session = session.id(), "Unit of work committed");
            Ok(value)
        })
        .await
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    /// Returns the restaurant repository.
    pub fn restaurants(&self) -> RestaurantRepository {
        RestaurantRepository::new(self.clone())
    }

    /// Returns the menu repository.
    pub fn menus(&self) -> MenuRepository {
        MenuRepository::new(self.clone())
    }

    /// Returns the table repository.
    pub fn tables(&self) -> TableRepository {
        TableRepository::new(self.clone())
    }

    /// Returns the reservation repository.
    pub fn reservations(&self) -> ReservationRepository {
        ReservationRepository::new(self.clone())
    }

    /// Returns the order repository.
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.clone())
    }

    /// Closes the database connection pool.
    ///
    /// ## Note
    /// After calling close, opening a session fails.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    async fn count_addresses(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM addresses")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn insert_address(session: &Session) -> DbResult<()> {
        let mut conn = session.acquire().await?;
        sqlx::query(
            "INSERT INTO addresses (created, street, city, zip, country)
             VALUES (CURRENT_TIMESTAMP, 'Hauptstraße 1', 'Salzburg', '5020', 'AT')",
        )
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        assert!(!db.auto_commit());
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("sqlite://test.db")
            .max_connections(10)
            .min_connections(2)
            .auto_commit(true)
            .echo(true);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(config.auto_commit);
        assert!(config.echo);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let err = Database::new(DbConfig::in_memory().max_connections(0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Configuration(_)));

        let err = Database::new(DbConfig::new("postgres://nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Configuration(_)));
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_DATABASE_URL, "sqlite://bistro.db?mode=rwc"),
            (ENV_ECHO, "1"),
            (ENV_AUTO_COMMIT, "true"),
            (ENV_MAX_CONNECTIONS, "8"),
        ]);

        let config = DbConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.database_url, "sqlite://bistro.db?mode=rwc");
        assert!(config.echo);
        assert!(config.auto_commit);
        assert_eq!(config.max_connections, 8);
    }

    #[test]
    fn test_config_from_lookup_defaults_and_errors() {
        let config = DbConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.database_url, IN_MEMORY_URL);
        assert!(!config.auto_commit);

        let err = DbConfig::from_lookup(|k| (k == ENV_ECHO).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, DbError::Configuration(_)));

        let err = DbConfig::from_lookup(|k| (k == ENV_MAX_CONNECTIONS).then(|| "x".to_string()))
            .unwrap_err();
        assert!(matches!(err, DbError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unit_of_work_commits() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.unit_of_work(|session| async move { insert_address(&session).await })
            .await
            .unwrap();

        assert_eq!(count_addresses(&db).await, 1);
    }

    #[tokio::test]
    async fn test_unit_of_work_rolls_back_and_returns_same_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db
            .unit_of_work(|session| async move {
                insert_address(&session).await?;
                Err::<(), _>(DbError::Internal("abort".to_string()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Internal(msg) if msg == "abort"));
        assert_eq!(count_addresses(&db).await, 0);
    }

    #[tokio::test]
    async fn test_scoped_without_auto_commit_discards_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.scoped(|session| async move { insert_address(&session).await })
            .await
            .unwrap();

        assert_eq!(count_addresses(&db).await, 0);
    }

    #[tokio::test]
    async fn test_scoped_with_auto_commit_keeps_writes() {
        let db = Database::new(DbConfig::in_memory().auto_commit(true))
            .await
            .unwrap();

        db.scoped(|session| async move { insert_address(&session).await })
            .await
            .unwrap();

        assert_eq!(count_addresses(&db).await, 1);
    }

    #[tokio::test]
    async fn test_drop_and_create_schema_are_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.create_schema().await.unwrap();
        db.drop_schema().await.unwrap();
        db.drop_schema().await.unwrap();
        assert!(sqlx::query("SELECT COUNT(*) FROM addresses")
            .execute(db.pool())
            .await
            .is_err());

        db.create_schema().await.unwrap();
        assert_eq!(count_addresses(&db).await, 0);
    }

    #[tokio::test]
    async fn test_closed_pool_reports_connection_failure() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        assert!(!db.health_check().await);
        assert!(matches!(
            db.open_session().await,
            Err(DbError::ConnectionFailed(_))
        ));
    }
}

//! # Sessions
//!
//! A [`Session`] is one SQLite transaction that several repositories can
//! share. Cloning a session clones the handle, not the transaction.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Session Lifecycle                                │
//! │                                                                         │
//! │  Database::open_session()                                              │
//! │       │  BEGIN                                                          │
//! │       ▼                                                                 │
//! │  ┌──────────┐   acquire() ──► &mut SqliteConnection (one at a time)    │
//! │  │  ACTIVE  │   flush()   ──► pending writes visible in this session   │
//! │  └────┬─────┘                                                          │
//! │       │                                                                 │
//! │       ├── commit()   ──► COMMIT   ──┐                                  │
//! │       ├── rollback() ──► ROLLBACK ──┼──► CLOSED (acquire → error)      │
//! │       ├── release()  ──► ROLLBACK ──┤    (uncommitted writes dropped)  │
//! │       └── dropped    ──► ROLLBACK ──┘    (also on panic)               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//! The connection sits behind a `tokio::sync::Mutex`. A guard from
//! [`Session::acquire`] must be dropped before the same task calls
//! `acquire`, `commit` or `rollback` again on the same session.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to an open (or finished) transaction.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: u64,
    /// `None` once committed, rolled back or released.
    tx: Mutex<Option<Transaction<'static, Sqlite>>>,
    /// Set by repositories when they write through this session.
    written: AtomicBool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.inner.id).finish()
    }
}

impl Session {
    /// Starts a new transaction on a pooled connection.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front: concurrent
    /// sessions queue on the busy timeout instead of failing when a
    /// read turns into a write.
    pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);

        debug!(session = id, "Session opened");

        Ok(Session {
            inner: Arc::new(SessionInner {
                id,
                tx: Mutex::new(Some(tx)),
                written: AtomicBool::new(false),
            }),
        })
    }

    /// Process-unique session number, used in logs and errors.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Whether the transaction is still open.
    pub async fn is_active(&self) -> bool {
        self.inner.tx.lock().await.is_some()
    }

    /// Locks the session's connection for one repository operation.
    ///
    /// ## Errors
    /// `SessionClosed` once the session was committed or rolled back.
    pub async fn acquire(&self) -> DbResult<MappedMutexGuard<'_, SqliteConnection>> {
        let guard = self.inner.tx.lock().await;

        MutexGuard::try_map(guard, |slot| slot.as_deref_mut())
            .map_err(|_| DbError::SessionClosed { session: self.id() })
    }

    pub(crate) fn mark_written(&self) {
        self.inner.written.store(true, Ordering::Relaxed);
    }

    /// Makes pending writes visible to later reads of this session.
    ///
    /// Statements run as soon as a repository issues them, so this only
    /// checks that the session is still usable. Nothing is committed.
    pub async fn flush(&self) -> DbResult<()> {
        let _conn = self.acquire().await?;
        debug!(session = self.id(), "Session flushed");
        Ok(())
    }

    /// Commits the transaction and closes the session.
    ///
    /// ## Errors
    /// - `SessionClosed` if the session already finished
    /// - Whatever SQLite reports if it rejects the commit (a deferred
    ///   `ForeignKeyViolation`, a busy `QueryFailed`, ...)
    pub async fn commit(&self) -> DbResult<()> {
        let tx = self
            .inner
            .tx
            .lock()
            .await
            .take()
            .ok_or(DbError::SessionClosed { session: self.id() })?;

        tx.commit().await?;

        debug!(session = self.id(), "Session committed");
        Ok(())
    }

    /// Rolls back the transaction. A no-op on a finished session.
    pub async fn rollback(&self) -> DbResult<()> {
        let Some(tx) = self.inner.tx.lock().await.take() else {
            return Ok(());
        };

        tx.rollback().await?;

        debug!(session = self.id(), "Session rolled back");
        Ok(())
    }

    /// Ends the session without committing.
    ///
    /// Uncommitted writes are discarded. A no-op on a finished session.
    pub async fn release(&self) -> DbResult<()> {
        let Some(tx) = self.inner.tx.lock().await.take() else {
            return Ok(());
        };

        if self.inner.written.load(Ordering::Relaxed) {
            warn!(
                session = self.id(),
                "Releasing session with uncommitted writes; they are discarded"
            );
        }

        tx.rollback().await?;

        debug!(session = self.id(), "Session released");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};

    async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_session_ids_are_unique() {
        let db = database().await;

        let first = db.open_session().await.unwrap();
        first.release().await.unwrap();
        let second = db.open_session().await.unwrap();

        assert_ne!(first.id(), second.id());
        second.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_closes_session() {
        let db = database().await;
        let session = db.open_session().await.unwrap();

        assert!(session.is_active().await);
        session.commit().await.unwrap();
        assert!(!session.is_active().await);

        assert!(matches!(
            session.acquire().await,
            Err(DbError::SessionClosed { .. })
        ));
        assert!(matches!(
            session.commit().await,
            Err(DbError::SessionClosed { .. })
        ));
        assert!(matches!(
            session.flush().await,
            Err(DbError::SessionClosed { .. })
        ));
    }

    #[tokio::test]
    async fn test_rollback_and_release_are_idempotent() {
        let db = database().await;
        let session = db.open_session().await.unwrap();

        session.rollback().await.unwrap();
        session.rollback().await.unwrap();
        session.release().await.unwrap();
        assert!(!session.is_active().await);
    }

    #[tokio::test]
    async fn test_clones_share_the_transaction() {
        let db = database().await;
        let session = db.open_session().await.unwrap();
        let clone = session.clone();

        {
            let mut conn = session.acquire().await.unwrap();
            sqlx::query(
                "INSERT INTO addresses (created, street, city, zip, country)
                 VALUES (CURRENT_TIMESTAMP, 'Hauptstraße 1', 'Salzburg', '5020', 'AT')",
            )
            .execute(&mut *conn)
            .await
            .unwrap();
        }

        {
            let mut conn = clone.acquire().await.unwrap();
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses")
                .fetch_one(&mut *conn)
                .await
                .unwrap();
            assert_eq!(count, 1);
        }

        clone.rollback().await.unwrap();
        assert!(!session.is_active().await);
    }

    #[tokio::test]
    async fn test_commit_error_keeps_its_category() {
        let db = database().await;
        let session = db.open_session().await.unwrap();

        {
            let mut conn = session.acquire().await.unwrap();
            sqlx::query(
                "CREATE TABLE late_check (
                     id INTEGER PRIMARY KEY,
                     restaurant_id INTEGER REFERENCES restaurants(id) DEFERRABLE INITIALLY DEFERRED
                 )",
            )
            .execute(&mut *conn)
            .await
            .unwrap();

            // Deferred: accepted now, rejected at COMMIT
            sqlx::query("INSERT INTO late_check (restaurant_id) VALUES (999)")
                .execute(&mut *conn)
                .await
                .unwrap();
        }

        let err = session.commit().await.unwrap_err();

        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(!session.is_active().await);
    }
}

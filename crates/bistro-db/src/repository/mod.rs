//! # Repository Module
//!
//! Upsert repositories for the restaurant entities, and the session
//! plumbing they share.
//!
//! ## Session Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Where a Repository Gets Its Session                  │
//! │                                                                         │
//! │  XRepository::new(db)               XRepository::with_session(s)       │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  ┌──────────────────────┐          ┌──────────────────────┐            │
//! │  │  Factory(Database)   │          │   Bound(Session)     │            │
//! │  │                      │          │                      │            │
//! │  │  each call:          │          │  each call:          │            │
//! │  │  open → run → close  │          │  run in s            │            │
//! │  │  (auto-commit or     │          │  never commits,      │            │
//! │  │   discard, rollback  │          │  never rolls back    │            │
//! │  │   on error)          │          │  (s belongs to the   │            │
//! │  │                      │          │   unit of work)      │            │
//! │  └──────────────────────┘          └──────────────────────┘            │
//! │                                                                         │
//! │  unit_of_work(|s| ...)  ── only on Factory; Bound → Configuration      │
//! │  new_session(s)         ── same repository type, Bound(s)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Save Policy
//! Every `save` is an upsert:
//! 1. Positive id that exists → merge fields onto the stored row
//! 2. Otherwise, natural key match (if the entity has one) → merge
//! 3. Otherwise → insert, the database assigns the id
//!
//! ## Available Repositories
//!
//! - [`RestaurantRepository`](restaurant::RestaurantRepository) - Restaurants and shared addresses
//! - [`MenuRepository`](menu::MenuRepository) - Menu entries per restaurant
//! - [`TableRepository`](table::TableRepository) - Guest tables, capacity search
//! - [`ReservationRepository`](reservation::ReservationRepository) - Bookings and table links
//! - [`OrderRepository`](order::OrderRepository) - Orders and computed totals

use std::future::Future;
use tracing::error;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::session::Session;

pub mod menu;
pub mod order;
pub mod reservation;
pub mod restaurant;
pub mod table;

// =============================================================================
// Repository Base
// =============================================================================

#[derive(Debug, Clone)]
enum SessionSource {
    Factory(Database),
    Bound(Session),
}

/// The session source every repository delegates to.
#[derive(Debug, Clone)]
pub struct RepositoryBase {
    source: SessionSource,
}

impl RepositoryBase {
    /// Opens a fresh session per call.
    pub fn factory(db: Database) -> Self {
        RepositoryBase {
            source: SessionSource::Factory(db),
        }
    }

    /// Runs every call in `session`.
    pub fn bound(session: Session) -> Self {
        RepositoryBase {
            source: SessionSource::Bound(session),
        }
    }

    /// Whether calls run in a borrowed session.
    pub fn is_bound(&self) -> bool {
        matches!(self.source, SessionSource::Bound(_))
    }

    /// Returns the bound session, or a freshly opened one.
    ///
    /// A fresh session belongs to the caller, who must commit, roll back
    /// or release it.
    pub async fn get_session(&self) -> DbResult<Session> {
        match &self.source {
            SessionSource::Factory(db) => db.open_session().await,
            SessionSource::Bound(session) => Ok(session.clone()),
        }
    }

    /// Runs `f` with this repository's session.
    ///
    /// A bound session is left open for its owner; errors are logged and
    /// passed through without a rollback.
    pub(crate) async fn scoped<T, F, Fut>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        match &self.source {
            SessionSource::Factory(db) => db.scoped(f).await,
            SessionSource::Bound(session) => f(session.clone()).await.map_err(|err| {
                error!(session = session.id(), error = %err, "Error in borrowed session");
                err
            }),
        }
    }

    /// Runs `action` in one committed session.
    ///
    /// ## Errors
    /// `Configuration` when bound: the session's owner decides when it
    /// commits.
    pub async fn unit_of_work<T, F, Fut>(&self, action: F) -> DbResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        match &self.source {
            SessionSource::Factory(db) => db.unit_of_work(action).await,
            SessionSource::Bound(session) => Err(DbError::Configuration(format!(
                "unit_of_work needs a session factory; repository is bound to session {}",
                session.id()
            ))),
        }
    }

    /// Flushes pending writes of this repository's session.
    pub async fn sync(&self) -> DbResult<()> {
        self.scoped(|session| async move { session.flush().await })
            .await
    }
}

// =============================================================================
// Repository Trait
// =============================================================================

/// Behaviour shared by every entity repository.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.reservations();
///
/// repo.unit_of_work(|session| {
///     let repo = repo.new_session(session);
///     async move {
///         repo.save(reservation).await?;
///         repo.sync().await?;
///         repo.get_reservation_by_number("1234").await
///     }
/// })
/// .await?;
/// ```
pub trait Repository: Sized {
    /// The session source behind this repository.
    fn base(&self) -> &RepositoryBase;

    /// The same kind of repository, bound to `session`.
    fn new_session(&self, session: Session) -> Self;

    /// See [`RepositoryBase::get_session`].
    fn get_session(&self) -> impl Future<Output = DbResult<Session>> + Send {
        self.base().get_session()
    }

    /// See [`RepositoryBase::sync`].
    fn sync(&self) -> impl Future<Output = DbResult<()>> + Send {
        self.base().sync()
    }

    /// See [`RepositoryBase::unit_of_work`].
    fn unit_of_work<T, F, Fut>(&self, action: F) -> impl Future<Output = DbResult<T>> + Send
    where
        T: Send,
        F: FnOnce(Session) -> Fut + Send,
        Fut: Future<Output = DbResult<T>> + Send,
    {
        self.base().unit_of_work(action)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_support::database;
    use super::*;

    #[tokio::test]
    async fn test_factory_opens_a_fresh_session_per_call() {
        let db = database().await;
        let base = RepositoryBase::factory(db);

        // The in-memory pool holds one connection: release before reopening
        let first = base.get_session().await.unwrap();
        first.release().await.unwrap();
        let second = base.get_session().await.unwrap();

        assert!(!base.is_bound());
        assert_ne!(first.id(), second.id());
        assert!(!first.is_active().await);
        second.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_bound_base_returns_its_session() {
        let db = database().await;
        let session = db.open_session().await.unwrap();
        let base = RepositoryBase::bound(session.clone());

        assert!(base.is_bound());
        assert_eq!(base.get_session().await.unwrap().id(), session.id());

        base.sync().await.unwrap();
        session.rollback().await.unwrap();
        assert!(matches!(
            base.sync().await,
            Err(DbError::SessionClosed { .. })
        ));
    }
}

// =============================================================================
// Test Support
// =============================================================================

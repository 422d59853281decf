//! # bistro-db: Persistence Layer for Bistro
//!
//! This crate stores the Bistro entity model in SQLite using sqlx.
//! Every read and write runs inside a transactional [`Session`]; a unit of
//! work groups several repository calls into one commit.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bistro Data Flow                                 │
//! │                                                                         │
//! │  Caller (booking service, seed binary, tests)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     bistro-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │───►│ Restaurant    │    │ 001_initial_ │  │   │
//! │  │   │ Session       │    │ Menu, Table   │    │ schema.sql   │  │   │
//! │  │   │ unit_of_work  │◄───│ Reservation   │    │              │  │   │
//! │  │   │               │    │ Order         │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │        file (sqlite://bistro.db?mode=rwc) or sqlite::memory:    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Configuration, connection pool and session factory
//! - [`session`] - Transaction handle shared by repositories
//! - [`migrations`] - Embedded schema migrations and schema teardown
//! - [`error`] - Database error types
//! - [`repository`] - Upsert repositories, one per aggregate
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bistro_db::{Database, DbConfig, Repository};
//!
//! let db = Database::new(DbConfig::from_path("bistro.db")).await?;
//!
//! // Several repositories, one transaction
//! let restaurants = db.restaurants();
//! let saved = restaurants
//!     .unit_of_work(|session| {
//!         let repo = restaurants.new_session(session);
//!         async move { repo.save(restaurant).await }
//!     })
//!     .await?;
//!
//! // Reads outside a unit of work open their own session
//! let all = db.restaurants().get_all_restaurants().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{Repository, RepositoryBase};
pub use session::Session;

// Repository re-exports for convenience
pub use repository::menu::MenuRepository;
pub use repository::order::OrderRepository;
pub use repository::reservation::ReservationRepository;
pub use repository::restaurant::RestaurantRepository;
pub use repository::table::TableRepository;

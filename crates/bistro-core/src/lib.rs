//! # bistro-core: Entity Model for Bistro
//!
//! This crate holds the restaurant domain as plain data with zero I/O.
//! Persistence lives in `bistro-db`; everything here is pure.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Bistro Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                Application layer (out of scope)                 │   │
//! │  │        booking UI, waiter terminals, admin endpoints            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bistro-db (Repositories)                     │   │
//! │  │       Database ─► Session ─► RestaurantRepository, ...          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bistro-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   error   │  │ validation│  │   │
//! │  │   │Restaurant │  │   Money   │  │ CoreError │  │   rules   │  │   │
//! │  │   │Reservation│  │           │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Restaurant, Address, Menu, Table, Reservation, Order)
//! - [`money`] - Integer money used for menu prices and order totals
//! - [`error`] - Domain error types
//! - [`validation`] - Field rules checked before an entity is written
//!
//! ## Example Usage
//!
//! ```rust
//! use bistro_core::{Address, Entity, Restaurant};
//! use chrono::NaiveTime;
//!
//! let address = Address::new("Hauptstraße 1", "Salzburg", "5020", "AT");
//! let restaurant = Restaurant::new(
//!     "Test-Restaurant",
//!     NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
//!     NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
//!     "MONDAY;TUESDAY",
//!     address,
//! );
//!
//! // Transient until a repository saves it
//! assert!(!restaurant.is_persistent());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a reservation number.
///
/// The column is `VARCHAR(10)` in the schema; longer numbers are
/// rejected before they reach the database.
pub const MAX_RESERVATION_NUMBER_LEN: usize = 10;

/// Maximum length of free-text columns (names, streets, categories).
pub const MAX_TEXT_LEN: usize = 255;

/// Separator used in `Restaurant::open_days`.
pub const OPEN_DAYS_SEPARATOR: char = ';';

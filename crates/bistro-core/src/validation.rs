//! # Validation Module
//!
//! Field rules checked by the repositories before an entity is written.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (before the write)                               │
//! │  ├── Required text, length limits                                      │
//! │  ├── Country codes, weekday lists                                      │
//! │  └── Seats / people / price ranges                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: SQLite (at write time)                                       │
//! │  ├── UNIQUE reservation_number                                         │
//! │  ├── UNIQUE address content                                            │
//! │  └── Foreign keys                                                      │
//! │                                                                         │
//! │  Uniqueness is never checked here: it is the database's job.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bistro_core::validation::validate_table;
//! use bistro_core::Table;
//!
//! assert!(validate_table(&Table::new("Table1", 4, 1)).is_ok());
//! assert!(validate_table(&Table::new("Table1", 0, 1)).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{Address, Menu, Order, Reservation, Restaurant, Table};
use crate::{MAX_RESERVATION_NUMBER_LEN, MAX_TEXT_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound for seats at one table and people in one reservation.
pub const MAX_PARTY_SIZE: u32 = 500;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

fn validate_count(field: &str, value: u32) -> ValidationResult<()> {
    if value == 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if value > MAX_PARTY_SIZE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_PARTY_SIZE as i64,
        });
    }

    Ok(())
}

/// Validates a country code.
///
/// ## Rules
/// - Exactly two ASCII letters (ISO-3166 alpha-2)
/// - Upper case (`AT`, not `at`)
///
/// ## Example
/// ```rust
/// use bistro_core::validation::validate_country;
///
/// assert!(validate_country("AT").is_ok());
/// assert!(validate_country("at").is_err());
/// assert!(validate_country("AUT").is_err());
/// ```
pub fn validate_country(country: &str) -> ValidationResult<()> {
    if country.is_empty() {
        return Err(ValidationError::required("country"));
    }

    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::invalid_format(
            "country",
            "must be a two-letter upper-case ISO code",
        ));
    }

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates an address.
pub fn validate_address(address: &Address) -> ValidationResult<()> {
    validate_text("street", &address.street, MAX_TEXT_LEN)?;
    validate_text("city", &address.city, MAX_TEXT_LEN)?;
    validate_text("zip", &address.zip, 25)?;
    validate_country(&address.country)
}

/// Validates a restaurant and its address.
///
/// ## Rules
/// - Name is required
/// - `open_days` parses into weekdays
/// - Address is valid
pub fn validate_restaurant(restaurant: &Restaurant) -> ValidationResult<()> {
    validate_text("name", &restaurant.name, MAX_TEXT_LEN)?;

    restaurant
        .open_weekdays()
        .map_err(|e| ValidationError::invalid_format("open_days", e.to_string()))?;

    validate_address(&restaurant.address)
}

/// Validates a menu entry.
///
/// ## Rules
/// - Name and category are required
/// - Price must be non-negative (zero is allowed)
pub fn validate_menu(menu: &Menu) -> ValidationResult<()> {
    validate_text("name", &menu.name, MAX_TEXT_LEN)?;
    validate_text("category", &menu.category, MAX_TEXT_LEN)?;

    if menu.price_cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a table.
pub fn validate_table(table: &Table) -> ValidationResult<()> {
    validate_text("table_number", &table.table_number, MAX_TEXT_LEN)?;
    validate_count("seats", table.seats)
}

/// Validates a reservation.
///
/// ## Rules
/// - Name is required
/// - Number is required and at most 10 characters
/// - At least one person
/// - `time_from` and `time_until` differ
pub fn validate_reservation(reservation: &Reservation) -> ValidationResult<()> {
    validate_text(
        "reservation_name",
        &reservation.reservation_name,
        MAX_TEXT_LEN,
    )?;
    validate_text(
        "reservation_number",
        &reservation.reservation_number,
        MAX_RESERVATION_NUMBER_LEN,
    )?;
    validate_count("people", reservation.people)?;

    if reservation.time_from == reservation.time_until {
        return Err(ValidationError::invalid_format(
            "time_until",
            "must differ from time_from",
        ));
    }

    Ok(())
}

/// Validates an order.
pub fn validate_order(order: &Order) -> ValidationResult<()> {
    validate_text("waiter", &order.waiter, MAX_TEXT_LEN)
}

// =============================================================================
// Unit Tests
// =============================================================================

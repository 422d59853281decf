//! # Domain Types
//!
//! The entities persisted by `bistro-db`.
//!
//! ## Relationship Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Entity Relationships                            │
//! │                                                                         │
//! │              ┌─────────────┐   many ─► one   ┌─────────────┐           │
//! │              │ Restaurant  │────────────────►│   Address   │           │
//! │              │  menus[]    │  (shared, never │ (dedup by   │           │
//! │              │  tables[]   │   cascaded)     │  content)   │           │
//! │              └──┬───────┬──┘                 └─────────────┘           │
//! │     owns/cascade│       │owns/cascade                                   │
//! │                 ▼       ▼                                               │
//! │          ┌────────┐   ┌────────┐  many◄─►many  ┌─────────────┐         │
//! │          │  Menu  │   │ Table  │◄──────────────│ Reservation │         │
//! │          └───┬────┘   └───┬────┘   (table ids) └─────────────┘         │
//! │   many◄─►many│            │one ─► many                                  │
//! │  (menu ids)  │        ┌───▼────┐                                        │
//! │              └───────►│ Order  │  total = Σ menu prices                 │
//! │                       └────────┘                                        │
//! │                                                                         │
//! │  Owning edges hold values; every back-reference is an EntityId.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity carries the same audit shape:
//! - `id`: surrogate key, `None` while transient, assigned on first save
//! - `created`: set once on first save
//! - `modified`: `None` until the first update, refreshed on every update

use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::OPEN_DAYS_SEPARATOR;

/// Surrogate identity of a persisted row.
pub type EntityId = i64;

// =============================================================================
// Entity
// =============================================================================

/// Common identity and audit accessors shared by all entities.
pub trait Entity {
    /// The raw id, as carried by the value.
    fn id(&self) -> Option<EntityId>;

    /// When the row was first persisted.
    fn created(&self) -> Option<DateTime<Utc>>;

    /// When the row was last updated.
    fn modified(&self) -> Option<DateTime<Utc>>;

    /// The id only when it can identify a row (set and positive).
    fn persistent_id(&self) -> Option<EntityId> {
        self.id().filter(|id| *id > 0)
    }

    /// Whether the value claims to be backed by a row.
    fn is_persistent(&self) -> bool {
        self.persistent_id().is_some()
    }
}

macro_rules! impl_entity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Entity for $ty {
                fn id(&self) -> Option<EntityId> {
                    self.id
                }

                fn created(&self) -> Option<DateTime<Utc>> {
                    self.created
                }

                fn modified(&self) -> Option<DateTime<Utc>> {
                    self.modified
                }
            }
        )*
    };
}

impl_entity!(Address, Restaurant, Menu, Table, Reservation, Order);

// =============================================================================
// Address
// =============================================================================

/// A postal address, shared by any number of restaurants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Address {
    pub id: Option<EntityId>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub street: String,
    pub city: String,
    pub zip: String,
    /// ISO-3166 alpha-2 country code (e.g. "AT").
    pub country: String,
}

impl Address {
    /// Creates a transient address.
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        zip: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Address {
            id: None,
            created: None,
            modified: None,
            street: street.into(),
            city: city.into(),
            zip: zip.into(),
            country: country.into(),
        }
    }

    /// Whether both values describe the same location.
    ///
    /// This is the content key used for deduplication: street, city,
    /// zip and country. Identity and audit fields are ignored.
    pub fn same_location(&self, other: &Address) -> bool {
        self.street == other.street
            && self.city == other.city
            && self.zip == other.zip
            && self.country == other.country
    }
}

// =============================================================================
// Restaurant
// =============================================================================

/// A restaurant with its address and the collections it owns.
///
/// ## Ownership
/// ```text
/// Restaurant ──owns──► menus[]   (deleted with the restaurant)
///            ──owns──► tables[]  (deleted with the restaurant)
///            ──refs──► address   (outlives the restaurant)
/// ```
/// `menus` and `tables` are populated when the restaurant is loaded.
/// They are written through `MenuRepository` / `TableRepository`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: Option<EntityId>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub name: String,
    pub open_from: NaiveTime,
    pub open_until: NaiveTime,
    /// `;`-separated weekday names, e.g. `MONDAY;TUESDAY`.
    pub open_days: String,
    pub address: Address,
    #[serde(default)]
    pub menus: Vec<Menu>,
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Restaurant {
    /// Creates a transient restaurant with empty collections.
    pub fn new(
        name: impl Into<String>,
        open_from: NaiveTime,
        open_until: NaiveTime,
        open_days: impl Into<String>,
        address: Address,
    ) -> Self {
        Restaurant {
            id: None,
            created: None,
            modified: None,
            name: name.into(),
            open_from,
            open_until,
            open_days: open_days.into(),
            address,
            menus: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Copies the restaurant's own scalar fields from `other`.
    ///
    /// The address is normalized separately by the repository.
    pub fn merge_from(&mut self, other: &Restaurant) {
        self.name = other.name.clone();
        self.open_from = other.open_from;
        self.open_until = other.open_until;
        self.open_days = other.open_days.clone();
    }

    /// Parses `open_days` into weekdays, in stored order.
    pub fn open_weekdays(&self) -> CoreResult<Vec<Weekday>> {
        self.open_days
            .split(OPEN_DAYS_SEPARATOR)
            .map(str::trim)
            .filter(|day| !day.is_empty())
            .map(parse_weekday)
            .collect()
    }
}

fn parse_weekday(raw: &str) -> CoreResult<Weekday> {
    match raw.to_ascii_uppercase().as_str() {
        "MONDAY" | "MON" => Ok(Weekday::Mon),
        "TUESDAY" | "TUE" => Ok(Weekday::Tue),
        "WEDNESDAY" | "WED" => Ok(Weekday::Wed),
        "THURSDAY" | "THU" => Ok(Weekday::Thu),
        "FRIDAY" | "FRI" => Ok(Weekday::Fri),
        "SATURDAY" | "SAT" => Ok(Weekday::Sat),
        "SUNDAY" | "SUN" => Ok(Weekday::Sun),
        _ => Err(CoreError::UnknownWeekday(raw.to_string())),
    }
}

// =============================================================================
// Menu
// =============================================================================

/// A dish or drink on a restaurant's menu.
///
/// Natural key: `(name, category, restaurant_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Menu {
    pub id: Option<EntityId>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub name: String,
    pub category: String,
    /// Price in cents.
    pub price_cents: i64,
    pub restaurant_id: EntityId,
}

impl Menu {
    /// Creates a transient menu entry for the given restaurant.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        price: Money,
        restaurant_id: EntityId,
    ) -> Self {
        Menu {
            id: None,
            created: None,
            modified: None,
            name: name.into(),
            category: category.into(),
            price_cents: price.cents(),
            restaurant_id,
        }
    }

    /// Returns the price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Copies the mutable fields of `other` onto `self`.
    pub fn merge_from(&mut self, other: &Menu) {
        self.name = other.name.clone();
        self.category = other.category.clone();
        self.price_cents = other.price_cents;
        self.restaurant_id = other.restaurant_id;
    }
}

// =============================================================================
// Table
// =============================================================================

/// A guest table in a restaurant.
///
/// Natural key: `(table_number, restaurant_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Table {
    pub id: Option<EntityId>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub table_number: String,
    pub seats: u32,
    pub restaurant_id: EntityId,
}

impl Table {
    /// Creates a transient table for the given restaurant.
    pub fn new(table_number: impl Into<String>, seats: u32, restaurant_id: EntityId) -> Self {
        Table {
            id: None,
            created: None,
            modified: None,
            table_number: table_number.into(),
            seats,
            restaurant_id,
        }
    }

    /// Copies the mutable fields of `other` onto `self`.
    pub fn merge_from(&mut self, other: &Table) {
        self.table_number = other.table_number.clone();
        self.seats = other.seats;
        self.restaurant_id = other.restaurant_id;
    }
}

// =============================================================================
// Reservation
// =============================================================================

/// A booking of one or more tables for a time slot.
///
/// Natural key: `reservation_number` (globally unique).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Reservation {
    pub id: Option<EntityId>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub reservation_date: NaiveDateTime,
    pub time_from: NaiveTime,
    pub time_until: NaiveTime,
    pub people: u32,
    pub reservation_name: String,
    pub reservation_number: String,
    /// Ids of the booked tables.
    #[serde(default)]
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub tables: Vec<EntityId>,
}

impl Reservation {
    /// Creates a transient reservation without tables.
    pub fn new(
        reservation_number: impl Into<String>,
        reservation_name: impl Into<String>,
        reservation_date: NaiveDateTime,
        time_from: NaiveTime,
        time_until: NaiveTime,
        people: u32,
    ) -> Self {
        Reservation {
            id: None,
            created: None,
            modified: None,
            reservation_date,
            time_from,
            time_until,
            people,
            reservation_name: reservation_name.into(),
            reservation_number: reservation_number.into(),
            tables: Vec::new(),
        }
    }

    /// Adds a table to the booking (builder style).
    pub fn with_table(mut self, table_id: EntityId) -> Self {
        if !self.tables.contains(&table_id) {
            self.tables.push(table_id);
        }
        self
    }

    /// Copies the scalar fields of `other` onto `self`.
    ///
    /// Table links are merged by the repository, not here.
    pub fn merge_from(&mut self, other: &Reservation) {
        self.reservation_name = other.reservation_name.clone();
        self.reservation_number = other.reservation_number.clone();
        self.reservation_date = other.reservation_date;
        self.people = other.people;
        self.time_from = other.time_from;
        self.time_until = other.time_until;
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order placed at a table.
///
/// `total_cents` is computed by the repository from the linked menus;
/// whatever the caller puts there is overwritten on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Option<EntityId>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub waiter: String,
    pub table_id: EntityId,
    pub total_cents: i64,
    /// Ids of the ordered menu entries.
    #[serde(default)]
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub menus: Vec<EntityId>,
}

impl Order {
    /// Creates a transient, empty order for a table.
    pub fn new(waiter: impl Into<String>, table_id: EntityId) -> Self {
        Order {
            id: None,
            created: None,
            modified: None,
            waiter: waiter.into(),
            table_id,
            total_cents: 0,
            menus: Vec::new(),
        }
    }

    /// Adds a menu entry to the order (builder style).
    pub fn with_menu(mut self, menu_id: EntityId) -> Self {
        if !self.menus.contains(&menu_id) {
            self.menus.push(menu_id);
        }
        self
    }

    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Restaurant Repository
//!
//! Database operations for restaurants and their shared addresses.
//!
//! ## Address Normalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 What happens to restaurant.address on save              │
//! │                                                                         │
//! │  address.id = Some(n), row n exists at the same location               │
//! │       └──► reuse row n as stored                                       │
//! │                                                                         │
//! │  address.id = None, row n is gone, or the location changed             │
//! │       │                                                                 │
//! │       ├── same street+city+zip+country already stored?                 │
//! │       │        └──► reuse that row                                     │
//! │       │                                                                 │
//! │       └── otherwise ──► INSERT a new address                           │
//! │                                                                         │
//! │  Address rows are shared: a restaurant save never updates one.         │
//! │  Deleting a restaurant never deletes its address.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Collections
//! `menus` and `tables` are loaded with every restaurant (menus by
//! category then name, tables by number). `save` does not write them;
//! `delete` removes them with the restaurant.

use bistro_core::validation::validate_restaurant;
use bistro_core::{Address, Entity, EntityId, Restaurant};
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::menu::fetch_menus_for_restaurant;
use crate::repository::table::fetch_tables_for_restaurant;
use crate::repository::{Repository, RepositoryBase};
use crate::session::Session;

/// A `restaurants` row before its address and collections are attached.
#[derive(Debug, sqlx::FromRow)]
struct RestaurantRow {
    id: EntityId,
    created: DateTime<Utc>,
    modified: Option<DateTime<Utc>>,
    name: String,
    open_from: NaiveTime,
    open_until: NaiveTime,
    open_days: String,
    address_id: EntityId,
}

/// Repository for restaurant database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.restaurants();
///
/// let saved = repo
///     .unit_of_work(|session| {
///         let repo = repo.new_session(session);
///         async move { repo.save(restaurant).await }
///     })
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct RestaurantRepository {
    base: RepositoryBase,
}

impl Repository for RestaurantRepository {
    fn base(&self) -> &RepositoryBase {
        &self.base
    }

    fn new_session(&self, session: Session) -> Self {
        RestaurantRepository::with_session(session)
    }
}

impl RestaurantRepository {
    /// Creates a repository that opens a session per call.
    pub fn new(db: Database) -> Self {
        RestaurantRepository {
            base: RepositoryBase::factory(db),
        }
    }

    /// Creates a repository bound to an existing session.
    pub fn with_session(session: Session) -> Self {
        RestaurantRepository {
            base: RepositoryBase::bound(session),
        }
    }

    /// Gets a restaurant with its address, menus and tables.
    ///
    /// ## Returns
    /// * `Ok(Some(Restaurant))` - Restaurant found
    /// * `Ok(None)` - Restaurant not found
    pub async fn get_by_id(&self, id: EntityId) -> DbResult<Option<Restaurant>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                fetch_restaurant(&mut conn, id).await
            })
            .await
    }

    /// Lists all restaurants, oldest first.
    pub async fn get_all_restaurants(&self) -> DbResult<Vec<Restaurant>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;

                let rows: Vec<RestaurantRow> = sqlx::query_as(
                    r#"
                    SELECT id, created, modified, name, open_from, open_until, open_days, address_id
                    FROM restaurants
                    ORDER BY id
                    "#,
                )
                .fetch_all(&mut *conn)
                .await?;

                let mut restaurants = Vec::with_capacity(rows.len());
                for row in rows {
                    restaurants.push(load_restaurant(&mut conn, row).await?);
                }

                debug!(count = restaurants.len(), "Loaded restaurants");
                Ok(restaurants)
            })
            .await
    }

    /// Finds the stored address at the same location, if any.
    pub async fn find_address(&self, address: &Address) -> DbResult<Option<Address>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                find_address_by_location(&mut conn, address).await
            })
            .await
    }

    /// Finds a restaurant by name at the given address.
    ///
    /// The address is matched by location (street, city, zip, country),
    /// not by id. If several restaurants match, the oldest is returned.
    pub async fn find_restaurants_by_name_and_address(
        &self,
        name: &str,
        address: &Address,
    ) -> DbResult<Option<Restaurant>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;

                let Some(stored) = find_address_by_location(&mut conn, address).await? else {
                    return Ok(None);
                };

                let row: Option<RestaurantRow> = sqlx::query_as(
                    r#"
                    SELECT id, created, modified, name, open_from, open_until, open_days, address_id
                    FROM restaurants
                    WHERE name = ?1 AND address_id = ?2
                    ORDER BY id
                    LIMIT 1
                    "#,
                )
                .bind(name)
                .bind(stored.id)
                .fetch_optional(&mut *conn)
                .await?;

                match row {
                    Some(row) => Ok(Some(load_restaurant(&mut conn, row).await?)),
                    None => Ok(None),
                }
            })
            .await
    }

    /// Deletes a restaurant with its menus, tables, orders and table links.
    ///
    /// ## Returns
    /// `true` if a row was deleted. The address is kept.
    pub async fn delete(&self, id: EntityId) -> DbResult<bool> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                session.mark_written();

                let result = sqlx::query("DELETE FROM restaurants WHERE id = ?1")
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;

                debug!(restaurant_id = id, deleted = result.rows_affected(), "Deleted restaurant");
                Ok(result.rows_affected() > 0)
            })
            .await
    }

    /// Inserts or updates a restaurant.
    ///
    /// ## What This Does
    /// 1. Validates the restaurant and its address
    /// 2. Normalizes the address (see module docs)
    /// 3. Existing id → merges name, hours and days onto the stored row
    /// 4. Otherwise → inserts a new row
    ///
    /// ## Returns
    /// The stored restaurant, reloaded with its menus and tables.
    pub async fn save(&self, restaurant: Restaurant) -> DbResult<Restaurant> {
        validate_restaurant(&restaurant)?;

        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                session.mark_written();

                if let Some(id) = restaurant.persistent_id() {
                    if let Some(mut stored) = fetch_restaurant(&mut conn, id).await? {
                        debug!(restaurant_id = id, "Updating restaurant");

                        stored.merge_from(&restaurant);
                        stored.address = normalize_address(&mut conn, restaurant.address).await?;
                        update_restaurant(&mut conn, &mut stored).await?;
                        return Ok(stored);
                    }

                    debug!(restaurant_id = id, "Restaurant id not stored, inserting");
                }

                let mut fresh = restaurant;
                fresh.address = normalize_address(&mut conn, fresh.address).await?;
                insert_restaurant(&mut conn, &mut fresh).await?;

                let id = fresh.id.unwrap_or_default();
                fresh.menus = fetch_menus_for_restaurant(&mut conn, id).await?;
                fresh.tables = fetch_tables_for_restaurant(&mut conn, id).await?;
                Ok(fresh)
            })
            .await
    }
}

// =============================================================================
// Row Helpers
// =============================================================================

async fn fetch_restaurant(
    conn: &mut SqliteConnection,
    id: EntityId,
) -> DbResult<Option<Restaurant>> {
    let row: Option<RestaurantRow> = sqlx::query_as(
        r#"
        SELECT id, created, modified, name, open_from, open_until, open_days, address_id
        FROM restaurants
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(Some(load_restaurant(conn, row).await?)),
        None => Ok(None),
    }
}

async fn load_restaurant(conn: &mut SqliteConnection, row: RestaurantRow) -> DbResult<Restaurant> {
    let address = fetch_address(conn, row.address_id)
        .await?
        .ok_or_else(|| DbError::not_found("Address", row.address_id))?;

    Ok(Restaurant {
        id: Some(row.id),
        created: Some(row.created),
        modified: row.modified,
        name: row.name,
        open_from: row.open_from,
        open_until: row.open_until,
        open_days: row.open_days,
        address,
        menus: fetch_menus_for_restaurant(conn, row.id).await?,
        tables: fetch_tables_for_restaurant(conn, row.id).await?,
    })
}

async fn insert_restaurant(conn: &mut SqliteConnection, restaurant: &mut Restaurant) -> DbResult<()> {
    let address_id = stored_address_id(restaurant)?;
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO restaurants (created, name, open_from, open_until, open_days, address_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(now)
    .bind(&restaurant.name)
    .bind(restaurant.open_from)
    .bind(restaurant.open_until)
    .bind(&restaurant.open_days)
    .bind(address_id)
    .execute(&mut *conn)
    .await?;

    restaurant.id = Some(result.last_insert_rowid());
    restaurant.created = Some(now);
    restaurant.modified = None;

    debug!(restaurant_id = ?restaurant.id, "Inserted restaurant");
    Ok(())
}

async fn update_restaurant(conn: &mut SqliteConnection, restaurant: &mut Restaurant) -> DbResult<()> {
    let address_id = stored_address_id(restaurant)?;
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE restaurants SET
            name = ?2,
            open_from = ?3,
            open_until = ?4,
            open_days = ?5,
            address_id = ?6,
            modified = ?7
        WHERE id = ?1
        "#,
    )
    .bind(restaurant.id)
    .bind(&restaurant.name)
    .bind(restaurant.open_from)
    .bind(restaurant.open_until)
    .bind(&restaurant.open_days)
    .bind(address_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    restaurant.modified = Some(now);
    Ok(())
}

fn stored_address_id(restaurant: &Restaurant) -> DbResult<EntityId> {
    restaurant
        .address
        .persistent_id()
        .ok_or_else(|| DbError::Internal("address was not stored before its restaurant".to_string()))
}

// =============================================================================
// Address Helpers
// =============================================================================

async fn fetch_address(conn: &mut SqliteConnection, id: EntityId) -> DbResult<Option<Address>> {
    let address = sqlx::query_as(
        r#"
        SELECT id, created, modified, street, city, zip, country
        FROM addresses
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(address)
}

async fn find_address_by_location(
    conn: &mut SqliteConnection,
    address: &Address,
) -> DbResult<Option<Address>> {
    let stored = sqlx::query_as(
        r#"
        SELECT id, created, modified, street, city, zip, country
        FROM addresses
        WHERE street = ?1 AND city = ?2 AND zip = ?3 AND country = ?4
        "#,
    )
    .bind(&address.street)
    .bind(&address.city)
    .bind(&address.zip)
    .bind(&address.country)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(stored)
}

/// Resolves the address a restaurant should point at.
async fn normalize_address(conn: &mut SqliteConnection, address: Address) -> DbResult<Address> {
    if let Some(id) = address.persistent_id() {
        match fetch_address(conn, id).await? {
            Some(stored) if stored.same_location(&address) => return Ok(stored),
            Some(_) => debug!(address_id = id, "Address location changed, matching by location"),
            None => debug!(address_id = id, "Address id not stored, matching by location"),
        }
    }

    if let Some(stored) = find_address_by_location(conn, &address).await? {
        debug!(address_id = ?stored.id, "Reusing stored address");
        return Ok(stored);
    }

    let mut fresh = address;
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO addresses (created, street, city, zip, country)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(now)
    .bind(&fresh.street)
    .bind(&fresh.city)
    .bind(&fresh.zip)
    .bind(&fresh.country)
    .execute(&mut *conn)
    .await?;

    fresh.id = Some(result.last_insert_rowid());
    fresh.created = Some(now);
    fresh.modified = None;

    debug!(address_id = ?fresh.id, "Inserted address");
    Ok(fresh)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{address, auto_commit_database, database, restaurant};
    use crate::{DbConfig, MenuRepository, TableRepository};
    use bistro_core::{Menu, Money, Table};

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_update_in_unit_of_work() {
        let db = database().await;
        let repo = db.restaurants();

        let (created, updated) = repo
            .unit_of_work(|session| {
                let repo = repo.new_session(session);
                async move {
                    let saved = repo.save(restaurant("Test-Restaurant")).await?;
                    repo.sync().await?;

                    let id = saved.id.unwrap();
                    let created = repo.get_by_id(id).await?.unwrap();

                    let mut changed = created.clone();
                    changed.name = "Test-Restaurant_update".to_string();
                    repo.save(changed).await?;

                    let updated = repo.get_by_id(id).await?.unwrap();
                    Ok((created, updated))
                }
            })
            .await
            .unwrap();

        assert!(created.is_persistent());
        assert!(created.created.is_some());
        assert_eq!(created.modified, None);
        assert!(created.address.is_persistent());

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Test-Restaurant_update");
        assert!(updated.modified.is_some());

        // Committed: visible from a fresh session
        let all = repo.get_all_restaurants().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Test-Restaurant_update");
    }

    #[tokio::test]
    async fn test_stale_id_inserts_new_row() {
        let db = database().await;
        let repo = db.restaurants();

        let saved = repo
            .unit_of_work(|session| {
                let repo = repo.new_session(session);
                async move {
                    let mut stale = restaurant("Ghost");
                    stale.id = Some(4711);
                    stale.address.id = Some(4712);
                    repo.save(stale).await
                }
            })
            .await
            .unwrap();

        assert_ne!(saved.id, Some(4711));
        assert_ne!(saved.address.id, Some(4712));
        assert!(saved.is_persistent());
        assert_eq!(saved.modified, None);
    }

    #[tokio::test]
    async fn test_addresses_are_shared_by_location() {
        let db = database().await;
        let repo = db.restaurants();

        let (first, second) = repo
            .unit_of_work(|session| {
                let repo = repo.new_session(session);
                async move {
                    let first = repo.save(restaurant("First")).await?;
                    let second = repo.save(restaurant("Second")).await?;
                    Ok((first, second))
                }
            })
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.address.id, second.address.id);
        assert_eq!(count(&db, "addresses").await, 1);

        let found = repo.find_address(&address()).await.unwrap().unwrap();
        assert_eq!(found.id, first.address.id);

        let elsewhere = Address::new("Getreidegasse 9", "Salzburg", "5020", "AT");
        assert!(repo.find_address(&elsewhere).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_moving_one_restaurant_leaves_shared_address_alone() {
        let db = database().await;
        let repo = db.restaurants();

        let (first, moved) = repo
            .unit_of_work(|session| {
                let repo = repo.new_session(session);
                async move {
                    let first = repo.save(restaurant("First")).await?;
                    let mut second = repo.save(restaurant("Second")).await?;
                    assert_eq!(first.address.id, second.address.id);

                    second.address.street = "Getreidegasse 9".to_string();
                    let moved = repo.save(second).await?;
                    Ok((first, moved))
                }
            })
            .await
            .unwrap();

        assert_ne!(moved.address.id, first.address.id);
        assert_eq!(moved.address.street, "Getreidegasse 9");
        assert_eq!(moved.address.modified, None);
        assert_eq!(count(&db, "addresses").await, 2);

        let reloaded = repo.get_by_id(first.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(reloaded.address, first.address);
    }

    #[tokio::test]
    async fn test_moving_onto_a_stored_location_reuses_that_address() {
        let db = database().await;
        let repo = db.restaurants();

        let (elsewhere, moved) = repo
            .unit_of_work(|session| {
                let repo = repo.new_session(session);
                async move {
                    let mut other = restaurant("Elsewhere");
                    other.address = Address::new("Getreidegasse 9", "Salzburg", "5020", "AT");
                    let elsewhere = repo.save(other).await?;

                    let mut moving = repo.save(restaurant("Moving")).await?;
                    moving.address.street = "Getreidegasse 9".to_string();
                    let moved = repo.save(moving).await?;
                    Ok((elsewhere, moved))
                }
            })
            .await
            .unwrap();

        assert_eq!(moved.address.id, elsewhere.address.id);
        // The original row stays behind, unchanged
        assert_eq!(count(&db, "addresses").await, 2);
        let original = repo.find_address(&address()).await.unwrap().unwrap();
        assert_eq!(original.street, "Hauptstraße 1");
    }

    #[tokio::test]
    async fn test_find_by_name_and_address() {
        let db = database().await;
        let repo = db.restaurants();

        repo.unit_of_work(|session| {
            let repo = repo.new_session(session);
            async move {
                repo.save(restaurant("Test-Restaurant")).await?;
                repo.save(restaurant("Other")).await
            }
        })
        .await
        .unwrap();

        let found = repo
            .find_restaurants_by_name_and_address("Test-Restaurant", &address())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "Test-Restaurant");

        let elsewhere = Address::new("Getreidegasse 9", "Salzburg", "5020", "AT");
        assert!(repo
            .find_restaurants_by_name_and_address("Test-Restaurant", &elsewhere)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_restaurants_by_name_and_address("Missing", &address())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_collections_are_loaded_in_order() {
        let db = database().await;
        let repo = db.restaurants();

        let loaded = repo
            .unit_of_work(|session| async move {
                let restaurants = RestaurantRepository::with_session(session.clone());
                let menus = MenuRepository::with_session(session.clone());
                let tables = TableRepository::with_session(session);

                let saved = restaurants.save(restaurant("Test-Restaurant")).await?;
                let rid = saved.id.unwrap();
                assert!(saved.menus.is_empty());

                tables.save(Table::new("Table2", 6, rid)).await?;
                tables.save(Table::new("Table1", 4, rid)).await?;
                menus.save(Menu::new("Soup", "Starters", Money::from_cents(590), rid)).await?;
                menus.save(Menu::new("Schnitzel", "Mains", Money::from_cents(1450), rid)).await?;

                Ok(restaurants.get_by_id(rid).await?.unwrap())
            })
            .await
            .unwrap();

        let table_numbers: Vec<_> = loaded.tables.iter().map(|t| t.table_number.as_str()).collect();
        assert_eq!(table_numbers, vec!["Table1", "Table2"]);

        let categories: Vec<_> = loaded.menus.iter().map(|m| m.category.as_str()).collect();
        assert_eq!(categories, vec!["Mains", "Starters"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_owned_rows_only() {
        let db = database().await;
        let repo = db.restaurants();

        let rid = repo
            .unit_of_work(|session| async move {
                let restaurants = RestaurantRepository::with_session(session.clone());
                let saved = restaurants.save(restaurant("Test-Restaurant")).await?;
                let rid = saved.id.unwrap();

                TableRepository::with_session(session.clone())
                    .save(Table::new("Table1", 4, rid))
                    .await?;
                MenuRepository::with_session(session)
                    .save(Menu::new("Soup", "Starters", Money::from_cents(590), rid))
                    .await?;
                Ok(rid)
            })
            .await
            .unwrap();

        let deleted = repo
            .unit_of_work(|session| {
                let repo = repo.new_session(session);
                async move { repo.delete(rid).await }
            })
            .await
            .unwrap();

        assert!(deleted);
        assert!(repo.get_by_id(rid).await.unwrap().is_none());
        assert_eq!(count(&db, "menus").await, 0);
        assert_eq!(count(&db, "guest_tables").await, 0);
        assert_eq!(count(&db, "addresses").await, 1);
    }

    #[tokio::test]
    async fn test_direct_save_is_discarded_without_auto_commit() {
        let db = database().await;
        let repo = db.restaurants();

        let saved = repo.save(restaurant("Test-Restaurant")).await.unwrap();
        assert!(saved.is_persistent());

        assert!(repo.get_all_restaurants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_direct_save_is_kept_with_auto_commit() {
        let db = auto_commit_database().await;
        let repo = db.restaurants();

        repo.save(restaurant("Test-Restaurant")).await.unwrap();

        assert_eq!(repo.get_all_restaurants().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_restaurant_is_rejected_before_write() {
        let db = database().await;
        let repo = db.restaurants();

        let mut invalid = restaurant("Test-Restaurant");
        invalid.open_days = "MONDAY,TUESDAY".to_string();

        let err = repo
            .unit_of_work(|session| {
                let repo = repo.new_session(session);
                async move { repo.save(invalid).await }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Invalid(_)));
        assert_eq!(count(&db, "addresses").await, 0);
    }

    #[tokio::test]
    async fn test_error_in_unit_of_work_rolls_back_every_repository() {
        let db = database().await;
        let repo = db.restaurants();

        let err = repo
            .unit_of_work(|session| async move {
                let saved = RestaurantRepository::with_session(session.clone())
                    .save(restaurant("Test-Restaurant"))
                    .await?;
                TableRepository::with_session(session)
                    .save(Table::new("Table1", 4, saved.id.unwrap()))
                    .await?;
                Err::<(), _>(DbError::Internal("abort".to_string()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Internal(msg) if msg == "abort"));
        assert_eq!(count(&db, "restaurants").await, 0);
        assert_eq!(count(&db, "guest_tables").await, 0);
        assert_eq!(count(&db, "addresses").await, 0);
    }

    #[tokio::test]
    async fn test_panic_in_unit_of_work_rolls_back() {
        let db = database().await;
        let task_db = db.clone();

        let outcome = tokio::spawn(async move {
            task_db
                .unit_of_work(|session| async move {
                    RestaurantRepository::with_session(session)
                        .save(restaurant("Doomed"))
                        .await?;
                    let crash = true;
                    if crash {
                        panic!("crash inside unit of work");
                    }
                    Ok(())
                })
                .await
        })
        .await;

        assert!(outcome.unwrap_err().is_panic());
        assert!(db.restaurants().get_all_restaurants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bound_repository_cannot_start_unit_of_work() {
        let db = database().await;
        let session = db.open_session().await.unwrap();
        let bound = RestaurantRepository::with_session(session.clone());

        let err = bound
            .unit_of_work(|_| async move { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Configuration(_)));

        // The borrowed session is untouched and still usable
        assert!(session.is_active().await);
        assert_eq!(bound.get_session().await.unwrap().id(), session.id());
        session.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_bound_repository_after_commit_reports_closed_session() {
        let db = database().await;
        let session = db.open_session().await.unwrap();
        session.commit().await.unwrap();

        let err = RestaurantRepository::with_session(session)
            .get_all_restaurants()
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::SessionClosed { .. }));
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible_to_other_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::from_path(dir.path().join("bistro.db")).max_connections(4);
        let db = Database::new(config).await.unwrap();

        let writer = db.open_session().await.unwrap();
        RestaurantRepository::with_session(writer.clone())
            .save(restaurant("Test-Restaurant"))
            .await
            .unwrap();

        // Sessions hold the write lock; a plain pooled read sees the last commit
        assert_eq!(count(&db, "restaurants").await, 0);

        writer.commit().await.unwrap();
        assert_eq!(db.restaurants().get_all_restaurants().await.unwrap().len(), 1);

        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_units_of_work_all_commit() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::from_path(dir.path().join("bistro.db")).max_connections(8);
        let db = Database::new(config).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                tokio::spawn(async move {
                    db.unit_of_work(|session| async move {
                        let mut r = restaurant(&format!("Restaurant-{i}"));
                        r.address = Address::new(format!("Gasse {i}"), "Salzburg", "5020", "AT");
                        RestaurantRepository::with_session(session).save(r).await
                    })
                    .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(count(&db, "restaurants").await, 8);
        assert_eq!(count(&db, "addresses").await, 8);

        db.close().await;
    }
}

//! # Table Repository
//!
//! Database operations for guest tables.
//!
//! Natural key: table number within a restaurant.

use bistro_core::validation::validate_table;
use bistro_core::{Entity, EntityId, Table};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::{Repository, RepositoryBase};
use crate::session::Session;

/// Repository for guest table database operations.
#[derive(Debug, Clone)]
pub struct TableRepository {
    base: RepositoryBase,
}

impl Repository for TableRepository {
    fn base(&self) -> &RepositoryBase {
        &self.base
    }

    fn new_session(&self, session: Session) -> Self {
        TableRepository::with_session(session)
    }
}

impl TableRepository {
    /// Creates a repository that opens a session per call.
    pub fn new(db: Database) -> Self {
        TableRepository {
            base: RepositoryBase::factory(db),
        }
    }

    /// Creates a repository bound to an existing session.
    pub fn with_session(session: Session) -> Self {
        TableRepository {
            base: RepositoryBase::bound(session),
        }
    }

    /// Gets a table by its ID.
    pub async fn get_by_id(&self, id: EntityId) -> DbResult<Option<Table>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                fetch_table(&mut conn, id).await
            })
            .await
    }

    /// Lists a restaurant's tables, ordered by table number.
    pub async fn get_tables_for_restaurant(&self, restaurant_id: EntityId) -> DbResult<Vec<Table>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                fetch_tables_for_restaurant(&mut conn, restaurant_id).await
            })
            .await
    }

    /// Lists a restaurant's tables with at least `capacity` seats.
    ///
    /// Ordered by table number. A capacity of zero or less returns nothing and touches no storage.
    pub async fn get_tables_with_capacity(
        &self,
        capacity: i64,
        restaurant_id: EntityId,
    ) -> DbResult<Vec<Table>> {
        if capacity <= 0 {
            return Ok(Vec::new());
        }

        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;

                let tables: Vec<Table> = sqlx::query_as(
                    r#"
                    SELECT id, created, modified, table_number, seats, restaurant_id
                    FROM guest_tables
                    WHERE restaurant_id = ?1 AND seats >= ?2
                    ORDER BY table_number
                    "#,
                )
                .bind(restaurant_id)
                .bind(capacity)
                .fetch_all(&mut *conn)
                .await?;

                debug!(capacity, count = tables.len(), "Tables with capacity");
                Ok(tables)
            })
            .await
    }

    /// Inserts or updates a table.
    ///
    /// ## Match Order
    /// 1. Stored id → update that row
    /// 2. Same table number in the same restaurant → update that row
    /// 3. Otherwise → insert
    pub async fn save(&self, table: Table) -> DbResult<Table> {
        validate_table(&table)?;

        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                session.mark_written();

                let mut stored = match table.persistent_id() {
                    Some(id) => fetch_table(&mut conn, id).await?,
                    None => None,
                };

                if stored.is_none() {
                    stored = sqlx::query_as(
                        r#"
                        SELECT id, created, modified, table_number, seats, restaurant_id
                        FROM guest_tables
                        WHERE table_number = ?1 AND restaurant_id = ?2
                        "#,
                    )
                    .bind(&table.table_number)
                    .bind(table.restaurant_id)
                    .fetch_optional(&mut *conn)
                    .await?;
                }

                let Some(mut stored) = stored else {
                    let mut fresh = table;
                    let now = Utc::now();

                    let result = sqlx::query(
                        r#"
                        INSERT INTO guest_tables (created, table_number, seats, restaurant_id)
                        VALUES (?1, ?2, ?3, ?4)
                        "#,
                    )
                    .bind(now)
                    .bind(&fresh.table_number)
                    .bind(fresh.seats)
                    .bind(fresh.restaurant_id)
                    .execute(&mut *conn)
                    .await?;

                    fresh.id = Some(result.last_insert_rowid());
                    fresh.created = Some(now);
                    fresh.modified = None;

                    debug!(table_id = ?fresh.id, "Inserted table");
                    return Ok(fresh);
                };

                debug!(table_id = ?stored.id, "Updating table");
                stored.merge_from(&table);
                let now = Utc::now();

                sqlx::query(
                    r#"
                    UPDATE guest_tables SET
                        table_number = ?2,
                        seats = ?3,
                        restaurant_id = ?4,
                        modified = ?5
                    WHERE id = ?1
                    "#,
                )
                .bind(stored.id)
                .bind(&stored.table_number)
                .bind(stored.seats)
                .bind(stored.restaurant_id)
                .bind(now)
                .execute(&mut *conn)
                .await?;

                stored.modified = Some(now);
                Ok(stored)
            })
            .await
    }
}

async fn fetch_table(conn: &mut SqliteConnection, id: EntityId) -> DbResult<Option<Table>> {
    let table = sqlx::query_as(
        r#"
        SELECT id, created, modified, table_number, seats, restaurant_id
        FROM guest_tables
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(table)
}

/// Loads a restaurant's tables, ordered by table number.
pub(crate) async fn fetch_tables_for_restaurant(
    conn: &mut SqliteConnection,
    restaurant_id: EntityId,
) -> DbResult<Vec<Table>> {
    let tables = sqlx::query_as(
        r#"
        SELECT id, created, modified, table_number, seats, restaurant_id
        FROM guest_tables
        WHERE restaurant_id = ?1
        ORDER BY table_number
        "#,
    )
    .bind(restaurant_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(tables)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{database, restaurant};
    use crate::{DbError, RestaurantRepository};

    /// Restaurant with "Table1" (4 seats) and "Table2" (6 seats).
    async fn seeded(db: &Database) -> EntityId {
        db.unit_of_work(|session| async move {
            let saved = RestaurantRepository::with_session(session.clone())
                .save(restaurant("Test-Restaurant"))
                .await?;
            let rid = saved.id.unwrap();

            let tables = TableRepository::with_session(session);
            tables.save(Table::new("Table1", 4, rid)).await?;
            tables.save(Table::new("Table2", 6, rid)).await?;
            Ok(rid)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_tables_for_restaurant() {
        let db = database().await;
        let rid = seeded(&db).await;

        let tables = db.tables().get_tables_for_restaurant(rid).await.unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].table_number, "Table1");
        assert_eq!(tables[0].seats, 4);
        assert_eq!(tables[1].table_number, "Table2");
        assert_eq!(tables[1].seats, 6);
    }

    #[tokio::test]
    async fn test_tables_with_capacity() {
        let db = database().await;
        let rid = seeded(&db).await;
        let repo = db.tables();

        let numbers = |tables: Vec<Table>| -> Vec<String> {
            tables.into_iter().map(|t| t.table_number).collect()
        };

        assert_eq!(
            numbers(repo.get_tables_with_capacity(3, rid).await.unwrap()),
            vec!["Table1", "Table2"]
        );
        assert_eq!(
            numbers(repo.get_tables_with_capacity(4, rid).await.unwrap()),
            vec!["Table1", "Table2"]
        );
        assert_eq!(
            numbers(repo.get_tables_with_capacity(5, rid).await.unwrap()),
            vec!["Table2"]
        );
        assert_eq!(
            numbers(repo.get_tables_with_capacity(6, rid).await.unwrap()),
            vec!["Table2"]
        );
        assert!(repo.get_tables_with_capacity(7, rid).await.unwrap().is_empty());
        assert!(repo.get_tables_with_capacity(4, rid + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_capacity_never_touches_storage() {
        let db = database().await;
        let session = db.open_session().await.unwrap();
        session.commit().await.unwrap();

        // A closed session fails any query, so an Ok proves no query ran
        let repo = TableRepository::with_session(session);
        assert!(repo.get_tables_with_capacity(0, 1).await.unwrap().is_empty());
        assert!(repo.get_tables_with_capacity(-5, 1).await.unwrap().is_empty());
        assert!(matches!(
            repo.get_tables_with_capacity(1, 1).await,
            Err(DbError::SessionClosed { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_table_by_natural_key() {
        let db = database().await;
        let rid = seeded(&db).await;
        let repo = db.tables();

        let resized = repo
            .unit_of_work(|session| {
                let repo = repo.new_session(session);
                async move { repo.save(Table::new("Table1", 8, rid)).await }
            })
            .await
            .unwrap();

        assert!(resized.modified.is_some());
        let tables = repo.get_tables_for_restaurant(rid).await.unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].id, resized.id);
        assert_eq!(tables[0].seats, 8);

        let fetched = repo.get_by_id(resized.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(fetched.seats, 8);
    }

    #[tokio::test]
    async fn test_zero_seats_is_invalid() {
        let db = database().await;

        let err = db.tables().save(Table::new("Table1", 0, 1)).await.unwrap_err();

        assert!(matches!(err, DbError::Invalid(_)));
    }
}

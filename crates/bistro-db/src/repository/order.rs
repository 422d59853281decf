//! # Order Repository
//!
//! Database operations for orders placed at a table.
//!
//! ## Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Order Total                                     │
//! │                                                                         │
//! │  order.menus = [Schnitzel, Soup]                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  rel_menu_order rows replaced with the input list                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  total_cents = SUM(menus.price_cents) over the links  (1450 + 590)     │
//! │                                                                         │
//! │  The total is a snapshot: later price changes leave it alone until    │
//! │  the order is saved again.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Orders have no natural key: without a stored id, `save` inserts.

use bistro_core::validation::validate_order;
use bistro_core::{Entity, EntityId, Order};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{Repository, RepositoryBase};
use crate::session::Session;

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    base: RepositoryBase,
}

impl Repository for OrderRepository {
    fn base(&self) -> &RepositoryBase {
        &self.base
    }

    fn new_session(&self, session: Session) -> Self {
        OrderRepository::with_session(session)
    }
}

impl OrderRepository {
    /// Creates a repository that opens a session per call.
    pub fn new(db: Database) -> Self {
        OrderRepository {
            base: RepositoryBase::factory(db),
        }
    }

    /// Creates a repository bound to an existing session.
    pub fn with_session(session: Session) -> Self {
        OrderRepository {
            base: RepositoryBase::bound(session),
        }
    }

    /// Gets an order by its ID, with its menu ids.
    pub async fn get_by_id(&self, id: EntityId) -> DbResult<Option<Order>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                fetch_order(&mut conn, id).await
            })
            .await
    }

    /// Lists a table's orders, oldest first.
    pub async fn get_orders_for_table(&self, table_id: EntityId) -> DbResult<Vec<Order>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;

                let mut orders: Vec<Order> = sqlx::query_as(
                    r#"
                    SELECT id, created, modified, waiter, table_id, total_cents
                    FROM table_orders
                    WHERE table_id = ?1
                    ORDER BY created, id
                    "#,
                )
                .bind(table_id)
                .fetch_all(&mut *conn)
                .await?;

                for order in &mut orders {
                    order.menus = fetch_menu_ids(&mut conn, order.id.unwrap_or_default()).await?;
                }

                Ok(orders)
            })
            .await
    }

    /// Inserts or updates an order.
    ///
    /// ## What This Does
    /// 1. Stored id → updates waiter and table; otherwise inserts
    /// 2. Replaces the menu links with `order.menus`
    /// 3. Recomputes `total_cents` from the linked menu prices
    pub async fn save(&self, order: Order) -> DbResult<Order> {
        validate_order(&order)?;

        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                session.mark_written();
                let now = Utc::now();

                let stored = match order.persistent_id() {
                    Some(id) => fetch_order(&mut conn, id).await?,
                    None => None,
                };

                let id = match stored {
                    Some(stored) => {
                        let id = stored.id.unwrap_or_default();
                        debug!(order_id = id, "Updating order");

                        sqlx::query(
                            r#"
                            UPDATE table_orders SET
                                waiter = ?2,
                                table_id = ?3,
                                modified = ?4
                            WHERE id = ?1
                            "#,
                        )
                        .bind(id)
                        .bind(&order.waiter)
                        .bind(order.table_id)
                        .bind(now)
                        .execute(&mut *conn)
                        .await?;

                        sqlx::query("DELETE FROM rel_menu_order WHERE order_id = ?1")
                            .bind(id)
                            .execute(&mut *conn)
                            .await?;
                        id
                    }
                    None => {
                        let result = sqlx::query(
                            r#"
                            INSERT INTO table_orders (created, waiter, table_id, total_cents)
                            VALUES (?1, ?2, ?3, 0)
                            "#,
                        )
                        .bind(now)
                        .bind(&order.waiter)
                        .bind(order.table_id)
                        .execute(&mut *conn)
                        .await?;

                        let id = result.last_insert_rowid();
                        debug!(order_id = id, "Inserted order");
                        id
                    }
                };

                for menu_id in &order.menus {
                    sqlx::query(
                        "INSERT OR IGNORE INTO rel_menu_order (menu_id, order_id) VALUES (?1, ?2)",
                    )
                    .bind(menu_id)
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
                }

                sqlx::query(
                    r#"
                    UPDATE table_orders SET total_cents = (
                        SELECT COALESCE(SUM(m.price_cents), 0)
                        FROM rel_menu_order r
                        INNER JOIN menus m ON m.id = r.menu_id
                        WHERE r.order_id = ?1
                    )
                    WHERE id = ?1
                    "#,
                )
                .bind(id)
                .execute(&mut *conn)
                .await?;

                let saved = fetch_order(&mut conn, id).await?;
                saved.ok_or_else(|| DbError::not_found("Order", id))
            })
            .await
    }
}

async fn fetch_order(conn: &mut SqliteConnection, id: EntityId) -> DbResult<Option<Order>> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        SELECT id, created, modified, waiter, table_id, total_cents
        FROM table_orders
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match order {
        Some(mut order) => {
            order.menus = fetch_menu_ids(conn, id).await?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

async fn fetch_menu_ids(conn: &mut SqliteConnection, order_id: EntityId) -> DbResult<Vec<EntityId>> {
    let ids = sqlx::query_scalar(
        "SELECT menu_id FROM rel_menu_order WHERE order_id = ?1 ORDER BY menu_id",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

// =============================================================================
// Unit Tests
// =============================================================================

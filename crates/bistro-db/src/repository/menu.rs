//! # Menu Repository
//!
//! Database operations for menu entries.
//!
//! A menu entry is identified by its natural key: name, category and
//! restaurant. Saving "Schnitzel / Mains" twice for the same restaurant
//! updates one row instead of inserting a duplicate.

use bistro_core::validation::validate_menu;
use bistro_core::{Entity, EntityId, Menu};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::{Repository, RepositoryBase};
use crate::session::Session;

/// Repository for menu database operations.
#[derive(Debug, Clone)]
pub struct MenuRepository {
    base: RepositoryBase,
}

impl Repository for MenuRepository {
    fn base(&self) -> &RepositoryBase {
        &self.base
    }

    fn new_session(&self, session: Session) -> Self {
        MenuRepository::with_session(session)
    }
}

impl MenuRepository {
    /// Creates a repository that opens a session per call.
    pub fn new(db: Database) -> Self {
        MenuRepository {
            base: RepositoryBase::factory(db),
        }
    }

    /// Creates a repository bound to an existing session.
    pub fn with_session(session: Session) -> Self {
        MenuRepository {
            base: RepositoryBase::bound(session),
        }
    }

    /// Gets a menu entry by its ID.
    pub async fn get_by_id(&self, id: EntityId) -> DbResult<Option<Menu>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                fetch_menu(&mut conn, id).await
            })
            .await
    }

    /// Gets a restaurant's menu entry by name.
    ///
    /// Names may repeat across categories; the oldest entry wins.
    pub async fn get_menu_by_name(
        &self,
        name: &str,
        restaurant_id: EntityId,
    ) -> DbResult<Option<Menu>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;

                let menu = sqlx::query_as(
                    r#"
                    SELECT id, created, modified, name, category, price_cents, restaurant_id
                    FROM menus
                    WHERE name = ?1 AND restaurant_id = ?2
                    ORDER BY id
                    LIMIT 1
                    "#,
                )
                .bind(name)
                .bind(restaurant_id)
                .fetch_optional(&mut *conn)
                .await?;

                Ok(menu)
            })
            .await
    }

    /// Lists a restaurant's menu, ordered by category then name.
    pub async fn get_menu_list(&self, restaurant_id: EntityId) -> DbResult<Vec<Menu>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                fetch_menus_for_restaurant(&mut conn, restaurant_id).await
            })
            .await
    }

    /// Inserts or updates a menu entry.
    ///
    /// ## Match Order
    /// 1. Stored id → update that row
    /// 2. Same name, category and restaurant → update that row
    /// 3. Otherwise → insert
    pub async fn save(&self, menu: Menu) -> DbResult<Menu> {
        validate_menu(&menu)?;

        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                session.mark_written();

                let mut stored = match menu.persistent_id() {
                    Some(id) => fetch_menu(&mut conn, id).await?,
                    None => None,
                };

                if stored.is_none() {
                    stored = sqlx::query_as(
                        r#"
                        SELECT id, created, modified, name, category, price_cents, restaurant_id
                        FROM menus
                        WHERE name = ?1 AND category = ?2 AND restaurant_id = ?3
                        "#,
                    )
                    .bind(&menu.name)
                    .bind(&menu.category)
                    .bind(menu.restaurant_id)
                    .fetch_optional(&mut *conn)
                    .await?;
                }

                match stored {
                    Some(mut stored) => {
                        debug!(menu_id = ?stored.id, "Updating menu");
                        stored.merge_from(&menu);
                        let now = Utc::now();

                        sqlx::query(
                            r#"
                            UPDATE menus SET
                                name = ?2,
                                category = ?3,
                                price_cents = ?4,
                                restaurant_id = ?5,
                                modified = ?6
                            WHERE id = ?1
                            "#,
                        )
                        .bind(stored.id)
                        .bind(&stored.name)
                        .bind(&stored.category)
                        .bind(stored.price_cents)
                        .bind(stored.restaurant_id)
                        .bind(now)
                        .execute(&mut *conn)
                        .await?;

                        stored.modified = Some(now);
                        Ok(stored)
                    }
                    None => {
                        let mut fresh = menu;
                        let now = Utc::now();

                        let result = sqlx::query(
                            r#"
                            INSERT INTO menus (created, name, category, price_cents, restaurant_id)
                            VALUES (?1, ?2, ?3, ?4, ?5)
                            "#,
                        )
                        .bind(now)
                        .bind(&fresh.name)
                        .bind(&fresh.category)
                        .bind(fresh.price_cents)
                        .bind(fresh.restaurant_id)
                        .execute(&mut *conn)
                        .await?;

                        fresh.id = Some(result.last_insert_rowid());
                        fresh.created = Some(now);
                        fresh.modified = None;

                        debug!(menu_id = ?fresh.id, "Inserted menu");
                        Ok(fresh)
                    }
                }
            })
            .await
    }
}

async fn fetch_menu(conn: &mut SqliteConnection, id: EntityId) -> DbResult<Option<Menu>> {
    let menu = sqlx::query_as(
        r#"
        SELECT id, created, modified, name, category, price_cents, restaurant_id
        FROM menus
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(menu)
}

/// Loads a restaurant's menu entries, ordered by category then name.
pub(crate) async fn fetch_menus_for_restaurant(
    conn: &mut SqliteConnection,
    restaurant_id: EntityId,
) -> DbResult<Vec<Menu>> {
    let menus = sqlx::query_as(
        r#"
        SELECT id, created, modified, name, category, price_cents, restaurant_id
        FROM menus
        WHERE restaurant_id = ?1
        ORDER BY category, name
        "#,
    )
    .bind(restaurant_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(menus)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{database, restaurant};
    use crate::DbError;
    use bistro_core::Money;

    async fn saved_restaurant(db: &Database) -> EntityId {
        db.unit_of_work(|session| async move {
            let saved = crate::RestaurantRepository::with_session(session)
                .save(restaurant("Test-Restaurant"))
                .await?;
            Ok(saved.id.unwrap())
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_menu_by_natural_key() {
        let db = database().await;
        let rid = saved_restaurant(&db).await;
        let repo = db.menus();

        let (first, second) = repo
            .unit_of_work(|session| {
                let repo = repo.new_session(session);
                async move {
                    let first = repo
                        .save(Menu::new("MenuEntry1", "Category1", Money::from_cents(1450), rid))
                        .await?;
                    let second = repo
                        .save(Menu::new("MenuEntry1", "Category1", Money::from_cents(1500), rid))
                        .await?;
                    Ok((first, second))
                }
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.modified, None);
        assert!(second.modified.is_some());

        let list = repo.get_menu_list(rid).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].price(), Money::from_cents(1500));
    }

    #[tokio::test]
    async fn test_same_name_in_other_category_is_a_new_entry() {
        let db = database().await;
        let rid = saved_restaurant(&db).await;
        let repo = db.menus();

        repo.unit_of_work(|session| {
            let repo = repo.new_session(session);
            async move {
                repo.save(Menu::new("Soup", "Starters", Money::from_cents(590), rid))
                    .await?;
                repo.save(Menu::new("Soup", "Kids", Money::from_cents(390), rid))
                    .await
            }
        })
        .await
        .unwrap();

        let list = repo.get_menu_list(rid).await.unwrap();
        let categories: Vec<_> = list.iter().map(|m| m.category.as_str()).collect();
        assert_eq!(categories, vec!["Kids", "Starters"]);

        let by_name = repo.get_menu_by_name("Soup", rid).await.unwrap().unwrap();
        assert_eq!(by_name.category, "Starters");
        assert!(repo.get_menu_by_name("Soup", rid + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_by_id_can_rename() {
        let db = database().await;
        let rid = saved_restaurant(&db).await;
        let repo = db.menus();

        let renamed = repo
            .unit_of_work(|session| {
                let repo = repo.new_session(session);
                async move {
                    let mut menu = repo
                        .save(Menu::new("Soup", "Starters", Money::from_cents(590), rid))
                        .await?;
                    menu.name = "Soup of the Day".to_string();
                    repo.save(menu).await
                }
            })
            .await
            .unwrap();

        let stored = repo.get_by_id(renamed.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.name, "Soup of the Day");
        assert_eq!(repo.get_menu_list(rid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_menu_for_missing_restaurant_is_rejected() {
        let db = database().await;
        let repo = db.menus();

        let err = repo
            .unit_of_work(|session| {
                let repo = repo.new_session(session);
                async move {
                    repo.save(Menu::new("Soup", "Starters", Money::from_cents(590), 999))
                        .await
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_negative_price_is_invalid() {
        let db = database().await;

        let err = db
            .menus()
            .save(Menu::new("Soup", "Starters", Money::from_cents(-1), 1))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Invalid(_)));
    }
}

//! # Reservation Repository
//!
//! Database operations for reservations and their table links.
//!
//! ## Save Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    ReservationRepository::save                          │
//! │                                                                         │
//! │  validate (number ≤ 10 chars, people > 0, ...)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  stored id? ──yes──► merge ─┐                                          │
//! │       │ no / stale          │                                          │
//! │       ▼                     │                                          │
//! │  same reservation_number? ──yes──► merge ─┐                            │
//! │       │ no                                │                            │
//! │       ▼                                   ▼                            │
//! │  INSERT                          UPDATE scalars                        │
//! │       │                                   │                            │
//! │       └──────────────┬────────────────────┘                            │
//! │                      ▼                                                  │
//! │  link input tables (union with existing links, never unlink)           │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  reload table ids ─► returned reservation                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reservation numbers are unique across all restaurants.

use bistro_core::validation::validate_reservation;
use bistro_core::{Entity, EntityId, Reservation};
use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::{Repository, RepositoryBase};
use crate::session::Session;

/// Repository for reservation database operations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    base: RepositoryBase,
}

impl Repository for ReservationRepository {
    fn base(&self) -> &RepositoryBase {
        &self.base
    }

    fn new_session(&self, session: Session) -> Self {
        ReservationRepository::with_session(session)
    }
}

impl ReservationRepository {
    /// Creates a repository that opens a session per call.
    pub fn new(db: Database) -> Self {
        ReservationRepository {
            base: RepositoryBase::factory(db),
        }
    }

    /// Creates a repository bound to an existing session.
    pub fn with_session(session: Session) -> Self {
        ReservationRepository {
            base: RepositoryBase::bound(session),
        }
    }

    /// Gets a reservation by its ID, with its table ids.
    pub async fn get_by_id(&self, id: EntityId) -> DbResult<Option<Reservation>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;

                let reservation: Option<Reservation> = sqlx::query_as(
                    r#"
                    SELECT id, created, modified, reservation_date, time_from, time_until,
                           people, reservation_name, reservation_number
                    FROM reservations
                    WHERE id = ?1
                    "#,
                )
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

                with_tables(&mut conn, reservation).await
            })
            .await
    }

    /// Gets a reservation by its number.
    pub async fn get_reservation_by_number(&self, number: &str) -> DbResult<Option<Reservation>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                let reservation = fetch_by_number(&mut conn, number).await?;
                with_tables(&mut conn, reservation).await
            })
            .await
    }

    /// Whether a reservation with this number exists.
    pub async fn is_reservation_number_in_use(&self, number: &str) -> DbResult<bool> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;

                let in_use: bool = sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM reservations WHERE reservation_number = ?1)",
                )
                .bind(number)
                .fetch_one(&mut *conn)
                .await?;

                Ok(in_use)
            })
            .await
    }

    /// Lists the reservations of every table of a restaurant.
    ///
    /// ## Ordering
    /// Date, then start time, then table number. A reservation spanning
    /// several tables appears once, at its lowest table number.
    pub async fn get_reservations_for_restaurant(
        &self,
        restaurant_id: EntityId,
    ) -> DbResult<Vec<Reservation>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;

                let reservations: Vec<Reservation> = sqlx::query_as(
                    r#"
                    SELECT r.id, r.created, r.modified, r.reservation_date, r.time_from,
                           r.time_until, r.people, r.reservation_name, r.reservation_number,
                           MIN(t.table_number) AS first_table
                    FROM reservations r
                    INNER JOIN rel_table_reservation rt ON rt.reservation_id = r.id
                    INNER JOIN guest_tables t ON t.id = rt.table_id
                    WHERE t.restaurant_id = ?1
                    GROUP BY r.id
                    ORDER BY r.reservation_date, r.time_from, first_table
                    "#,
                )
                .bind(restaurant_id)
                .fetch_all(&mut *conn)
                .await?;

                debug!(restaurant_id, count = reservations.len(), "Restaurant reservations");
                attach_tables(&mut conn, reservations).await
            })
            .await
    }

    /// Lists a table's reservations on one calendar day, by start time.
    pub async fn get_table_reservations_for_date(
        &self,
        date: NaiveDate,
        table_id: EntityId,
    ) -> DbResult<Vec<Reservation>> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;

                let reservations: Vec<Reservation> = sqlx::query_as(
                    r#"
                    SELECT r.id, r.created, r.modified, r.reservation_date, r.time_from,
                           r.time_until, r.people, r.reservation_name, r.reservation_number
                    FROM reservations r
                    INNER JOIN rel_table_reservation rt ON rt.reservation_id = r.id
                    WHERE rt.table_id = ?1
                      AND date(r.reservation_date) = ?2
                    ORDER BY r.time_from
                    "#,
                )
                .bind(table_id)
                .bind(date)
                .fetch_all(&mut *conn)
                .await?;

                attach_tables(&mut conn, reservations).await
            })
            .await
    }

    /// Deletes a reservation and its table links.
    ///
    /// ## Returns
    /// `true` if a row was deleted.
    pub async fn delete(&self, id: EntityId) -> DbResult<bool> {
        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                session.mark_written();

                let result = sqlx::query("DELETE FROM reservations WHERE id = ?1")
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;

                debug!(reservation_id = id, deleted = result.rows_affected(), "Deleted reservation");
                Ok(result.rows_affected() > 0)
            })
            .await
    }

    /// Inserts or updates a reservation (see module docs for the flow).
    ///
    /// ## Table Links
    /// Tables listed on the input are added to the stored links; links
    /// missing from the input are kept.
    pub async fn save(&self, reservation: Reservation) -> DbResult<Reservation> {
        validate_reservation(&reservation)?;

        self.base
            .scoped(|session| async move {
                let mut conn = session.acquire().await?;
                session.mark_written();

                let mut stored = match reservation.persistent_id() {
                    Some(id) => fetch_by_id(&mut conn, id).await?,
                    None => None,
                };

                if stored.is_none() {
                    stored = fetch_by_number(&mut conn, &reservation.reservation_number).await?;
                }

                let mut saved = match stored {
                    Some(mut stored) => {
                        debug!(
                            reservation_id = ?stored.id,
                            number = %reservation.reservation_number,
                            "Updating reservation"
                        );
                        stored.merge_from(&reservation);
                        update_reservation(&mut conn, &mut stored).await?;
                        stored
                    }
                    None => {
                        let mut fresh = reservation.clone();
                        insert_reservation(&mut conn, &mut fresh).await?;
                        fresh
                    }
                };

                let id = saved.id.unwrap_or_default();
                for table_id in &reservation.tables {
                    sqlx::query(
                        "INSERT OR IGNORE INTO rel_table_reservation (table_id, reservation_id) VALUES (?1, ?2)",
                    )
                    .bind(table_id)
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
                }

                saved.tables = fetch_table_ids(&mut conn, id).await?;
                Ok(saved)
            })
            .await
    }
}

// =============================================================================
// Row Helpers
// =============================================================================

async fn fetch_by_id(conn: &mut SqliteConnection, id: EntityId) -> DbResult<Option<Reservation>> {
    let reservation = sqlx::query_as(
        r#"
        SELECT id, created, modified, reservation_date, time_from, time_until,
               people, reservation_name, reservation_number
        FROM reservations
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(reservation)
}

async fn fetch_by_number(
    conn: &mut SqliteConnection,
    number: &str,
) -> DbResult<Option<Reservation>> {
    let reservation = sqlx::query_as(
        r#"
        SELECT id, created, modified, reservation_date, time_from, time_until,
               people, reservation_name, reservation_number
        FROM reservations
        WHERE reservation_number = ?1
        "#,
    )
    .bind(number)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(reservation)
}

async fn fetch_table_ids(conn: &mut SqliteConnection, reservation_id: EntityId) -> DbResult<Vec<EntityId>> {
    let ids = sqlx::query_scalar(
        "SELECT table_id FROM rel_table_reservation WHERE reservation_id = ?1 ORDER BY table_id",
    )
    .bind(reservation_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

async fn with_tables(
    conn: &mut SqliteConnection,
    reservation: Option<Reservation>,
) -> DbResult<Option<Reservation>> {
    match reservation {
        Some(mut reservation) => {
            reservation.tables = fetch_table_ids(conn, reservation.id.unwrap_or_default()).await?;
            Ok(Some(reservation))
        }
        None => Ok(None),
    }
}

async fn attach_tables(
    conn: &mut SqliteConnection,
    mut reservations: Vec<Reservation>,
) -> DbResult<Vec<Reservation>> {
    for reservation in &mut reservations {
        reservation.tables = fetch_table_ids(conn, reservation.id.unwrap_or_default()).await?;
    }
    Ok(reservations)
}

async fn insert_reservation(conn: &mut SqliteConnection, reservation: &mut Reservation) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO reservations (
            created, reservation_date, time_from, time_until,
            people, reservation_name, reservation_number
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(now)
    .bind(reservation.reservation_date)
    .bind(reservation.time_from)
    .bind(reservation.time_until)
    .bind(reservation.people)
    .bind(&reservation.reservation_name)
    .bind(&reservation.reservation_number)
    .execute(&mut *conn)
    .await?;

    reservation.id = Some(result.last_insert_rowid());
    reservation.created = Some(now);
    reservation.modified = None;

    debug!(reservation_id = ?reservation.id, number = %reservation.reservation_number, "Inserted reservation");
    Ok(())
}

async fn update_reservation(conn: &mut SqliteConnection, reservation: &mut Reservation) -> DbResult<()> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE reservations SET
            reservation_date = ?2,
            time_from = ?3,
            time_until = ?4,
            people = ?5,
            reservation_name = ?6,
            reservation_number = ?7,
            modified = ?8
        WHERE id = ?1
        "#,
    )
    .bind(reservation.id)
    .bind(reservation.reservation_date)
    .bind(reservation.time_from)
    .bind(reservation.time_until)
    .bind(reservation.people)
    .bind(&reservation.reservation_name)
    .bind(&reservation.reservation_number)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    reservation.modified = Some(now);
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

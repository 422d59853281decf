//! # Seed Data Generator
//!
//! Populates the database with a demo restaurant for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./bistro_dev.db (default)
//! cargo run -p bistro-db --bin seed
//!
//! # Specify database path
//! cargo run -p bistro-db --bin seed -- --db ./data/bistro.db
//!
//! # Start from an empty schema
//! cargo run -p bistro-db --bin seed -- --reset
//! ```
//!
//! ## Generated Data
//! One restaurant, written in a single unit of work:
//! - Menu entries across starters, mains and desserts
//! - Guest tables with 2 to 8 seats
//! - A few reservations for the coming days, some spanning two tables
//! - One open order per reserved table
//!
//! Logging follows `RUST_LOG`; the default is `info,bistro=debug,sqlx=warn`.

use bistro_core::{Address, Menu, Money, Order, Reservation, Restaurant, Table};
use bistro_db::{
    Database, DbConfig, DbError, DbResult, MenuRepository, OrderRepository, ReservationRepository,
    RestaurantRepository, Session, TableRepository,
};
use chrono::{Duration, NaiveTime, Utc};
use std::env;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Menu entries: (category, name, price in cents)
const MENU: &[(&str, &str, i64)] = &[
    ("Starters", "Frittatensuppe", 490),
    ("Starters", "Gulaschsuppe", 590),
    ("Starters", "Gemischter Salat", 450),
    ("Mains", "Wiener Schnitzel", 1450),
    ("Mains", "Tafelspitz", 1690),
    ("Mains", "Käsespätzle", 1190),
    ("Mains", "Backhendl", 1350),
    ("Desserts", "Kaiserschmarrn", 890),
    ("Desserts", "Salzburger Nockerl", 990),
    ("Desserts", "Apfelstrudel", 650),
];

/// Guest tables: (number, seats)
const TABLES: &[(&str, u32)] = &[
    ("T1", 2),
    ("T2", 2),
    ("T3", 4),
    ("T4", 4),
    ("T5", 6),
    ("T6", 8),
];

/// Reservations: (number, name, days ahead, hour, people, table indexes)
const RESERVATIONS: &[(&str, &str, i64, u32, u32, &[usize])] = &[
    ("R-0001", "Huber", 1, 12, 2, &[0]),
    ("R-0002", "Gruber", 1, 19, 4, &[2]),
    ("R-0003", "Wagner", 2, 18, 10, &[4, 3]),
    ("R-0004", "Bauer", 3, 20, 8, &[5]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./bistro_dev.db");
    let mut reset = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--reset" | "-r" => reset = true,
            "--help" | "-h" => {
                println!("Bistro Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./bistro_dev.db)");
                println!("  -r, --reset        Drop and recreate the schema first");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();

    println!("🌱 Bistro Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::from_path(&db_path)).await?;
    println!("✓ Connected to database");

    if reset {
        db.drop_schema().await?;
        db.create_schema().await?;
        println!("✓ Schema recreated");
    }

    let existing = db.restaurants().get_all_restaurants().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} restaurants", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Run with --reset to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating data...");
    let start = std::time::Instant::now();

    let restaurant = db.unit_of_work(seed_restaurant).await?;

    let elapsed = start.elapsed();
    println!();
    println!("✓ Seeded restaurant {:?} in {:?}", restaurant.name, elapsed);
    println!("  Menu entries: {}", restaurant.menus.len());
    println!("  Tables:       {}", restaurant.tables.len());

    let rid = restaurant.id.unwrap_or_default();
    let reservations = db.reservations().get_reservations_for_restaurant(rid).await?;
    println!("  Reservations: {}", reservations.len());

    // Verify capacity search
    println!();
    println!("Verifying capacity search...");
    for capacity in [2, 4, 6] {
        let tables = db.tables().get_tables_with_capacity(capacity, rid).await?;
        println!("  {}+ seats: {} tables", capacity, tables.len());
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Writes the demo restaurant and everything it owns in one session.
async fn seed_restaurant(session: Session) -> DbResult<Restaurant> {
    let restaurants = RestaurantRepository::with_session(session.clone());
    let menus = MenuRepository::with_session(session.clone());
    let tables = TableRepository::with_session(session.clone());
    let reservations = ReservationRepository::with_session(session.clone());
    let orders = OrderRepository::with_session(session);

    let restaurant = restaurants
        .save(Restaurant::new(
            "Gasthaus zur Linde",
            time(11, 0),
            time(23, 0),
            "TUESDAY;WEDNESDAY;THURSDAY;FRIDAY;SATURDAY;SUNDAY",
            Address::new("Getreidegasse 9", "Salzburg", "5020", "AT"),
        ))
        .await?;
    let rid = restaurant.id.unwrap_or_default();
    println!("  Restaurant {:?} (id {})", restaurant.name, rid);

    let mut menu_ids = Vec::with_capacity(MENU.len());
    for (category, name, cents) in MENU {
        let menu = menus
            .save(Menu::new(*name, *category, Money::from_cents(*cents), rid))
            .await?;
        menu_ids.push(menu.id.unwrap_or_default());
    }
    println!("  Generated {} menu entries...", menu_ids.len());

    let mut table_ids = Vec::with_capacity(TABLES.len());
    for (number, seats) in TABLES {
        let table = tables.save(Table::new(*number, *seats, rid)).await?;
        table_ids.push(table.id.unwrap_or_default());
    }
    println!("  Generated {} tables...", table_ids.len());

    let today = Utc::now().date_naive();
    for (number, name, days_ahead, hour, people, table_idx) in RESERVATIONS {
        let day = today + Duration::days(*days_ahead);
        let mut reservation = Reservation::new(
            *number,
            *name,
            day.and_time(NaiveTime::MIN),
            time(*hour, 0),
            time((*hour + 2) % 24, 0),
            *people,
        );
        for idx in *table_idx {
            reservation = reservation.with_table(table_ids[*idx]);
        }
        reservations.save(reservation).await?;

        let first_table = table_ids[table_idx[0]];
        let order = Order::new("Service", first_table)
            .with_menu(menu_ids[(*hour as usize) % menu_ids.len()])
            .with_menu(menu_ids[3]);
        orders.save(order).await?;
    }
    println!("  Generated {} reservations with orders...", RESERVATIONS.len());

    restaurants
        .get_by_id(rid)
        .await?
        .ok_or_else(|| DbError::not_found("Restaurant", rid))
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Initializes the tracing subscriber for logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bistro=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

//! # Schoolhouse DB
//!
//! PostgreSQL pool initialisation and the embedded migration set.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default 10)
//! - `DATABASE_RUN_MIGRATIONS`: run pending migrations at startup (default true)

use std::env;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub use sqlx::PgPool;

/// Migrations under `./migrations` at the workspace root.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Connects to `DATABASE_URL` and applies pending migrations.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is unset, the database is unreachable or a
/// migration fails.
pub async fn init_db_pool() -> PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let run_migrations = env::var("DATABASE_RUN_MIGRATIONS")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);

    if run_migrations {
        MIGRATOR
            .run(&pool)
            .await
            .expect("Failed to run database migrations");
        info!("Database migrations applied");
    }

    pool
}

//! SQLite persistence for users, pics, and schedules.
//!
//! [`store::UserStore`] and [`store::PicStore`] are the seams the gateway and
//! the tick worker depend on; [`store_sqlite::SqliteStore`] is the production
//! backend and [`store_memory::InMemoryStore`] backs tests.

pub mod error;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod types;

pub use error::{Error, Result};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Build the shared connection pool. Foreign keys are enabled per connection
/// so pic/schedule cascades actually fire.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options: SqliteConnectOptions = database_url
        .parse::<SqliteConnectOptions>()
        .map_err(Error::Sqlx)?
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run database migrations. Call once at process startup, before any store is
/// handed out.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Duration;

pub mod models;

mod animals;
mod applications;
mod donations;
mod profiles;
mod projects;
mod shelters;
mod status_changes;

pub use animals::*;
pub use applications::*;
pub use donations::*;
pub use profiles::*;
pub use projects::*;
pub use shelters::*;
pub use status_changes::*;

pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = include_str!("schema.sql");

/// Opens the pool and applies the schema. `":memory:"` yields a single
/// shared connection so every query sees the same database.
pub async fn init_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let in_memory = database_url == ":memory:";
    let manager = if in_memory {
        SqliteConnectionManager::memory()
    } else {
        SqliteConnectionManager::file(database_url)
    }
    .with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
    });

    let mut builder = Pool::builder().connection_timeout(Duration::from_secs(60));
    builder = if in_memory {
        builder.max_size(1).idle_timeout(None).max_lifetime(None)
    } else {
        builder.max_size(10)
    };

    let pool = builder
        .build(manager)
        .map_err(|e| anyhow::anyhow!("Failed to create DB pool: {}", e))?;

    run(&pool, |conn| conn.execute_batch(SCHEMA)).await?;

    Ok(pool)
}

/// `BEGIN IMMEDIATE`: the write lock is held before the first read.
pub(crate) fn write_transaction(conn: &mut Connection) -> rusqlite::Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

/// Runs `f` on a pooled connection off the async runtime.
pub(crate) async fn run<T, F>(pool: &DbPool, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> anyhow::Result<T> {
        let mut conn = pool.get()?;
        Ok(f(&mut *conn)?)
    })
    .await?
}

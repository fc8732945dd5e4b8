use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use tracing::info;

use crate::db::models::LatestQuote;
#[cfg(test)]
use crate::db::models::Sample;
use crate::error::Result;

/// Durable append-only log of volume samples backed by SQLite.
///
/// Only the poll scheduler writes, once per exchange per cycle, so the store
/// relies on SQLite's own locking and adds no write serialization of its own.
#[derive(Clone)]
pub struct SampleStore {
    pool: SqlitePool,
}

impl SampleStore {
    /// Opens (creating if missing) the database file at `path` and ensures the schema exists.
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Full);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        info!("Sample store ready at {path}");
        Ok(store)
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        // A single connection: every new connection to `sqlite::memory:` is a fresh database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Creates the `volumes` table and its `(ts, exchange)` index if absent.
    /// Safe to call on every start, including against files created by older deployments.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts one sample. Each insert is its own autocommit transaction with
    /// `synchronous = FULL`, so the row is on disk when this returns.
    pub async fn append(
        &self,
        timestamp: i64,
        exchange: &str,
        base_volume: f64,
        quote_volume: f64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO volumes (ts, exchange, base_volume_btc, quote_volume_usd)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(timestamp)
        .bind(exchange)
        .bind(base_volume)
        .bind(quote_volume)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent sample for `exchange`. Equal timestamps resolve to the later insert.
    pub async fn latest(&self, exchange: &str) -> Result<Option<LatestQuote>> {
        let row = sqlx::query_as::<_, LatestQuote>(
            r#"
            SELECT ts, quote_volume_usd
            FROM volumes
            WHERE exchange = ?1
            ORDER BY ts DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(exchange)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Mean `quote_volume_usd` over samples with `from <= ts < to`.
    /// `None` when no rows match, which callers must not confuse with a zero average.
    pub async fn average_quote_volume(
        &self,
        exchange: &str,
        from_inclusive: i64,
        to_exclusive: i64,
    ) -> Result<Option<f64>> {
        let avg = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT AVG(quote_volume_usd)
            FROM volumes
            WHERE exchange = ?1 AND ts >= ?2 AND ts < ?3
            "#,
        )
        .bind(exchange)
        .bind(from_inclusive)
        .bind(to_exclusive)
        .fetch_one(&self.pool)
        .await?;

        Ok(avg)
    }

    /// Full history for one exchange in insertion order.
    #[cfg(test)]
    pub async fn samples(&self, exchange: &str) -> Result<Vec<Sample>> {
        let rows = sqlx::query_as::<_, Sample>(
            r#"
            SELECT ts, exchange, base_volume_btc, quote_volume_usd
            FROM volumes
            WHERE exchange = ?1
            ORDER BY ts ASC, rowid ASC
            "#,
        )
        .bind(exchange)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

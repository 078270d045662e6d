//! `PostgreSQL` repositories using JSONB documents.
//!
//! Every collection is a `(id UUID PRIMARY KEY, data JSONB NOT NULL)` table.
//! Documents are stored whole and decoded with `serde_json`; filtering and
//! sorting happen in Rust on the loaded documents.

use super::{
    EventRepository, LedgerChange, LedgerRepository, LedgerSnapshot, PaymentRepository,
    StorageError, StorageResult, UserRepository, normalize_email,
};
use crate::config::StorageConfig;
use crate::types::{Booking, Booth, Event, EventId, PaymentRecord, User, UserId};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::JsonValue;
use std::time::Duration;

/// Idempotent schema, applied at boot
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (id UUID PRIMARY KEY, data JSONB NOT NULL)",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (lower(data->>'email'))",
    "CREATE TABLE IF NOT EXISTS booths (id UUID PRIMARY KEY, data JSONB NOT NULL)",
    "CREATE TABLE IF NOT EXISTS bookings (id UUID PRIMARY KEY, data JSONB NOT NULL)",
    "CREATE TABLE IF NOT EXISTS events (id UUID PRIMARY KEY, data JSONB NOT NULL)",
    "CREATE TABLE IF NOT EXISTS payments (id UUID PRIMARY KEY, data JSONB NOT NULL)",
    "CREATE INDEX IF NOT EXISTS payments_user_idx ON payments ((data->>'userId'))",
];

/// Repositories backed by one connection pool
#[derive(Clone, Debug)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Wrap an existing pool
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the storage configuration
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if no connection can be made.
    pub async fn connect(config: &StorageConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(&config.database_url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self::new(pool))
    }

    /// Create the collection tables if they do not exist
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if a statement fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("Schema ready");
        Ok(())
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_all<T: DeserializeOwned>(&self, table: &'static str) -> StorageResult<Vec<T>> {
        let rows: Vec<(JsonValue,)> = sqlx::query_as(&format!("SELECT data FROM {table}"))
            .fetch_all(&self.pool)
            .await?;
        decode_rows(rows)
    }

    async fn load_one<T: DeserializeOwned>(
        &self,
        table: &'static str,
        id: &uuid::Uuid,
    ) -> StorageResult<Option<T>> {
        let row: Option<(JsonValue,)> =
            sqlx::query_as(&format!("SELECT data FROM {table} WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(json,)| serde_json::from_value(json))
            .transpose()
            .map_err(StorageError::from)
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<(JsonValue,)>) -> StorageResult<Vec<T>> {
    rows.into_iter()
        .map(|(json,)| serde_json::from_value(json).map_err(StorageError::from))
        .collect()
}

/// Map a unique-index violation on the users table to `DuplicateEmail`
fn user_write_error(error: sqlx::Error, email: &str) -> StorageError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.is_unique_violation() {
            return StorageError::DuplicateEmail(normalize_email(email));
        }
    }
    StorageError::Database(error)
}

async fn upsert<'c, T, E>(
    executor: E,
    table: &'static str,
    id: &uuid::Uuid,
    document: &T,
) -> StorageResult<()>
where
    T: Serialize + Sync,
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    let json = serde_json::to_value(document)?;
    sqlx::query(&format!(
        "INSERT INTO {table} (id, data) VALUES ($1, $2)
         ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data"
    ))
    .bind(id)
    .bind(&json)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl LedgerRepository for PostgresStorage {
    #[tracing::instrument(skip(self))]
    async fn load(&self) -> StorageResult<LedgerSnapshot> {
        let booths: Vec<Booth> = self.load_all("booths").await?;
        let bookings: Vec<Booking> = self.load_all("bookings").await?;
        tracing::info!(
            booths = booths.len(),
            bookings = bookings.len(),
            "Loaded booth ledger"
        );
        Ok(LedgerSnapshot { booths, bookings })
    }

    #[tracing::instrument(skip(self, change), fields(touched = change.touched_booths().len()))]
    async fn apply(&self, change: &LedgerChange) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        for booth in &change.booths {
            upsert(&mut *tx, "booths", booth.id.as_uuid(), booth).await?;
        }
        for booking in &change.bookings {
            upsert(&mut *tx, "bookings", booking.id.as_uuid(), booking).await?;
        }
        for id in &change.removed_booths {
            sqlx::query("DELETE FROM booths WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await?;
        }
        for booking in &change.removed_bookings {
            sqlx::query("DELETE FROM bookings WHERE id = $1")
                .bind(booking.id.as_uuid())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl EventRepository for PostgresStorage {
    async fn list(&self) -> StorageResult<Vec<Event>> {
        self.load_all("events").await
    }

    async fn get(&self, id: EventId) -> StorageResult<Option<Event>> {
        self.load_one("events", id.as_uuid()).await
    }

    async fn save(&self, event: &Event) -> StorageResult<()> {
        upsert(&self.pool, "events", event.id.as_uuid(), event).await
    }

    async fn delete(&self, id: EventId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PostgresStorage {
    async fn list(&self) -> StorageResult<Vec<User>> {
        self.load_all("users").await
    }

    async fn get(&self, id: UserId) -> StorageResult<Option<User>> {
        self.load_one("users", id.as_uuid()).await
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let row: Option<(JsonValue,)> =
            sqlx::query_as("SELECT data FROM users WHERE lower(data->>'email') = $1")
                .bind(normalize_email(email))
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(json,)| serde_json::from_value(json))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn insert(&self, user: &User) -> StorageResult<()> {
        let json = serde_json::to_value(user)?;
        sqlx::query("INSERT INTO users (id, data) VALUES ($1, $2)")
            .bind(user.id.as_uuid())
            .bind(&json)
            .execute(&self.pool)
            .await
            .map_err(|e| user_write_error(e, &user.email))?;
        Ok(())
    }

    async fn update(&self, user: &User) -> StorageResult<()> {
        let json = serde_json::to_value(user)?;
        let result = sqlx::query("UPDATE users SET data = $2 WHERE id = $1")
            .bind(user.id.as_uuid())
            .bind(&json)
            .execute(&self.pool)
            .await
            .map_err(|e| user_write_error(e, &user.email))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound("User"));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for PostgresStorage {
    async fn insert(&self, payment: &PaymentRecord) -> StorageResult<()> {
        upsert(&self.pool, "payments", payment.id.as_uuid(), payment).await
    }

    async fn list_for_user(&self, user_id: UserId) -> StorageResult<Vec<PaymentRecord>> {
        let rows: Vec<(JsonValue,)> = sqlx::query_as(
            "SELECT data FROM payments
             WHERE data->>'userId' = $1
             ORDER BY data->>'createdAt' DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        decode_rows(rows)
    }
}

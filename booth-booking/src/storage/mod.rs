//! Document storage.
//!
//! Every collection is a set of JSON documents keyed by UUID. Repositories
//! are async traits so handlers and the booth ledger do not care whether
//! documents live in `PostgreSQL` ([`PostgresStorage`]) or in process memory
//! ([`InMemoryStorage`]).
//!
//! Booths and bookings are only ever written through
//! [`LedgerRepository::apply`], which persists a whole [`LedgerChange`] or
//! nothing.

pub mod filters;
pub mod memory;
pub mod postgres;

pub use memory::InMemoryStorage;
pub use postgres::PostgresStorage;

use crate::types::{
    Booking, BookingId, Booth, BoothId, Event, EventId, PaymentRecord, User, UserId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another account already uses this email
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// The document to update does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The backend refused the write (used by tests to simulate outages)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for repository calls
pub type StorageResult<T> = Result<T, StorageError>;

/// All booths and bookings, as loaded at boot
#[derive(Clone, Debug, Default)]
pub struct LedgerSnapshot {
    /// Every booth
    pub booths: Vec<Booth>,
    /// Every booking
    pub bookings: Vec<Booking>,
}

/// One atomic write to the booth and booking collections
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LedgerChange {
    /// Booths to insert or replace
    pub booths: Vec<Booth>,
    /// Bookings to insert or replace
    pub bookings: Vec<Booking>,
    /// Booths to delete
    pub removed_booths: Vec<BoothId>,
    /// Bookings to delete
    pub removed_bookings: Vec<Booking>,
}

impl LedgerChange {
    /// Whether the change writes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.booths.is_empty()
            && self.bookings.is_empty()
            && self.removed_booths.is_empty()
            && self.removed_bookings.is_empty()
    }

    /// Every booth whose documents this change writes, directly or through
    /// one of its bookings
    #[must_use]
    pub fn touched_booths(&self) -> Vec<BoothId> {
        let mut touched: Vec<BoothId> = self
            .booths
            .iter()
            .map(|booth| booth.id)
            .chain(self.removed_booths.iter().copied())
            .chain(self.bookings.iter().map(|booking| booking.booth_id))
            .chain(self.removed_bookings.iter().map(|booking| booking.booth_id))
            .collect();
        touched.sort_unstable();
        touched.dedup();
        touched
    }

    /// The written version of a booth
    #[must_use]
    pub fn booth(&self, id: BoothId) -> Option<&Booth> {
        self.booths.iter().find(|booth| booth.id == id)
    }

    /// The written version of a booking
    #[must_use]
    pub fn booking(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|booking| booking.id == id)
    }
}

/// Persistence for the booth ledger
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Load every booth and booking
    ///
    /// # Errors
    ///
    /// Returns an error if the documents cannot be read or decoded.
    async fn load(&self) -> StorageResult<LedgerSnapshot>;

    /// Persist a change atomically
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; nothing is persisted then.
    async fn apply(&self, change: &LedgerChange) -> StorageResult<()>;

    /// Check that the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not answer.
    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Event documents
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// All events, unordered
    ///
    /// # Errors
    ///
    /// Returns an error if the documents cannot be read.
    async fn list(&self) -> StorageResult<Vec<Event>>;

    /// One event
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    async fn get(&self, id: EventId) -> StorageResult<Option<Event>>;

    /// Insert or replace an event
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn save(&self, event: &Event) -> StorageResult<()>;

    /// Delete an event, returning whether it existed
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn delete(&self, id: EventId) -> StorageResult<bool>;
}

/// User accounts
///
/// Emails are compared case-insensitively and are unique.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All accounts
    ///
    /// # Errors
    ///
    /// Returns an error if the documents cannot be read.
    async fn list(&self) -> StorageResult<Vec<User>>;

    /// One account
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    async fn get(&self, id: UserId) -> StorageResult<Option<User>>;

    /// The account registered with an email
    ///
    /// # Errors
    ///
    /// Returns an error if the documents cannot be read.
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateEmail`] if the email is taken.
    async fn insert(&self, user: &User) -> StorageResult<()>;

    /// Replace an existing account
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the account does not exist and
    /// [`StorageError::DuplicateEmail`] if the new email belongs to another
    /// account.
    async fn update(&self, user: &User) -> StorageResult<()>;
}

/// Payment records
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Record a payment
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn insert(&self, payment: &PaymentRecord) -> StorageResult<()>;

    /// A user's payments, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the documents cannot be read.
    async fn list_for_user(&self, user_id: UserId) -> StorageResult<Vec<PaymentRecord>>;
}

/// The repositories the application runs on
#[derive(Clone)]
pub struct Repositories {
    /// Booths and bookings
    pub ledger: Arc<dyn LedgerRepository>,
    /// Events
    pub events: Arc<dyn EventRepository>,
    /// User accounts
    pub users: Arc<dyn UserRepository>,
    /// Payment records
    pub payments: Arc<dyn PaymentRepository>,
}

impl Repositories {
    /// Back every repository with one in-memory store
    #[must_use]
    pub fn in_memory(storage: Arc<InMemoryStorage>) -> Self {
        Self {
            ledger: storage.clone(),
            events: storage.clone(),
            users: storage.clone(),
            payments: storage,
        }
    }

    /// Back every repository with one `PostgreSQL` pool
    #[must_use]
    pub fn postgres(storage: Arc<PostgresStorage>) -> Self {
        Self {
            ledger: storage.clone(),
            events: storage.clone(),
            users: storage.clone(),
            payments: storage,
        }
    }
}

/// Normalise an email for storage and lookup
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

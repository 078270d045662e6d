//! In-memory repositories.
//!
//! Used by the test suites and by `STORAGE_BACKEND=memory` for local
//! development. Each collection is a `HashMap` behind a `tokio` `RwLock`;
//! ledger changes take every write lock they need before touching any map,
//! so a change is visible all at once.

use super::{
    EventRepository, LedgerChange, LedgerRepository, LedgerSnapshot, PaymentRepository,
    StorageError, StorageResult, UserRepository, normalize_email,
};
use crate::types::{
    Booking, BookingId, Booth, BoothId, Event, EventId, PaymentId, PaymentRecord, User, UserId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// All collections in process memory
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    booths: RwLock<HashMap<BoothId, Booth>>,
    bookings: RwLock<HashMap<BookingId, Booking>>,
    events: RwLock<HashMap<EventId, Event>>,
    users: RwLock<HashMap<UserId, User>>,
    payments: RwLock<HashMap<PaymentId, PaymentRecord>>,
    fail_next_apply: AtomicBool,
}

impl InMemoryStorage {
    /// Empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with booths and bookings
    #[must_use]
    pub fn with_ledger(booths: Vec<Booth>, bookings: Vec<Booking>) -> Self {
        Self {
            booths: RwLock::new(booths.into_iter().map(|b| (b.id, b)).collect()),
            bookings: RwLock::new(bookings.into_iter().map(|b| (b.id, b)).collect()),
            ..Self::default()
        }
    }

    /// Make the next [`LedgerRepository::apply`] fail without writing
    pub fn fail_next_apply(&self) {
        self.fail_next_apply.store(true, Ordering::SeqCst);
    }

    /// Number of stored bookings
    pub async fn booking_count(&self) -> usize {
        self.bookings.read().await.len()
    }

    /// A stored booth, bypassing the ledger
    pub async fn stored_booth(&self, id: BoothId) -> Option<Booth> {
        self.booths.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryStorage {
    async fn load(&self) -> StorageResult<LedgerSnapshot> {
        Ok(LedgerSnapshot {
            booths: self.booths.read().await.values().cloned().collect(),
            bookings: self.bookings.read().await.values().cloned().collect(),
        })
    }

    async fn apply(&self, change: &LedgerChange) -> StorageResult<()> {
        if self.fail_next_apply.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected failure".to_string()));
        }

        let mut booths = self.booths.write().await;
        let mut bookings = self.bookings.write().await;

        for booth in &change.booths {
            booths.insert(booth.id, booth.clone());
        }
        for booking in &change.bookings {
            bookings.insert(booking.id, booking.clone());
        }
        for id in &change.removed_booths {
            booths.remove(id);
        }
        for booking in &change.removed_bookings {
            bookings.remove(&booking.id);
        }
        Ok(())
    }
}

#[async_trait]
impl EventRepository for InMemoryStorage {
    async fn list(&self) -> StorageResult<Vec<Event>> {
        Ok(self.events.read().await.values().cloned().collect())
    }

    async fn get(&self, id: EventId) -> StorageResult<Option<Event>> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn save(&self, event: &Event) -> StorageResult<()> {
        self.events.write().await.insert(event.id, event.clone());
        Ok(())
    }

    async fn delete(&self, id: EventId) -> StorageResult<bool> {
        Ok(self.events.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl UserRepository for InMemoryStorage {
    async fn list(&self) -> StorageResult<Vec<User>> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn get(&self, id: UserId) -> StorageResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let email = normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| normalize_email(&user.email) == email)
            .cloned())
    }

    async fn insert(&self, user: &User) -> StorageResult<()> {
        let mut users = self.users.write().await;
        let email = normalize_email(&user.email);
        if users.values().any(|u| normalize_email(&u.email) == email) {
            return Err(StorageError::DuplicateEmail(email));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> StorageResult<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(StorageError::NotFound("User"));
        }
        let email = normalize_email(&user.email);
        if users
            .values()
            .any(|u| u.id != user.id && normalize_email(&u.email) == email)
        {
            return Err(StorageError::DuplicateEmail(email));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStorage {
    async fn insert(&self, payment: &PaymentRecord) -> StorageResult<()> {
        self.payments.write().await.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> StorageResult<Vec<PaymentRecord>> {
        let mut payments: Vec<PaymentRecord> = self
            .payments
            .read()
            .await
            .values()
            .filter(|payment| payment.user_id == user_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{BoothStatus, Money, UserRole, UserStatus};
    use chrono::Utc;

    fn user(email: &str) -> User {
        User {
            id: UserId::new(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            phone: String::new(),
            company_name: String::new(),
            industry: String::new(),
            company_size: String::new(),
            company_address: String::new(),
            password_hash: String::new(),
            role: UserRole::Exhibitor,
            status: UserStatus::Active,
            registration_date: Utc::now(),
        }
    }

    fn booth(number: &str) -> Booth {
        Booth {
            id: BoothId::new(),
            number: number.to_string(),
            event: String::new(),
            event_id: None,
            date: String::new(),
            location: String::new(),
            size: String::new(),
            size_label: String::new(),
            price: Money::from_cents(10_000),
            note: String::new(),
            status: BoothStatus::Available,
            features: Vec::new(),
            description: String::new(),
            exhibitor: None,
            coordinates: None,
        }
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected_case_insensitively() {
        let storage = InMemoryStorage::new();
        UserRepository::insert(&storage, &user("ada@example.com")).await.unwrap();

        let result = UserRepository::insert(&storage, &user("ADA@example.com")).await;
        assert!(matches!(result, Err(StorageError::DuplicateEmail(_))));

        let found = storage.find_by_email(" Ada@Example.com").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn update_refuses_another_accounts_email() {
        let storage = InMemoryStorage::new();
        let ada = user("ada@example.com");
        let mut grace = user("grace@example.com");
        UserRepository::insert(&storage, &ada).await.unwrap();
        UserRepository::insert(&storage, &grace).await.unwrap();

        grace.email = "ada@example.com".to_string();
        let result = storage.update(&grace).await;
        assert!(matches!(result, Err(StorageError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn apply_writes_and_removes() {
        let kept = booth("A-1");
        let removed = booth("A-2");
        let storage = InMemoryStorage::with_ledger(vec![kept.clone(), removed.clone()], Vec::new());

        let mut revised = kept.clone();
        revised.price = Money::from_cents(20_000);
        let change = LedgerChange {
            booths: vec![revised.clone()],
            removed_booths: vec![removed.id],
            ..LedgerChange::default()
        };
        storage.apply(&change).await.unwrap();

        let snapshot = storage.load().await.unwrap();
        assert_eq!(snapshot.booths, vec![revised]);
    }

    #[tokio::test]
    async fn injected_failure_writes_nothing_once() {
        let storage = InMemoryStorage::new();
        let change = LedgerChange {
            booths: vec![booth("A-1")],
            ..LedgerChange::default()
        };

        storage.fail_next_apply();
        assert!(storage.apply(&change).await.is_err());
        assert!(storage.load().await.unwrap().booths.is_empty());

        storage.apply(&change).await.unwrap();
        assert_eq!(storage.load().await.unwrap().booths.len(), 1);
    }
}

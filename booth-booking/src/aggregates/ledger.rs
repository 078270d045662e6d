//! Booth ledger aggregate.
//!
//! The ledger owns every booth and booking in memory and is the only writer
//! of both collections. It runs inside one long-lived [`Store`], so every
//! command validates against the outcome of all earlier commands.
//!
//! **Persistence protocol**: a command is validated, turned into a
//! [`LedgerChange`], and every booth the change touches is put on hold. A
//! persistence effect writes the change atomically, then feeds back either
//! the success event (which applies the change and lifts the holds) or
//! [`LedgerAction::PersistenceFailed`] (which only lifts the holds). State is
//! therefore only ever updated with what storage accepted, and a booth can
//! never be booked twice: a second command for a held booth is rejected
//! with [`Rejection::Busy`].
//!
//! [`Store`]: boothbook_runtime::Store

use crate::floorplan;
use crate::storage::{LedgerChange, LedgerRepository, LedgerSnapshot};
use crate::types::{
    Booking, BookingId, BookingStatus, Booth, BoothId, BoothStatus, Coordinates, EventId, Money,
    UserId, UserProfile,
};
use boothbook_core::{
    SmallVec, async_effect, effect::Effect, environment::Clock, reducer::Reducer, smallvec,
};
use boothbook_runtime::Store;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// State
// ============================================================================

/// Every booth and booking, plus the writes in flight
#[derive(Clone, Debug, Default)]
pub struct LedgerState {
    booths: HashMap<BoothId, Booth>,
    bookings: HashMap<BookingId, Booking>,
    /// Booths with a change being persisted
    holds: HashSet<BoothId>,
    /// Lower-cased booth numbers claimed by changes being persisted
    pending_numbers: HashSet<String>,
}

impl LedgerState {
    /// Build the ledger from what storage holds
    #[must_use]
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            booths: snapshot.booths.into_iter().map(|b| (b.id, b)).collect(),
            bookings: snapshot.bookings.into_iter().map(|b| (b.id, b)).collect(),
            holds: HashSet::new(),
            pending_numbers: HashSet::new(),
        }
    }

    /// All booths, unordered
    pub fn booths(&self) -> impl Iterator<Item = &Booth> {
        self.booths.values()
    }

    /// All bookings, unordered
    pub fn bookings(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.values()
    }

    /// One booth by document key
    #[must_use]
    pub fn booth(&self, id: BoothId) -> Option<&Booth> {
        self.booths.get(&id)
    }

    /// One booking
    #[must_use]
    pub fn booking(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.get(&id)
    }

    /// A booth by document key or booth number (case-insensitive)
    #[must_use]
    pub fn find_booth(&self, key: &str) -> Option<&Booth> {
        let key = key.trim();
        if let Ok(id) = key.parse::<BoothId>() {
            if let Some(booth) = self.booths.get(&id) {
                return Some(booth);
            }
        }
        self.booth_by_number(key)
    }

    fn booth_by_number(&self, number: &str) -> Option<&Booth> {
        self.booths
            .values()
            .find(|booth| booth.number.eq_ignore_ascii_case(number))
    }

    /// The pending, confirmed or booked booking holding a booth
    #[must_use]
    pub fn active_booking_for(&self, booth_id: BoothId) -> Option<&Booking> {
        self.bookings
            .values()
            .find(|booking| booking.booth_id == booth_id && booking.status.is_active())
    }

    /// Whether a change touching this booth is being persisted
    #[must_use]
    pub fn is_held(&self, booth_id: BoothId) -> bool {
        self.holds.contains(&booth_id)
    }

    /// Number of booths on hold
    #[must_use]
    pub fn hold_count(&self) -> usize {
        self.holds.len()
    }

    /// Number of booths
    #[must_use]
    pub fn booth_count(&self) -> usize {
        self.booths.len()
    }

    /// Number of bookings
    #[must_use]
    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    fn number_taken(&self, number: &str, except: Option<BoothId>) -> bool {
        self.pending_numbers.contains(&number.to_lowercase())
            || self
                .booths
                .values()
                .any(|booth| Some(booth.id) != except && booth.number.eq_ignore_ascii_case(number))
    }

    /// Apply a persisted change
    pub fn apply(&mut self, change: &LedgerChange) {
        for booth in &change.booths {
            self.booths.insert(booth.id, booth.clone());
        }
        for booking in &change.bookings {
            self.bookings.insert(booking.id, booking.clone());
        }
        for id in &change.removed_booths {
            self.booths.remove(id);
        }
        for booking in &change.removed_bookings {
            self.bookings.remove(&booking.id);
        }
    }

    fn place_holds(&mut self, change: &LedgerChange) {
        self.holds.extend(change.touched_booths());
        self.pending_numbers
            .extend(change.booths.iter().map(|booth| booth.number.to_lowercase()));
    }

    fn lift_holds(&mut self, change: &LedgerChange) {
        for id in change.touched_booths() {
            self.holds.remove(&id);
        }
        for booth in &change.booths {
            self.pending_numbers.remove(&booth.number.to_lowercase());
        }
    }
}

// ============================================================================
// Commands payloads
// ============================================================================

/// Who is issuing a booking command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Requester {
    /// Account issuing the command
    pub user_id: UserId,
    /// Whether the account is an administrator
    pub is_admin: bool,
}

impl Requester {
    fn may_manage(self, booking: &Booking) -> bool {
        self.is_admin || booking.user_id == self.user_id
    }
}

/// A new booth, as submitted by an administrator
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoothDraft {
    /// Booth number
    #[serde(rename = "id")]
    pub number: String,
    /// Event name
    pub event: String,
    /// Event reference
    pub event_id: Option<EventId>,
    /// Free-form date text
    pub date: String,
    /// Hall
    pub location: String,
    /// Size bucket
    pub size: String,
    /// Size as displayed
    pub size_label: String,
    /// Price
    pub price: Money,
    /// Internal note
    pub note: String,
    /// Initial availability (available unless given)
    pub status: Option<BoothStatus>,
    /// Amenities
    pub features: Vec<String>,
    /// Description
    pub description: String,
    /// Position on the floor plan
    pub coordinates: Option<Coordinates>,
}

/// Changes to a booth; absent fields are left as they are
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoothPatch {
    /// Booth number
    #[serde(rename = "id")]
    pub number: Option<String>,
    /// Event name
    pub event: Option<String>,
    /// Event reference
    pub event_id: Option<EventId>,
    /// Free-form date text
    pub date: Option<String>,
    /// Hall
    pub location: Option<String>,
    /// Size bucket
    pub size: Option<String>,
    /// Size as displayed
    pub size_label: Option<String>,
    /// Price
    pub price: Option<Money>,
    /// Internal note
    pub note: Option<String>,
    /// Availability
    pub status: Option<BoothStatus>,
    /// Amenities
    pub features: Option<Vec<String>>,
    /// Description
    pub description: Option<String>,
    /// Position on the floor plan
    pub coordinates: Option<Coordinates>,
}

/// Contact and display fields of a booking
///
/// On placement, absent fields fall back to the requester's profile and the
/// booth. On revision, absent fields are left as they are.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingDetails {
    /// Company name
    pub company_name: Option<String>,
    /// Contact person
    pub contact_person: Option<String>,
    /// Contact email
    pub contact_email: Option<String>,
    /// Contact phone
    pub contact_phone: Option<String>,
    /// Free-form requests
    pub special_requests: Option<String>,
    /// Event name shown on the booking
    pub event_name: Option<String>,
    /// Booth number shown on the booking
    pub booth_number: Option<String>,
    /// Event date shown on the booking
    pub event_date: Option<String>,
    /// Venue shown on the booking
    pub venue: Option<String>,
    /// Location shown on the booking
    pub location: Option<String>,
}

/// A non-empty, trimmed value
fn given(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The first non-empty candidate, else `fallback`
fn first_of(candidates: &[Option<&String>], fallback: &str) -> String {
    candidates
        .iter()
        .find_map(|candidate| given(*candidate))
        .unwrap_or_else(|| fallback.to_string())
}

// ============================================================================
// Rejections
// ============================================================================

/// Why the ledger refused a command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The booth or booking does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The booth already has an active booking
    #[error("This booth is already booked")]
    AlreadyBooked,

    /// The booth cannot be booked right now
    #[error("{0}")]
    Unavailable(String),

    /// The command itself is invalid
    #[error("{0}")]
    Invalid(String),

    /// The requester may not touch this booking
    #[error("{0}")]
    Forbidden(String),

    /// The command conflicts with the current state
    #[error("{0}")]
    Conflict(String),

    /// Another write to the same booth is being persisted
    #[error("Booth is being updated, please retry")]
    Busy,
}

impl Rejection {
    fn not_found(resource: &str) -> Self {
        Self::NotFound(resource.to_string())
    }

    /// Short label for metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyBooked => "already_booked",
            Self::Unavailable(_) => "unavailable",
            Self::Invalid(_) => "invalid",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::Busy => "busy",
        }
    }
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Ledger commands and their outcomes
///
/// Every variant carries a `correlation_id`. Outcomes copy it from their
/// command so the sender can wait for its own result; senders key each
/// command uniquely (see [`LedgerAction::keyed`]).
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerAction {
    // Commands
    /// Add a booth
    RegisterBooth {
        /// Request correlation
        correlation_id: Uuid,
        /// Key of the new booth
        booth_id: BoothId,
        /// Submitted fields
        draft: BoothDraft,
    },
    /// Change a booth's fields
    ReviseBooth {
        /// Request correlation
        correlation_id: Uuid,
        /// Booth to change
        booth_id: BoothId,
        /// Fields to change
        patch: BoothPatch,
    },
    /// Delete a booth without an active booking
    RemoveBooth {
        /// Request correlation
        correlation_id: Uuid,
        /// Booth to delete
        booth_id: BoothId,
    },
    /// Book a booth
    PlaceBooking {
        /// Request correlation
        correlation_id: Uuid,
        /// Key of the new booking
        booking_id: BookingId,
        /// Booth to book
        booth_id: BoothId,
        /// Agreed price, greater than zero
        total_price: Money,
        /// Contact and display fields
        details: BookingDetails,
        /// The booking exhibitor
        requester: UserProfile,
    },
    /// Cancel one's own booking
    CancelBooking {
        /// Request correlation
        correlation_id: Uuid,
        /// Booking to cancel
        booking_id: BookingId,
        /// Issuing account
        requester: Requester,
    },
    /// Set a booking's status (administrators)
    SetBookingStatus {
        /// Request correlation
        correlation_id: Uuid,
        /// Booking to change
        booking_id: BookingId,
        /// New status
        status: BookingStatus,
    },
    /// Delete a booking
    DeleteBooking {
        /// Request correlation
        correlation_id: Uuid,
        /// Booking to delete
        booking_id: BookingId,
        /// Issuing account
        requester: Requester,
    },
    /// Change a booking's contact and display fields
    ReviseBooking {
        /// Request correlation
        correlation_id: Uuid,
        /// Booking to change
        booking_id: BookingId,
        /// Issuing account
        requester: Requester,
        /// Fields to change
        details: BookingDetails,
    },
    /// Place booths without coordinates on the floor plan
    AutoLayout {
        /// Request correlation
        correlation_id: Uuid,
        /// Only booths of this event, when given
        event: Option<String>,
    },

    // Events
    /// A booth was added
    BoothRegistered {
        /// Request correlation
        correlation_id: Uuid,
        /// What was persisted
        change: LedgerChange,
    },
    /// A booth was changed
    BoothRevised {
        /// Request correlation
        correlation_id: Uuid,
        /// What was persisted
        change: LedgerChange,
    },
    /// A booth was deleted
    BoothRemoved {
        /// Request correlation
        correlation_id: Uuid,
        /// What was persisted
        change: LedgerChange,
    },
    /// A booth was booked
    BookingPlaced {
        /// Request correlation
        correlation_id: Uuid,
        /// What was persisted
        change: LedgerChange,
    },
    /// A booking was cancelled by its owner
    BookingCancelled {
        /// Request correlation
        correlation_id: Uuid,
        /// What was persisted
        change: LedgerChange,
    },
    /// A booking's status was set
    BookingStatusChanged {
        /// Request correlation
        correlation_id: Uuid,
        /// What was persisted
        change: LedgerChange,
    },
    /// A booking was deleted
    BookingDeleted {
        /// Request correlation
        correlation_id: Uuid,
        /// What was persisted
        change: LedgerChange,
    },
    /// A booking's details were changed
    BookingRevised {
        /// Request correlation
        correlation_id: Uuid,
        /// What was persisted
        change: LedgerChange,
    },
    /// Booths were placed on the floor plan
    LayoutAssigned {
        /// Request correlation
        correlation_id: Uuid,
        /// What was persisted
        change: LedgerChange,
    },
    /// The command was refused; nothing changed
    CommandRejected {
        /// Request correlation
        correlation_id: Uuid,
        /// Reason
        rejection: Rejection,
    },
    /// Storage refused the change; nothing changed
    PersistenceFailed {
        /// Request correlation
        correlation_id: Uuid,
        /// The change that was not persisted
        change: LedgerChange,
        /// Storage error message
        error: String,
    },
}

impl LedgerAction {
    /// Correlation id of the request behind this action
    #[must_use]
    pub const fn correlation_id(&self) -> Uuid {
        match self {
            Self::RegisterBooth { correlation_id, .. }
            | Self::ReviseBooth { correlation_id, .. }
            | Self::RemoveBooth { correlation_id, .. }
            | Self::PlaceBooking { correlation_id, .. }
            | Self::CancelBooking { correlation_id, .. }
            | Self::SetBookingStatus { correlation_id, .. }
            | Self::DeleteBooking { correlation_id, .. }
            | Self::ReviseBooking { correlation_id, .. }
            | Self::AutoLayout { correlation_id, .. }
            | Self::BoothRegistered { correlation_id, .. }
            | Self::BoothRevised { correlation_id, .. }
            | Self::BoothRemoved { correlation_id, .. }
            | Self::BookingPlaced { correlation_id, .. }
            | Self::BookingCancelled { correlation_id, .. }
            | Self::BookingStatusChanged { correlation_id, .. }
            | Self::BookingDeleted { correlation_id, .. }
            | Self::BookingRevised { correlation_id, .. }
            | Self::LayoutAssigned { correlation_id, .. }
            | Self::CommandRejected { correlation_id, .. }
            | Self::PersistenceFailed { correlation_id, .. } => *correlation_id,
        }
    }

    /// Re-key a command before it is sent.
    ///
    /// Outcomes copy the key of their command, so it must be unique among
    /// commands in flight.
    #[must_use]
    pub fn keyed(mut self, key: Uuid) -> Self {
        match &mut self {
            Self::RegisterBooth { correlation_id, .. }
            | Self::ReviseBooth { correlation_id, .. }
            | Self::RemoveBooth { correlation_id, .. }
            | Self::PlaceBooking { correlation_id, .. }
            | Self::CancelBooking { correlation_id, .. }
            | Self::SetBookingStatus { correlation_id, .. }
            | Self::DeleteBooking { correlation_id, .. }
            | Self::ReviseBooking { correlation_id, .. }
            | Self::AutoLayout { correlation_id, .. }
            | Self::BoothRegistered { correlation_id, .. }
            | Self::BoothRevised { correlation_id, .. }
            | Self::BoothRemoved { correlation_id, .. }
            | Self::BookingPlaced { correlation_id, .. }
            | Self::BookingCancelled { correlation_id, .. }
            | Self::BookingStatusChanged { correlation_id, .. }
            | Self::BookingDeleted { correlation_id, .. }
            | Self::BookingRevised { correlation_id, .. }
            | Self::LayoutAssigned { correlation_id, .. }
            | Self::CommandRejected { correlation_id, .. }
            | Self::PersistenceFailed { correlation_id, .. } => *correlation_id = key,
        }
        self
    }

    /// Whether this action ends a command (success, rejection or failure)
    #[must_use]
    pub const fn is_outcome(&self) -> bool {
        !matches!(
            self,
            Self::RegisterBooth { .. }
                | Self::ReviseBooth { .. }
                | Self::RemoveBooth { .. }
                | Self::PlaceBooking { .. }
                | Self::CancelBooking { .. }
                | Self::SetBookingStatus { .. }
                | Self::DeleteBooking { .. }
                | Self::ReviseBooking { .. }
                | Self::AutoLayout { .. }
        )
    }

    /// The persisted change, for success events
    #[must_use]
    pub const fn change(&self) -> Option<&LedgerChange> {
        match self {
            Self::BoothRegistered { change, .. }
            | Self::BoothRevised { change, .. }
            | Self::BoothRemoved { change, .. }
            | Self::BookingPlaced { change, .. }
            | Self::BookingCancelled { change, .. }
            | Self::BookingStatusChanged { change, .. }
            | Self::BookingDeleted { change, .. }
            | Self::BookingRevised { change, .. }
            | Self::LayoutAssigned { change, .. } => Some(change),
            _ => None,
        }
    }
}

/// Which success event a persisted change becomes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    BoothRegistered,
    BoothRevised,
    BoothRemoved,
    BookingPlaced,
    BookingCancelled,
    BookingStatusChanged,
    BookingDeleted,
    BookingRevised,
    LayoutAssigned,
}

impl Outcome {
    const fn into_action(self, correlation_id: Uuid, change: LedgerChange) -> LedgerAction {
        match self {
            Self::BoothRegistered => LedgerAction::BoothRegistered { correlation_id, change },
            Self::BoothRevised => LedgerAction::BoothRevised { correlation_id, change },
            Self::BoothRemoved => LedgerAction::BoothRemoved { correlation_id, change },
            Self::BookingPlaced => LedgerAction::BookingPlaced { correlation_id, change },
            Self::BookingCancelled => LedgerAction::BookingCancelled { correlation_id, change },
            Self::BookingStatusChanged => {
                LedgerAction::BookingStatusChanged { correlation_id, change }
            },
            Self::BookingDeleted => LedgerAction::BookingDeleted { correlation_id, change },
            Self::BookingRevised => LedgerAction::BookingRevised { correlation_id, change },
            Self::LayoutAssigned => LedgerAction::LayoutAssigned { correlation_id, change },
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::BoothRegistered => "booth_registered",
            Self::BoothRevised => "booth_revised",
            Self::BoothRemoved => "booth_removed",
            Self::BookingPlaced => "booking_placed",
            Self::BookingCancelled => "booking_cancelled",
            Self::BookingStatusChanged => "booking_status_changed",
            Self::BookingDeleted => "booking_deleted",
            Self::BookingRevised => "booking_revised",
            Self::LayoutAssigned => "layout_assigned",
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the ledger
#[derive(Clone)]
pub struct LedgerEnvironment {
    /// Clock for booking timestamps
    pub clock: Arc<dyn Clock>,
    /// Where changes are persisted
    pub repository: Arc<dyn LedgerRepository>,
}

impl LedgerEnvironment {
    /// Creates a new `LedgerEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, repository: Arc<dyn LedgerRepository>) -> Self {
        Self { clock, repository }
    }
}

/// The store running the ledger
pub type LedgerStore = Store<LedgerState, LedgerAction, LedgerEnvironment, LedgerReducer>;

// ============================================================================
// Reducer
// ============================================================================

type Effects = SmallVec<[Effect<LedgerAction>; 4]>;
type Validated = Result<(LedgerChange, Outcome), Rejection>;

/// Reducer for the booth ledger
#[derive(Clone, Debug, Default)]
pub struct LedgerReducer;

impl LedgerReducer {
    /// Creates a new `LedgerReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Deliver a rejection to whoever awaits the command
    fn reject(correlation_id: Uuid, rejection: Rejection) -> Effects {
        tracing::debug!(%correlation_id, %rejection, "Ledger command rejected");
        metrics::counter!("ledger.commands.rejected", "reason" => rejection.kind()).increment(1);
        smallvec![async_effect! {
            Some(LedgerAction::CommandRejected { correlation_id, rejection })
        }]
    }

    /// Hold the touched booths and persist the change
    #[allow(clippy::cast_precision_loss)] // gauge of a small count
    fn commit(
        state: &mut LedgerState,
        env: &LedgerEnvironment,
        correlation_id: Uuid,
        validated: Validated,
    ) -> Effects {
        let (change, outcome) = match validated {
            Ok(validated) => validated,
            Err(rejection) => return Self::reject(correlation_id, rejection),
        };

        if change
            .touched_booths()
            .iter()
            .any(|booth_id| state.is_held(*booth_id))
        {
            return Self::reject(correlation_id, Rejection::Busy);
        }

        if change.is_empty() {
            return smallvec![async_effect! {
                Some(outcome.into_action(correlation_id, change))
            }];
        }

        state.place_holds(&change);
        metrics::gauge!("ledger.holds").set(state.hold_count() as f64);

        let repository = Arc::clone(&env.repository);
        smallvec![async_effect! {
            match repository.apply(&change).await {
                Ok(()) => Some(outcome.into_action(correlation_id, change)),
                Err(error) => {
                    tracing::error!(
                        %correlation_id,
                        error = %error,
                        "Failed to persist ledger change"
                    );
                    Some(LedgerAction::PersistenceFailed {
                        correlation_id,
                        change,
                        error: error.to_string(),
                    })
                },
            }
        }]
    }

    fn register_booth(state: &LedgerState, booth_id: BoothId, draft: BoothDraft) -> Validated {
        let number = draft.number.trim().to_string();
        if number.is_empty() {
            return Err(Rejection::Invalid("Booth number is required".to_string()));
        }
        if draft.status == Some(BoothStatus::Booked) {
            return Err(Rejection::Invalid(
                "Booth status cannot be set to booked directly".to_string(),
            ));
        }
        if state.booths.contains_key(&booth_id) || state.number_taken(&number, None) {
            return Err(Rejection::Conflict(format!(
                "Booth number {number} already exists"
            )));
        }

        let booth = Booth {
            id: booth_id,
            number,
            event: draft.event,
            event_id: draft.event_id,
            date: draft.date,
            location: draft.location,
            size: draft.size,
            size_label: draft.size_label,
            price: draft.price,
            note: draft.note,
            status: draft.status.unwrap_or_default(),
            features: draft.features,
            description: draft.description,
            exhibitor: None,
            coordinates: draft.coordinates,
        };

        Ok((
            LedgerChange {
                booths: vec![booth],
                ..LedgerChange::default()
            },
            Outcome::BoothRegistered,
        ))
    }

    fn revise_booth(state: &LedgerState, booth_id: BoothId, patch: BoothPatch) -> Validated {
        let Some(current) = state.booth(booth_id) else {
            return Err(Rejection::not_found("Booth"));
        };
        let mut booth = current.clone();

        if let Some(status) = patch.status {
            if status == BoothStatus::Booked && current.status != BoothStatus::Booked {
                return Err(Rejection::Invalid(
                    "Booth status cannot be set to booked directly".to_string(),
                ));
            }
            if status != BoothStatus::Booked && state.active_booking_for(booth_id).is_some() {
                return Err(Rejection::Conflict(
                    "Booth has an active booking; cancel it first".to_string(),
                ));
            }
            if status != BoothStatus::Booked {
                booth.exhibitor = None;
            }
            booth.status = status;
        }

        if let Some(number) = patch.number {
            let number = number.trim().to_string();
            if number.is_empty() {
                return Err(Rejection::Invalid("Booth number is required".to_string()));
            }
            if !number.eq_ignore_ascii_case(&current.number)
                && state.number_taken(&number, Some(booth_id))
            {
                return Err(Rejection::Conflict(format!(
                    "Booth number {number} already exists"
                )));
            }
            booth.number = number;
        }

        if let Some(event) = patch.event {
            booth.event = event;
        }
        if patch.event_id.is_some() {
            booth.event_id = patch.event_id;
        }
        if let Some(date) = patch.date {
            booth.date = date;
        }
        if let Some(location) = patch.location {
            booth.location = location;
        }
        if let Some(size) = patch.size {
            booth.size = size;
        }
        if let Some(size_label) = patch.size_label {
            booth.size_label = size_label;
        }
        if let Some(price) = patch.price {
            booth.price = price;
        }
        if let Some(note) = patch.note {
            booth.note = note;
        }
        if let Some(features) = patch.features {
            booth.features = features;
        }
        if let Some(description) = patch.description {
            booth.description = description;
        }
        if patch.coordinates.is_some() {
            booth.coordinates = patch.coordinates;
        }

        Ok((
            LedgerChange {
                booths: vec![booth],
                ..LedgerChange::default()
            },
            Outcome::BoothRevised,
        ))
    }

    fn remove_booth(state: &LedgerState, booth_id: BoothId) -> Validated {
        if state.booth(booth_id).is_none() {
            return Err(Rejection::not_found("Booth"));
        }
        if state.active_booking_for(booth_id).is_some() {
            return Err(Rejection::Conflict(
                "Booth has an active booking; cancel it first".to_string(),
            ));
        }
        Ok((
            LedgerChange {
                removed_booths: vec![booth_id],
                ..LedgerChange::default()
            },
            Outcome::BoothRemoved,
        ))
    }

    fn place_booking(
        state: &LedgerState,
        env: &LedgerEnvironment,
        booking_id: BookingId,
        booth_id: BoothId,
        total_price: Money,
        details: &BookingDetails,
        requester: &UserProfile,
    ) -> Validated {
        let Some(booth) = state.booth(booth_id) else {
            return Err(Rejection::not_found("Booth"));
        };
        if total_price.is_zero() {
            return Err(Rejection::Invalid(
                "Valid total price is required".to_string(),
            ));
        }
        if booth.status == BoothStatus::Maintenance {
            return Err(Rejection::Unavailable(
                "This booth is under maintenance".to_string(),
            ));
        }
        if booth.status == BoothStatus::Booked || state.active_booking_for(booth_id).is_some() {
            return Err(Rejection::AlreadyBooked);
        }

        let now = env.clock.now();
        let full_name = format!("{} {}", requester.first_name, requester.last_name)
            .trim()
            .to_string();
        let booking = Booking {
            id: booking_id,
            booth_id,
            user_id: requester.id,
            company_name: first_of(
                &[details.company_name.as_ref(), Some(&requester.company_name)],
                "N/A",
            ),
            contact_person: first_of(
                &[details.contact_person.as_ref(), Some(&full_name)],
                "N/A",
            ),
            contact_email: first_of(
                &[details.contact_email.as_ref(), Some(&requester.email)],
                "N/A",
            ),
            contact_phone: first_of(
                &[details.contact_phone.as_ref(), Some(&requester.phone)],
                "N/A",
            ),
            special_requests: given(details.special_requests.as_ref()).unwrap_or_default(),
            total_price,
            status: BookingStatus::Confirmed,
            booking_date: now,
            event_name: first_of(&[details.event_name.as_ref(), Some(&booth.event)], "N/A"),
            booth_number: first_of(&[details.booth_number.as_ref(), Some(&booth.number)], "N/A"),
            event_date: first_of(&[details.event_date.as_ref(), Some(&booth.date)], "Date TBD"),
            venue: first_of(&[details.venue.as_ref(), Some(&booth.location)], "Venue TBD"),
            location: first_of(
                &[details.location.as_ref(), Some(&booth.location)],
                "Location TBD",
            ),
            created_at: now,
            updated_at: now,
        };

        let mut booked = booth.clone();
        booked.status = BoothStatus::Booked;
        booked.exhibitor = Some(requester.id);

        Ok((
            LedgerChange {
                booths: vec![booked],
                bookings: vec![booking],
                ..LedgerChange::default()
            },
            Outcome::BookingPlaced,
        ))
    }

    /// The booth returned to available, if `booking` is the one holding it
    fn released_booth(state: &LedgerState, booking: &Booking) -> Option<Booth> {
        if !booking.status.is_active() {
            return None;
        }
        let booth = state.booth(booking.booth_id)?;
        if booth.status != BoothStatus::Booked {
            return None;
        }
        let mut released = booth.clone();
        released.status = BoothStatus::Available;
        released.exhibitor = None;
        Some(released)
    }

    fn cancel_booking(
        state: &LedgerState,
        env: &LedgerEnvironment,
        booking_id: BookingId,
        requester: Requester,
    ) -> Validated {
        let Some(current) = state.booking(booking_id) else {
            return Err(Rejection::not_found("Booking"));
        };
        if current.user_id != requester.user_id {
            return Err(Rejection::Forbidden(
                "Can only cancel your own bookings".to_string(),
            ));
        }
        if current.status == BookingStatus::Cancelled {
            return Err(Rejection::Invalid(
                "Booking is already cancelled".to_string(),
            ));
        }

        let booths = Self::released_booth(state, current).into_iter().collect();
        let mut booking = current.clone();
        booking.status = BookingStatus::Cancelled;
        booking.updated_at = env.clock.now();

        Ok((
            LedgerChange {
                booths,
                bookings: vec![booking],
                ..LedgerChange::default()
            },
            Outcome::BookingCancelled,
        ))
    }

    fn set_booking_status(
        state: &LedgerState,
        env: &LedgerEnvironment,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> Validated {
        let Some(current) = state.booking(booking_id) else {
            return Err(Rejection::not_found("Booking"));
        };

        let mut booths = Vec::new();
        if status.is_active() && !current.status.is_active() {
            // Reactivating takes the booth again
            let Some(booth) = state.booth(current.booth_id) else {
                return Err(Rejection::not_found("Booth"));
            };
            if booth.status == BoothStatus::Maintenance {
                return Err(Rejection::Unavailable(
                    "This booth is under maintenance".to_string(),
                ));
            }
            if state.active_booking_for(booth.id).is_some() {
                return Err(Rejection::AlreadyBooked);
            }
            let mut booked = booth.clone();
            booked.status = BoothStatus::Booked;
            booked.exhibitor = Some(current.user_id);
            booths.push(booked);
        } else if !status.is_active() {
            booths.extend(Self::released_booth(state, current));
        }

        let mut booking = current.clone();
        booking.status = status;
        booking.updated_at = env.clock.now();

        Ok((
            LedgerChange {
                booths,
                bookings: vec![booking],
                ..LedgerChange::default()
            },
            Outcome::BookingStatusChanged,
        ))
    }

    fn delete_booking(
        state: &LedgerState,
        booking_id: BookingId,
        requester: Requester,
    ) -> Validated {
        let Some(current) = state.booking(booking_id) else {
            return Err(Rejection::not_found("Booking"));
        };
        if !requester.may_manage(current) {
            return Err(Rejection::Forbidden(
                "Not authorized to delete this booking".to_string(),
            ));
        }

        Ok((
            LedgerChange {
                booths: Self::released_booth(state, current).into_iter().collect(),
                removed_bookings: vec![current.clone()],
                ..LedgerChange::default()
            },
            Outcome::BookingDeleted,
        ))
    }

    fn revise_booking(
        state: &LedgerState,
        env: &LedgerEnvironment,
        booking_id: BookingId,
        requester: Requester,
        details: BookingDetails,
    ) -> Validated {
        let Some(current) = state.booking(booking_id) else {
            return Err(Rejection::not_found("Booking"));
        };
        if !requester.may_manage(current) {
            return Err(Rejection::Forbidden(
                "Not authorized to update this booking".to_string(),
            ));
        }

        let mut booking = current.clone();
        let fields = [
            (details.company_name, &mut booking.company_name),
            (details.contact_person, &mut booking.contact_person),
            (details.contact_email, &mut booking.contact_email),
            (details.contact_phone, &mut booking.contact_phone),
            (details.special_requests, &mut booking.special_requests),
            (details.event_name, &mut booking.event_name),
            (details.booth_number, &mut booking.booth_number),
            (details.event_date, &mut booking.event_date),
            (details.venue, &mut booking.venue),
            (details.location, &mut booking.location),
        ];
        for (value, field) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
        booking.updated_at = env.clock.now();

        Ok((
            LedgerChange {
                bookings: vec![booking],
                ..LedgerChange::default()
            },
            Outcome::BookingRevised,
        ))
    }

    fn auto_layout(state: &LedgerState, event: Option<&str>) -> Validated {
        let event = event
            .map(str::trim)
            .filter(|e| !e.is_empty() && !e.eq_ignore_ascii_case("all"));
        let candidates = state
            .booths()
            .filter(|booth| event.is_none_or(|event| booth.event == event));

        let booths = floorplan::auto_layout(candidates)
            .into_iter()
            .filter_map(|(booth_id, coordinates)| {
                let mut booth = state.booth(booth_id)?.clone();
                booth.coordinates = Some(coordinates);
                Some(booth)
            })
            .collect();

        Ok((
            LedgerChange {
                booths,
                ..LedgerChange::default()
            },
            Outcome::LayoutAssigned,
        ))
    }

    /// Apply a persisted change and lift its holds
    #[allow(clippy::cast_precision_loss)]
    fn settle(state: &mut LedgerState, change: &LedgerChange, outcome: &'static str) {
        state.lift_holds(change);
        state.apply(change);
        metrics::counter!("ledger.changes.persisted", "outcome" => outcome).increment(1);
        metrics::gauge!("ledger.holds").set(state.hold_count() as f64);
    }
}

impl Reducer for LedgerReducer {
    type State = LedgerState;
    type Action = LedgerAction;
    type Environment = LedgerEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            LedgerAction::RegisterBooth {
                correlation_id,
                booth_id,
                draft,
            } => {
                let validated = Self::register_booth(state, booth_id, draft);
                Self::commit(state, env, correlation_id, validated)
            },
            LedgerAction::ReviseBooth {
                correlation_id,
                booth_id,
                patch,
            } => {
                let validated = Self::revise_booth(state, booth_id, patch);
                Self::commit(state, env, correlation_id, validated)
            },
            LedgerAction::RemoveBooth {
                correlation_id,
                booth_id,
            } => {
                let validated = Self::remove_booth(state, booth_id);
                Self::commit(state, env, correlation_id, validated)
            },
            LedgerAction::PlaceBooking {
                correlation_id,
                booking_id,
                booth_id,
                total_price,
                details,
                requester,
            } => {
                let validated = Self::place_booking(
                    state,
                    env,
                    booking_id,
                    booth_id,
                    total_price,
                    &details,
                    &requester,
                );
                Self::commit(state, env, correlation_id, validated)
            },
            LedgerAction::CancelBooking {
                correlation_id,
                booking_id,
                requester,
            } => {
                let validated = Self::cancel_booking(state, env, booking_id, requester);
                Self::commit(state, env, correlation_id, validated)
            },
            LedgerAction::SetBookingStatus {
                correlation_id,
                booking_id,
                status,
            } => {
                let validated = Self::set_booking_status(state, env, booking_id, status);
                Self::commit(state, env, correlation_id, validated)
            },
            LedgerAction::DeleteBooking {
                correlation_id,
                booking_id,
                requester,
            } => {
                let validated = Self::delete_booking(state, booking_id, requester);
                Self::commit(state, env, correlation_id, validated)
            },
            LedgerAction::ReviseBooking {
                correlation_id,
                booking_id,
                requester,
                details,
            } => {
                let validated = Self::revise_booking(state, env, booking_id, requester, details);
                Self::commit(state, env, correlation_id, validated)
            },
            LedgerAction::AutoLayout {
                correlation_id,
                event,
            } => {
                let validated = Self::auto_layout(state, event.as_deref());
                Self::commit(state, env, correlation_id, validated)
            },

            // ========== Events ==========
            LedgerAction::BoothRegistered { change, .. } => {
                Self::settle(state, &change, Outcome::BoothRegistered.as_str());
                SmallVec::new()
            },
            LedgerAction::BoothRevised { change, .. } => {
                Self::settle(state, &change, Outcome::BoothRevised.as_str());
                SmallVec::new()
            },
            LedgerAction::BoothRemoved { change, .. } => {
                Self::settle(state, &change, Outcome::BoothRemoved.as_str());
                SmallVec::new()
            },
            LedgerAction::BookingPlaced { change, .. } => {
                Self::settle(state, &change, Outcome::BookingPlaced.as_str());
                SmallVec::new()
            },
            LedgerAction::BookingCancelled { change, .. } => {
                Self::settle(state, &change, Outcome::BookingCancelled.as_str());
                SmallVec::new()
            },
            LedgerAction::BookingStatusChanged { change, .. } => {
                Self::settle(state, &change, Outcome::BookingStatusChanged.as_str());
                SmallVec::new()
            },
            LedgerAction::BookingDeleted { change, .. } => {
                Self::settle(state, &change, Outcome::BookingDeleted.as_str());
                SmallVec::new()
            },
            LedgerAction::BookingRevised { change, .. } => {
                Self::settle(state, &change, Outcome::BookingRevised.as_str());
                SmallVec::new()
            },
            LedgerAction::LayoutAssigned { change, .. } => {
                Self::settle(state, &change, Outcome::LayoutAssigned.as_str());
                SmallVec::new()
            },
            LedgerAction::PersistenceFailed { change, .. } => {
                state.lift_holds(&change);
                metrics::counter!("ledger.persistence.failed").increment(1);
                SmallVec::new()
            },
            LedgerAction::CommandRejected { .. } => SmallVec::new(),
        }
    }
}

//! Domain types for the booth booking platform.
//!
//! Identifiers, status enums, the cents-based [`Money`] value object, the
//! stored documents (users, booths, bookings, events, payments) and the
//! views the API renders from them.
//!
//! Documents serialise with camelCase field names and expose their primary
//! key as `_id`, which is the shape the browser client reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Declares a UUID-backed identifier newtype.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a user account
    UserId
);
entity_id!(
    /// Unique identifier for a booth (the document key, not the booth number)
    BoothId
);
entity_id!(
    /// Unique identifier for a booking
    BookingId
);
entity_id!(
    /// Unique identifier for an event
    EventId
);
entity_id!(
    /// Unique identifier for a payment record
    PaymentId
);

// ============================================================================
// Status enums
// ============================================================================

/// Returned when a status string is not one of the known values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} '{value}'")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Declares a lowercase wire enum with `as_str` and case-insensitive `FromStr`.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Wire name of this status
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(ParseStatusError::new($kind, s)),
                }
            }
        }
    };
}

wire_enum!(
    /// Account role
    UserRole ("role") {
        /// Books booths for their company
        #[default]
        Exhibitor => "exhibitor",
        /// Manages events, booths, bookings and exhibitors
        Admin => "admin",
    }
);

wire_enum!(
    /// Account status
    UserStatus ("user status") {
        /// May sign in
        #[default]
        Active => "active",
        /// Suspended by an administrator
        Inactive => "inactive",
    }
);

wire_enum!(
    /// Booth availability
    BoothStatus ("booth status") {
        /// Free to book
        #[default]
        Available => "available",
        /// Held by an active booking
        Booked => "booked",
        /// Closed for booking by an administrator
        Maintenance => "maintenance",
    }
);

impl BoothStatus {
    /// Human label shown by the admin console ("Available", "Booked", ...)
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Booked => "Booked",
            Self::Maintenance => "Maintenance",
        }
    }

    /// CSS class used by the booth tables
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Available => "status-available",
            Self::Booked => "status-booked",
            Self::Maintenance => "status-maintenance",
        }
    }
}

wire_enum!(
    /// Booking lifecycle status
    BookingStatus ("booking status") {
        /// Awaiting confirmation
        #[default]
        Pending => "pending",
        /// Confirmed by payment or an administrator
        Confirmed => "confirmed",
        /// Cancelled; the booth is released
        Cancelled => "cancelled",
        /// Legacy synonym of confirmed
        Booked => "booked",
    }
);

impl BookingStatus {
    /// Whether a booking in this status holds its booth
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

wire_enum!(
    /// Event lifecycle status
    EventStatus ("event status") {
        /// Announced, not started
        #[default]
        Upcoming => "upcoming",
        /// Running now
        Ongoing => "ongoing",
        /// Finished
        Completed => "completed",
        /// Called off
        Cancelled => "cancelled",
        /// Not yet published
        Draft => "draft",
    }
);

wire_enum!(
    /// Payment outcome
    PaymentStatus ("payment status") {
        /// Submitted, not settled
        Pending => "pending",
        /// Settled
        #[default]
        Completed => "completed",
        /// Declined or errored
        Failed => "failed",
    }
);

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
///
/// Crosses the wire as a decimal dollar amount (`1250.5`), which is what the
/// browser client sends and displays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    /// Zero dollars
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from a dollar amount, rounded to the cent
    ///
    /// Returns `None` for negative, non-finite or out-of-range amounts.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )] // range checked before the cast
    pub fn from_dollars_f64(dollars: f64) -> Option<Self> {
        if !dollars.is_finite() || dollars < 0.0 {
            return None;
        }
        let cents = (dollars * 100.0).round();
        if cents >= u64::MAX as f64 {
            return None;
        }
        Some(Self(cents as u64))
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // exact below 2^53 cents
    pub fn dollars(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Adds two money amounts, clamping at the maximum
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// A percentage of this amount, rounded half up to the cent
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // bounds checked
    pub const fn percent(self, percent: u64) -> Self {
        // u128 so large amounts cannot overflow the intermediate product
        let scaled = self.0 as u128 * percent as u128;
        let rounded = (scaled + 50) / 100;
        if rounded > u64::MAX as u128 {
            Self(u64::MAX)
        } else {
            Self(rounded as u64)
        }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl<'a> std::iter::Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.dollars())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dollars = f64::deserialize(deserializer)?;
        Self::from_dollars_f64(dollars).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid amount: {dollars}"))
        })
    }
}

// ============================================================================
// Floor plan
// ============================================================================

/// Position of a booth on the floor plan canvas
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Horizontal offset from the left edge
    pub x: f64,
    /// Vertical offset from the top edge
    pub y: f64,
}

// ============================================================================
// Documents
// ============================================================================

/// A user account as stored
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document key
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Given name
    #[serde(default)]
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Sign-in email, unique across accounts
    pub email: String,
    /// Contact phone
    #[serde(default)]
    pub phone: String,
    /// Company the exhibitor represents
    #[serde(default)]
    pub company_name: String,
    /// Industry, used by the exhibitor filters
    #[serde(default)]
    pub industry: String,
    /// Company size bucket
    #[serde(default)]
    pub company_size: String,
    /// Company postal address
    #[serde(default)]
    pub company_address: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Account role
    #[serde(default)]
    pub role: UserRole,
    /// Account status
    #[serde(default)]
    pub status: UserStatus,
    /// When the account was created
    pub registration_date: DateTime<Utc>,
}

impl User {
    /// "First Last", trimmed
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Whether the account has the admin role
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A booth as stored
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booth {
    /// Document key
    #[serde(rename = "_id")]
    pub id: BoothId,
    /// Human booth number such as `A-12`, unique
    #[serde(rename = "id")]
    pub number: String,
    /// Event name
    #[serde(default)]
    pub event: String,
    /// Event reference, when the booth belongs to a managed event
    #[serde(default)]
    pub event_id: Option<EventId>,
    /// Free-form date text
    #[serde(default)]
    pub date: String,
    /// Hall
    #[serde(default)]
    pub location: String,
    /// Size bucket (small, medium, large)
    #[serde(default)]
    pub size: String,
    /// Size as displayed ("Medium (3m x 3m)")
    #[serde(default)]
    pub size_label: String,
    /// Price for the whole event
    #[serde(default)]
    pub price: Money,
    /// Internal note
    #[serde(default)]
    pub note: String,
    /// Availability
    #[serde(default)]
    pub status: BoothStatus,
    /// Amenities ("Power", "WiFi", ...)
    #[serde(default)]
    pub features: Vec<String>,
    /// Marketing description
    #[serde(default)]
    pub description: String,
    /// The exhibitor holding the booth
    #[serde(default)]
    pub exhibitor: Option<UserId>,
    /// Position on the floor plan
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// A booking as stored
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Document key
    #[serde(rename = "_id")]
    pub id: BookingId,
    /// Booked booth
    pub booth_id: BoothId,
    /// Booking exhibitor
    pub user_id: UserId,
    /// Company snapshot
    #[serde(default)]
    pub company_name: String,
    /// Contact snapshot
    #[serde(default)]
    pub contact_person: String,
    /// Contact snapshot
    #[serde(default)]
    pub contact_email: String,
    /// Contact snapshot
    #[serde(default)]
    pub contact_phone: String,
    /// Free-form requests from the exhibitor
    #[serde(default)]
    pub special_requests: String,
    /// Agreed price
    pub total_price: Money,
    /// Lifecycle status
    #[serde(default)]
    pub status: BookingStatus,
    /// When the booking was placed
    pub booking_date: DateTime<Utc>,
    /// Display snapshot
    #[serde(default)]
    pub event_name: String,
    /// Display snapshot
    #[serde(default)]
    pub booth_number: String,
    /// Display snapshot
    #[serde(default)]
    pub event_date: String,
    /// Display snapshot
    #[serde(default)]
    pub venue: String,
    /// Display snapshot
    #[serde(default)]
    pub location: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// An event as stored
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Document key
    #[serde(rename = "_id")]
    pub id: EventId,
    /// Event title
    pub name: String,
    /// Opening time
    pub start_date: DateTime<Utc>,
    /// Closing time
    pub end_date: DateTime<Utc>,
    /// City or address
    #[serde(default)]
    pub location: String,
    /// Venue name
    #[serde(default)]
    pub venue: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: EventStatus,
    /// Booth capacity
    #[serde(default = "default_max_booths")]
    pub max_booths: u32,
    /// Base booth price
    #[serde(default)]
    pub booth_price: Option<Money>,
    /// Offered booth sizes
    #[serde(default)]
    pub booth_sizes: Vec<String>,
    /// Pricing tiers, as free text
    #[serde(default)]
    pub price_tiers: String,
    /// Whether exhibitors can currently book
    #[serde(default)]
    pub registration_open: bool,
    /// Banner image
    #[serde(default)]
    pub image_url: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

const fn default_max_booths() -> u32 {
    100
}

/// A recorded payment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Document key
    #[serde(rename = "_id")]
    pub id: PaymentId,
    /// Paying user
    pub user_id: UserId,
    /// Booking paid for
    #[serde(default)]
    pub booking_id: Option<BookingId>,
    /// Amount paid
    pub amount: Money,
    /// Card, invoice, ...
    #[serde(default)]
    pub payment_method: String,
    /// Gateway transaction reference
    #[serde(default)]
    pub transaction_id: String,
    /// Outcome
    #[serde(default)]
    pub status: PaymentStatus,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Views
// ============================================================================

/// A user without credentials, as returned by the API
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Document key
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Sign-in email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Company
    pub company_name: String,
    /// Industry
    pub industry: String,
    /// Company size bucket
    pub company_size: String,
    /// Company address
    pub company_address: String,
    /// Account role
    pub role: UserRole,
    /// Account status
    pub status: UserStatus,
    /// When the account was created
    pub registration_date: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            company_name: user.company_name.clone(),
            industry: user.industry.clone(),
            company_size: user.company_size.clone(),
            company_address: user.company_address.clone(),
            role: user.role,
            status: user.status,
            registration_date: user.registration_date,
        }
    }
}

/// The user fields embedded in booth and booking responses
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Document key
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Sign-in email
    pub email: String,
    /// Company
    pub company_name: String,
    /// Contact phone
    pub phone: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            company_name: user.company_name.clone(),
            phone: user.phone.clone(),
        }
    }
}

/// A booth with derived labels and its exhibitor populated
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoothView {
    /// Document key
    #[serde(rename = "_id")]
    pub id: BoothId,
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
    /// Availability
    pub status: BoothStatus,
    /// "Available", "Booked" or "Maintenance"
    pub status_label: &'static str,
    /// CSS class for the status badge
    pub status_class: &'static str,
    /// Amenities
    pub features: Vec<String>,
    /// Description
    pub description: String,
    /// Holding exhibitor
    pub exhibitor: Option<UserSummary>,
    /// Position on the floor plan
    pub coordinates: Option<Coordinates>,
}

impl BoothView {
    /// Render a booth, with its exhibitor already looked up
    #[must_use]
    pub fn new(booth: &Booth, exhibitor: Option<UserSummary>) -> Self {
        Self {
            id: booth.id,
            number: booth.number.clone(),
            event: booth.event.clone(),
            event_id: booth.event_id,
            date: booth.date.clone(),
            location: booth.location.clone(),
            size: booth.size.clone(),
            size_label: booth.size_label.clone(),
            price: booth.price,
            note: booth.note.clone(),
            status: booth.status,
            status_label: booth.status.label(),
            status_class: booth.status.css_class(),
            features: booth.features.clone(),
            description: booth.description.clone(),
            exhibitor,
            coordinates: booth.coordinates,
        }
    }
}

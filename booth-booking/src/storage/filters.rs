//! Query-string filters for list endpoints.
//!
//! Each filter deserialises straight from the query string and is applied as
//! a linear predicate scan over the loaded documents. The value `all` (or an
//! empty string) means the parameter is not set.

use crate::types::{
    Booking, BookingStatus, Booth, Event, EventId, EventStatus, Money, User, UserRole, UserStatus,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::cmp::Ordering;

/// The parameter value, unless missing, empty or `all`
fn selected(value: Option<&String>) -> Option<&str> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// Parse `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` or RFC 3339 as UTC
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| Utc.from_utc_datetime(&datetime))
}

// ============================================================================
// Booths
// ============================================================================

/// Filters of the public booth list
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoothFilter {
    /// Booth status wire name
    pub status: Option<String>,
    /// Event reference; takes precedence over `event`
    pub event_id: Option<String>,
    /// Event name
    pub event: Option<String>,
    /// Hall
    pub location: Option<String>,
    /// Size bucket
    pub size: Option<String>,
    /// Highest price in dollars
    pub max_price: Option<String>,
}

impl BoothFilter {
    /// Whether a booth passes every set filter
    ///
    /// An `eventId` that is not a valid id matches nothing. A `maxPrice`
    /// that is not a number is ignored.
    #[must_use]
    pub fn matches(&self, booth: &Booth) -> bool {
        if let Some(status) = selected(self.status.as_ref()) {
            if !booth.status.as_str().eq_ignore_ascii_case(status) {
                return false;
            }
        }

        if let Some(event_id) = selected(self.event_id.as_ref()) {
            match event_id.parse::<EventId>() {
                Ok(id) if booth.event_id == Some(id) => {},
                _ => return false,
            }
        } else if let Some(event) = selected(self.event.as_ref()) {
            if booth.event != event {
                return false;
            }
        }

        if let Some(location) = selected(self.location.as_ref()) {
            if booth.location != location {
                return false;
            }
        }

        if let Some(size) = selected(self.size.as_ref()) {
            if booth.size != size {
                return false;
            }
        }

        if let Some(max) = self.max_price() {
            if booth.price > max {
                return false;
            }
        }

        true
    }

    fn max_price(&self) -> Option<Money> {
        selected(self.max_price.as_ref())
            .and_then(|value| value.parse::<f64>().ok())
            .and_then(Money::from_dollars_f64)
    }
}

/// Filters of the admin booth table
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AdminBoothFilter {
    /// Event name
    pub event: Option<String>,
    /// Hall (booth location)
    pub hall: Option<String>,
    /// Status label, compared case-insensitively ("Booked", "available")
    pub status: Option<String>,
}

impl AdminBoothFilter {
    /// Whether a booth passes every set filter
    #[must_use]
    pub fn matches(&self, booth: &Booth) -> bool {
        if let Some(event) = selected(self.event.as_ref()) {
            if booth.event != event {
                return false;
            }
        }
        if let Some(hall) = selected(self.hall.as_ref()) {
            if booth.location != hall {
                return false;
            }
        }
        if let Some(status) = selected(self.status.as_ref()) {
            if !booth.status.label().eq_ignore_ascii_case(status) {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// Events
// ============================================================================

/// Sortable event fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventSortField {
    /// Title
    Name,
    /// Opening time
    StartDate,
    /// Closing time
    EndDate,
    /// Creation time
    CreatedAt,
    /// Booth capacity
    MaxBooths,
    /// Lifecycle status
    Status,
}

impl EventSortField {
    fn parse(field: &str) -> Self {
        match field.trim() {
            "name" => Self::Name,
            "endDate" => Self::EndDate,
            "createdAt" => Self::CreatedAt,
            "maxBooths" => Self::MaxBooths,
            "status" => Self::Status,
            _ => Self::StartDate,
        }
    }

    fn compare(self, a: &Event, b: &Event) -> Ordering {
        match self {
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::StartDate => a.start_date.cmp(&b.start_date),
            Self::EndDate => a.end_date.cmp(&b.end_date),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::MaxBooths => a.max_booths.cmp(&b.max_booths),
            Self::Status => a.status.as_str().cmp(b.status.as_str()),
        }
    }
}

/// Event list query
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventQuery {
    /// Case-insensitive text searched in name, description and venue
    pub q: Option<String>,
    /// Event status wire name
    pub status: Option<String>,
    /// Earliest start date
    pub from: Option<String>,
    /// Latest end date
    pub to: Option<String>,
    /// `field:asc` or `field:desc`
    pub sort: Option<String>,
}

impl EventQuery {
    /// Whether an event passes every set filter
    ///
    /// Unparsable dates are ignored; an unknown status matches nothing.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(status) = selected(self.status.as_ref()) {
            match status.parse::<EventStatus>() {
                Ok(status) if event.status == status => {},
                _ => return false,
            }
        }

        if let Some(from) = self.from.as_deref().and_then(parse_date) {
            if event.start_date < from {
                return false;
            }
        }
        if let Some(to) = self.to.as_deref().and_then(parse_date) {
            if event.end_date > to {
                return false;
            }
        }

        if let Some(needle) = self
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
        {
            let needle = needle.to_lowercase();
            let found = [&event.name, &event.description, &event.venue]
                .iter()
                .any(|text| text.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }

        true
    }

    /// Sort field and whether the order is descending
    #[must_use]
    pub fn sort_order(&self) -> (EventSortField, bool) {
        match self.sort.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(sort) => {
                let (field, direction) = sort.split_once(':').unwrap_or((sort, "asc"));
                (
                    EventSortField::parse(field),
                    direction.trim().eq_ignore_ascii_case("desc"),
                )
            },
            None => (EventSortField::StartDate, false),
        }
    }

    /// Filter and sort events
    #[must_use]
    pub fn apply(&self, events: Vec<Event>) -> Vec<Event> {
        let mut events: Vec<Event> = events.into_iter().filter(|e| self.matches(e)).collect();
        let (field, descending) = self.sort_order();
        events.sort_by(|a, b| {
            let ordering = field.compare(a, b);
            if descending { ordering.reverse() } else { ordering }
        });
        events
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Booking list orders
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BookingSort {
    /// Most recently booked first
    #[default]
    Newest,
    /// Least recently booked first
    Oldest,
    /// Most expensive first
    HighestPrice,
    /// Cheapest first
    LowestPrice,
}

impl BookingSort {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("oldest") => Self::Oldest,
            Some("highestPrice") => Self::HighestPrice,
            Some("lowestPrice") => Self::LowestPrice,
            _ => Self::Newest,
        }
    }
}

/// Booking list query, shared by the exhibitor and admin lists
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingQuery {
    /// Booking status wire name
    pub status: Option<String>,
    /// Event name
    pub event_name: Option<String>,
    /// `newest`, `oldest`, `highestPrice` or `lowestPrice`
    pub sort: Option<String>,
}

impl BookingQuery {
    /// Whether a booking passes every set filter
    #[must_use]
    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(status) = selected(self.status.as_ref()) {
            match status.parse::<BookingStatus>() {
                Ok(status) if booking.status == status => {},
                _ => return false,
            }
        }
        if let Some(event_name) = selected(self.event_name.as_ref()) {
            if booking.event_name != event_name {
                return false;
            }
        }
        true
    }

    /// Requested order
    #[must_use]
    pub fn sort(&self) -> BookingSort {
        BookingSort::parse(self.sort.as_deref())
    }

    /// Filter and sort bookings
    #[must_use]
    pub fn apply<'a, I>(&self, bookings: I) -> Vec<&'a Booking>
    where
        I: IntoIterator<Item = &'a Booking>,
    {
        let mut bookings: Vec<&Booking> =
            bookings.into_iter().filter(|b| self.matches(b)).collect();
        match self.sort() {
            BookingSort::Newest => bookings.sort_by(|a, b| b.booking_date.cmp(&a.booking_date)),
            BookingSort::Oldest => bookings.sort_by(|a, b| a.booking_date.cmp(&b.booking_date)),
            BookingSort::HighestPrice => {
                bookings.sort_by(|a, b| b.total_price.cmp(&a.total_price));
            },
            BookingSort::LowestPrice => {
                bookings.sort_by(|a, b| a.total_price.cmp(&b.total_price));
            },
        }
        bookings
    }
}

// ============================================================================
// Exhibitors
// ============================================================================

/// Exhibitor list orders
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExhibitorSort {
    /// First name, A to Z
    #[default]
    Name,
    /// First name, Z to A
    NameDesc,
    /// Most bookings first
    MostBookings,
    /// Highest spend first
    HighestRevenue,
}

impl ExhibitorSort {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("nameDesc") => Self::NameDesc,
            Some("mostBookings") => Self::MostBookings,
            Some("highestRevenue") => Self::HighestRevenue,
            _ => Self::Name,
        }
    }
}

/// Exhibitor list query
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExhibitorQuery {
    /// Industry, exact
    pub industry: Option<String>,
    /// Account status wire name
    pub status: Option<String>,
    /// `name`, `nameDesc`, `mostBookings` or `highestRevenue`
    pub sort: Option<String>,
}

impl ExhibitorQuery {
    /// Whether an account is an exhibitor passing every set filter
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        if user.role != UserRole::Exhibitor {
            return false;
        }
        if let Some(industry) = selected(self.industry.as_ref()) {
            if user.industry != industry {
                return false;
            }
        }
        if let Some(status) = selected(self.status.as_ref()) {
            match status.parse::<UserStatus>() {
                Ok(status) if user.status == status => {},
                _ => return false,
            }
        }
        true
    }

    /// Requested order
    #[must_use]
    pub fn sort(&self) -> ExhibitorSort {
        ExhibitorSort::parse(self.sort.as_deref())
    }
}

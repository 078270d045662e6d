//! Event management API endpoints.
//!
//! - GET /api/events - List events with search, filters and sort
//! - GET /api/events/:id - Get event details
//! - POST /api/events - Create an event (admin)
//! - PUT /api/events/:id - Update an event (admin)
//! - DELETE /api/events/:id - Delete an event (admin)

use super::{SuccessResponse, parse_id};
use crate::auth::RequireAdmin;
use crate::server::state::AppState;
use crate::storage::filters::{EventQuery, parse_date};
use crate::types::{Event, EventId, EventStatus, Money};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use boothbook_core::environment::Clock;
use boothbook_web::{AppError, WebResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Event form, as sent by the admin console.
///
/// Every field is optional so the same form serves create and update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventForm {
    /// Event name
    pub title: Option<String>,
    /// Opening day, `YYYY-MM-DD`
    pub date: Option<String>,
    /// Opening time, `HH:MM` (midnight when absent)
    pub time: Option<String>,
    /// Closing time; the opening time when absent
    pub end_date: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Venue name
    pub venue: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// City; preferred over the address as the event location
    pub city: Option<String>,
    /// Booth capacity, number or numeric string
    pub total_booths: Option<Value>,
    /// Base booth price in dollars, number or numeric string
    pub booth_price: Option<Value>,
    /// Offered booth sizes
    pub booth_sizes: Option<Vec<String>>,
    /// Pricing tiers, free text
    pub price_tiers: Option<String>,
    /// Lifecycle status
    pub status: Option<String>,
    /// Whether exhibitors can book
    pub registration_open: Option<bool>,
    /// Banner image
    pub image_url: Option<String>,
}

/// Event list response
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    /// Matching events, in the requested order
    pub events: Vec<Event>,
}

/// Response to create and update
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// Always true
    pub success: bool,
    /// Human message
    pub message: &'static str,
    /// The stored event
    pub event: Event,
}

// ============================================================================
// Form parsing
// ============================================================================

fn opening_time(date: &str, time: Option<&str>) -> WebResult<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::bad_request("Invalid event date"))?;
    let time = match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(time) => NaiveTime::parse_from_str(time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
            .map_err(|_| AppError::bad_request("Invalid event time"))?,
        None => NaiveTime::MIN,
    };
    Ok(day.and_time(time).and_utc())
}

/// A count given as a number or a numeric string; anything else is zero
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped
fn as_count(value: &Value) -> u32 {
    let count = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    count
        .filter(|n| n.is_finite() && *n > 0.0)
        .map_or(0, |n| n.min(f64::from(u32::MAX)) as u32)
}

/// A dollar amount given as a number or a numeric string
fn as_money(value: &Value) -> WebResult<Option<Money>> {
    let dollars = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    dollars
        .and_then(Money::from_dollars_f64)
        .map(Some)
        .ok_or_else(|| AppError::bad_request("Invalid booth price"))
}

fn parse_status(value: &str) -> WebResult<EventStatus> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request(format!("Invalid event status: {value}")))
}

impl EventForm {
    /// Apply every given field to `event`
    fn apply_to(&self, event: &mut Event) -> WebResult<()> {
        if let Some(title) = &self.title {
            event.name = title.trim().to_string();
        }
        if let Some(date) = self.date.as_deref().filter(|d| !d.trim().is_empty()) {
            event.start_date = opening_time(date, self.time.as_deref())?;
            event.end_date = event.start_date;
        }
        if let Some(end) = self.end_date.as_deref().filter(|d| !d.trim().is_empty()) {
            event.end_date =
                parse_date(end).ok_or_else(|| AppError::bad_request("Invalid end date"))?;
        }
        if event.end_date < event.start_date {
            return Err(AppError::bad_request(
                "End date cannot be before the start date",
            ));
        }
        if let Some(description) = &self.description {
            event.description.clone_from(description);
        }
        if let Some(venue) = &self.venue {
            event.venue.clone_from(venue);
        }
        let city = self.city.as_deref().filter(|c| !c.trim().is_empty());
        let address = self.address.as_deref().filter(|a| !a.trim().is_empty());
        if let Some(location) = city.or(address) {
            event.location = location.to_string();
        }
        if let Some(total) = &self.total_booths {
            event.max_booths = as_count(total);
        }
        if let Some(price) = &self.booth_price {
            event.booth_price = as_money(price)?;
        }
        if let Some(sizes) = &self.booth_sizes {
            event.booth_sizes.clone_from(sizes);
        }
        if let Some(tiers) = &self.price_tiers {
            event.price_tiers.clone_from(tiers);
        }
        if let Some(status) = &self.status {
            event.status = parse_status(status)?;
        }
        if let Some(open) = self.registration_open {
            event.registration_open = open;
        }
        if let Some(image_url) = &self.image_url {
            event.image_url.clone_from(image_url);
        }
        Ok(())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List events.
///
/// # Endpoint
///
/// ```text
/// GET /api/events?q=expo&status=upcoming&from=2025-01-01&sort=name:asc
/// ```
///
/// # Errors
///
/// Returns 500 if events cannot be loaded.
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> WebResult<Json<EventsResponse>> {
    let events = state.repositories.events.list().await?;
    Ok(Json(EventsResponse {
        events: query.apply(events),
    }))
}

/// Get one event.
///
/// # Errors
///
/// Returns 404 "Event not found" for unknown or malformed ids.
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<Event>> {
    let id: EventId = parse_id(&id, "Event")?;
    let event = state
        .repositories
        .events
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Event"))?;
    Ok(Json(event))
}

/// Create an event.
///
/// # Errors
///
/// - 400 "Title and date are required" if either is missing
/// - 400 for unparsable dates, prices or statuses
pub async fn create_event(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(form): Json<EventForm>,
) -> WebResult<(StatusCode, Json<EventResponse>)> {
    let has_title = form.title.as_deref().is_some_and(|t| !t.trim().is_empty());
    let has_date = form.date.as_deref().is_some_and(|d| !d.trim().is_empty());
    if !has_title || !has_date {
        return Err(AppError::bad_request("Title and date are required"));
    }

    let now = state.clock.now();
    let mut event = Event {
        id: EventId::new(),
        name: String::new(),
        start_date: now,
        end_date: now,
        location: String::new(),
        venue: String::new(),
        description: String::new(),
        status: EventStatus::Draft,
        max_booths: 100,
        booth_price: None,
        booth_sizes: Vec::new(),
        price_tiers: String::new(),
        registration_open: false,
        image_url: String::new(),
        created_at: now,
    };
    form.apply_to(&mut event)?;

    state.repositories.events.save(&event).await?;
    tracing::info!(event_id = %event.id, admin = %admin.user_id, "Event created");

    Ok((
        StatusCode::CREATED,
        Json(EventResponse {
            success: true,
            message: "Event created successfully",
            event,
        }),
    ))
}

/// Update an event; only the given fields change.
///
/// # Errors
///
/// - 404 "Event not found"
/// - 400 for unparsable dates, prices or statuses
pub async fn update_event(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<EventForm>,
) -> WebResult<Json<EventResponse>> {
    let id: EventId = parse_id(&id, "Event")?;
    let mut event = state
        .repositories
        .events
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Event"))?;

    form.apply_to(&mut event)?;
    state.repositories.events.save(&event).await?;
    tracing::info!(event_id = %event.id, admin = %admin.user_id, "Event updated");

    Ok(Json(EventResponse {
        success: true,
        message: "Event updated successfully",
        event,
    }))
}

/// Delete an event.
///
/// # Errors
///
/// Returns 404 "Event not found".
pub async fn delete_event(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<SuccessResponse>> {
    let id: EventId = parse_id(&id, "Event")?;
    if !state.repositories.events.delete(id).await? {
        return Err(AppError::not_found("Event"));
    }
    tracing::info!(event_id = %id, admin = %admin.user_id, "Event deleted");
    Ok(Json(SuccessResponse::new("Event deleted successfully")))
}

//! Booking API endpoints.
//!
//! - GET /api/bookings - The signed-in exhibitor's bookings
//! - POST /api/bookings/quote - Price a set of booths
//! - GET /api/bookings/:id - One booking (owner or admin)
//! - POST /api/bookings - Book a booth
//! - PATCH /api/bookings/:id/cancel - Cancel one's own booking
//! - PUT /api/bookings/:id - Change contact details (owner or admin)
//! - DELETE /api/bookings/:id - Delete a booking (owner or admin)
//!
//! Every write is a ledger command, so a booth can only ever be held by one
//! active booking.

use super::{MessageResponse, booth_views, parse_id, user_summaries};
use crate::aggregates::{BookingDetails, LedgerAction};
use crate::auth::AuthUser;
use crate::pricing::Quote;
use crate::server::state::AppState;
use crate::storage::filters::BookingQuery;
use crate::types::{
    Booking, BookingId, BookingStatus, BoothId, BoothView, Money, UserProfile, UserSummary,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use boothbook_web::{AppError, CorrelationId, WebResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// Views
// ============================================================================

/// A booking as listed to its exhibitor, with display fallbacks applied
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListItem {
    /// Document key
    #[serde(rename = "_id")]
    pub id: BookingId,
    /// Booth number
    pub booth_number: String,
    /// Booth key
    pub booth_id: BoothId,
    /// Event name
    pub event_name: String,
    /// Event date text
    pub event_date: String,
    /// Venue
    pub venue: String,
    /// Location
    pub location: String,
    /// Price
    pub total_price: Money,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Company
    pub company_name: String,
    /// Contact person
    pub contact_person: String,
    /// Contact email
    pub contact_email: String,
    /// Contact phone
    pub contact_phone: String,
    /// Free-form requests
    pub special_requests: String,
    /// When the booking was made
    pub created_at: DateTime<Utc>,
    /// Last change, when confirmed
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// A booking with its booth and exhibitor populated
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetail {
    /// The stored booking
    #[serde(flatten)]
    pub booking: Booking,
    /// The booked booth, if it still exists
    pub booth: Option<BoothView>,
    /// The booking exhibitor, if the account still exists
    pub user: Option<UserSummary>,
}

/// The first non-empty value, else `default`
fn fallback(values: &[&str], default: &str) -> String {
    values
        .iter()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}

impl BookingListItem {
    /// Format a booking for the exhibitor's list
    #[must_use]
    pub fn new(booking: &Booking, booth_location: Option<&str>, user: Option<&UserSummary>) -> Self {
        let location = booth_location.unwrap_or_default();
        let (company, email, phone, person) = user.map_or_else(Default::default, |user| {
            (
                user.company_name.as_str(),
                user.email.as_str(),
                user.phone.as_str(),
                format!("{} {}", user.first_name, user.last_name),
            )
        });

        Self {
            id: booking.id,
            booth_number: fallback(&[&booking.booth_number], "N/A"),
            booth_id: booking.booth_id,
            event_name: fallback(&[&booking.event_name], "N/A"),
            event_date: fallback(&[&booking.event_date], "Date TBD"),
            venue: fallback(&[&booking.venue, location], "Venue TBD"),
            location: fallback(&[&booking.location, location], "Location TBD"),
            total_price: booking.total_price,
            status: booking.status,
            company_name: fallback(&[&booking.company_name, company], "N/A"),
            contact_person: fallback(&[&booking.contact_person, &person], "N/A"),
            contact_email: fallback(&[&booking.contact_email, email], "N/A"),
            contact_phone: fallback(&[&booking.contact_phone, phone], "N/A"),
            special_requests: booking.special_requests.clone(),
            created_at: booking.booking_date,
            confirmed_at: (booking.status == BookingStatus::Confirmed)
                .then_some(booking.updated_at),
        }
    }
}

/// Populate bookings with their booths and exhibitors
pub(crate) async fn booking_details(
    state: &AppState,
    bookings: Vec<Booking>,
) -> WebResult<Vec<BookingDetail>> {
    let booth_ids: Vec<BoothId> = bookings.iter().map(|b| b.booth_id).collect();
    let booths = state
        .ledger
        .read(|ledger| {
            booth_ids
                .iter()
                .filter_map(|id| ledger.booth(*id).cloned())
                .collect::<Vec<_>>()
        })
        .await;
    let booths: HashMap<BoothId, BoothView> = booth_views(state, &booths)
        .await?
        .into_iter()
        .map(|view| (view.id, view))
        .collect();
    let users = user_summaries(state, bookings.iter().map(|b| b.user_id).collect()).await?;

    Ok(bookings
        .into_iter()
        .map(|booking| BookingDetail {
            booth: booths.get(&booking.booth_id).cloned(),
            user: users.get(&booking.user_id).cloned(),
            booking,
        })
        .collect())
}

/// Populate one booking
pub(crate) async fn booking_detail(state: &AppState, booking: Booking) -> WebResult<BookingDetail> {
    booking_details(state, vec![booking])
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Failed to render booking"))
}

/// A booking from ledger state
pub(crate) async fn load_booking(state: &AppState, id: BookingId) -> WebResult<Booking> {
    state
        .ledger
        .read(|ledger| ledger.booking(id).cloned())
        .await
        .ok_or_else(|| AppError::not_found("Booking"))
}

/// A dollar amount given as a number or a numeric string
pub(crate) fn parse_amount(value: Option<&Value>) -> Option<Money> {
    let dollars = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    Money::from_dollars_f64(dollars)
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Booking form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Booth key or booth number
    #[serde(default)]
    pub booth_id: Option<String>,
    /// Agreed price in dollars
    #[serde(default)]
    pub total_price: Option<Value>,
    /// Contact and display fields
    #[serde(flatten)]
    pub details: BookingDetails,
}

/// Response to a new booking
#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    /// Always true
    pub success: bool,
    /// The new booking
    pub booking: BookingListItem,
}

/// Booking list response
#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    /// Always true
    pub success: bool,
    /// Matching bookings, in the requested order
    pub bookings: Vec<BookingListItem>,
}

/// Response to a cancellation
#[derive(Debug, Serialize)]
pub struct CancelBookingResponse {
    /// Human message
    pub message: &'static str,
    /// The cancelled booking
    pub booking: Booking,
}

/// Quote request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteRequest {
    /// Booth keys or booth numbers
    pub booth_ids: Vec<String>,
}

/// Price breakdown for a set of booths
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    /// The priced booths
    pub booths: Vec<BoothView>,
    /// Sum of booth prices
    pub subtotal: Money,
    /// Tax on the subtotal
    pub tax: Money,
    /// Subtotal plus tax
    pub total: Money,
}

// ============================================================================
// Handlers
// ============================================================================

/// List the signed-in exhibitor's bookings.
///
/// # Errors
///
/// Returns 500 if accounts cannot be loaded.
pub async fn list_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingQuery>,
) -> WebResult<Json<BookingListResponse>> {
    let (bookings, locations) = state
        .ledger
        .read(|ledger| {
            let own = query.apply(ledger.bookings().filter(|b| b.user_id == user.user_id));
            let locations: HashMap<BoothId, String> = own
                .iter()
                .filter_map(|b| ledger.booth(b.booth_id))
                .map(|booth| (booth.id, booth.location.clone()))
                .collect();
            (own.into_iter().cloned().collect::<Vec<_>>(), locations)
        })
        .await;

    let account = state
        .repositories
        .users
        .get(user.user_id)
        .await?
        .map(|account| UserSummary::from(&account));

    let bookings = bookings
        .iter()
        .map(|booking| {
            BookingListItem::new(
                booking,
                locations.get(&booking.booth_id).map(String::as_str),
                account.as_ref(),
            )
        })
        .collect();

    Ok(Json(BookingListResponse {
        success: true,
        bookings,
    }))
}

/// Price a set of booths: subtotal, 10 % tax and total.
///
/// # Errors
///
/// - 400 if no booth is given
/// - 404 if a booth does not exist
pub async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> WebResult<Json<QuoteResponse>> {
    if request.booth_ids.is_empty() {
        return Err(AppError::bad_request("At least one booth is required"));
    }

    let mut booths = Vec::with_capacity(request.booth_ids.len());
    for key in &request.booth_ids {
        booths.push(state.ledger.find_booth(key).await?);
    }

    let quote = Quote::for_prices(booths.iter().map(|booth| booth.price));
    Ok(Json(QuoteResponse {
        booths: booth_views(&state, &booths).await?,
        subtotal: quote.subtotal,
        tax: quote.tax,
        total: quote.total,
    }))
}

/// Get one booking with its booth and exhibitor.
///
/// # Errors
///
/// - 404 "Booking not found"
/// - 403 unless the requester owns the booking or is an administrator
pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> WebResult<Json<BookingDetail>> {
    let booking = load_booking(&state, parse_id(&id, "Booking")?).await?;
    user.ensure_owner_or_admin(booking.user_id, "Not authorized to view this booking")?;
    Ok(Json(booking_detail(&state, booking).await?))
}

/// Book a booth.
///
/// Contact and display fields default to the exhibitor's profile and the
/// booth. The booking is confirmed immediately and the booth marked booked.
///
/// # Errors
///
/// - 400 "Booth ID is required" / "Valid total price is required"
/// - 404 "Booth not found"
/// - 400 "This booth is already booked" or "This booth is under maintenance"
/// - 409 while another write to the booth is in flight
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    correlation_id: CorrelationId,
    Json(request): Json<CreateBookingRequest>,
) -> WebResult<(StatusCode, Json<CreateBookingResponse>)> {
    let Some(booth_key) = request
        .booth_id
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
    else {
        return Err(AppError::bad_request("Booth ID is required"));
    };
    let total_price = parse_amount(request.total_price.as_ref())
        .filter(|price| !price.is_zero())
        .ok_or_else(|| AppError::bad_request("Valid total price is required"))?;

    let account = state
        .repositories
        .users
        .get(user.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    let booth = state.ledger.find_booth(booth_key).await?;

    let booking_id = BookingId::new();
    let change = state
        .ledger
        .dispatch(LedgerAction::PlaceBooking {
            correlation_id: correlation_id.0,
            booking_id,
            booth_id: booth.id,
            total_price,
            details: request.details,
            requester: UserProfile::from(&account),
        })
        .await?;

    let booking = change
        .booking(booking_id)
        .ok_or_else(|| AppError::internal("Booking was not recorded"))?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        booking_id = %booking.id,
        booth = %booth.number,
        user_id = %user.user_id,
        "Booking placed"
    );
    metrics::counter!("bookings.placed").increment(1);

    let summary = UserSummary::from(&account);
    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            success: true,
            booking: BookingListItem::new(booking, Some(&booth.location), Some(&summary)),
        }),
    ))
}

/// Cancel one's own booking and release its booth.
///
/// # Errors
///
/// - 404 "Booking not found"
/// - 403 "Can only cancel your own bookings"
/// - 400 if already cancelled
pub async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    correlation_id: CorrelationId,
    Path(id): Path<String>,
) -> WebResult<Json<CancelBookingResponse>> {
    let booking_id: BookingId = parse_id(&id, "Booking")?;
    let change = state
        .ledger
        .dispatch(LedgerAction::CancelBooking {
            correlation_id: correlation_id.0,
            booking_id,
            requester: user.requester(),
        })
        .await?;

    let booking = change
        .booking(booking_id)
        .cloned()
        .ok_or_else(|| AppError::internal("Booking was not recorded"))?;

    tracing::info!(correlation_id = %correlation_id.0, booking_id = %booking_id, "Booking cancelled");

    Ok(Json(CancelBookingResponse {
        message: "Booking cancelled successfully",
        booking,
    }))
}

/// Change a booking's contact and display fields.
///
/// # Errors
///
/// - 404 "Booking not found"
/// - 403 unless the requester owns the booking or is an administrator
pub async fn update_booking(
    State(state): State<AppState>,
    user: AuthUser,
    correlation_id: CorrelationId,
    Path(id): Path<String>,
    Json(details): Json<BookingDetails>,
) -> WebResult<Json<BookingDetail>> {
    let booking_id: BookingId = parse_id(&id, "Booking")?;
    let change = state
        .ledger
        .dispatch(LedgerAction::ReviseBooking {
            correlation_id: correlation_id.0,
            booking_id,
            requester: user.requester(),
            details,
        })
        .await?;

    let booking = change
        .booking(booking_id)
        .cloned()
        .ok_or_else(|| AppError::internal("Booking was not recorded"))?;
    Ok(Json(booking_detail(&state, booking).await?))
}

/// Delete a booking, releasing its booth if it held it.
///
/// # Errors
///
/// - 404 "Booking not found"
/// - 403 unless the requester owns the booking or is an administrator
pub async fn delete_booking(
    State(state): State<AppState>,
    user: AuthUser,
    correlation_id: CorrelationId,
    Path(id): Path<String>,
) -> WebResult<Json<MessageResponse>> {
    let booking_id: BookingId = parse_id(&id, "Booking")?;
    state
        .ledger
        .dispatch(LedgerAction::DeleteBooking {
            correlation_id: correlation_id.0,
            booking_id,
            requester: user.requester(),
        })
        .await?;

    tracing::info!(correlation_id = %correlation_id.0, booking_id = %booking_id, "Booking deleted");

    Ok(Json(MessageResponse {
        message: "Booking cancelled successfully",
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use serde_json::json;

    fn booking(status: BookingStatus) -> Booking {
        let booked_at = Utc::now();
        Booking {
            id: BookingId::new(),
            booth_id: BoothId::new(),
            user_id: UserId::new(),
            company_name: String::new(),
            contact_person: String::new(),
            contact_email: "ada@example.com".to_string(),
            contact_phone: String::new(),
            special_requests: String::new(),
            total_price: Money::from_cents(99_00),
            status,
            booking_date: booked_at,
            event_name: String::new(),
            booth_number: "A-1".to_string(),
            event_date: String::new(),
            venue: String::new(),
            location: String::new(),
            created_at: booked_at,
            updated_at: booked_at,
        }
    }

    fn summary() -> UserSummary {
        UserSummary {
            id: UserId::new(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "profile@example.com".to_string(),
            company_name: "Engines Ltd".to_string(),
            phone: String::new(),
        }
    }

    #[test]
    fn list_item_applies_fallbacks() {
        let item = BookingListItem::new(
            &booking(BookingStatus::Pending),
            Some("Hall 2"),
            Some(&summary()),
        );

        assert_eq!(item.booth_number, "A-1");
        assert_eq!(item.event_name, "N/A");
        assert_eq!(item.event_date, "Date TBD");
        assert_eq!(item.venue, "Hall 2");
        assert_eq!(item.location, "Hall 2");
        assert_eq!(item.company_name, "Engines Ltd");
        assert_eq!(item.contact_person, "Ada Lovelace");
        assert_eq!(item.contact_email, "ada@example.com");
        assert_eq!(item.contact_phone, "N/A");
        assert_eq!(item.confirmed_at, None);
    }

    #[test]
    fn list_item_without_booth_or_user() {
        let confirmed = booking(BookingStatus::Confirmed);
        let item = BookingListItem::new(&confirmed, None, None);

        assert_eq!(item.venue, "Venue TBD");
        assert_eq!(item.location, "Location TBD");
        assert_eq!(item.contact_person, "N/A");
        assert_eq!(item.confirmed_at, Some(confirmed.updated_at));
    }

    #[test]
    fn detail_flattens_the_booking() {
        let detail = BookingDetail {
            booking: booking(BookingStatus::Confirmed),
            booth: None,
            user: Some(summary()),
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["boothNumber"], "A-1");
        assert_eq!(json["user"]["firstName"], "Ada");
        assert!(json["booth"].is_null());
    }

    #[test]
    fn amounts_accept_numbers_and_strings() {
        assert_eq!(
            parse_amount(Some(&json!(1500))),
            Some(Money::from_cents(150_000))
        );
        assert_eq!(
            parse_amount(Some(&json!("12.5"))),
            Some(Money::from_cents(1_250))
        );
        assert_eq!(parse_amount(Some(&json!(-1))), None);
        assert_eq!(parse_amount(Some(&json!("abc"))), None);
        assert_eq!(parse_amount(None), None);
    }

    #[test]
    fn booking_form_reads_details_alongside_booth() {
        let request: CreateBookingRequest = serde_json::from_value(json!({
            "boothId": "A-1",
            "totalPrice": 1500,
            "companyName": "Engines Ltd",
            "specialRequests": "Power outlet"
        }))
        .unwrap();

        assert_eq!(request.booth_id.as_deref(), Some("A-1"));
        assert_eq!(request.details.company_name.as_deref(), Some("Engines Ltd"));
        assert_eq!(
            request.details.special_requests.as_deref(),
            Some("Power outlet")
        );
    }
}

//! Admin API endpoints.
//!
//! Booth management, booking moderation and the dashboard figures. Every
//! route requires an administrator token.

use super::bookings::{BookingDetail, booking_detail, booking_details};
use super::booths::{BoothStats, register_booth, remove_booth, revise_booth};
use super::{MessageResponse, SuccessResponse, booth_view, booth_views, parse_id, sort_booths};
use crate::aggregates::{BoothDraft, BoothPatch, LedgerAction};
use crate::auth::RequireAdmin;
use crate::server::state::AppState;
use crate::storage::filters::{AdminBoothFilter, BookingQuery};
use crate::types::{Booking, BookingId, BookingStatus, BoothView, Money};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use boothbook_core::environment::Clock;
use boothbook_web::{AppError, CorrelationId, WebResult};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default span of the revenue chart
pub const DEFAULT_TREND_MONTHS: u32 = 6;

/// Longest span of the revenue chart
pub const MAX_TREND_MONTHS: u32 = 24;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Admin booth list response
#[derive(Debug, Serialize)]
pub struct AdminBoothsResponse {
    /// Always true
    pub success: bool,
    /// Matching booths
    pub booths: Vec<BoothView>,
}

/// Response to an admin booth write
#[derive(Debug, Serialize)]
pub struct AdminBoothResponse {
    /// Always true
    pub success: bool,
    /// The booth as stored
    pub booth: BoothView,
}

/// Auto-layout request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AutoLayoutRequest {
    /// Only lay out booths of this event
    pub event: Option<String>,
}

/// Admin booking list response
#[derive(Debug, Serialize)]
pub struct AdminBookingsResponse {
    /// Matching bookings, populated
    pub bookings: Vec<BookingDetail>,
}

/// Booking status change
#[derive(Debug, Clone, Deserialize)]
pub struct BookingStatusRequest {
    /// New status wire name
    pub status: Option<String>,
}

/// Response to a booking status change
#[derive(Debug, Serialize)]
pub struct BookingStatusResponse {
    /// Human message
    pub message: &'static str,
    /// The updated booking
    pub booking: BookingDetail,
}

/// Dashboard figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    /// Booth counts
    #[serde(flatten)]
    pub booths: BoothStats,
    /// Bookings awaiting confirmation
    pub pending_approvals: usize,
    /// Total of active bookings
    pub total_revenue: Money,
}

/// Revenue chart query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendQuery {
    /// Number of months, ending with the current one
    pub months: Option<String>,
}

impl TrendQuery {
    /// Requested span, clamped to `1..=24`; six when absent or unreadable
    #[must_use]
    pub fn months(&self) -> u32 {
        self.months
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .map_or(DEFAULT_TREND_MONTHS, |months| {
                months.clamp(1, MAX_TREND_MONTHS)
            })
    }
}

/// Revenue booked in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenuePoint {
    /// Month label, e.g. "Jan 2025"
    pub month: String,
    /// Total of active bookings made that month
    pub amount: Money,
}

/// Revenue chart response
#[derive(Debug, Serialize)]
pub struct RevenueTrendsResponse {
    /// Oldest month first
    pub trends: Vec<RevenuePoint>,
}

/// Active-booking revenue per calendar month, for the `months` months
/// ending with the month of `now`
pub fn revenue_trends<'a, I>(bookings: I, now: DateTime<Utc>, months: u32) -> Vec<RevenuePoint>
where
    I: IntoIterator<Item = &'a Booking>,
{
    let Some(current) = NaiveDate::from_ymd_opt(now.year(), now.month(), 1) else {
        return Vec::new();
    };
    let starts: Vec<NaiveDate> = (0..months)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .collect();

    let mut amounts = vec![Money::ZERO; starts.len()];
    for booking in bookings {
        if !booking.status.is_active() {
            continue;
        }
        let booked = booking.booking_date.date_naive();
        let slot = starts
            .iter()
            .position(|start| start.year() == booked.year() && start.month() == booked.month());
        if let Some(slot) = slot {
            amounts[slot] = amounts[slot].saturating_add(booking.total_price);
        }
    }

    starts
        .iter()
        .zip(amounts)
        .map(|(start, amount)| RevenuePoint {
            month: start.format("%b %Y").to_string(),
            amount,
        })
        .collect()
}

// ============================================================================
// Booths
// ============================================================================

/// List booths for the admin table, filtered by event, hall and status.
///
/// # Errors
///
/// Returns 500 if exhibitor accounts cannot be loaded.
pub async fn list_booths(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(filter): Query<AdminBoothFilter>,
) -> WebResult<Json<AdminBoothsResponse>> {
    let mut booths = state
        .ledger
        .read(|ledger| {
            ledger
                .booths()
                .filter(|booth| filter.matches(booth))
                .cloned()
                .collect::<Vec<_>>()
        })
        .await;
    sort_booths(&mut booths);

    Ok(Json(AdminBoothsResponse {
        success: true,
        booths: booth_views(&state, &booths).await?,
    }))
}

/// Create a booth.
///
/// # Errors
///
/// - 400 if the number is missing or the status is `booked`
/// - 409 if the number is already taken
pub async fn create_booth(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    correlation_id: CorrelationId,
    Json(draft): Json<BoothDraft>,
) -> WebResult<(StatusCode, Json<AdminBoothResponse>)> {
    let booth = register_booth(&state, correlation_id.0, draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(AdminBoothResponse {
            success: true,
            booth: booth_view(&state, &booth).await?,
        }),
    ))
}

/// Update a booth.
///
/// # Errors
///
/// - 404 "Booth not found"
/// - 400 if the change would reopen a booked booth
pub async fn update_booth(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    correlation_id: CorrelationId,
    Path(key): Path<String>,
    Json(patch): Json<BoothPatch>,
) -> WebResult<Json<AdminBoothResponse>> {
    let booth = revise_booth(&state, correlation_id.0, &key, patch).await?;
    Ok(Json(AdminBoothResponse {
        success: true,
        booth: booth_view(&state, &booth).await?,
    }))
}

/// Delete a booth.
///
/// # Errors
///
/// - 404 "Booth not found"
/// - 409 while the booth has an active booking
pub async fn delete_booth(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    correlation_id: CorrelationId,
    Path(key): Path<String>,
) -> WebResult<Json<SuccessResponse>> {
    remove_booth(&state, correlation_id.0, &key).await?;
    Ok(Json(SuccessResponse::new("Booth deleted")))
}

/// Give every booth without a position a slot on the floor-plan grid.
///
/// Returns only the booths that were placed.
///
/// # Errors
///
/// Returns 409 while one of those booths is being written.
pub async fn auto_layout(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    correlation_id: CorrelationId,
    body: Option<Json<AutoLayoutRequest>>,
) -> WebResult<Json<AdminBoothsResponse>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let event = request
        .event
        .map(|event| event.trim().to_string())
        .filter(|event| !event.is_empty());

    let change = state
        .ledger
        .dispatch(LedgerAction::AutoLayout {
            correlation_id: correlation_id.0,
            event,
        })
        .await?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        placed = change.booths.len(),
        "Floor plan laid out"
    );

    let mut booths = change.booths;
    sort_booths(&mut booths);
    Ok(Json(AdminBoothsResponse {
        success: true,
        booths: booth_views(&state, &booths).await?,
    }))
}

// ============================================================================
// Bookings
// ============================================================================

/// List every booking, with the same filters and orders as the exhibitor
/// list.
///
/// # Errors
///
/// Returns 500 if accounts cannot be loaded.
pub async fn list_bookings(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<BookingQuery>,
) -> WebResult<Json<AdminBookingsResponse>> {
    let bookings = state
        .ledger
        .read(|ledger| {
            query
                .apply(ledger.bookings())
                .into_iter()
                .cloned()
                .collect::<Vec<_>>()
        })
        .await;

    Ok(Json(AdminBookingsResponse {
        bookings: booking_details(&state, bookings).await?,
    }))
}

/// Set a booking's status. Cancelling releases the booth; reactivating
/// claims it again if it is still free.
///
/// # Errors
///
/// - 400 if the status is missing or unknown
/// - 404 "Booking not found"
/// - 400 if reactivating a booking whose booth was taken meanwhile
pub async fn update_booking_status(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    correlation_id: CorrelationId,
    Path(id): Path<String>,
    Json(request): Json<BookingStatusRequest>,
) -> WebResult<Json<BookingStatusResponse>> {
    let booking_id: BookingId = parse_id(&id, "Booking")?;
    let status: BookingStatus = request
        .status
        .as_deref()
        .map(str::trim)
        .filter(|status| !status.is_empty())
        .ok_or_else(|| AppError::bad_request("Status is required"))?
        .parse()
        .map_err(|_| AppError::bad_request("Invalid booking status"))?;

    let change = state
        .ledger
        .dispatch(LedgerAction::SetBookingStatus {
            correlation_id: correlation_id.0,
            booking_id,
            status,
        })
        .await?;

    let booking = change
        .booking(booking_id)
        .cloned()
        .ok_or_else(|| AppError::internal("Booking was not recorded"))?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        booking_id = %booking_id,
        status = %status,
        "Booking status changed"
    );

    Ok(Json(BookingStatusResponse {
        message: "Booking status updated successfully",
        booking: booking_detail(&state, booking).await?,
    }))
}

/// Delete any booking, releasing its booth.
///
/// # Errors
///
/// Returns 404 "Booking not found".
pub async fn delete_booking(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    correlation_id: CorrelationId,
    Path(id): Path<String>,
) -> WebResult<Json<MessageResponse>> {
    let booking_id: BookingId = parse_id(&id, "Booking")?;
    state
        .ledger
        .dispatch(LedgerAction::DeleteBooking {
            correlation_id: correlation_id.0,
            booking_id,
            requester: admin.requester(),
        })
        .await?;

    Ok(Json(MessageResponse {
        message: "Booking deleted successfully",
    }))
}

// ============================================================================
// Dashboard
// ============================================================================

/// Dashboard figures: booth counts, pending bookings and active revenue.
pub async fn stats(State(state): State<AppState>, _admin: RequireAdmin) -> Json<AdminStats> {
    let stats = state
        .ledger
        .read(|ledger| AdminStats {
            booths: BoothStats::count(ledger.booths()),
            pending_approvals: ledger
                .bookings()
                .filter(|booking| booking.status == BookingStatus::Pending)
                .count(),
            total_revenue: ledger
                .bookings()
                .filter(|booking| booking.status.is_active())
                .map(|booking| booking.total_price)
                .sum(),
        })
        .await;
    Json(stats)
}

/// Monthly revenue of active bookings.
pub async fn revenue(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<TrendQuery>,
) -> Json<RevenueTrendsResponse> {
    let now = state.clock.now();
    let months = query.months();
    let trends = state
        .ledger
        .read(|ledger| revenue_trends(ledger.bookings(), now, months))
        .await;
    Json(RevenueTrendsResponse { trends })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{BoothId, UserId};
    use chrono::TimeZone;

    fn booking(at: DateTime<Utc>, dollars: u64, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(),
            booth_id: BoothId::new(),
            user_id: UserId::new(),
            company_name: String::new(),
            contact_person: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            special_requests: String::new(),
            total_price: Money::from_cents(dollars * 100),
            status,
            booking_date: at,
            event_name: String::new(),
            booth_number: String::new(),
            event_date: String::new(),
            venue: String::new(),
            location: String::new(),
            created_at: at,
            updated_at: at,
        }
    }

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn trends_cover_months_ending_now() {
        let bookings = [
            booking(at(2025, 3, 2), 100, BookingStatus::Confirmed),
            booking(at(2025, 3, 20), 50, BookingStatus::Pending),
            booking(at(2025, 2, 14), 999, BookingStatus::Cancelled),
            booking(at(2024, 12, 31), 70, BookingStatus::Booked),
            booking(at(2024, 6, 1), 10, BookingStatus::Confirmed),
        ];

        let trends = revenue_trends(&bookings, at(2025, 3, 28), 4);

        let months: Vec<&str> = trends.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, ["Dec 2024", "Jan 2025", "Feb 2025", "Mar 2025"]);
        assert_eq!(trends[0].amount, Money::from_cents(70_00));
        assert_eq!(trends[1].amount, Money::ZERO);
        assert_eq!(trends[2].amount, Money::ZERO);
        assert_eq!(trends[3].amount, Money::from_cents(150_00));
    }

    #[test]
    fn trend_months_are_clamped() {
        let query = |months: Option<&str>| TrendQuery {
            months: months.map(str::to_string),
        };

        assert_eq!(query(None).months(), DEFAULT_TREND_MONTHS);
        assert_eq!(query(Some("x")).months(), DEFAULT_TREND_MONTHS);
        assert_eq!(query(Some("0")).months(), 1);
        assert_eq!(query(Some("12")).months(), 12);
        assert_eq!(query(Some("99")).months(), MAX_TREND_MONTHS);
    }

    #[test]
    fn stats_flatten_booth_counts() {
        let stats = AdminStats {
            booths: BoothStats::default(),
            pending_approvals: 2,
            total_revenue: Money::from_cents(1_250_00),
        };

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["totalBooths"], 0);
        assert_eq!(json["pendingApprovals"], 2);
        assert_eq!(json["totalRevenue"], 1250.0);
    }
}

//! Exhibitor API endpoints.
//!
//! Exhibitor accounts joined with their bookings: per-account totals, the
//! two most recent bookings, and an activity timeline on the detail view.

use super::parse_id;
use crate::auth::{AuthUser, RequireAdmin};
use crate::server::state::AppState;
use crate::storage::filters::{ExhibitorQuery, ExhibitorSort};
use crate::types::{
    Booking, BookingStatus, Money, User, UserId, UserProfile, UserRole, UserStatus,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use boothbook_core::environment::Clock;
use boothbook_web::{AppError, WebResult};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Spend above which an exhibitor gets the loyalty milestone
const LOYALTY_THRESHOLD: Money = Money::from_cents(50_000_00);

/// Bookings shown on an exhibitor card
const RECENT_BOOKINGS: usize = 2;

// ============================================================================
// Aggregation
// ============================================================================

/// One of an exhibitor's latest bookings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentBooking {
    /// Event name
    pub event_name: String,
    /// Booth number
    pub booth_id: String,
    /// Date range text
    pub date_range: &'static str,
    /// Price
    pub amount: Money,
}

/// Booking totals of one exhibitor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitorTotals {
    /// Every booking, cancelled included
    pub total_bookings: usize,
    /// Confirmed bookings
    pub active_bookings: usize,
    /// Sum of every booking's price
    pub total_spent: Money,
    /// Latest bookings, newest first
    pub recent_bookings: Vec<RecentBooking>,
}

impl ExhibitorTotals {
    /// Totals over one exhibitor's bookings
    #[must_use]
    pub fn from_bookings(bookings: &[&Booking]) -> Self {
        let mut newest: Vec<&Booking> = bookings.to_vec();
        newest.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));

        Self {
            total_bookings: bookings.len(),
            active_bookings: bookings
                .iter()
                .filter(|booking| booking.status == BookingStatus::Confirmed)
                .count(),
            total_spent: bookings.iter().map(|booking| booking.total_price).sum(),
            recent_bookings: newest
                .iter()
                .take(RECENT_BOOKINGS)
                .map(|booking| RecentBooking {
                    event_name: booking.event_name.clone(),
                    booth_id: booking.booth_number.clone(),
                    date_range: "Custom Date Range",
                    amount: booking.total_price,
                })
                .collect(),
        }
    }
}

/// An exhibitor profile with booking totals
#[derive(Debug, Clone, Serialize)]
pub struct ExhibitorView {
    /// Account profile
    #[serde(flatten)]
    pub profile: UserProfile,
    /// Booking totals
    #[serde(flatten)]
    pub totals: ExhibitorTotals,
}

/// One step of an exhibitor's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    /// What happened
    pub text: &'static str,
    /// When, as `YYYY-MM-DD`
    pub date: String,
    /// Detail line
    pub meta: String,
}

/// Activity history: registration, first booking, loyalty milestone
#[must_use]
pub fn timeline(user: &User, bookings: &[&Booking], now: DateTime<Utc>) -> Vec<TimelineEntry> {
    let day = |at: DateTime<Utc>| at.format("%Y-%m-%d").to_string();

    let mut entries = vec![TimelineEntry {
        text: "Registered as exhibitor",
        date: day(user.registration_date),
        meta: "via sign-up form".to_string(),
    }];

    if let Some(first) = bookings.iter().min_by_key(|booking| booking.booking_date) {
        entries.push(TimelineEntry {
            text: "First booking confirmed",
            date: day(first.booking_date),
            meta: first.event_name.clone(),
        });
    }

    let spent: Money = bookings.iter().map(|booking| booking.total_price).sum();
    if spent > LOYALTY_THRESHOLD {
        entries.push(TimelineEntry {
            text: "Total spent exceeded $50k",
            date: day(now),
            meta: "Loyal customer milestone".to_string(),
        });
    }

    entries
}

/// Bookings grouped by exhibitor, read from ledger state
async fn bookings_by_user(state: &AppState) -> HashMap<UserId, Vec<Booking>> {
    state
        .ledger
        .read(|ledger| {
            let mut grouped: HashMap<UserId, Vec<Booking>> = HashMap::new();
            for booking in ledger.bookings() {
                grouped
                    .entry(booking.user_id)
                    .or_default()
                    .push(booking.clone());
            }
            grouped
        })
        .await
}

fn totals_for(grouped: &HashMap<UserId, Vec<Booking>>, user_id: UserId) -> ExhibitorTotals {
    let bookings: Vec<&Booking> = grouped
        .get(&user_id)
        .map(|bookings| bookings.iter().collect())
        .unwrap_or_default();
    ExhibitorTotals::from_bookings(&bookings)
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Exhibitor list response
#[derive(Debug, Serialize)]
pub struct ExhibitorListResponse {
    /// Matching exhibitors
    pub exhibitors: Vec<ExhibitorView>,
}

/// Exhibitor dashboard figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitorStats {
    /// Exhibitor accounts
    pub total_exhibitors: usize,
    /// Active exhibitor accounts
    pub active_exhibitors: usize,
    /// Exhibitors registered since the first of this month
    pub new_this_month: usize,
    /// Confirmed revenue in thousands of dollars, rounded
    pub total_revenue: u64,
}

/// Exhibitor detail response
#[derive(Debug, Serialize)]
pub struct ExhibitorDetail {
    /// Profile and totals
    #[serde(flatten)]
    pub exhibitor: ExhibitorView,
    /// Activity history
    pub timeline: Vec<TimelineEntry>,
}

/// Export row
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitorExport {
    /// Account profile
    #[serde(flatten)]
    pub profile: UserProfile,
    /// Every booking
    pub total_bookings: usize,
    /// Sum of every booking's price
    pub total_spent: Money,
}

/// Account status change
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExhibitorStatusRequest {
    /// `active` or `inactive`
    pub status: Option<String>,
}

/// Response to a status change
#[derive(Debug, Serialize)]
pub struct ExhibitorStatusResponse {
    /// Human message
    pub message: &'static str,
    /// The updated account
    pub exhibitor: UserProfile,
}

// ============================================================================
// Handlers
// ============================================================================

/// List exhibitors with booking totals.
///
/// # Errors
///
/// Returns 500 if accounts cannot be loaded.
pub async fn list_exhibitors(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ExhibitorQuery>,
) -> WebResult<Json<ExhibitorListResponse>> {
    let users = state.repositories.users.list().await?;
    let grouped = bookings_by_user(&state).await;

    let mut exhibitors: Vec<ExhibitorView> = users
        .iter()
        .filter(|user| query.matches(user))
        .map(|user| ExhibitorView {
            profile: UserProfile::from(user),
            totals: totals_for(&grouped, user.id),
        })
        .collect();

    match query.sort() {
        ExhibitorSort::Name => {
            exhibitors.sort_by_cached_key(|e| e.profile.first_name.to_lowercase());
        },
        ExhibitorSort::NameDesc => {
            exhibitors.sort_by_cached_key(|e| Reverse(e.profile.first_name.to_lowercase()));
        },
        ExhibitorSort::MostBookings => {
            exhibitors.sort_by(|a, b| b.totals.total_bookings.cmp(&a.totals.total_bookings));
        },
        ExhibitorSort::HighestRevenue => {
            exhibitors.sort_by(|a, b| b.totals.total_spent.cmp(&a.totals.total_spent));
        },
    }

    Ok(Json(ExhibitorListResponse { exhibitors }))
}

/// Exhibitor counts and confirmed revenue.
///
/// # Errors
///
/// Returns 500 if accounts cannot be loaded.
pub async fn exhibitor_stats(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> WebResult<Json<ExhibitorStats>> {
    let users = state.repositories.users.list().await?;
    let now = state.clock.now();
    let month_start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now);

    let exhibitors: Vec<&User> = users
        .iter()
        .filter(|user| user.role == UserRole::Exhibitor)
        .collect();

    let confirmed: Money = state
        .ledger
        .read(|ledger| {
            ledger
                .bookings()
                .filter(|booking| booking.status == BookingStatus::Confirmed)
                .map(|booking| booking.total_price)
                .sum()
        })
        .await;

    Ok(Json(ExhibitorStats {
        total_exhibitors: exhibitors.len(),
        active_exhibitors: exhibitors
            .iter()
            .filter(|user| user.status == UserStatus::Active)
            .count(),
        new_this_month: exhibitors
            .iter()
            .filter(|user| user.registration_date >= month_start)
            .count(),
        total_revenue: thousands(confirmed),
    }))
}

/// Dollars in thousands, rounded half up
fn thousands(amount: Money) -> u64 {
    (amount.cents() + 50_000) / 100_000
}

/// Every exhibitor with totals, as a flat list.
///
/// # Errors
///
/// Returns 500 if accounts cannot be loaded.
pub async fn export_exhibitors(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> WebResult<Json<Vec<ExhibitorExport>>> {
    let users = state.repositories.users.list().await?;
    let grouped = bookings_by_user(&state).await;
    let everyone = ExhibitorQuery::default();

    Ok(Json(
        users
            .iter()
            .filter(|user| everyone.matches(user))
            .map(|user| {
                let totals = totals_for(&grouped, user.id);
                ExhibitorExport {
                    profile: UserProfile::from(user),
                    total_bookings: totals.total_bookings,
                    total_spent: totals.total_spent,
                }
            })
            .collect(),
    ))
}

/// One exhibitor with totals and timeline.
///
/// # Errors
///
/// - 404 "Exhibitor not found"
/// - 403 unless the requester is the exhibitor or an administrator
pub async fn get_exhibitor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> WebResult<Json<ExhibitorDetail>> {
    let user_id: UserId = parse_id(&id, "Exhibitor")?;
    user.ensure_owner_or_admin(user_id, "Not authorized to view this exhibitor")?;

    let account = state
        .repositories
        .users
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Exhibitor"))?;

    let grouped = bookings_by_user(&state).await;
    let bookings: Vec<&Booking> = grouped
        .get(&user_id)
        .map(|bookings| bookings.iter().collect())
        .unwrap_or_default();

    Ok(Json(ExhibitorDetail {
        timeline: timeline(&account, &bookings, state.clock.now()),
        exhibitor: ExhibitorView {
            profile: UserProfile::from(&account),
            totals: ExhibitorTotals::from_bookings(&bookings),
        },
    }))
}

/// Activate or suspend an account.
///
/// # Errors
///
/// - 400 if the status is missing or unknown
/// - 404 "Exhibitor not found"
pub async fn update_exhibitor_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<ExhibitorStatusRequest>,
) -> WebResult<Json<ExhibitorStatusResponse>> {
    let user_id: UserId = parse_id(&id, "Exhibitor")?;
    let status: UserStatus = request
        .status
        .as_deref()
        .filter(|status| !status.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Status is required"))?
        .parse()
        .map_err(|_| AppError::bad_request("Invalid account status"))?;

    let mut account = state
        .repositories
        .users
        .get(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Exhibitor"))?;
    account.status = status;
    state.repositories.users.update(&account).await?;

    tracing::info!(
        admin_id = %admin.user_id,
        user_id = %user_id,
        status = %status,
        "Exhibitor status changed"
    );

    Ok(Json(ExhibitorStatusResponse {
        message: "Exhibitor status updated successfully",
        exhibitor: UserProfile::from(&account),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{BookingId, BoothId};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap()
    }

    fn user() -> User {
        User {
            id: UserId::new(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@example.com".to_string(),
            phone: String::new(),
            company_name: "Compilers Inc".to_string(),
            industry: "technology".to_string(),
            company_size: String::new(),
            company_address: String::new(),
            password_hash: String::new(),
            role: UserRole::Exhibitor,
            status: UserStatus::Active,
            registration_date: at(1),
        }
    }

    fn booking(user_id: UserId, day: u32, dollars: u64, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(),
            booth_id: BoothId::new(),
            user_id,
            company_name: String::new(),
            contact_person: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            special_requests: String::new(),
            total_price: Money::from_cents(dollars * 100),
            status,
            booking_date: at(day),
            event_name: format!("Expo {day}"),
            booth_number: format!("B-{day}"),
            event_date: String::new(),
            venue: String::new(),
            location: String::new(),
            created_at: at(day),
            updated_at: at(day),
        }
    }

    #[test]
    fn totals_count_everything_and_list_newest_two() {
        let owner = UserId::new();
        let bookings = [
            booking(owner, 3, 100, BookingStatus::Confirmed),
            booking(owner, 9, 200, BookingStatus::Cancelled),
            booking(owner, 5, 300, BookingStatus::Confirmed),
        ];
        let refs: Vec<&Booking> = bookings.iter().collect();

        let totals = ExhibitorTotals::from_bookings(&refs);

        assert_eq!(totals.total_bookings, 3);
        assert_eq!(totals.active_bookings, 2);
        assert_eq!(totals.total_spent, Money::from_cents(600_00));
        let recent: Vec<&str> = totals
            .recent_bookings
            .iter()
            .map(|b| b.booth_id.as_str())
            .collect();
        assert_eq!(recent, ["B-9", "B-5"]);
    }

    #[test]
    fn timeline_for_new_account() {
        let entries = timeline(&user(), &[], at(20));

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Registered as exhibitor");
        assert_eq!(entries[0].date, "2025-01-01");
    }

    #[test]
    fn timeline_with_first_booking_and_milestone() {
        let account = user();
        let bookings = [
            booking(account.id, 7, 30_000, BookingStatus::Confirmed),
            booking(account.id, 4, 25_000, BookingStatus::Confirmed),
        ];
        let refs: Vec<&Booking> = bookings.iter().collect();

        let entries = timeline(&account, &refs, at(20));

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].meta, "Expo 4");
        assert_eq!(entries[1].date, "2025-01-04");
        assert_eq!(entries[2].text, "Total spent exceeded $50k");
        assert_eq!(entries[2].date, "2025-01-20");
    }

    #[test]
    fn revenue_in_thousands_rounds() {
        assert_eq!(thousands(Money::ZERO), 0);
        assert_eq!(thousands(Money::from_cents(1_499_99)), 1);
        assert_eq!(thousands(Money::from_cents(1_500_00)), 2);
        assert_eq!(thousands(Money::from_cents(12_345_00)), 12);
    }

    #[test]
    fn view_flattens_profile_and_totals() {
        let account = user();
        let view = ExhibitorView {
            profile: UserProfile::from(&account),
            totals: ExhibitorTotals::from_bookings(&[]),
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["firstName"], "Grace");
        assert_eq!(json["totalBookings"], 0);
        assert!(json.get("passwordHash").is_none());
    }
}

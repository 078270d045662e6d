//! Platform totals shown on the public landing page.

use super::booths::BoothStats;
use crate::aggregates::LedgerState;
use crate::server::state::AppState;
use crate::types::{BookingStatus, Money, User, UserStatus};
use axum::{Json, extract::State};
use boothbook_web::WebResult;
use serde::Serialize;

/// Booth, booking and account counts with active revenue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    /// Booth counts
    #[serde(flatten)]
    pub booths: BoothStats,
    /// Every booking
    pub total_bookings: usize,
    /// Bookings awaiting confirmation
    pub pending_bookings: usize,
    /// Confirmed bookings
    pub confirmed_bookings: usize,
    /// Every account
    pub total_users: usize,
    /// Accounts allowed to sign in
    pub active_users: usize,
    /// Total of active bookings
    pub total_revenue: Money,
}

impl PlatformStats {
    /// Totals over ledger state and the account list
    #[must_use]
    pub fn collect(ledger: &LedgerState, users: &[User]) -> Self {
        let count = |status: BookingStatus| {
            ledger
                .bookings()
                .filter(|booking| booking.status == status)
                .count()
        };

        Self {
            booths: BoothStats::count(ledger.booths()),
            total_bookings: ledger.booking_count(),
            pending_bookings: count(BookingStatus::Pending),
            confirmed_bookings: count(BookingStatus::Confirmed),
            total_users: users.len(),
            active_users: users
                .iter()
                .filter(|user| user.status == UserStatus::Active)
                .count(),
            total_revenue: ledger
                .bookings()
                .filter(|booking| booking.status.is_active())
                .map(|booking| booking.total_price)
                .sum(),
        }
    }
}

/// Platform totals.
///
/// # Errors
///
/// Returns 500 if accounts cannot be loaded.
pub async fn platform_stats(State(state): State<AppState>) -> WebResult<Json<PlatformStats>> {
    let users = state.repositories.users.list().await?;
    let stats = state
        .ledger
        .read(|ledger| PlatformStats::collect(ledger, &users))
        .await;
    Ok(Json(stats))
}

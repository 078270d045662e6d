//! API endpoints for booth booking.
//!
//! Handlers are organised by resource:
//! - Events: public listing, admin CRUD
//! - Booths: public browsing and stats, admin writes
//! - Bookings: exhibitor bookings and quotes
//! - Admin: booth management, booking moderation, dashboard figures
//! - Exhibitors: admin views of exhibitor accounts
//! - Users: account listing
//! - Payments: simulated checkout and payment records
//! - Stats: platform totals

pub mod admin;
pub mod bookings;
pub mod booths;
pub mod events;
pub mod exhibitors;
pub mod payments;
pub mod stats;
pub mod users;

use crate::server::state::AppState;
use crate::storage::StorageError;
use crate::types::{Booth, BoothView, UserId, UserSummary};
use boothbook_web::{AppError, WebResult};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

impl From<StorageError> for AppError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(resource) => Self::not_found(resource),
            StorageError::DuplicateEmail(_) => Self::bad_request("Email is already in use"),
            other => Self::internal("Storage error").with_source(other.into()),
        }
    }
}

/// Parse a path id; a malformed id is reported like a missing document
pub(crate) fn parse_id<T: FromStr>(raw: &str, resource: &'static str) -> WebResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::not_found(resource))
}

/// Response carrying only a message
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Human message
    pub message: &'static str,
}

/// Response carrying a success flag and a message
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    /// Always true
    pub success: bool,
    /// Human message
    pub message: &'static str,
}

impl SuccessResponse {
    pub(crate) const fn new(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

/// Summaries of the given accounts, keyed by id
pub(crate) async fn user_summaries(
    state: &AppState,
    ids: HashSet<UserId>,
) -> WebResult<HashMap<UserId, UserSummary>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = state.repositories.users.list().await?;
    Ok(users
        .iter()
        .filter(|user| ids.contains(&user.id))
        .map(|user| (user.id, UserSummary::from(user)))
        .collect())
}

/// Render booths with their exhibitors populated
pub(crate) async fn booth_views(state: &AppState, booths: &[Booth]) -> WebResult<Vec<BoothView>> {
    let ids = booths.iter().filter_map(|booth| booth.exhibitor).collect();
    let summaries = user_summaries(state, ids).await?;
    Ok(booths
        .iter()
        .map(|booth| {
            let exhibitor = booth.exhibitor.and_then(|id| summaries.get(&id).cloned());
            BoothView::new(booth, exhibitor)
        })
        .collect())
}

/// Render one booth with its exhibitor populated
pub(crate) async fn booth_view(state: &AppState, booth: &Booth) -> WebResult<BoothView> {
    let mut views = booth_views(state, std::slice::from_ref(booth)).await?;
    views
        .pop()
        .ok_or_else(|| AppError::internal("Failed to render booth"))
}

/// Sort booths the way the booth tables list them: event, then number
pub(crate) fn sort_booths(booths: &mut [Booth]) {
    booths.sort_by_cached_key(|booth| (booth.event.to_lowercase(), booth.number.to_lowercase()));
}

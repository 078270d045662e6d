//! Booth API endpoints.
//!
//! Reads come straight from ledger state; writes are ledger commands so
//! they serialise with bookings on the same booth.

use super::{MessageResponse, booth_view, booth_views, sort_booths};
use crate::aggregates::{BoothDraft, BoothPatch, LedgerAction};
use crate::auth::RequireAdmin;
use crate::server::state::AppState;
use crate::storage::filters::BoothFilter;
use crate::types::{Booth, BoothId, BoothStatus, BoothView};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use boothbook_web::{AppError, CorrelationId, WebResult};
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// Shared writes
// ============================================================================

/// Register a booth and return it as stored
pub(crate) async fn register_booth(
    state: &AppState,
    correlation_id: Uuid,
    draft: BoothDraft,
) -> WebResult<Booth> {
    let booth_id = BoothId::new();
    let change = state
        .ledger
        .dispatch(LedgerAction::RegisterBooth {
            correlation_id,
            booth_id,
            draft,
        })
        .await?;

    let booth = change
        .booth(booth_id)
        .cloned()
        .ok_or_else(|| AppError::internal("Booth was not recorded"))?;
    tracing::info!(%correlation_id, booth_id = %booth.id, number = %booth.number, "Booth registered");
    Ok(booth)
}

/// Revise a booth found by key or number
pub(crate) async fn revise_booth(
    state: &AppState,
    correlation_id: Uuid,
    key: &str,
    patch: BoothPatch,
) -> WebResult<Booth> {
    let booth_id = state.ledger.find_booth(key).await?.id;
    let change = state
        .ledger
        .dispatch(LedgerAction::ReviseBooth {
            correlation_id,
            booth_id,
            patch,
        })
        .await?;

    change
        .booth(booth_id)
        .cloned()
        .ok_or_else(|| AppError::internal("Booth was not recorded"))
}

/// Remove a booth found by key or number
pub(crate) async fn remove_booth(state: &AppState, correlation_id: Uuid, key: &str) -> WebResult<()> {
    let booth_id = state.ledger.find_booth(key).await?.id;
    state
        .ledger
        .dispatch(LedgerAction::RemoveBooth {
            correlation_id,
            booth_id,
        })
        .await?;
    tracing::info!(%correlation_id, booth_id = %booth_id, "Booth removed");
    Ok(())
}

/// Booth counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoothStats {
    /// Every booth
    pub total_booths: usize,
    /// Booked booths
    pub booked_booths: usize,
    /// Available booths
    pub available_booths: usize,
    /// Booths under maintenance
    pub maintenance_booths: usize,
}

impl BoothStats {
    /// Count booths by status
    pub fn count<'a, I>(booths: I) -> Self
    where
        I: IntoIterator<Item = &'a Booth>,
    {
        booths.into_iter().fold(Self::default(), |mut stats, booth| {
            stats.total_booths += 1;
            match booth.status {
                BoothStatus::Booked => stats.booked_booths += 1,
                BoothStatus::Available => stats.available_booths += 1,
                BoothStatus::Maintenance => stats.maintenance_booths += 1,
            }
            stats
        })
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Booth list response
#[derive(Debug, Serialize)]
pub struct BoothListResponse {
    /// Matching booths
    pub booths: Vec<BoothView>,
}

/// Response to a booth write
#[derive(Debug, Serialize)]
pub struct BoothWriteResponse {
    /// Human message
    pub message: &'static str,
    /// The booth as stored
    pub booth: BoothView,
}

// ============================================================================
// Handlers
// ============================================================================

/// List booths, filtered by status, event, hall, size and maximum price.
///
/// # Errors
///
/// Returns 500 if exhibitor accounts cannot be loaded.
pub async fn list_booths(
    State(state): State<AppState>,
    Query(filter): Query<BoothFilter>,
) -> WebResult<Json<BoothListResponse>> {
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

    Ok(Json(BoothListResponse {
        booths: booth_views(&state, &booths).await?,
    }))
}

/// Booth counts by status.
pub async fn booth_stats(State(state): State<AppState>) -> Json<BoothStats> {
    Json(
        state
            .ledger
            .read(|ledger| BoothStats::count(ledger.booths()))
            .await,
    )
}

/// Get a booth by document key or booth number.
///
/// # Errors
///
/// Returns 404 "Booth not found".
pub async fn get_booth(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> WebResult<Json<BoothView>> {
    let booth = state.ledger.find_booth(&key).await?;
    Ok(Json(booth_view(&state, &booth).await?))
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
) -> WebResult<(StatusCode, Json<BoothWriteResponse>)> {
    let booth = register_booth(&state, correlation_id.0, draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(BoothWriteResponse {
            message: "Booth created successfully",
            booth: booth_view(&state, &booth).await?,
        }),
    ))
}

/// Update a booth by document key or booth number.
///
/// # Errors
///
/// - 404 "Booth not found"
/// - 400 if the change would reopen or remove a booked booth
pub async fn update_booth(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    correlation_id: CorrelationId,
    Path(key): Path<String>,
    Json(patch): Json<BoothPatch>,
) -> WebResult<Json<BoothWriteResponse>> {
    let booth = revise_booth(&state, correlation_id.0, &key, patch).await?;
    Ok(Json(BoothWriteResponse {
        message: "Booth updated successfully",
        booth: booth_view(&state, &booth).await?,
    }))
}

/// Delete a booth by document key or booth number.
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
) -> WebResult<Json<MessageResponse>> {
    remove_booth(&state, correlation_id.0, &key).await?;
    Ok(Json(MessageResponse {
        message: "Booth deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Money;

    fn booth(status: BoothStatus) -> Booth {
        Booth {
            id: BoothId::new(),
            number: "A-1".to_string(),
            event: "Expo".to_string(),
            event_id: None,
            date: String::new(),
            location: "Hall 1".to_string(),
            size: "small".to_string(),
            size_label: String::new(),
            price: Money::from_cents(100_00),
            note: String::new(),
            status,
            features: Vec::new(),
            description: String::new(),
            exhibitor: None,
            coordinates: None,
        }
    }

    #[test]
    fn stats_count_by_status() {
        let booths = [
            booth(BoothStatus::Available),
            booth(BoothStatus::Available),
            booth(BoothStatus::Booked),
            booth(BoothStatus::Maintenance),
        ];

        let stats = BoothStats::count(&booths);

        assert_eq!(
            stats,
            BoothStats {
                total_booths: 4,
                booked_booths: 1,
                available_booths: 2,
                maintenance_booths: 1,
            }
        );
    }

    #[test]
    fn stats_serialise_camel_case() {
        let json = serde_json::to_value(BoothStats::count(std::iter::empty())).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({
                "totalBooths": 0,
                "bookedBooths": 0,
                "availableBooths": 0,
                "maintenanceBooths": 0
            }))
        );
    }
}

//! Payment API endpoints.
//!
//! - POST /api/payments/process - Charge through the payment gateway
//! - POST /api/payments - Record a completed payment
//! - GET /api/payments - The signed-in exhibitor's payment records
//!
//! # Payment Flow
//!
//! 1. **Checkout**: the client charges the booking total via `/process`
//! 2. **Gateway**: the simulated gateway approves and returns a `TXN_` reference
//! 3. **Record**: the client stores the reference against the booking

use super::bookings::{load_booking, parse_amount};
use super::parse_id;
use crate::auth::AuthUser;
use crate::payment_gateway::{PaymentGatewayError, transaction_reference};
use crate::server::state::AppState;
use crate::types::{BookingId, PaymentId, PaymentRecord, PaymentStatus};
use axum::{Json, extract::State, http::StatusCode};
use boothbook_core::environment::Clock;
use boothbook_web::{AppError, CorrelationId, WebResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payment method used when the client names none
const DEFAULT_PAYMENT_METHOD: &str = "card";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Checkout request.
///
/// Card details are accepted but never inspected or stored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessPaymentRequest {
    /// Amount in dollars
    pub amount: Option<Value>,
    /// Payment method name
    pub payment_method: Option<String>,
    /// Card fields from the checkout form
    pub card_details: Option<Value>,
}

/// Response after a successful charge
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentResponse {
    /// Always true
    pub success: bool,
    /// Gateway reference
    pub transaction_id: String,
    /// Always `completed`
    pub status: PaymentStatus,
    /// Human message
    pub message: &'static str,
}

/// Payment record submitted after checkout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordPaymentRequest {
    /// Paid booking, if any
    pub booking_id: Option<String>,
    /// Amount in dollars
    pub amount: Option<Value>,
    /// Payment method name
    pub payment_method: Option<String>,
    /// Gateway reference
    pub transaction_id: Option<String>,
    /// Settlement status (completed unless given)
    pub status: Option<PaymentStatus>,
}

/// Response to a recorded payment
#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
    /// Human message
    pub message: &'static str,
    /// The stored record
    pub payment: PaymentRecord,
}

/// Payment list response
#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    /// Newest first
    pub payments: Vec<PaymentRecord>,
}

fn payment_method(requested: Option<String>) -> String {
    requested
        .map(|method| method.trim().to_string())
        .filter(|method| !method.is_empty())
        .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string())
}

impl From<PaymentGatewayError> for AppError {
    fn from(error: PaymentGatewayError) -> Self {
        match error {
            PaymentGatewayError::InvalidAmount => Self::bad_request("Invalid amount"),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Charge an amount through the payment gateway.
///
/// # Errors
///
/// - 400 "Invalid amount" when the amount is missing, zero or negative
pub async fn process_payment(
    State(state): State<AppState>,
    user: AuthUser,
    correlation_id: CorrelationId,
    Json(request): Json<ProcessPaymentRequest>,
) -> WebResult<Json<ProcessPaymentResponse>> {
    let amount = parse_amount(request.amount.as_ref())
        .filter(|amount| !amount.is_zero())
        .ok_or_else(|| AppError::bad_request("Invalid amount"))?;

    let transaction = state
        .gateway
        .charge(amount, payment_method(request.payment_method))
        .await?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        user_id = %user.user_id,
        transaction_id = %transaction.transaction_id,
        amount = amount.cents(),
        "Payment processed"
    );

    Ok(Json(ProcessPaymentResponse {
        success: true,
        transaction_id: transaction.transaction_id,
        status: PaymentStatus::Completed,
        message: "Payment processed successfully",
    }))
}

/// Record a payment against the signed-in account.
///
/// # Errors
///
/// - 400 "Invalid amount" when the amount is missing, zero or negative
/// - 404 if the referenced booking does not exist
/// - 403 if the booking belongs to someone else
pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<RecordPaymentRequest>,
) -> WebResult<(StatusCode, Json<RecordPaymentResponse>)> {
    let amount = parse_amount(request.amount.as_ref())
        .filter(|amount| !amount.is_zero())
        .ok_or_else(|| AppError::bad_request("Invalid amount"))?;

    let booking_id = match request.booking_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            let id: BookingId = parse_id(raw, "Booking")?;
            let booking = load_booking(&state, id).await?;
            user.ensure_owner_or_admin(booking.user_id, "Not authorized to pay for this booking")?;
            Some(id)
        },
        _ => None,
    };

    let payment = PaymentRecord {
        id: PaymentId::new(),
        user_id: user.user_id,
        booking_id,
        amount,
        payment_method: payment_method(request.payment_method),
        transaction_id: request
            .transaction_id
            .filter(|reference| !reference.trim().is_empty())
            .unwrap_or_else(transaction_reference),
        status: request.status.unwrap_or_default(),
        created_at: state.clock.now(),
    };
    state.repositories.payments.insert(&payment).await?;

    tracing::info!(
        payment_id = %payment.id,
        user_id = %user.user_id,
        transaction_id = %payment.transaction_id,
        "Payment recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(RecordPaymentResponse {
            message: "Payment record created successfully",
            payment,
        }),
    ))
}

/// The signed-in account's payment records.
///
/// # Errors
///
/// Returns 500 if records cannot be loaded.
pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthUser,
) -> WebResult<Json<PaymentListResponse>> {
    let mut payments = state
        .repositories
        .payments
        .list_for_user(user.user_id)
        .await?;
    payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(PaymentListResponse { payments }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_defaults_to_card() {
        assert_eq!(payment_method(None), "card");
        assert_eq!(payment_method(Some("  ".to_string())), "card");
        assert_eq!(payment_method(Some("invoice".to_string())), "invoice");
    }

    #[test]
    fn gateway_refusal_is_bad_request() {
        let invalid = AppError::from(PaymentGatewayError::InvalidAmount);
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.message(), "Invalid amount");
    }
}

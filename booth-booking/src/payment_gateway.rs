//! Simulated payment gateway.
//!
//! Checkout talks to a [`PaymentGateway`]. The only implementation is
//! [`SimulatedGateway`], which waits a moment and approves every charge with
//! a `TXN_` reference. Swapping in a real processor means implementing the
//! trait.

use crate::types::Money;
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentGatewayError>;

/// Payment gateway error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentGatewayError {
    /// Amount missing, zero or negative
    #[error("Invalid amount")]
    InvalidAmount,
}

/// Payment gateway transaction result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTransaction {
    /// Gateway transaction ID
    pub transaction_id: String,
    /// Amount charged
    pub amount: Money,
    /// Payment method used ("card", "invoice", ...)
    pub payment_method: String,
}

/// Payment gateway trait
///
/// Abstraction over card processors.
pub trait PaymentGateway: Send + Sync {
    /// Charge an amount
    ///
    /// # Errors
    ///
    /// Returns error if the charge is refused
    fn charge(
        &self,
        amount: Money,
        payment_method: String,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentTransaction>> + Send>>;
}

/// Length of the random part of a transaction reference
const TRANSACTION_SUFFIX_LEN: usize = 9;

const TRANSACTION_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a `TXN_XXXXXXXXX` reference
#[must_use]
pub fn transaction_reference() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TRANSACTION_SUFFIX_LEN)
        .map(|_| {
            let index = rng.gen_range(0..TRANSACTION_ALPHABET.len());
            char::from(TRANSACTION_ALPHABET[index])
        })
        .collect();
    format!("TXN_{suffix}")
}

/// Gateway that approves every valid charge after a fixed delay
#[derive(Clone, Debug)]
pub struct SimulatedGateway {
    delay: Duration,
}

impl SimulatedGateway {
    /// Creates a gateway with the given processing delay
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(delay: Duration) -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new(delay))
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl PaymentGateway for SimulatedGateway {
    fn charge(
        &self,
        amount: Money,
        payment_method: String,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentTransaction>> + Send>> {
        let delay = self.delay;
        Box::pin(async move {
            if amount.is_zero() {
                return Err(PaymentGatewayError::InvalidAmount);
            }

            // Simulate network delay
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let transaction_id = transaction_reference();

            tracing::info!(
                amount = amount.cents(),
                transaction_id = %transaction_id,
                "Simulated payment processed"
            );
            metrics::counter!("payments.processed").increment(1);

            Ok(PaymentTransaction {
                transaction_id,
                amount,
                payment_method,
            })
        })
    }
}

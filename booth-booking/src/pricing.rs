//! Booth price quotes.
//!
//! The checkout page shows a subtotal, a 10% tax line and a total before the
//! exhibitor pays. All arithmetic is done in cents.

use crate::types::Money;
use serde::Serialize;

/// Sales tax applied to booth bookings, in percent
pub const TAX_PERCENT: u64 = 10;

/// Price breakdown for one or more booths
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Sum of booth prices
    pub subtotal: Money,
    /// Tax on the subtotal, rounded half up to the cent
    pub tax: Money,
    /// Subtotal plus tax
    pub total: Money,
}

impl Quote {
    /// Quote a set of booth prices
    #[must_use]
    pub fn for_prices<I>(prices: I) -> Self
    where
        I: IntoIterator<Item = Money>,
    {
        let subtotal: Money = prices.into_iter().sum();
        let tax = subtotal.percent(TAX_PERCENT);
        Self {
            subtotal,
            tax,
            total: subtotal.saturating_add(tax),
        }
    }
}

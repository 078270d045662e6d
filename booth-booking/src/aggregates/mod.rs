//! Aggregate reducers for booth booking.
//!
//! The booth ledger is the only aggregate: booths and bookings change
//! together, so they live in one reducer behind one store.

pub mod ledger;

pub use ledger::{
    BookingDetails, BoothDraft, BoothPatch, LedgerAction, LedgerEnvironment, LedgerReducer,
    LedgerState, LedgerStore, Rejection, Requester,
};

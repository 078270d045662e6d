//! Booth Booking - booth reservations and event management for exhibitions
//!
//! A REST API for exhibition organisers and exhibitors. Organisers (admins)
//! publish events and lay out booths on a floor plan; exhibitors sign up,
//! browse available booths, request quotes and book them.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)                         Booth Ledger
//! ┌──────────────┐  commands   ┌──────────────────────────┐
//! │  /api/...    │ ──────────▶ │  Store<LedgerReducer>    │
//! │  handlers    │ ◀────────── │  booths + bookings       │
//! └──────────────┘  outcomes   └──────────────────────────┘
//!        │                                  │ persist effect
//!        ▼                                  ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │        Repositories (PostgreSQL or in-memory)            │
//! │  events · users · payments · booths/bookings             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Features
//!
//! ## 1. No Double Booking
//!
//! Every booth and booking write is a command to one reducer. Commands are
//! applied one at a time, so two exhibitors racing for the same booth see
//! exactly one success:
//!
//! ```text
//! booth.status == available && no active booking   → BookingPlaced
//! otherwise                                        → "This booth is already booked"
//! ```
//!
//! ## 2. Write-Through Persistence
//!
//! A command's change is written to storage before it is applied. Booths
//! touched by a write in flight are held, so a competing command sees
//! "busy" instead of stale state. If storage refuses the write the holds
//! lift and the caller sees a 500.
//!
//! ## 3. Quotes and Floor Plans
//!
//! Quotes sum booth prices and add 10% tax in integer cents. The admin
//! auto-layout places booths on a grid, hall by hall.
//!
//! # Usage
//!
//! See [`BoothBookingApp`] to boot the server and [`server::build_router`]
//! for the endpoint table.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregates;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod floorplan;
pub mod payment_gateway;
pub mod pricing;
pub mod server;
pub mod storage;
pub mod types;

pub use app::{BootError, BoothBookingApp};
pub use config::Config;

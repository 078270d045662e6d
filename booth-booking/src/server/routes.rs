//! Router configuration for the booth booking platform.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::{api_health, api_test, readiness_check};
use super::state::AppState;
use crate::api::{admin, bookings, booths, events, exhibitors, payments, stats, users};
use crate::auth::handlers as auth;
use axum::{
    Router,
    http::{
        HeaderName, HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, patch, post, put},
};
use boothbook_web::correlation_id_layer;
use boothbook_web::handlers::{health_check, route_not_found};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

const CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// CORS for the configured browser origins, with credentials.
///
/// Origins that are not valid header values are skipped with a warning.
#[must_use]
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| tracing::warn!(%origin, "Ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            CORRELATION_ID,
        ])
        .expose_headers([CORRELATION_ID])
        .allow_credentials(true)
}

/// Build the complete Axum router.
///
/// Configures:
/// - Health checks (`/health`, `/ready`, `/api/health`, `/api/test`)
/// - Account endpoints under `/api/auth`
/// - Events, booths, bookings, users and payments
/// - Admin and exhibitor management
///
/// Every response carries the request's `X-Correlation-ID`; unknown routes
/// answer 404 "Route not found".
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me).put(auth::update_me))
        .route("/change-password", put(auth::change_password));

    let admin_routes = Router::new()
        .route("/booths", get(admin::list_booths).post(admin::create_booth))
        .route("/booths/auto-layout", post(admin::auto_layout))
        .route(
            "/booths/:id",
            put(admin::update_booth).delete(admin::delete_booth),
        )
        .route("/bookings", get(admin::list_bookings))
        .route("/bookings/:id/status", patch(admin::update_booking_status))
        .route("/bookings/:id", delete(admin::delete_booking))
        .route("/stats", get(admin::stats))
        .route("/revenue-trends", get(admin::revenue));

    let api_routes = Router::new()
        .route("/health", get(api_health))
        .route("/test", get(api_test))
        .nest("/auth", auth_routes)
        // Accounts
        .route("/users", get(users::list_users))
        .route("/users/:id", get(users::get_user))
        // Events
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        // Booths
        .route("/booths", get(booths::list_booths).post(booths::create_booth))
        .route("/booths/stats", get(booths::booth_stats))
        .route(
            "/booths/:id",
            get(booths::get_booth)
                .put(booths::update_booth)
                .delete(booths::delete_booth),
        )
        // Bookings
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/bookings/quote", post(bookings::quote))
        .route(
            "/bookings/:id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        .route("/bookings/:id/cancel", patch(bookings::cancel_booking))
        // Exhibitors
        .route("/exhibitors", get(exhibitors::list_exhibitors))
        .route("/exhibitors/stats", get(exhibitors::exhibitor_stats))
        .route("/exhibitors/export", get(exhibitors::export_exhibitors))
        .route("/exhibitors/:id", get(exhibitors::get_exhibitor))
        .route(
            "/exhibitors/:id/status",
            patch(exhibitors::update_exhibitor_status),
        )
        // Platform totals
        .route("/stats", get(stats::platform_stats))
        // Payments
        .route(
            "/payments",
            get(payments::list_payments).post(payments::record_payment),
        )
        .route("/payments/process", post(payments::process_payment))
        .nest("/admin", admin_routes);

    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .fallback(route_not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(correlation_id_layer())
}

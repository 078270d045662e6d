//! Shared helpers for the HTTP integration tests.
//!
//! Every test boots its own application over in-memory storage and drives
//! the router in process with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use booth_booking::storage::InMemoryStorage;
use booth_booking::{BoothBookingApp, Config};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

/// Seeded administrator credentials
pub const ADMIN_EMAIL: &str = "admin@boothbook.test";
/// Seeded administrator password
pub const ADMIN_PASSWORD: &str = "admin-password";

/// A booted application and its router
pub struct TestApp {
    /// The application, for direct repository access
    pub app: BoothBookingApp,
    router: Router,
}

impl TestApp {
    /// Boot over fresh in-memory storage with a seeded administrator.
    pub async fn spawn() -> Self {
        let app = BoothBookingApp::in_memory(Self::config(), Arc::new(InMemoryStorage::new()))
            .await
            .expect("app boots");
        Self::with_app(app)
    }

    /// Wrap an application booted by the test itself.
    pub fn with_app(app: BoothBookingApp) -> Self {
        let router = app.router();
        Self { app, router }
    }

    /// The test configuration with the seeded administrator
    pub fn config() -> Config {
        let mut config = Config::for_tests();
        config.auth.admin_email = Some(ADMIN_EMAIL.to_string());
        config.auth.admin_password = Some(ADMIN_PASSWORD.to_string());
        config
    }

    /// Send a request and return the status with the parsed JSON body.
    ///
    /// Empty or non-JSON bodies come back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send_request(build_request(method, uri, token, body)).await
    }

    /// Send a prepared request and return the status with the parsed body.
    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// GET with an optional bearer token
    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    /// POST a JSON body with an optional bearer token
    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    /// Register an exhibitor and return their token.
    pub async fn register(&self, email: &str, company: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "firstName": "Dana",
                    "lastName": "Reyes",
                    "email": email,
                    "password": "correct-horse",
                    "companyName": company,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        token_of(&body)
    }

    /// Sign in as the seeded administrator and return the token.
    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        token_of(&body)
    }

    /// Create an available booth as the administrator and return it.
    pub async fn create_booth(&self, admin: &str, number: &str, price: f64) -> Value {
        let (status, body) = self
            .post(
                "/api/booths",
                Some(admin),
                json!({
                    "id": number,
                    "event": "Spring Trade Expo",
                    "location": "Hall A",
                    "size": "medium",
                    "sizeLabel": "3m x 3m",
                    "price": price,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create booth failed: {body}");
        body["booth"].clone()
    }

    /// Book a booth as the given exhibitor
    pub async fn book(&self, token: &str, booth_id: &str, price: f64) -> (StatusCode, Value) {
        self.post(
            "/api/bookings",
            Some(token),
            json!({
                "boothId": booth_id,
                "totalPrice": price,
                "contactPhone": "+1 555 0100",
                "specialRequests": "Corner power outlet",
            }),
        )
        .await
    }
}

/// Build a JSON request
pub fn build_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        },
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

/// The bearer token from a register or login response
pub fn token_of(body: &Value) -> String {
    body["token"].as_str().expect("token in response").to_string()
}

/// A JSON string field
pub fn str_of<'a>(value: &'a Value, field: &str) -> &'a str {
    value[field]
        .as_str()
        .unwrap_or_else(|| panic!("{field} missing in {value}"))
}

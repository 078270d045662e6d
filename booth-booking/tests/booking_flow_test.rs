//! End-to-end booking flow over the HTTP API.
//!
//! An administrator publishes an event and lays out booths; an exhibitor
//! quotes, books, pays and cancels. Each step is checked through the same
//! endpoints the browser client uses.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
#![allow(clippy::too_many_lines)]

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, str_of};
use serde_json::json;

#[tokio::test]
async fn exhibitor_books_and_cancels_a_booth() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let exhibitor = app.register("dana@acme.test", "Acme Displays").await;

    let booth = app.create_booth(&admin, "A-1", 1500.0).await;
    let booth_id = str_of(&booth, "_id").to_string();
    assert_eq!(str_of(&booth, "status"), "available");

    // Book it
    let (status, body) = app.book(&exhibitor, &booth_id, 1650.0).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], json!(true));
    let booking = &body["booking"];
    let booking_id = str_of(booking, "_id").to_string();
    assert_eq!(str_of(booking, "status"), "confirmed");
    assert!(booking["confirmedAt"].is_string());
    assert_eq!(str_of(booking, "boothNumber"), "A-1");
    assert_eq!(str_of(booking, "companyName"), "Acme Displays");
    assert_eq!(str_of(booking, "contactPerson"), "Dana Reyes");
    assert_eq!(str_of(booking, "location"), "Hall A");
    assert_eq!(booking["totalPrice"].as_f64(), Some(1650.0));

    // The booth is now taken
    let (status, body) = app.get(&format!("/api/booths/{booth_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(str_of(&body, "status"), "booked");

    // The exhibitor sees it in their list
    let (status, body) = app.get("/api/bookings", Some(&exhibitor)).await;
    assert_eq!(status, StatusCode::OK);
    let bookings = body["bookings"].as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(str_of(&bookings[0], "_id"), booking_id);

    // Cancel and the booth is released
    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/bookings/{booking_id}/cancel"),
            Some(&exhibitor),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(str_of(&body, "message"), "Booking cancelled successfully");
    assert_eq!(str_of(&body["booking"], "status"), "cancelled");

    let (_, body) = app.get(&format!("/api/booths/{booth_id}"), None).await;
    assert_eq!(str_of(&body, "status"), "available");

    // A cancelled booking cannot be cancelled again
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/bookings/{booking_id}/cancel"),
            Some(&exhibitor),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booked_booth_rejects_second_booking() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let first = app.register("first@expo.test", "First Co").await;
    let second = app.register("second@expo.test", "Second Co").await;

    let booth = app.create_booth(&admin, "B-7", 900.0).await;
    let booth_id = str_of(&booth, "_id").to_string();

    let (status, _) = app.book(&first, &booth_id, 990.0).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.book(&second, &booth_id, 990.0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_of(&body, "message"), "This booth is already booked");
}

#[tokio::test]
async fn booking_by_booth_number() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let exhibitor = app.register("number@expo.test", "Numbers Ltd").await;
    app.create_booth(&admin, "C-3", 700.0).await;

    let (status, body) = app.book(&exhibitor, "C-3", 770.0).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(str_of(&body["booking"], "boothNumber"), "C-3");
}

#[tokio::test]
async fn booking_requires_booth_and_price() {
    let app = TestApp::spawn().await;
    let exhibitor = app.register("lazy@expo.test", "Lazy Co").await;

    let (status, body) = app
        .post("/api/bookings", Some(&exhibitor), json!({ "totalPrice": 100 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_of(&body, "message"), "Booth ID is required");

    let (status, body) = app
        .post("/api/bookings", Some(&exhibitor), json!({ "boothId": "Z-9" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_of(&body, "message"), "Valid total price is required");

    let (status, body) = app.book(&exhibitor, "Z-9", 100.0).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(str_of(&body, "message"), "Booth not found");
}

#[tokio::test]
async fn quote_adds_tax() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_booth(&admin, "Q-1", 1500.0).await;
    app.create_booth(&admin, "Q-2", 500.0).await;

    let (status, body) = app
        .post("/api/bookings/quote", None, json!({ "boothIds": ["Q-1", "Q-2"] }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["booths"].as_array().unwrap().len(), 2);
    assert_eq!(body["subtotal"].as_f64(), Some(2000.0));
    assert_eq!(body["tax"].as_f64(), Some(200.0));
    assert_eq!(body["total"].as_f64(), Some(2200.0));

    let (status, body) = app
        .post("/api/bookings/quote", None, json!({ "boothIds": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_of(&body, "message"), "At least one booth is required");
}

#[tokio::test]
async fn admin_moves_booking_through_statuses() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let exhibitor = app.register("paid@expo.test", "Paid Inc").await;

    let booth = app.create_booth(&admin, "D-1", 2000.0).await;
    app.create_booth(&admin, "D-2", 1000.0).await;
    let (_, body) = app.book(&exhibitor, str_of(&booth, "_id"), 2200.0).await;
    let booking_id = str_of(&body["booking"], "_id").to_string();

    let (status, body) = app.get("/api/admin/stats", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalBooths"], json!(2));
    assert_eq!(body["bookedBooths"], json!(1));
    assert_eq!(body["availableBooths"], json!(1));
    assert_eq!(body["pendingApprovals"], json!(0));
    assert_eq!(body["totalRevenue"].as_f64(), Some(2200.0));

    // Back to pending for review
    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/admin/bookings/{booking_id}/status"),
            Some(&admin),
            Some(json!({ "status": "pending" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(str_of(&body["booking"], "status"), "pending");

    let (_, body) = app.get("/api/admin/stats", Some(&admin)).await;
    assert_eq!(body["pendingApprovals"], json!(1));
    assert_eq!(body["bookedBooths"], json!(1));

    // Cancelling drops it from revenue and frees the booth
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/admin/bookings/{booking_id}/status"),
            Some(&admin),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/admin/stats", Some(&admin)).await;
    assert_eq!(body["pendingApprovals"], json!(0));
    assert_eq!(body["bookedBooths"], json!(0));
    assert_eq!(body["totalRevenue"].as_f64(), Some(0.0));

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/admin/bookings/{booking_id}/status"),
            Some(&admin),
            Some(json!({ "status": "archived" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_of(&body, "message"), "Invalid booking status");
}

#[tokio::test]
async fn payment_is_processed_and_recorded() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let exhibitor = app.register("payer@expo.test", "Payer GmbH").await;
    let booth = app.create_booth(&admin, "P-1", 1000.0).await;
    let (_, body) = app.book(&exhibitor, str_of(&booth, "_id"), 1100.0).await;
    let booking_id = str_of(&body["booking"], "_id").to_string();

    let (status, body) = app
        .post(
            "/api/payments/process",
            Some(&exhibitor),
            json!({ "amount": 1100, "paymentMethod": "card" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let transaction_id = str_of(&body, "transactionId").to_string();
    assert!(transaction_id.starts_with("TXN_"));

    let (status, body) = app
        .post(
            "/api/payments",
            Some(&exhibitor),
            json!({
                "bookingId": booking_id,
                "amount": "1100.00",
                "transactionId": transaction_id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(str_of(&body["payment"], "status"), "completed");

    let (status, body) = app.get("/api/payments", Some(&exhibitor)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payments"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .post("/api/payments/process", Some(&exhibitor), json!({ "amount": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_of(&body, "message"), "Invalid amount");
}

#[tokio::test]
async fn events_are_created_listed_and_deleted() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .post(
            "/api/events",
            Some(&admin),
            json!({
                "title": "Autumn Makers Fair",
                "date": "2030-10-04",
                "time": "09:30",
                "venue": "Expo Centre",
                "city": "Lyon",
                "totalBooths": "40",
                "boothPrice": 850,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let event_id = str_of(&body["event"], "_id").to_string();

    let (status, body) = app.get("/api/events", None).await;
    assert_eq!(status, StatusCode::OK);
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(str_of(&events[0], "name"), "Autumn Makers Fair");

    let (status, _) = app
        .post("/api/events", Some(&admin), json!({ "venue": "Nowhere" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/events/{event_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/api/events/{event_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

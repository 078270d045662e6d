//! Dashboard figures and booth removal over the HTTP API.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, str_of};
use serde_json::json;

#[tokio::test]
async fn revenue_trends_and_platform_stats() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let first = app.register("north@expo.test", "North Co").await;
    let second = app.register("south@expo.test", "South Co").await;

    let a1 = app.create_booth(&admin, "A-1", 1500.0).await;
    let a2 = app.create_booth(&admin, "A-2", 800.0).await;
    app.create_booth(&admin, "A-3", 600.0).await;

    let (status, _) = app.book(&first, str_of(&a1, "_id"), 1650.0).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.book(&second, str_of(&a2, "_id"), 880.0).await;
    assert_eq!(status, StatusCode::CREATED);
    let cancelled = str_of(&body["booking"], "_id").to_string();
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/bookings/{cancelled}/cancel"),
            Some(&second),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Revenue trends: one point per month, cancelled bookings excluded
    let (status, body) = app
        .get("/api/admin/revenue-trends?months=3", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let trends = body["trends"].as_array().unwrap();
    assert_eq!(trends.len(), 3);
    assert!(trends.iter().all(|point| point["month"].is_string()));
    let total: f64 = trends
        .iter()
        .map(|point| point["amount"].as_f64().unwrap())
        .sum();
    assert!((total - 1650.0).abs() < f64::EPSILON);

    let (status, body) = app.get("/api/admin/revenue-trends", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trends"].as_array().unwrap().len(), 6);

    let (status, body) = app
        .get("/api/admin/revenue-trends?months=500", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trends"].as_array().unwrap().len(), 24);

    let (status, _) = app.get("/api/admin/revenue-trends", Some(&first)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Public platform totals need no token
    let (status, body) = app.get("/api/stats", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["totalBooths"], json!(3));
    assert_eq!(body["bookedBooths"], json!(1));
    assert_eq!(body["availableBooths"], json!(2));
    assert_eq!(body["totalBookings"], json!(2));
    assert_eq!(body["confirmedBookings"], json!(1));
    assert_eq!(body["pendingBookings"], json!(0));
    assert_eq!(body["totalUsers"], json!(3));
    assert_eq!(body["activeUsers"], json!(3));
    assert_eq!(body["totalRevenue"].as_f64(), Some(1650.0));
}

#[tokio::test]
async fn booked_booth_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let exhibitor = app.register("holder@expo.test", "Holder Co").await;

    let booth = app.create_booth(&admin, "D-1", 900.0).await;
    let booth_id = str_of(&booth, "_id").to_string();
    let (status, body) = app.book(&exhibitor, &booth_id, 990.0).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let booking_id = str_of(&body["booking"], "_id").to_string();

    for uri in [
        format!("/api/booths/{booth_id}"),
        format!("/api/admin/booths/{booth_id}"),
    ] {
        let (status, body) = app.send(Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::CONFLICT, "{uri}: {body}");
        assert_eq!(
            str_of(&body, "message"),
            "Booth has an active booking; cancel it first"
        );
    }

    let (status, body) = app.get(&format!("/api/booths/{booth_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(str_of(&body, "status"), "booked");

    // Once the booking is cancelled the booth can go
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/bookings/{booking_id}/cancel"),
            Some(&exhibitor),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(Method::DELETE, &format!("/api/booths/{booth_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/booths/{booth_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

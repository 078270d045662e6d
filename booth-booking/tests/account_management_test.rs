//! Account self-service and exhibitor administration over the HTTP API.
//!
//! Password changes, profile edits and suspensions all go through the
//! same user repository the login handler reads.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, str_of, token_of};
use serde_json::json;

#[tokio::test]
async fn change_password_checks_current_and_length() {
    let app = TestApp::spawn().await;
    let token = app.register("rotate@expo.test", "Rotate Co").await;

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/auth/change-password",
            Some(&token),
            Some(json!({ "currentPassword": "not-my-password", "newPassword": "brand-new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_of(&body, "message"), "Current password is incorrect");

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/auth/change-password",
            Some(&token),
            Some(json!({ "currentPassword": "correct-horse", "newPassword": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        str_of(&body, "message"),
        "New password must be at least 8 characters long"
    );

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/auth/change-password",
            Some(&token),
            Some(json!({ "currentPassword": "correct-horse", "newPassword": "brand-new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(str_of(&body, "message"), "Password updated successfully");

    // Only the new password signs in now
    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "rotate@expo.test", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "rotate@expo.test", "password": "brand-new-secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_update_rejects_taken_email() {
    let app = TestApp::spawn().await;
    app.register("first@expo.test", "First Co").await;
    let token = app.register("second@expo.test", "Second Co").await;

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/auth/me",
            Some(&token),
            Some(json!({ "email": "First@Expo.test" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_of(&body, "message"), "Email is already in use");

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/auth/me",
            Some(&token),
            Some(json!({ "companyName": "Second Exhibits", "phone": "+1 555 0199" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(str_of(&body["user"], "email"), "second@expo.test");
    assert_eq!(str_of(&body["user"], "companyName"), "Second Exhibits");
}

#[tokio::test]
async fn suspended_exhibitor_cannot_sign_in() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "firstName": "Sam",
                "lastName": "Ortiz",
                "email": "sam@expo.test",
                "password": "correct-horse",
                "companyName": "Ortiz Stands",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let user_id = str_of(&body["user"], "_id").to_string();

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/exhibitors/{user_id}/status"),
            Some(&admin),
            Some(json!({ "status": "suspended" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_of(&body, "message"), "Invalid account status");

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/exhibitors/{user_id}/status"),
            Some(&admin),
            Some(json!({ "status": "inactive" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(str_of(&body["exhibitor"], "status"), "inactive");

    let credentials = json!({ "email": "sam@expo.test", "password": "correct-horse" });
    let (status, body) = app.post("/api/auth/login", None, credentials.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_of(&body, "message"), "Account is suspended");

    // A wrong password still reads as bad credentials
    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "sam@expo.test", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(str_of(&body, "message"), "Invalid credentials");

    // Reactivation restores access
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/exhibitors/{user_id}/status"),
            Some(&admin),
            Some(json!({ "status": "active" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.post("/api/auth/login", None, credentials).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(!token_of(&body).is_empty());
}

#[tokio::test]
async fn exhibitor_endpoints_are_admin_only() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let exhibitor = app.register("nosy@expo.test", "Nosy Co").await;

    for uri in [
        "/api/exhibitors",
        "/api/exhibitors/stats",
        "/api/exhibitors/export",
    ] {
        let (status, body) = app.get(uri, Some(&exhibitor)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(str_of(&body, "message"), "Admin access required", "{uri}");

        let (status, _) = app.get(uri, Some(&admin)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }

    let (status, body) = app
        .send(
            Method::PATCH,
            "/api/exhibitors/00000000-0000-0000-0000-000000000000/status",
            Some(&exhibitor),
            Some(json!({ "status": "inactive" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(str_of(&body, "message"), "Admin access required");
}

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, EMPLOYER_ID, NEWCOMER_ID};
use serde_json::json;

#[tokio::test]
async fn choosing_talent_creates_a_profile() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/set-role",
            None,
            Some(json!({"userId": NEWCOMER_ID, "role": "talent"})),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User Role Set Successfully");
    assert_eq!(body["data"]["role"], "talent");

    let profiles = app.store.rows("talent_profiles").await;
    assert!(profiles.iter().any(|p| p["user_id"] == NEWCOMER_ID));

    let (status, _) = app
        .request(Method::GET, &format!("/talents/{}", NEWCOMER_ID), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn choosing_employer_creates_no_profile() {
    let app = TestApp::spawn().await;
    let before = app.store.rows("talent_profiles").await.len();

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/set-role",
            None,
            Some(json!({"userId": NEWCOMER_ID, "role": "employer"})),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.store.rows("talent_profiles").await.len(), before);
}

#[tokio::test]
async fn same_role_twice_conflicts() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/set-role",
            None,
            Some(json!({"userId": EMPLOYER_ID, "role": "employer"})),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User role already set.");
}

#[tokio::test]
async fn unknown_user_conflicts() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/set-role",
            None,
            Some(json!({"userId": "aa246da2-d0ff-4df2-a4fb-d3bd0c2b1a11", "role": "talent"})),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User not found.");
}

#[tokio::test]
async fn admin_role_is_not_assignable() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/set-role",
            None,
            Some(json!({"userId": NEWCOMER_ID, "role": "admin"})),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Role is required and must be either employer or talent");
}

#[tokio::test]
async fn new_role_applies_to_the_next_request() {
    let app = TestApp::spawn().await;

    app.request(
        Method::POST,
        "/auth/set-role",
        None,
        Some(json!({"userId": NEWCOMER_ID, "role": "employer"})),
    )
    .await;

    let (status, _) = app
        .request(
            Method::POST,
            "/gigs",
            Some(NEWCOMER_ID),
            Some(json!({"title": "Jazz trio for launch party"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

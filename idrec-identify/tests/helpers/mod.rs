//! Shared test helpers for idrec-identify integration tests
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use idrec_common::db::init_database;
use idrec_common::LinkPrecedence;
use idrec_identify::{build_router, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;

/// Create a temporary contacts database
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let pool = init_database(&temp_dir.path().join("contacts.db"))
        .await
        .expect("Should initialize test database");
    (temp_dir, pool)
}

/// Router over `pool` with a generous lock-retry budget
pub fn setup_app(pool: SqlitePool) -> Router {
    build_router(AppState::new(pool, 10_000))
}

/// Fixed base time so seeded rows have predictable ordering
pub fn at(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(offset_secs)
}

/// Insert a contact row directly, bypassing the resolver
pub async fn seed_contact(
    pool: &SqlitePool,
    email: Option<&str>,
    phone_number: Option<&str>,
    linked_id: Option<i64>,
    created_at: DateTime<Utc>,
) -> i64 {
    let precedence = if linked_id.is_some() {
        LinkPrecedence::Secondary
    } else {
        LinkPrecedence::Primary
    };

    sqlx::query_scalar(
        "INSERT INTO contacts (email, phone_number, linked_id, link_precedence, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(email)
    .bind(phone_number)
    .bind(linked_id)
    .bind(precedence.as_str())
    .bind(created_at)
    .bind(created_at)
    .fetch_one(pool)
    .await
    .expect("Should seed contact")
}

pub async fn count_contacts(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn count_primaries(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE link_precedence = 'primary'")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// (link_precedence, linked_id) of one row
pub async fn link_of(pool: &SqlitePool, id: i64) -> (String, Option<i64>) {
    sqlx::query_as("SELECT link_precedence, linked_id FROM contacts WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// POST a JSON body to /identify, returning status and parsed body
pub async fn post_identify(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/identify")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, request).await
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, body)
}

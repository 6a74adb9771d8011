//! HTTP round trips through the full router

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use beyondthemap_server::auth::create_token;
use beyondthemap_server::models::{Caller, UserRole};
use beyondthemap_server::routes::create_router;
use beyondthemap_server::store::{BookingFilter, Store};

use common::*;

fn bearer(caller: &Caller) -> String {
    let Caller::User { user_id, role } = caller else {
        panic!("guests have no token");
    };
    let token = create_token(*user_id, *role, JWT_SECRET, 3600).unwrap();
    format!("Bearer {}", token)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&Caller>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(caller) = auth {
        request = request.header(header::AUTHORIZATION, bearer(caller));
    }
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn card(booking_id: &str, number: &str) -> Value {
    json!({
        "booking_id": booking_id,
        "card_number": number,
        "cardholder_name": "Yasmine Benali",
        "expiry_date": "09/29",
        "cvv": "321",
    })
}

#[tokio::test]
async fn test_health_reports_store_and_sets_security_headers() {
    let h = Harness::new();
    let app = create_router(h.state.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "in-memory");
}

#[tokio::test]
async fn test_registered_booking_and_card_payment() {
    let h = Harness::new();
    let app = create_router(h.state.clone());
    let agency = agency();
    let traveller = traveller();

    let (status, body) = send(
        &app,
        "POST",
        "/api/tours",
        Some(&agency),
        Some(json!({
            "name": "Sahara overnight camp",
            "location": "Merzouga",
            "price": 700,
            "max_participants": 10,
            "start_date": (h.now() + Duration::days(5)).to_rfc3339(),
            "end_date": (h.now() + Duration::days(6)).to_rfc3339(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let tour_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", "/api/tours", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["current_status"], "upcoming");

    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some(&traveller),
        Some(json!({
            "tour_id": tour_id,
            "booking_date": (h.now() + Duration::days(5)).to_rfc3339(),
            "number_of_participants": 3,
            "payment_method": "fiat",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["payment_status"], "pending");
    assert_eq!(body["data"]["total_price"], 2100);
    let booking_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/payments/confirm",
        Some(&traveller),
        Some(card(&booking_id, DECLINED_CARD)),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"]["code"], "PAYMENT_REQUIRED");

    let (status, body) = send(
        &app,
        "POST",
        "/api/payments/confirm",
        Some(&traveller),
        Some(card(&booking_id, VALID_CARD)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");
    assert_eq!(body["data"]["payment_status"], "paid");

    let (status, _) = send(
        &app,
        "POST",
        "/api/payments/confirm",
        Some(&traveller),
        Some(card(&booking_id, VALID_CARD)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "GET", "/api/payments/history", Some(&traveller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["amount"], 2100);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/tours/{}/reviews", tour_id),
        Some(&traveller),
        Some(json!({ "booking_id": booking_id, "rating": 5, "comment": "Unforgettable" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/tours/{}/bookings", tour_id),
        Some(&agency),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/tours/{}/bookings", tour_id),
        Some(&traveller),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_guest_booking_flow() {
    let h = Harness::new();
    let app = create_router(h.state.clone());
    let tour = h.tour(&agency(), Duration::days(3), Duration::hours(5)).await;
    let booking_date = tour.start_date.unwrap().to_rfc3339();

    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        None,
        Some(json!({
            "tour_id": tour.id,
            "booking_date": booking_date,
            "number_of_participants": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        None,
        Some(json!({
            "tour_id": tour.id,
            "booking_date": booking_date,
            "number_of_participants": 1,
            "payment_method": "fiat",
            "email": "walkin@example.com",
            "customer_name": "Walk In",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["owner"]["kind"], "guest");
    let booking_id = body["data"]["id"].as_str().unwrap().to_string();

    let mut payment = card(&booking_id, VALID_CARD);
    payment["email"] = json!("walkin@example.com");
    let (status, body) = send(&app, "POST", "/api/payments/confirm", None, Some(payment)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/bookings/{}?email=someone@example.com", booking_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/bookings/{}?email=walkin@example.com", booking_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment_status"], "paid");
}

#[tokio::test]
async fn test_auth_failures() {
    let h = Harness::new();
    let app = create_router(h.state.clone());

    let (status, body) = send(&app, "GET", "/api/bookings/my", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MISSING_TOKEN");

    let forged = create_token(Uuid::new_v4(), UserRole::Admin, "another-secret", 3600).unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/bookings/my")
                .header(header::AUTHORIZATION, format!("Bearer {}", forged))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/tours",
        Some(&traveller()),
        Some(json!({
            "name": "Not an agency",
            "location": "Rabat",
            "price": 10,
            "max_participants": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/tours/{}", Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stale_token_is_not_downgraded_to_guest() {
    let h = Harness::new();
    let app = create_router(h.state.clone());
    let tour = h.tour(&agency(), Duration::days(3), Duration::hours(5)).await;
    let request_body = json!({
        "tour_id": tour.id,
        "booking_date": tour.start_date.unwrap().to_rfc3339(),
        "number_of_participants": 1,
        "payment_method": "fiat",
        "email": "member@example.com",
        "customer_name": "Returning Member",
    });

    let expired = create_token(Uuid::new_v4(), UserRole::User, JWT_SECRET, -3600).unwrap();
    for (token, code) in [
        (expired.as_str(), "TOKEN_EXPIRED"),
        ("not-a-jwt", "INVALID_TOKEN"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/bookings")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(request_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], code);
    }

    let bookings = h.store.find_bookings(&BookingFilter::new()).await.unwrap();
    assert!(bookings.is_empty());

    let (status, _) = send(&app, "POST", "/api/bookings", None, Some(request_body)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_payment_methods_are_listed() {
    let h = Harness::new();
    let app = create_router(h.state.clone());

    let (status, body) = send(&app, "GET", "/api/payments/methods", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["id"].as_str())
        .collect();
    assert!(ids.contains(&"card"));
    assert!(ids.contains(&"hedera"));
}

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::{decimal, TestApp, ADMIN_EMAIL};
use rust_decimal_macros::dec;

fn booking_payload(days_ahead: i64) -> Value {
    let date = Utc::now().date_naive() + Duration::days(days_ahead);
    json!({
        "customer_name": "Anita Desai",
        "customer_phone": "9123456780",
        "customer_email": "Anita@Example.com",
        "address": "22 Temple Street, Mylapore",
        "pincode": "600004",
        "service_type": "installation",
        "preferred_date": date.to_string(),
        "time_slot": "morning",
        "issue_description": "New purifier delivered yesterday"
    })
}

#[tokio::test]
async fn booking_lifecycle_with_technician() {
    let app = TestApp::new().await;

    let created = app.post("/api/v1/bookings", booking_payload(3)).await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let booking = created.data().clone();
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["customer_email"], "anita@example.com");
    assert!(booking["booking_number"].as_str().unwrap().starts_with("SRV-"));
    let id = booking["id"].as_str().unwrap();

    let assigned = app
        .put(
            &format!("/api/v1/bookings/{}/technician", id),
            json!({ "technician_name": "Suresh", "technician_phone": "+91 99887 76655" }),
        )
        .await;
    assert_eq!(assigned.status, StatusCode::OK);
    assert_eq!(assigned.data()["technician_phone"], "9988776655");

    let status_uri = format!("/api/v1/bookings/{}/status", id);
    let skip = app.put(&status_uri, json!({ "status": "completed" })).await;
    assert_eq!(skip.status, StatusCode::BAD_REQUEST);

    for status in ["confirmed", "in_progress", "completed"] {
        let response = app.put(&status_uri, json!({ "status": status })).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        assert_eq!(response.data()["status"], status);
    }

    let fetched = app.get(&format!("/api/v1/bookings/{}", id)).await;
    assert!(fetched.data()["confirmed_at"].is_string());
    assert!(fetched.data()["started_at"].is_string());
    assert!(fetched.data()["completed_at"].is_string());

    let cancel_late = app
        .post(
            &format!("/api/v1/bookings/{}/cancel", id),
            json!({ "reason": "Too late to cancel" }),
        )
        .await;
    assert_eq!(cancel_late.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bookings_reject_past_dates_and_bad_pincodes() {
    let app = TestApp::new().await;

    let past = app.post("/api/v1/bookings", booking_payload(-1)).await;
    assert_eq!(past.status, StatusCode::BAD_REQUEST);

    let mut payload = booking_payload(2);
    payload["pincode"] = json!("60004");
    let bad_pincode = app.post("/api/v1/bookings", payload).await;
    assert_eq!(bad_pincode.status, StatusCode::BAD_REQUEST);

    let mut payload = booking_payload(2);
    payload["order_id"] = json!("6f1c1a40-3c86-4d0b-9b35-1f7c0f0c1a11");
    let unknown_order = app.post("/api/v1/bookings", payload).await;
    assert_eq!(unknown_order.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancelling_a_booking_needs_a_reason() {
    let app = TestApp::new().await;
    let created = app.post("/api/v1/bookings", booking_payload(1)).await;
    let id = created.data()["id"].as_str().unwrap().to_string();

    let no_reason = app
        .put(
            &format!("/api/v1/bookings/{}/status", id),
            json!({ "status": "cancelled" }),
        )
        .await;
    assert_eq!(no_reason.status, StatusCode::BAD_REQUEST);

    let cancelled = app
        .post(
            &format!("/api/v1/bookings/{}/cancel", id),
            json!({ "reason": "Moving house" }),
        )
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.data()["cancellation_reason"], "Moving house");

    let listed = app.get("/api/v1/bookings?status=cancelled").await;
    assert_eq!(listed.data()["total"], 1);
}

#[tokio::test]
async fn booking_emails_customer_and_seller() {
    let app = TestApp::new().await;
    let created = app.post("/api/v1/bookings", booking_payload(2)).await;
    let number = created.data()["booking_number"].as_str().unwrap().to_string();

    let sent = app.wait_for_emails(2).await;
    assert!(sent
        .iter()
        .any(|m| m.to == "anita@example.com"
            && m.subject == format!("Service booking {} received", number)));
    assert!(sent.iter().any(|m| m.to == ADMIN_EMAIL));
}

#[tokio::test]
async fn chat_greets_and_keeps_history() {
    let app = TestApp::new().await;

    let first = app.post("/api/v1/chat", json!({ "message": "Hello!" })).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.data()["intent"], "greeting");
    let session = first.data()["session_id"].as_str().unwrap().to_string();
    assert!(session.starts_with("chat-"));

    let second = app
        .post(
            "/api/v1/chat",
            json!({ "message": "Do you do installation?", "session_id": session }),
        )
        .await;
    assert_eq!(second.data()["intent"], "installation");
    assert_eq!(second.data()["session_id"], session.as_str());

    let history = app.get(&format!("/api/v1/chat/sessions/{}", session)).await;
    assert_eq!(history.status, StatusCode::OK);
    let messages = history.data().as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "Hello!");

    let missing = app.get("/api/v1/chat/sessions/chat-unknown").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_reports_order_status() {
    let app = TestApp::new().await;
    let product = app.seed_product("RO-CHAT", "9999", 5).await;
    let order = app.place_order(product["id"].as_str().unwrap(), 1, "cod").await;
    let number = order["order_number"].as_str().unwrap();

    let reply = app
        .post(
            "/api/v1/chat",
            json!({ "message": format!("where is {}?", number.to_lowercase()) }),
        )
        .await;
    assert_eq!(reply.data()["intent"], "order_status");
    let text = reply.data()["reply"].as_str().unwrap();
    assert!(text.contains(number));
    assert!(text.contains("pending"));
}

#[tokio::test]
async fn chat_quotes_live_prices() {
    let app = TestApp::new().await;
    app.seed_product("RO-CHEAP", "7499", 5).await;
    app.seed_product("RO-PREMIUM", "21999", 5).await;

    let reply = app
        .post("/api/v1/chat", json!({ "message": "What is the price?" }))
        .await;
    assert_eq!(reply.data()["intent"], "pricing");
    assert!(reply.data()["reply"].as_str().unwrap().contains("₹7499"));
}

#[tokio::test]
async fn chat_turns_a_number_into_a_call_request() {
    let app = TestApp::new().await;

    let reply = app
        .post(
            "/api/v1/chat",
            json!({ "message": "Please call me back on 98450 12345", "name": "Vikram" }),
        )
        .await;
    assert_eq!(reply.data()["intent"], "callback");
    let call_id = reply.data()["call_request_id"].as_str().unwrap().to_string();

    let request = app.get(&format!("/api/v1/call-requests/{}", call_id)).await;
    assert_eq!(request.data()["source"], "chatbot");
    assert_eq!(request.data()["phone"], "9845012345");
    assert_eq!(request.data()["name"], "Vikram");

    let without_number = app
        .post("/api/v1/chat", json!({ "message": "call me" }))
        .await;
    assert!(without_number.data()["call_request_id"].is_null());
}

#[tokio::test]
async fn chat_callback_completes_when_the_number_follows() {
    let app = TestApp::new().await;

    let prompt = app
        .post("/api/v1/chat", json!({ "message": "call me", "name": "Meena" }))
        .await;
    assert_eq!(prompt.data()["intent"], "callback");
    assert!(prompt.data()["call_request_id"].is_null());
    let session = prompt.data()["session_id"].as_str().unwrap().to_string();

    let answer = app
        .post(
            "/api/v1/chat",
            json!({ "message": "hi, it is 98450-12345", "session_id": session, "name": "Meena" }),
        )
        .await;
    assert_eq!(answer.status, StatusCode::OK, "{}", answer.body);
    assert_eq!(answer.data()["intent"], "callback");
    let call_id = answer.data()["call_request_id"].as_str().unwrap().to_string();

    let request = app.get(&format!("/api/v1/call-requests/{}", call_id)).await;
    assert_eq!(request.data()["phone"], "9845012345");
    assert_eq!(request.data()["name"], "Meena");

    let bare = app
        .post("/api/v1/chat", json!({ "message": "9000022222" }))
        .await;
    assert_eq!(bare.data()["intent"], "callback");
    assert!(bare.data()["call_request_id"].is_string());

    let greeting = app
        .post("/api/v1/chat", json!({ "message": "hello 9000033333" }))
        .await;
    assert_eq!(greeting.data()["intent"], "greeting");
    assert!(greeting.data()["call_request_id"].is_null());
}

#[tokio::test]
async fn notifications_can_be_read_and_removed() {
    let app = TestApp::new().await;
    app.post("/api/v1/bookings", booking_payload(2)).await;
    app.post(
        "/api/v1/call-requests",
        json!({ "name": "Kiran", "phone": "9000011111", "reason": "Need a demo" }),
    )
    .await;

    let listed = app.wait_for_notifications(2).await;
    assert_eq!(listed["total"], 2);

    let unread = app.get("/api/v1/notifications/unread-count").await;
    assert_eq!(unread.data()["unread"], 2);

    let first_id = listed["items"][0]["id"].as_str().unwrap().to_string();
    let read = app
        .post(&format!("/api/v1/notifications/{}/read", first_id), json!({}))
        .await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.data()["is_read"], true);

    let unread_only = app.get("/api/v1/notifications?unread_only=true").await;
    assert_eq!(unread_only.data()["total"], 1);

    let bookings_only = app.get("/api/v1/notifications?kind=booking").await;
    assert_eq!(bookings_only.data()["total"], 1);

    let all_read = app.post("/api/v1/notifications/read-all", json!({})).await;
    assert_eq!(all_read.data()["updated"], 1);

    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/v1/notifications/{}", first_id),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let remaining = app.get("/api/v1/notifications").await;
    assert_eq!(remaining.data()["total"], 1);
}

#[tokio::test]
async fn dashboard_summarises_the_shop() {
    let app = TestApp::new().await;
    let product = app.seed_product("RO-DASH", "9999", 6).await;
    app.seed_product("RO-EMPTY", "12999", 0).await;
    let product_id = product["id"].as_str().unwrap();

    let kept = app.place_order(product_id, 1, "cod").await;
    let dropped = app.place_order(product_id, 1, "cod").await;
    app.post(
        &format!("/api/v1/orders/{}/cancel", dropped["id"].as_str().unwrap()),
        json!({ "reason": "Changed mind" }),
    )
    .await;
    app.confirm_order(kept["id"].as_str().unwrap()).await;
    app.post("/api/v1/bookings", booking_payload(4)).await;
    app.post(
        "/api/v1/call-requests",
        json!({ "name": "Kiran", "phone": "9000011111", "reason": "RO not working" }),
    )
    .await;

    let response = app.get("/api/v1/dashboard/summary").await;
    assert_eq!(response.status, StatusCode::OK);
    let summary = response.data();
    assert_eq!(summary["total_products"], 2);
    assert_eq!(summary["low_stock_products"], 2);
    assert_eq!(summary["total_orders"], 2);
    assert_eq!(summary["pending_orders"], 0);
    assert_eq!(summary["orders_by_status"]["confirmed"], 1);
    assert_eq!(summary["orders_by_status"]["cancelled"], 1);
    assert_eq!(decimal(&summary["revenue"]), dec!(9999));
    assert_eq!(summary["currency"], "INR");
    assert_eq!(summary["bookings_by_status"]["pending"], 1);
    assert_eq!(summary["open_call_requests"], 1);
    assert_eq!(summary["high_priority_call_requests"], 1);
}

#[tokio::test]
async fn geolocation_prefills_addresses() {
    let app = TestApp::new().await;

    let reverse = app.get("/api/v1/geo/reverse?lat=12.9716&lon=77.5946").await;
    assert_eq!(reverse.status, StatusCode::OK, "{}", reverse.body);
    assert_eq!(reverse.data()["pincode"], "560001");

    let out_of_range = app.get("/api/v1/geo/reverse?lat=123.0&lon=77.5").await;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);

    let pincode = app.get("/api/v1/geo/pincode/560001").await;
    assert_eq!(pincode.data()["city"], "Bengaluru");

    let bad = app.get("/api/v1/geo/pincode/0560").await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_and_status_report_ready() {
    let app = TestApp::new().await;

    let health = app.get("/api/v1/health").await;
    assert_eq!(health.status, StatusCode::OK);

    let status = app.get("/api/v1/status").await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.data()["courier"], "scripted");

    let docs = app.get("/api-docs/openapi.json").await;
    assert_eq!(docs.status, StatusCode::OK);
    assert_eq!(docs.body["info"]["title"], "AquaCare API");
}

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{decimal, TestApp};
use rust_decimal_macros::dec;

async fn confirmed_order(app: &TestApp, quantity: i32, payment_method: &str) -> Value {
    let product = app.seed_product("RO-SHIP", "14999", 20).await;
    let order = app
        .place_order(product["id"].as_str().unwrap(), quantity, payment_method)
        .await;
    app.confirm_order(order["id"].as_str().unwrap()).await;
    order
}

#[tokio::test]
async fn quote_stacks_units_into_one_package() {
    let app = TestApp::new().await;
    let order = confirmed_order(&app, 2, "prepaid").await;

    let response = app
        .get(&format!(
            "/api/v1/orders/{}/shipping-quote",
            order["id"].as_str().unwrap()
        ))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let quote = response.data();
    assert_eq!(quote["delivery_pincode"], "560038");
    assert_eq!(quote["package"]["weight_kg"], 17.0);
    assert_eq!(quote["package"]["length_cm"], 38.0);
    assert_eq!(quote["package"]["breadth_cm"], 26.0);
    assert_eq!(quote["package"]["height_cm"], 100.0);
    assert_eq!(quote["package"]["chargeable_weight_kg"], 19.76);
    assert_eq!(quote["package"]["estimated"], false);
    assert_eq!(quote["package"]["item_count"], 2);

    assert_eq!(quote["rates"].as_array().unwrap().len(), 3);
    assert_eq!(quote["cheapest"]["courier_name"], "Xpressbees");

    let sent = app.courier.rate_requests.lock().unwrap().clone();
    assert_eq!(sent[0].pickup_pincode, "110001");
    assert!((sent[0].weight_kg - 19.76).abs() < 1e-9);
}

#[tokio::test]
async fn cod_quotes_skip_couriers_without_cod() {
    let app = TestApp::new().await;
    let order = confirmed_order(&app, 1, "cod").await;

    let response = app
        .get(&format!(
            "/api/v1/orders/{}/shipping-quote",
            order["id"].as_str().unwrap()
        ))
        .await;
    let quote = response.data();
    assert_eq!(quote["cod"], true);
    assert_eq!(quote["rates"].as_array().unwrap().len(), 2);
    assert_eq!(quote["cheapest"]["courier_name"], "Delhivery Surface");
}

#[tokio::test]
async fn storefront_estimate_validates_pincode() {
    let app = TestApp::new().await;
    let product = app.seed_product("RO-EST", "9999", 5).await;
    let id = product["id"].as_str().unwrap();

    let ok = app
        .get(&format!(
            "/api/v1/shipping/estimate?product_id={}&pincode=560038&quantity=1",
            id
        ))
        .await;
    assert_eq!(ok.status, StatusCode::OK, "{}", ok.body);
    assert_eq!(ok.data()["package"]["weight_kg"], 8.5);
    assert_eq!(decimal(&ok.data()["cheapest"]["rate"]), dec!(120));

    let bad = app
        .get(&format!(
            "/api/v1/shipping/estimate?product_id={}&pincode=56003",
            id
        ))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn shipping_books_cheapest_courier_and_ships_order() {
    let app = TestApp::new().await;
    let order = confirmed_order(&app, 1, "prepaid").await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .post(&format!("/api/v1/orders/{}/shipments", order_id), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

    let shipment = response.data();
    assert_eq!(shipment["provider"], "scripted");
    assert_eq!(shipment["courier_id"], 3);
    assert_eq!(shipment["courier_name"], "Xpressbees");
    assert_eq!(shipment["awb_code"], "AWB1234567890");
    assert_eq!(shipment["status"], "created");
    assert_eq!(decimal(&shipment["freight_charge"]), dec!(120));

    let booked = app.courier.booked();
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].order_number, order["order_number"].as_str().unwrap());
    assert_eq!(booked[0].items[0].units, 1);

    let updated = app.get(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(updated.data()["status"], "shipped");
    assert_eq!(updated.data()["tracking_number"], "AWB1234567890");
    assert_eq!(updated.data()["courier_name"], "Xpressbees");

    let again = app
        .post(&format!("/api/v1/orders/{}/shipments", order_id), json!({}))
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chosen_courier_must_be_quoted() {
    let app = TestApp::new().await;
    let order = confirmed_order(&app, 1, "prepaid").await;
    let uri = format!("/api/v1/orders/{}/shipments", order["id"].as_str().unwrap());

    let unknown = app.post(&uri, json!({ "courier_id": 99 })).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert!(app.courier.booked().is_empty());

    let chosen = app.post(&uri, json!({ "courier_id": 12 })).await;
    assert_eq!(chosen.status, StatusCode::CREATED);
    assert_eq!(chosen.data()["courier_name"], "Blue Dart");
}

#[tokio::test]
async fn pending_orders_cannot_ship() {
    let app = TestApp::new().await;
    let product = app.seed_product("RO-PEND", "9999", 5).await;
    let order = app.place_order(product["id"].as_str().unwrap(), 1, "cod").await;

    let response = app
        .post(
            &format!("/api/v1/orders/{}/shipments", order["id"].as_str().unwrap()),
            json!({}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_awb_keeps_order_processing() {
    let app = TestApp::new().await;
    app.courier.set_awb(None);
    let order = confirmed_order(&app, 1, "prepaid").await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .post(&format!("/api/v1/orders/{}/shipments", order_id), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.data()["awb_code"].is_null());

    let updated = app.get(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(updated.data()["status"], "processing");
    assert!(updated.data()["tracking_number"].is_null());

    let duplicate = app
        .post(&format!("/api/v1/orders/{}/shipments", order_id), json!({}))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn courier_failure_stores_nothing() {
    let app = TestApp::new().await;
    app.courier.fail_bookings();
    let order = confirmed_order(&app, 1, "prepaid").await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .post(&format!("/api/v1/orders/{}/shipments", order_id), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);

    let shipments = app
        .get(&format!("/api/v1/orders/{}/shipments", order_id))
        .await;
    assert_eq!(shipments.data(), &json!([]));

    let unchanged = app.get(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(unchanged.data()["status"], "confirmed");
}

#[tokio::test]
async fn order_cancelled_during_booking_is_not_shipped() {
    let app = TestApp::new().await;
    let order = confirmed_order(&app, 1, "prepaid").await;
    let order_id = order["id"].as_str().unwrap();
    app.courier.cancel_orders_while_booking(app.state.db.clone());

    let response = app
        .post(&format!("/api/v1/orders/{}/shipments", order_id), json!({}))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT, "{}", response.body);
    assert_eq!(app.courier.booked().len(), 1);

    let shipments = app
        .get(&format!("/api/v1/orders/{}/shipments", order_id))
        .await;
    assert_eq!(shipments.data(), &json!([]));

    let order_now = app.get(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(order_now.data()["status"], "cancelled");
    assert!(order_now.data()["tracking_number"].is_null());
}

#[tokio::test]
async fn delivery_completes_cod_order() {
    let app = TestApp::new().await;
    let order = confirmed_order(&app, 1, "cod").await;
    let order_id = order["id"].as_str().unwrap();

    let shipment = app
        .post(&format!("/api/v1/orders/{}/shipments", order_id), json!({}))
        .await;
    let shipment_id = shipment.data()["id"].as_str().unwrap().to_string();

    let in_transit = app
        .post(&format!("/api/v1/shipments/{}/in-transit", shipment_id), json!({}))
        .await;
    assert_eq!(in_transit.status, StatusCode::OK);
    assert_eq!(in_transit.data()["status"], "in_transit");

    let delivered = app
        .post(&format!("/api/v1/shipments/{}/deliver", shipment_id), json!({}))
        .await;
    assert_eq!(delivered.status, StatusCode::OK);
    assert_eq!(delivered.data()["status"], "delivered");
    assert!(delivered.data()["delivered_at"].is_string());

    let completed = app.get(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(completed.data()["status"], "delivered");
    assert_eq!(completed.data()["payment_status"], "paid");

    let cancel_late = app
        .post(&format!("/api/v1/shipments/{}/cancel", shipment_id), json!({}))
        .await;
    assert_eq!(cancel_late.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancelled_shipment_returns_order_to_processing() {
    let app = TestApp::new().await;
    let order = confirmed_order(&app, 1, "prepaid").await;
    let order_id = order["id"].as_str().unwrap();

    let shipment = app
        .post(&format!("/api/v1/orders/{}/shipments", order_id), json!({}))
        .await;
    let shipment_id = shipment.data()["id"].as_str().unwrap().to_string();

    let refused = app
        .post(
            &format!("/api/v1/orders/{}/cancel", order_id),
            json!({ "reason": "Customer cancelled" }),
        )
        .await;
    assert_eq!(refused.status, StatusCode::CONFLICT);

    let cancelled = app
        .post(&format!("/api/v1/shipments/{}/cancel", shipment_id), json!({}))
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.data()["status"], "cancelled");

    let order_now = app.get(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(order_now.data()["status"], "processing");
    assert!(order_now.data()["tracking_number"].is_null());

    let rebooked = app
        .post(&format!("/api/v1/orders/{}/shipments", order_id), json!({}))
        .await;
    assert_eq!(rebooked.status, StatusCode::CREATED);

    let history = app
        .get(&format!("/api/v1/orders/{}/shipments", order_id))
        .await;
    assert_eq!(history.data().as_array().unwrap().len(), 2);

    let active = app.get("/api/v1/shipments?status=created").await;
    assert_eq!(active.data()["total"], 1);

    let mut cancelled_note = None;
    for _ in 0..100 {
        let notes = app.get("/api/v1/notifications?kind=shipment&limit=100").await;
        cancelled_note = notes.data()["items"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["title"] == "Shipment cancelled")
            .cloned();
        if cancelled_note.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let note = cancelled_note.expect("shipment cancelled notification");
    assert!(note["message"].as_str().unwrap().ends_with("back in processing"));
}

#[tokio::test]
async fn booked_orders_move_only_through_their_shipment() {
    let app = TestApp::new().await;
    let order = confirmed_order(&app, 1, "prepaid").await;
    let order_id = order["id"].as_str().unwrap();

    let shipment = app
        .post(&format!("/api/v1/orders/{}/shipments", order_id), json!({}))
        .await;
    let shipment_id = shipment.data()["id"].as_str().unwrap().to_string();

    let manual = app
        .put(
            &format!("/api/v1/orders/{}/status", order_id),
            json!({ "status": "delivered" }),
        )
        .await;
    assert_eq!(manual.status, StatusCode::CONFLICT, "{}", manual.body);
    let still_shipped = app.get(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(still_shipped.data()["status"], "shipped");
    assert_eq!(still_shipped.data()["tracking_number"], "AWB1234567890");

    let delivered = app
        .post(&format!("/api/v1/shipments/{}/deliver", shipment_id), json!({}))
        .await;
    assert_eq!(delivered.status, StatusCode::OK, "{}", delivered.body);

    let cancel_after = app
        .post(&format!("/api/v1/shipments/{}/cancel", shipment_id), json!({}))
        .await;
    assert_eq!(cancel_after.status, StatusCode::BAD_REQUEST);

    let final_order = app.get(&format!("/api/v1/orders/{}", order_id)).await;
    assert_eq!(final_order.data()["status"], "delivered");
    assert_eq!(final_order.data()["tracking_number"], "AWB1234567890");
}

#[tokio::test]
async fn unbooked_orders_still_ship_by_hand() {
    let app = TestApp::new().await;
    app.courier.set_awb(None);
    let order = confirmed_order(&app, 1, "prepaid").await;
    let order_id = order["id"].as_str().unwrap();

    let shipment = app
        .post(&format!("/api/v1/orders/{}/shipments", order_id), json!({}))
        .await;
    let shipment_id = shipment.data()["id"].as_str().unwrap().to_string();

    let blocked = app
        .put(
            &format!("/api/v1/orders/{}/status", order_id),
            json!({ "status": "shipped", "tracking_number": "HAND-1" }),
        )
        .await;
    assert_eq!(blocked.status, StatusCode::CONFLICT);

    app.post(&format!("/api/v1/shipments/{}/cancel", shipment_id), json!({}))
        .await;
    let by_hand = app
        .put(
            &format!("/api/v1/orders/{}/status", order_id),
            json!({ "status": "shipped", "tracking_number": "HAND-1" }),
        )
        .await;
    assert_eq!(by_hand.status, StatusCode::OK, "{}", by_hand.body);
    assert_eq!(by_hand.data()["tracking_number"], "HAND-1");
}

#[tokio::test]
async fn shipment_emails_tracking_details() {
    let app = TestApp::new().await;
    let order = confirmed_order(&app, 1, "prepaid").await;
    let number = order["order_number"].as_str().unwrap().to_string();

    app.post(
        &format!("/api/v1/orders/{}/shipments", order["id"].as_str().unwrap()),
        json!({}),
    )
    .await;

    // confirmation + seller alert + confirmed update + dispatch + shipped update
    let sent = app.wait_for_emails(5).await;
    let dispatch = sent
        .iter()
        .find(|m| m.subject == format!("Order {} is on its way", number))
        .expect("dispatch email");
    assert!(dispatch.body.contains("AWB1234567890"));
    assert!(dispatch.body.contains("Xpressbees"));
}

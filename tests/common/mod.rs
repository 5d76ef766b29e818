#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use aquacare_api::{
    build_router,
    config::AppConfig,
    db::{self, DbConfig},
    entities::order::{self, OrderStatus},
    errors::ServiceError,
    events::{self, EventHandler, EventSender},
    handlers::AppServices,
    notifications::{EmailMessage, Mailer, NotificationDispatcher},
    services::{
        courier::{CourierClient, CourierRate, CreatedShipment, RateRequest, ShipmentRequest},
        geocoding::{Address, Coordinates, Geocoder, PincodeLocation},
    },
    AppState,
};
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveEnum, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "seller@aquacare.test";

/// Courier double returning canned rates and bookings
pub struct ScriptedCourier {
    rates: Mutex<Vec<CourierRate>>,
    awb_code: Mutex<Option<String>>,
    fail_booking: Mutex<bool>,
    cancel_while_booking: Mutex<Option<Arc<DatabaseConnection>>>,
    pub rate_requests: Mutex<Vec<RateRequest>>,
    pub shipment_requests: Mutex<Vec<ShipmentRequest>>,
}

impl Default for ScriptedCourier {
    fn default() -> Self {
        Self {
            rates: Mutex::new(vec![
                rate(7, "Delhivery Surface", Decimal::new(145, 0), true),
                rate(3, "Xpressbees", Decimal::new(120, 0), false),
                rate(12, "Blue Dart", Decimal::new(260, 0), true),
            ]),
            awb_code: Mutex::new(Some("AWB1234567890".to_string())),
            fail_booking: Mutex::new(false),
            cancel_while_booking: Mutex::new(None),
            rate_requests: Mutex::new(Vec::new()),
            shipment_requests: Mutex::new(Vec::new()),
        }
    }
}

pub fn rate(courier_id: i64, name: &str, amount: Decimal, cod: bool) -> CourierRate {
    CourierRate {
        courier_id,
        courier_name: name.to_string(),
        rate: amount,
        estimated_delivery_days: Some(4),
        etd: None,
        cod_available: cod,
    }
}

impl ScriptedCourier {
    pub fn set_rates(&self, rates: Vec<CourierRate>) {
        *self.rates.lock().unwrap() = rates;
    }

    pub fn set_awb(&self, awb: Option<&str>) {
        *self.awb_code.lock().unwrap() = awb.map(str::to_string);
    }

    pub fn fail_bookings(&self) {
        *self.fail_booking.lock().unwrap() = true;
    }

    /// Cancels the order in `db` while the courier is still booking it
    pub fn cancel_orders_while_booking(&self, db: Arc<DatabaseConnection>) {
        *self.cancel_while_booking.lock().unwrap() = Some(db);
    }

    pub fn booked(&self) -> Vec<ShipmentRequest> {
        self.shipment_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CourierClient for ScriptedCourier {
    fn provider(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_rates(&self, request: &RateRequest) -> Result<Vec<CourierRate>, ServiceError> {
        self.rate_requests.lock().unwrap().push(request.clone());
        Ok(self.rates.lock().unwrap().clone())
    }

    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, ServiceError> {
        if *self.fail_booking.lock().unwrap() {
            return Err(ServiceError::ExternalServiceError(
                "Courier rejected the order".to_string(),
            ));
        }
        let interfering = self.cancel_while_booking.lock().unwrap().clone();
        if let Some(db) = interfering {
            order::Entity::update_many()
                .col_expr(order::Column::Status, Expr::value(OrderStatus::Cancelled.to_value()))
                .filter(order::Column::OrderNumber.eq(request.order_number.as_str()))
                .exec(&*db)
                .await
                .expect("cancel order during booking");
        }
        let mut booked = self.shipment_requests.lock().unwrap();
        booked.push(request.clone());
        Ok(CreatedShipment {
            provider_order_id: format!("SR-{}", 1000 + booked.len()),
            provider_shipment_id: format!("SH-{}", 5000 + booked.len()),
            awb_code: self.awb_code.lock().unwrap().clone(),
            courier_id: request.courier_id,
            courier_name: None,
        })
    }
}

/// Mailer that keeps every message in memory
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), ServiceError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Geocoder answering every lookup from a fixed Bengaluru address
pub struct FixedGeocoder;

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn reverse(&self, _point: Coordinates) -> Result<Address, ServiceError> {
        Ok(Address {
            line: Some("12 MG Road".to_string()),
            city: Some("Bengaluru".to_string()),
            state: Some("Karnataka".to_string()),
            pincode: Some("560001".to_string()),
            country: Some("India".to_string()),
            display_name: "12 MG Road, Bengaluru, Karnataka 560001, India".to_string(),
        })
    }

    async fn lookup_pincode(&self, pincode: &str) -> Result<PincodeLocation, ServiceError> {
        Ok(PincodeLocation {
            pincode: pincode.to_string(),
            city: Some("Bengaluru".to_string()),
            state: Some("Karnataka".to_string()),
            country: Some("India".to_string()),
            coordinates: None,
        })
    }
}

/// Application wired to an in-memory SQLite database, a scripted courier and
/// a recording mailer.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub courier: Arc<ScriptedCourier>,
    pub mailer: Arc<RecordingMailer>,
    _event_task: tokio::task::JoinHandle<()>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.email.admin_email = Some(ADMIN_EMAIL.to_string());
        configure(&mut cfg);

        let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .expect("in-memory database");
        db::run_migrations(&pool).await.expect("migrations");
        let pool = Arc::new(pool);

        let (tx, rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(tx));

        let courier = Arc::new(ScriptedCourier::default());
        let mailer = Arc::new(RecordingMailer::default());

        let services = AppServices::new(
            pool.clone(),
            event_sender,
            &cfg,
            courier.clone(),
            Arc::new(FixedGeocoder),
        );

        let dispatcher: Arc<dyn EventHandler> = Arc::new(NotificationDispatcher::new(
            pool.clone(),
            (*services.notifications).clone(),
            mailer.clone(),
            cfg.email.admin_email.clone(),
        ));
        let event_task = tokio::spawn(events::process_events(rx, Some(dispatcher)));

        let state = AppState::new(pool, cfg, services);
        let router = build_router(state.clone());

        Self {
            router,
            state,
            courier,
            mailer,
            _event_task: event_task,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error during test request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body)).await
    }

    /// Creates a product whose specifications give the package calculator
    /// real measurements.
    pub async fn seed_product(&self, sku: &str, price: &str, stock: i32) -> Value {
        let response = self
            .post(
                "/api/v1/products",
                json!({
                    "sku": sku,
                    "name": format!("AquaCare {}", sku),
                    "description": "7 stage RO+UV+UF purifier",
                    "category": "RO Purifiers",
                    "price": price,
                    "stock_quantity": stock,
                    "specifications": {
                        "Weight": "8.5 kg",
                        "Dimensions": "38 x 26 x 50 cm",
                        "Storage": "8 L"
                    }
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.data().clone()
    }

    pub async fn place_order(&self, product_id: &str, quantity: i32, payment_method: &str) -> Value {
        let response = self
            .post("/api/v1/orders", order_payload(product_id, quantity, payment_method))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.data().clone()
    }

    pub async fn confirm_order(&self, order_id: &str) {
        let response = self
            .put(
                &format!("/api/v1/orders/{}/status", order_id),
                json!({ "status": "confirmed" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    }

    /// Polls until the dispatcher has sent at least `count` emails
    pub async fn wait_for_emails(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..100 {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.mailer.sent()
    }

    /// Polls until at least `count` seller notifications exist
    pub async fn wait_for_notifications(&self, count: u64) -> Value {
        let mut last = Value::Null;
        for _ in 0..100 {
            let response = self.get("/api/v1/notifications?limit=100").await;
            if response.data()["total"].as_u64().unwrap_or(0) >= count {
                return response.data().clone();
            }
            last = response.data().clone();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        last
    }
}

pub fn order_payload(product_id: &str, quantity: i32, payment_method: &str) -> Value {
    json!({
        "customer_name": "Priya Sharma",
        "customer_email": "Priya@Example.com",
        "customer_phone": "+91 98765 43210",
        "address_line1": "Flat 4B, Lake View Apartments",
        "address_line2": "Indiranagar",
        "city": "Bengaluru",
        "state": "Karnataka",
        "pincode": "560038",
        "payment_method": payment_method,
        "items": [
            { "product_id": product_id, "quantity": quantity }
        ]
    })
}

pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {}", other),
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

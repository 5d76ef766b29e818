//! AquaCare API
//!
//! Storefront and seller-dashboard backend for a water purifier retailer:
//! catalog, orders, courier shipping, service bookings, call-back requests,
//! a rule-based chatbot and seller notifications.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod notifications;
pub mod openapi;
pub mod rate_limiter;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use utoipa::ToSchema;

use crate::rate_limiter::{rate_limit_middleware, RateLimitConfig, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        services: handlers::AppServices,
    ) -> Self {
        let rate_limiter = RateLimiter::in_memory(RateLimitConfig::from(&config));
        Self {
            db,
            config,
            services,
            rate_limiter,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = PaginatedResponse::new(vec![1, 2], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        let empty = PaginatedResponse::<u8>::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes(rate_limiter: RateLimiter) -> Router<AppState> {
    // Anonymous storefront writes share one per-client budget
    let public_writes = Router::new()
        .route(
            "/call-requests",
            post(handlers::call_requests::create_call_request),
        )
        .route("/chat", post(handlers::chat::send_message))
        .route("/bookings", post(handlers::bookings::create_booking))
        .route_layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let products = Router::new()
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/categories",
            get(handlers::products::list_categories),
        )
        .route(
            "/products/low-stock",
            get(handlers::products::low_stock_products),
        )
        .route(
            "/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route("/products/:id/stock", post(handlers::products::adjust_stock));

    let orders = Router::new()
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/items", get(handlers::orders::get_order_items))
        .route(
            "/orders/by-number/:order_number",
            get(handlers::orders::get_order_by_number),
        )
        .route(
            "/orders/:id/status",
            put(handlers::orders::update_order_status),
        )
        .route("/orders/:id/cancel", post(handlers::orders::cancel_order))
        .route(
            "/orders/:id/payment",
            put(handlers::orders::update_payment_status),
        )
        .route(
            "/orders/:id/shipping-quote",
            get(handlers::shipments::order_shipping_quote),
        )
        .route(
            "/orders/:id/shipments",
            get(handlers::shipments::list_order_shipments)
                .post(handlers::shipments::create_order_shipment),
        )
        .route("/customers", get(handlers::orders::list_customers));

    let shipments = Router::new()
        .route(
            "/shipping/estimate",
            get(handlers::shipments::shipping_estimate),
        )
        .route("/shipments", get(handlers::shipments::list_shipments))
        .route("/shipments/:id", get(handlers::shipments::get_shipment))
        .route(
            "/shipments/:id/in-transit",
            post(handlers::shipments::mark_in_transit),
        )
        .route(
            "/shipments/:id/deliver",
            post(handlers::shipments::mark_delivered),
        )
        .route(
            "/shipments/:id/cancel",
            post(handlers::shipments::cancel_shipment),
        );

    let bookings = Router::new()
        .route("/bookings", get(handlers::bookings::list_bookings))
        .route("/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/bookings/:id/status",
            put(handlers::bookings::update_booking_status),
        )
        .route(
            "/bookings/:id/technician",
            put(handlers::bookings::assign_technician),
        )
        .route(
            "/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        );

    let call_requests = Router::new()
        .route(
            "/call-requests",
            get(handlers::call_requests::list_call_requests),
        )
        .route(
            "/call-requests/:id",
            get(handlers::call_requests::get_call_request)
                .delete(handlers::call_requests::delete_call_request),
        )
        .route(
            "/call-requests/:id/status",
            put(handlers::call_requests::update_call_status),
        )
        .route(
            "/call-requests/:id/priority",
            put(handlers::call_requests::update_call_priority),
        );

    let chat = Router::new().route(
        "/chat/sessions/:session_id",
        get(handlers::chat::session_history),
    );

    let notifications = Router::new()
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/unread-count",
            get(handlers::notifications::unread_count),
        )
        .route(
            "/notifications/read-all",
            post(handlers::notifications::mark_all_read),
        )
        .route(
            "/notifications/:id/read",
            post(handlers::notifications::mark_read),
        )
        .route(
            "/notifications/:id",
            delete(handlers::notifications::delete_notification),
        );

    let geo = Router::new()
        .route("/geo/reverse", get(handlers::geo::reverse_geocode))
        .route("/geo/pincode/:pincode", get(handlers::geo::lookup_pincode));

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(products)
        .merge(orders)
        .merge(shipments)
        .merge(bookings)
        .merge(call_requests)
        .merge(chat)
        .merge(notifications)
        .merge(geo)
        .route("/dashboard/summary", get(handlers::dashboard::summary))
        .merge(public_writes)
}

/// Explicit origins when configured, otherwise permissive in development
/// and same-origin only elsewhere
fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!("Using permissive CORS; no explicit origins configured");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// Full application: `/api/v1`, Swagger UI and the shared middleware stack
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let rate_limiter = state.rate_limiter.clone();

    Router::<AppState>::new()
        .route("/", get(|| async { "aquacare-api up" }))
        .nest("/api/v1", api_v1_routes(rate_limiter))
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "service": "aquacare-api",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "courier": state.services.shipments.courier_provider(),
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<Value>>) {
    let db_healthy = db::check_connection(&state.db).await.is_ok();
    let status = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let health_data = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "checks": {
            "database": if db_healthy { "healthy" } else { "unhealthy" },
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    (status, Json(ApiResponse::success(health_data)))
}

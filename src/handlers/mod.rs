pub mod bookings;
pub mod call_requests;
pub mod chat;
pub mod dashboard;
pub mod geo;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod shipments;

use axum::{http::StatusCode, Json};
use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    notifications::NotificationService,
    services::{
        bookings::BookingService,
        call_requests::CallRequestService,
        chatbot::ChatbotService,
        courier::CourierClient,
        dashboard::DashboardService,
        geocoding::{Geocoder, GeocodingService},
        orders::{CheckoutSettings, OrderService},
        packaging::PackageCalculator,
        products::ProductService,
        shipments::ShipmentService,
        PageLimits,
    },
    ApiResponse,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub orders: Arc<OrderService>,
    pub shipments: Arc<ShipmentService>,
    pub bookings: Arc<BookingService>,
    pub call_requests: Arc<CallRequestService>,
    pub chatbot: Arc<ChatbotService>,
    pub notifications: Arc<NotificationService>,
    pub geocoding: Arc<GeocodingService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    /// Wires every service against one database pool and event channel.
    /// External integrations arrive already built so tests can swap them.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
        courier: Arc<dyn CourierClient>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let page_limits = PageLimits::from_config(config);

        let products = Arc::new(ProductService::new(
            db_pool.clone(),
            event_sender.clone(),
            config.low_stock_threshold,
            page_limits,
        ));
        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            event_sender.clone(),
            CheckoutSettings::from_config(config),
            page_limits,
        ));
        let shipments = Arc::new(ShipmentService::new(
            db_pool.clone(),
            event_sender.clone(),
            courier,
            PackageCalculator::new(config.packaging.clone()),
            config.courier.pickup_pincode.clone(),
            page_limits,
        ));
        let bookings = Arc::new(BookingService::new(
            db_pool.clone(),
            event_sender.clone(),
            page_limits,
        ));
        let call_requests = Arc::new(CallRequestService::new(
            db_pool.clone(),
            event_sender,
            config.call_request_dedup_window(),
            page_limits,
        ));
        let chatbot = Arc::new(ChatbotService::new(db_pool.clone(), call_requests.clone()));
        let notifications = Arc::new(NotificationService::new(db_pool.clone(), page_limits));
        let geocoding = Arc::new(GeocodingService::new(geocoder));
        let dashboard = Arc::new(DashboardService::new(
            db_pool,
            config.low_stock_threshold,
            config.currency.clone(),
        ));

        Self {
            products,
            orders,
            shipments,
            bookings,
            call_requests,
            chatbot,
            notifications,
            geocoding,
            dashboard,
        }
    }
}

/// `201 Created` with the standard envelope
pub(crate) fn created<T>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

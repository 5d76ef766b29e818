use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AquaCare API",
        version = "0.3.0",
        description = r#"
# AquaCare Storefront and Seller API

Backend for an RO water purifier retailer.

## Features

- **Catalog**: Products with free-text specifications, stock and low-stock alerts
- **Orders**: Server-priced checkout, status lifecycle, cancellation with restock
- **Shipping**: Auto-calculated package weight and dimensions, courier rates and AWB booking
- **Service Bookings**: Installation, repair and maintenance visits
- **Call Requests**: Call-back queue prioritised by keywords in the request
- **Chat**: Rule-based assistant for common questions and order status
- **Notifications**: Seller notifications and customer emails driven by domain events

## Rate Limiting

Anonymous storefront writes (`POST /call-requests`, `POST /chat`, `POST /bookings`)
are rate limited per client. Check the response headers:
- `X-RateLimit-Limit`: Maximum requests per window
- `X-RateLimit-Remaining`: Remaining requests in current window
- `X-RateLimit-Reset`: Seconds until the window resets

## Error Handling

Errors share one envelope:

```json
{
  "error": "Bad Request",
  "message": "Pincode must be 6 digits",
  "request_id": "req-abc123xyz",
  "timestamp": "2026-03-09T10:30:00.000Z"
}
```

## Pagination

List endpoints take `page` (default 1) and `limit` (default 20, capped at the
configured maximum) and return `items`, `total`, `page`, `limit` and `total_pages`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Catalog management"),
        (name = "Orders", description = "Checkout and order lifecycle"),
        (name = "Customers", description = "Customers derived from orders"),
        (name = "Shipping", description = "Package calculation and courier rates"),
        (name = "Shipments", description = "Courier shipments"),
        (name = "Bookings", description = "Service visit bookings"),
        (name = "Call Requests", description = "Call-back queue"),
        (name = "Chat", description = "Storefront assistant"),
        (name = "Notifications", description = "Seller notifications"),
        (name = "Geolocation", description = "Address and pincode lookup"),
        (name = "Dashboard", description = "Seller dashboard")
    ),
    paths(
        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::adjust_stock,
        crate::handlers::products::list_categories,
        crate::handlers::products::low_stock_products,
        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_order_by_number,
        crate::handlers::orders::get_order_items,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::update_payment_status,
        crate::handlers::orders::list_customers,
        // Shipping
        crate::handlers::shipments::shipping_estimate,
        crate::handlers::shipments::order_shipping_quote,
        crate::handlers::shipments::create_order_shipment,
        crate::handlers::shipments::list_order_shipments,
        crate::handlers::shipments::list_shipments,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::mark_in_transit,
        crate::handlers::shipments::mark_delivered,
        crate::handlers::shipments::cancel_shipment,
        // Bookings
        crate::handlers::bookings::create_booking,
        crate::handlers::bookings::list_bookings,
        crate::handlers::bookings::get_booking,
        crate::handlers::bookings::update_booking_status,
        crate::handlers::bookings::assign_technician,
        crate::handlers::bookings::cancel_booking,
        // Call requests
        crate::handlers::call_requests::create_call_request,
        crate::handlers::call_requests::list_call_requests,
        crate::handlers::call_requests::get_call_request,
        crate::handlers::call_requests::update_call_status,
        crate::handlers::call_requests::update_call_priority,
        crate::handlers::call_requests::delete_call_request,
        // Chat
        crate::handlers::chat::send_message,
        crate::handlers::chat::session_history,
        // Notifications
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::unread_count,
        crate::handlers::notifications::mark_read,
        crate::handlers::notifications::mark_all_read,
        crate::handlers::notifications::delete_notification,
        // Geolocation
        crate::handlers::geo::reverse_geocode,
        crate::handlers::geo::lookup_pincode,
        // Dashboard
        crate::handlers::dashboard::summary,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::entities::order::OrderStatus,
            crate::entities::order::PaymentMethod,
            crate::entities::order::PaymentStatus,
            crate::entities::shipment::ShipmentStatus,
            crate::entities::service_booking::BookingStatus,
            crate::entities::service_booking::ServiceType,
            crate::entities::service_booking::TimeSlot,
            crate::entities::call_request::CallPriority,
            crate::entities::call_request::CallStatus,
            crate::entities::call_request::CallSource,
            crate::entities::notification::NotificationKind,
            crate::entities::notification::NotificationPriority,
            crate::services::packaging::PackageDetails,
            crate::services::courier::CourierRate,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_storefront_and_seller_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).expect("openapi serializes");
        assert!(json.contains("AquaCare API"));
        assert!(json.contains("/api/v1/orders/{id}/shipments"));
        assert!(json.contains("/api/v1/call-requests"));
        assert!(json.contains("/api/v1/dashboard/summary"));
    }
}

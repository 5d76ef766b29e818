use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{created, AppState};
use crate::{
    entities::shipment::Model as Shipment,
    errors::{ErrorResponse, ServiceError},
    services::shipments::{
        CreateShipmentRequest, ShipmentListQuery, ShippingEstimateQuery, ShippingQuote,
    },
    ApiResponse, ApiResult, PaginatedResponse,
};

#[utoipa::path(
    get,
    path = "/api/v1/shipping/estimate",
    summary = "Estimate shipping",
    description = "Courier rates for a product delivered to a pincode, before an order exists",
    params(ShippingEstimateQuery),
    responses(
        (status = 200, description = "Package and courier rates", body = ApiResponse<ShippingQuote>),
        (status = 400, description = "Invalid pincode or quantity", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 502, description = "Courier unavailable", body = ErrorResponse),
        (status = 503, description = "Courier integration disabled", body = ErrorResponse),
    ),
    tag = "Shipping"
)]
pub async fn shipping_estimate(
    State(state): State<AppState>,
    Query(query): Query<ShippingEstimateQuery>,
) -> ApiResult<ShippingQuote> {
    let quote = state.services.shipments.estimate(query).await?;
    Ok(Json(ApiResponse::success(quote)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/shipping-quote",
    summary = "Quote an order",
    description = "Auto-calculated package for the order's items and the serviceable courier rates",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Package and courier rates", body = ApiResponse<ShippingQuote>),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 502, description = "Courier unavailable", body = ErrorResponse),
    ),
    tag = "Shipping"
)]
pub async fn order_shipping_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ShippingQuote> {
    let quote = state.services.shipments.quote_order(id).await?;
    Ok(Json(ApiResponse::success(quote)))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/shipments",
    summary = "Ship an order",
    description = "Books the order with the courier. Without a courier_id the cheapest serviceable courier is used.",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body(content = Option<CreateShipmentRequest>, description = "Optional courier choice"),
    responses(
        (status = 201, description = "Shipment created", body = ApiResponse<Shipment>),
        (status = 400, description = "Order cannot be shipped in its current state", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Order already has an active shipment", body = ErrorResponse),
        (status = 502, description = "Courier rejected the shipment", body = ErrorResponse),
    ),
    tag = "Shipments"
)]
pub async fn create_order_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<CreateShipmentRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Shipment>>), ServiceError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let shipment = state.services.shipments.create_shipment(id, request).await?;
    Ok(created(shipment))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/shipments",
    summary = "List an order's shipments",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Shipments, newest first", body = ApiResponse<Vec<Shipment>>),
        (status = 404, description = "Order not found", body = ErrorResponse),
    ),
    tag = "Shipments"
)]
pub async fn list_order_shipments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Shipment>> {
    let shipments = state.services.shipments.shipments_for_order(id).await?;
    Ok(Json(ApiResponse::success(shipments)))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments",
    summary = "List shipments",
    params(ShipmentListQuery),
    responses(
        (status = 200, description = "Shipments retrieved", body = ApiResponse<PaginatedResponse<Shipment>>),
    ),
    tag = "Shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    Query(query): Query<ShipmentListQuery>,
) -> ApiResult<PaginatedResponse<Shipment>> {
    let shipments = state.services.shipments.list_shipments(query).await?;
    Ok(Json(ApiResponse::success(shipments)))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}",
    summary = "Get shipment",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment retrieved", body = ApiResponse<Shipment>),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
    ),
    tag = "Shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Shipment> {
    let shipment = state.services.shipments.get_shipment(id).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/in-transit",
    summary = "Mark shipment in transit",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment updated", body = ApiResponse<Shipment>),
        (status = 400, description = "Invalid shipment transition", body = ErrorResponse),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
    ),
    tag = "Shipments"
)]
pub async fn mark_in_transit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Shipment> {
    let shipment = state.services.shipments.mark_in_transit(id).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/deliver",
    summary = "Mark shipment delivered",
    description = "Also marks the order delivered; COD orders become paid",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment delivered", body = ApiResponse<Shipment>),
        (status = 400, description = "Invalid shipment transition", body = ErrorResponse),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
    ),
    tag = "Shipments"
)]
pub async fn mark_delivered(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Shipment> {
    let shipment = state.services.shipments.mark_delivered(id).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/cancel",
    summary = "Cancel shipment",
    description = "Cancels a shipment that has not been delivered and returns a shipped order to processing",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment cancelled", body = ApiResponse<Shipment>),
        (status = 400, description = "Shipment can no longer be cancelled", body = ErrorResponse),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
    ),
    tag = "Shipments"
)]
pub async fn cancel_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Shipment> {
    let shipment = state.services.shipments.cancel_shipment(id).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

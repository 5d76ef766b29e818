use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{created, AppState};
use crate::{
    entities::service_booking::Model as ServiceBooking,
    errors::{ErrorResponse, ServiceError},
    services::bookings::{
        AssignTechnicianRequest, BookingListQuery, CancelBookingRequest, CreateBookingRequest,
        UpdateBookingStatusRequest,
    },
    ApiResponse, ApiResult, PaginatedResponse,
};

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    summary = "Book a service visit",
    description = "Installation, repair or maintenance request from the storefront",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking received", body = ApiResponse<ServiceBooking>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
    ),
    tag = "Bookings"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ServiceBooking>>), ServiceError> {
    let booking = state.services.bookings.create_booking(request).await?;
    Ok(created(booking))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    summary = "List bookings",
    params(BookingListQuery),
    responses(
        (status = 200, description = "Bookings by preferred date", body = ApiResponse<PaginatedResponse<ServiceBooking>>),
    ),
    tag = "Bookings"
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingListQuery>,
) -> ApiResult<PaginatedResponse<ServiceBooking>> {
    let bookings = state.services.bookings.list_bookings(query).await?;
    Ok(Json(ApiResponse::success(bookings)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    summary = "Get booking",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking retrieved", body = ApiResponse<ServiceBooking>),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    ),
    tag = "Bookings"
)]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ServiceBooking> {
    let booking = state.services.bookings.get_booking(id).await?;
    Ok(Json(ApiResponse::success(booking)))
}

#[utoipa::path(
    put,
    path = "/api/v1/bookings/{id}/status",
    summary = "Update booking status",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = UpdateBookingStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ServiceBooking>),
        (status = 400, description = "Invalid transition", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    ),
    tag = "Bookings"
)]
pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> ApiResult<ServiceBooking> {
    let booking = state.services.bookings.update_status(id, request).await?;
    Ok(Json(ApiResponse::success(booking)))
}

#[utoipa::path(
    put,
    path = "/api/v1/bookings/{id}/technician",
    summary = "Assign technician",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = AssignTechnicianRequest,
    responses(
        (status = 200, description = "Technician assigned", body = ApiResponse<ServiceBooking>),
        (status = 400, description = "Booking already closed", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    ),
    tag = "Bookings"
)]
pub async fn assign_technician(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignTechnicianRequest>,
) -> ApiResult<ServiceBooking> {
    let booking = state
        .services
        .bookings
        .assign_technician(id, request)
        .await?;
    Ok(Json(ApiResponse::success(booking)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/cancel",
    summary = "Cancel booking",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = CancelBookingRequest,
    responses(
        (status = 200, description = "Booking cancelled", body = ApiResponse<ServiceBooking>),
        (status = 400, description = "Booking already closed", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    ),
    tag = "Bookings"
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelBookingRequest>,
) -> ApiResult<ServiceBooking> {
    let booking = state.services.bookings.cancel_booking(id, request).await?;
    Ok(Json(ApiResponse::success(booking)))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AppState;
use crate::{
    entities::call_request::Model as CallRequest,
    errors::{ErrorResponse, ServiceError},
    services::call_requests::{
        CallRequestListQuery, CallRequestOutcome, CreateCallRequest, UpdateCallPriorityRequest,
        UpdateCallStatusRequest,
    },
    ApiResponse, ApiResult, PaginatedResponse,
};

#[utoipa::path(
    post,
    path = "/api/v1/call-requests",
    summary = "Request a call back",
    description = "Priority is derived from the reason and message. A repeat request from the same phone inside the dedup window returns the open request with `duplicate: true`.",
    request_body = CreateCallRequest,
    responses(
        (status = 201, description = "Call request created", body = ApiResponse<CallRequestOutcome>),
        (status = 200, description = "Matched an open request from the same phone", body = ApiResponse<CallRequestOutcome>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
    ),
    tag = "Call Requests"
)]
pub async fn create_call_request(
    State(state): State<AppState>,
    Json(request): Json<CreateCallRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CallRequestOutcome>>), ServiceError> {
    let outcome = state
        .services
        .call_requests
        .create_call_request(request)
        .await?;
    let status = if outcome.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(ApiResponse::success(outcome))))
}

#[utoipa::path(
    get,
    path = "/api/v1/call-requests",
    summary = "List call requests",
    description = "High priority first, oldest first within a priority",
    params(CallRequestListQuery),
    responses(
        (status = 200, description = "Call requests retrieved", body = ApiResponse<PaginatedResponse<CallRequest>>),
    ),
    tag = "Call Requests"
)]
pub async fn list_call_requests(
    State(state): State<AppState>,
    Query(query): Query<CallRequestListQuery>,
) -> ApiResult<PaginatedResponse<CallRequest>> {
    let requests = state.services.call_requests.list_call_requests(query).await?;
    Ok(Json(ApiResponse::success(requests)))
}

#[utoipa::path(
    get,
    path = "/api/v1/call-requests/{id}",
    summary = "Get call request",
    params(("id" = Uuid, Path, description = "Call request ID")),
    responses(
        (status = 200, description = "Call request retrieved", body = ApiResponse<CallRequest>),
        (status = 404, description = "Call request not found", body = ErrorResponse),
    ),
    tag = "Call Requests"
)]
pub async fn get_call_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CallRequest> {
    let request = state.services.call_requests.get_call_request(id).await?;
    Ok(Json(ApiResponse::success(request)))
}

#[utoipa::path(
    put,
    path = "/api/v1/call-requests/{id}/status",
    summary = "Update call request status",
    params(("id" = Uuid, Path, description = "Call request ID")),
    request_body = UpdateCallStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<CallRequest>),
        (status = 400, description = "Invalid transition", body = ErrorResponse),
        (status = 404, description = "Call request not found", body = ErrorResponse),
    ),
    tag = "Call Requests"
)]
pub async fn update_call_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCallStatusRequest>,
) -> ApiResult<CallRequest> {
    let updated = state.services.call_requests.update_status(id, request).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    put,
    path = "/api/v1/call-requests/{id}/priority",
    summary = "Override call request priority",
    params(("id" = Uuid, Path, description = "Call request ID")),
    request_body = UpdateCallPriorityRequest,
    responses(
        (status = 200, description = "Priority updated", body = ApiResponse<CallRequest>),
        (status = 400, description = "Request already closed", body = ErrorResponse),
        (status = 404, description = "Call request not found", body = ErrorResponse),
    ),
    tag = "Call Requests"
)]
pub async fn update_call_priority(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCallPriorityRequest>,
) -> ApiResult<CallRequest> {
    let updated = state
        .services
        .call_requests
        .update_priority(id, request)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/call-requests/{id}",
    summary = "Delete call request",
    params(("id" = Uuid, Path, description = "Call request ID")),
    responses(
        (status = 204, description = "Call request deleted"),
        (status = 404, description = "Call request not found", body = ErrorResponse),
    ),
    tag = "Call Requests"
)]
pub async fn delete_call_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.call_requests.delete_call_request(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

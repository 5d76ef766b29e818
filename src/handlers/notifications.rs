use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::AppState;
use crate::{
    entities::notification::Model as Notification,
    errors::{ErrorResponse, ServiceError},
    notifications::{NotificationListQuery, UnreadCount},
    ApiResponse, ApiResult, PaginatedResponse,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkedRead {
    pub updated: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    summary = "List notifications",
    params(NotificationListQuery),
    responses(
        (status = 200, description = "Newest first", body = ApiResponse<PaginatedResponse<Notification>>),
    ),
    tag = "Notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationListQuery>,
) -> ApiResult<PaginatedResponse<Notification>> {
    let notifications = state.services.notifications.list(query).await?;
    Ok(Json(ApiResponse::success(notifications)))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread-count",
    summary = "Unread notification count",
    responses((status = 200, description = "Badge count", body = ApiResponse<UnreadCount>)),
    tag = "Notifications"
)]
pub async fn unread_count(State(state): State<AppState>) -> ApiResult<UnreadCount> {
    let unread = state.services.notifications.unread_count().await?;
    Ok(Json(ApiResponse::success(UnreadCount { unread })))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    summary = "Mark notification read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = ApiResponse<Notification>),
        (status = 404, description = "Notification not found", body = ErrorResponse),
    ),
    tag = "Notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Notification> {
    let notification = state.services.notifications.mark_read(id).await?;
    Ok(Json(ApiResponse::success(notification)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/read-all",
    summary = "Mark all notifications read",
    responses((status = 200, description = "Number of notifications changed", body = ApiResponse<MarkedRead>)),
    tag = "Notifications"
)]
pub async fn mark_all_read(State(state): State<AppState>) -> ApiResult<MarkedRead> {
    let updated = state.services.notifications.mark_all_read().await?;
    Ok(Json(ApiResponse::success(MarkedRead { updated })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/notifications/{id}",
    summary = "Delete notification",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found", body = ErrorResponse),
    ),
    tag = "Notifications"
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.notifications.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

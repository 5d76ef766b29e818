use axum::{extract::State, Json};

use super::AppState;
use crate::{services::dashboard::DashboardSummary, ApiResponse, ApiResult};

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/summary",
    summary = "Seller dashboard summary",
    responses((status = 200, description = "Headline counts and revenue", body = ApiResponse<DashboardSummary>)),
    tag = "Dashboard"
)]
pub async fn summary(State(state): State<AppState>) -> ApiResult<DashboardSummary> {
    let summary = state.services.dashboard.summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}

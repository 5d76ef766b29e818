use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::AppState;
use crate::{
    errors::ErrorResponse,
    services::geocoding::{Address, Coordinates, PincodeLocation},
    ApiResponse, ApiResult,
};

#[utoipa::path(
    get,
    path = "/api/v1/geo/reverse",
    summary = "Address from coordinates",
    description = "Prefills the checkout address from the browser's location",
    params(Coordinates),
    responses(
        (status = 200, description = "Resolved address", body = ApiResponse<Address>),
        (status = 400, description = "Coordinates out of range", body = ErrorResponse),
        (status = 404, description = "No address at this point", body = ErrorResponse),
        (status = 503, description = "Geolocation disabled", body = ErrorResponse),
    ),
    tag = "Geolocation"
)]
pub async fn reverse_geocode(
    State(state): State<AppState>,
    Query(point): Query<Coordinates>,
) -> ApiResult<Address> {
    let address = state.services.geocoding.reverse(point).await?;
    Ok(Json(ApiResponse::success(address)))
}

#[utoipa::path(
    get,
    path = "/api/v1/geo/pincode/{pincode}",
    summary = "Look up a pincode",
    params(("pincode" = String, Path, description = "6-digit Indian pincode")),
    responses(
        (status = 200, description = "City and state for the pincode", body = ApiResponse<PincodeLocation>),
        (status = 400, description = "Invalid pincode", body = ErrorResponse),
        (status = 404, description = "Unknown pincode", body = ErrorResponse),
        (status = 503, description = "Geolocation disabled", body = ErrorResponse),
    ),
    tag = "Geolocation"
)]
pub async fn lookup_pincode(
    State(state): State<AppState>,
    Path(pincode): Path<String>,
) -> ApiResult<PincodeLocation> {
    let location = state.services.geocoding.lookup_pincode(&pincode).await?;
    Ok(Json(ApiResponse::success(location)))
}

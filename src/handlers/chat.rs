use axum::{
    extract::{Path, State},
    Json,
};

use super::AppState;
use crate::{
    entities::chat_message::Model as ChatMessage,
    errors::ErrorResponse,
    services::chatbot::{ChatReply, ChatRequest},
    ApiResponse, ApiResult,
};

#[utoipa::path(
    post,
    path = "/api/v1/chat",
    summary = "Send a chat message",
    description = "Rule-based assistant: answers product, pricing, installation and order status questions, and books a call back when the visitor leaves a mobile number",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ApiResponse<ChatReply>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
    ),
    tag = "Chat"
)]
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatReply> {
    let reply = state.services.chatbot.respond(request).await?;
    Ok(Json(ApiResponse::success(reply)))
}

#[utoipa::path(
    get,
    path = "/api/v1/chat/sessions/{session_id}",
    summary = "Chat transcript",
    params(("session_id" = String, Path, description = "Session ID returned by the first reply")),
    responses(
        (status = 200, description = "Messages in exchange order", body = ApiResponse<Vec<ChatMessage>>),
        (status = 404, description = "Unknown session", body = ErrorResponse),
    ),
    tag = "Chat"
)]
pub async fn session_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Vec<ChatMessage>> {
    let messages = state.services.chatbot.session_history(&session_id).await?;
    Ok(Json(ApiResponse::success(messages)))
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{chatdb::ChatExt, userdb::UserExt},
    dtos::{chatdtos::SendMessageDto, RequestQueryDto},
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/conversations", get(get_conversations))
        .route("/messages", post(send_message))
        .route("/messages/:user_id", get(get_messages))
        .route("/messages/:user_id/read", put(mark_read))
        .route("/unread-count", get(unread_count))
        .route("/admins", get(get_admins))
}

pub async fn get_conversations(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let conversations = app_state.db_client.get_conversations(user.user.id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": conversations.len(),
        "data": conversations,
    })))
}

pub async fn get_messages(
    Query(query_params): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(other_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate()?;

    let mut messages = app_state
        .db_client
        .get_messages_between(
            user.user.id,
            other_id,
            query_params.page(),
            query_params.limit(),
        )
        .await?;
    // oldest first for display
    messages.reverse();

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": messages.len(),
        "data": messages,
    })))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let message = app_state
        .chat_service
        .send(&user.user, body.receiver_id, &body.text)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": message,
        })),
    ))
}

pub async fn mark_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(sender_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let updated = app_state.chat_service.mark_read(&user.user, sender_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "updated": updated },
    })))
}

pub async fn unread_count(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let count = app_state.db_client.unread_count(user.user.id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "unread": count },
    })))
}

/// Staff accounts a user can open a conversation with.
pub async fn get_admins(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let staff = app_state.db_client.get_staff().await?;
    let online = app_state.realtime.online_users().await;

    let data: Vec<serde_json::Value> = staff
        .into_iter()
        .map(|member| {
            let is_online = online.contains(&member.id);
            serde_json::json!({
                "id": member.id,
                "name": member.name,
                "role": member.role,
                "avatar_url": member.avatar_url,
                "online": is_online,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": data.len(),
        "data": data,
    })))
}

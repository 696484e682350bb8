use std::sync::Arc;

use axum::{
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    db::{userdb::UserExt, verificationdb::VerificationExt},
    dtos::{
        userdtos::{UpdateProfileDto, UserPasswordUpdateDto, UserResponseDto},
        Response,
    },
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddleware,
    utils::{password, sanitize::clean_optional},
    AppState,
};

pub fn users_handler() -> Router {
    Router::new()
        .route("/me", get(get_me).put(update_me).delete(delete_me))
        .route("/me/password", put(update_password))
        .route("/me/can-delete", get(can_delete_me))
}

pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto::from_user(&user.user)))
}

pub async fn update_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let profile = UpdateProfileDto {
        name: clean_optional(body.name),
        phone: body.phone.map(|p| p.trim().to_string()),
        avatar_url: body.avatar_url,
    };

    let updated = app_state
        .db_client
        .update_user_profile(user.user.id, &profile)
        .await?;

    Ok(Json(UserResponseDto::from_user(&updated)))
}

pub async fn update_password(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UserPasswordUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let password_match = password::compare(&body.old_password, &user.user.password)
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if !password_match {
        return Err(HttpError::bad_request("Old password is incorrect".to_string()));
    }

    let hash_password = password::hash(&body.new_password)
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state
        .db_client
        .update_user_password(user.user.id, hash_password)
        .await?;

    // every session ends, this one included
    let revoked = app_state.db_client.revoke_user_sessions(user.user.id).await?;
    app_state
        .realtime
        .close_user(user.user.id, &ErrorMessage::SessionRevoked.to_string())
        .await;
    tracing::info!("Password changed for user {}, {} session(s) revoked", user.user.id, revoked);

    Ok(Json(Response::success("Password updated Successfully. Please log in again")))
}

pub async fn can_delete_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let check = app_state
        .lifecycle_service
        .user_delete_check(user.user.id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": check,
    })))
}

pub async fn delete_me(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    if !user.user.is_active {
        return Err(HttpError::forbidden(ErrorMessage::AccountDeactivated.to_string()));
    }

    let outcome = app_state
        .lifecycle_service
        .delete_user(&user.user, user.user.id, false, Some("Deleted by account owner".to_string()))
        .await?;
    app_state
        .realtime
        .close_user(user.user.id, &ErrorMessage::AccountDeactivated.to_string())
        .await;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": outcome,
    })))
}

use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{bookmarkdb::BookmarkExt, servicedb::ServiceExt},
    dtos::{bookmarkdtos::CreateBookmarkDto, Response},
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn bookmarks_handler() -> Router {
    Router::new()
        .route("/", get(get_bookmarks).post(add_bookmark))
        .route("/:service_id", delete(remove_bookmark))
}

pub async fn get_bookmarks(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let bookmarks = app_state.db_client.get_bookmarks(user.user.id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": bookmarks.len(),
        "data": bookmarks,
    })))
}

pub async fn add_bookmark(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateBookmarkDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    app_state
        .db_client
        .get_service(body.service_id)
        .await?
        .filter(|service| service.is_active)
        .ok_or_else(|| HttpError::not_found("Service not found"))?;

    if app_state
        .db_client
        .is_bookmarked(user.user.id, body.service_id)
        .await?
    {
        return Err(HttpError::conflict("Service is already bookmarked"));
    }

    let bookmark = app_state
        .db_client
        .add_bookmark(user.user.id, body.service_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": bookmark,
        })),
    ))
}

pub async fn remove_bookmark(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(service_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let removed = app_state
        .db_client
        .remove_bookmark(user.user.id, service_id)
        .await?;

    if !removed {
        return Err(HttpError::not_found("Bookmark not found"));
    }

    Ok(Json(Response::success("Bookmark removed")))
}

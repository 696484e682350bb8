use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit, http::StatusCode, response::IntoResponse, routing::post,
    Extension, Json, Router,
};
use validator::Validate;

use crate::{dtos::chatdtos::UploadImageDto, error::HttpError, middleware::JWTAuthMiddleware, AppState};

/// Base64 inflates by a third, plus room for the JSON envelope.
fn body_limit(max_upload_mb: usize) -> usize {
    (max_upload_mb.saturating_mul(1024 * 1024) / 3)
        .saturating_mul(4)
        .saturating_add(64 * 1024)
}

pub fn upload_handler(max_upload_mb: usize) -> Router {
    Router::new()
        .route("/", post(upload_image))
        .layer(DefaultBodyLimit::max(body_limit(max_upload_mb)))
}

pub async fn upload_image(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UploadImageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let image = app_state
        .upload_service
        .upload_image(&body.image, body.folder.as_deref())
        .await?;
    tracing::info!("Image uploaded by {}", user.user.id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": image,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_leaves_room_for_base64() {
        let raw = 5 * 1024 * 1024;
        assert!(body_limit(5) > raw * 4 / 3);
    }

    #[test]
    fn body_limit_saturates_instead_of_overflowing() {
        assert_eq!(body_limit(usize::MAX), usize::MAX);
        assert!(body_limit(32) > body_limit(5));
    }
}

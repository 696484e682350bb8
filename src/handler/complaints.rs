use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::complaintdb::ComplaintExt,
    dtos::{
        complaintdtos::{ComplaintQueryDto, ConfirmComplaintDto, CreateComplaintDto},
        page_number,
        Response,
    },
    error::HttpError,
    middleware::JWTAuthMiddleware,
    AppState,
};

pub fn complaints_handler() -> Router {
    Router::new()
        .route("/", get(get_my_complaints).post(create_complaint))
        .route("/:id", get(get_complaint).delete(withdraw_complaint))
        .route("/:id/confirm", patch(confirm_complaint))
}

pub async fn create_complaint(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateComplaintDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let complaint = app_state.complaint_service.create(&user.user, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": complaint,
        })),
    ))
}

pub async fn get_my_complaints(
    Query(query_params): Query<ComplaintQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate()?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let (complaints, total) = app_state
        .db_client
        .get_user_complaints(user.user.id, query_params.status, page_number(page), limit)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": complaints,
        "results": total,
    })))
}

pub async fn get_complaint(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(complaint_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let complaint = app_state
        .complaint_service
        .get_for(&user.user, complaint_id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": complaint,
    })))
}

pub async fn confirm_complaint(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(complaint_id): Path<Uuid>,
    Json(body): Json<ConfirmComplaintDto>,
) -> Result<impl IntoResponse, HttpError> {
    let complaint = app_state
        .complaint_service
        .owner_confirm(&user.user, complaint_id, body.resolved)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": complaint,
    })))
}

pub async fn withdraw_complaint(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(complaint_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .complaint_service
        .withdraw(&user.user, complaint_id)
        .await?;

    Ok(Json(Response::success("Complaint withdrawn")))
}

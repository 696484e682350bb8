use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler, auth::auth_handler, bookings::bookings_handler,
        bookmarks::bookmarks_handler, chat::chat_handler, companies::companies_handler,
        complaints::complaints_handler, services::services_handler, upload::upload_handler,
        users::users_handler,
    },
    middleware::{auth, csrf_guard, role_check},
    models::usermodel::UserRole,
    realtime::socket::ws_handler,
    AppState,
};

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "success", "message": "ok" }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .nest("/users", users_handler().layer(middleware::from_fn(auth)))
        .nest("/companies", companies_handler())
        .nest("/services", services_handler())
        .nest("/bookings", bookings_handler().layer(middleware::from_fn(auth)))
        .nest("/complaints", complaints_handler().layer(middleware::from_fn(auth)))
        .nest("/bookmarks", bookmarks_handler().layer(middleware::from_fn(auth)))
        .nest("/chat", chat_handler().layer(middleware::from_fn(auth)))
        .nest(
            "/admin",
            admin_handler()
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, vec![UserRole::Admin, UserRole::Superuser])
                }))
                .layer(middleware::from_fn(auth)),
        )
        .nest(
            "/upload",
            upload_handler(app_state.env.max_upload_mb).layer(middleware::from_fn(auth)),
        );

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .nest("/auth", auth_handler())
        .nest("/api", api_route)
        .layer(middleware::from_fn(csrf_guard))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::test_support::test_state;

    #[tokio::test]
    async fn health_is_public() {
        let response = create_router(test_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        for path in ["/api/users/me", "/api/bookings", "/api/chat/unread-count", "/api/admin/stats"] {
            let response = create_router(test_state())
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", path);
        }
    }

    #[tokio::test]
    async fn cookie_writes_without_csrf_are_refused_before_auth() {
        let response = create_router(test_state())
            .oneshot(
                Request::post("/api/bookings")
                    .header(header::COOKIE, "token=abc")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

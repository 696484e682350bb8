use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{
    db::{userdb::UserExt, verificationdb::VerificationExt},
    error::{ErrorMessage, HttpError},
    models::{
        usermodel::{User, UserRole},
        verificationmodels::Session,
    },
    utils::token,
    AppState,
};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JWTAuthMiddleware {
    pub user: User,
    pub session_id: Uuid,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}

/// Cookie first, then the `Authorization` header.
pub fn request_token(cookie_jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    cookie_jar
        .get("token")
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| bearer_token(headers))
}

/// Token -> live session -> active user. Shared by HTTP and sockets.
pub async fn authenticate(app_state: &AppState, token: &str) -> Result<JWTAuthMiddleware, HttpError> {
    let claims = token::decode_token(token, app_state.env.jwt_secret.as_bytes())?;

    let (user_id, session_id) = match (claims.user_id(), claims.session_id()) {
        (Some(user_id), Some(session_id)) => (user_id, session_id),
        _ => return Err(HttpError::unauthorized(ErrorMessage::InvalidToken.to_string())),
    };

    load_session_user(app_state, user_id, session_id).await
}

/// Re-reads the session and its user. Long-lived sockets call this again
/// after the handshake so a revoked session or suspended account drops out.
pub async fn load_session_user(
    app_state: &AppState,
    user_id: Uuid,
    session_id: Uuid,
) -> Result<JWTAuthMiddleware, HttpError> {
    let session = app_state.db_client.get_session(session_id).await?;
    check_session(session.as_ref(), user_id, Utc::now())?;

    let user = app_state.db_client.get_user(Some(user_id), None).await?;
    let user = check_account(user)?;

    Ok(JWTAuthMiddleware { user, session_id })
}

pub fn check_session(session: Option<&Session>, user_id: Uuid, now: DateTime<Utc>) -> Result<(), HttpError> {
    let session =
        session.ok_or_else(|| HttpError::unauthorized(ErrorMessage::SessionRevoked.to_string()))?;

    if session.user_id != user_id {
        return Err(HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()));
    }
    if !session.is_live(now) {
        return Err(HttpError::unauthorized(ErrorMessage::SessionRevoked.to_string()));
    }
    Ok(())
}

pub fn check_account(user: Option<User>) -> Result<User, HttpError> {
    let user =
        user.ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    if !user.is_active {
        return Err(HttpError::forbidden(ErrorMessage::AccountDeactivated.to_string()));
    }
    Ok(user)
}

pub async fn auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = request_token(&cookie_jar, req.headers()).ok_or_else(|| {
        HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string())
    })?;

    let auth = authenticate(&app_state, &token).await?;
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

pub async fn role_check(
    Extension(_app_state): Extension<Arc<AppState>>,
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let user = req
        .extensions()
        .get::<JWTAuthMiddleware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles.contains(&user.user.role) {
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }

    Ok(next.run(req).await)
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Double-submit check for cookie-authenticated writes.
pub async fn csrf_guard(
    cookie_jar: CookieJar,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    if is_mutating(req.method()) && cookie_jar.get("token").is_some() {
        let expected = cookie_jar
            .get(CSRF_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .unwrap_or_default();
        let provided = req
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        let matches: bool = expected.as_bytes().ct_eq(provided.as_bytes()).into();
        if expected.is_empty() || !matches {
            tracing::warn!("CSRF check failed for {} {}", req.method(), req.uri().path());
            return Err(HttpError::forbidden(ErrorMessage::InvalidCsrfToken.to_string()));
        }
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    use crate::test_support::{test_state, test_user};

    fn protected(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/private", get(|| async { "ok" }))
            .layer(middleware::from_fn(auth))
            .layer(Extension(state))
    }

    fn csrf_app() -> Router {
        Router::new()
            .route("/write", post(|| async { "ok" }))
            .layer(middleware::from_fn(csrf_guard))
    }

    fn staff_only(state: Arc<AppState>, role: UserRole) -> Router {
        let mut user = test_user(role);
        user.is_active = true;
        let auth = JWTAuthMiddleware {
            user,
            session_id: Uuid::new_v4(),
        };
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Admin, UserRole::Superuser])
            }))
            .layer(middleware::from_fn(move |mut req: Request, next: Next| {
                let auth = auth.clone();
                async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                }
            }))
            .layer(Extension(state))
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let response = protected(test_state())
            .oneshot(HttpRequest::get("/private").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_401() {
        let response = protected(test_state())
            .oneshot(
                HttpRequest::get("/private")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn cookie_writes_need_the_csrf_header() {
        let response = csrf_app()
            .oneshot(
                HttpRequest::post("/write")
                    .header(header::COOKIE, "token=abc; csrf_token=s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = csrf_app()
            .oneshot(
                HttpRequest::post("/write")
                    .header(header::COOKIE, "token=abc; csrf_token=s3cret")
                    .header(CSRF_HEADER, "s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bearer_clients_skip_csrf() {
        let response = csrf_app()
            .oneshot(
                HttpRequest::post("/write")
                    .header(header::AUTHORIZATION, "Bearer abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn role_check_rejects_regular_users() {
        let response = staff_only(test_state(), UserRole::User)
            .oneshot(HttpRequest::get("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = staff_only(test_state(), UserRole::Admin)
            .oneshot(HttpRequest::get("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Token abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));
    }

    fn session(user_id: Uuid) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id,
            user_agent: None,
            expires_at: Utc::now() + chrono::Duration::days(1),
            revoked_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn revoked_or_missing_sessions_fail_the_recheck() {
        let user_id = Uuid::new_v4();
        let live = session(user_id);
        assert!(check_session(Some(&live), user_id, Utc::now()).is_ok());

        let revoked = Session {
            revoked_at: Some(Utc::now()),
            ..live.clone()
        };
        let err = check_session(Some(&revoked), user_id, Utc::now()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, ErrorMessage::SessionRevoked.to_string());

        assert!(check_session(None, user_id, Utc::now()).is_err());
        assert!(check_session(Some(&live), Uuid::new_v4(), Utc::now()).is_err());
        let later = Utc::now() + chrono::Duration::days(2);
        assert!(check_session(Some(&live), user_id, later).is_err());
    }

    #[test]
    fn suspended_accounts_fail_the_recheck() {
        let mut user = test_user(UserRole::Provider);
        assert!(check_account(Some(user.clone())).is_ok());

        user.is_active = false;
        let err = check_account(Some(user)).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, ErrorMessage::AccountDeactivated.to_string());

        let err = check_account(None).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}

use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response as AxumResponse},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{userdb::UserExt, verificationdb::VerificationExt},
    dtos::{
        userdtos::{
            FilterUserDto, ForgotPasswordRequestDto, LoginUserDto, ResendOtpDto,
            ResetPasswordRequestDto, SignupUserDto, UserData, UserLoginResponseDto,
            UserResponseDto, VerifyOtpDto,
        },
        Response,
    },
    error::{ErrorMessage, HttpError},
    middleware::{auth, JWTAuthMiddleware, CSRF_COOKIE},
    models::{usermodel::{User, UserRole}, verificationmodels::OtpPurpose},
    utils::{otp_generator::generate_csrf_token, password, token},
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/csrf-token", get(csrf_token))
        .route("/signup", post(signup))
        .route("/verify-otp", post(verify_otp))
        .route("/resend-otp", post(resend_otp))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/logout", post(logout).layer(middleware::from_fn(auth)))
        .route("/me", get(me).layer(middleware::from_fn(auth)))
}

fn build_cookie(
    app_state: &AppState,
    name: &'static str,
    value: String,
    max_age: time::Duration,
    http_only: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .max_age(max_age)
        .http_only(http_only)
        .secure(app_state.env.is_production())
        .same_site(SameSite::Lax)
        .build()
}

fn with_cookies(mut response: AxumResponse, cookies: Vec<Cookie<'static>>) -> Result<AxumResponse, HttpError> {
    for cookie in cookies {
        let value = cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error("Failed to build cookie header"))?;
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    Ok(response)
}

/// Opens a session row and hands out the JWT that names it.
async fn start_session(
    app_state: &AppState,
    user: &User,
    headers: &HeaderMap,
) -> Result<AxumResponse, HttpError> {
    let session_id = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::minutes(app_state.env.jwt_maxage);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.chars().take(255).collect::<String>());

    app_state
        .db_client
        .create_session(session_id, user.id, user_agent, expires_at)
        .await?;

    let token = token::create_token(
        &user.id.to_string(),
        &session_id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let max_age = time::Duration::minutes(app_state.env.jwt_maxage);
    let token_cookie = build_cookie(app_state, "token", token.clone(), max_age, true);
    let csrf_cookie = build_cookie(app_state, CSRF_COOKIE, generate_csrf_token(), max_age, false);

    tracing::info!("Session {} started for user {}", session_id, user.id);

    let response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        token,
        data: UserData {
            user: FilterUserDto::filter_user(user),
        },
    })
    .into_response();

    with_cookies(response, vec![token_cookie, csrf_cookie])
}

pub async fn csrf_token(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let csrf = generate_csrf_token();
    let cookie = build_cookie(
        &app_state,
        CSRF_COOKIE,
        csrf.clone(),
        time::Duration::minutes(app_state.env.jwt_maxage),
        false,
    );

    let response = Json(serde_json::json!({
        "status": "success",
        "csrfToken": csrf,
    }))
    .into_response();

    with_cookies(response, vec![cookie])
}

pub async fn signup(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<SignupUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let existing = app_state
        .db_client
        .get_user(None, Some(&body.email))
        .await?;
    if existing.is_some() {
        return Err(HttpError::unique_constraint_violation(
            ErrorMessage::EmailExist.to_string(),
        ));
    }

    let hashed_password = password::hash(&body.password)
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let expires_at = Utc::now() + Duration::minutes(app_state.otp_service.ttl_minutes());

    app_state
        .db_client
        .upsert_pending_user(
            &body.email,
            body.name.trim(),
            &hashed_password,
            body.role.unwrap_or(UserRole::User),
            expires_at,
        )
        .await?;

    app_state
        .otp_service
        .issue(&body.email, OtpPurpose::Signup)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Response::success(format!(
            "A verification code has been sent to {}",
            body.email.to_lowercase()
        ))),
    ))
}

pub async fn verify_otp(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<VerifyOtpDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let pending = app_state
        .db_client
        .get_pending_user(&body.email)
        .await?
        .ok_or_else(|| HttpError::bad_request("No pending signup for this email. Please sign up again"))?;

    app_state
        .otp_service
        .verify(&body.email, OtpPurpose::Signup, &body.otp)
        .await?;

    let user = app_state
        .db_client
        .save_user(pending.name, pending.email.clone(), pending.password, pending.role)
        .await?;

    app_state.db_client.delete_pending_user(&pending.email).await?;
    tracing::info!("User {} verified and created as {}", user.id, user.role.to_str());

    start_session(&app_state, &user, &headers).await
}

pub async fn resend_otp(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ResendOtpDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    match body.purpose {
        OtpPurpose::Signup => {
            app_state
                .db_client
                .get_pending_user(&body.email)
                .await?
                .ok_or_else(|| HttpError::bad_request("No pending signup for this email. Please sign up again"))?;
            app_state.otp_service.issue(&body.email, OtpPurpose::Signup).await?;
        }
        OtpPurpose::PasswordReset => {
            let user = app_state.db_client.get_user(None, Some(&body.email)).await?;
            if user.map(|u| u.is_active).unwrap_or(false) {
                app_state
                    .otp_service
                    .issue(&body.email, OtpPurpose::PasswordReset)
                    .await?;
            }
        }
    }

    Ok(Json(Response::success("If the email is eligible, a new code has been sent")))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let user = app_state
        .db_client
        .get_user(None, Some(&body.email))
        .await?
        .ok_or_else(|| HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, &user.password)
        .map_err(|_| HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    if !password_matched {
        return Err(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()));
    }

    if !user.is_active {
        return Err(HttpError::forbidden(ErrorMessage::AccountDeactivated.to_string()));
    }

    start_session(&app_state, &user, &headers).await
}

pub async fn logout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.db_client.revoke_session(auth.session_id).await?;
    app_state
        .realtime
        .close_session(auth.user.id, auth.session_id, "Logged out")
        .await;
    tracing::info!("Session {} ended for user {}", auth.session_id, auth.user.id);

    let expired = time::Duration::ZERO;
    let response = Json(Response::success("Logged out")).into_response();

    with_cookies(
        response,
        vec![
            build_cookie(&app_state, "token", String::new(), expired, true),
            build_cookie(&app_state, CSRF_COOKIE, String::new(), expired, false),
        ],
    )
}

pub async fn forgot_password(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let user = app_state.db_client.get_user(None, Some(&body.email)).await?;

    match user {
        Some(user) if user.is_active => {
            app_state
                .otp_service
                .issue(&user.email, OtpPurpose::PasswordReset)
                .await?;
        }
        _ => tracing::info!("Password reset requested for unknown or inactive email"),
    }

    Ok(Json(Response::success(
        "If an account exists for this email, a reset code has been sent",
    )))
}

pub async fn reset_password(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ResetPasswordRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let user = app_state
        .db_client
        .get_user(None, Some(&body.email))
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| HttpError::bad_request("Invalid or expired code"))?;

    app_state
        .otp_service
        .verify(&user.email, OtpPurpose::PasswordReset, &body.otp)
        .await?;

    let hashed_password = password::hash(&body.new_password)
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state
        .db_client
        .update_user_password(user.id, hashed_password)
        .await?;

    let revoked = app_state.db_client.revoke_user_sessions(user.id).await?;
    app_state
        .realtime
        .close_user(user.id, &ErrorMessage::SessionRevoked.to_string())
        .await;
    tracing::info!("Password reset for user {}, {} session(s) revoked", user.id, revoked);

    Ok(Json(Response::success(
        "Password has been successfully reset. Please log in",
    )))
}

pub async fn me(
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto::from_user(&auth.user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::test_support::test_state;

    fn app() -> Router {
        auth_handler().layer(Extension(test_state()))
    }

    #[tokio::test]
    async fn csrf_token_sets_a_readable_cookie() {
        let response = app()
            .oneshot(Request::get("/csrf-token").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("csrf_token="));
        assert!(!cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn signup_rejects_invalid_bodies_before_touching_the_db() {
        let body = serde_json::json!({
            "name": "Ada",
            "email": "not-an-email",
            "password": "short",
            "passwordConfirm": "different",
        });
        let response = app()
            .oneshot(
                Request::post("/signup")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn me_requires_a_token() {
        let response = app()
            .oneshot(Request::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

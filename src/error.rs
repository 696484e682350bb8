use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

static EXPOSE_ERROR_DETAIL: AtomicBool = AtomicBool::new(true);

/// Controls whether 5xx responses carry the underlying error text.
/// Turned off in production at startup.
pub fn set_expose_error_detail(expose: bool) {
    EXPOSE_ERROR_DETAIL.store(expose, Ordering::Relaxed);
}

fn expose_error_detail() -> bool {
    EXPOSE_ERROR_DETAIL.load(Ordering::Relaxed)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::to_string(&self).unwrap_or_default())
    }
}

#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    EmptyPassword,
    ExceededMaxPasswordLength(usize),
    InvalidHashFormat,
    HashingError,
    InvalidToken,
    TokenExpired,
    ServerError,
    WrongCredentials,
    EmailExist,
    UserNoLongerExist,
    AccountDeactivated,
    SessionRevoked,
    TokenNotProvided,
    PermissionDenied,
    UserNotAuthenticated,
    InvalidCsrfToken,
    DuplicateValue,
}

impl ToString for ErrorMessage {
    fn to_string(&self) -> String {
        self.to_str().to_owned()
    }
}

impl ErrorMessage {
    fn to_str(&self) -> String {
        match self {
            ErrorMessage::ServerError => "Server Error. Please try again later".to_string(),
            ErrorMessage::WrongCredentials => "Email or password is wrong".to_string(),
            ErrorMessage::EmailExist => "A user with this email already exists".to_string(),
            ErrorMessage::UserNoLongerExist => {
                "User belonging to this token no longer exists".to_string()
            }
            ErrorMessage::AccountDeactivated => "This account has been deactivated".to_string(),
            ErrorMessage::SessionRevoked => {
                "Session has ended. Please log in again".to_string()
            }
            ErrorMessage::EmptyPassword => "Password cannot be empty".to_string(),
            ErrorMessage::HashingError => "Error while hashing password".to_string(),
            ErrorMessage::InvalidHashFormat => "Invalid password hash format".to_string(),
            ErrorMessage::ExceededMaxPasswordLength(max_length) => {
                format!("Password must not be more than {} characters", max_length)
            }
            ErrorMessage::InvalidToken => "Invalid token. Please log in again".to_string(),
            ErrorMessage::TokenExpired => "Your token has expired. Please log in again".to_string(),
            ErrorMessage::TokenNotProvided => {
                "You are not logged in, please provide a token".to_string()
            }
            ErrorMessage::PermissionDenied => {
                "You are not allowed to perform this action".to_string()
            }
            ErrorMessage::UserNotAuthenticated => {
                "Authentication required. Please log in.".to_string()
            }
            ErrorMessage::InvalidCsrfToken => "Invalid CSRF token".to_string(),
            ErrorMessage::DuplicateValue => "Duplicate field value entered".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        HttpError {
            message: message.into(),
            status,
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn unique_constraint_violation(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::CONFLICT)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::CONFLICT)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::FORBIDDEN)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::NOT_FOUND)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::SERVICE_UNAVAILABLE)
    }

    pub fn into_http_response(self) -> Response {
        self.render(expose_error_detail())
    }

    /// Builds the response body; 5xx text is only attached when `expose_detail` is set.
    pub fn render(self, expose_detail: bool) -> Response {
        let body = if self.status.is_server_error() {
            tracing::error!(status = %self.status, "request failed: {}", self.message);
            ErrorResponse {
                status: "error".to_string(),
                message: "Something went wrong".to_string(),
                detail: expose_detail.then_some(self.message),
            }
        } else {
            ErrorResponse {
                status: "fail".to_string(),
                message: self.message,
                detail: None,
            }
        };

        (self.status, Json(body)).into_response()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HttpError: message: {}, status: {}", self.message, self.status)
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

/// Database errors with a known shape get a fixed status; the rest are 500s.
impl From<sqlx::Error> for HttpError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => HttpError::not_found("Resource not found"),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    HttpError::unique_constraint_violation(ErrorMessage::DuplicateValue.to_string())
                } else if db_err.is_foreign_key_violation() {
                    HttpError::bad_request("Referenced resource does not exist")
                } else if db_err.is_check_violation() {
                    HttpError::bad_request(format!("Invalid input data: {}", db_err.message()))
                } else {
                    HttpError::server_error(error.to_string())
                }
            }
            _ => HttpError::server_error(error.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for HttpError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();

        if messages.is_empty() {
            HttpError::bad_request(errors.to_string())
        } else {
            HttpError::bad_request(format!("Invalid input data. {}", messages.join(". ")))
        }
    }
}

impl From<jsonwebtoken::errors::Error> for HttpError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                HttpError::unauthorized(ErrorMessage::TokenExpired.to_string())
            }
            _ => HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct NameForm {
        #[validate(length(min = 3, message = "Name is too short"))]
        name: String,
    }

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn validation_errors_become_bad_requests() {
        let err: HttpError = NameForm { name: "ab".into() }.validate().unwrap_err().into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("Name is too short"));
    }

    #[test]
    fn row_not_found_is_404() {
        let err: HttpError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn expired_jwt_gets_its_own_message() {
        let err: HttpError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature)
                .into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, ErrorMessage::TokenExpired.to_string());

        let err: HttpError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature)
                .into();
        assert_eq!(err.message, ErrorMessage::InvalidToken.to_string());
    }

    #[tokio::test]
    async fn client_errors_are_reported_as_fail() {
        let response = HttpError::forbidden("nope").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_of(response).await;
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "nope");
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn server_errors_carry_detail_when_exposed() {
        let response = HttpError::server_error("db exploded").render(true);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Something went wrong");
        assert_eq!(body["detail"], "db exploded");
    }

    #[tokio::test]
    async fn server_errors_hide_detail_in_production() {
        let response = HttpError::server_error("db exploded").render(false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["message"], "Something went wrong");
        assert!(body.get("detail").is_none());
        assert!(!body.to_string().contains("db exploded"));
    }

    #[tokio::test]
    async fn client_errors_never_carry_detail() {
        let body = body_of(HttpError::conflict("taken").render(true)).await;
        assert_eq!(body["message"], "taken");
        assert!(body.get("detail").is_none());
    }
}

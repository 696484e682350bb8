use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::HttpError,
    models::{bookingmodel::BookingStatus, complaintmodel::ComplaintStatus},
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Company not found")]
    CompanyNotFound,

    #[error("Service {0} not found")]
    ServiceNotFound(Uuid),

    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("Complaint {0} not found")]
    ComplaintNotFound(Uuid),

    #[error("Booking cannot move from {} to {}", .0.to_str(), .1.to_str())]
    InvalidBookingTransition(BookingStatus, BookingStatus),

    #[error("Complaint cannot move from {} to {}", .0.to_str(), .1.to_str())]
    InvalidComplaintTransition(ComplaintStatus, ComplaintStatus),

    #[error("Cannot delete while {0} complaint(s) are unresolved")]
    ActiveComplaints(i64),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid or expired code")]
    InvalidOtp,

    #[error("Too many attempts. Please request a new code")]
    OtpAttemptsExceeded,

    #[error("Image uploads are not configured")]
    UploadUnavailable,

    #[error("Image host error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Database(e) => HttpError::from(e),
            other => HttpError::new(other.to_string(), other.status_code()),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Upstream(err.to_string())
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UserNotFound(_)
            | ServiceError::CompanyNotFound
            | ServiceError::ServiceNotFound(_)
            | ServiceError::BookingNotFound(_)
            | ServiceError::ComplaintNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::InvalidBookingTransition(_, _)
            | ServiceError::InvalidComplaintTransition(_, _)
            | ServiceError::Validation(_)
            | ServiceError::InvalidOtp => StatusCode::BAD_REQUEST,

            ServiceError::ActiveComplaints(_) | ServiceError::Conflict(_) => StatusCode::CONFLICT,

            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,

            ServiceError::OtpAttemptsExceeded => StatusCode::TOO_MANY_REQUESTS,

            ServiceError::UploadUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_name_both_states() {
        let err = ServiceError::InvalidComplaintTransition(
            ComplaintStatus::Resolved,
            ComplaintStatus::InProgress,
        );
        assert_eq!(err.to_string(), "Complaint cannot move from resolved to in-progress");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn delete_gate_is_a_conflict() {
        let http: HttpError = ServiceError::ActiveComplaints(2).into();
        assert_eq!(http.status, StatusCode::CONFLICT);
        assert!(http.message.contains('2'));
    }

    #[test]
    fn database_errors_keep_their_mapping() {
        let http: HttpError = ServiceError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(http.status, StatusCode::NOT_FOUND);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::bookingmodel::BookingStatus;

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingDto {
    pub service_id: Uuid,

    pub date: DateTime<Utc>,

    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBookingStatusDto {
    pub status: BookingStatus,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct BookingQueryDto {
    pub status: Option<BookingStatus>,
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

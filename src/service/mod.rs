pub mod background_jobs;
pub mod booking_service;
pub mod chat_service;
pub mod complaint_service;
pub mod error;
pub mod lifecycle_service;
pub mod otp_service;
pub mod upload_service;

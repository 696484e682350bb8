pub mod otp_generator;
pub mod password;
pub mod sanitize;
pub mod token;

pub mod bookingdtos;
pub mod bookmarkdtos;
pub mod chatdtos;
pub mod companydtos;
pub mod complaintdtos;
pub mod servicedtos;
pub mod userdtos;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Response {
            status: "success",
            message: message.into(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct RequestQueryDto {
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

impl RequestQueryDto {
    pub fn page(&self) -> u32 {
        page_number(self.page.unwrap_or(1))
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(10)
    }
}

/// Query pages arrive as `usize`; anything past `u32::MAX` pins to it.
pub fn page_number(page: usize) -> u32 {
    u32::try_from(page).unwrap_or(u32::MAX)
}

/// Translates 1-based page numbers into an SQL offset.
pub fn page_offset(page: u32, limit: usize) -> i64 {
    (page.saturating_sub(1) as i64) * limit as i64
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9][0-9 \-]{6,18}[0-9]$").expect("valid phone regex"))
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone_regex().is_match(phone.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_phone");
        err.message = Some("Phone number is invalid".into());
        Err(err)
    }
}

pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_url");
        err.message = Some("URL must start with http:// or https://".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_start_at_zero() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
    }

    #[test]
    fn huge_pages_do_not_wrap_around() {
        assert_eq!(page_number(7), 7);
        assert_eq!(page_number(usize::MAX), u32::MAX);
        assert!(page_offset(page_number(usize::MAX), 100) > 0);

        let q = RequestQueryDto { page: Some(10001), limit: Some(10) };
        assert!(q.validate().is_err());
        let q = RequestQueryDto { page: Some(10000), limit: Some(10) };
        assert!(q.validate().is_ok());
    }

    #[test]
    fn phone_numbers() {
        assert!(validate_phone("+234 803 123 4567").is_ok());
        assert!(validate_phone("0803-123-4567").is_ok());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("12").is_err());
    }

    #[test]
    fn paging_defaults() {
        let q = RequestQueryDto::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 10);
        let q = RequestQueryDto { page: Some(1), limit: Some(500) };
        assert!(q.validate().is_err());
    }
}

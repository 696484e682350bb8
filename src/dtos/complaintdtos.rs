use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::complaintmodel::{Complaint, ComplaintImage, ComplaintStatus};

use super::validate_url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplaintImageDto {
    pub url: String,
    pub delete_handle: Option<String>,
}

fn validate_images(images: &Vec<ComplaintImageDto>) -> Result<(), ValidationError> {
    for image in images {
        validate_url(&image.url)?;
    }
    Ok(())
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateComplaintDto {
    pub booking_id: Uuid,

    #[validate(length(min = 3, max = 200, message = "Subject must be between 3 and 200 characters"))]
    pub subject: String,

    #[validate(length(min = 10, max = 5000, message = "Description must be between 10 and 5000 characters"))]
    pub description: String,

    #[validate(
        length(max = 5, message = "At most 5 images can be attached"),
        custom = "validate_images"
    )]
    #[serde(default)]
    pub images: Vec<ComplaintImageDto>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct StaffComplaintUpdateDto {
    pub status: ComplaintStatus,

    #[validate(length(max = 5000, message = "Response must be at most 5000 characters"))]
    pub admin_response: Option<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmComplaintDto {
    /// `true` accepts the fix, `false` sends the complaint back to staff.
    pub resolved: bool,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct ComplaintQueryDto {
    pub status: Option<ComplaintStatus>,
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ComplaintDetailDto {
    #[serde(flatten)]
    pub complaint: Complaint,
    pub images: Vec<ComplaintImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complaint(images: Vec<ComplaintImageDto>) -> CreateComplaintDto {
        CreateComplaintDto {
            booking_id: Uuid::new_v4(),
            subject: "No show".into(),
            description: "The cleaner never arrived at the booked time.".into(),
            images,
        }
    }

    #[test]
    fn accepts_a_plain_complaint() {
        assert!(complaint(vec![]).validate().is_ok());
    }

    #[test]
    fn nested_images_are_validated() {
        let bad = ComplaintImageDto {
            url: "not-a-url".into(),
            delete_handle: None,
        };
        assert!(complaint(vec![bad]).validate().is_err());
    }

    #[test]
    fn caps_attachments() {
        let image = ComplaintImageDto {
            url: "https://i.example.com/1.png".into(),
            delete_handle: Some("abc".into()),
        };
        assert!(complaint(vec![image; 6]).validate().is_err());
    }
}

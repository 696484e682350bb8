use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageDto {
    pub receiver_id: Uuid,

    #[validate(length(min = 1, max = 4000, message = "Message must be between 1 and 4000 characters"))]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadDto {
    pub sender_id: Uuid,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct UploadImageDto {
    #[validate(length(min = 1, message = "Image data is required"))]
    pub image: String,

    #[validate(length(max = 50, message = "Folder name is too long"))]
    pub folder: Option<String>,
}

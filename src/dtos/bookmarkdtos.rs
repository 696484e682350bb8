use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookmarkDto {
    pub service_id: Uuid,
}

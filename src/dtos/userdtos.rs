use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{usermodel::{User, UserRole}, verificationmodels::OtpPurpose};

use super::{validate_phone, validate_url};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SignupUserDto {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(
        length(min = 1, message = "Password is required"),
        length(min = 8, message = "Password must be at least 8 characters")
    )]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: String,

    #[validate(custom = "validate_signup_role")]
    pub role: Option<UserRole>,
}

fn validate_signup_role(role: &UserRole) -> Result<(), ValidationError> {
    match role {
        UserRole::User | UserRole::Provider => Ok(()),
        _ => {
            let mut err = ValidationError::new("invalid_role");
            err.message = Some("Only user and provider accounts can sign up".into());
            Err(err)
        }
    }
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct ResendOtpDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,

    pub purpose: OtpPurpose,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct ForgotPasswordRequestDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ResetPasswordRequestDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,

    #[validate(
        length(min = 1, message = "New password is required."),
        length(min = 8, message = "new password must be at least 8 characters")
    )]
    pub new_password: String,

    #[validate(
        length(min = 1, message = "New password confirm is required."),
        must_match(other = "new_password", message = "new passwords do not match")
    )]
    pub new_password_confirm: String,
}

#[derive(Debug, Validate, Default, Clone, Serialize, Deserialize)]
pub struct UserPasswordUpdateDto {
    #[validate(
        length(min = 1, message = "New password is required."),
        length(min = 8, message = "new password must be at least 8 characters")
    )]
    pub new_password: String,

    #[validate(
        length(min = 1, message = "New password confirm is required."),
        must_match(other = "new_password", message = "new passwords do not match")
    )]
    pub new_password_confirm: String,

    #[validate(length(min = 1, message = "Old password is required."))]
    pub old_password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(custom = "validate_url")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivation_reason: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
            phone: user.phone.clone(),
            avatar_url: user.avatar_url.clone(),
            is_active: user.is_active,
            deactivated_at: user.deactivated_at,
            deactivation_reason: user.deactivation_reason.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    pub fn filter_users(user: &[User]) -> Vec<FilterUserDto> {
        user.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

impl UserResponseDto {
    pub fn from_user(user: &User) -> Self {
        UserResponseDto {
            status: "success".to_string(),
            data: UserData {
                user: FilterUserDto::filter_user(user),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub token: String,
    pub data: UserData,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct AdminUserQueryDto {
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    #[validate(length(max = 100))]
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserStatusUpdateDto {
    pub is_active: bool,
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUpdateDto {
    pub role: UserRole,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DeleteUserQuery {
    pub force: Option<bool>,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(role: Option<UserRole>) -> SignupUserDto {
        SignupUserDto {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "password123".into(),
            password_confirm: "password123".into(),
            role,
        }
    }

    #[test]
    fn signup_accepts_customers_and_providers() {
        assert!(signup(None).validate().is_ok());
        assert!(signup(Some(UserRole::User)).validate().is_ok());
        assert!(signup(Some(UserRole::Provider)).validate().is_ok());
    }

    #[test]
    fn signup_refuses_staff_roles() {
        assert!(signup(Some(UserRole::Admin)).validate().is_err());
        assert!(signup(Some(UserRole::Superuser)).validate().is_err());
    }

    #[test]
    fn signup_requires_matching_passwords() {
        let mut dto = signup(None);
        dto.password_confirm = "different1".into();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn profile_update_checks_optional_fields() {
        let dto = UpdateProfileDto {
            name: None,
            phone: Some("not a phone".into()),
            avatar_url: None,
        };
        assert!(dto.validate().is_err());

        let dto = UpdateProfileDto {
            name: Some("Ada".into()),
            phone: Some("+44 20 7946 0958".into()),
            avatar_url: Some("https://i.example.com/a.png".into()),
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn otp_must_be_six_characters() {
        let dto = VerifyOtpDto {
            email: "ada@example.com".into(),
            otp: "123".into(),
        };
        assert!(dto.validate().is_err());
    }
}

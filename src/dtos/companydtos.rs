use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{companymodel::Company, servicemodel::Service};

use super::{validate_phone, validate_url};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompanyDto {
    #[validate(length(min = 2, max = 150, message = "Company name must be between 2 and 150 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,

    #[validate(custom = "validate_url")]
    pub logo_url: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateCompanyDto {
    #[validate(length(min = 2, max = 150, message = "Company name must be between 2 and 150 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: Option<String>,

    #[validate(custom = "validate_url")]
    pub logo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompanyWithServices {
    #[serde(flatten)]
    pub company: Company,
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyVerifyDto {
    pub is_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveFlagDto {
    pub is_active: bool,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct AdminCompanyQueryDto {
    pub verified: Option<bool>,
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_name_bounds() {
        let dto = CreateCompanyDto {
            name: "A".into(),
            description: None,
            email: None,
            phone: None,
            address: None,
            logo_url: None,
        };
        assert!(dto.validate().is_err());

        let dto = CreateCompanyDto {
            name: "Acme Cleaning".into(),
            email: Some("hello@acme.test".into()),
            ..dto
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn logo_must_be_a_link() {
        let dto = UpdateCompanyDto {
            logo_url: Some("ftp://nope".into()),
            ..Default::default()
        };
        assert!(dto.validate().is_err());
    }
}

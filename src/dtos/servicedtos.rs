use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::servicemodel::{DeleteMode, RatingWithUser, ServiceListing};

use super::validate_url;

fn validate_price(price: &BigDecimal) -> Result<(), ValidationError> {
    if *price < BigDecimal::zero() {
        let mut err = ValidationError::new("invalid_price");
        err.message = Some("Price cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceDto {
    #[validate(length(min = 2, max = 150, message = "Service name must be between 2 and 150 characters"))]
    pub name: String,

    #[validate(length(min = 10, max = 5000, message = "Description must be between 10 and 5000 characters"))]
    pub description: String,

    #[validate(length(min = 2, max = 80, message = "Category is required"))]
    pub category: String,

    #[validate(custom = "validate_price")]
    pub price: BigDecimal,

    #[validate(range(min = 1, max = 10080, message = "Duration must be between 1 minute and 7 days"))]
    pub duration_minutes: Option<i32>,

    #[validate(custom = "validate_url")]
    pub image_url: Option<String>,

    /// Staff may create on behalf of a company; providers must leave it
    /// empty or point at their own company.
    pub company_id: Option<Uuid>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateServiceDto {
    #[validate(length(min = 2, max = 150, message = "Service name must be between 2 and 150 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 10, max = 5000, message = "Description must be between 10 and 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 2, max = 80, message = "Category is required"))]
    pub category: Option<String>,

    #[validate(custom = "validate_price")]
    pub price: Option<BigDecimal>,

    #[validate(range(min = 1, max = 10080, message = "Duration must be between 1 minute and 7 days"))]
    pub duration_minutes: Option<i32>,

    #[validate(custom = "validate_url")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceQueryDto {
    #[validate(length(max = 100))]
    pub q: Option<String>,
    #[validate(length(max = 80))]
    pub category: Option<String>,
    pub company_id: Option<Uuid>,
    pub min_price: Option<BigDecimal>,
    pub max_price: Option<BigDecimal>,
    pub sort: Option<ServiceSort>,
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DeleteServiceQuery {
    pub mode: Option<DeleteMode>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct RateServiceDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub value: i16,

    #[validate(length(max = 2000, message = "Review must be at most 2000 characters"))]
    pub review: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ServiceDetailDto {
    #[serde(flatten)]
    pub service: ServiceListing,
    pub ratings: Vec<RatingWithUser>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn service(price: &str) -> CreateServiceDto {
        CreateServiceDto {
            name: "Deep clean".into(),
            description: "Whole-apartment deep cleaning".into(),
            category: "cleaning".into(),
            price: BigDecimal::from_str(price).unwrap(),
            duration_minutes: Some(120),
            image_url: None,
            company_id: None,
        }
    }

    #[test]
    fn negative_prices_are_rejected() {
        assert!(service("49.99").validate().is_ok());
        assert!(service("0").validate().is_ok());
        assert!(service("-1").validate().is_err());
    }

    #[test]
    fn rating_range_is_one_to_five() {
        for (value, ok) in [(0, false), (1, true), (5, true), (6, false)] {
            let dto = RateServiceDto { value, review: None };
            assert_eq!(dto.validate().is_ok(), ok, "value {}", value);
        }
    }

    #[test]
    fn sort_names() {
        let sort: ServiceSort = serde_json::from_str("\"price_desc\"").unwrap();
        assert_eq!(sort, ServiceSort::PriceDesc);
    }
}

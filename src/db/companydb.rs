// db/companydb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::DBClient;
use crate::{
    dtos::{
        companydtos::{CreateCompanyDto, UpdateCompanyDto},
        page_offset,
    },
    models::companymodel::Company,
};

#[async_trait]
pub trait CompanyExt {
    async fn create_company(
        &self,
        owner_id: Uuid,
        company: &CreateCompanyDto,
    ) -> Result<Company, sqlx::Error>;

    async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>, sqlx::Error>;

    async fn get_company_by_owner(&self, owner_id: Uuid) -> Result<Option<Company>, sqlx::Error>;

    async fn update_company(
        &self,
        company_id: Uuid,
        company: &UpdateCompanyDto,
    ) -> Result<Company, sqlx::Error>;

    async fn get_companies(
        &self,
        verified: Option<bool>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Company>, sqlx::Error>;

    async fn get_company_count(&self, verified: Option<bool>) -> Result<i64, sqlx::Error>;

    async fn set_company_verified(
        &self,
        company_id: Uuid,
        is_verified: bool,
    ) -> Result<Company, sqlx::Error>;

    async fn reactivate_company(&self, company_id: Uuid) -> Result<Company, sqlx::Error>;
}

#[async_trait]
impl CompanyExt for DBClient {
    async fn create_company(
        &self,
        owner_id: Uuid,
        company: &CreateCompanyDto,
    ) -> Result<Company, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (owner_id, name, description, email, phone, address, logo_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(company.name.trim())
        .bind(company.description.as_deref())
        .bind(company.email.as_deref())
        .bind(company.phone.as_deref())
        .bind(company.address.as_deref())
        .bind(company.logo_url.as_deref())
        .fetch_one(&self.pool)
        .await
    }

    async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>, sqlx::Error> {
        sqlx::query_as::<_, Company>(r#"SELECT * FROM companies WHERE id = $1"#)
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_company_by_owner(&self, owner_id: Uuid) -> Result<Option<Company>, sqlx::Error> {
        sqlx::query_as::<_, Company>(r#"SELECT * FROM companies WHERE owner_id = $1"#)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_company(
        &self,
        company_id: Uuid,
        company: &UpdateCompanyDto,
    ) -> Result<Company, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                logo_url = COALESCE($7, logo_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(company.name.as_deref().map(str::trim))
        .bind(company.description.as_deref())
        .bind(company.email.as_deref())
        .bind(company.phone.as_deref())
        .bind(company.address.as_deref())
        .bind(company.logo_url.as_deref())
        .fetch_one(&self.pool)
        .await
    }

    async fn get_companies(
        &self,
        verified: Option<bool>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Company>, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT * FROM companies
            WHERE ($1::boolean IS NULL OR is_verified = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(verified)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn get_company_count(&self, verified: Option<bool>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM companies WHERE ($1::boolean IS NULL OR is_verified = $1)"#,
        )
        .bind(verified)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_company_verified(
        &self,
        company_id: Uuid,
        is_verified: bool,
    ) -> Result<Company, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET is_verified = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(is_verified)
        .fetch_one(&self.pool)
        .await
    }

    async fn reactivate_company(&self, company_id: Uuid) -> Result<Company, sqlx::Error> {
        // services stay inactive; providers re-enable them one by one
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET is_active = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await
    }
}

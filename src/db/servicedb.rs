// db/servicedb.rs
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::DBClient;
use crate::{
    dtos::{
        page_number, page_offset,
        servicedtos::{CreateServiceDto, ServiceQueryDto, ServiceSort, UpdateServiceDto},
    },
    models::servicemodel::{Rating, RatingWithUser, Service, ServiceListing},
};

const LISTING_SELECT: &str = r#"
    SELECT s.*, c.name AS company_name, c.is_verified AS company_verified,
           c.is_active AS company_active
    FROM services s
    JOIN companies c ON c.id = s.company_id
"#;

/// Which services a listing may include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Active services of active companies.
    Public,
    /// Everything, for moderation screens.
    All,
}

fn push_filters<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    query: &'a ServiceQueryDto,
    visibility: Visibility,
) {
    builder.push(" WHERE TRUE");

    if visibility == Visibility::Public {
        builder.push(" AND s.is_active = TRUE AND c.is_active = TRUE");
    }
    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (s.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR s.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR s.category ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = query.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder.push(" AND LOWER(s.category) = LOWER(").push_bind(category).push(")");
    }
    if let Some(company_id) = query.company_id {
        builder.push(" AND s.company_id = ").push_bind(company_id);
    }
    if let Some(min_price) = &query.min_price {
        builder.push(" AND s.price >= ").push_bind(min_price);
    }
    if let Some(max_price) = &query.max_price {
        builder.push(" AND s.price <= ").push_bind(max_price);
    }
}

#[async_trait]
pub trait ServiceExt {
    async fn create_service(
        &self,
        company_id: Uuid,
        created_by: Uuid,
        service: &CreateServiceDto,
    ) -> Result<Service, sqlx::Error>;

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, sqlx::Error>;

    async fn get_service_listing(
        &self,
        service_id: Uuid,
    ) -> Result<Option<ServiceListing>, sqlx::Error>;

    async fn update_service(
        &self,
        service_id: Uuid,
        service: &UpdateServiceDto,
    ) -> Result<Service, sqlx::Error>;

    async fn get_services(
        &self,
        query: &ServiceQueryDto,
        visibility: Visibility,
    ) -> Result<(Vec<ServiceListing>, i64), sqlx::Error>;

    async fn get_company_services(
        &self,
        company_id: Uuid,
        only_active: bool,
    ) -> Result<Vec<Service>, sqlx::Error>;

    async fn set_service_active(
        &self,
        service_id: Uuid,
        is_active: bool,
    ) -> Result<Service, sqlx::Error>;

    async fn get_service_ratings(
        &self,
        service_id: Uuid,
    ) -> Result<Vec<RatingWithUser>, sqlx::Error>;

    async fn upsert_rating(
        &self,
        service_id: Uuid,
        user_id: Uuid,
        value: i16,
        review: Option<String>,
    ) -> Result<(Rating, Service), sqlx::Error>;

    async fn delete_rating(
        &self,
        service_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Service>, sqlx::Error>;
}

#[async_trait]
impl ServiceExt for DBClient {
    async fn create_service(
        &self,
        company_id: Uuid,
        created_by: Uuid,
        service: &CreateServiceDto,
    ) -> Result<Service, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services
                (company_id, created_by, name, description, category, price, duration_minutes, image_url)
            VALUES ($1, $2, $3, $4, LOWER($5), $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(created_by)
        .bind(service.name.trim())
        .bind(&service.description)
        .bind(service.category.trim())
        .bind(&service.price)
        .bind(service.duration_minutes)
        .bind(service.image_url.as_deref())
        .fetch_one(&self.pool)
        .await
    }

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, sqlx::Error> {
        sqlx::query_as::<_, Service>(r#"SELECT * FROM services WHERE id = $1"#)
            .bind(service_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_service_listing(
        &self,
        service_id: Uuid,
    ) -> Result<Option<ServiceListing>, sqlx::Error> {
        let sql = format!("{} WHERE s.id = $1", LISTING_SELECT);
        sqlx::query_as::<_, ServiceListing>(&sql)
            .bind(service_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_service(
        &self,
        service_id: Uuid,
        service: &UpdateServiceDto,
    ) -> Result<Service, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"
            UPDATE services
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE(LOWER($4), category),
                price = COALESCE($5, price),
                duration_minutes = COALESCE($6, duration_minutes),
                image_url = COALESCE($7, image_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(service_id)
        .bind(service.name.as_deref().map(str::trim))
        .bind(service.description.as_deref())
        .bind(service.category.as_deref().map(str::trim))
        .bind(service.price.as_ref())
        .bind(service.duration_minutes)
        .bind(service.image_url.as_deref())
        .fetch_one(&self.pool)
        .await
    }

    async fn get_services(
        &self,
        query: &ServiceQueryDto,
        visibility: Visibility,
    ) -> Result<(Vec<ServiceListing>, i64), sqlx::Error> {
        let page = page_number(query.page.unwrap_or(1));
        let limit = query.limit.unwrap_or(12);

        let mut builder = QueryBuilder::<Postgres>::new(LISTING_SELECT);
        push_filters(&mut builder, query, visibility);
        builder.push(match query.sort.unwrap_or_default() {
            ServiceSort::Newest => " ORDER BY s.created_at DESC",
            ServiceSort::PriceAsc => " ORDER BY s.price ASC, s.created_at DESC",
            ServiceSort::PriceDesc => " ORDER BY s.price DESC, s.created_at DESC",
            ServiceSort::Rating => " ORDER BY s.rating_average DESC, s.rating_count DESC",
        });
        builder
            .push(" LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(page_offset(page, limit));

        let services = builder
            .build_query_as::<ServiceListing>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_builder = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM services s JOIN companies c ON c.id = s.company_id",
        );
        push_filters(&mut count_builder, query, visibility);
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((services, total))
    }

    async fn get_company_services(
        &self,
        company_id: Uuid,
        only_active: bool,
    ) -> Result<Vec<Service>, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"
            SELECT * FROM services
            WHERE company_id = $1 AND ($2 = FALSE OR is_active = TRUE)
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .bind(only_active)
        .fetch_all(&self.pool)
        .await
    }

    async fn set_service_active(
        &self,
        service_id: Uuid,
        is_active: bool,
    ) -> Result<Service, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"
            UPDATE services
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(service_id)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_service_ratings(
        &self,
        service_id: Uuid,
    ) -> Result<Vec<RatingWithUser>, sqlx::Error> {
        sqlx::query_as::<_, RatingWithUser>(
            r#"
            SELECT r.user_id, u.name AS user_name, r.value, r.review, r.updated_at
            FROM service_ratings r
            JOIN users u ON u.id = r.user_id
            WHERE r.service_id = $1
            ORDER BY r.updated_at DESC
            "#,
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn upsert_rating(
        &self,
        service_id: Uuid,
        user_id: Uuid,
        value: i16,
        review: Option<String>,
    ) -> Result<(Rating, Service), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let rating = sqlx::query_as::<_, Rating>(
            r#"
            INSERT INTO service_ratings (service_id, user_id, value, review)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (service_id, user_id) DO UPDATE
            SET value = EXCLUDED.value,
                review = EXCLUDED.review,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(service_id)
        .bind(user_id)
        .bind(value)
        .bind(review)
        .fetch_one(&mut *tx)
        .await?;

        let service = recompute_rating(&mut tx, service_id).await?;

        tx.commit().await?;
        Ok((rating, service))
    }

    async fn delete_rating(
        &self,
        service_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Service>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            r#"DELETE FROM service_ratings WHERE service_id = $1 AND user_id = $2"#,
        )
        .bind(service_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed == 0 {
            return Ok(None);
        }

        let service = recompute_rating(&mut tx, service_id).await?;

        tx.commit().await?;
        Ok(Some(service))
    }
}

/// Refreshes the cached average and count from the ratings table.
pub(crate) async fn recompute_rating(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    service_id: Uuid,
) -> Result<Service, sqlx::Error> {
    sqlx::query_as::<_, Service>(
        r#"
        UPDATE services
        SET rating_average = COALESCE(
                (SELECT ROUND(AVG(value)::numeric, 2)::float8 FROM service_ratings WHERE service_id = $1),
                0
            ),
            rating_count = (SELECT COUNT(*)::int FROM service_ratings WHERE service_id = $1),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(service_id)
    .fetch_one(&mut **tx)
    .await
}

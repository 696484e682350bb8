// db.rs
use sqlx::{Pool, Postgres};

pub mod admindb;
pub mod bookingdb;
pub mod bookmarkdb;
pub mod chatdb;
pub mod companydb;
pub mod complaintdb;
pub mod lifecycledb;
pub mod servicedb;
pub mod userdb;
pub mod verificationdb;

#[derive(Debug, Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

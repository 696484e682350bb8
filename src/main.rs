mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod realtime;
mod routes;
mod service;
mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use config::Config;
use db::DBClient;
use dotenv::dotenv;
use realtime::RealtimeHub;
use routes::create_router;
use service::{
    background_jobs::{start_cleanup_job, start_complaint_auto_resolve_job},
    booking_service::BookingService,
    chat_service::ChatService,
    complaint_service::ComplaintService,
    lifecycle_service::LifecycleService,
    otp_service::OtpService,
    upload_service::UploadService,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub realtime: Arc<RealtimeHub>,
    pub booking_service: Arc<BookingService>,
    pub complaint_service: Arc<ComplaintService>,
    pub lifecycle_service: Arc<LifecycleService>,
    pub chat_service: Arc<ChatService>,
    pub otp_service: Arc<OtpService>,
    pub upload_service: Arc<UploadService>,
}

impl AppState {
    pub fn new(env: Config, db_client: DBClient) -> Self {
        let db_client = Arc::new(db_client);
        let realtime = Arc::new(RealtimeHub::new());

        let otp_service = OtpService::new(
            db_client.clone(),
            env.otp_ttl_minutes,
            env.otp_max_attempts,
            !env.is_production(),
        );
        let upload_service = UploadService::new(
            env.image_host_url.clone(),
            env.image_host_key.clone(),
            env.max_upload_mb,
        );

        AppState {
            booking_service: Arc::new(BookingService::new(db_client.clone(), realtime.clone())),
            complaint_service: Arc::new(ComplaintService::new(db_client.clone(), realtime.clone())),
            lifecycle_service: Arc::new(LifecycleService::new(db_client.clone())),
            chat_service: Arc::new(ChatService::new(db_client.clone(), realtime.clone())),
            otp_service: Arc::new(otp_service),
            upload_service: Arc::new(upload_service),
            env,
            db_client,
            realtime,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    error::set_expose_error_detail(!config.is_production());

    let pool = match PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);
    if let Err(err) = db_client.run_migrations().await {
        tracing::error!("Failed to run migrations: {}", err);
        std::process::exit(1);
    }

    let allowed_origin = match config.client_url.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(err) => {
            tracing::error!("CLIENT_URL is not a valid origin: {}", err);
            std::process::exit(1);
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(allowed_origin))
        .allow_headers([
            AUTHORIZATION,
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static(middleware::CSRF_HEADER),
        ])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ]);

    let app_state = Arc::new(AppState::new(config.clone(), db_client));

    tokio::spawn(start_cleanup_job(app_state.clone()));
    tokio::spawn(start_complaint_auto_resolve_job(app_state.clone()));

    let app = create_router(app_state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server stopped: {}", err);
    }
}

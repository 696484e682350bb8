// service/background_jobs.rs
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::{db::verificationdb::VerificationExt, AppState};

/// Hourly removal of expired OTPs, pending signups and dead sessions.
pub async fn start_cleanup_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(3600));

    loop {
        interval.tick().await;

        match app_state.db_client.cleanup_expired().await {
            Ok(report) => tracing::info!(
                "Cleanup job at {}: {} OTP(s), {} pending signup(s), {} session(s) removed",
                Utc::now(),
                report.otps,
                report.pending_users,
                report.sessions
            ),
            Err(e) => tracing::error!("Cleanup job failed: {}", e),
        }
    }
}

/// Hourly resolution of complaints the owner never confirmed.
pub async fn start_complaint_auto_resolve_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(3600));
    let days = app_state.env.complaint_auto_resolve_days;

    loop {
        interval.tick().await;

        match app_state.complaint_service.auto_resolve(days).await {
            Ok(count) => tracing::info!(
                "Auto-resolve job at {}: {} complaint(s) resolved after {} day(s)",
                Utc::now(),
                count,
                days
            ),
            Err(e) => tracing::error!("Auto-resolve job failed: {}", e),
        }
    }
}

// service/otp_service.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    db::{verificationdb::VerificationExt, DBClient},
    models::verificationmodels::{OtpPurpose, OtpRecord},
    service::error::ServiceError,
    utils::otp_generator::{generate_otp, hash_otp, otp_matches},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Expired,
    Exhausted,
    Mismatch,
}

/// Expiry and the attempt cap are checked before the code itself.
pub fn check_otp(record: &OtpRecord, code: &str, now: DateTime<Utc>, max_attempts: i32) -> OtpCheck {
    if record.expires_at <= now {
        OtpCheck::Expired
    } else if record.attempts >= max_attempts {
        OtpCheck::Exhausted
    } else if otp_matches(code, &record.code_hash) {
        OtpCheck::Valid
    } else {
        OtpCheck::Mismatch
    }
}

#[derive(Debug, Clone)]
pub struct OtpService {
    db_client: Arc<DBClient>,
    ttl_minutes: i64,
    max_attempts: i32,
    log_codes: bool,
}

impl OtpService {
    pub fn new(db_client: Arc<DBClient>, ttl_minutes: i64, max_attempts: i32, log_codes: bool) -> Self {
        Self {
            db_client,
            ttl_minutes,
            max_attempts,
            log_codes,
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    /// Replaces any earlier code for the same email and purpose.
    pub async fn issue(&self, email: &str, purpose: OtpPurpose) -> Result<DateTime<Utc>, ServiceError> {
        let code = generate_otp();
        let expires_at = Utc::now() + Duration::minutes(self.ttl_minutes);

        self.db_client
            .create_otp(email, hash_otp(&code), purpose, expires_at)
            .await?;

        self.deliver(email, purpose, &code);
        Ok(expires_at)
    }

    fn deliver(&self, email: &str, purpose: OtpPurpose, code: &str) {
        if self.log_codes {
            tracing::info!("{} code for {}: {}", purpose.to_str(), email, code);
        } else {
            tracing::info!("{} code issued for {}", purpose.to_str(), email);
        }
    }

    /// Consumes the code on success.
    pub async fn verify(&self, email: &str, purpose: OtpPurpose, code: &str) -> Result<(), ServiceError> {
        let record = self
            .db_client
            .get_latest_otp(email, purpose)
            .await?
            .ok_or(ServiceError::InvalidOtp)?;

        match check_otp(&record, code, Utc::now(), self.max_attempts) {
            OtpCheck::Valid => {
                self.db_client.delete_otp(record.id).await?;
                Ok(())
            }
            OtpCheck::Expired => {
                self.db_client.delete_otp(record.id).await?;
                Err(ServiceError::InvalidOtp)
            }
            OtpCheck::Exhausted => {
                self.db_client.delete_otp(record.id).await?;
                Err(ServiceError::OtpAttemptsExceeded)
            }
            OtpCheck::Mismatch => {
                let attempts = self.db_client.increment_otp_attempts(record.id).await?;
                tracing::warn!(
                    "Wrong {} code for {} ({}/{})",
                    purpose.to_str(),
                    email,
                    attempts,
                    self.max_attempts
                );
                if attempts >= self.max_attempts {
                    self.db_client.delete_otp(record.id).await?;
                    return Err(ServiceError::OtpAttemptsExceeded);
                }
                Err(ServiceError::InvalidOtp)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record(code: &str, expires_in: Duration, attempts: i32) -> OtpRecord {
        OtpRecord {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            code_hash: hash_otp(code),
            purpose: OtpPurpose::Signup,
            attempts,
            expires_at: Utc::now() + expires_in,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn valid_code_passes() {
        let r = record("123456", Duration::minutes(5), 0);
        assert_eq!(check_otp(&r, "123456", Utc::now(), 5), OtpCheck::Valid);
        assert_eq!(check_otp(&r, "654321", Utc::now(), 5), OtpCheck::Mismatch);
    }

    #[test]
    fn expiry_wins_over_a_correct_code() {
        let r = record("123456", Duration::minutes(-1), 0);
        assert_eq!(check_otp(&r, "123456", Utc::now(), 5), OtpCheck::Expired);
    }

    #[test]
    fn attempt_cap_blocks_further_guesses() {
        let r = record("123456", Duration::minutes(5), 5);
        assert_eq!(check_otp(&r, "123456", Utc::now(), 5), OtpCheck::Exhausted);
    }
}

// utils/otp_generator.rs
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub fn generate_otp() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(0..1_000_000))
}

/// Random token for the double-submit CSRF cookie.
pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_otp(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

pub fn otp_matches(code: &str, stored_hash: &str) -> bool {
    let candidate = hash_otp(code);
    candidate.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..50 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn hashed_otp_matches_only_the_original() {
        let stored = hash_otp("042917");
        assert_eq!(stored.len(), 64);
        assert!(otp_matches("042917", &stored));
        assert!(otp_matches(" 042917 ", &stored));
        assert!(!otp_matches("042918", &stored));
    }

    #[test]
    fn csrf_tokens_are_unique_hex() {
        let a = generate_csrf_token();
        let b = generate_csrf_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}

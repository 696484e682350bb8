use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// User id.
    pub sub: String,
    /// Session id, checked against the sessions table on every request.
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

impl TokenClaims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.jti).ok()
    }
}

pub fn create_token(
    user_id: &str,
    session_id: &str,
    secret: &[u8],
    expires_in_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::minutes(expires_in_minutes)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        jti: session_id.to_string(),
        iat,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

pub fn decode_token<T: Into<String>>(
    token: T,
    secret: &[u8],
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    )?;

    Ok(decoded.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn round_trips_user_and_session() {
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let token =
            create_token(&user_id.to_string(), &session_id.to_string(), SECRET, 60).unwrap();

        let claims = decode_token(token, SECRET).unwrap();
        assert_eq!(claims.user_id(), Some(user_id));
        assert_eq!(claims.session_id(), Some(session_id));
    }

    #[test]
    fn rejects_foreign_signature() {
        let token = create_token("abc", "def", SECRET, 60).unwrap();
        assert!(decode_token(token, b"other-secret").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let token = create_token("abc", "def", SECRET, -10).unwrap();
        let err = decode_token(token, SECRET).unwrap_err();
        assert_eq!(
            *err.kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        );
    }

    #[test]
    fn rejects_empty_subject() {
        assert!(create_token("", "def", SECRET, 60).is_err());
    }
}

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, Result};

/// Claims carried by the console session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // Lino username
    pub token: String, // Lino bearer token
    pub super_admin: bool,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Clone)]
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_duration: Duration,
}

impl SessionService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            session_duration: Duration::hours(ttl_hours.max(1)),
        }
    }

    pub fn max_age_secs(&self) -> i64 {
        self.session_duration.num_seconds()
    }

    pub fn issue(&self, username: &str, lino_token: &str, super_admin: bool) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: username.to_string(),
            token: lino_token.to_string(),
            super_admin,
            exp: (now + self.session_duration).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign session: {}", e)))
    }

    pub fn verify(&self, session: &str) -> Result<SessionClaims> {
        let token_data = decode::<SessionClaims>(session, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::Unauthorized(format!("Invalid session: {}", e)))?;

        if token_data.claims.token.is_empty() {
            return Err(AppError::Unauthorized("Session carries no token".to_string()));
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_issue_and_verify() {
        let sessions = SessionService::new("test-secret", 2);

        let session = sessions.issue("alice", "lino-token", true).unwrap();
        let claims = sessions.verify(&session).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.token, "lino-token");
        assert!(claims.super_admin);
        assert_eq!(claims.exp - claims.iat, 2 * 3600);
    }

    #[test]
    fn test_session_signed_with_other_secret_is_rejected() {
        let issuer = SessionService::new("secret-a", 1);
        let verifier = SessionService::new("secret-b", 1);

        let session = issuer.issue("alice", "lino-token", false).unwrap();
        assert!(matches!(
            verifier.verify(&session),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_session_is_rejected() {
        let sessions = SessionService::new("test-secret", 1);
        assert!(sessions.verify("not-a-token").is_err());
    }
}

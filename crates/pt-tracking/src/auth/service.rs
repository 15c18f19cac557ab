//! Authentication Service
//!
//! JWT access token generation and validation (HS256).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::shared::canon::Role;
use crate::shared::error::{Result, TrackingError};
use crate::user::entity::User;

/// JWT Claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user id)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// JWT ID (unique identifier)
    pub jti: String,

    /// Display name
    pub name: String,

    /// Email address
    pub email: String,

    /// Canonical role code
    pub role: String,
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Result<i64> {
        self.sub.parse().map_err(|_| TrackingError::InvalidToken {
            message: "Malformed subject claim".to_string(),
        })
    }

    pub fn role(&self) -> Result<Role> {
        Role::from_input(&self.role).ok_or_else(|| TrackingError::InvalidToken {
            message: "Unknown role claim".to_string(),
        })
    }
}

/// Configuration for the auth service
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for HS256
    pub secret_key: String,

    /// Token issuer
    pub issuer: String,

    /// Access token expiration in seconds
    pub token_expiry_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            issuer: "prodtrack".to_string(),
            token_expiry_secs: 28800, // 8 hours
        }
    }
}

/// Authentication service issuing and validating access tokens.
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret_key.as_bytes());

        let mut validation = Validation::default();
        validation.set_issuer(&[&config.issuer]);

        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Issue an access token for an authenticated user.
    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            iss: self.config.issuer.clone(),
            exp: (now + Duration::seconds(self.config.token_expiry_secs)).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TrackingError::internal(format!("Failed to sign token: {}", e)))
    }

    /// Validate a token and return its claims.
    pub fn validate_token(&self, token: &str) -> Result<AccessTokenClaims> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TrackingError::TokenExpired,
                _ => TrackingError::InvalidToken {
                    message: e.to_string(),
                },
            })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::canon::Role;

    fn test_service() -> AuthService {
        AuthService::new(AuthConfig {
            secret_key: "test-secret-key".to_string(),
            issuer: "prodtrack".to_string(),
            token_expiry_secs: 3600,
        })
    }

    fn test_user() -> User {
        User {
            id: 42,
            name: "Maria Silva".to_string(),
            email: "maria@example.com".to_string(),
            password_hash: String::new(),
            role: Role::SupervisorProducao,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let service = test_service();
        let token = service.issue_token(&test_user()).unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.role().unwrap(), Role::SupervisorProducao);
        assert_eq!(claims.email, "maria@example.com");
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = test_service();
        let err = service.validate_token("not-a-token").unwrap_err();
        assert_eq!(err.code(), "INVALID_TOKEN");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = test_service().issue_token(&test_user()).unwrap();

        let other = AuthService::new(AuthConfig {
            secret_key: "a-different-secret".to_string(),
            issuer: "prodtrack".to_string(),
            token_expiry_secs: 3600,
        });
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let service = AuthService::new(AuthConfig {
            secret_key: "test-secret-key".to_string(),
            issuer: "prodtrack".to_string(),
            token_expiry_secs: -60,
        });
        let token = service.issue_token(&test_user()).unwrap();
        let err = service.validate_token(&token).unwrap_err();
        assert_eq!(err.code(), "TOKEN_EXPIRED");
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}

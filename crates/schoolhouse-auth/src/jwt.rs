//! Token creation and verification.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use schoolhouse_config::JwtConfig;
use schoolhouse_core::AppError;

use crate::claims::{Claims, RefreshTokenClaims};

/// Creates an access token embedding the role and its permissions.
pub fn create_access_token(
    staff_id: Uuid,
    email: &str,
    school_id: Option<Uuid>,
    role: &str,
    permissions: Vec<String>,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: staff_id.to_string(),
        email: email.to_string(),
        school_id,
        role: role.to_string(),
        permissions,
        exp: now + jwt_config.access_token_expiry as usize,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

/// Verifies signature and expiry of an access token.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

pub fn create_refresh_token(
    staff_id: Uuid,
    email: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;

    let claims = RefreshTokenClaims {
        sub: staff_id.to_string(),
        email: email.to_string(),
        exp: now + jwt_config.refresh_token_expiry as usize,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create refresh token: {}", e)))
}

pub fn verify_refresh_token(
    token: &str,
    jwt_config: &JwtConfig,
) -> Result<RefreshTokenClaims, AppError> {
    decode::<RefreshTokenClaims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired refresh token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 7200,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let staff_id = Uuid::new_v4();
        let school_id = Uuid::new_v4();
        let token = create_access_token(
            staff_id,
            "teacher@school.edu",
            Some(school_id),
            "teacher",
            vec!["gradebook:write".to_string()],
            &config(),
        )
        .unwrap();

        let claims = verify_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, staff_id.to_string());
        assert_eq!(claims.school_id, Some(school_id));
        assert_eq!(claims.role, "teacher");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_access_token(
            Uuid::new_v4(),
            "a@b.edu",
            None,
            "system_admin",
            vec![],
            &config(),
        )
        .unwrap();

        let other = JwtConfig {
            secret: "other".to_string(),
            ..config()
        };
        let err = verify_token(&token, &other).unwrap_err();
        assert_eq!(err.status.as_u16(), 401);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let expired = JwtConfig {
            access_token_expiry: -120,
            ..config()
        };
        let token =
            create_access_token(Uuid::new_v4(), "a@b.edu", None, "admin", vec![], &expired)
                .unwrap();
        assert!(verify_token(&token, &config()).is_err());
    }

    #[test]
    fn test_refresh_token_cannot_be_used_as_access_token() {
        let refresh = create_refresh_token(Uuid::new_v4(), "a@b.edu", &config()).unwrap();
        assert!(verify_refresh_token(&refresh, &config()).is_ok());
        assert!(verify_token(&refresh, &config()).is_err());
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let id = Uuid::new_v4();
        let a = create_refresh_token(id, "a@b.edu", &config()).unwrap();
        let b = create_refresh_token(id, "a@b.edu", &config()).unwrap();
        assert_ne!(a, b);
    }
}

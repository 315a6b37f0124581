//! JWT claim structures.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Staff id (subject)
    pub sub: String,
    pub email: String,
    /// School scope; `None` only for system admins
    pub school_id: Option<Uuid>,
    /// Role name (`system_admin`, `admin`, `teacher`, `nurse`, `counselor`, `cashier`)
    pub role: String,
    /// Permission names granted by the role
    pub permissions: Vec<String>,
    /// Expiration (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Refresh token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    /// Unique token id so two refresh tokens issued in the same second differ
    pub jti: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_round_trip_fields() {
        let school_id = Uuid::new_v4();
        let json = format!(
            r#"{{"sub":"abc","email":"nurse@school.edu","school_id":"{}","role":"nurse","permissions":["health:read"],"exp":10,"iat":1}}"#,
            school_id
        );
        let claims: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(claims.role, "nurse");
        assert_eq!(claims.school_id, Some(school_id));
        assert_eq!(claims.permissions, vec!["health:read".to_string()]);
    }

    #[test]
    fn test_refresh_claims_are_not_access_claims() {
        let json = r#"{"sub":"abc","email":"a@b.edu","exp":10,"iat":1,"jti":"x"}"#;
        assert!(serde_json::from_str::<Claims>(json).is_err());
        assert!(serde_json::from_str::<RefreshTokenClaims>(json).is_ok());
    }
}

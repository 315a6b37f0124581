use schoolhouse_auth::{create_access_token, create_refresh_token, verify_refresh_token};
use schoolhouse_config::JwtConfig;
use schoolhouse_core::permissions::permissions_for_role;
use schoolhouse_core::{AppError, verify_password};
use schoolhouse_models::ids::StaffId;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use crate::metrics;

use super::model::{LoginRequest, LoginResponse, Staff, TokenResponse};

pub(crate) const STAFF_COLUMNS: &str = "id, school_id, first_name, last_name, email, role, \
     certifications, max_sections, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct StaffWithPassword {
    #[sqlx(flatten)]
    staff: Staff,
    password: String,
}

pub struct AuthService;

impl AuthService {
    fn issue_access_token(staff: &Staff, jwt_config: &JwtConfig) -> Result<String, AppError> {
        let permissions = permissions_for_role(staff.role.as_str())
            .into_iter()
            .map(String::from)
            .collect();

        let token = create_access_token(
            staff.id.into(),
            &staff.email,
            staff.school_id.map(Into::into),
            staff.role.as_str(),
            permissions,
            jwt_config,
        )?;
        metrics::track_jwt_issued();
        Ok(token)
    }

    #[instrument(skip(db, dto, jwt_config), fields(staff.email = %dto.email))]
    pub async fn login(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let query = format!(
            "SELECT {}, password FROM staff WHERE LOWER(email) = LOWER($1)",
            STAFF_COLUMNS
        );
        let Some(row) = sqlx::query_as::<_, StaffWithPassword>(&query)
            .bind(&dto.email)
            .fetch_optional(db)
            .await?
        else {
            debug!("Login attempt for unknown email");
            metrics::track_login("unknown", false);
            return Err(AppError::unauthorized("Invalid email or password"));
        };

        if !verify_password(&dto.password, &row.password)? {
            warn!(staff.id = %row.staff.id, "Login failed: wrong password");
            metrics::track_login(row.staff.role.as_str(), false);
            return Err(AppError::unauthorized("Invalid email or password"));
        }

        if !row.staff.is_active {
            warn!(staff.id = %row.staff.id, "Login refused for deactivated staff");
            metrics::track_login(row.staff.role.as_str(), false);
            return Err(AppError::forbidden("Account is deactivated"));
        }

        let staff = row.staff;
        let access_token = Self::issue_access_token(&staff, jwt_config)?;
        let refresh_token = create_refresh_token(staff.id.into(), &staff.email, jwt_config)?;
        metrics::track_login(staff.role.as_str(), true);

        Ok(LoginResponse {
            access_token,
            refresh_token,
            staff,
        })
    }

    /// Re-reads the staff row so role changes and deactivation take effect.
    #[instrument(skip_all)]
    pub async fn refresh(
        db: &PgPool,
        refresh_token: &str,
        jwt_config: &JwtConfig,
    ) -> Result<TokenResponse, AppError> {
        let claims = verify_refresh_token(refresh_token, jwt_config)?;
        let staff_id: StaffId = claims
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

        let staff = Self::get_staff(db, staff_id)
            .await
            .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

        if !staff.is_active {
            return Err(AppError::forbidden("Account is deactivated"));
        }

        Ok(TokenResponse {
            access_token: Self::issue_access_token(&staff, jwt_config)?,
        })
    }

    #[instrument(skip(db))]
    pub async fn get_staff(db: &PgPool, staff_id: StaffId) -> Result<Staff, AppError> {
        let query = format!("SELECT {} FROM staff WHERE id = $1", STAFF_COLUMNS);
        sqlx::query_as::<_, Staff>(&query)
            .bind(staff_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Staff member not found")))
    }
}

use crate::{
    errors::AppError,
    models::Claims,
    policy::{self, Action, Resource, Role},
    state::AppState,
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

/// Authenticated user extractor.
/// Add `auth: AuthUser` as a parameter in any handler that requires authentication.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub school_id: Uuid,
    pub role: Role,
    pub name: String,
}

impl AuthUser {
    /// Fails with 403 unless the user's role grants `action` on `resource`.
    pub fn require(&self, resource: Resource, action: Action) -> Result<(), AppError> {
        if policy::is_allowed(self.role, resource, action) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "role {:?} may not {:?} {:?}",
                self.role, action, resource
            )))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let headers: &HeaderMap = &parts.headers;

        let auth_header = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".to_string()))?;

        let mut user = verify_token(token, &state.config.jwt_secret)?;

        // Tokens outlive account changes; the stored role and status win.
        let account: Option<(Role, bool)> = sqlx::query_as(
            "SELECT role, is_active FROM users WHERE id = $1 AND school_id = $2",
        )
        .bind(user.id)
        .bind(user.school_id)
        .fetch_optional(&state.db)
        .await?;

        match account {
            Some((role, true)) => {
                user.role = role;
                Ok(user)
            }
            Some((_, false)) => Err(AppError::Unauthorized("Account is deactivated".to_string())),
            None => Err(AppError::Unauthorized("Account no longer exists".to_string())),
        }
    }
}

pub fn verify_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    let claims = token_data.claims;
    let id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
    let school_id = Uuid::parse_str(&claims.school).map_err(|_| AppError::InvalidToken)?;

    Ok(AuthUser {
        id,
        school_id,
        role: claims.role,
        name: claims.name,
    })
}

pub fn generate_token(
    user_id: Uuid,
    school_id: Uuid,
    role: Role,
    name: &str,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, AppError> {
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = Utc::now().timestamp() as usize;
    let exp = (Utc::now() + chrono::Duration::hours(expiry_hours)).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        school: school_id.to_string(),
        role,
        name: name.to_string(),
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_preserves_identity() {
        let user = Uuid::new_v4();
        let school = Uuid::new_v4();
        let token =
            generate_token(user, school, Role::FinanceManager, "Bursar", "s3cret", 1).unwrap();

        let auth = verify_token(&token, "s3cret").unwrap();
        assert_eq!(auth.id, user);
        assert_eq!(auth.school_id, school);
        assert_eq!(auth.role, Role::FinanceManager);
        assert_eq!(auth.name, "Bursar");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token =
            generate_token(Uuid::new_v4(), Uuid::new_v4(), Role::Teacher, "T", "a", 1).unwrap();
        assert!(matches!(
            verify_token(&token, "b"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token =
            generate_token(Uuid::new_v4(), Uuid::new_v4(), Role::Teacher, "T", "a", -2).unwrap();
        assert!(matches!(
            verify_token(&token, "a"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn require_consults_the_policy_table() {
        let auth = AuthUser {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            role: Role::Teacher,
            name: "T".into(),
        };
        assert!(auth.require(Resource::Students, Action::Write).is_ok());
        assert!(matches!(
            auth.require(Resource::Finance, Action::Read),
            Err(AppError::Forbidden(_))
        ));
    }
}

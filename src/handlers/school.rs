// src/handlers/school.rs

use crate::{
    auth::{AuthUser, generate_token},
    errors::{AppError, AppResult},
    handlers::require_text,
    models::school::{
        AuthResponse, Capability, CreateUserRequest, DashboardResponse, LoginRequest,
        PermissionsResponse, RegisterSchoolRequest, UpdateUserRequest, User, UserPublic,
    },
    policy::{self, Action, Resource, Role},
    services::analytics,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

fn hash_password(password: &str) -> AppResult<String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    hash(password, DEFAULT_COST).map_err(|e| AppError::Internal(e.to_string()))
}

fn issue_token(state: &AppState, user: &User) -> AppResult<String> {
    generate_token(
        user.id,
        user.school_id,
        user.role,
        &user.full_name,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )
}

/// Register a school together with its first administrator
#[utoipa::path(
    post,
    path = "/api/v1/core/auth/register",
    request_body = RegisterSchoolRequest,
    responses(
        (status = 201, description = "School registered", body = AuthResponse),
        (status = 400, description = "Missing fields or weak password"),
        (status = 409, description = "Email already registered"),
    ),
    tag = "Core"
)]
pub async fn register_school(
    State(state): State<AppState>,
    Json(body): Json<RegisterSchoolRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    require_text(&body.school_name, "school_name")?;
    require_text(&body.admin_name, "admin_name")?;
    require_text(&body.admin_email, "admin_email")?;
    let password_hash = hash_password(&body.password)?;

    let mut tx = state.db.begin().await?;

    let school_id: Uuid = sqlx::query_scalar(
        "INSERT INTO schools (id, name, email) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(body.school_name.trim())
    .bind(body.school_email.trim().to_lowercase())
    .fetch_one(&mut *tx)
    .await?;

    let user = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (id, school_id, email, password_hash, full_name, role)
           VALUES ($1, $2, $3, $4, $5, 'administrator')
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(body.admin_email.trim().to_lowercase())
    .bind(password_hash)
    .bind(body.admin_name.trim())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(school_id = %school_id, "school registered");

    let token = issue_token(&state, &user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/core/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Core"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(body.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = verify(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid || !user.is_active {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = issue_token(&state, &user)?;
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/api/v1/core/me",
    responses(
        (status = 200, description = "Authenticated user", body = UserPublic),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Core"
)]
pub async fn me(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<UserPublic>> {
    let user = fetch_user(&state, auth.school_id, auth.id).await?;
    Ok(Json(user.into()))
}

/// Module flags and the full capability list for the caller's role
#[utoipa::path(
    get,
    path = "/api/v1/core/permissions",
    responses(
        (status = 200, description = "Caller permissions", body = PermissionsResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Core"
)]
pub async fn permissions(auth: AuthUser) -> Json<PermissionsResponse> {
    Json(permissions_for(auth.role))
}

pub fn permissions_for(role: Role) -> PermissionsResponse {
    let can = |resource| policy::is_allowed(role, resource, Action::Read);
    PermissionsResponse {
        role,
        can_access_student: can(Resource::Students),
        can_access_hr: can(Resource::Staff) || can(Resource::Payroll),
        can_access_finance: can(Resource::Finance),
        can_access_inventory: can(Resource::Inventory),
        can_access_reporting: can(Resource::Reports),
        capabilities: policy::capabilities(role)
            .into_iter()
            .map(|(resource, action)| Capability { resource, action })
            .collect(),
    }
}

/// Dashboard KPIs and charts
#[utoipa::path(
    get,
    path = "/api/v1/core/dashboard",
    responses(
        (status = 200, description = "Dashboard data", body = DashboardResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Core"
)]
pub async fn dashboard(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DashboardResponse>> {
    auth.require(Resource::Dashboard, Action::Read)?;
    let data = analytics::dashboard(&state.db, auth.school_id, Utc::now().date_naive()).await?;
    Ok(Json(data))
}

// ─── Users ───────────────────────────────────────────────────────────────────

async fn fetch_user(state: &AppState, school_id: Uuid, user_id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND school_id = $2")
        .bind(user_id)
        .bind(school_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
}

/// List the school's users
#[utoipa::path(
    get,
    path = "/api/v1/core/users",
    responses(
        (status = 200, description = "Users", body = Vec<UserPublic>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Core"
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserPublic>>> {
    auth.require(Resource::Users, Action::Read)?;
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE school_id = $1 ORDER BY full_name",
    )
    .bind(auth.school_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(users.into_iter().map(UserPublic::from).collect()))
}

/// Create a user in the caller's school
#[utoipa::path(
    post,
    path = "/api/v1/core/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserPublic),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already in use"),
    ),
    security(("bearer_auth" = [])),
    tag = "Core"
)]
pub async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserPublic>)> {
    auth.require(Resource::Users, Action::Write)?;
    require_text(&body.full_name, "full_name")?;
    require_text(&body.email, "email")?;
    let password_hash = hash_password(&body.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (id, school_id, email, password_hash, full_name, role)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.email.trim().to_lowercase())
    .bind(password_hash)
    .bind(body.full_name.trim())
    .bind(body.role)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Change a user's name, role or active flag
#[utoipa::path(
    patch,
    path = "/api/v1/core/users/{user_id}",
    request_body = UpdateUserRequest,
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User updated", body = UserPublic),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Core"
)]
pub async fn update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> AppResult<Json<UserPublic>> {
    auth.require(Resource::Users, Action::Write)?;
    if user_id == auth.id && (body.is_active == Some(false) || body.role.is_some_and(|r| r != auth.role)) {
        return Err(AppError::BadRequest(
            "You cannot deactivate yourself or change your own role".to_string(),
        ));
    }

    let current = fetch_user(&state, auth.school_id, user_id).await?;
    let user = sqlx::query_as::<_, User>(
        r#"UPDATE users
           SET full_name = $2, role = $3, is_active = $4, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(user_id)
    .bind(body.full_name.as_deref().map(str::trim).unwrap_or(&current.full_name))
    .bind(body.role.unwrap_or(current.role))
    .bind(body.is_active.unwrap_or(current.is_active))
    .fetch_one(&state.db)
    .await?;

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teachers_only_see_the_student_module() {
        let p = permissions_for(Role::Teacher);
        assert!(p.can_access_student);
        assert!(!p.can_access_hr);
        assert!(!p.can_access_finance);
        assert!(!p.can_access_inventory);
        assert!(!p.can_access_reporting);
    }

    #[test]
    fn hr_managers_reach_hr_through_staff_or_payroll() {
        let p = permissions_for(Role::HrManager);
        assert!(p.can_access_hr);
        assert!(p.can_access_reporting);
        assert!(!p.can_access_finance);
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(hash_password("short"), Err(AppError::Validation(_))));
    }
}

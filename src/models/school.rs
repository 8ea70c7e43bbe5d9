// src/models/school.rs

use crate::policy::{Action, Resource, Role};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── School (tenant) ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterSchoolRequest {
    pub school_name: String,
    pub school_email: String,
    pub admin_name: String,
    pub admin_email: String,
    pub password: String,
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub school_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserPublic {
    pub id: Uuid,
    pub school_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        UserPublic {
            id: user.id,
            school_id: user.school_id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserPublic,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

// ─── Permissions ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct Capability {
    pub resource: Resource,
    pub action: Action,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionsResponse {
    pub role: Role,
    pub can_access_student: bool,
    pub can_access_hr: bool,
    pub can_access_finance: bool,
    pub can_access_inventory: bool,
    pub can_access_reporting: bool,
    pub capabilities: Vec<Capability>,
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct Kpis {
    pub total_students: i64,
    pub active_classes: i64,
    pub monthly_revenue: Decimal,
    pub total_staff: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MonthlyCount {
    pub month: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MonthlyAmount {
    pub month: NaiveDate,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentAnalytics {
    pub enrollment_trend: Vec<MonthlyCount>,
    pub status_distribution: Vec<LabelCount>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FinanceAnalytics {
    pub revenue_by_month: Vec<MonthlyAmount>,
    pub expenses_by_month: Vec<MonthlyAmount>,
    pub invoice_status_distribution: Vec<LabelCount>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HrAnalytics {
    pub staff_role_distribution: Vec<LabelCount>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub kpis: Kpis,
    pub student_analytics: StudentAnalytics,
    pub finance_analytics: FinanceAnalytics,
    pub hr_analytics: HrAnalytics,
}

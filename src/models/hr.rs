// src/models/hr.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Staff ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "staff_role", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Teacher,
    Assistant,
    Admin,
    Nurse,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Staff {
    pub id: Uuid,
    pub school_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: StaffRole,
    pub email: String,
    pub phone: String,
    pub id_number: String,
    pub id_expiry: NaiveDate,
    pub hire_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Staff {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStaffRequest {
    pub first_name: String,
    pub last_name: String,
    pub role: StaffRole,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub id_number: String,
    pub id_expiry: NaiveDate,
    pub hire_date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStaffRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<StaffRole>,
    pub phone: Option<String>,
    pub id_expiry: Option<NaiveDate>,
}

// ─── Payroll contract ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollContract {
    pub id: Uuid,
    pub school_id: Uuid,
    pub staff_id: Uuid,
    pub base_salary: Decimal,
    pub allowance: Decimal,
    pub contract_start: NaiveDate,
    pub contract_end: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertContractRequest {
    pub base_salary: Decimal,
    #[serde(default)]
    pub allowance: Decimal,
    pub contract_start: NaiveDate,
    pub contract_end: Option<NaiveDate>,
}

// ─── Salary records ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SalaryRecord {
    pub id: Uuid,
    pub school_id: Uuid,
    pub staff_id: Uuid,
    /// Always the first day of the month.
    pub month: NaiveDate,
    pub gross: Decimal,
    pub deduct: Decimal,
    pub net: Decimal,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSalaryRecordRequest {
    pub staff_id: Uuid,
    pub month: NaiveDate,
    pub gross: Decimal,
    #[serde(default)]
    pub deduct: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSalaryRecordRequest {
    pub gross: Option<Decimal>,
    pub deduct: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateSalaryRecordsRequest {
    /// Any day of the target month; defaults to the current month.
    pub month: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct SalaryGenerationSummary {
    pub month: NaiveDate,
    pub created: u64,
    pub skipped: u64,
}

#[derive(Debug, Deserialize)]
pub struct SalaryRecordQuery {
    pub month: Option<NaiveDate>,
    pub staff_id: Option<Uuid>,
    pub paid: Option<bool>,
}

// ─── Staff attendance ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "staff_attendance_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffAttendanceStatus {
    Present,
    Absent,
    Sick,
    Leave,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StaffAttendance {
    pub id: Uuid,
    pub school_id: Uuid,
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub status: StaffAttendanceStatus,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordStaffAttendanceRequest {
    pub staff_id: Uuid,
    pub date: Option<NaiveDate>,
    pub status: StaffAttendanceStatus,
    #[serde(default)]
    pub note: String,
}

// ─── Staff documents ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "staff_document_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffDocumentType {
    Id,
    Contract,
    Certificate,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StaffDocument {
    pub id: Uuid,
    pub school_id: Uuid,
    pub staff_id: Uuid,
    pub doc_type: StaffDocumentType,
    pub issue_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStaffDocumentRequest {
    pub staff_id: Uuid,
    pub doc_type: StaffDocumentType,
    pub issue_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
}

// ─── Vacations ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Vacation {
    pub id: Uuid,
    pub school_id: Uuid,
    pub staff_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub approved: bool,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVacationRequest {
    pub staff_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct VacationQuery {
    pub staff_id: Option<Uuid>,
    pub approved: Option<bool>,
}

// ─── Staff evaluations ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StaffEvaluation {
    pub id: Uuid,
    pub school_id: Uuid,
    pub staff_id: Uuid,
    pub eval_date: NaiveDate,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStaffEvaluationRequest {
    pub staff_id: Uuid,
    pub eval_date: Option<NaiveDate>,
    #[serde(default)]
    pub summary: String,
}

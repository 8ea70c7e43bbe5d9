// src/models/student.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Classroom ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Classroom {
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: String,
    pub capacity: i32,
    /// Tuition billed to every active student of the classroom each month.
    pub monthly_fee: Decimal,
    pub assigned_teacher_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateClassroomRequest {
    pub name: String,
    #[serde(default = "default_capacity")]
    pub capacity: i32,
    #[serde(default)]
    pub monthly_fee: Decimal,
    pub assigned_teacher_id: Option<Uuid>,
}

fn default_capacity() -> i32 {
    25
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateClassroomRequest {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub monthly_fee: Option<Decimal>,
    pub assigned_teacher_id: Option<Uuid>,
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "gender", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "enrollment_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Active,
    Graduated,
    Left,
    Shifted,
    Nonactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub school_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub enrollment_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub enrollment_status: EnrollmentStatus,
    pub classroom_id: Option<Uuid>,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub guardian_email: Option<String>,
    pub parent_id_number: String,
    pub parent_id_expiry: NaiveDate,
    pub student_id_number: Option<String>,
    pub student_id_expiry: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStudentRequest {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub enrollment_date: Option<NaiveDate>,
    pub classroom_id: Option<Uuid>,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub guardian_email: Option<String>,
    pub parent_id_number: String,
    pub parent_id_expiry: NaiveDate,
    pub student_id_number: Option<String>,
    pub student_id_expiry: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStudentRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enrollment_status: Option<EnrollmentStatus>,
    pub end_date: Option<NaiveDate>,
    pub classroom_id: Option<Uuid>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_email: Option<String>,
    pub parent_id_expiry: Option<NaiveDate>,
    pub student_id_expiry: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct StudentQuery {
    pub classroom_id: Option<Uuid>,
    pub status: Option<EnrollmentStatus>,
    #[serde(default)]
    pub include_inactive: bool,
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "enrollment_state", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentState {
    Active,
    Graduated,
    Left,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub classroom_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: EnrollmentState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEnrollmentRequest {
    pub student_id: Uuid,
    pub classroom_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

// ─── Attendance ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "attendance_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Sick,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Attendance {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordAttendanceRequest {
    pub student_id: Uuid,
    pub date: Option<NaiveDate>,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub student_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

// ─── Medical records ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "medical_record_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MedicalRecordType {
    Allergy,
    Medication,
    Treatment,
    Vaccination,
    Checkup,
    DoctorNote,
    Education,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub record_type: MedicalRecordType,
    pub date: NaiveDate,
    pub description: String,
    pub is_urgent: bool,
    pub doctor_name: Option<String>,
    pub next_checkup_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMedicalRecordRequest {
    pub student_id: Uuid,
    pub record_type: MedicalRecordType,
    pub date: Option<NaiveDate>,
    pub description: String,
    #[serde(default)]
    pub is_urgent: bool,
    pub doctor_name: Option<String>,
    pub next_checkup_date: Option<NaiveDate>,
}

// ─── Student documents ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "student_document_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentDocumentType {
    BirthCert,
    Id,
    Passport,
    Visa,
    Residence,
    Vaccine,
    Transcript,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentDocument {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub doc_type: StudentDocumentType,
    pub issue_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStudentDocumentRequest {
    pub student_id: Uuid,
    pub doc_type: StudentDocumentType,
    pub issue_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

// ─── Evaluations ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq)]
#[sqlx(type_name = "evaluation_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationStatus {
    Excellent,
    Good,
    #[default]
    OnTrack,
    NeedsWork,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Evaluation {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub date: NaiveDate,
    pub status: EvaluationStatus,
    pub general_notes: String,
    pub improvement_plan: String,
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEvaluationRequest {
    pub student_id: Uuid,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub status: EvaluationStatus,
    #[serde(default)]
    pub general_notes: String,
    #[serde(default)]
    pub improvement_plan: String,
    pub follow_up_date: Option<NaiveDate>,
}

// src/handlers/hr.rs

use crate::{
    auth::AuthUser,
    errors::{AppError, AppResult},
    handlers::{ensure_owned, require_text},
    models::{
        MessageResponse,
        hr::{
            CreateSalaryRecordRequest, CreateStaffDocumentRequest, CreateStaffEvaluationRequest,
            CreateStaffRequest, CreateVacationRequest, GenerateSalaryRecordsRequest,
            PayrollContract, RecordStaffAttendanceRequest, SalaryGenerationSummary, SalaryRecord,
            SalaryRecordQuery, Staff, StaffAttendance, StaffDocument, StaffEvaluation,
            UpdateSalaryRecordRequest, UpdateStaffRequest, UpsertContractRequest, Vacation,
            VacationQuery,
        },
    },
    policy::{Action, Resource},
    services::payroll::{self, month_start},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct StaffQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct StaffAttendanceQuery {
    pub staff_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

// ─── Staff ───────────────────────────────────────────────────────────────────

/// List staff members
#[utoipa::path(
    get,
    path = "/api/v1/hr/staff",
    params(("include_inactive" = Option<bool>, Query, description = "Include deactivated staff")),
    responses((status = 200, description = "Staff", body = Vec<Staff>)),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn list_staff(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<StaffQuery>,
) -> AppResult<Json<Vec<Staff>>> {
    auth.require(Resource::Staff, Action::Read)?;
    let staff = sqlx::query_as::<_, Staff>(
        r#"SELECT * FROM staff
           WHERE school_id = $1 AND ($2 OR is_active)
           ORDER BY last_name, first_name"#,
    )
    .bind(auth.school_id)
    .bind(q.include_inactive)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(staff))
}

/// Hire a staff member
#[utoipa::path(
    post,
    path = "/api/v1/hr/staff",
    request_body = CreateStaffRequest,
    responses(
        (status = 201, description = "Staff member created", body = Staff),
        (status = 409, description = "Email or ID number already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn create_staff(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateStaffRequest>,
) -> AppResult<(StatusCode, Json<Staff>)> {
    auth.require(Resource::Staff, Action::Write)?;
    require_text(&body.first_name, "first_name")?;
    require_text(&body.last_name, "last_name")?;
    require_text(&body.email, "email")?;
    require_text(&body.id_number, "id_number")?;

    let staff = sqlx::query_as::<_, Staff>(
        r#"INSERT INTO staff
             (id, school_id, first_name, last_name, role, email, phone, id_number, id_expiry, hire_date)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.first_name.trim())
    .bind(body.last_name.trim())
    .bind(body.role)
    .bind(body.email.trim().to_lowercase())
    .bind(&body.phone)
    .bind(body.id_number.trim())
    .bind(body.id_expiry)
    .bind(body.hire_date)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(staff_id = %staff.id, "staff member hired");
    Ok((StatusCode::CREATED, Json(staff)))
}

/// Get one staff member
#[utoipa::path(
    get,
    path = "/api/v1/hr/staff/{staff_id}",
    params(("staff_id" = Uuid, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Staff member", body = Staff),
        (status = 404, description = "Staff member not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn get_staff(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> AppResult<Json<Staff>> {
    auth.require(Resource::Staff, Action::Read)?;
    let staff = sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE id = $1 AND school_id = $2")
        .bind(staff_id)
        .bind(auth.school_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Staff member {staff_id} not found")))?;
    Ok(Json(staff))
}

/// Update a staff member
#[utoipa::path(
    patch,
    path = "/api/v1/hr/staff/{staff_id}",
    request_body = UpdateStaffRequest,
    params(("staff_id" = Uuid, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Staff member updated", body = Staff),
        (status = 404, description = "Staff member not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn update_staff(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
    Json(body): Json<UpdateStaffRequest>,
) -> AppResult<Json<Staff>> {
    auth.require(Resource::Staff, Action::Write)?;
    let staff = sqlx::query_as::<_, Staff>(
        r#"UPDATE staff SET
             first_name = COALESCE($3, first_name),
             last_name = COALESCE($4, last_name),
             role = COALESCE($5, role),
             phone = COALESCE($6, phone),
             id_expiry = COALESCE($7, id_expiry),
             updated_at = NOW()
           WHERE id = $1 AND school_id = $2
           RETURNING *"#,
    )
    .bind(staff_id)
    .bind(auth.school_id)
    .bind(body.first_name.as_deref().map(str::trim))
    .bind(body.last_name.as_deref().map(str::trim))
    .bind(body.role)
    .bind(&body.phone)
    .bind(body.id_expiry)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Staff member {staff_id} not found")))?;
    Ok(Json(staff))
}

/// Deactivate a staff member; history is kept
#[utoipa::path(
    delete,
    path = "/api/v1/hr/staff/{staff_id}",
    params(("staff_id" = Uuid, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Staff member deactivated", body = MessageResponse),
        (status = 404, description = "Staff member not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn deactivate_staff(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(Resource::Staff, Action::Delete)?;
    let updated = sqlx::query(
        "UPDATE staff SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND school_id = $2",
    )
    .bind(staff_id)
    .bind(auth.school_id)
    .execute(&state.db)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(AppError::NotFound(format!("Staff member {staff_id} not found")));
    }
    Ok(Json(MessageResponse::new("Staff member deactivated")))
}

// ─── Contracts ───────────────────────────────────────────────────────────────

/// Create or replace a staff member's payroll contract
#[utoipa::path(
    put,
    path = "/api/v1/hr/staff/{staff_id}/contract",
    request_body = UpsertContractRequest,
    params(("staff_id" = Uuid, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Contract saved", body = PayrollContract),
        (status = 400, description = "Invalid amounts or dates"),
    ),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn upsert_contract(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
    Json(body): Json<UpsertContractRequest>,
) -> AppResult<Json<PayrollContract>> {
    auth.require(Resource::Payroll, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let contract = payroll::upsert_contract(&mut tx, auth.school_id, staff_id, &body).await?;
    tx.commit().await?;
    Ok(Json(contract))
}

/// Get a staff member's payroll contract
#[utoipa::path(
    get,
    path = "/api/v1/hr/staff/{staff_id}/contract",
    params(("staff_id" = Uuid, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Contract", body = PayrollContract),
        (status = 404, description = "No contract"),
    ),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn get_contract(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> AppResult<Json<PayrollContract>> {
    auth.require(Resource::Payroll, Action::Read)?;
    let contract = sqlx::query_as::<_, PayrollContract>(
        "SELECT * FROM payroll_contracts WHERE staff_id = $1 AND school_id = $2",
    )
    .bind(staff_id)
    .bind(auth.school_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No contract for staff member {staff_id}")))?;
    Ok(Json(contract))
}

// ─── Salary records ──────────────────────────────────────────────────────────

/// List salary records
#[utoipa::path(
    get,
    path = "/api/v1/hr/salary-records",
    params(
        ("month" = Option<NaiveDate>, Query, description = "Any day of the month"),
        ("staff_id" = Option<Uuid>, Query, description = "Filter by staff member"),
        ("paid" = Option<bool>, Query, description = "Filter by paid flag"),
    ),
    responses((status = 200, description = "Salary records", body = Vec<SalaryRecord>)),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn list_salary_records(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<SalaryRecordQuery>,
) -> AppResult<Json<Vec<SalaryRecord>>> {
    auth.require(Resource::Payroll, Action::Read)?;
    let records = sqlx::query_as::<_, SalaryRecord>(
        r#"SELECT * FROM salary_records
           WHERE school_id = $1
             AND ($2::date IS NULL OR month = $2)
             AND ($3::uuid IS NULL OR staff_id = $3)
             AND ($4::bool IS NULL OR paid = $4)
           ORDER BY month DESC, created_at"#,
    )
    .bind(auth.school_id)
    .bind(q.month.map(month_start))
    .bind(q.staff_id)
    .bind(q.paid)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(records))
}

/// Create a salary record by hand
#[utoipa::path(
    post,
    path = "/api/v1/hr/salary-records",
    request_body = CreateSalaryRecordRequest,
    responses(
        (status = 201, description = "Salary record created", body = SalaryRecord),
        (status = 409, description = "Record for that month already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn create_salary_record(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateSalaryRecordRequest>,
) -> AppResult<(StatusCode, Json<SalaryRecord>)> {
    auth.require(Resource::Payroll, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let record = payroll::create_salary_record(&mut tx, auth.school_id, &body).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Adjust an unpaid salary record
#[utoipa::path(
    patch,
    path = "/api/v1/hr/salary-records/{record_id}",
    request_body = UpdateSalaryRecordRequest,
    params(("record_id" = Uuid, Path, description = "Salary record ID")),
    responses(
        (status = 200, description = "Salary record updated", body = SalaryRecord),
        (status = 409, description = "Record already paid"),
    ),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn update_salary_record(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Json(body): Json<UpdateSalaryRecordRequest>,
) -> AppResult<Json<SalaryRecord>> {
    auth.require(Resource::Payroll, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let record = payroll::update_salary_record(&mut tx, auth.school_id, record_id, &body).await?;
    tx.commit().await?;
    Ok(Json(record))
}

/// Generate the month's salary records from the contracts in force
#[utoipa::path(
    post,
    path = "/api/v1/hr/salary-records/generate",
    request_body = GenerateSalaryRecordsRequest,
    responses((status = 200, description = "Generation summary", body = SalaryGenerationSummary)),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn generate_salary_records(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<GenerateSalaryRecordsRequest>,
) -> AppResult<Json<SalaryGenerationSummary>> {
    auth.require(Resource::Payroll, Action::Write)?;
    let month = body.month.unwrap_or_else(|| Utc::now().date_naive());
    let summary = payroll::generate_salary_records(&state.db, auth.school_id, month).await?;
    Ok(Json(summary))
}

// ─── Attendance ──────────────────────────────────────────────────────────────

/// Record (or correct) a staff member's attendance for a day
#[utoipa::path(
    post,
    path = "/api/v1/hr/attendance",
    request_body = RecordStaffAttendanceRequest,
    responses((status = 200, description = "Attendance recorded", body = StaffAttendance)),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn record_staff_attendance(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<RecordStaffAttendanceRequest>,
) -> AppResult<Json<StaffAttendance>> {
    auth.require(Resource::Staff, Action::Write)?;
    ensure_owned(&state.db, "staff", "Staff member", body.staff_id, auth.school_id).await?;

    let row = sqlx::query_as::<_, StaffAttendance>(
        r#"INSERT INTO staff_attendance (id, school_id, staff_id, date, status, note)
           VALUES ($1, $2, $3, $4, $5, $6)
           ON CONFLICT (staff_id, date)
           DO UPDATE SET status = EXCLUDED.status, note = EXCLUDED.note
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.staff_id)
    .bind(body.date.unwrap_or_else(|| Utc::now().date_naive()))
    .bind(body.status)
    .bind(&body.note)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(row))
}

/// List staff attendance
#[utoipa::path(
    get,
    path = "/api/v1/hr/attendance",
    params(
        ("staff_id" = Option<Uuid>, Query, description = "Filter by staff member"),
        ("date" = Option<NaiveDate>, Query, description = "Filter by day"),
    ),
    responses((status = 200, description = "Attendance rows", body = Vec<StaffAttendance>)),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn list_staff_attendance(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<StaffAttendanceQuery>,
) -> AppResult<Json<Vec<StaffAttendance>>> {
    auth.require(Resource::Staff, Action::Read)?;
    let rows = sqlx::query_as::<_, StaffAttendance>(
        r#"SELECT * FROM staff_attendance
           WHERE school_id = $1
             AND ($2::uuid IS NULL OR staff_id = $2)
             AND ($3::date IS NULL OR date = $3)
           ORDER BY date DESC
           LIMIT 1000"#,
    )
    .bind(auth.school_id)
    .bind(q.staff_id)
    .bind(q.date)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Attach a document record to a staff member
#[utoipa::path(
    post,
    path = "/api/v1/hr/documents",
    request_body = CreateStaffDocumentRequest,
    responses((status = 201, description = "Document created", body = StaffDocument)),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn create_staff_document(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateStaffDocumentRequest>,
) -> AppResult<(StatusCode, Json<StaffDocument>)> {
    auth.require(Resource::Staff, Action::Write)?;
    if body.expiration_date.is_some_and(|exp| exp < body.issue_date) {
        return Err(AppError::Validation(
            "Expiration date cannot be before the issue date".to_string(),
        ));
    }
    ensure_owned(&state.db, "staff", "Staff member", body.staff_id, auth.school_id).await?;

    let doc = sqlx::query_as::<_, StaffDocument>(
        r#"INSERT INTO staff_documents (id, school_id, staff_id, doc_type, issue_date, expiration_date)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.staff_id)
    .bind(body.doc_type)
    .bind(body.issue_date)
    .bind(body.expiration_date)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// Documents of a staff member
#[utoipa::path(
    get,
    path = "/api/v1/hr/staff/{staff_id}/documents",
    params(("staff_id" = Uuid, Path, description = "Staff ID")),
    responses((status = 200, description = "Documents", body = Vec<StaffDocument>)),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn list_staff_documents(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> AppResult<Json<Vec<StaffDocument>>> {
    auth.require(Resource::Staff, Action::Read)?;
    let docs = sqlx::query_as::<_, StaffDocument>(
        r#"SELECT * FROM staff_documents
           WHERE school_id = $1 AND staff_id = $2
           ORDER BY expiration_date NULLS LAST"#,
    )
    .bind(auth.school_id)
    .bind(staff_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(docs))
}

// ─── Vacations ───────────────────────────────────────────────────────────────

/// Request leave for a staff member; requests start unapproved
#[utoipa::path(
    post,
    path = "/api/v1/hr/vacations",
    request_body = CreateVacationRequest,
    responses(
        (status = 201, description = "Vacation requested", body = Vacation),
        (status = 400, description = "End date before start date")
    ),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn create_vacation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateVacationRequest>,
) -> AppResult<(StatusCode, Json<Vacation>)> {
    auth.require(Resource::Staff, Action::Write)?;
    if body.end_date < body.start_date {
        return Err(AppError::Validation(
            "End date cannot be before the start date".to_string(),
        ));
    }
    ensure_owned(&state.db, "staff", "Staff member", body.staff_id, auth.school_id).await?;

    let vacation = sqlx::query_as::<_, Vacation>(
        r#"INSERT INTO vacations (id, school_id, staff_id, start_date, end_date, note)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.staff_id)
    .bind(body.start_date)
    .bind(body.end_date)
    .bind(body.note.trim())
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(vacation)))
}

/// List vacations, optionally for one staff member or approval state
#[utoipa::path(
    get,
    path = "/api/v1/hr/vacations",
    params(
        ("staff_id" = Option<Uuid>, Query, description = "Staff ID"),
        ("approved" = Option<bool>, Query, description = "Approval state")
    ),
    responses((status = 200, description = "Vacations", body = Vec<Vacation>)),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn list_vacations(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<VacationQuery>,
) -> AppResult<Json<Vec<Vacation>>> {
    auth.require(Resource::Staff, Action::Read)?;
    let rows = sqlx::query_as::<_, Vacation>(
        r#"SELECT * FROM vacations
           WHERE school_id = $1
             AND ($2::uuid IS NULL OR staff_id = $2)
             AND ($3::boolean IS NULL OR approved = $3)
           ORDER BY start_date DESC"#,
    )
    .bind(auth.school_id)
    .bind(q.staff_id)
    .bind(q.approved)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// Approve a vacation request
#[utoipa::path(
    post,
    path = "/api/v1/hr/vacations/{id}/approve",
    params(("id" = Uuid, Path, description = "Vacation ID")),
    responses(
        (status = 200, description = "Vacation approved", body = Vacation),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn approve_vacation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vacation>> {
    auth.require(Resource::Staff, Action::Write)?;
    let vacation = sqlx::query_as::<_, Vacation>(
        "UPDATE vacations SET approved = TRUE WHERE id = $1 AND school_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(auth.school_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Vacation {id} not found")))?;
    Ok(Json(vacation))
}

/// Delete a vacation
#[utoipa::path(
    delete,
    path = "/api/v1/hr/vacations/{id}",
    params(("id" = Uuid, Path, description = "Vacation ID")),
    responses((status = 200, description = "Vacation deleted", body = MessageResponse)),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn delete_vacation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(Resource::Staff, Action::Delete)?;
    let deleted = sqlx::query("DELETE FROM vacations WHERE id = $1 AND school_id = $2")
        .bind(id)
        .bind(auth.school_id)
        .execute(&state.db)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::NotFound(format!("Vacation {id} not found")));
    }
    Ok(Json(MessageResponse::new("Vacation deleted")))
}

// ─── Evaluations ─────────────────────────────────────────────────────────────

/// Record a staff evaluation
#[utoipa::path(
    post,
    path = "/api/v1/hr/evaluations",
    request_body = CreateStaffEvaluationRequest,
    responses((status = 201, description = "Evaluation created", body = StaffEvaluation)),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn create_staff_evaluation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateStaffEvaluationRequest>,
) -> AppResult<(StatusCode, Json<StaffEvaluation>)> {
    auth.require(Resource::Staff, Action::Write)?;
    require_text(&body.summary, "summary")?;
    ensure_owned(&state.db, "staff", "Staff member", body.staff_id, auth.school_id).await?;

    let evaluation = sqlx::query_as::<_, StaffEvaluation>(
        r#"INSERT INTO staff_evaluations (id, school_id, staff_id, eval_date, summary)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.staff_id)
    .bind(body.eval_date.unwrap_or_else(|| Utc::now().date_naive()))
    .bind(body.summary.trim())
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(evaluation)))
}

/// Evaluations of a staff member, newest first
#[utoipa::path(
    get,
    path = "/api/v1/hr/staff/{staff_id}/evaluations",
    params(("staff_id" = Uuid, Path, description = "Staff ID")),
    responses((status = 200, description = "Evaluations", body = Vec<StaffEvaluation>)),
    security(("bearer_auth" = [])),
    tag = "HR"
)]
pub async fn list_staff_evaluations(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(staff_id): Path<Uuid>,
) -> AppResult<Json<Vec<StaffEvaluation>>> {
    auth.require(Resource::Staff, Action::Read)?;
    let rows = sqlx::query_as::<_, StaffEvaluation>(
        r#"SELECT * FROM staff_evaluations
           WHERE school_id = $1 AND staff_id = $2
           ORDER BY eval_date DESC"#,
    )
    .bind(auth.school_id)
    .bind(staff_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

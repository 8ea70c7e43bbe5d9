// src/handlers/student.rs

use crate::{
    auth::AuthUser,
    errors::{AppError, AppResult},
    handlers::{ensure_owned, require_text},
    models::{
        MessageResponse,
        student::{
            Attendance, AttendanceQuery, Classroom, CreateClassroomRequest,
            CreateEnrollmentRequest, CreateEvaluationRequest, CreateMedicalRecordRequest,
            CreateStudentDocumentRequest, CreateStudentRequest, Enrollment, EnrollmentState,
            Evaluation, MedicalRecord,
            RecordAttendanceRequest, Student, StudentDocument, StudentQuery,
            UpdateClassroomRequest, UpdateStudentRequest,
        },
    },
    policy::{Action, Resource},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

// ─── Classrooms ──────────────────────────────────────────────────────────────

/// List classrooms
#[utoipa::path(
    get,
    path = "/api/v1/student/classrooms",
    responses(
        (status = 200, description = "Classrooms", body = Vec<Classroom>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn list_classrooms(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Classroom>>> {
    auth.require(Resource::Students, Action::Read)?;
    let rooms = sqlx::query_as::<_, Classroom>(
        "SELECT * FROM classrooms WHERE school_id = $1 ORDER BY name",
    )
    .bind(auth.school_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rooms))
}

/// Create a classroom
#[utoipa::path(
    post,
    path = "/api/v1/student/classrooms",
    request_body = CreateClassroomRequest,
    responses(
        (status = 201, description = "Classroom created", body = Classroom),
        (status = 409, description = "Name already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn create_classroom(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateClassroomRequest>,
) -> AppResult<(StatusCode, Json<Classroom>)> {
    auth.require(Resource::Students, Action::Write)?;
    require_text(&body.name, "name")?;
    if body.capacity < 0 || body.monthly_fee.is_sign_negative() {
        return Err(AppError::Validation(
            "Capacity and monthly fee cannot be negative".to_string(),
        ));
    }
    if let Some(teacher) = body.assigned_teacher_id {
        ensure_owned(&state.db, "staff", "Staff member", teacher, auth.school_id).await?;
    }

    let room = sqlx::query_as::<_, Classroom>(
        r#"INSERT INTO classrooms (id, school_id, name, capacity, monthly_fee, assigned_teacher_id)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.name.trim())
    .bind(body.capacity)
    .bind(body.monthly_fee)
    .bind(body.assigned_teacher_id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(room)))
}

/// Update a classroom
#[utoipa::path(
    patch,
    path = "/api/v1/student/classrooms/{classroom_id}",
    request_body = UpdateClassroomRequest,
    params(("classroom_id" = Uuid, Path, description = "Classroom ID")),
    responses(
        (status = 200, description = "Classroom updated", body = Classroom),
        (status = 404, description = "Classroom not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn update_classroom(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(classroom_id): Path<Uuid>,
    Json(body): Json<UpdateClassroomRequest>,
) -> AppResult<Json<Classroom>> {
    auth.require(Resource::Students, Action::Write)?;
    if body.capacity.is_some_and(|c| c < 0) || body.monthly_fee.is_some_and(|f| f.is_sign_negative()) {
        return Err(AppError::Validation(
            "Capacity and monthly fee cannot be negative".to_string(),
        ));
    }
    if let Some(teacher) = body.assigned_teacher_id {
        ensure_owned(&state.db, "staff", "Staff member", teacher, auth.school_id).await?;
    }

    let room = sqlx::query_as::<_, Classroom>(
        r#"UPDATE classrooms SET
             name = COALESCE($3, name),
             capacity = COALESCE($4, capacity),
             monthly_fee = COALESCE($5, monthly_fee),
             assigned_teacher_id = COALESCE($6, assigned_teacher_id),
             updated_at = NOW()
           WHERE id = $1 AND school_id = $2
           RETURNING *"#,
    )
    .bind(classroom_id)
    .bind(auth.school_id)
    .bind(body.name.as_deref().map(str::trim))
    .bind(body.capacity)
    .bind(body.monthly_fee)
    .bind(body.assigned_teacher_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Classroom {classroom_id} not found")))?;

    Ok(Json(room))
}

/// Delete a classroom that has no enrollment history
#[utoipa::path(
    delete,
    path = "/api/v1/student/classrooms/{classroom_id}",
    params(("classroom_id" = Uuid, Path, description = "Classroom ID")),
    responses(
        (status = 200, description = "Classroom deleted", body = MessageResponse),
        (status = 404, description = "Classroom not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn delete_classroom(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(classroom_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(Resource::Students, Action::Delete)?;
    let deleted = sqlx::query("DELETE FROM classrooms WHERE id = $1 AND school_id = $2")
        .bind(classroom_id)
        .bind(auth.school_id)
        .execute(&state.db)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::NotFound(format!("Classroom {classroom_id} not found")));
    }
    Ok(Json(MessageResponse::new("Classroom deleted")))
}

// ─── Students ────────────────────────────────────────────────────────────────

/// List students, active ones unless `include_inactive` is set
#[utoipa::path(
    get,
    path = "/api/v1/student/students",
    params(
        ("classroom_id" = Option<Uuid>, Query, description = "Filter by classroom"),
        ("include_inactive" = Option<bool>, Query, description = "Include soft-deleted students"),
    ),
    responses((status = 200, description = "Students", body = Vec<Student>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn list_students(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<StudentQuery>,
) -> AppResult<Json<Vec<Student>>> {
    auth.require(Resource::Students, Action::Read)?;
    let students = sqlx::query_as::<_, Student>(
        r#"SELECT * FROM students
           WHERE school_id = $1
             AND ($2::uuid IS NULL OR classroom_id = $2)
             AND ($3::enrollment_status IS NULL OR enrollment_status = $3)
             AND ($4 OR is_active)
           ORDER BY last_name, first_name"#,
    )
    .bind(auth.school_id)
    .bind(q.classroom_id)
    .bind(q.status)
    .bind(q.include_inactive)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(students))
}

/// Admit a student
#[utoipa::path(
    post,
    path = "/api/v1/student/students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student created", body = Student),
        (status = 409, description = "Duplicate ID number"),
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn create_student(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateStudentRequest>,
) -> AppResult<(StatusCode, Json<Student>)> {
    auth.require(Resource::Students, Action::Write)?;
    require_text(&body.first_name, "first_name")?;
    require_text(&body.last_name, "last_name")?;
    require_text(&body.guardian_name, "guardian_name")?;
    require_text(&body.parent_id_number, "parent_id_number")?;
    if let Some(room) = body.classroom_id {
        ensure_owned(&state.db, "classrooms", "Classroom", room, auth.school_id).await?;
    }

    let student = sqlx::query_as::<_, Student>(
        r#"INSERT INTO students (
             id, school_id, first_name, last_name, gender, date_of_birth, enrollment_date,
             classroom_id, guardian_name, guardian_phone, guardian_email, parent_id_number,
             parent_id_expiry, student_id_number, student_id_expiry)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.first_name.trim())
    .bind(body.last_name.trim())
    .bind(body.gender)
    .bind(body.date_of_birth)
    .bind(body.enrollment_date.unwrap_or_else(|| Utc::now().date_naive()))
    .bind(body.classroom_id)
    .bind(body.guardian_name.trim())
    .bind(&body.guardian_phone)
    .bind(&body.guardian_email)
    .bind(body.parent_id_number.trim())
    .bind(body.parent_id_expiry)
    .bind(&body.student_id_number)
    .bind(body.student_id_expiry)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(student_id = %student.id, "student admitted");
    Ok((StatusCode::CREATED, Json(student)))
}

async fn fetch_student(state: &AppState, school_id: Uuid, student_id: Uuid) -> AppResult<Student> {
    sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1 AND school_id = $2")
        .bind(student_id)
        .bind(school_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Student {student_id} not found")))
}

/// Get one student
#[utoipa::path(
    get,
    path = "/api/v1/student/students/{student_id}",
    params(("student_id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student", body = Student),
        (status = 404, description = "Student not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn get_student(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> AppResult<Json<Student>> {
    auth.require(Resource::Students, Action::Read)?;
    Ok(Json(fetch_student(&state, auth.school_id, student_id).await?))
}

/// Update a student
#[utoipa::path(
    patch,
    path = "/api/v1/student/students/{student_id}",
    request_body = UpdateStudentRequest,
    params(("student_id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 404, description = "Student not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn update_student(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    Json(body): Json<UpdateStudentRequest>,
) -> AppResult<Json<Student>> {
    auth.require(Resource::Students, Action::Write)?;
    if let Some(room) = body.classroom_id {
        ensure_owned(&state.db, "classrooms", "Classroom", room, auth.school_id).await?;
    }

    let student = sqlx::query_as::<_, Student>(
        r#"UPDATE students SET
             first_name = COALESCE($3, first_name),
             last_name = COALESCE($4, last_name),
             enrollment_status = COALESCE($5, enrollment_status),
             end_date = COALESCE($6, end_date),
             classroom_id = COALESCE($7, classroom_id),
             guardian_name = COALESCE($8, guardian_name),
             guardian_phone = COALESCE($9, guardian_phone),
             guardian_email = COALESCE($10, guardian_email),
             parent_id_expiry = COALESCE($11, parent_id_expiry),
             student_id_expiry = COALESCE($12, student_id_expiry),
             updated_at = NOW()
           WHERE id = $1 AND school_id = $2
           RETURNING *"#,
    )
    .bind(student_id)
    .bind(auth.school_id)
    .bind(body.first_name.as_deref().map(str::trim))
    .bind(body.last_name.as_deref().map(str::trim))
    .bind(body.enrollment_status)
    .bind(body.end_date)
    .bind(body.classroom_id)
    .bind(&body.guardian_name)
    .bind(&body.guardian_phone)
    .bind(&body.guardian_email)
    .bind(body.parent_id_expiry)
    .bind(body.student_id_expiry)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Student {student_id} not found")))?;

    Ok(Json(student))
}

/// Soft-delete a student
#[utoipa::path(
    delete,
    path = "/api/v1/student/students/{student_id}",
    params(("student_id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student deactivated", body = MessageResponse),
        (status = 404, description = "Student not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn deactivate_student(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(Resource::Students, Action::Delete)?;
    let updated = sqlx::query(
        r#"UPDATE students
           SET is_active = FALSE, enrollment_status = 'nonactive', updated_at = NOW()
           WHERE id = $1 AND school_id = $2"#,
    )
    .bind(student_id)
    .bind(auth.school_id)
    .execute(&state.db)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound(format!("Student {student_id} not found")));
    }
    Ok(Json(MessageResponse::new("Student deactivated")))
}

// ─── Enrollments ─────────────────────────────────────────────────────────────

/// Enrollment history of a student
#[utoipa::path(
    get,
    path = "/api/v1/student/students/{student_id}/enrollments",
    params(("student_id" = Uuid, Path, description = "Student ID")),
    responses((status = 200, description = "Enrollments", body = Vec<Enrollment>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn list_enrollments(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> AppResult<Json<Vec<Enrollment>>> {
    auth.require(Resource::Students, Action::Read)?;
    let rows = sqlx::query_as::<_, Enrollment>(
        r#"SELECT * FROM enrollments
           WHERE school_id = $1 AND student_id = $2
           ORDER BY start_date DESC"#,
    )
    .bind(auth.school_id)
    .bind(student_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// Enroll a student in a classroom; the student's current classroom follows
#[utoipa::path(
    post,
    path = "/api/v1/student/enrollments",
    request_body = CreateEnrollmentRequest,
    responses(
        (status = 201, description = "Enrollment created", body = Enrollment),
        (status = 409, description = "Duplicate enrollment"),
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn create_enrollment(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateEnrollmentRequest>,
) -> AppResult<(StatusCode, Json<Enrollment>)> {
    auth.require(Resource::Students, Action::Write)?;
    if body.end_date.is_some_and(|end| end < body.start_date) {
        return Err(AppError::Validation(
            "End date cannot be before the start date".to_string(),
        ));
    }
    ensure_owned(&state.db, "students", "Student", body.student_id, auth.school_id).await?;
    ensure_owned(&state.db, "classrooms", "Classroom", body.classroom_id, auth.school_id).await?;

    let mut tx = state.db.begin().await?;
    let enrollment = sqlx::query_as::<_, Enrollment>(
        r#"INSERT INTO enrollments (id, school_id, student_id, classroom_id, start_date, end_date)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.student_id)
    .bind(body.classroom_id)
    .bind(body.start_date)
    .bind(body.end_date)
    .fetch_one(&mut *tx)
    .await?;

    if enrollment.status == EnrollmentState::Active && enrollment.end_date.is_none() {
        sqlx::query("UPDATE students SET classroom_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(body.student_id)
            .bind(body.classroom_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

// ─── Attendance ──────────────────────────────────────────────────────────────

/// Record (or correct) a student's attendance for a day
#[utoipa::path(
    post,
    path = "/api/v1/student/attendance",
    request_body = RecordAttendanceRequest,
    responses((status = 200, description = "Attendance recorded", body = Attendance)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn record_attendance(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<RecordAttendanceRequest>,
) -> AppResult<Json<Attendance>> {
    auth.require(Resource::Students, Action::Write)?;
    ensure_owned(&state.db, "students", "Student", body.student_id, auth.school_id).await?;

    let row = sqlx::query_as::<_, Attendance>(
        r#"INSERT INTO student_attendance (id, school_id, student_id, date, status, notes)
           VALUES ($1, $2, $3, $4, $5, $6)
           ON CONFLICT (student_id, date)
           DO UPDATE SET status = EXCLUDED.status, notes = EXCLUDED.notes
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.student_id)
    .bind(body.date.unwrap_or_else(|| Utc::now().date_naive()))
    .bind(body.status)
    .bind(&body.notes)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(row))
}

/// List attendance by student and/or day
#[utoipa::path(
    get,
    path = "/api/v1/student/attendance",
    params(
        ("student_id" = Option<Uuid>, Query, description = "Filter by student"),
        ("date" = Option<chrono::NaiveDate>, Query, description = "Filter by day"),
    ),
    responses((status = 200, description = "Attendance rows", body = Vec<Attendance>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn list_attendance(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<AttendanceQuery>,
) -> AppResult<Json<Vec<Attendance>>> {
    auth.require(Resource::Students, Action::Read)?;
    let rows = sqlx::query_as::<_, Attendance>(
        r#"SELECT * FROM student_attendance
           WHERE school_id = $1
             AND ($2::uuid IS NULL OR student_id = $2)
             AND ($3::date IS NULL OR date = $3)
           ORDER BY date DESC
           LIMIT 1000"#,
    )
    .bind(auth.school_id)
    .bind(q.student_id)
    .bind(q.date)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

// ─── Medical records ─────────────────────────────────────────────────────────

/// Add a medical record
#[utoipa::path(
    post,
    path = "/api/v1/student/medical-records",
    request_body = CreateMedicalRecordRequest,
    responses((status = 201, description = "Record created", body = MedicalRecord)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn create_medical_record(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateMedicalRecordRequest>,
) -> AppResult<(StatusCode, Json<MedicalRecord>)> {
    auth.require(Resource::Students, Action::Write)?;
    require_text(&body.description, "description")?;
    ensure_owned(&state.db, "students", "Student", body.student_id, auth.school_id).await?;

    let record = sqlx::query_as::<_, MedicalRecord>(
        r#"INSERT INTO medical_records (
             id, school_id, student_id, record_type, date, description, is_urgent,
             doctor_name, next_checkup_date)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.student_id)
    .bind(body.record_type)
    .bind(body.date.unwrap_or_else(|| Utc::now().date_naive()))
    .bind(&body.description)
    .bind(body.is_urgent)
    .bind(&body.doctor_name)
    .bind(body.next_checkup_date)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Medical history of a student, urgent entries first
#[utoipa::path(
    get,
    path = "/api/v1/student/students/{student_id}/medical-records",
    params(("student_id" = Uuid, Path, description = "Student ID")),
    responses((status = 200, description = "Medical records", body = Vec<MedicalRecord>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn list_medical_records(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> AppResult<Json<Vec<MedicalRecord>>> {
    auth.require(Resource::Students, Action::Read)?;
    let rows = sqlx::query_as::<_, MedicalRecord>(
        r#"SELECT * FROM medical_records
           WHERE school_id = $1 AND student_id = $2
           ORDER BY is_urgent DESC, date DESC"#,
    )
    .bind(auth.school_id)
    .bind(student_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Attach a document record to a student
#[utoipa::path(
    post,
    path = "/api/v1/student/documents",
    request_body = CreateStudentDocumentRequest,
    responses((status = 201, description = "Document created", body = StudentDocument)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn create_student_document(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateStudentDocumentRequest>,
) -> AppResult<(StatusCode, Json<StudentDocument>)> {
    auth.require(Resource::Students, Action::Write)?;
    let issue_date = body.issue_date.unwrap_or_else(|| Utc::now().date_naive());
    if body.expiration_date.is_some_and(|exp| exp < issue_date) {
        return Err(AppError::Validation(
            "Expiration date cannot be before the issue date".to_string(),
        ));
    }
    ensure_owned(&state.db, "students", "Student", body.student_id, auth.school_id).await?;

    let doc = sqlx::query_as::<_, StudentDocument>(
        r#"INSERT INTO student_documents
             (id, school_id, student_id, doc_type, issue_date, expiration_date, notes)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.student_id)
    .bind(body.doc_type)
    .bind(issue_date)
    .bind(body.expiration_date)
    .bind(&body.notes)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// Documents of a student
#[utoipa::path(
    get,
    path = "/api/v1/student/students/{student_id}/documents",
    params(("student_id" = Uuid, Path, description = "Student ID")),
    responses((status = 200, description = "Documents", body = Vec<StudentDocument>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn list_student_documents(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> AppResult<Json<Vec<StudentDocument>>> {
    auth.require(Resource::Students, Action::Read)?;
    let docs = sqlx::query_as::<_, StudentDocument>(
        r#"SELECT * FROM student_documents
           WHERE school_id = $1 AND student_id = $2
           ORDER BY expiration_date NULLS LAST"#,
    )
    .bind(auth.school_id)
    .bind(student_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(docs))
}

/// Delete a student document
#[utoipa::path(
    delete,
    path = "/api/v1/student/documents/{document_id}",
    params(("document_id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document deleted", body = MessageResponse),
        (status = 404, description = "Document not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn delete_student_document(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(Resource::Students, Action::Delete)?;
    let deleted = sqlx::query("DELETE FROM student_documents WHERE id = $1 AND school_id = $2")
        .bind(document_id)
        .bind(auth.school_id)
        .execute(&state.db)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::NotFound(format!("Document {document_id} not found")));
    }
    Ok(Json(MessageResponse::new("Document deleted")))
}

// ─── Evaluations ─────────────────────────────────────────────────────────────

/// Record a progress evaluation for a student
#[utoipa::path(
    post,
    path = "/api/v1/student/evaluations",
    request_body = CreateEvaluationRequest,
    responses(
        (status = 201, description = "Evaluation created", body = Evaluation),
        (status = 400, description = "Follow-up date before the evaluation date")
    ),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn create_evaluation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateEvaluationRequest>,
) -> AppResult<(StatusCode, Json<Evaluation>)> {
    auth.require(Resource::Students, Action::Write)?;
    let date = body.date.unwrap_or_else(|| Utc::now().date_naive());
    if body.follow_up_date.is_some_and(|follow_up| follow_up < date) {
        return Err(AppError::Validation(
            "Follow-up date cannot be before the evaluation date".to_string(),
        ));
    }
    ensure_owned(&state.db, "students", "Student", body.student_id, auth.school_id).await?;

    let evaluation = sqlx::query_as::<_, Evaluation>(
        r#"INSERT INTO student_evaluations (
             id, school_id, student_id, date, status, general_notes, improvement_plan,
             follow_up_date)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.school_id)
    .bind(body.student_id)
    .bind(date)
    .bind(body.status)
    .bind(body.general_notes.trim())
    .bind(body.improvement_plan.trim())
    .bind(body.follow_up_date)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(evaluation)))
}

/// Evaluations of a student, newest first
#[utoipa::path(
    get,
    path = "/api/v1/student/students/{student_id}/evaluations",
    params(("student_id" = Uuid, Path, description = "Student ID")),
    responses((status = 200, description = "Evaluations", body = Vec<Evaluation>)),
    security(("bearer_auth" = [])),
    tag = "Student"
)]
pub async fn list_evaluations(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> AppResult<Json<Vec<Evaluation>>> {
    auth.require(Resource::Students, Action::Read)?;
    let rows = sqlx::query_as::<_, Evaluation>(
        r#"SELECT * FROM student_evaluations
           WHERE school_id = $1 AND student_id = $2
           ORDER BY date DESC, created_at DESC"#,
    )
    .bind(auth.school_id)
    .bind(student_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

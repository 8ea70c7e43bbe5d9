// src/handlers/reporting.rs

use crate::{
    auth::AuthUser,
    errors::AppResult,
    handlers::attachment,
    models::reporting::{CreateReportRequest, ReportJob, ReportJobQuery},
    policy::{Action, Resource},
    services::{documents::DocumentFormat, jobs, reports},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use chrono::Utc;
use uuid::Uuid;

/// Queue a report. The caller must also be able to read the report's data.
#[utoipa::path(
    post,
    path = "/api/v1/reporting/jobs",
    request_body = CreateReportRequest,
    responses(
        (status = 202, description = "Report queued", body = ReportJob),
        (status = 400, description = "Invalid parameters"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reporting"
)]
pub async fn create_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateReportRequest>,
) -> AppResult<(StatusCode, Json<ReportJob>)> {
    auth.require(Resource::Reports, Action::Write)?;
    for resource in reports::sources_of(body.report_type) {
        auth.require(*resource, Action::Read)?;
    }

    let job = jobs::enqueue(
        &state.db,
        &state.reports,
        &state.config,
        auth.school_id,
        auth.id,
        &body,
        Utc::now().date_naive(),
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// List report jobs, newest first
#[utoipa::path(
    get,
    path = "/api/v1/reporting/jobs",
    params(
        ("status" = Option<String>, Query, description = "PENDING, IN_PROGRESS, COMPLETED or FAILED"),
        ("report_type" = Option<String>, Query, description = "Report type"),
    ),
    responses((status = 200, description = "Report jobs", body = Vec<ReportJob>)),
    security(("bearer_auth" = [])),
    tag = "Reporting"
)]
pub async fn list_reports(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<ReportJobQuery>,
) -> AppResult<Json<Vec<ReportJob>>> {
    auth.require(Resource::Reports, Action::Read)?;
    Ok(Json(jobs::list_jobs(&state.db, auth.school_id, &q).await?))
}

/// Status of one report job
#[utoipa::path(
    get,
    path = "/api/v1/reporting/jobs/{job_id}",
    params(("job_id" = Uuid, Path, description = "Report job ID")),
    responses(
        (status = 200, description = "Report job", body = ReportJob),
        (status = 404, description = "Report job not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reporting"
)]
pub async fn get_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<ReportJob>> {
    auth.require(Resource::Reports, Action::Read)?;
    Ok(Json(jobs::get_job(&state.db, auth.school_id, job_id).await?))
}

/// Download the generated file
#[utoipa::path(
    get,
    path = "/api/v1/reporting/jobs/{job_id}/download",
    params(("job_id" = Uuid, Path, description = "Report job ID")),
    responses(
        (status = 200, description = "Report file"),
        (status = 404, description = "Not generated yet or no file"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reporting"
)]
pub async fn download_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Response> {
    auth.require(Resource::Reports, Action::Read)?;
    let job = jobs::get_job(&state.db, auth.school_id, job_id).await?;
    let (file_name, bytes) = jobs::read_output(&job).await?;
    let content_type = DocumentFormat::from_file_name(&file_name).content_type();
    Ok(attachment(&file_name, content_type, bytes))
}

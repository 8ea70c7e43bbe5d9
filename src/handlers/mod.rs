pub mod finance;
pub mod general;
pub mod hr;
pub mod inventory;
pub mod purchasing;
pub mod reporting;
pub mod school;
pub mod student;
pub mod treasury;

use crate::errors::{AppError, AppResult};
use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// Reject blank required text fields with a 400.
pub(crate) fn require_text(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        Err(AppError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// A file download with `Content-Disposition: attachment`.
pub(crate) fn attachment(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', ""));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// 404 unless `id` is a row of `table` belonging to `school_id`.
pub(crate) async fn ensure_owned(
    db: &sqlx::PgPool,
    table: &'static str,
    label: &str,
    id: uuid::Uuid,
    school_id: uuid::Uuid,
) -> AppResult<()> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1 AND school_id = $2)");
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(id)
        .bind(school_id)
        .fetch_one(db)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("{label} {id} not found")))
    }
}

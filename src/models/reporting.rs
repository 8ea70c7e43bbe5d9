// src/models/reporting.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq, Hash)]
#[sqlx(type_name = "report_kind", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    /// Profit and loss over a date range.
    Pnl,
    /// Balance sheet as of a date.
    Bs,
    /// Cash flow over a date range.
    Cash,
    LowStock,
    LowStockPdf,
    /// Documents expiring soon.
    DocExp,
    StudentFees,
    EnrollSummary,
    /// Accounts receivable aging.
    ArAging,
    InvValuation,
    PayrollVsAtt,
    /// Every student document, grouped by student.
    StudentDocs,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReportJob {
    pub id: Uuid,
    pub school_id: Uuid,
    pub requested_by: Option<Uuid>,
    pub report_type: ReportType,
    #[schema(value_type = Object)]
    pub parameters: serde_json::Value,
    pub status: ReportStatus,
    #[serde(skip_serializing)]
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub error: Option<String>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub run_after: DateTime<Utc>,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub download_url: Option<String>,
}

impl ReportJob {
    pub fn with_download_url(mut self) -> Self {
        self.download_url = match (self.status, &self.file_path) {
            (ReportStatus::Completed, Some(_)) => {
                Some(format!("/api/v1/reporting/jobs/{}/download", self.id))
            }
            _ => None,
        };
        self
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReportRequest {
    pub report_type: ReportType,
    #[serde(default = "empty_object")]
    #[schema(value_type = Object)]
    pub parameters: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

#[derive(Debug, Deserialize)]
pub struct ReportJobQuery {
    pub status: Option<ReportStatus>,
    pub report_type: Option<ReportType>,
}

// src/services/jobs.rs
//
// Asynchronous report jobs. The database row is the durable record; the
// channel only carries "job X is ready" wake-ups, so a lost message is
// recovered by the janitor sweep.

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::reporting::{CreateReportRequest, ReportJob, ReportJobQuery, ReportStatus},
    services::{reports, retry::RetryPolicy},
};
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const NO_DATA_MESSAGE: &str =
    "Report generated, but no data was found for the given parameters.";

/// Handle used by request handlers and the janitor to wake the worker pool.
#[derive(Clone)]
pub struct ReportQueue {
    tx: mpsc::UnboundedSender<Uuid>,
}

impl ReportQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Uuid>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn notify(&self, job_id: Uuid) {
        if self.tx.send(job_id).is_err() {
            warn!(job_id = %job_id, "report workers are not running; job left for the janitor");
        }
    }

    /// Wake the pool for `job_id` once `delay` has passed.
    pub fn notify_after(&self, job_id: Uuid, delay: Duration) {
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.notify(job_id);
        });
    }
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// Validate the parameters, persist a PENDING job and wake a worker.
pub async fn enqueue(
    pool: &PgPool,
    queue: &ReportQueue,
    config: &Config,
    school_id: Uuid,
    requested_by: Uuid,
    req: &CreateReportRequest,
    today: NaiveDate,
) -> AppResult<ReportJob> {
    let report_type = req.report_type;
    let params = reports::parse_params(report_type, &req.parameters, today)?;

    let job = sqlx::query_as::<_, ReportJob>(
        r#"INSERT INTO report_jobs (id, school_id, requested_by, report_type, parameters, max_attempts)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(requested_by)
    .bind(report_type)
    .bind(params.to_json())
    .bind(config.report_max_attempts)
    .fetch_one(pool)
    .await?;

    info!(job_id = %job.id, school_id = %school_id, report = ?report_type, "report job queued");
    queue.notify(job.id);
    Ok(job)
}

pub async fn list_jobs(pool: &PgPool, school_id: Uuid, query: &ReportJobQuery) -> AppResult<Vec<ReportJob>> {
    let jobs = sqlx::query_as::<_, ReportJob>(
        r#"SELECT * FROM report_jobs
           WHERE school_id = $1
             AND ($2::report_status IS NULL OR status = $2)
             AND ($3::report_kind IS NULL OR report_type = $3)
           ORDER BY created_at DESC
           LIMIT 200"#,
    )
    .bind(school_id)
    .bind(query.status)
    .bind(query.report_type)
    .fetch_all(pool)
    .await?;

    Ok(jobs.into_iter().map(ReportJob::with_download_url).collect())
}

pub async fn get_job(pool: &PgPool, school_id: Uuid, job_id: Uuid) -> AppResult<ReportJob> {
    sqlx::query_as::<_, ReportJob>("SELECT * FROM report_jobs WHERE id = $1 AND school_id = $2")
        .bind(job_id)
        .bind(school_id)
        .fetch_optional(pool)
        .await?
        .map(ReportJob::with_download_url)
        .ok_or_else(|| AppError::NotFound(format!("Report job {job_id} not found")))
}

/// Bytes and file name of a completed job's output.
pub async fn read_output(job: &ReportJob) -> AppResult<(String, Vec<u8>)> {
    let (Some(path), ReportStatus::Completed) = (&job.file_path, job.status) else {
        return Err(AppError::NotFound(format!(
            "Report job {} has no file to download",
            job.id
        )));
    };
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        error!(job_id = %job.id, path = %path, error = %e, "report file unreadable");
        AppError::NotFound("Report file is no longer available".to_string())
    })?;
    let name = job
        .file_name
        .clone()
        .unwrap_or_else(|| format!("report-{}", job.id));
    Ok((name, bytes))
}

// ─── Workers ─────────────────────────────────────────────────────────────────

/// Start `config.report_workers` workers sharing one receiver.
pub fn spawn_workers(
    pool: PgPool,
    config: Arc<Config>,
    queue: ReportQueue,
    rx: mpsc::UnboundedReceiver<Uuid>,
) -> Vec<JoinHandle<()>> {
    let rx = Arc::new(Mutex::new(rx));
    (0..config.report_workers)
        .map(|worker| {
            let pool = pool.clone();
            let config = config.clone();
            let queue = queue.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                info!(worker, "report worker started");
                loop {
                    let next = { rx.lock().await.recv().await };
                    let Some(job_id) = next else { break };
                    if let Err(e) = process(&pool, &config, &queue, job_id).await {
                        error!(worker, job_id = %job_id, error = %e, "report job processing error");
                    }
                }
                info!(worker, "report worker stopped");
            })
        })
        .collect()
}

/// Move a due PENDING job to IN_PROGRESS. `None` when another worker got it,
/// it is not due yet, or it is no longer pending.
async fn claim(pool: &PgPool, job_id: Uuid) -> AppResult<Option<ReportJob>> {
    let job = sqlx::query_as::<_, ReportJob>(
        r#"UPDATE report_jobs
           SET status = 'in_progress', attempts = attempts + 1, started_at = NOW()
           WHERE id = $1 AND status = 'pending' AND run_after <= NOW()
           RETURNING *"#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;
    Ok(job)
}

pub fn storage_path(report_dir: &Path, school_id: Uuid, job_id: Uuid, file_name: &str) -> PathBuf {
    report_dir
        .join(school_id.to_string())
        .join(format!("{job_id}-{file_name}"))
}

enum Outcome {
    Stored { path: PathBuf, file_name: String },
    NoData,
}

/// Claim and run one job, then record the outcome on its row.
pub async fn process(pool: &PgPool, config: &Config, queue: &ReportQueue, job_id: Uuid) -> AppResult<()> {
    let Some(job) = claim(pool, job_id).await? else {
        debug!(job_id = %job_id, "report job not claimable");
        return Ok(());
    };
    let today = Utc::now().date_naive();

    // Stored parameters that no longer validate will never succeed.
    let params = match reports::parse_params(job.report_type, &job.parameters, today) {
        Ok(params) => params,
        Err(e) => return mark_failed(pool, &job, &e.to_string()).await,
    };

    info!(job_id = %job.id, report = ?job.report_type, attempt = job.attempts, "report job started");
    let run = run(pool, config, &job, &params, today);
    match tokio::time::timeout(config.report_time_limit, run).await {
        Ok(Ok(Outcome::Stored { path, file_name })) => {
            sqlx::query(
                r#"UPDATE report_jobs
                   SET status = 'completed', file_path = $2, file_name = $3,
                       error = NULL, generated_at = NOW()
                   WHERE id = $1"#,
            )
            .bind(job.id)
            .bind(path.to_string_lossy().into_owned())
            .bind(&file_name)
            .execute(pool)
            .await?;
            info!(job_id = %job.id, file = %file_name, "report job completed");
            Ok(())
        }
        Ok(Ok(Outcome::NoData)) => {
            sqlx::query(
                r#"UPDATE report_jobs
                   SET status = 'completed', file_path = NULL, error = $2, generated_at = NOW()
                   WHERE id = $1"#,
            )
            .bind(job.id)
            .bind(NO_DATA_MESSAGE)
            .execute(pool)
            .await?;
            info!(job_id = %job.id, "report job completed without data");
            Ok(())
        }
        Ok(Err(e)) => retry_or_fail(pool, queue, &job, &e.to_string()).await,
        Err(_) => {
            let msg = format!(
                "Report generation exceeded the {} s time limit",
                config.report_time_limit.as_secs()
            );
            retry_or_fail(pool, queue, &job, &msg).await
        }
    }
}

async fn run(
    pool: &PgPool,
    config: &Config,
    job: &ReportJob,
    params: &reports::ReportParams,
    today: NaiveDate,
) -> AppResult<Outcome> {
    let Some(built) = reports::build(pool, job.school_id, job.report_type, params, today).await? else {
        return Ok(Outcome::NoData);
    };

    let file_name = built.file_name.clone();
    let bytes = tokio::task::spawn_blocking(move || built.render())
        .await
        .map_err(|e| AppError::Internal(format!("render task failed: {e}")))??;

    let path = storage_path(&config.report_dir, job.school_id, job.id, &file_name);
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::Report(format!("cannot create {}: {e}", dir.display())))?;
    }
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| AppError::Report(format!("cannot write {}: {e}", path.display())))?;

    Ok(Outcome::Stored { path, file_name })
}

/// Backoff before the next attempt, or `None` once `attempts` has used the budget.
pub fn next_retry(attempts: i32, max_attempts: i32) -> Option<Duration> {
    (attempts < max_attempts).then(|| RetryPolicy::REPORTS.backoff(attempts.max(1) as u32))
}

async fn retry_or_fail(pool: &PgPool, queue: &ReportQueue, job: &ReportJob, msg: &str) -> AppResult<()> {
    let Some(delay) = next_retry(job.attempts, job.max_attempts) else {
        return mark_failed(pool, job, msg).await;
    };

    sqlx::query(
        r#"UPDATE report_jobs
           SET status = 'pending', error = $2,
               run_after = NOW() + make_interval(secs => $3), enqueued_at = NOW()
           WHERE id = $1"#,
    )
    .bind(job.id)
    .bind(msg)
    .bind(delay.as_secs_f64())
    .execute(pool)
    .await?;

    warn!(
        job_id = %job.id,
        attempt = job.attempts,
        retry_in_secs = delay.as_secs(),
        error = msg,
        "report job failed, retry scheduled"
    );
    queue.notify_after(job.id, delay);
    Ok(())
}

async fn mark_failed(pool: &PgPool, job: &ReportJob, msg: &str) -> AppResult<()> {
    sqlx::query(
        "UPDATE report_jobs SET status = 'failed', error = $2, generated_at = NOW() WHERE id = $1",
    )
    .bind(job.id)
    .bind(msg)
    .execute(pool)
    .await?;
    error!(job_id = %job.id, attempts = job.attempts, error = msg, "report job failed");
    Ok(())
}

// ─── Janitor ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub requeued: usize,
    pub reset: usize,
    pub failed: usize,
}

/// Recover jobs whose wake-up was lost or whose worker died.
///
/// * PENDING jobs due for longer than the pending timeout are re-notified.
/// * IN_PROGRESS jobs older than twice the time limit go back to PENDING,
///   or to FAILED once they have used all attempts.
pub async fn sweep(pool: &PgPool, queue: &ReportQueue, config: &Config) -> AppResult<SweepSummary> {
    let mut summary = SweepSummary::default();

    let stale: Vec<Uuid> = sqlx::query_scalar(
        r#"UPDATE report_jobs SET enqueued_at = NOW()
           WHERE status = 'pending' AND run_after <= NOW() - make_interval(secs => $1)
           RETURNING id"#,
    )
    .bind(config.report_pending_timeout.as_secs_f64())
    .fetch_all(pool)
    .await?;
    summary.requeued = stale.len();

    let stuck_after = config.report_time_limit.saturating_mul(2).as_secs_f64();

    let failed: Vec<Uuid> = sqlx::query_scalar(
        r#"UPDATE report_jobs
           SET status = 'failed', error = 'Report worker stopped responding', generated_at = NOW()
           WHERE status = 'in_progress'
             AND started_at <= NOW() - make_interval(secs => $1)
             AND attempts >= max_attempts
           RETURNING id"#,
    )
    .bind(stuck_after)
    .fetch_all(pool)
    .await?;
    summary.failed = failed.len();

    let reset: Vec<Uuid> = sqlx::query_scalar(
        r#"UPDATE report_jobs
           SET status = 'pending', run_after = NOW(), enqueued_at = NOW(),
               error = 'Report worker stopped responding; retrying'
           WHERE status = 'in_progress'
             AND started_at <= NOW() - make_interval(secs => $1)
             AND attempts < max_attempts
           RETURNING id"#,
    )
    .bind(stuck_after)
    .fetch_all(pool)
    .await?;
    summary.reset = reset.len();

    for id in stale.into_iter().chain(reset) {
        queue.notify(id);
    }

    if summary != SweepSummary::default() {
        warn!(
            requeued = summary.requeued,
            reset = summary.reset,
            failed = summary.failed,
            "report janitor recovered jobs"
        );
    }
    Ok(summary)
}

/// Wake the pool for every job left PENDING by a previous run of the process.
pub async fn resume_pending(pool: &PgPool, queue: &ReportQueue) -> AppResult<usize> {
    let pending: Vec<(Uuid, chrono::DateTime<Utc>)> = sqlx::query_as(
        "SELECT id, run_after FROM report_jobs WHERE status = 'pending' ORDER BY enqueued_at",
    )
    .fetch_all(pool)
    .await?;

    let now = Utc::now();
    for (id, run_after) in &pending {
        match (*run_after - now).to_std() {
            Ok(delay) if !delay.is_zero() => queue.notify_after(*id, delay),
            _ => queue.notify(*id),
        }
    }
    if !pending.is_empty() {
        info!(count = pending.len(), "resumed pending report jobs");
    }
    Ok(pending.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_back_off_until_attempts_run_out() {
        assert_eq!(next_retry(1, 3), Some(Duration::from_secs(60)));
        assert_eq!(next_retry(2, 3), Some(Duration::from_secs(120)));
        assert_eq!(next_retry(3, 3), None);
        assert_eq!(next_retry(1, 1), None);
    }

    #[test]
    fn files_are_stored_per_school() {
        let school = Uuid::new_v4();
        let job = Uuid::new_v4();
        let path = storage_path(Path::new("/var/reports"), school, job, "ar_aging.pdf");
        assert_eq!(
            path,
            PathBuf::from(format!("/var/reports/{school}/{job}-ar_aging.pdf"))
        );
    }

    #[tokio::test]
    async fn queue_delivers_wakeups_in_order() {
        let (queue, mut rx) = ReportQueue::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        queue.notify(a);
        queue.clone().notify(b);
        assert_eq!(rx.recv().await, Some(a));
        assert_eq!(rx.recv().await, Some(b));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_wakeup_waits_for_the_backoff() {
        let (queue, mut rx) = ReportQueue::new();
        let id = Uuid::new_v4();
        queue.notify_after(id, Duration::from_secs(60));

        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(rx.recv().await, Some(id));
    }

    fn job(status: ReportStatus, file_path: Option<String>) -> ReportJob {
        let now = Utc::now();
        ReportJob {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            requested_by: None,
            report_type: crate::models::reporting::ReportType::LowStock,
            parameters: serde_json::json!({}),
            status,
            file_path,
            file_name: Some("low_stock.xlsx".to_string()),
            error: None,
            attempts: 1,
            max_attempts: 3,
            run_after: now,
            enqueued_at: now,
            started_at: Some(now),
            generated_at: None,
            created_at: now,
            download_url: None,
        }
    }

    #[tokio::test]
    async fn completed_output_is_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        tokio::fs::write(&path, b"PK-bytes").await.unwrap();

        let done = job(ReportStatus::Completed, Some(path.display().to_string()));
        let (name, bytes) = read_output(&done).await.unwrap();
        assert_eq!(name, "low_stock.xlsx");
        assert_eq!(bytes, b"PK-bytes");
    }

    #[tokio::test]
    async fn unfinished_or_missing_output_is_not_found() {
        let pending = job(ReportStatus::Pending, None);
        assert!(matches!(read_output(&pending).await, Err(AppError::NotFound(_))));

        let gone = job(
            ReportStatus::Completed,
            Some("/nonexistent/school-erp/out.xlsx".to_string()),
        );
        assert!(matches!(read_output(&gone).await, Err(AppError::NotFound(_))));
    }

    #[test]
    fn notify_without_workers_does_not_panic() {
        let (queue, rx) = ReportQueue::new();
        drop(rx);
        queue.notify(Uuid::new_v4());
    }
}

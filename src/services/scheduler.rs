// src/services/scheduler.rs

use crate::{
    errors::AppResult,
    services::{billing, jobs, ledger, notifications, payroll, payroll::month_start},
    state::AppState,
};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::sleep;

const TICK: Duration = Duration::from_secs(15);

pub const DAILY_TASK: &str = "daily";
pub const MONTHLY_TASK: &str = "monthly";

/// Daily jobs run once per calendar day, at or after `hour` UTC.
pub fn daily_due(now: DateTime<Utc>, last_run: Option<NaiveDate>, hour: u32) -> bool {
    let today = now.date_naive();
    last_run != Some(today) && now.hour() >= hour
}

/// Monthly jobs run once per month: on the 1st, or on the first day after it
/// when the process was down. A scheduler with no history waits for the 1st.
pub fn monthly_due(today: NaiveDate, last_run: Option<NaiveDate>) -> bool {
    match last_run {
        Some(last) => month_start(last) < month_start(today),
        None => today.day() == 1,
    }
}

pub async fn last_run(pool: &PgPool, task: &str) -> AppResult<Option<NaiveDate>> {
    let day = sqlx::query_scalar("SELECT last_run FROM scheduler_runs WHERE task = $1")
        .bind(task)
        .fetch_optional(pool)
        .await?;
    Ok(day)
}

pub async fn mark_run(pool: &PgPool, task: &str, day: NaiveDate) -> AppResult<()> {
    sqlx::query(
        r#"INSERT INTO scheduler_runs (task, last_run) VALUES ($1, $2)
           ON CONFLICT (task) DO UPDATE SET last_run = EXCLUDED.last_run"#,
    )
    .bind(task)
    .bind(day)
    .execute(pool)
    .await?;
    Ok(())
}

async fn load_last_run(pool: &PgPool, task: &str) -> Option<NaiveDate> {
    last_run(pool, task).await.unwrap_or_else(|e| {
        tracing::warn!(task, error = %e, "scheduler: could not load last run");
        None
    })
}

async fn store_run(pool: &PgPool, task: &str, day: NaiveDate) {
    if let Err(e) = mark_run(pool, task, day).await {
        tracing::warn!(task, error = %e, "scheduler: could not record run");
    }
}

/// Background loop for the janitor and the calendar jobs.
///
/// Each job is spawned on its own task so one failure never stops the loop.
pub async fn run_background_scheduler(state: AppState) {
    tracing::info!("background scheduler started");

    let janitor_interval = state.config.report_janitor_interval.max(TICK);
    let mut last_janitor_run = tokio::time::Instant::now();
    // Persisted so a restart neither repeats today's alerts nor loses a month.
    let mut last_daily_run = load_last_run(&state.db, DAILY_TASK).await;
    let mut last_monthly_run = load_last_run(&state.db, MONTHLY_TASK).await;

    loop {
        sleep(TICK).await;

        let now_instant = tokio::time::Instant::now();
        let now_utc = Utc::now();
        let today = now_utc.date_naive();

        if now_instant.duration_since(last_janitor_run) >= janitor_interval {
            last_janitor_run = now_instant;
            let st = state.clone();
            tokio::spawn(async move {
                if let Err(e) = jobs::sweep(&st.db, &st.reports, &st.config).await {
                    tracing::error!(error = %e, "scheduler: report janitor failed");
                }
            });
        }

        if !daily_due(now_utc, last_daily_run, state.config.daily_jobs_hour) {
            continue;
        }
        last_daily_run = Some(today);
        store_run(&state.db, DAILY_TASK, today).await;
        tracing::info!(%today, "scheduler: running daily jobs");

        if monthly_due(today, last_monthly_run) {
            last_monthly_run = Some(today);
            store_run(&state.db, MONTHLY_TASK, today).await;
            let st = state.clone();
            tokio::spawn(async move {
                run_monthly_jobs(&st, today).await;
            });
        }

        let st = state.clone();
        tokio::spawn(async move {
            run_daily_jobs(&st, today).await;
        });
    }
}

async fn run_daily_jobs(state: &AppState, today: NaiveDate) {
    match ledger::refresh_overdue(&state.db, today).await {
        Ok(n) => tracing::info!(flipped = n, "scheduler: overdue sweep done"),
        Err(e) => tracing::error!(error = %e, "scheduler: overdue sweep failed"),
    }

    // Catch-up for staff hired after the 1st.
    match payroll::generate_for_all_schools(&state.db, today).await {
        Ok(n) => tracing::info!(created = n, "scheduler: salary catch-up done"),
        Err(e) => tracing::error!(error = %e, "scheduler: salary catch-up failed"),
    }

    let mailer = state.mailer.as_ref();
    if let Err(e) = notifications::low_stock_alert(&state.db, mailer, &state.config).await {
        tracing::error!(error = %e, "scheduler: low stock alert failed");
    }
    if let Err(e) = notifications::document_expiry_alert(&state.db, mailer, &state.config, today).await {
        tracing::error!(error = %e, "scheduler: document expiry alert failed");
    }
    if let Err(e) = notifications::contract_expiry_alert(&state.db, mailer, &state.config, today).await {
        tracing::error!(error = %e, "scheduler: contract expiry alert failed");
    }
}

async fn run_monthly_jobs(state: &AppState, today: NaiveDate) {
    tracing::info!(%today, "scheduler: running monthly jobs");

    match payroll::generate_for_all_schools(&state.db, today).await {
        Ok(n) => tracing::info!(created = n, "scheduler: monthly salary records generated"),
        Err(e) => tracing::error!(error = %e, "scheduler: salary generation failed"),
    }

    match billing::generate_for_all_schools(&state.db, today, state.config.invoice_due_days, today).await {
        Ok(n) => tracing::info!(created = n, "scheduler: tuition invoices generated"),
        Err(e) => tracing::error!(error = %e, "scheduler: tuition billing failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn daily_jobs_wait_for_the_configured_hour() {
        assert!(!daily_due(at(2025, 3, 4, 4), None, 5));
        assert!(daily_due(at(2025, 3, 4, 5), None, 5));
        assert!(daily_due(at(2025, 3, 4, 23), None, 5));
    }

    #[test]
    fn daily_jobs_run_once_per_day() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        assert!(!daily_due(at(2025, 3, 4, 12), Some(today), 5));
        assert!(daily_due(at(2025, 3, 5, 6), Some(today), 5));
    }

    #[test]
    fn monthly_jobs_run_on_the_first_once() {
        let first = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert!(monthly_due(first, None));
        assert!(!monthly_due(first, Some(first)));
        assert!(!monthly_due(NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(), None));
    }

    #[test]
    fn a_missed_first_is_caught_up_later_in_the_month() {
        let march_run = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let april_third = NaiveDate::from_ymd_opt(2025, 4, 3).unwrap();
        assert!(monthly_due(april_third, Some(march_run)));
        assert!(!monthly_due(april_third, Some(april_third)));
        assert!(!monthly_due(
            NaiveDate::from_ymd_opt(2025, 4, 20).unwrap(),
            Some(april_third)
        ));
        // Across a year boundary.
        assert!(monthly_due(
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            Some(NaiveDate::from_ymd_opt(2025, 12, 1).unwrap())
        ));
    }
}

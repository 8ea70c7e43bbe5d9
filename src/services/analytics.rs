// src/services/analytics.rs

use crate::{
    errors::AppResult,
    models::school::{
        DashboardResponse, FinanceAnalytics, HrAnalytics, Kpis, LabelCount, MonthlyAmount,
        MonthlyCount, StudentAnalytics,
    },
    services::payroll::{month_end, month_start},
};
use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Trend charts cover this many months, the current one included.
pub const TREND_MONTHS: u32 = 12;

pub fn trend_start(today: NaiveDate) -> NaiveDate {
    let first = month_start(today);
    first
        .checked_sub_months(Months::new(TREND_MONTHS - 1))
        .unwrap_or(first)
}

pub async fn dashboard(pool: &PgPool, school_id: Uuid, today: NaiveDate) -> AppResult<DashboardResponse> {
    let since = trend_start(today);

    let (kpis, enrollment_trend, status_distribution) = tokio::try_join!(
        kpis(pool, school_id, today),
        enrollment_trend(pool, school_id, since),
        label_counts(
            pool,
            school_id,
            r#"SELECT enrollment_status::text AS label, COUNT(*) AS count
               FROM students WHERE school_id = $1
               GROUP BY 1 ORDER BY 2 DESC, 1"#,
        ),
    )?;

    let (revenue_by_month, expenses_by_month, invoice_status_distribution, staff_role_distribution) = tokio::try_join!(
        monthly_amounts(
            pool,
            school_id,
            since,
            r#"SELECT date_trunc('month', issue_date)::date AS month, SUM(amount) AS amount
               FROM invoices
               WHERE school_id = $1 AND status = 'paid' AND issue_date >= $2
               GROUP BY 1 ORDER BY 1"#,
        ),
        monthly_amounts(
            pool,
            school_id,
            since,
            r#"SELECT date_trunc('month', date)::date AS month, SUM(amount) AS amount
               FROM expenses
               WHERE school_id = $1 AND date >= $2
               GROUP BY 1 ORDER BY 1"#,
        ),
        label_counts(
            pool,
            school_id,
            r#"SELECT status::text AS label, COUNT(*) AS count
               FROM invoices WHERE school_id = $1
               GROUP BY 1 ORDER BY 2 DESC, 1"#,
        ),
        label_counts(
            pool,
            school_id,
            r#"SELECT role::text AS label, COUNT(*) AS count
               FROM staff WHERE school_id = $1 AND is_active
               GROUP BY 1 ORDER BY 2 DESC, 1"#,
        ),
    )?;

    Ok(DashboardResponse {
        kpis,
        student_analytics: StudentAnalytics {
            enrollment_trend,
            status_distribution,
        },
        finance_analytics: FinanceAnalytics {
            revenue_by_month,
            expenses_by_month,
            invoice_status_distribution,
        },
        hr_analytics: HrAnalytics {
            staff_role_distribution,
        },
    })
}

async fn kpis(pool: &PgPool, school_id: Uuid, today: NaiveDate) -> AppResult<Kpis> {
    let (total_students, active_classes, monthly_revenue, total_staff) =
        sqlx::query_as::<_, (i64, i64, Decimal, i64)>(
            r#"SELECT
                 (SELECT COUNT(*) FROM students WHERE school_id = $1 AND is_active),
                 (SELECT COUNT(*) FROM classrooms WHERE school_id = $1),
                 (SELECT COALESCE(SUM(amount), 0) FROM invoices
                  WHERE school_id = $1 AND status = 'paid' AND issue_date BETWEEN $2 AND $3),
                 (SELECT COUNT(*) FROM staff WHERE school_id = $1 AND is_active)"#,
        )
        .bind(school_id)
        .bind(month_start(today))
        .bind(month_end(today))
        .fetch_one(pool)
        .await?;

    Ok(Kpis {
        total_students,
        active_classes,
        monthly_revenue,
        total_staff,
    })
}

async fn enrollment_trend(pool: &PgPool, school_id: Uuid, since: NaiveDate) -> AppResult<Vec<MonthlyCount>> {
    let rows = sqlx::query_as::<_, MonthlyCount>(
        r#"SELECT date_trunc('month', enrollment_date)::date AS month, COUNT(*) AS count
           FROM students
           WHERE school_id = $1 AND enrollment_date >= $2
           GROUP BY 1 ORDER BY 1"#,
    )
    .bind(school_id)
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn monthly_amounts(
    pool: &PgPool,
    school_id: Uuid,
    since: NaiveDate,
    sql: &'static str,
) -> AppResult<Vec<MonthlyAmount>> {
    let rows = sqlx::query_as::<_, MonthlyAmount>(sql)
        .bind(school_id)
        .bind(since)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

async fn label_counts(pool: &PgPool, school_id: Uuid, sql: &'static str) -> AppResult<Vec<LabelCount>> {
    let rows = sqlx::query_as::<_, LabelCount>(sql)
        .bind(school_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_window_spans_twelve_months() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 18).unwrap();
        assert_eq!(trend_start(today), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
    }
}

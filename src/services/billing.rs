// src/services/billing.rs
//
// Monthly tuition invoices, one per active student and billing month.

use crate::{
    errors::AppResult,
    services::{
        ledger,
        numbering::{self, INVOICE_PREFIX},
        payroll::month_start,
    },
};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct TuitionRunSummary {
    pub billing_period: String,
    pub created: u64,
    pub skipped: u64,
}

pub fn billing_period(month: NaiveDate) -> String {
    month.format("%Y-%m").to_string()
}

pub fn tuition_description(classroom: &str, period: &str) -> String {
    format!("Tuition {classroom} {period}")
}

/// Bill every active student of a fee-paying classroom for `month`.
/// Students already billed for the period are skipped.
pub async fn generate_tuition_invoices(
    pool: &PgPool,
    school_id: Uuid,
    month: NaiveDate,
    due_days: i64,
    today: NaiveDate,
) -> AppResult<TuitionRunSummary> {
    let issue_date = month_start(month);
    let period = billing_period(issue_date);
    let due_date = issue_date + Duration::days(due_days);

    let students = sqlx::query_as::<_, (Uuid, Decimal, String)>(
        r#"SELECT s.id, c.monthly_fee, c.name
           FROM students s
           JOIN classrooms c ON c.id = s.classroom_id
           WHERE s.school_id = $1
             AND s.is_active
             AND c.monthly_fee > 0
           ORDER BY s.last_name, s.first_name"#,
    )
    .bind(school_id)
    .fetch_all(pool)
    .await?;

    let mut summary = TuitionRunSummary {
        billing_period: period.clone(),
        created: 0,
        skipped: 0,
    };

    let mut tx = pool.begin().await?;
    for (student_id, fee, classroom) in students {
        let billed: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM invoices WHERE student_id = $1 AND billing_period = $2)",
        )
        .bind(student_id)
        .bind(&period)
        .fetch_one(&mut *tx)
        .await?;
        if billed {
            summary.skipped += 1;
            continue;
        }

        // Numbers are drawn only for students about to be billed.
        let number = numbering::next_number(&mut tx, school_id, INVOICE_PREFIX).await?;
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"INSERT INTO invoices
                (id, school_id, invoice_number, student_id, issue_date, due_date, description,
                 amount, sent_at, billing_period)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), $9)
               ON CONFLICT (student_id, billing_period) DO NOTHING
               RETURNING id"#,
        )
        .bind(Uuid::new_v4())
        .bind(school_id)
        .bind(&number)
        .bind(student_id)
        .bind(issue_date)
        .bind(due_date)
        .bind(tuition_description(&classroom, &period))
        .bind(fee)
        .bind(&period)
        .fetch_optional(&mut *tx)
        .await?;

        match inserted {
            Some(invoice_id) => {
                ledger::recompute_invoice(&mut tx, school_id, invoice_id, today).await?;
                summary.created += 1;
            }
            None => summary.skipped += 1,
        }
    }
    tx.commit().await?;

    if summary.created > 0 {
        info!(
            school_id = %school_id,
            period = %summary.billing_period,
            created = summary.created,
            "tuition invoices generated"
        );
    }
    Ok(summary)
}

pub async fn generate_for_all_schools(
    pool: &PgPool,
    month: NaiveDate,
    due_days: i64,
    today: NaiveDate,
) -> AppResult<u64> {
    let schools: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM schools ORDER BY created_at")
        .fetch_all(pool)
        .await?;

    let mut created = 0;
    for school_id in schools {
        match generate_tuition_invoices(pool, school_id, month, due_days, today).await {
            Ok(summary) => created += summary.created,
            Err(e) => error!(school_id = %school_id, error = %e, "tuition billing failed"),
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_are_year_and_month() {
        let d = NaiveDate::from_ymd_opt(2025, 9, 14).unwrap();
        assert_eq!(billing_period(d), "2025-09");
        assert_eq!(billing_period(month_start(d)), "2025-09");
    }

    #[test]
    fn description_names_class_and_period() {
        assert_eq!(tuition_description("KG1", "2025-09"), "Tuition KG1 2025-09");
    }
}

// src/services/payroll.rs

use crate::{
    errors::{AppError, AppResult},
    models::hr::{
        CreateSalaryRecordRequest, PayrollContract, SalaryGenerationSummary, SalaryRecord,
        UpdateSalaryRecordRequest, UpsertContractRequest,
    },
};
use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{error, info};
use uuid::Uuid;

pub struct PayrollService;

#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedSalary {
    pub staff_id: Uuid,
    pub gross: Decimal,
    pub deduct: Decimal,
    pub net: Decimal,
}

impl PayrollService {
    /// Monthly pay for a contract: base plus allowance, no deductions.
    pub fn calculate(contract: &PayrollContract) -> CalculatedSalary {
        let gross = contract.base_salary + contract.allowance;
        CalculatedSalary {
            staff_id: contract.staff_id,
            gross,
            deduct: Decimal::ZERO,
            net: gross,
        }
    }

    /// `gross - deduct`; deductions larger than the gross are rejected.
    pub fn net(gross: Decimal, deduct: Decimal) -> AppResult<Decimal> {
        if gross < Decimal::ZERO || deduct < Decimal::ZERO {
            return Err(AppError::Validation(
                "Gross and deductions cannot be negative".to_string(),
            ));
        }
        if deduct > gross {
            return Err(AppError::Validation(
                "Deductions cannot exceed the gross salary".to_string(),
            ));
        }
        Ok(gross - deduct)
    }

    /// Whether the contract covers any day of `month`.
    pub fn in_force(contract_start: NaiveDate, contract_end: Option<NaiveDate>, month: NaiveDate) -> bool {
        let first = month_start(month);
        let last = month_end(month);
        contract_start <= last && contract_end.is_none_or(|end| end >= first)
    }
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    let first = month_start(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

// ─── Contracts ───────────────────────────────────────────────────────────────

pub async fn upsert_contract(
    conn: &mut PgConnection,
    school_id: Uuid,
    staff_id: Uuid,
    req: &UpsertContractRequest,
) -> AppResult<PayrollContract> {
    if req.base_salary < Decimal::ZERO || req.allowance < Decimal::ZERO {
        return Err(AppError::Validation(
            "Salary and allowance cannot be negative".to_string(),
        ));
    }
    if req.contract_end.is_some_and(|end| end < req.contract_start) {
        return Err(AppError::Validation(
            "Contract end cannot be before its start".to_string(),
        ));
    }
    ensure_staff(conn, school_id, staff_id).await?;

    let contract = sqlx::query_as::<_, PayrollContract>(
        r#"INSERT INTO payroll_contracts
            (id, school_id, staff_id, base_salary, allowance, contract_start, contract_end)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           ON CONFLICT (staff_id) DO UPDATE
           SET base_salary = EXCLUDED.base_salary,
               allowance = EXCLUDED.allowance,
               contract_start = EXCLUDED.contract_start,
               contract_end = EXCLUDED.contract_end,
               updated_at = NOW()
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(staff_id)
    .bind(req.base_salary)
    .bind(req.allowance)
    .bind(req.contract_start)
    .bind(req.contract_end)
    .fetch_one(&mut *conn)
    .await?;

    Ok(contract)
}

async fn ensure_staff(conn: &mut PgConnection, school_id: Uuid, staff_id: Uuid) -> AppResult<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM staff WHERE id = $1 AND school_id = $2)")
            .bind(staff_id)
            .bind(school_id)
            .fetch_one(&mut *conn)
            .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Staff member {staff_id} not found")))
    }
}

// ─── Salary records ──────────────────────────────────────────────────────────

pub async fn create_salary_record(
    conn: &mut PgConnection,
    school_id: Uuid,
    req: &CreateSalaryRecordRequest,
) -> AppResult<SalaryRecord> {
    let net = PayrollService::net(req.gross, req.deduct)?;
    ensure_staff(conn, school_id, req.staff_id).await?;

    let record = sqlx::query_as::<_, SalaryRecord>(
        r#"INSERT INTO salary_records (id, school_id, staff_id, month, gross, deduct, net)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(req.staff_id)
    .bind(month_start(req.month))
    .bind(req.gross)
    .bind(req.deduct)
    .bind(net)
    .fetch_one(&mut *conn)
    .await?;

    Ok(record)
}

pub async fn update_salary_record(
    conn: &mut PgConnection,
    school_id: Uuid,
    record_id: Uuid,
    req: &UpdateSalaryRecordRequest,
) -> AppResult<SalaryRecord> {
    let record = sqlx::query_as::<_, SalaryRecord>(
        "SELECT * FROM salary_records WHERE id = $1 AND school_id = $2 FOR UPDATE",
    )
    .bind(record_id)
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Salary record {record_id} not found")))?;

    if record.paid {
        return Err(AppError::Conflict(
            "Salary record is already paid and cannot be changed".to_string(),
        ));
    }

    let gross = req.gross.unwrap_or(record.gross);
    let deduct = req.deduct.unwrap_or(record.deduct);
    let net = PayrollService::net(gross, deduct)?;

    let record = sqlx::query_as::<_, SalaryRecord>(
        r#"UPDATE salary_records
           SET gross = $2, deduct = $3, net = $4, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(record_id)
    .bind(gross)
    .bind(deduct)
    .bind(net)
    .fetch_one(&mut *conn)
    .await?;

    Ok(record)
}

/// Create one record per active staff member whose contract covers `month`.
/// Existing `(staff, month)` records are left alone and counted as skipped.
pub async fn generate_salary_records(
    pool: &PgPool,
    school_id: Uuid,
    month: NaiveDate,
) -> AppResult<SalaryGenerationSummary> {
    let month = month_start(month);

    let contracts = sqlx::query_as::<_, PayrollContract>(
        r#"SELECT c.*
           FROM payroll_contracts c
           JOIN staff s ON s.id = c.staff_id
           WHERE c.school_id = $1
             AND s.is_active
             AND c.contract_start <= $3
             AND (c.contract_end IS NULL OR c.contract_end >= $2)
           ORDER BY s.last_name, s.first_name"#,
    )
    .bind(school_id)
    .bind(month)
    .bind(month_end(month))
    .fetch_all(pool)
    .await?;

    let mut tx = pool.begin().await?;
    let mut summary = SalaryGenerationSummary {
        month,
        created: 0,
        skipped: 0,
    };

    for contract in &contracts {
        let salary = PayrollService::calculate(contract);
        let inserted = sqlx::query(
            r#"INSERT INTO salary_records (id, school_id, staff_id, month, gross, deduct, net)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (staff_id, month) DO NOTHING"#,
        )
        .bind(Uuid::new_v4())
        .bind(school_id)
        .bind(salary.staff_id)
        .bind(month)
        .bind(salary.gross)
        .bind(salary.deduct)
        .bind(salary.net)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 1 {
            summary.created += 1;
        } else {
            summary.skipped += 1;
        }
    }

    tx.commit().await?;

    if summary.created > 0 {
        info!(
            school_id = %school_id,
            month = %month,
            created = summary.created,
            skipped = summary.skipped,
            "salary records generated"
        );
    }
    Ok(summary)
}

/// Run the monthly generation for every school; one school failing does not stop the rest.
pub async fn generate_for_all_schools(pool: &PgPool, month: NaiveDate) -> AppResult<u64> {
    let schools: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM schools ORDER BY created_at")
        .fetch_all(pool)
        .await?;

    let mut created = 0;
    for school_id in schools {
        match generate_salary_records(pool, school_id, month).await {
            Ok(summary) => created += summary.created,
            Err(e) => error!(school_id = %school_id, error = %e, "salary generation failed"),
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(base: Decimal, allowance: Decimal) -> PayrollContract {
        PayrollContract {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            staff_id: Uuid::new_v4(),
            base_salary: base,
            allowance,
            contract_start: day(2024, 9, 1),
            contract_end: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn gross_is_base_plus_allowance() {
        let c = contract(dec!(4200.00), dec!(350.50));
        let salary = PayrollService::calculate(&c);
        assert_eq!(salary.gross, dec!(4550.50));
        assert_eq!(salary.deduct, Decimal::ZERO);
        assert_eq!(salary.net, dec!(4550.50));
        assert_eq!(salary.staff_id, c.staff_id);
    }

    #[test]
    fn net_subtracts_deductions() {
        assert_eq!(PayrollService::net(dec!(1000), dec!(125.25)).unwrap(), dec!(874.75));
        assert_eq!(PayrollService::net(dec!(1000), dec!(1000)).unwrap(), dec!(0));
    }

    #[test]
    fn deductions_above_gross_are_rejected() {
        assert!(matches!(
            PayrollService::net(dec!(100), dec!(100.01)),
            Err(AppError::Validation(_))
        ));
        assert!(PayrollService::net(dec!(-1), dec!(0)).is_err());
    }

    #[test]
    fn month_bounds() {
        assert_eq!(month_start(day(2025, 2, 17)), day(2025, 2, 1));
        assert_eq!(month_end(day(2025, 2, 17)), day(2025, 2, 28));
        assert_eq!(month_end(day(2024, 2, 1)), day(2024, 2, 29));
        assert_eq!(month_end(day(2025, 12, 31)), day(2025, 12, 31));
    }

    #[test]
    fn contract_in_force_covers_partial_months() {
        let march = day(2025, 3, 1);
        // Starts mid-month.
        assert!(PayrollService::in_force(day(2025, 3, 20), None, march));
        // Starts next month.
        assert!(!PayrollService::in_force(day(2025, 4, 1), None, march));
        // Ended on the first of the month.
        assert!(PayrollService::in_force(day(2024, 1, 1), Some(day(2025, 3, 1)), march));
        // Ended the month before.
        assert!(!PayrollService::in_force(day(2024, 1, 1), Some(day(2025, 2, 28)), march));
    }
}

// src/services/reports.rs
//
// Report parameter validation and the builders that aggregate school data
// into a `ReportTable`. Rendering and storage live elsewhere.

use crate::{
    errors::{AppError, AppResult},
    models::{
        finance::{InvoiceStatus, LedgerSource},
        hr::StaffRole,
        reporting::ReportType,
    },
    policy::Resource,
    services::documents::{self, Cell, DocumentFormat, ReportTable},
};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

// ─── Parameters ──────────────────────────────────────────────────────────────

/// Request parameters as they travel in JSON. Which fields apply depends on the report type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_ahead: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<i32>,
    /// `YYYY-MM` or any date inside the month.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportParams {
    Range(DateRange),
    OptionalRange(Option<DateRange>),
    AsOf(NaiveDate),
    DaysAhead(i64),
    Threshold(Option<i32>),
    Month(NaiveDate),
    Nothing,
}

pub const DEFAULT_DAYS_AHEAD: i64 = 30;

fn bad(msg: impl Into<String>) -> AppError {
    AppError::BadRequest(msg.into())
}

pub fn parse_month(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();
    let candidate = if raw.len() == 7 {
        format!("{raw}-01")
    } else {
        raw.to_string()
    };
    NaiveDate::parse_from_str(&candidate, "%Y-%m-%d")
        .map(crate::services::payroll::month_start)
        .map_err(|_| bad(format!("month must be YYYY-MM, got {raw:?}")))
}

fn range(raw: &RawParams, required: bool) -> AppResult<Option<DateRange>> {
    match (raw.start, raw.end) {
        (Some(start), Some(end)) if start <= end => Ok(Some(DateRange { start, end })),
        (Some(_), Some(_)) => Err(bad("start must not be after end")),
        (None, None) if !required => Ok(None),
        _ => Err(bad("start and end dates are required (YYYY-MM-DD)")),
    }
}

/// Validate `value` for `kind`, filling defaults relative to `today`.
pub fn parse_params(kind: ReportType, value: &Value, today: NaiveDate) -> AppResult<ReportParams> {
    let raw: RawParams = match value {
        Value::Null => RawParams::default(),
        Value::Object(_) => serde_json::from_value(value.clone())
            .map_err(|e| bad(format!("invalid report parameters: {e}")))?,
        _ => return Err(bad("report parameters must be a JSON object")),
    };

    let params = match kind {
        ReportType::Pnl | ReportType::Cash => ReportParams::Range(
            range(&raw, true)?.ok_or_else(|| bad("start and end dates are required"))?,
        ),
        ReportType::StudentFees => ReportParams::OptionalRange(range(&raw, false)?),
        ReportType::Bs => ReportParams::AsOf(raw.as_of.unwrap_or(today)),
        ReportType::DocExp => {
            let days = raw.days_ahead.unwrap_or(DEFAULT_DAYS_AHEAD);
            if !(0..=3650).contains(&days) {
                return Err(bad("days_ahead must be between 0 and 3650"));
            }
            ReportParams::DaysAhead(days)
        }
        ReportType::LowStockPdf => {
            if raw.threshold.is_some_and(|t| t < 0) {
                return Err(bad("threshold cannot be negative"));
            }
            ReportParams::Threshold(raw.threshold)
        }
        ReportType::PayrollVsAtt => ReportParams::Month(match raw.month.as_deref() {
            Some(m) => parse_month(m)?,
            None => crate::services::payroll::month_start(today),
        }),
        ReportType::LowStock
        | ReportType::EnrollSummary
        | ReportType::ArAging
        | ReportType::InvValuation
        | ReportType::StudentDocs => ReportParams::Nothing,
    };
    Ok(params)
}

impl ReportParams {
    /// The JSON stored on the job: the resolved values, defaults included.
    pub fn to_json(&self) -> Value {
        let mut raw = RawParams::default();
        match self {
            ReportParams::Range(r) | ReportParams::OptionalRange(Some(r)) => {
                raw.start = Some(r.start);
                raw.end = Some(r.end);
            }
            ReportParams::AsOf(d) => raw.as_of = Some(*d),
            ReportParams::DaysAhead(n) => raw.days_ahead = Some(*n),
            ReportParams::Threshold(t) => raw.threshold = *t,
            ReportParams::Month(m) => raw.month = Some(m.format("%Y-%m").to_string()),
            ReportParams::OptionalRange(None) | ReportParams::Nothing => {}
        }
        serde_json::to_value(raw).unwrap_or(Value::Object(Default::default()))
    }
}

// ─── Catalogue ───────────────────────────────────────────────────────────────

pub fn format_of(kind: ReportType) -> DocumentFormat {
    match kind {
        ReportType::LowStock
        | ReportType::DocExp
        | ReportType::InvValuation
        | ReportType::PayrollVsAtt => DocumentFormat::Xlsx,
        _ => DocumentFormat::Pdf,
    }
}

/// Modules a report reads from; the requester needs READ on each.
pub fn sources_of(kind: ReportType) -> &'static [Resource] {
    match kind {
        ReportType::Pnl
        | ReportType::Bs
        | ReportType::Cash
        | ReportType::StudentFees
        | ReportType::ArAging => &[Resource::Finance],
        ReportType::LowStock | ReportType::LowStockPdf | ReportType::InvValuation => {
            &[Resource::Inventory]
        }
        ReportType::DocExp => &[Resource::Students, Resource::Staff],
        ReportType::EnrollSummary | ReportType::StudentDocs => &[Resource::Students],
        ReportType::PayrollVsAtt => &[Resource::Payroll],
    }
}

pub fn file_name(kind: ReportType, params: &ReportParams) -> String {
    let stem = match (kind, params) {
        (ReportType::Pnl, ReportParams::Range(r)) => format!("pnl_{}_{}", r.start, r.end),
        (ReportType::Cash, ReportParams::Range(r)) => format!("cash_{}_{}", r.start, r.end),
        (ReportType::Bs, ReportParams::AsOf(d)) => format!("balance_sheet_{d}"),
        (ReportType::StudentFees, ReportParams::OptionalRange(Some(r))) => {
            format!("student_fees_{}_{}", r.start, r.end)
        }
        (ReportType::StudentFees, _) => "student_fees_all".to_string(),
        (ReportType::DocExp, ReportParams::DaysAhead(n)) => format!("expiring_docs_{n}d"),
        (ReportType::PayrollVsAtt, ReportParams::Month(m)) => {
            format!("payroll_vs_attendance_{}", m.format("%Y-%m"))
        }
        (ReportType::LowStock, _) | (ReportType::LowStockPdf, _) => "low_stock".to_string(),
        (ReportType::EnrollSummary, _) => "enrollment_summary".to_string(),
        (ReportType::ArAging, _) => "ar_aging".to_string(),
        (ReportType::InvValuation, _) => "inventory_valuation".to_string(),
        (ReportType::StudentDocs, _) => "student_documents".to_string(),
        _ => format!("{kind:?}").to_lowercase(),
    };
    format!("{stem}.{}", format_of(kind).extension())
}

/// A built report ready to render.
#[derive(Debug, Clone)]
pub struct BuiltReport {
    pub table: ReportTable,
    pub file_name: String,
    pub format: DocumentFormat,
}

impl BuiltReport {
    pub fn render(&self) -> AppResult<Vec<u8>> {
        documents::render(&self.table, self.format)
    }
}

/// Build the report. `Ok(None)` means there was no data to report on.
pub async fn build(
    pool: &PgPool,
    school_id: Uuid,
    kind: ReportType,
    params: &ReportParams,
    today: NaiveDate,
) -> AppResult<Option<BuiltReport>> {
    let table = match (kind, params) {
        (ReportType::Pnl, ReportParams::Range(r)) => Some(profit_and_loss(pool, school_id, r).await?),
        (ReportType::Bs, ReportParams::AsOf(d)) => Some(balance_sheet(pool, school_id, *d).await?),
        (ReportType::Cash, ReportParams::Range(r)) => Some(cash_flow(pool, school_id, r).await?),
        (ReportType::LowStock, _) => low_stock(pool, school_id, None).await?,
        (ReportType::LowStockPdf, ReportParams::Threshold(t)) => {
            low_stock(pool, school_id, *t).await?
        }
        (ReportType::DocExp, ReportParams::DaysAhead(n)) => {
            expiring_documents(pool, school_id, today, *n).await?
        }
        (ReportType::StudentFees, ReportParams::OptionalRange(r)) => {
            student_fees(pool, school_id, r.as_ref()).await?
        }
        (ReportType::EnrollSummary, _) => enrollment_summary(pool, school_id).await?,
        (ReportType::StudentDocs, _) => student_documents(pool, school_id).await?,
        (ReportType::ArAging, _) => ar_aging(pool, school_id, today).await?,
        (ReportType::InvValuation, _) => inventory_valuation(pool, school_id).await?,
        (ReportType::PayrollVsAtt, ReportParams::Month(m)) => {
            payroll_vs_attendance(pool, school_id, *m).await?
        }
        (kind, params) => {
            return Err(AppError::Report(format!(
                "parameters {params:?} do not fit report {kind:?}"
            )));
        }
    };

    Ok(table.map(|table| BuiltReport {
        table,
        file_name: file_name(kind, params),
        format: format_of(kind),
    }))
}

// ─── Finance ─────────────────────────────────────────────────────────────────

async fn profit_and_loss(pool: &PgPool, school_id: Uuid, r: &DateRange) -> AppResult<ReportTable> {
    let rows = sqlx::query_as::<_, (NaiveDate, String, String, LedgerSource, Decimal, bool)>(
        r#"SELECT date, reference, description, source_kind, amount, is_inflow
           FROM treasury_transactions
           WHERE school_id = $1 AND date BETWEEN $2 AND $3 AND source_kind <> 'opening'
           ORDER BY date, created_at"#,
    )
    .bind(school_id)
    .bind(r.start)
    .bind(r.end)
    .fetch_all(pool)
    .await?;

    let mut table = ReportTable::new(
        "Profit and Loss",
        &["Date", "Reference", "Description", "Source", "Income", "Expense"],
    )
    .subtitle(format!("Period {} to {}", r.start, r.end));

    let mut revenue = Decimal::ZERO;
    let mut expense = Decimal::ZERO;
    for (date, reference, description, source, amount, inflow) in rows {
        if inflow {
            revenue += amount;
        } else {
            expense += amount;
        }
        table.push_row(vec![
            Cell::Date(date),
            Cell::text(reference),
            Cell::text(description),
            Cell::text(format!("{source:?}")),
            if inflow { Cell::Money(amount) } else { Cell::Empty },
            if inflow { Cell::Empty } else { Cell::Money(amount) },
        ]);
    }

    table.push_total("Revenue", Cell::Money(revenue));
    table.push_total("Expenses", Cell::Money(expense));
    table.push_total("Profit", Cell::Money(revenue - expense));
    Ok(table)
}

async fn balance_sheet(pool: &PgPool, school_id: Uuid, as_of: NaiveDate) -> AppResult<ReportTable> {
    let treasuries = sqlx::query_as::<_, (String, Decimal, Decimal)>(
        r#"SELECT t.name,
                  COALESCE(SUM(x.amount) FILTER (WHERE x.is_inflow AND x.date <= $2), 0),
                  COALESCE(SUM(x.amount) FILTER (WHERE NOT x.is_inflow AND x.date <= $2), 0)
           FROM treasuries t
           LEFT JOIN treasury_transactions x ON x.treasury_id = t.id
           WHERE t.school_id = $1
           GROUP BY t.id, t.name
           ORDER BY t.name"#,
    )
    .bind(school_id)
    .bind(as_of)
    .fetch_all(pool)
    .await?;

    let mut table = ReportTable::new("Balance Sheet", &["Treasury", "Inflows", "Outflows", "Balance"])
        .subtitle(format!("As of {as_of}"));

    let (mut assets, mut debts) = (Decimal::ZERO, Decimal::ZERO);
    for (name, inflows, outflows) in treasuries {
        assets += inflows;
        debts += outflows;
        table.push_row(vec![
            Cell::text(name),
            Cell::Money(inflows),
            Cell::Money(outflows),
            Cell::Money(inflows - outflows),
        ]);
    }

    table.push_total("Assets", Cell::Money(assets));
    table.push_total("Debts", Cell::Money(debts));
    table.push_total("Equity", Cell::Money(assets - debts));
    Ok(table)
}

async fn cash_flow(pool: &PgPool, school_id: Uuid, r: &DateRange) -> AppResult<ReportTable> {
    let months = sqlx::query_as::<_, (NaiveDate, Decimal, Decimal)>(
        r#"SELECT date_trunc('month', date)::date AS month,
                  COALESCE(SUM(amount) FILTER (WHERE is_inflow), 0),
                  COALESCE(SUM(amount) FILTER (WHERE NOT is_inflow), 0)
           FROM treasury_transactions
           WHERE school_id = $1 AND date BETWEEN $2 AND $3
           GROUP BY 1
           ORDER BY 1"#,
    )
    .bind(school_id)
    .bind(r.start)
    .bind(r.end)
    .fetch_all(pool)
    .await?;

    let mut table = ReportTable::new("Cash Flow", &["Month", "Cash in", "Cash out", "Net"])
        .subtitle(format!("Period {} to {}", r.start, r.end));

    let (mut total_in, mut total_out) = (Decimal::ZERO, Decimal::ZERO);
    for (month, cash_in, cash_out) in months {
        total_in += cash_in;
        total_out += cash_out;
        table.push_row(vec![
            Cell::text(month.format("%Y-%m").to_string()),
            Cell::Money(cash_in),
            Cell::Money(cash_out),
            Cell::Money(cash_in - cash_out),
        ]);
    }

    table.push_total("Total in", Cell::Money(total_in));
    table.push_total("Total out", Cell::Money(total_out));
    table.push_total("Net", Cell::Money(total_in - total_out));
    Ok(table)
}

/// Aging bucket for an invoice `days` past its due date: 0-30, 31-60, 61-90, 90+.
pub fn aging_bucket(days: i64) -> usize {
    match days {
        ..=30 => 0,
        31..=60 => 1,
        61..=90 => 2,
        _ => 3,
    }
}

async fn ar_aging(pool: &PgPool, school_id: Uuid, today: NaiveDate) -> AppResult<Option<ReportTable>> {
    let invoices = sqlx::query_as::<_, (String, String, NaiveDate, Decimal, Decimal, InvoiceStatus)>(
        r#"SELECT i.invoice_number, s.first_name || ' ' || s.last_name, i.due_date,
                  i.amount, i.amount_paid, i.status
           FROM invoices i
           JOIN students s ON s.id = i.student_id
           WHERE i.school_id = $1 AND i.amount > i.amount_paid AND i.status <> 'draft'
           ORDER BY i.due_date, i.invoice_number"#,
    )
    .bind(school_id)
    .fetch_all(pool)
    .await?;

    if invoices.is_empty() {
        return Ok(None);
    }

    let mut table = ReportTable::new(
        "Accounts Receivable Aging",
        &["Invoice", "Student", "Due", "Total", "Paid", "Balance", "0-30", "31-60", "61-90", "90+"],
    )
    .subtitle(format!("As of {today}"));

    let mut buckets = [Decimal::ZERO; 4];
    let mut outstanding = Decimal::ZERO;
    for (number, student, due, amount, paid, _status) in invoices {
        let balance = amount - paid;
        let bucket = aging_bucket((today - due).num_days());
        buckets[bucket] += balance;
        outstanding += balance;

        let mut row = vec![
            Cell::text(number),
            Cell::text(student),
            Cell::Date(due),
            Cell::Money(amount),
            Cell::Money(paid),
            Cell::Money(balance),
        ];
        row.extend((0..4).map(|i| {
            if i == bucket {
                Cell::Money(balance)
            } else {
                Cell::Empty
            }
        }));
        table.push_row(row);
    }

    table.push_total("Outstanding", Cell::Money(outstanding));
    for (label, amount) in ["0-30 days", "31-60 days", "61-90 days", "Over 90 days"]
        .iter()
        .zip(buckets)
    {
        table.push_total(*label, Cell::Money(amount));
    }
    Ok(Some(table))
}

async fn student_fees(
    pool: &PgPool,
    school_id: Uuid,
    r: Option<&DateRange>,
) -> AppResult<Option<ReportTable>> {
    let rows = sqlx::query_as::<_, (String, String, Decimal, Decimal)>(
        r#"SELECT s.first_name || ' ' || s.last_name, COALESCE(c.name, ''),
                  SUM(i.amount), SUM(i.amount_paid)
           FROM invoices i
           JOIN students s ON s.id = i.student_id
           LEFT JOIN classrooms c ON c.id = s.classroom_id
           WHERE i.school_id = $1
             AND ($2::date IS NULL OR i.issue_date >= $2)
             AND ($3::date IS NULL OR i.issue_date <= $3)
           GROUP BY s.id, s.first_name, s.last_name, c.name
           ORDER BY 1"#,
    )
    .bind(school_id)
    .bind(r.map(|r| r.start))
    .bind(r.map(|r| r.end))
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let period = match r {
        Some(r) => format!("Invoices issued {} to {}", r.start, r.end),
        None => "All invoices".to_string(),
    };
    let mut table = ReportTable::new(
        "Student Fees Status",
        &["Student", "Class", "Billed", "Paid", "Balance", "Status"],
    )
    .subtitle(period);

    let (mut billed, mut paid) = (Decimal::ZERO, Decimal::ZERO);
    let (mut paid_count, mut unpaid_count) = (0i64, 0i64);
    for (student, class, student_billed, student_paid) in rows {
        let balance = student_billed - student_paid;
        let settled = balance <= Decimal::ZERO;
        if settled {
            paid_count += 1;
        } else {
            unpaid_count += 1;
        }
        billed += student_billed;
        paid += student_paid;
        table.push_row(vec![
            Cell::text(student),
            Cell::text(class),
            Cell::Money(student_billed),
            Cell::Money(student_paid),
            Cell::Money(balance),
            Cell::text(if settled { "PAID" } else { "UNPAID" }),
        ]);
    }

    table.push_total("Billed", Cell::Money(billed));
    table.push_total("Paid", Cell::Money(paid));
    table.push_total("Balance", Cell::Money(billed - paid));
    table.push_total("Students paid up", Cell::Int(paid_count));
    table.push_total("Students owing", Cell::Int(unpaid_count));
    Ok(Some(table))
}

// ─── Students and HR ─────────────────────────────────────────────────────────

async fn enrollment_summary(pool: &PgPool, school_id: Uuid) -> AppResult<Option<ReportTable>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"SELECT COALESCE(c.name, 'Unassigned'), COUNT(s.id)
           FROM students s
           LEFT JOIN classrooms c ON c.id = s.classroom_id
           WHERE s.school_id = $1 AND s.is_active
           GROUP BY c.name
           ORDER BY 1"#,
    )
    .bind(school_id)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut table = ReportTable::new("Enrollment Summary", &["Class", "Students"]);
    let total: i64 = rows.iter().map(|(_, n)| n).sum();
    for (class, count) in rows {
        table.push_row(vec![Cell::text(class), Cell::Int(count)]);
    }
    table.push_total("Total students", Cell::Int(total));
    Ok(Some(table))
}

type StudentDocumentRow = (Uuid, String, String, NaiveDate, Option<NaiveDate>, String);

/// One row per document; the student's name appears only on their first row.
fn student_document_rows(rows: Vec<StudentDocumentRow>) -> Vec<Vec<Cell>> {
    let mut previous = None;
    rows.into_iter()
        .map(|(student_id, name, doc_type, issued, expires, notes)| {
            let owner = if previous == Some(student_id) {
                Cell::Empty
            } else {
                Cell::text(name)
            };
            previous = Some(student_id);
            vec![
                owner,
                Cell::text(doc_type.to_uppercase()),
                Cell::Date(issued),
                expires.map(Cell::Date).unwrap_or(Cell::Empty),
                Cell::text(notes),
            ]
        })
        .collect()
}

async fn student_documents(pool: &PgPool, school_id: Uuid) -> AppResult<Option<ReportTable>> {
    let rows = sqlx::query_as::<_, StudentDocumentRow>(
        r#"SELECT s.id, s.first_name || ' ' || s.last_name, d.doc_type::text,
                  d.issue_date, d.expiration_date, d.notes
           FROM student_documents d
           JOIN students s ON s.id = d.student_id
           WHERE d.school_id = $1
           ORDER BY s.last_name, s.first_name, s.id, d.expiration_date NULLS LAST"#,
    )
    .bind(school_id)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut table = ReportTable::new(
        "Student Documents",
        &["Student", "Document", "Issued", "Expires", "Notes"],
    );
    for row in student_document_rows(rows) {
        table.push_row(row);
    }
    Ok(Some(table))
}

/// Student and staff documents that expire within `days_ahead` days (or already have).
async fn expiring_documents(
    pool: &PgPool,
    school_id: Uuid,
    today: NaiveDate,
    days_ahead: i64,
) -> AppResult<Option<ReportTable>> {
    let cutoff = today + Duration::days(days_ahead);
    let rows = sqlx::query_as::<_, (String, String, String, NaiveDate)>(
        r#"SELECT s.first_name || ' ' || s.last_name, 'Student', d.doc_type::text, d.expiration_date
           FROM student_documents d
           JOIN students s ON s.id = d.student_id
           WHERE d.school_id = $1 AND d.expiration_date <= $2
           UNION ALL
           SELECT s.first_name || ' ' || s.last_name, 'Staff', d.doc_type::text, d.expiration_date
           FROM staff_documents d
           JOIN staff s ON s.id = d.staff_id
           WHERE d.school_id = $1 AND d.expiration_date <= $2
           ORDER BY 4, 1"#,
    )
    .bind(school_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut table = ReportTable::new("Expiring Documents", &["Owner", "Type", "Document", "Expires On"])
        .subtitle(format!("Expiring on or before {cutoff}"));
    for (owner, kind, doc_type, expires) in rows {
        table.push_row(vec![
            Cell::text(owner),
            Cell::text(kind),
            Cell::text(doc_type.to_uppercase()),
            Cell::Date(expires),
        ]);
    }
    Ok(Some(table))
}

type PayrollAttendanceRow = (
    String,
    StaffRole,
    Option<Decimal>,
    Option<Decimal>,
    Option<bool>,
    i64,
    i64,
    i64,
    i64,
);

async fn payroll_vs_attendance(
    pool: &PgPool,
    school_id: Uuid,
    month: NaiveDate,
) -> AppResult<Option<ReportTable>> {
    let rows = sqlx::query_as::<_, PayrollAttendanceRow>(
        r#"SELECT s.first_name || ' ' || s.last_name, s.role, r.gross, r.net, r.paid,
                  COUNT(a.id) FILTER (WHERE a.status = 'present'),
                  COUNT(a.id) FILTER (WHERE a.status = 'absent'),
                  COUNT(a.id) FILTER (WHERE a.status = 'sick'),
                  COUNT(a.id) FILTER (WHERE a.status = 'leave')
           FROM staff s
           LEFT JOIN salary_records r ON r.staff_id = s.id AND r.month = $2
           LEFT JOIN staff_attendance a ON a.staff_id = s.id AND a.date BETWEEN $2 AND $3
           WHERE s.school_id = $1 AND s.is_active
           GROUP BY s.id, s.first_name, s.last_name, s.role, r.gross, r.net, r.paid
           ORDER BY 1"#,
    )
    .bind(school_id)
    .bind(month)
    .bind(crate::services::payroll::month_end(month))
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let mut table = ReportTable::new(
        "Payroll vs Attendance",
        &["Staff", "Role", "Gross", "Net", "Paid", "Present", "Absent", "Sick", "Leave"],
    )
    .subtitle(format!("Month {}", month.format("%Y-%m")));

    let mut total_net = Decimal::ZERO;
    for (name, role, gross, net, paid, present, absent, sick, leave) in rows {
        total_net += net.unwrap_or_default();
        table.push_row(vec![
            Cell::text(name),
            Cell::text(format!("{role:?}").to_uppercase()),
            gross.map(Cell::Money).unwrap_or(Cell::Empty),
            net.map(Cell::Money).unwrap_or(Cell::Empty),
            Cell::text(match paid {
                Some(true) => "YES",
                Some(false) => "NO",
                None => "NO RECORD",
            }),
            Cell::Int(present),
            Cell::Int(absent),
            Cell::Int(sick),
            Cell::Int(leave),
        ]);
    }
    table.push_total("Total net", Cell::Money(total_net));
    Ok(Some(table))
}

// ─── Inventory ───────────────────────────────────────────────────────────────

async fn low_stock(
    pool: &PgPool,
    school_id: Uuid,
    threshold: Option<i32>,
) -> AppResult<Option<ReportTable>> {
    let items = sqlx::query_as::<_, (String, String, i32, i32, String)>(
        r#"SELECT i.name, i.sku, i.quantity, i.reorder_level, COALESCE(v.name, '')
           FROM items i
           LEFT JOIN vendors v ON v.id = i.vendor_id
           WHERE i.school_id = $1 AND i.quantity <= COALESCE($2::int, i.reorder_level)
           ORDER BY i.quantity, i.name"#,
    )
    .bind(school_id)
    .bind(threshold)
    .fetch_all(pool)
    .await?;

    if items.is_empty() {
        return Ok(None);
    }

    let mut table = ReportTable::new("Low Stock", &["Item", "SKU", "Quantity", "Reorder level", "Vendor"]);
    if let Some(t) = threshold {
        table = table.subtitle(format!("Quantity at or below {t}"));
    }
    for (name, sku, quantity, reorder, vendor) in items {
        table.push_row(vec![
            Cell::text(name),
            Cell::text(sku),
            Cell::Int(quantity.into()),
            Cell::Int(reorder.into()),
            Cell::text(vendor),
        ]);
    }
    Ok(Some(table))
}

async fn inventory_valuation(pool: &PgPool, school_id: Uuid) -> AppResult<Option<ReportTable>> {
    let items = sqlx::query_as::<_, (String, String, i32, Decimal)>(
        "SELECT sku, name, quantity, unit_price FROM items WHERE school_id = $1 ORDER BY name",
    )
    .bind(school_id)
    .fetch_all(pool)
    .await?;

    if items.is_empty() {
        return Ok(None);
    }

    let mut table = ReportTable::new("Inventory Valuation", &["SKU", "Item", "Quantity", "Unit cost", "Value"]);
    let mut total = Decimal::ZERO;
    for (sku, name, quantity, unit_price) in items {
        let value = unit_price * Decimal::from(quantity);
        total += value;
        table.push_row(vec![
            Cell::text(sku),
            Cell::text(name),
            Cell::Int(quantity.into()),
            Cell::Money(unit_price),
            Cell::Money(value),
        ]);
    }
    table.push_total("Total value", Cell::Money(total));
    Ok(Some(table))
}

// ─── On-demand documents ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl RenderedDocument {
    fn pdf(file_name: String, table: &ReportTable) -> AppResult<Self> {
        Ok(Self {
            file_name,
            content_type: DocumentFormat::Pdf.content_type(),
            bytes: documents::pdf::render(table)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InvoiceHeader {
    invoice_number: String,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    description: String,
    amount: Decimal,
    amount_paid: Decimal,
    status: InvoiceStatus,
    student_name: String,
    guardian_name: String,
    school_name: String,
}

async fn invoice_header(pool: &PgPool, school_id: Uuid, invoice_id: Uuid) -> AppResult<InvoiceHeader> {
    sqlx::query_as::<_, InvoiceHeader>(
        r#"SELECT i.invoice_number, i.issue_date, i.due_date, i.description, i.amount,
                  i.amount_paid, i.status,
                  s.first_name || ' ' || s.last_name AS student_name,
                  s.guardian_name, sc.name AS school_name
           FROM invoices i
           JOIN students s ON s.id = i.student_id
           JOIN schools sc ON sc.id = i.school_id
           WHERE i.id = $1 AND i.school_id = $2"#,
    )
    .bind(invoice_id)
    .bind(school_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Invoice {invoice_id} not found")))
}

pub fn invoice_table(h: &InvoiceHeaderView<'_>) -> ReportTable {
    let mut table = ReportTable::new(format!("Invoice {}", h.invoice_number), &["Description", "Amount"])
        .subtitle(h.school_name.to_string())
        .subtitle(format!("Student: {} (guardian {})", h.student_name, h.guardian_name))
        .subtitle(format!("Issued {} / due {}", h.issue_date, h.due_date))
        .subtitle(format!("Status: {:?}", h.status).to_uppercase());
    let description = if h.description.trim().is_empty() {
        "Tuition"
    } else {
        h.description
    };
    table.push_row(vec![Cell::text(description), Cell::Money(h.amount)]);
    table.push_total("Amount", Cell::Money(h.amount));
    table.push_total("Paid", Cell::Money(h.amount_paid));
    table.push_total(
        "Balance due",
        Cell::Money((h.amount - h.amount_paid).max(Decimal::ZERO)),
    );
    table
}

/// Borrowed view of the fields printed on an invoice.
pub struct InvoiceHeaderView<'a> {
    pub invoice_number: &'a str,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub description: &'a str,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub status: InvoiceStatus,
    pub student_name: &'a str,
    pub guardian_name: &'a str,
    pub school_name: &'a str,
}

impl InvoiceHeader {
    fn view(&self) -> InvoiceHeaderView<'_> {
        InvoiceHeaderView {
            invoice_number: &self.invoice_number,
            issue_date: self.issue_date,
            due_date: self.due_date,
            description: &self.description,
            amount: self.amount,
            amount_paid: self.amount_paid,
            status: self.status,
            student_name: &self.student_name,
            guardian_name: &self.guardian_name,
            school_name: &self.school_name,
        }
    }
}

pub async fn invoice_document(
    pool: &PgPool,
    school_id: Uuid,
    invoice_id: Uuid,
) -> AppResult<RenderedDocument> {
    let header = invoice_header(pool, school_id, invoice_id).await?;
    let table = invoice_table(&header.view());
    RenderedDocument::pdf(format!("{}.pdf", header.invoice_number), &table)
}

pub async fn receipt_document(
    pool: &PgPool,
    school_id: Uuid,
    payment_id: Uuid,
) -> AppResult<RenderedDocument> {
    let (invoice_id, date, reference, amount, treasury) =
        sqlx::query_as::<_, (Uuid, NaiveDate, String, Decimal, String)>(
            r#"SELECT p.invoice_id, p.date, p.reference, p.amount, t.name
               FROM payments p
               JOIN treasuries t ON t.id = p.treasury_id
               WHERE p.id = $1 AND p.school_id = $2"#,
        )
        .bind(payment_id)
        .bind(school_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment {payment_id} not found")))?;

    let header = invoice_header(pool, school_id, invoice_id).await?;

    let mut table = ReportTable::new(
        format!("Payment Receipt {}", header.invoice_number),
        &["Invoice", "Date", "Reference", "Received into", "Amount"],
    )
    .subtitle(header.school_name.clone())
    .subtitle(format!("Received from {} for {}", header.guardian_name, header.student_name));
    table.push_row(vec![
        Cell::text(&header.invoice_number),
        Cell::Date(date),
        Cell::text(reference),
        Cell::text(treasury),
        Cell::Money(amount),
    ]);
    table.push_total("Amount received", Cell::Money(amount));
    table.push_total("Invoice total", Cell::Money(header.amount));
    table.push_total(
        "Remaining balance",
        Cell::Money((header.amount - header.amount_paid).max(Decimal::ZERO)),
    );

    let short_id = payment_id.simple().to_string();
    RenderedDocument::pdf(
        format!("receipt_{}_{}.pdf", header.invoice_number, &short_id[..8]),
        &table,
    )
}

pub async fn purchase_order_document(
    pool: &PgPool,
    school_id: Uuid,
    po_id: Uuid,
) -> AppResult<RenderedDocument> {
    type PoRow = (String, NaiveDate, i32, Decimal, bool, String, String, String, String);
    let (po_number, order_date, quantity, unit_price, received, vendor, vendor_email, item, sku) =
        sqlx::query_as::<_, PoRow>(
            r#"SELECT po.po_number, po.order_date, po.quantity, po.unit_price, po.received,
                      v.name, v.contact_email, i.name, i.sku
               FROM purchase_orders po
               JOIN vendors v ON v.id = po.vendor_id
               JOIN items i ON i.id = po.item_id
               WHERE po.id = $1 AND po.school_id = $2"#,
        )
        .bind(po_id)
        .bind(school_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Purchase order {po_id} not found")))?;

    let total = unit_price * Decimal::from(quantity);
    let mut table = ReportTable::new(
        format!("Purchase Order {po_number}"),
        &["Item", "SKU", "Quantity", "Unit price", "Total"],
    )
    .subtitle(format!("Vendor: {vendor} {vendor_email}").trim().to_string())
    .subtitle(format!("Ordered {order_date}"))
    .subtitle(if received { "Status: RECEIVED" } else { "Status: OPEN" });
    table.push_row(vec![
        Cell::text(item),
        Cell::text(sku),
        Cell::Int(quantity.into()),
        Cell::Money(unit_price),
        Cell::Money(total),
    ]);
    table.push_total("Total", Cell::Money(total));

    RenderedDocument::pdf(format!("{po_number}.pdf"), &table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ranged_reports_require_both_dates() {
        let today = day(2025, 5, 1);
        assert!(parse_params(ReportType::Pnl, &json!({}), today).is_err());
        assert!(parse_params(ReportType::Cash, &json!({"start": "2025-01-01"}), today).is_err());
        assert!(
            parse_params(
                ReportType::Pnl,
                &json!({"start": "2025-02-01", "end": "2025-01-01"}),
                today
            )
            .is_err()
        );
        assert_eq!(
            parse_params(
                ReportType::Pnl,
                &json!({"start": "2025-01-01", "end": "2025-03-31"}),
                today
            )
            .unwrap(),
            ReportParams::Range(DateRange {
                start: day(2025, 1, 1),
                end: day(2025, 3, 31)
            })
        );
    }

    #[test]
    fn malformed_dates_are_bad_requests() {
        let err = parse_params(
            ReportType::Pnl,
            &json!({"start": "01/02/2025", "end": "2025-03-31"}),
            day(2025, 5, 1),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(parse_params(ReportType::Bs, &json!([1, 2]), day(2025, 5, 1)).is_err());
    }

    #[test]
    fn defaults_are_filled_from_today() {
        let today = day(2025, 5, 17);
        assert_eq!(
            parse_params(ReportType::Bs, &Value::Null, today).unwrap(),
            ReportParams::AsOf(today)
        );
        assert_eq!(
            parse_params(ReportType::DocExp, &json!({}), today).unwrap(),
            ReportParams::DaysAhead(30)
        );
        assert_eq!(
            parse_params(ReportType::PayrollVsAtt, &json!({}), today).unwrap(),
            ReportParams::Month(day(2025, 5, 1))
        );
        assert_eq!(
            parse_params(ReportType::StudentFees, &json!({}), today).unwrap(),
            ReportParams::OptionalRange(None)
        );
    }

    #[test]
    fn month_accepts_short_and_full_forms() {
        assert_eq!(parse_month("2025-02").unwrap(), day(2025, 2, 1));
        assert_eq!(parse_month("2025-02-14").unwrap(), day(2025, 2, 1));
        assert!(parse_month("Feb 2025").is_err());
    }

    #[test]
    fn normalized_parameters_round_trip_through_the_job_row() {
        let today = day(2025, 5, 17);
        let params = parse_params(ReportType::Bs, &json!({}), today).unwrap();
        let stored = params.to_json();
        assert_eq!(stored, json!({"as_of": "2025-05-17"}));
        assert_eq!(parse_params(ReportType::Bs, &stored, day(2030, 1, 1)).unwrap(), params);
    }

    #[test]
    fn file_names_and_formats() {
        let range = ReportParams::Range(DateRange {
            start: day(2025, 1, 1),
            end: day(2025, 1, 31),
        });
        assert_eq!(file_name(ReportType::Pnl, &range), "pnl_2025-01-01_2025-01-31.pdf");
        assert_eq!(
            file_name(ReportType::DocExp, &ReportParams::DaysAhead(30)),
            "expiring_docs_30d.xlsx"
        );
        assert_eq!(
            file_name(ReportType::PayrollVsAtt, &ReportParams::Month(day(2025, 3, 1))),
            "payroll_vs_attendance_2025-03.xlsx"
        );
        assert_eq!(format_of(ReportType::LowStockPdf), DocumentFormat::Pdf);
        assert_eq!(format_of(ReportType::InvValuation), DocumentFormat::Xlsx);
    }

    #[test]
    fn student_documents_report_is_a_parameterless_pdf() {
        let today = day(2025, 5, 17);
        let params = parse_params(ReportType::StudentDocs, &json!({}), today).unwrap();
        assert_eq!(params, ReportParams::Nothing);
        assert_eq!(file_name(ReportType::StudentDocs, &params), "student_documents.pdf");
        assert_eq!(sources_of(ReportType::StudentDocs), &[Resource::Students]);
    }

    #[test]
    fn student_documents_are_grouped_under_one_name() {
        let (ana, ben) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = student_document_rows(vec![
            (ana, "Ana Ruiz".into(), "passport".into(), day(2020, 1, 1), Some(day(2030, 1, 1)), String::new()),
            (ana, "Ana Ruiz".into(), "vaccine".into(), day(2024, 9, 1), None, "MMR".into()),
            (ben, "Ben Ode".into(), "id".into(), day(2022, 3, 3), None, String::new()),
        ]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], Cell::text("Ana Ruiz"));
        assert_eq!(rows[0][1], Cell::text("PASSPORT"));
        assert_eq!(rows[1][0], Cell::Empty);
        assert_eq!(rows[1][3], Cell::Empty);
        assert_eq!(rows[2][0], Cell::text("Ben Ode"));
    }

    #[test]
    fn report_sources() {
        assert_eq!(sources_of(ReportType::ArAging), &[Resource::Finance]);
        assert_eq!(
            sources_of(ReportType::DocExp),
            &[Resource::Students, Resource::Staff]
        );
    }

    #[test]
    fn aging_buckets() {
        assert_eq!(aging_bucket(-5), 0);
        assert_eq!(aging_bucket(30), 0);
        assert_eq!(aging_bucket(31), 1);
        assert_eq!(aging_bucket(60), 1);
        assert_eq!(aging_bucket(90), 2);
        assert_eq!(aging_bucket(91), 3);
    }

    #[test]
    fn invoice_table_shows_balance_due() {
        let view = InvoiceHeaderView {
            invoice_number: "INV-0007",
            issue_date: day(2025, 3, 1),
            due_date: day(2025, 3, 11),
            description: "",
            amount: dec!(450),
            amount_paid: dec!(200),
            status: InvoiceStatus::Partial,
            student_name: "Lina Haddad",
            guardian_name: "Omar Haddad",
            school_name: "Little Oaks",
        };
        let table = invoice_table(&view);
        assert_eq!(table.title, "Invoice INV-0007");
        assert_eq!(table.rows[0][0], Cell::text("Tuition"));
        assert_eq!(
            table.totals.last(),
            Some(&("Balance due".to_string(), Cell::Money(dec!(250))))
        );
        assert!(table.subtitle.contains(&"STATUS: PARTIAL".to_string()));
    }
}

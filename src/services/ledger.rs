// src/services/ledger.rs
//
// Every finance event that moves money goes through this module. Each event
// writes its own rows plus journal entries, then recomputes the derived state
// (treasury balance, invoice paid/status, salary record paid flag) from the
// source rows while holding row locks in the caller's transaction.

use crate::{
    errors::{AppError, AppResult},
    models::finance::{
        CreateExpenseRequest, CreateInvoiceRequest, CreateManualEntryRequest,
        CreatePaymentRequest, CreateSalaryPaymentRequest, CreateTreasuryRequest, Expense,
        ExpenseCategory, Invoice, InvoiceStatus, LedgerSource, Payment, PurchaseOrder,
        ReceiptOutcome, SalaryPayment, Treasury, TreasuryReconciliation, TreasuryTransaction,
        UpdateInvoiceRequest,
    },
    models::hr::SalaryRecord,
    services::numbering::{self, INVOICE_PREFIX},
};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ─── Pure rules ──────────────────────────────────────────────────────────────

/// The inputs the invoice status depends on.
#[derive(Debug, Clone, Copy)]
pub struct InvoiceBasis {
    pub amount: Decimal,
    pub paid: Decimal,
    pub sent: bool,
    pub due_date: NaiveDate,
}

pub fn derive_invoice_status(basis: &InvoiceBasis, today: NaiveDate) -> InvoiceStatus {
    let status = if basis.paid >= basis.amount {
        InvoiceStatus::Paid
    } else if basis.paid > Decimal::ZERO {
        InvoiceStatus::Partial
    } else if basis.sent {
        InvoiceStatus::Sent
    } else {
        InvoiceStatus::Draft
    };

    match status {
        InvoiceStatus::Sent | InvoiceStatus::Partial if basis.due_date < today => {
            InvoiceStatus::Overdue
        }
        other => other,
    }
}

/// Sum of `(amount, is_inflow)` journal entries; outflows count negative.
pub fn signed_balance<I>(entries: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, bool)>,
{
    entries
        .into_iter()
        .map(|(amount, inflow)| if inflow { amount } else { -amount })
        .sum()
}

/// Money columns are `NUMERIC(12,2)`; finer amounts would be rounded by the store.
fn require_cents(amount: Decimal, what: &str) -> AppResult<()> {
    if amount.normalize().scale() > 2 {
        return Err(AppError::Validation(format!(
            "{what} cannot have more than two decimal places"
        )));
    }
    Ok(())
}

fn require_positive(amount: Decimal, what: &str) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation(format!("{what} must be greater than zero")));
    }
    require_cents(amount, what)
}

// ─── Row access ──────────────────────────────────────────────────────────────

async fn lock_invoice(conn: &mut PgConnection, school_id: Uuid, id: Uuid) -> AppResult<Invoice> {
    sqlx::query_as::<_, Invoice>(
        "SELECT * FROM invoices WHERE id = $1 AND school_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Invoice {id} not found")))
}

async fn lock_treasury(conn: &mut PgConnection, school_id: Uuid, id: Uuid) -> AppResult<Treasury> {
    sqlx::query_as::<_, Treasury>(
        "SELECT * FROM treasuries WHERE id = $1 AND school_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Treasury {id} not found")))
}

async fn ensure_treasury(conn: &mut PgConnection, school_id: Uuid, id: Uuid) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM treasuries WHERE id = $1 AND school_id = $2)",
    )
    .bind(id)
    .bind(school_id)
    .fetch_one(&mut *conn)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Treasury {id} not found")))
    }
}

/// The school's oldest treasury, used when an event does not name one.
pub async fn default_treasury(conn: &mut PgConnection, school_id: Uuid) -> AppResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM treasuries WHERE school_id = $1 ORDER BY created_at, id LIMIT 1",
    )
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::BadRequest("No treasury configured for this school".to_string()))
}

pub async fn fetch_purchase_order(
    conn: &mut PgConnection,
    school_id: Uuid,
    id: Uuid,
) -> AppResult<PurchaseOrder> {
    sqlx::query_as::<_, PurchaseOrder>(
        "SELECT *, unit_price * quantity AS total FROM purchase_orders WHERE id = $1 AND school_id = $2",
    )
    .bind(id)
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Purchase order {id} not found")))
}

// ─── Journal ─────────────────────────────────────────────────────────────────

struct JournalEntry<'a> {
    treasury_id: Uuid,
    source: LedgerSource,
    source_id: Option<Uuid>,
    reference: &'a str,
    description: &'a str,
    amount: Decimal,
    is_inflow: bool,
    date: NaiveDate,
}

async fn post_journal(
    conn: &mut PgConnection,
    school_id: Uuid,
    entry: JournalEntry<'_>,
) -> AppResult<TreasuryTransaction> {
    let row = sqlx::query_as::<_, TreasuryTransaction>(
        r#"INSERT INTO treasury_transactions
            (id, school_id, treasury_id, source_kind, source_id, reference, description,
             amount, is_inflow, date)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(entry.treasury_id)
    .bind(entry.source)
    .bind(entry.source_id)
    .bind(entry.reference)
    .bind(entry.description)
    .bind(entry.amount)
    .bind(entry.is_inflow)
    .bind(entry.date)
    .fetch_one(&mut *conn)
    .await?;

    debug!(
        treasury_id = %row.treasury_id,
        source = ?row.source_kind,
        amount = %row.amount,
        inflow = row.is_inflow,
        "journal entry posted"
    );
    Ok(row)
}

/// Remove the journal rows of one source event; returns the treasuries touched.
async fn remove_journal(
    conn: &mut PgConnection,
    school_id: Uuid,
    source: LedgerSource,
    source_id: Uuid,
) -> AppResult<Vec<Uuid>> {
    let mut treasuries: Vec<Uuid> = sqlx::query_scalar(
        r#"DELETE FROM treasury_transactions
           WHERE school_id = $1 AND source_kind = $2 AND source_id = $3
           RETURNING treasury_id"#,
    )
    .bind(school_id)
    .bind(source)
    .bind(source_id)
    .fetch_all(&mut *conn)
    .await?;

    treasuries.sort();
    treasuries.dedup();
    Ok(treasuries)
}

async fn journal_balance(conn: &mut PgConnection, treasury_id: Uuid) -> AppResult<Decimal> {
    let entries: Vec<(Decimal, bool)> = sqlx::query_as(
        "SELECT amount, is_inflow FROM treasury_transactions WHERE treasury_id = $1",
    )
    .bind(treasury_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(signed_balance(entries))
}

// ─── Recomputation ───────────────────────────────────────────────────────────

/// Lock the treasury and rewrite its balance from the journal.
pub async fn recompute_treasury(
    conn: &mut PgConnection,
    school_id: Uuid,
    treasury_id: Uuid,
) -> AppResult<Treasury> {
    lock_treasury(conn, school_id, treasury_id).await?;
    let balance = journal_balance(conn, treasury_id).await?;

    let treasury = sqlx::query_as::<_, Treasury>(
        "UPDATE treasuries SET balance = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(treasury_id)
    .bind(balance)
    .fetch_one(&mut *conn)
    .await?;

    Ok(treasury)
}

/// Lock the invoice, sum its payments and store `amount_paid` plus the derived status.
pub async fn recompute_invoice(
    conn: &mut PgConnection,
    school_id: Uuid,
    invoice_id: Uuid,
    today: NaiveDate,
) -> AppResult<Invoice> {
    let invoice = lock_invoice(conn, school_id, invoice_id).await?;

    let paid: Decimal =
        sqlx::query_scalar("SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = $1")
            .bind(invoice_id)
            .fetch_one(&mut *conn)
            .await?;

    let status = derive_invoice_status(
        &InvoiceBasis {
            amount: invoice.amount,
            paid,
            sent: invoice.sent_at.is_some(),
            due_date: invoice.due_date,
        },
        today,
    );

    if status != invoice.status {
        debug!(
            invoice = %invoice.invoice_number,
            from = ?invoice.status,
            to = ?status,
            "invoice status changed"
        );
    }

    let invoice = sqlx::query_as::<_, Invoice>(
        r#"UPDATE invoices
           SET amount_paid = $2, status = $3, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(invoice_id)
    .bind(paid)
    .bind(status)
    .fetch_one(&mut *conn)
    .await?;

    Ok(invoice)
}

async fn refresh_salary_paid(conn: &mut PgConnection, salary_record_id: Uuid) -> AppResult<()> {
    sqlx::query(
        r#"UPDATE salary_records
           SET paid = EXISTS(SELECT 1 FROM salary_payments WHERE salary_record_id = $1),
               updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(salary_record_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ─── Treasuries ──────────────────────────────────────────────────────────────

pub async fn create_treasury(
    conn: &mut PgConnection,
    school_id: Uuid,
    req: &CreateTreasuryRequest,
    today: NaiveDate,
) -> AppResult<Treasury> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Treasury name is required".to_string()));
    }
    if req.opening_balance < Decimal::ZERO {
        return Err(AppError::Validation(
            "Opening balance cannot be negative".to_string(),
        ));
    }
    require_cents(req.opening_balance, "Opening balance")?;

    let treasury = sqlx::query_as::<_, Treasury>(
        r#"INSERT INTO treasuries (id, school_id, name, balance)
           VALUES ($1, $2, $3, 0)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(req.name.trim())
    .fetch_one(&mut *conn)
    .await?;

    if req.opening_balance > Decimal::ZERO {
        post_journal(
            conn,
            school_id,
            JournalEntry {
                treasury_id: treasury.id,
                source: LedgerSource::Opening,
                source_id: Some(treasury.id),
                reference: "OPENING",
                description: "Opening balance",
                amount: req.opening_balance,
                is_inflow: true,
                date: today,
            },
        )
        .await?;
    }

    recompute_treasury(conn, school_id, treasury.id).await
}

/// Compare the stored balance with the journal; rewrite it when `correct` is set.
pub async fn reconcile_treasury(
    conn: &mut PgConnection,
    school_id: Uuid,
    treasury_id: Uuid,
    correct: bool,
) -> AppResult<TreasuryReconciliation> {
    let treasury = lock_treasury(conn, school_id, treasury_id).await?;
    let journal = journal_balance(conn, treasury_id).await?;
    let drift = treasury.balance - journal;

    let corrected = correct && !drift.is_zero();
    if corrected {
        warn!(
            treasury_id = %treasury_id,
            stored = %treasury.balance,
            journal = %journal,
            "treasury balance drifted, rewriting from journal"
        );
        recompute_treasury(conn, school_id, treasury_id).await?;
    }

    Ok(TreasuryReconciliation {
        treasury_id,
        stored_balance: treasury.balance,
        journal_balance: journal,
        drift,
        corrected,
    })
}

pub async fn post_manual_entry(
    conn: &mut PgConnection,
    school_id: Uuid,
    req: &CreateManualEntryRequest,
    today: NaiveDate,
) -> AppResult<TreasuryTransaction> {
    require_positive(req.amount, "Amount")?;
    ensure_treasury(conn, school_id, req.treasury_id).await?;

    let entry = post_journal(
        conn,
        school_id,
        JournalEntry {
            treasury_id: req.treasury_id,
            source: LedgerSource::Manual,
            source_id: None,
            reference: &req.reference,
            description: &req.description,
            amount: req.amount,
            is_inflow: req.is_inflow,
            date: req.date.unwrap_or(today),
        },
    )
    .await?;

    recompute_treasury(conn, school_id, req.treasury_id).await?;
    Ok(entry)
}

/// Only manual entries can be removed directly; the others follow their source row.
pub async fn delete_manual_entry(
    conn: &mut PgConnection,
    school_id: Uuid,
    entry_id: Uuid,
) -> AppResult<()> {
    let entry = sqlx::query_as::<_, TreasuryTransaction>(
        "SELECT * FROM treasury_transactions WHERE id = $1 AND school_id = $2",
    )
    .bind(entry_id)
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Transaction {entry_id} not found")))?;

    if entry.source_kind != LedgerSource::Manual {
        return Err(AppError::Conflict(
            "Only manual entries can be deleted; delete the originating record instead"
                .to_string(),
        ));
    }

    sqlx::query("DELETE FROM treasury_transactions WHERE id = $1")
        .bind(entry_id)
        .execute(&mut *conn)
        .await?;

    recompute_treasury(conn, school_id, entry.treasury_id).await?;
    Ok(())
}

// ─── Invoices ────────────────────────────────────────────────────────────────

pub async fn create_invoice(
    conn: &mut PgConnection,
    school_id: Uuid,
    req: &CreateInvoiceRequest,
    due_days: i64,
    today: NaiveDate,
) -> AppResult<Invoice> {
    require_positive(req.amount, "Invoice amount")?;

    let student_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM students WHERE id = $1 AND school_id = $2)",
    )
    .bind(req.student_id)
    .bind(school_id)
    .fetch_one(&mut *conn)
    .await?;
    if !student_exists {
        return Err(AppError::NotFound(format!(
            "Student {} not found",
            req.student_id
        )));
    }

    let issue_date = req.issue_date.unwrap_or(today);
    let due_date = req
        .due_date
        .unwrap_or_else(|| issue_date + Duration::days(due_days));
    if due_date < issue_date {
        return Err(AppError::Validation(
            "Due date cannot be before the issue date".to_string(),
        ));
    }

    let number = numbering::next_number(conn, school_id, INVOICE_PREFIX).await?;

    let invoice = sqlx::query_as::<_, Invoice>(
        r#"INSERT INTO invoices
            (id, school_id, invoice_number, student_id, issue_date, due_date, description,
             amount, sent_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $9 THEN NOW() END)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(&number)
    .bind(req.student_id)
    .bind(issue_date)
    .bind(due_date)
    .bind(&req.description)
    .bind(req.amount)
    .bind(req.send)
    .fetch_one(&mut *conn)
    .await?;

    info!(invoice = %invoice.invoice_number, amount = %invoice.amount, "invoice created");
    recompute_invoice(conn, school_id, invoice.id, today).await
}

pub async fn update_invoice(
    conn: &mut PgConnection,
    school_id: Uuid,
    invoice_id: Uuid,
    req: &UpdateInvoiceRequest,
    today: NaiveDate,
) -> AppResult<Invoice> {
    let invoice = lock_invoice(conn, school_id, invoice_id).await?;

    let amount = req.amount.unwrap_or(invoice.amount);
    require_positive(amount, "Invoice amount")?;
    if amount < invoice.amount_paid {
        return Err(AppError::BadRequest(format!(
            "Invoice amount cannot be less than the {} already paid",
            invoice.amount_paid
        )));
    }
    let due_date = req.due_date.unwrap_or(invoice.due_date);
    if due_date < invoice.issue_date {
        return Err(AppError::Validation(
            "Due date cannot be before the issue date".to_string(),
        ));
    }

    sqlx::query(
        r#"UPDATE invoices
           SET amount = $2, due_date = $3, description = COALESCE($4, description),
               updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(invoice_id)
    .bind(amount)
    .bind(due_date)
    .bind(req.description.as_deref())
    .execute(&mut *conn)
    .await?;

    recompute_invoice(conn, school_id, invoice_id, today).await
}

/// Mark the invoice as sent. Sending twice keeps the first timestamp.
pub async fn send_invoice(
    conn: &mut PgConnection,
    school_id: Uuid,
    invoice_id: Uuid,
    today: NaiveDate,
) -> AppResult<Invoice> {
    lock_invoice(conn, school_id, invoice_id).await?;

    sqlx::query(
        "UPDATE invoices SET sent_at = COALESCE(sent_at, NOW()), updated_at = NOW() WHERE id = $1",
    )
    .bind(invoice_id)
    .execute(&mut *conn)
    .await?;

    recompute_invoice(conn, school_id, invoice_id, today).await
}

pub async fn delete_invoice(
    conn: &mut PgConnection,
    school_id: Uuid,
    invoice_id: Uuid,
) -> AppResult<()> {
    lock_invoice(conn, school_id, invoice_id).await?;

    let has_payments: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payments WHERE invoice_id = $1)")
            .bind(invoice_id)
            .fetch_one(&mut *conn)
            .await?;
    if has_payments {
        return Err(AppError::Conflict(
            "Invoice has payments; delete them first".to_string(),
        ));
    }

    sqlx::query("DELETE FROM invoices WHERE id = $1")
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Recompute every SENT/PARTIAL invoice that is past due. Each invoice commits on its own.
pub async fn refresh_overdue(pool: &PgPool, today: NaiveDate) -> AppResult<u64> {
    let due: Vec<(Uuid, Uuid)> = sqlx::query_as(
        r#"SELECT id, school_id FROM invoices
           WHERE status IN ('sent', 'partial') AND due_date < $1"#,
    )
    .bind(today)
    .fetch_all(pool)
    .await?;

    let mut flipped = 0;
    for (invoice_id, school_id) in due {
        let mut tx = pool.begin().await?;
        let invoice = recompute_invoice(&mut tx, school_id, invoice_id, today).await?;
        tx.commit().await?;
        if invoice.status == InvoiceStatus::Overdue {
            flipped += 1;
        }
    }

    if flipped > 0 {
        info!(count = flipped, "invoices marked overdue");
    }
    Ok(flipped)
}

// ─── Payments ────────────────────────────────────────────────────────────────

pub async fn record_payment(
    conn: &mut PgConnection,
    school_id: Uuid,
    req: &CreatePaymentRequest,
    today: NaiveDate,
) -> AppResult<Payment> {
    require_positive(req.amount, "Payment amount")?;

    let invoice = lock_invoice(conn, school_id, req.invoice_id).await?;
    ensure_treasury(conn, school_id, req.treasury_id).await?;

    let outstanding = invoice.balance_due();
    if req.amount > outstanding {
        return Err(AppError::BadRequest(format!(
            "Payment of {} exceeds the outstanding balance of {} on {}",
            req.amount, outstanding, invoice.invoice_number
        )));
    }

    let date = req.date.unwrap_or(today);
    let payment = sqlx::query_as::<_, Payment>(
        r#"INSERT INTO payments (id, school_id, invoice_id, treasury_id, amount, date, reference)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(invoice.id)
    .bind(req.treasury_id)
    .bind(req.amount)
    .bind(date)
    .bind(&req.reference)
    .fetch_one(&mut *conn)
    .await?;

    let description = format!("Payment for {}", invoice.invoice_number);
    post_journal(
        conn,
        school_id,
        JournalEntry {
            treasury_id: payment.treasury_id,
            source: LedgerSource::Payment,
            source_id: Some(payment.id),
            reference: &invoice.invoice_number,
            description: &description,
            amount: payment.amount,
            is_inflow: true,
            date,
        },
    )
    .await?;

    recompute_treasury(conn, school_id, payment.treasury_id).await?;
    recompute_invoice(conn, school_id, invoice.id, today).await?;

    info!(
        invoice = %invoice.invoice_number,
        amount = %payment.amount,
        "payment recorded"
    );
    Ok(payment)
}

pub async fn delete_payment(
    conn: &mut PgConnection,
    school_id: Uuid,
    payment_id: Uuid,
    today: NaiveDate,
) -> AppResult<()> {
    let payment = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE id = $1 AND school_id = $2",
    )
    .bind(payment_id)
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Payment {payment_id} not found")))?;

    // Invoice before treasury, same order as record_payment.
    lock_invoice(conn, school_id, payment.invoice_id).await?;

    sqlx::query("DELETE FROM payments WHERE id = $1")
        .bind(payment_id)
        .execute(&mut *conn)
        .await?;

    for treasury_id in remove_journal(conn, school_id, LedgerSource::Payment, payment_id).await? {
        recompute_treasury(conn, school_id, treasury_id).await?;
    }
    recompute_invoice(conn, school_id, payment.invoice_id, today).await?;
    Ok(())
}

// ─── Expenses ────────────────────────────────────────────────────────────────

struct NewExpense<'a> {
    purchase_order_id: Option<Uuid>,
    reference: &'a str,
    vendor_id: Option<Uuid>,
    description: &'a str,
    amount: Decimal,
    treasury_id: Uuid,
    date: NaiveDate,
    category: ExpenseCategory,
}

async fn insert_expense(
    conn: &mut PgConnection,
    school_id: Uuid,
    new: NewExpense<'_>,
) -> AppResult<Expense> {
    require_positive(new.amount, "Expense amount")?;

    let expense = sqlx::query_as::<_, Expense>(
        r#"INSERT INTO expenses
            (id, school_id, purchase_order_id, reference, vendor_id, description, amount,
             treasury_id, date, category)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(new.purchase_order_id)
    .bind(new.reference)
    .bind(new.vendor_id)
    .bind(new.description)
    .bind(new.amount)
    .bind(new.treasury_id)
    .bind(new.date)
    .bind(new.category)
    .fetch_one(&mut *conn)
    .await?;

    post_journal(
        conn,
        school_id,
        JournalEntry {
            treasury_id: expense.treasury_id,
            source: LedgerSource::Expense,
            source_id: Some(expense.id),
            reference: &expense.reference,
            description: &expense.description,
            amount: expense.amount,
            is_inflow: false,
            date: expense.date,
        },
    )
    .await?;

    recompute_treasury(conn, school_id, expense.treasury_id).await?;
    Ok(expense)
}

pub async fn record_expense(
    conn: &mut PgConnection,
    school_id: Uuid,
    req: &CreateExpenseRequest,
    today: NaiveDate,
) -> AppResult<Expense> {
    if req.description.trim().is_empty() {
        return Err(AppError::Validation("Description is required".to_string()));
    }
    ensure_treasury(conn, school_id, req.treasury_id).await?;

    insert_expense(
        conn,
        school_id,
        NewExpense {
            purchase_order_id: None,
            reference: &req.reference,
            vendor_id: req.vendor_id,
            description: &req.description,
            amount: req.amount,
            treasury_id: req.treasury_id,
            date: req.date.unwrap_or(today),
            category: req.category.unwrap_or(ExpenseCategory::Other),
        },
    )
    .await
}

pub async fn delete_expense(
    conn: &mut PgConnection,
    school_id: Uuid,
    expense_id: Uuid,
) -> AppResult<()> {
    let expense = sqlx::query_as::<_, Expense>(
        "SELECT * FROM expenses WHERE id = $1 AND school_id = $2",
    )
    .bind(expense_id)
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Expense {expense_id} not found")))?;

    if expense.purchase_order_id.is_some() {
        return Err(AppError::Conflict(
            "Expense was created by a received purchase order and cannot be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM expenses WHERE id = $1")
        .bind(expense_id)
        .execute(&mut *conn)
        .await?;

    for treasury_id in remove_journal(conn, school_id, LedgerSource::Expense, expense_id).await? {
        recompute_treasury(conn, school_id, treasury_id).await?;
    }
    Ok(())
}

// ─── Purchase orders ─────────────────────────────────────────────────────────

/// Receive a purchase order: one SUPPLIES expense, stock added, order marked received.
/// Receiving again returns the expense created the first time.
pub async fn receive_purchase_order(
    conn: &mut PgConnection,
    school_id: Uuid,
    po_id: Uuid,
    treasury_id: Option<Uuid>,
    today: NaiveDate,
) -> AppResult<ReceiptOutcome> {
    sqlx::query("SELECT id FROM purchase_orders WHERE id = $1 AND school_id = $2 FOR UPDATE")
        .bind(po_id)
        .bind(school_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Purchase order {po_id} not found")))?;

    let order = fetch_purchase_order(conn, school_id, po_id).await?;

    if order.received {
        let expense = sqlx::query_as::<_, Expense>(
            "SELECT * FROM expenses WHERE purchase_order_id = $1",
        )
        .bind(po_id)
        .fetch_optional(&mut *conn)
        .await?;
        return Ok(ReceiptOutcome {
            purchase_order: order,
            expense,
            already_received: true,
        });
    }

    // A free order restocks without touching the books.
    let expense = if order.total > Decimal::ZERO {
        let treasury_id = match treasury_id {
            Some(id) => {
                ensure_treasury(conn, school_id, id).await?;
                id
            }
            None => default_treasury(conn, school_id).await?,
        };

        let item_name: String = sqlx::query_scalar("SELECT name FROM items WHERE id = $1")
            .bind(order.item_id)
            .fetch_one(&mut *conn)
            .await?;

        let description = format!(
            "Purchase order {}: {} x {}",
            order.po_number, order.quantity, item_name
        );
        Some(
            insert_expense(
                conn,
                school_id,
                NewExpense {
                    purchase_order_id: Some(order.id),
                    reference: &order.po_number,
                    vendor_id: Some(order.vendor_id),
                    description: &description,
                    amount: order.total,
                    treasury_id,
                    date: today,
                    category: ExpenseCategory::Supplies,
                },
            )
            .await?,
        )
    } else {
        None
    };

    sqlx::query(
        r#"UPDATE items
           SET quantity = quantity + $2, last_restock = $3, updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(order.item_id)
    .bind(order.quantity)
    .bind(today)
    .execute(&mut *conn)
    .await?;

    sqlx::query("UPDATE purchase_orders SET received = TRUE, received_at = NOW() WHERE id = $1")
        .bind(po_id)
        .execute(&mut *conn)
        .await?;

    info!(po = %order.po_number, total = %order.total, "purchase order received");

    Ok(ReceiptOutcome {
        purchase_order: fetch_purchase_order(conn, school_id, po_id).await?,
        expense,
        already_received: false,
    })
}

// ─── Salary payments ─────────────────────────────────────────────────────────

pub async fn record_salary_payment(
    conn: &mut PgConnection,
    school_id: Uuid,
    req: &CreateSalaryPaymentRequest,
    today: NaiveDate,
) -> AppResult<SalaryPayment> {
    let record = sqlx::query_as::<_, SalaryRecord>(
        "SELECT * FROM salary_records WHERE id = $1 AND school_id = $2 FOR UPDATE",
    )
    .bind(req.salary_record_id)
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!("Salary record {} not found", req.salary_record_id))
    })?;

    if record.paid {
        return Err(AppError::Conflict(format!(
            "Salary for {} is already paid",
            record.month.format("%Y-%m")
        )));
    }

    let amount = req.amount.unwrap_or(record.net);
    require_positive(amount, "Salary payment amount")?;
    ensure_treasury(conn, school_id, req.treasury_id).await?;

    let date = req.date.unwrap_or(today);
    let payment = sqlx::query_as::<_, SalaryPayment>(
        r#"INSERT INTO salary_payments (id, school_id, salary_record_id, treasury_id, amount, date)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(record.id)
    .bind(req.treasury_id)
    .bind(amount)
    .bind(date)
    .fetch_one(&mut *conn)
    .await?;

    let reference = format!("SAL-{}", record.month.format("%Y-%m"));
    post_journal(
        conn,
        school_id,
        JournalEntry {
            treasury_id: payment.treasury_id,
            source: LedgerSource::SalaryPayment,
            source_id: Some(payment.id),
            reference: &reference,
            description: "Salary payment",
            amount,
            is_inflow: false,
            date,
        },
    )
    .await?;

    recompute_treasury(conn, school_id, payment.treasury_id).await?;
    refresh_salary_paid(conn, record.id).await?;
    Ok(payment)
}

pub async fn delete_salary_payment(
    conn: &mut PgConnection,
    school_id: Uuid,
    payment_id: Uuid,
) -> AppResult<()> {
    let payment = sqlx::query_as::<_, SalaryPayment>(
        "SELECT * FROM salary_payments WHERE id = $1 AND school_id = $2",
    )
    .bind(payment_id)
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Salary payment {payment_id} not found")))?;

    sqlx::query("SELECT id FROM salary_records WHERE id = $1 FOR UPDATE")
        .bind(payment.salary_record_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM salary_payments WHERE id = $1")
        .bind(payment_id)
        .execute(&mut *conn)
        .await?;

    for treasury_id in
        remove_journal(conn, school_id, LedgerSource::SalaryPayment, payment_id).await?
    {
        recompute_treasury(conn, school_id, treasury_id).await?;
    }
    refresh_salary_paid(conn, payment.salary_record_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn basis(amount: Decimal, paid: Decimal, sent: bool, due: NaiveDate) -> InvoiceBasis {
        InvoiceBasis {
            amount,
            paid,
            sent,
            due_date: due,
        }
    }

    #[test]
    fn unpaid_invoice_is_draft_until_sent() {
        let today = day(2025, 3, 1);
        let due = day(2025, 3, 10);
        assert_eq!(
            derive_invoice_status(&basis(dec!(100), dec!(0), false, due), today),
            InvoiceStatus::Draft
        );
        assert_eq!(
            derive_invoice_status(&basis(dec!(100), dec!(0), true, due), today),
            InvoiceStatus::Sent
        );
    }

    #[test]
    fn payments_drive_partial_and_paid() {
        let today = day(2025, 3, 1);
        let due = day(2025, 3, 10);
        assert_eq!(
            derive_invoice_status(&basis(dec!(100), dec!(40), false, due), today),
            InvoiceStatus::Partial
        );
        assert_eq!(
            derive_invoice_status(&basis(dec!(100), dec!(100), true, due), today),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn past_due_sent_or_partial_becomes_overdue() {
        let today = day(2025, 3, 11);
        let due = day(2025, 3, 10);
        assert_eq!(
            derive_invoice_status(&basis(dec!(100), dec!(0), true, due), today),
            InvoiceStatus::Overdue
        );
        assert_eq!(
            derive_invoice_status(&basis(dec!(100), dec!(30), true, due), today),
            InvoiceStatus::Overdue
        );
    }

    #[test]
    fn drafts_and_paid_invoices_never_go_overdue() {
        let today = day(2025, 4, 1);
        let due = day(2025, 3, 10);
        assert_eq!(
            derive_invoice_status(&basis(dec!(100), dec!(0), false, due), today),
            InvoiceStatus::Draft
        );
        assert_eq!(
            derive_invoice_status(&basis(dec!(100), dec!(100), true, due), today),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn due_today_is_not_overdue() {
        let today = day(2025, 3, 10);
        assert_eq!(
            derive_invoice_status(&basis(dec!(100), dec!(0), true, today), today),
            InvoiceStatus::Sent
        );
    }

    #[test]
    fn refund_after_full_payment_reopens_the_invoice() {
        // Deleting a payment recomputes from the remaining sum.
        let today = day(2025, 3, 1);
        let due = day(2025, 3, 10);
        let before = derive_invoice_status(&basis(dec!(100), dec!(100), true, due), today);
        let after = derive_invoice_status(&basis(dec!(100), dec!(60), true, due), today);
        assert_eq!(before, InvoiceStatus::Paid);
        assert_eq!(after, InvoiceStatus::Partial);
    }

    #[test]
    fn signed_balance_sums_inflows_minus_outflows() {
        let entries = vec![
            (dec!(1000.00), true),
            (dec!(250.50), false),
            (dec!(99.50), true),
            (dec!(849.00), false),
        ];
        assert_eq!(signed_balance(entries), dec!(0.00));
        assert_eq!(signed_balance(Vec::new()), Decimal::ZERO);
        assert_eq!(signed_balance([(dec!(10), false)]), dec!(-10));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(require_positive(dec!(0), "Amount").is_err());
        assert!(require_positive(dec!(-1), "Amount").is_err());
        assert!(require_positive(dec!(0.01), "Amount").is_ok());
    }

    #[test]
    fn sub_cent_amounts_are_rejected() {
        let err = require_positive(dec!(0.004), "Payment amount").unwrap_err();
        assert!(err.to_string().contains("two decimal places"));
        assert!(require_positive(dec!(12.345), "Amount").is_err());
        // Trailing zeros are not extra precision.
        assert!(require_positive(dec!(10.500), "Amount").is_ok());
        assert!(require_cents(dec!(0), "Opening balance").is_ok());
        assert!(require_cents(dec!(0.001), "Opening balance").is_err());
    }
}

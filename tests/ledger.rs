//! Ledger, billing and alert queries against a real Postgres database.

mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Duration};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use uuid::Uuid;

use common::{balances, today};
use school_erp::{
    errors::AppError,
    models::finance::{
        CreateInvoiceRequest, CreateManualEntryRequest, CreatePaymentRequest,
        CreateSalaryPaymentRequest, Invoice, InvoiceStatus,
    },
    services::{billing, ledger, notifications, payroll::month_start, scheduler},
};

async fn invoice(pool: &PgPool, school_id: Uuid, student_id: Uuid, amount: Decimal) -> Invoice {
    let mut tx = pool.begin().await.unwrap();
    let invoice = ledger::create_invoice(
        &mut tx,
        school_id,
        &CreateInvoiceRequest {
            student_id,
            issue_date: None,
            due_date: None,
            description: "Tuition".to_string(),
            amount,
            send: true,
        },
        30,
        today(),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    invoice
}

async fn pay(
    pool: &PgPool,
    school_id: Uuid,
    invoice_id: Uuid,
    treasury_id: Uuid,
    amount: Decimal,
) -> Result<Uuid, AppError> {
    let mut tx = pool.begin().await.unwrap();
    let payment = ledger::record_payment(
        &mut tx,
        school_id,
        &CreatePaymentRequest {
            invoice_id,
            treasury_id,
            amount,
            date: None,
            reference: String::new(),
        },
        today(),
    )
    .await?;
    tx.commit().await.unwrap();
    Ok(payment.id)
}

async fn salary_paid(pool: &PgPool, record_id: Uuid) -> bool {
    sqlx::query_scalar("SELECT paid FROM salary_records WHERE id = $1")
        .bind(record_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn reload_invoice(pool: &PgPool, id: Uuid) -> Invoice {
    sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn deleting_a_payment_reopens_the_invoice_and_the_treasury() {
    let Some(pool) = common::pool().await else { return };
    let school_id = common::school(&pool).await;
    let student_id = common::student(&pool, school_id, None).await;
    let treasury = common::treasury(&pool, school_id, Decimal::ZERO).await;
    let inv = invoice(&pool, school_id, student_id, dec!(100.00)).await;
    assert_eq!(inv.status, InvoiceStatus::Sent);

    pay(&pool, school_id, inv.id, treasury.id, dec!(40.00)).await.unwrap();
    assert_eq!(reload_invoice(&pool, inv.id).await.status, InvoiceStatus::Partial);

    let last = pay(&pool, school_id, inv.id, treasury.id, dec!(60.00)).await.unwrap();
    let paid = reload_invoice(&pool, inv.id).await;
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.amount_paid, dec!(100.00));
    assert_eq!(balances(&pool, treasury.id).await, (dec!(100.00), dec!(100.00)));

    let mut tx = pool.begin().await.unwrap();
    ledger::delete_payment(&mut tx, school_id, last, today()).await.unwrap();
    tx.commit().await.unwrap();

    let reopened = reload_invoice(&pool, inv.id).await;
    assert_eq!(reopened.status, InvoiceStatus::Partial);
    assert_eq!(reopened.amount_paid, dec!(40.00));
    assert_eq!(balances(&pool, treasury.id).await, (dec!(40.00), dec!(40.00)));
}

#[tokio::test]
async fn overpaying_an_invoice_is_refused() {
    let Some(pool) = common::pool().await else { return };
    let school_id = common::school(&pool).await;
    let student_id = common::student(&pool, school_id, None).await;
    let treasury = common::treasury(&pool, school_id, Decimal::ZERO).await;
    let inv = invoice(&pool, school_id, student_id, dec!(50.00)).await;

    let err = pay(&pool, school_id, inv.id, treasury.id, dec!(50.01)).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(balances(&pool, treasury.id).await, (Decimal::ZERO, Decimal::ZERO));
}

#[tokio::test]
async fn sub_cent_payment_is_a_validation_error() {
    let Some(pool) = common::pool().await else { return };
    let school_id = common::school(&pool).await;
    let student_id = common::student(&pool, school_id, None).await;
    let treasury = common::treasury(&pool, school_id, Decimal::ZERO).await;
    let inv = invoice(&pool, school_id, student_id, dec!(10.00)).await;

    let err = pay(&pool, school_id, inv.id, treasury.id, dec!(0.004)).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE invoice_id = $1")
        .bind(inv.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(payments, 0);
}

#[tokio::test]
async fn check_constraint_failures_are_client_errors() {
    let Some(pool) = common::pool().await else { return };
    let school_id = common::school(&pool).await;
    let staff_id = common::staff(&pool, school_id).await;

    let err = sqlx::query(
        r#"INSERT INTO salary_records (id, school_id, staff_id, month, gross, deduct, net)
           VALUES ($1, $2, $3, '2025-03-01', 100, 150, -50)"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(staff_id)
    .execute(&pool)
    .await
    .unwrap_err();
    assert_eq!(AppError::from(err).status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stored_balance_matches_the_journal() {
    let Some(pool) = common::pool().await else { return };
    let school_id = common::school(&pool).await;
    let treasury = common::treasury(&pool, school_id, dec!(100.50)).await;

    let mut tx = pool.begin().await.unwrap();
    ledger::post_manual_entry(
        &mut tx,
        school_id,
        &CreateManualEntryRequest {
            treasury_id: treasury.id,
            amount: dec!(20.25),
            is_inflow: false,
            date: None,
            reference: "PETTY".to_string(),
            description: "Petty cash".to_string(),
        },
        today(),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(balances(&pool, treasury.id).await, (dec!(80.25), dec!(80.25)));

    let mut conn = pool.acquire().await.unwrap();
    let report = ledger::reconcile_treasury(&mut conn, school_id, treasury.id, false)
        .await
        .unwrap();
    assert_eq!(report.journal_balance, dec!(80.25));
}

#[tokio::test]
async fn receiving_a_purchase_order_twice_books_one_expense() {
    let Some(pool) = common::pool().await else { return };
    let school_id = common::school(&pool).await;
    let treasury = common::treasury(&pool, school_id, dec!(100.00)).await;
    let vendor_id = common::vendor(&pool, school_id).await;
    let item_id = common::item(&pool, school_id, 5).await;
    let po_id = common::purchase_order(&pool, school_id, vendor_id, item_id, 10, dec!(3.00)).await;

    let mut tx = pool.begin().await.unwrap();
    let first = ledger::receive_purchase_order(&mut tx, school_id, po_id, Some(treasury.id), today())
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert!(!first.already_received);
    let expense = first.expense.expect("a priced order books an expense");
    assert_eq!(expense.amount, dec!(30.00));

    let mut tx = pool.begin().await.unwrap();
    let second = ledger::receive_purchase_order(&mut tx, school_id, po_id, Some(treasury.id), today())
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert!(second.already_received);
    assert_eq!(second.expense.map(|e| e.id), Some(expense.id));

    let expenses: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM expenses WHERE purchase_order_id = $1")
            .bind(po_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(expenses, 1);

    let quantity: i32 = sqlx::query_scalar("SELECT quantity FROM items WHERE id = $1")
        .bind(item_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(quantity, 15);
    assert_eq!(balances(&pool, treasury.id).await, (dec!(70.00), dec!(70.00)));
}

#[tokio::test]
async fn free_purchase_order_restocks_without_an_expense() {
    let Some(pool) = common::pool().await else { return };
    let school_id = common::school(&pool).await;
    let vendor_id = common::vendor(&pool, school_id).await;
    let item_id = common::item(&pool, school_id, 2).await;
    let po_id = common::purchase_order(&pool, school_id, vendor_id, item_id, 10, dec!(0.00)).await;

    // No treasury exists; a free order must not need one.
    let mut tx = pool.begin().await.unwrap();
    let outcome = ledger::receive_purchase_order(&mut tx, school_id, po_id, None, today())
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert!(outcome.purchase_order.received);
    assert!(outcome.expense.is_none());

    let quantity: i32 = sqlx::query_scalar("SELECT quantity FROM items WHERE id = $1")
        .bind(item_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(quantity, 12);

    let mut tx = pool.begin().await.unwrap();
    let again = ledger::receive_purchase_order(&mut tx, school_id, po_id, None, today())
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert!(again.already_received);
    assert!(again.expense.is_none());

    let journal: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM treasury_transactions WHERE school_id = $1")
            .bind(school_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(journal, 0);
}

#[tokio::test]
async fn salary_paid_flag_follows_its_payments() {
    let Some(pool) = common::pool().await else { return };
    let school_id = common::school(&pool).await;
    let staff_id = common::staff(&pool, school_id).await;
    let treasury = common::treasury(&pool, school_id, dec!(2000.00)).await;

    let record_id = Uuid::new_v4();
    sqlx::query(
        r#"INSERT INTO salary_records (id, school_id, staff_id, month, gross, deduct, net)
           VALUES ($1, $2, $3, $4, 1200, 200, 1000)"#,
    )
    .bind(record_id)
    .bind(school_id)
    .bind(staff_id)
    .bind(month_start(today()))
    .execute(&pool)
    .await
    .unwrap();

    let request = CreateSalaryPaymentRequest {
        salary_record_id: record_id,
        treasury_id: treasury.id,
        amount: None,
        date: None,
    };
    let mut tx = pool.begin().await.unwrap();
    let payment = ledger::record_salary_payment(&mut tx, school_id, &request, today())
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(payment.amount, dec!(1000.00));
    assert!(salary_paid(&pool, record_id).await);
    assert_eq!(balances(&pool, treasury.id).await, (dec!(1000.00), dec!(1000.00)));

    let mut tx = pool.begin().await.unwrap();
    let err = ledger::record_salary_payment(&mut tx, school_id, &request, today())
        .await
        .unwrap_err();
    tx.rollback().await.unwrap();
    assert!(matches!(err, AppError::Conflict(_)));

    let mut tx = pool.begin().await.unwrap();
    ledger::delete_salary_payment(&mut tx, school_id, payment.id).await.unwrap();
    tx.commit().await.unwrap();
    assert!(!salary_paid(&pool, record_id).await);
    assert_eq!(balances(&pool, treasury.id).await, (dec!(2000.00), dec!(2000.00)));
}

#[tokio::test]
async fn tuition_rerun_reports_already_billed_students() {
    let Some(pool) = common::pool().await else { return };
    let school_id = common::school(&pool).await;
    let classroom_id = common::classroom(&pool, school_id, dec!(250.00)).await;
    common::student(&pool, school_id, Some(classroom_id)).await;
    common::student(&pool, school_id, Some(classroom_id)).await;
    let month = month_start(today());

    let first = billing::generate_tuition_invoices(&pool, school_id, month, 10, today())
        .await
        .unwrap();
    assert_eq!((first.created, first.skipped), (2, 0));

    let rerun = billing::generate_tuition_invoices(&pool, school_id, month, 10, today())
        .await
        .unwrap();
    assert_eq!((rerun.created, rerun.skipped), (0, 2));

    // No invoice numbers were burned by the rerun.
    let last_value: i32 = sqlx::query_scalar(
        "SELECT last_value FROM document_sequences WHERE school_id = $1 AND prefix = 'INV'",
    )
    .bind(school_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(last_value, 2);
}

#[tokio::test]
async fn expiry_alerts_include_lapsed_documents() {
    let Some(pool) = common::pool().await else { return };
    let school_id = common::school(&pool).await;
    let student_id = common::student(&pool, school_id, None).await;
    let staff_id = common::staff(&pool, school_id).await;
    let today = today();

    sqlx::query(
        r#"INSERT INTO student_documents (id, school_id, student_id, doc_type, issue_date, expiration_date)
           VALUES ($1, $2, $3, 'passport', $4, $5), ($6, $2, $3, 'visa', $4, $7)"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(student_id)
    .bind(today - Duration::days(400))
    .bind(today - Duration::days(10))
    .bind(Uuid::new_v4())
    .bind(today + Duration::days(400))
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        r#"INSERT INTO staff_documents (id, school_id, staff_id, doc_type, issue_date, expiration_date)
           VALUES ($1, $2, $3, 'certificate', $4, $5)"#,
    )
    .bind(Uuid::new_v4())
    .bind(school_id)
    .bind(staff_id)
    .bind(today - Duration::days(400))
    .bind(today + Duration::days(5))
    .execute(&pool)
    .await
    .unwrap();

    let students = notifications::expiring_student_documents(&pool, school_id, today)
        .await
        .unwrap();
    assert_eq!(students.len(), 1, "{students:?}");
    assert!(students[0].contains("PASSPORT expired"));

    let staff = notifications::expiring_staff_documents(&pool, school_id, today)
        .await
        .unwrap();
    assert_eq!(staff.len(), 1);
    assert!(staff[0].contains("CERTIFICATE expires"));
}

#[tokio::test]
async fn scheduler_runs_survive_in_the_database() {
    let Some(pool) = common::pool().await else { return };
    let task = format!("test-{}", Uuid::new_v4());
    assert_eq!(scheduler::last_run(&pool, &task).await.unwrap(), None);

    let first = today().with_day(1).unwrap();
    scheduler::mark_run(&pool, &task, first).await.unwrap();
    assert_eq!(scheduler::last_run(&pool, &task).await.unwrap(), Some(first));

    let later = first + Duration::days(40);
    scheduler::mark_run(&pool, &task, later).await.unwrap();
    assert_eq!(scheduler::last_run(&pool, &task).await.unwrap(), Some(later));
}

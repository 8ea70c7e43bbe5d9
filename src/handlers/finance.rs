// src/handlers/finance.rs
//
// Invoices, payments, expenses and salary payments. Every mutation goes
// through `services::ledger` inside one transaction.

use crate::{
    auth::AuthUser,
    errors::{AppError, AppResult},
    handlers::attachment,
    models::{
        MessageResponse,
        finance::{
            CreateExpenseRequest, CreateInvoiceRequest, CreatePaymentRequest,
            CreateSalaryPaymentRequest, Expense, ExpenseQuery, Invoice, InvoiceQuery, Payment,
            PaymentQuery, SalaryPayment, UpdateInvoiceRequest,
        },
    },
    policy::{Action, Resource},
    services::{
        billing::{self, TuitionRunSummary},
        ledger, notifications, reports,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GenerateTuitionRequest {
    /// Any day of the billing month; defaults to the current month.
    pub month: Option<NaiveDate>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ─── Invoices ────────────────────────────────────────────────────────────────

/// List invoices
#[utoipa::path(
    get,
    path = "/api/v1/finance/invoices",
    params(
        ("status" = Option<String>, Query, description = "DRAFT, SENT, PARTIAL, PAID or OVERDUE"),
        ("student_id" = Option<Uuid>, Query, description = "Filter by student"),
    ),
    responses((status = 200, description = "Invoices", body = Vec<Invoice>)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn list_invoices(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<InvoiceQuery>,
) -> AppResult<Json<Vec<Invoice>>> {
    auth.require(Resource::Finance, Action::Read)?;
    let invoices = sqlx::query_as::<_, Invoice>(
        r#"SELECT * FROM invoices
           WHERE school_id = $1
             AND ($2::invoice_status IS NULL OR status = $2)
             AND ($3::uuid IS NULL OR student_id = $3)
           ORDER BY issue_date DESC, invoice_number DESC"#,
    )
    .bind(auth.school_id)
    .bind(q.status)
    .bind(q.student_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(invoices))
}

/// Create an invoice; the number is allocated per school
#[utoipa::path(
    post,
    path = "/api/v1/finance/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created", body = Invoice),
        (status = 400, description = "Invalid amount or dates"),
        (status = 404, description = "Student not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn create_invoice(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateInvoiceRequest>,
) -> AppResult<(StatusCode, Json<Invoice>)> {
    auth.require(Resource::Finance, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let invoice = ledger::create_invoice(
        &mut tx,
        auth.school_id,
        &body,
        state.config.invoice_due_days,
        today(),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(invoice = %invoice.invoice_number, school_id = %auth.school_id, "invoice created");
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Get one invoice
#[utoipa::path(
    get,
    path = "/api/v1/finance/invoices/{invoice_id}",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice", body = Invoice),
        (status = 404, description = "Invoice not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn get_invoice(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<Invoice>> {
    auth.require(Resource::Finance, Action::Read)?;
    let invoice =
        sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 AND school_id = $2")
            .bind(invoice_id)
            .bind(auth.school_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invoice {invoice_id} not found")))?;
    Ok(Json(invoice))
}

/// Edit an invoice's amount, due date or description
#[utoipa::path(
    patch,
    path = "/api/v1/finance/invoices/{invoice_id}",
    request_body = UpdateInvoiceRequest,
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice updated", body = Invoice),
        (status = 400, description = "Amount below what was already paid"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn update_invoice(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    Json(body): Json<UpdateInvoiceRequest>,
) -> AppResult<Json<Invoice>> {
    auth.require(Resource::Finance, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let invoice = ledger::update_invoice(&mut tx, auth.school_id, invoice_id, &body, today()).await?;
    tx.commit().await?;
    Ok(Json(invoice))
}

/// Delete an invoice without payments
#[utoipa::path(
    delete,
    path = "/api/v1/finance/invoices/{invoice_id}",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice deleted", body = MessageResponse),
        (status = 409, description = "Invoice has payments"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn delete_invoice(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(Resource::Finance, Action::Delete)?;
    let mut tx = state.db.begin().await?;
    ledger::delete_invoice(&mut tx, auth.school_id, invoice_id).await?;
    tx.commit().await?;
    Ok(Json(MessageResponse::new("Invoice deleted")))
}

/// Mark an invoice as sent
#[utoipa::path(
    post,
    path = "/api/v1/finance/invoices/{invoice_id}/send",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses((status = 200, description = "Invoice sent", body = Invoice)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn send_invoice(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<Invoice>> {
    auth.require(Resource::Finance, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let invoice = ledger::send_invoice(&mut tx, auth.school_id, invoice_id, today()).await?;
    tx.commit().await?;
    Ok(Json(invoice))
}

/// Download the invoice as PDF
#[utoipa::path(
    get,
    path = "/api/v1/finance/invoices/{invoice_id}/pdf",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice PDF", content_type = "application/pdf"),
        (status = 404, description = "Invoice not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn invoice_pdf(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Response> {
    auth.require(Resource::Finance, Action::Read)?;
    let doc = reports::invoice_document(&state.db, auth.school_id, invoice_id).await?;
    Ok(attachment(&doc.file_name, doc.content_type, doc.bytes))
}

/// Email the invoice PDF to the student's guardian
#[utoipa::path(
    post,
    path = "/api/v1/finance/invoices/{invoice_id}/email",
    params(("invoice_id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 202, description = "Email queued", body = MessageResponse),
        (status = 400, description = "Guardian has no email address"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn email_invoice(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    auth.require(Resource::Finance, Action::Write)?;
    let email = notifications::invoice_email(&state.db, auth.school_id, invoice_id).await?;
    notifications::send_in_background(state.mailer.clone(), email);
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new("Invoice email queued")),
    ))
}

/// Raise this month's tuition invoices for every active student
#[utoipa::path(
    post,
    path = "/api/v1/finance/invoices/generate-tuition",
    request_body = GenerateTuitionRequest,
    responses((status = 200, description = "Billing summary", body = TuitionRunSummary)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn generate_tuition(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<GenerateTuitionRequest>,
) -> AppResult<Json<TuitionRunSummary>> {
    auth.require(Resource::Finance, Action::Write)?;
    let today = today();
    let summary = billing::generate_tuition_invoices(
        &state.db,
        auth.school_id,
        body.month.unwrap_or(today),
        state.config.invoice_due_days,
        today,
    )
    .await?;
    Ok(Json(summary))
}

// ─── Payments ────────────────────────────────────────────────────────────────

/// List payments
#[utoipa::path(
    get,
    path = "/api/v1/finance/payments",
    params(
        ("invoice_id" = Option<Uuid>, Query, description = "Filter by invoice"),
        ("treasury_id" = Option<Uuid>, Query, description = "Filter by treasury"),
    ),
    responses((status = 200, description = "Payments", body = Vec<Payment>)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn list_payments(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<PaymentQuery>,
) -> AppResult<Json<Vec<Payment>>> {
    auth.require(Resource::Finance, Action::Read)?;
    let payments = sqlx::query_as::<_, Payment>(
        r#"SELECT * FROM payments
           WHERE school_id = $1
             AND ($2::uuid IS NULL OR invoice_id = $2)
             AND ($3::uuid IS NULL OR treasury_id = $3)
           ORDER BY date DESC, created_at DESC"#,
    )
    .bind(auth.school_id)
    .bind(q.invoice_id)
    .bind(q.treasury_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(payments))
}

/// Record a payment against an invoice
#[utoipa::path(
    post,
    path = "/api/v1/finance/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 400, description = "Amount invalid or exceeds the balance due"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn create_payment(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    auth.require(Resource::Finance, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let payment = ledger::record_payment(&mut tx, auth.school_id, &body, today()).await?;
    tx.commit().await?;

    tracing::info!(payment_id = %payment.id, invoice_id = %payment.invoice_id, amount = %payment.amount, "payment recorded");
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Delete a payment; invoice and treasury are recomputed
#[utoipa::path(
    delete,
    path = "/api/v1/finance/payments/{payment_id}",
    params(("payment_id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment deleted", body = MessageResponse),
        (status = 404, description = "Payment not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn delete_payment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(Resource::Finance, Action::Delete)?;
    let mut tx = state.db.begin().await?;
    ledger::delete_payment(&mut tx, auth.school_id, payment_id, today()).await?;
    tx.commit().await?;
    Ok(Json(MessageResponse::new("Payment deleted")))
}

/// Download a payment receipt as PDF
#[utoipa::path(
    get,
    path = "/api/v1/finance/payments/{payment_id}/receipt",
    params(("payment_id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Receipt PDF", content_type = "application/pdf"),
        (status = 404, description = "Payment not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn payment_receipt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> AppResult<Response> {
    auth.require(Resource::Finance, Action::Read)?;
    let doc = reports::receipt_document(&state.db, auth.school_id, payment_id).await?;
    Ok(attachment(&doc.file_name, doc.content_type, doc.bytes))
}

/// Email the payment receipt to the student's guardian
#[utoipa::path(
    post,
    path = "/api/v1/finance/payments/{payment_id}/email",
    params(("payment_id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 202, description = "Email queued", body = MessageResponse),
        (status = 400, description = "Guardian has no email address"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn email_receipt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    auth.require(Resource::Finance, Action::Write)?;
    let email = notifications::receipt_email(&state.db, auth.school_id, payment_id).await?;
    notifications::send_in_background(state.mailer.clone(), email);
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new("Receipt email queued")),
    ))
}

// ─── Expenses ────────────────────────────────────────────────────────────────

/// List expenses
#[utoipa::path(
    get,
    path = "/api/v1/finance/expenses",
    params(
        ("category" = Option<String>, Query, description = "Expense category"),
        ("from" = Option<NaiveDate>, Query, description = "First day, inclusive"),
        ("to" = Option<NaiveDate>, Query, description = "Last day, inclusive"),
    ),
    responses((status = 200, description = "Expenses", body = Vec<Expense>)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn list_expenses(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(q): Query<ExpenseQuery>,
) -> AppResult<Json<Vec<Expense>>> {
    auth.require(Resource::Finance, Action::Read)?;
    let expenses = sqlx::query_as::<_, Expense>(
        r#"SELECT * FROM expenses
           WHERE school_id = $1
             AND ($2::expense_category IS NULL OR category = $2)
             AND ($3::date IS NULL OR date >= $3)
             AND ($4::date IS NULL OR date <= $4)
           ORDER BY date DESC, created_at DESC"#,
    )
    .bind(auth.school_id)
    .bind(q.category)
    .bind(q.from)
    .bind(q.to)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(expenses))
}

/// Record an expense paid from a treasury
#[utoipa::path(
    post,
    path = "/api/v1/finance/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = Expense),
        (status = 400, description = "Invalid amount"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn create_expense(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateExpenseRequest>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    auth.require(Resource::Finance, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let expense = ledger::record_expense(&mut tx, auth.school_id, &body, today()).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// Delete a manual expense
#[utoipa::path(
    delete,
    path = "/api/v1/finance/expenses/{expense_id}",
    params(("expense_id" = Uuid, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense deleted", body = MessageResponse),
        (status = 409, description = "Expense belongs to a received purchase order"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn delete_expense(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(Resource::Finance, Action::Delete)?;
    let mut tx = state.db.begin().await?;
    ledger::delete_expense(&mut tx, auth.school_id, expense_id).await?;
    tx.commit().await?;
    Ok(Json(MessageResponse::new("Expense deleted")))
}

// ─── Salary payments ─────────────────────────────────────────────────────────

/// List salary payments
#[utoipa::path(
    get,
    path = "/api/v1/finance/salary-payments",
    responses((status = 200, description = "Salary payments", body = Vec<SalaryPayment>)),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn list_salary_payments(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<SalaryPayment>>> {
    auth.require(Resource::Finance, Action::Read)?;
    let rows = sqlx::query_as::<_, SalaryPayment>(
        "SELECT * FROM salary_payments WHERE school_id = $1 ORDER BY date DESC, created_at DESC",
    )
    .bind(auth.school_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// Pay a salary record from a treasury
#[utoipa::path(
    post,
    path = "/api/v1/finance/salary-payments",
    request_body = CreateSalaryPaymentRequest,
    responses(
        (status = 201, description = "Salary paid", body = SalaryPayment),
        (status = 409, description = "Salary record already paid"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn create_salary_payment(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateSalaryPaymentRequest>,
) -> AppResult<(StatusCode, Json<SalaryPayment>)> {
    auth.require(Resource::Finance, Action::Write)?;
    let mut tx = state.db.begin().await?;
    let payment = ledger::record_salary_payment(&mut tx, auth.school_id, &body, today()).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Delete a salary payment; the record becomes unpaid again
#[utoipa::path(
    delete,
    path = "/api/v1/finance/salary-payments/{payment_id}",
    params(("payment_id" = Uuid, Path, description = "Salary payment ID")),
    responses(
        (status = 200, description = "Salary payment deleted", body = MessageResponse),
        (status = 404, description = "Salary payment not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Finance"
)]
pub async fn delete_salary_payment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(Resource::Finance, Action::Delete)?;
    let mut tx = state.db.begin().await?;
    ledger::delete_salary_payment(&mut tx, auth.school_id, payment_id).await?;
    tx.commit().await?;
    Ok(Json(MessageResponse::new("Salary payment deleted")))
}

// src/models/finance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Treasury ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Treasury {
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: String,
    /// Materialised sum of the journal; rewritten on every ledger event.
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTreasuryRequest {
    pub name: String,
    #[serde(default)]
    pub opening_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct TreasuryReconciliation {
    pub treasury_id: Uuid,
    pub stored_balance: Decimal,
    pub journal_balance: Decimal,
    pub drift: Decimal,
    pub corrected: bool,
}

// ─── Journal ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "ledger_source", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerSource {
    Opening,
    Manual,
    Payment,
    Expense,
    SalaryPayment,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TreasuryTransaction {
    pub id: Uuid,
    pub school_id: Uuid,
    pub treasury_id: Uuid,
    pub source_kind: LedgerSource,
    pub source_id: Option<Uuid>,
    pub reference: String,
    pub description: String,
    pub amount: Decimal,
    pub is_inflow: bool,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateManualEntryRequest {
    pub treasury_id: Uuid,
    pub amount: Decimal,
    pub is_inflow: bool,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub treasury_id: Option<Uuid>,
    pub source_kind: Option<LedgerSource>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ─── Invoices ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Partial,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Invoice {
    pub id: Uuid,
    pub school_id: Uuid,
    pub invoice_number: String,
    pub student_id: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub status: InvoiceStatus,
    pub sent_at: Option<DateTime<Utc>>,
    /// `YYYY-MM` for invoices raised by the monthly tuition run.
    pub billing_period: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn balance_due(&self) -> Decimal {
        (self.amount - self.amount_paid).max(Decimal::ZERO)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvoiceRequest {
    pub student_id: Uuid,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    pub amount: Decimal,
    /// Mark the invoice as sent on creation.
    #[serde(default)]
    pub send: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInvoiceRequest {
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub student_id: Option<Uuid>,
}

// ─── Payments ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub school_id: Uuid,
    pub invoice_id: Uuid,
    pub treasury_id: Uuid,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub invoice_id: Uuid,
    pub treasury_id: Uuid,
    pub amount: Decimal,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub invoice_id: Option<Uuid>,
    pub treasury_id: Option<Uuid>,
}

// ─── Expenses ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "expense_category", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    Utilities,
    Rent,
    Salaries,
    Supplies,
    Maintenance,
    Marketing,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Expense {
    pub id: Uuid,
    pub school_id: Uuid,
    pub purchase_order_id: Option<Uuid>,
    pub reference: String,
    pub vendor_id: Option<Uuid>,
    pub description: String,
    pub amount: Decimal,
    pub treasury_id: Uuid,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateExpenseRequest {
    pub treasury_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub description: String,
    pub amount: Decimal,
    pub date: Option<NaiveDate>,
    pub category: Option<ExpenseCategory>,
    #[serde(default)]
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpenseQuery {
    pub category: Option<ExpenseCategory>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ─── Purchase orders ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub school_id: Uuid,
    pub po_number: String,
    pub vendor_id: Uuid,
    pub item_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// `unit_price × quantity`, computed by the query.
    pub total: Decimal,
    pub order_date: NaiveDate,
    pub received: bool,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    pub vendor_id: Uuid,
    pub item_id: Uuid,
    pub quantity: i32,
    /// Defaults to the item's unit price.
    pub unit_price: Option<Decimal>,
    pub order_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReceivePurchaseOrderRequest {
    /// Defaults to the school's oldest treasury.
    pub treasury_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptOutcome {
    pub purchase_order: PurchaseOrder,
    /// Absent for zero-total orders, which post nothing to the ledger.
    pub expense: Option<Expense>,
    /// True when the order had been received before this call.
    pub already_received: bool,
}

// ─── Salary payments ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SalaryPayment {
    pub id: Uuid,
    pub school_id: Uuid,
    pub salary_record_id: Uuid,
    pub treasury_id: Uuid,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSalaryPaymentRequest {
    pub salary_record_id: Uuid,
    pub treasury_id: Uuid,
    /// Defaults to the record's net amount.
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
}

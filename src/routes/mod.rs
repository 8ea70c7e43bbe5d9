// src/routes/mod.rs

use crate::{
    handlers::{finance, hr, inventory, purchasing, reporting, school, student, treasury},
    state::AppState,
};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/core", core_routes())
        .nest("/student", student_routes())
        .nest("/hr", hr_routes())
        .nest("/finance", finance_routes())
        .nest("/inventory", inventory_routes())
        .nest("/reporting", reporting_routes())
}

fn core_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(school::register_school))
        .route("/auth/login", post(school::login))
        .route("/me", get(school::me))
        .route("/permissions", get(school::permissions))
        .route("/dashboard", get(school::dashboard))
        .route("/users", get(school::list_users).post(school::create_user))
        .route("/users/{user_id}", patch(school::update_user))
}

fn student_routes() -> Router<AppState> {
    Router::new()
        // ─── Classrooms ───────────────────────────────────────
        .route(
            "/classrooms",
            get(student::list_classrooms).post(student::create_classroom),
        )
        .route(
            "/classrooms/{classroom_id}",
            patch(student::update_classroom).delete(student::delete_classroom),
        )
        // ─── Students ─────────────────────────────────────────
        .route(
            "/students",
            get(student::list_students).post(student::create_student),
        )
        .route(
            "/students/{student_id}",
            get(student::get_student)
                .patch(student::update_student)
                .delete(student::deactivate_student),
        )
        .route(
            "/students/{student_id}/enrollments",
            get(student::list_enrollments),
        )
        .route(
            "/students/{student_id}/medical-records",
            get(student::list_medical_records),
        )
        .route(
            "/students/{student_id}/documents",
            get(student::list_student_documents),
        )
        .route(
            "/students/{student_id}/evaluations",
            get(student::list_evaluations),
        )
        // ─── Records ──────────────────────────────────────────
        .route("/enrollments", post(student::create_enrollment))
        .route(
            "/attendance",
            get(student::list_attendance).post(student::record_attendance),
        )
        .route("/medical-records", post(student::create_medical_record))
        .route("/documents", post(student::create_student_document))
        .route("/evaluations", post(student::create_evaluation))
        .route(
            "/documents/{document_id}",
            delete(student::delete_student_document),
        )
}

fn hr_routes() -> Router<AppState> {
    Router::new()
        .route("/staff", get(hr::list_staff).post(hr::create_staff))
        .route(
            "/staff/{staff_id}",
            get(hr::get_staff)
                .patch(hr::update_staff)
                .delete(hr::deactivate_staff),
        )
        .route(
            "/staff/{staff_id}/contract",
            get(hr::get_contract).put(hr::upsert_contract),
        )
        .route("/staff/{staff_id}/documents", get(hr::list_staff_documents))
        .route(
            "/staff/{staff_id}/evaluations",
            get(hr::list_staff_evaluations),
        )
        .route(
            "/salary-records",
            get(hr::list_salary_records).post(hr::create_salary_record),
        )
        .route(
            "/salary-records/generate",
            post(hr::generate_salary_records),
        )
        .route(
            "/salary-records/{record_id}",
            patch(hr::update_salary_record),
        )
        .route(
            "/attendance",
            get(hr::list_staff_attendance).post(hr::record_staff_attendance),
        )
        .route("/documents", post(hr::create_staff_document))
        .route(
            "/vacations",
            get(hr::list_vacations).post(hr::create_vacation),
        )
        .route("/vacations/{id}", delete(hr::delete_vacation))
        .route("/vacations/{id}/approve", post(hr::approve_vacation))
        .route("/evaluations", post(hr::create_staff_evaluation))
}

fn finance_routes() -> Router<AppState> {
    Router::new()
        // ─── Treasuries ───────────────────────────────────────
        .route(
            "/treasuries",
            get(treasury::list_treasuries).post(treasury::create_treasury),
        )
        .route("/treasuries/{treasury_id}", get(treasury::get_treasury))
        .route(
            "/treasuries/{treasury_id}/reconcile",
            get(treasury::check_reconciliation).post(treasury::reconcile),
        )
        .route(
            "/transactions",
            get(treasury::list_transactions).post(treasury::create_manual_entry),
        )
        .route(
            "/transactions/{entry_id}",
            delete(treasury::delete_manual_entry),
        )
        // ─── Invoices ─────────────────────────────────────────
        .route(
            "/invoices",
            get(finance::list_invoices).post(finance::create_invoice),
        )
        .route(
            "/invoices/generate-tuition",
            post(finance::generate_tuition),
        )
        .route(
            "/invoices/{invoice_id}",
            get(finance::get_invoice)
                .patch(finance::update_invoice)
                .delete(finance::delete_invoice),
        )
        .route("/invoices/{invoice_id}/send", post(finance::send_invoice))
        .route("/invoices/{invoice_id}/pdf", get(finance::invoice_pdf))
        .route("/invoices/{invoice_id}/email", post(finance::email_invoice))
        // ─── Payments ─────────────────────────────────────────
        .route(
            "/payments",
            get(finance::list_payments).post(finance::create_payment),
        )
        .route(
            "/payments/{payment_id}",
            delete(finance::delete_payment),
        )
        .route(
            "/payments/{payment_id}/receipt",
            get(finance::payment_receipt),
        )
        .route("/payments/{payment_id}/email", post(finance::email_receipt))
        // ─── Expenses ─────────────────────────────────────────
        .route(
            "/expenses",
            get(finance::list_expenses).post(finance::create_expense),
        )
        .route(
            "/expenses/{expense_id}",
            delete(finance::delete_expense),
        )
        // ─── Salary payments ──────────────────────────────────
        .route(
            "/salary-payments",
            get(finance::list_salary_payments).post(finance::create_salary_payment),
        )
        .route(
            "/salary-payments/{payment_id}",
            delete(finance::delete_salary_payment),
        )
        // ─── Purchase orders ──────────────────────────────────
        .route(
            "/purchase-orders",
            get(purchasing::list_purchase_orders).post(purchasing::create_purchase_order),
        )
        .route(
            "/purchase-orders/{po_id}",
            get(purchasing::get_purchase_order),
        )
        .route(
            "/purchase-orders/{po_id}/receive",
            post(purchasing::receive_purchase_order),
        )
        .route(
            "/purchase-orders/{po_id}/pdf",
            get(purchasing::purchase_order_pdf),
        )
}

fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/vendors",
            get(inventory::list_vendors).post(inventory::create_vendor),
        )
        .route(
            "/items",
            get(inventory::list_items).post(inventory::create_item),
        )
        .route(
            "/items/{item_id}",
            get(inventory::get_item)
                .patch(inventory::update_item)
                .delete(inventory::delete_item),
        )
        .route(
            "/custody",
            get(inventory::list_custody).post(inventory::create_custody),
        )
        .route(
            "/custody/{custody_id}/return",
            post(inventory::return_custody),
        )
        .route(
            "/stock-takes",
            get(inventory::list_stock_takes).post(inventory::create_stock_take),
        )
}

fn reporting_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/jobs",
            get(reporting::list_reports).post(reporting::create_report),
        )
        .route("/jobs/{job_id}", get(reporting::get_report))
        .route("/jobs/{job_id}/download", get(reporting::download_report))
}

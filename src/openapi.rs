// src/openapi.rs

use crate::{
    handlers::finance::GenerateTuitionRequest,
    models::{
        MessageResponse,
        finance::{
            CreateExpenseRequest, CreateInvoiceRequest, CreateManualEntryRequest,
            CreatePaymentRequest, CreatePurchaseOrderRequest, CreateSalaryPaymentRequest,
            CreateTreasuryRequest, Expense, ExpenseCategory, Invoice, InvoiceStatus, LedgerSource,
            Payment, PurchaseOrder, ReceiptOutcome, ReceivePurchaseOrderRequest, SalaryPayment,
            Treasury, TreasuryReconciliation, TreasuryTransaction, UpdateInvoiceRequest,
        },
        hr::{
            CreateSalaryRecordRequest, CreateStaffDocumentRequest, CreateStaffRequest,
            GenerateSalaryRecordsRequest, PayrollContract, RecordStaffAttendanceRequest,
            SalaryGenerationSummary, SalaryRecord, Staff, StaffAttendance, StaffAttendanceStatus,
            StaffDocument, StaffDocumentType, StaffRole, UpdateSalaryRecordRequest,
            UpdateStaffRequest, UpsertContractRequest, CreateStaffEvaluationRequest,
            CreateVacationRequest, StaffEvaluation, Vacation,
        },
        inventory::{
            CreateCustodyRequest, CreateItemRequest, CreateStockTakeRequest, CreateVendorRequest,
            CustodyAssignment, Item, ItemCategory, ReturnCustodyRequest, StockTake,
            UpdateItemRequest, Vendor,
        },
        reporting::{CreateReportRequest, ReportJob, ReportStatus, ReportType},
        school::{
            AuthResponse, Capability, CreateUserRequest, DashboardResponse, FinanceAnalytics,
            HrAnalytics, Kpis, LabelCount, LoginRequest, MonthlyAmount, MonthlyCount,
            PermissionsResponse, RegisterSchoolRequest, StudentAnalytics, UpdateUserRequest,
            UserPublic,
        },
        student::{
            Attendance, AttendanceStatus, Classroom, CreateClassroomRequest,
            CreateEnrollmentRequest, CreateMedicalRecordRequest, CreateStudentDocumentRequest,
            CreateStudentRequest, Enrollment, EnrollmentState, EnrollmentStatus, Gender,
            MedicalRecord, MedicalRecordType, RecordAttendanceRequest, Student, StudentDocument,
            StudentDocumentType, UpdateClassroomRequest, UpdateStudentRequest,
            CreateEvaluationRequest, Evaluation, EvaluationStatus,
        },
    },
    policy::{Action, Resource, Role},
    services::billing::TuitionRunSummary,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School ERP API",
        version = "1.0.0",
        description = "Multi-tenant school management: students, HR and payroll, \
            finance ledger, inventory, asynchronous reports and alerts.",
        license(name = "MIT")
    ),
    paths(
        crate::handlers::general::health_handler,
        // Core
        crate::handlers::school::register_school,
        crate::handlers::school::login,
        crate::handlers::school::me,
        crate::handlers::school::permissions,
        crate::handlers::school::dashboard,
        crate::handlers::school::list_users,
        crate::handlers::school::create_user,
        crate::handlers::school::update_user,
        // Student
        crate::handlers::student::list_classrooms,
        crate::handlers::student::create_classroom,
        crate::handlers::student::update_classroom,
        crate::handlers::student::delete_classroom,
        crate::handlers::student::list_students,
        crate::handlers::student::create_student,
        crate::handlers::student::get_student,
        crate::handlers::student::update_student,
        crate::handlers::student::deactivate_student,
        crate::handlers::student::list_enrollments,
        crate::handlers::student::create_enrollment,
        crate::handlers::student::record_attendance,
        crate::handlers::student::list_attendance,
        crate::handlers::student::create_medical_record,
        crate::handlers::student::list_medical_records,
        crate::handlers::student::create_student_document,
        crate::handlers::student::list_student_documents,
        crate::handlers::student::delete_student_document,
        crate::handlers::student::create_evaluation,
        crate::handlers::student::list_evaluations,
        // HR
        crate::handlers::hr::list_staff,
        crate::handlers::hr::create_staff,
        crate::handlers::hr::get_staff,
        crate::handlers::hr::update_staff,
        crate::handlers::hr::deactivate_staff,
        crate::handlers::hr::upsert_contract,
        crate::handlers::hr::get_contract,
        crate::handlers::hr::list_salary_records,
        crate::handlers::hr::create_salary_record,
        crate::handlers::hr::update_salary_record,
        crate::handlers::hr::generate_salary_records,
        crate::handlers::hr::record_staff_attendance,
        crate::handlers::hr::list_staff_attendance,
        crate::handlers::hr::create_staff_document,
        crate::handlers::hr::list_staff_documents,
        crate::handlers::hr::create_vacation,
        crate::handlers::hr::list_vacations,
        crate::handlers::hr::approve_vacation,
        crate::handlers::hr::delete_vacation,
        crate::handlers::hr::create_staff_evaluation,
        crate::handlers::hr::list_staff_evaluations,
        // Finance
        crate::handlers::treasury::list_treasuries,
        crate::handlers::treasury::create_treasury,
        crate::handlers::treasury::get_treasury,
        crate::handlers::treasury::check_reconciliation,
        crate::handlers::treasury::reconcile,
        crate::handlers::treasury::list_transactions,
        crate::handlers::treasury::create_manual_entry,
        crate::handlers::treasury::delete_manual_entry,
        crate::handlers::finance::list_invoices,
        crate::handlers::finance::create_invoice,
        crate::handlers::finance::get_invoice,
        crate::handlers::finance::update_invoice,
        crate::handlers::finance::delete_invoice,
        crate::handlers::finance::send_invoice,
        crate::handlers::finance::invoice_pdf,
        crate::handlers::finance::email_invoice,
        crate::handlers::finance::generate_tuition,
        crate::handlers::finance::list_payments,
        crate::handlers::finance::create_payment,
        crate::handlers::finance::delete_payment,
        crate::handlers::finance::payment_receipt,
        crate::handlers::finance::email_receipt,
        crate::handlers::finance::list_expenses,
        crate::handlers::finance::create_expense,
        crate::handlers::finance::delete_expense,
        crate::handlers::finance::list_salary_payments,
        crate::handlers::finance::create_salary_payment,
        crate::handlers::finance::delete_salary_payment,
        crate::handlers::purchasing::list_purchase_orders,
        crate::handlers::purchasing::create_purchase_order,
        crate::handlers::purchasing::get_purchase_order,
        crate::handlers::purchasing::receive_purchase_order,
        crate::handlers::purchasing::purchase_order_pdf,
        // Inventory
        crate::handlers::inventory::list_vendors,
        crate::handlers::inventory::create_vendor,
        crate::handlers::inventory::list_items,
        crate::handlers::inventory::create_item,
        crate::handlers::inventory::get_item,
        crate::handlers::inventory::update_item,
        crate::handlers::inventory::delete_item,
        crate::handlers::inventory::create_custody,
        crate::handlers::inventory::list_custody,
        crate::handlers::inventory::return_custody,
        crate::handlers::inventory::create_stock_take,
        crate::handlers::inventory::list_stock_takes,
        // Reporting
        crate::handlers::reporting::create_report,
        crate::handlers::reporting::list_reports,
        crate::handlers::reporting::get_report,
        crate::handlers::reporting::download_report,
    ),
    components(
        schemas(
            MessageResponse, Role, Resource, Action,
            RegisterSchoolRequest, LoginRequest, AuthResponse, UserPublic,
            CreateUserRequest, UpdateUserRequest, Capability, PermissionsResponse,
            DashboardResponse, Kpis, MonthlyCount, MonthlyAmount, LabelCount,
            StudentAnalytics, FinanceAnalytics, HrAnalytics,
            Classroom, CreateClassroomRequest, UpdateClassroomRequest,
            Gender, EnrollmentStatus, Student, CreateStudentRequest, UpdateStudentRequest,
            EnrollmentState, Enrollment, CreateEnrollmentRequest,
            AttendanceStatus, Attendance, RecordAttendanceRequest,
            MedicalRecordType, MedicalRecord, CreateMedicalRecordRequest,
            StudentDocumentType, StudentDocument, CreateStudentDocumentRequest,
            EvaluationStatus, Evaluation, CreateEvaluationRequest,
            StaffRole, Staff, CreateStaffRequest, UpdateStaffRequest,
            PayrollContract, UpsertContractRequest,
            SalaryRecord, CreateSalaryRecordRequest, UpdateSalaryRecordRequest,
            GenerateSalaryRecordsRequest, SalaryGenerationSummary,
            StaffAttendanceStatus, StaffAttendance, RecordStaffAttendanceRequest,
            StaffDocumentType, StaffDocument, CreateStaffDocumentRequest,
            Vacation, CreateVacationRequest, StaffEvaluation, CreateStaffEvaluationRequest,
            Treasury, CreateTreasuryRequest, TreasuryReconciliation,
            LedgerSource, TreasuryTransaction, CreateManualEntryRequest,
            InvoiceStatus, Invoice, CreateInvoiceRequest, UpdateInvoiceRequest,
            GenerateTuitionRequest, TuitionRunSummary,
            Payment, CreatePaymentRequest,
            ExpenseCategory, Expense, CreateExpenseRequest,
            PurchaseOrder, CreatePurchaseOrderRequest, ReceivePurchaseOrderRequest, ReceiptOutcome,
            SalaryPayment, CreateSalaryPaymentRequest,
            Vendor, CreateVendorRequest, ItemCategory, Item, CreateItemRequest, UpdateItemRequest,
            CustodyAssignment, CreateCustodyRequest, ReturnCustodyRequest,
            StockTake, CreateStockTakeRequest,
            ReportType, ReportStatus, ReportJob, CreateReportRequest,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "General", description = "Service health"),
        (name = "Core", description = "Schools, users, permissions and the dashboard"),
        (name = "Student", description = "Classrooms, students, attendance, medical records and documents"),
        (name = "HR", description = "Staff, contracts, salary records, attendance and documents"),
        (name = "Finance", description = "Treasuries, invoices, payments, expenses, salaries and purchase orders"),
        (name = "Inventory", description = "Vendors, items, custody and stock takes"),
        (name = "Reporting", description = "Queue, track and download reports"),
    )
)]
pub struct ApiDoc;

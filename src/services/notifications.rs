// src/services/notifications.rs
//
// Scheduled alert emails and guardian document emails.

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    policy::{self, Action, Resource, Role},
    services::{
        email::{self, Attachment, Mailer, OutgoingEmail},
        reports::{self, RenderedDocument},
    },
};
use chrono::{Duration, NaiveDate};
use sqlx::PgPool;
use std::{collections::BTreeSet, sync::Arc};
use tracing::{debug, error, info};
use uuid::Uuid;

pub const EXPIRY_WINDOW_DAYS: i64 = 30;

// ─── Recipients ──────────────────────────────────────────────────────────────

/// Users allowed to read `resource`, plus the global alert list, deduplicated.
pub fn merge_recipients(users: &[(String, Role)], resource: Resource, extra: &[String]) -> Vec<String> {
    let readers = policy::roles_with(resource, Action::Read);
    let mut seen = BTreeSet::new();
    users
        .iter()
        .filter(|(_, role)| readers.contains(role))
        .map(|(email, _)| email.as_str())
        .chain(extra.iter().map(String::as_str))
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .filter(|email| seen.insert(email.to_lowercase()))
        .map(str::to_string)
        .collect()
}

async fn recipients(pool: &PgPool, school_id: Uuid, resource: Resource, extra: &[String]) -> AppResult<Vec<String>> {
    let users = sqlx::query_as::<_, (String, Role)>(
        "SELECT email, role FROM users WHERE school_id = $1 AND is_active ORDER BY email",
    )
    .bind(school_id)
    .fetch_all(pool)
    .await?;
    Ok(merge_recipients(&users, resource, extra))
}

async fn schools(pool: &PgPool) -> AppResult<Vec<(Uuid, String)>> {
    let rows = sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM schools ORDER BY created_at")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

fn alert(to: Vec<String>, subject: String, lines: &[String], intro: &str) -> OutgoingEmail {
    let mut text_body = format!("{intro}\n\n");
    for line in lines {
        text_body.push_str("- ");
        text_body.push_str(line);
        text_body.push('\n');
    }
    OutgoingEmail {
        to,
        subject,
        text_body,
        html_body: None,
        attachment: None,
    }
}

/// Send one alert per school whose `lines` are not empty. Returns the number of emails sent.
async fn send_alerts<F, Fut>(
    pool: &PgPool,
    mailer: &dyn Mailer,
    config: &Config,
    kind: &str,
    resource: Resource,
    mut collect: F,
    compose: fn(&str, &[String]) -> (String, String),
) -> AppResult<usize>
where
    F: FnMut(Uuid) -> Fut,
    Fut: std::future::Future<Output = AppResult<Vec<String>>>,
{
    let mut sent = 0;
    for (school_id, school_name) in schools(pool).await? {
        let lines = collect(school_id).await?;
        if lines.is_empty() {
            continue;
        }
        let to = recipients(pool, school_id, resource, &config.alert_recipients).await?;
        if to.is_empty() {
            debug!(school_id = %school_id, alert = kind, "no recipients for alert");
            continue;
        }
        let (subject, intro) = compose(&school_name, &lines);
        match email::deliver(mailer, &alert(to, subject, &lines, &intro)).await {
            Ok(()) => sent += 1,
            Err(e) => error!(school_id = %school_id, alert = kind, error = %e, "alert not sent"),
        }
    }
    if sent > 0 {
        info!(alert = kind, emails = sent, "alerts sent");
    }
    Ok(sent)
}

// ─── Alerts ──────────────────────────────────────────────────────────────────

pub fn low_stock_message(school: &str, lines: &[String]) -> (String, String) {
    (
        format!("[{school}] Low stock: {} item(s)", lines.len()),
        "The following items are at or below their reorder level:".to_string(),
    )
}

pub fn document_expiry_message(school: &str, lines: &[String]) -> (String, String) {
    (
        format!("[{school}] {} document(s) expired or expiring soon", lines.len()),
        format!("These documents have expired or expire within {EXPIRY_WINDOW_DAYS} days:"),
    )
}

pub fn contract_expiry_message(school: &str, lines: &[String]) -> (String, String) {
    (
        format!("[{school}] {} contract(s) ended or ending soon", lines.len()),
        format!("These payroll contracts have ended or end within {EXPIRY_WINDOW_DAYS} days:"),
    )
}

/// One alert line; dates before `today` read as already lapsed.
pub fn expiry_line(subject: &str, what: &str, date: NaiveDate, today: NaiveDate) -> String {
    let verb = if date < today { "expired" } else { "expires" };
    format!("{subject}: {what} {verb} {date}")
}

pub async fn low_stock_alert(pool: &PgPool, mailer: &dyn Mailer, config: &Config) -> AppResult<usize> {
    send_alerts(
        pool,
        mailer,
        config,
        "low_stock",
        Resource::Inventory,
        |school_id| async move {
            let items = sqlx::query_as::<_, (String, String, i32, i32)>(
                r#"SELECT name, sku, quantity, reorder_level FROM items
                   WHERE school_id = $1 AND quantity <= reorder_level
                   ORDER BY quantity, name"#,
            )
            .bind(school_id)
            .fetch_all(pool)
            .await?;
            Ok::<_, AppError>(items
                .into_iter()
                .map(|(name, sku, qty, reorder)| format!("{name} ({sku}): {qty} left, reorder at {reorder}"))
                .collect())
        },
        low_stock_message,
    )
    .await
}

/// Student documents expiring by `today + EXPIRY_WINDOW_DAYS`, lapsed ones included.
pub async fn expiring_student_documents(pool: &PgPool, school_id: Uuid, today: NaiveDate) -> AppResult<Vec<String>> {
    let cutoff = today + Duration::days(EXPIRY_WINDOW_DAYS);
    let docs = sqlx::query_as::<_, (String, String, NaiveDate)>(
        r#"SELECT s.first_name || ' ' || s.last_name, d.doc_type::text, d.expiration_date
           FROM student_documents d JOIN students s ON s.id = d.student_id
           WHERE d.school_id = $1 AND d.expiration_date <= $2
           ORDER BY d.expiration_date, 1"#,
    )
    .bind(school_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(docs
        .into_iter()
        .map(|(owner, doc, expires)| expiry_line(&owner, &doc.to_uppercase(), expires, today))
        .collect())
}

pub async fn expiring_staff_documents(pool: &PgPool, school_id: Uuid, today: NaiveDate) -> AppResult<Vec<String>> {
    let cutoff = today + Duration::days(EXPIRY_WINDOW_DAYS);
    let docs = sqlx::query_as::<_, (String, String, NaiveDate)>(
        r#"SELECT s.first_name || ' ' || s.last_name, d.doc_type::text, d.expiration_date
           FROM staff_documents d JOIN staff s ON s.id = d.staff_id
           WHERE d.school_id = $1 AND s.is_active AND d.expiration_date <= $2
           ORDER BY d.expiration_date, 1"#,
    )
    .bind(school_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(docs
        .into_iter()
        .map(|(owner, doc, expires)| expiry_line(&owner, &doc.to_uppercase(), expires, today))
        .collect())
}

pub async fn ending_contracts(pool: &PgPool, school_id: Uuid, today: NaiveDate) -> AppResult<Vec<String>> {
    let cutoff = today + Duration::days(EXPIRY_WINDOW_DAYS);
    let contracts = sqlx::query_as::<_, (String, NaiveDate)>(
        r#"SELECT s.first_name || ' ' || s.last_name, c.contract_end
           FROM payroll_contracts c JOIN staff s ON s.id = c.staff_id
           WHERE c.school_id = $1 AND s.is_active AND c.contract_end <= $2
           ORDER BY c.contract_end, 1"#,
    )
    .bind(school_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(contracts
        .into_iter()
        .map(|(name, end)| {
            let verb = if end < today { "ended" } else { "ends" };
            format!("{name}: contract {verb} {end}")
        })
        .collect())
}

/// Student documents go to student readers, staff documents to staff readers.
pub async fn document_expiry_alert(
    pool: &PgPool,
    mailer: &dyn Mailer,
    config: &Config,
    today: NaiveDate,
) -> AppResult<usize> {
    let students = send_alerts(
        pool,
        mailer,
        config,
        "student_document_expiry",
        Resource::Students,
        |school_id| expiring_student_documents(pool, school_id, today),
        document_expiry_message,
    )
    .await?;
    let staff = send_alerts(
        pool,
        mailer,
        config,
        "staff_document_expiry",
        Resource::Staff,
        |school_id| expiring_staff_documents(pool, school_id, today),
        document_expiry_message,
    )
    .await?;
    Ok(students + staff)
}

pub async fn contract_expiry_alert(
    pool: &PgPool,
    mailer: &dyn Mailer,
    config: &Config,
    today: NaiveDate,
) -> AppResult<usize> {
    send_alerts(
        pool,
        mailer,
        config,
        "contract_expiry",
        Resource::Payroll,
        |school_id| ending_contracts(pool, school_id, today),
        contract_expiry_message,
    )
    .await
}

// ─── Guardian emails ─────────────────────────────────────────────────────────

async fn guardian_email(pool: &PgPool, school_id: Uuid, invoice_id: Uuid) -> AppResult<(String, String)> {
    let (guardian, email) = sqlx::query_as::<_, (String, Option<String>)>(
        r#"SELECT s.guardian_name, s.guardian_email
           FROM invoices i JOIN students s ON s.id = i.student_id
           WHERE i.id = $1 AND i.school_id = $2"#,
    )
    .bind(invoice_id)
    .bind(school_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Invoice {invoice_id} not found")))?;

    match email.filter(|e| !e.trim().is_empty()) {
        Some(email) => Ok((guardian, email)),
        None => Err(AppError::BadRequest(
            "The student's guardian has no email address".to_string(),
        )),
    }
}

fn with_document(to: String, subject: String, text_body: String, doc: RenderedDocument) -> OutgoingEmail {
    OutgoingEmail {
        to: vec![to],
        subject,
        text_body,
        html_body: None,
        attachment: Some(Attachment {
            file_name: doc.file_name,
            content_type: doc.content_type.to_string(),
            bytes: doc.bytes,
        }),
    }
}

/// Render the invoice PDF and address it to the guardian.
pub async fn invoice_email(pool: &PgPool, school_id: Uuid, invoice_id: Uuid) -> AppResult<OutgoingEmail> {
    let (guardian, to) = guardian_email(pool, school_id, invoice_id).await?;
    let doc = reports::invoice_document(pool, school_id, invoice_id).await?;
    let number = doc.file_name.trim_end_matches(".pdf").to_string();
    Ok(with_document(
        to,
        format!("Invoice {number}"),
        format!("Dear {guardian},\n\nPlease find invoice {number} attached.\n"),
        doc,
    ))
}

pub async fn receipt_email(pool: &PgPool, school_id: Uuid, payment_id: Uuid) -> AppResult<OutgoingEmail> {
    let invoice_id: Uuid =
        sqlx::query_scalar("SELECT invoice_id FROM payments WHERE id = $1 AND school_id = $2")
            .bind(payment_id)
            .bind(school_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment {payment_id} not found")))?;
    let (guardian, to) = guardian_email(pool, school_id, invoice_id).await?;
    let doc = reports::receipt_document(pool, school_id, payment_id).await?;
    Ok(with_document(
        to,
        "Payment receipt".to_string(),
        format!("Dear {guardian},\n\nThank you for your payment. Your receipt is attached.\n"),
        doc,
    ))
}

/// Deliver in the background; the caller has already answered the request.
pub fn send_in_background(mailer: Arc<dyn Mailer>, email: OutgoingEmail) {
    tokio::spawn(async move {
        // Failures are logged by `deliver`.
        let _ = email::deliver(mailer.as_ref(), &email).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_follow_the_policy_and_dedupe() {
        let users = vec![
            ("admin@school.test".to_string(), Role::Administrator),
            ("stock@school.test".to_string(), Role::InventoryManager),
            ("teacher@school.test".to_string(), Role::Teacher),
        ];
        let extra = vec!["Admin@School.test".to_string(), "ops@school.test".to_string()];
        assert_eq!(
            merge_recipients(&users, Resource::Inventory, &extra),
            vec!["admin@school.test", "stock@school.test", "ops@school.test"]
        );
    }

    #[test]
    fn no_readers_and_no_extras_means_nobody() {
        let users = vec![("teacher@school.test".to_string(), Role::Teacher)];
        assert!(merge_recipients(&users, Resource::Payroll, &[]).is_empty());
    }

    #[test]
    fn alert_body_lists_each_line() {
        let lines = vec!["Crayons (CR-1): 2 left, reorder at 5".to_string()];
        let (subject, intro) = low_stock_message("Little Oaks", &lines);
        let email = alert(vec!["a@b.test".into()], subject, &lines, &intro);
        assert_eq!(email.subject, "[Little Oaks] Low stock: 1 item(s)");
        assert!(email.text_body.contains("- Crayons (CR-1): 2 left, reorder at 5\n"));
    }

    #[test]
    fn staff_document_alerts_reach_hr() {
        let users = vec![
            ("hr@school.test".to_string(), Role::HrManager),
            ("teacher@school.test".to_string(), Role::Teacher),
        ];
        let staff = merge_recipients(&users, Resource::Staff, &[]);
        assert!(staff.contains(&"hr@school.test".to_string()));
        assert!(!staff.contains(&"teacher@school.test".to_string()));
    }

    #[test]
    fn lapsed_dates_read_as_expired() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let past = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let soon = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        assert_eq!(
            expiry_line("Ana Ruiz", "PASSPORT", past, today),
            "Ana Ruiz: PASSPORT expired 2025-02-01"
        );
        assert_eq!(
            expiry_line("Ana Ruiz", "PASSPORT", soon, today),
            "Ana Ruiz: PASSPORT expires 2025-03-20"
        );
        assert_eq!(
            expiry_line("Ana Ruiz", "PASSPORT", today, today),
            "Ana Ruiz: PASSPORT expires 2025-03-10"
        );
    }
}

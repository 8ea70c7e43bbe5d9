// src/services/email.rs

use crate::{
    config::{Config, SmtpSettings},
    errors::AppError,
    services::retry::{RetryPolicy, retry},
};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: Option<String>,
    pub attachment: Option<Attachment>,
}

/// Delivery backend. Production uses SMTP; without SMTP settings mail is only logged.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError>;
}

pub fn build_mailer(config: &Config) -> Result<Arc<dyn Mailer>, AppError> {
    match &config.smtp {
        Some(smtp) => Ok(Arc::new(SmtpMailer::new(
            smtp,
            &config.email_from_name,
            &config.email_from_address,
        )?)),
        None => {
            info!("SMTP_HOST not set, outgoing mail will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Send with the email retry policy; the final failure is logged and returned.
pub async fn deliver(mailer: &dyn Mailer, email: &OutgoingEmail) -> Result<(), AppError> {
    let result = retry(RetryPolicy::EMAIL, "email", || mailer.send(email)).await;
    match &result {
        Ok(()) => info!(to = ?email.to, subject = %email.subject, "email delivered"),
        Err(e) => error!(to = ?email.to, subject = %email.subject, error = %e, "email delivery failed"),
    }
    result
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpSettings, from_name: &str, from_address: &str) -> Result<Self, AppError> {
        let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(|e| AppError::EmailError(e.to_string()))?
            .credentials(creds)
            .port(smtp.port)
            .build();

        let from = format!("{from_name} <{from_address}>")
            .parse()
            .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        let message = build_message(self.from.clone(), email)?;
        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| AppError::EmailError(e.to_string()))
    }
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        info!(
            to = ?email.to,
            subject = %email.subject,
            attachment = email.attachment.as_ref().map(|a| a.file_name.as_str()),
            "mail (log only)"
        );
        Ok(())
    }
}

fn build_message(from: Mailbox, email: &OutgoingEmail) -> Result<Message, AppError> {
    if email.to.is_empty() {
        return Err(AppError::EmailError("no recipients".to_string()));
    }

    let mut builder = Message::builder().from(from).subject(email.subject.clone());
    for address in &email.to {
        let mailbox: Mailbox = address
            .parse()
            .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?;
        builder = builder.to(mailbox);
    }

    let text = SinglePart::builder()
        .header(ContentType::TEXT_PLAIN)
        .body(email.text_body.clone());

    let body = match &email.html_body {
        Some(html) => MultiPart::alternative().singlepart(text).singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(html.clone()),
        ),
        None => MultiPart::mixed().singlepart(text),
    };

    let body = match &email.attachment {
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| AppError::EmailError(e.to_string()))?;
            MultiPart::mixed().multipart(body).singlepart(
                MailAttachment::new(attachment.file_name.clone())
                    .body(attachment.bytes.clone(), content_type),
            )
        }
        None => body,
    };

    builder
        .multipart(body)
        .map_err(|e| AppError::EmailError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &[&str]) -> OutgoingEmail {
        OutgoingEmail {
            to: to.iter().map(|s| s.to_string()).collect(),
            subject: "Invoice INV-0001".into(),
            text_body: "Please find your invoice attached.".into(),
            html_body: None,
            attachment: Some(Attachment {
                file_name: "INV-0001.pdf".into(),
                content_type: "application/pdf".into(),
                bytes: b"%PDF-1.3".to_vec(),
            }),
        }
    }

    fn from() -> Mailbox {
        "School ERP <no-reply@school.test>".parse().unwrap()
    }

    #[test]
    fn builds_a_message_with_an_attachment() {
        let message = build_message(from(), &email(&["guardian@family.test"])).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: guardian@family.test"));
        assert!(raw.contains("INV-0001.pdf"));
        assert!(raw.contains("application/pdf"));
    }

    #[test]
    fn rejects_empty_and_malformed_recipients() {
        assert!(build_message(from(), &email(&[])).is_err());
        assert!(build_message(from(), &email(&["not an address"])).is_err());
    }

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        assert!(deliver(&LogMailer, &email(&["a@b.test"])).await.is_ok());
    }
}

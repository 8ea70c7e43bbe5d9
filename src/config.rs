use anyhow::{Context, anyhow};
use dotenvy::dotenv;
use std::{env, path::PathBuf, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    /// `None` switches the service to the log-only mailer.
    pub smtp: Option<SmtpSettings>,
    pub email_from_name: String,
    pub email_from_address: String,
    pub alert_recipients: Vec<String>,
    pub report_dir: PathBuf,
    pub report_workers: usize,
    pub report_max_attempts: i32,
    pub report_time_limit: Duration,
    pub report_pending_timeout: Duration,
    pub report_janitor_interval: Duration,
    pub invoice_due_days: i64,
    pub daily_jobs_hour: u32,
    pub scheduler_enabled: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let smtp = match lookup("SMTP_HOST").filter(|h| !h.trim().is_empty()) {
            Some(host) => Some(SmtpSettings {
                host,
                port: parse(&lookup, "SMTP_PORT", "587")?,
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
            }),
            None => None,
        };

        let alert_recipients = lookup("ALERT_RECIPIENTS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let daily_jobs_hour: u32 = parse(&lookup, "DAILY_JOBS_HOUR", "5")?;
        if daily_jobs_hour > 23 {
            return Err(anyhow!("DAILY_JOBS_HOUR must be between 0 and 23"));
        }

        Ok(Self {
            server_host: or_default("SERVER_HOST", "127.0.0.1"),
            server_port: parse(&lookup, "SERVER_PORT", "3000")?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", "20")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_hours: parse(&lookup, "JWT_EXPIRY_HOURS", "24")?,
            smtp,
            email_from_name: or_default("EMAIL_FROM_NAME", "School ERP"),
            email_from_address: or_default("EMAIL_FROM_ADDRESS", "no-reply@school-erp.local"),
            alert_recipients,
            report_dir: PathBuf::from(or_default("REPORT_DIR", "./var/reports")),
            report_workers: parse::<usize, _>(&lookup, "REPORT_WORKERS", "2")?.max(1),
            report_max_attempts: parse::<i32, _>(&lookup, "REPORT_MAX_ATTEMPTS", "3")?.max(1),
            report_time_limit: secs(&lookup, "REPORT_TIME_LIMIT_SECS", "1800")?,
            report_pending_timeout: secs(&lookup, "REPORT_PENDING_TIMEOUT_SECS", "600")?,
            report_janitor_interval: secs(&lookup, "REPORT_JANITOR_INTERVAL_SECS", "300")?,
            invoice_due_days: parse(&lookup, "INVOICE_DUE_DAYS", "10")?,
            daily_jobs_hour,
            scheduler_enabled: parse(&lookup, "SCHEDULER_ENABLED", "true")?,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value: {raw:?}"))
}

fn secs<F>(lookup: &F, key: &str, default: &str) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse::<u64, F>(lookup, key, default).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults_when_only_required_keys_are_set() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/erp"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.server_addr(), "127.0.0.1:3000");
        assert!(config.smtp.is_none());
        assert_eq!(config.report_workers, 2);
        assert_eq!(config.report_max_attempts, 3);
        assert_eq!(config.report_time_limit, Duration::from_secs(1800));
        assert_eq!(config.invoice_due_days, 10);
        assert!(config.scheduler_enabled);
        assert!(config.alert_recipients.is_empty());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("JWT_SECRET", "secret")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn smtp_host_requires_credentials() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/erp"),
            ("JWT_SECRET", "secret"),
            ("SMTP_HOST", "smtp.example.com"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SMTP_USERNAME"));
    }

    #[test]
    fn parses_alert_recipients_and_rejects_bad_numbers() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/erp"),
            ("JWT_SECRET", "secret"),
            ("ALERT_RECIPIENTS", " ops@school.test, ,bursar@school.test "),
        ]))
        .unwrap();
        assert_eq!(
            config.alert_recipients,
            vec!["ops@school.test".to_string(), "bursar@school.test".to_string()]
        );

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/erp"),
            ("JWT_SECRET", "secret"),
            ("SERVER_PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }
}

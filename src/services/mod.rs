pub mod analytics;
pub mod billing;
pub mod documents;
pub mod email;
pub mod jobs;
pub mod ledger;
pub mod notifications;
pub mod numbering;
pub mod payroll;
pub mod reports;
pub mod retry;
pub mod scheduler;

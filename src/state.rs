use crate::{
    config::Config,
    services::{email::Mailer, jobs::ReportQueue},
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    /// Wakes the report workers.
    pub reports: ReportQueue,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: PgPool, config: Arc<Config>, reports: ReportQueue, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            config,
            reports,
            mailer,
        }
    }
}

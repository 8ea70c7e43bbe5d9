// src/models/mod.rs

pub mod finance;
pub mod hr;
pub mod inventory;
pub mod reporting;
pub mod school;
pub mod student;

use crate::policy::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── JWT Claims ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub school: String,
    pub role: Role,
    pub name: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

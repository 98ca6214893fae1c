// src/handlers/mod.rs

pub mod auth;
pub mod survey;

use uuid::Uuid;

use crate::error::AppError;

/// Path ids that are not UUIDs can never match a stored document.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("{} not found", what)))
}

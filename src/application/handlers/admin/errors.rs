//! Errors reachable from the administrative surface.

use thiserror::Error;

use crate::config::ValidationError as ConfigValidationError;
use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
use crate::domain::hooks::HookRegistryError;
use crate::domain::patterns::PatternExtractionError;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Registry(#[from] HookRegistryError),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error(transparent)]
    Extraction(#[from] PatternExtractionError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    #[error(transparent)]
    Event(#[from] DomainError),
}

impl AdminError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AdminError::Registry(e) => e.code(),
            AdminError::InvalidRequest(_) => ErrorCode::ValidationFailed,
            AdminError::Extraction(e) => e.code(),
            AdminError::InvalidConfig(e) => e.code(),
            AdminError::Event(e) => e.code,
        }
    }
}

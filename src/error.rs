use thiserror::Error;

use crate::store::StorageError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SchedulerError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        SchedulerError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        SchedulerError::InvalidOperation(message.into())
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

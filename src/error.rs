use thiserror::Error;

use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Validation failed for field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Invalid value '{value}' for field '{field}'. Valid values: {}", valid.join(", "))]
    InvalidEnumValue {
        field: String,
        value: String,
        valid: Vec<String>,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CrmError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        CrmError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn inquiry_not_found() -> Self {
        CrmError::NotFound("Inquiry".to_string())
    }
}

// Implement From for rusqlite::Error
impl From<rusqlite::Error> for CrmError {
    fn from(e: rusqlite::Error) -> Self {
        CrmError::Storage(format!("SQLite error: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;

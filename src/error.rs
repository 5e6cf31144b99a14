//! Error types for query building and execution

use thiserror::Error;

/// Errors that can occur while building or executing statements
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuestError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: u32 },

    #[error("Concurrent update on quests of {0}, retry later")]
    Conflict(String),

    #[error("Invalid stored document: {0}")]
    InvalidDocument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for QuestError {
    fn from(error: tokio::task::JoinError) -> Self {
        QuestError::Internal(format!("blocking task failed: {error}"))
    }
}

impl QuestError {
    pub fn status(&self) -> StatusCode {
        match self {
            QuestError::Unauthorized => StatusCode::UNAUTHORIZED,
            QuestError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
            QuestError::Conflict(_) => StatusCode::CONFLICT,
            QuestError::InvalidDocument(_)
            | QuestError::Config(_)
            | QuestError::Database(_)
            | QuestError::Json(_)
            | QuestError::Io(_)
            | QuestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for QuestError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Storage details stay in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, QuestError>;

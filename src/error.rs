//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Message returned for every policy denial.
pub const NOT_ALLOWED: &str = "Not allowed!";

const GENERIC_STORAGE_MESSAGE: &str = "database error";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("unknown column: {table}.{column}")]
    UnknownColumn { table: String, column: String },
    #[error("unknown verb '{verb}' for role {role} on table {table}")]
    UnknownVerb { role: String, table: String, verb: String },
    #[error("catalog: {0}")]
    Catalog(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Not allowed!")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("request exceeded {0} ms deadline")]
    Timeout(u64),
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Message placed in the `Error` field. Storage detail is only exposed when `expose_db_errors` is set.
    pub fn public_message(&self, expose_db_errors: bool) -> String {
        match self {
            AppError::Unauthorized => NOT_ALLOWED.to_string(),
            AppError::Db(e) if expose_db_errors => e.to_string(),
            AppError::Db(_) => GENERIC_STORAGE_MESSAGE.to_string(),
            AppError::Config(_) if !expose_db_errors => "configuration error".to_string(),
            AppError::Internal(_) if !expose_db_errors => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// Builds the `{ "Error": ... }` response.
    pub fn into_response_with(self, expose_db_errors: bool) -> Response {
        match &self {
            AppError::Db(e) => tracing::error!(error = %e, "storage error"),
            AppError::Internal(msg) => tracing::error!(error = %msg, "internal error"),
            _ => {}
        }
        let status = self.status();
        let body = crate::response::error_body(&self.public_message(expose_db_errors));
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_with(false)
    }
}

//! Response shapes written by the CRUD hook.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// Outcome of one handled request, before serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum CrudReply {
    /// Id-scoped read: a single object.
    One(Value),
    /// Collection read: always an array, possibly empty.
    Many(Vec<Value>),
    /// Row written by post (plain or versioned).
    Created(Value),
    /// Row written by put; for versioned tables this is the new version.
    Updated(Value),
    Deleted { affected_rows: u64 },
}

impl CrudReply {
    pub fn status(&self) -> StatusCode {
        match self {
            CrudReply::Created(_) => StatusCode::CREATED,
            _ => StatusCode::OK,
        }
    }

    pub fn into_body(self) -> Value {
        match self {
            CrudReply::One(v) | CrudReply::Created(v) | CrudReply::Updated(v) => v,
            CrudReply::Many(rows) => Value::Array(rows),
            CrudReply::Deleted { affected_rows } => serde_json::json!({ "affectedRows": affected_rows }),
        }
    }
}

impl IntoResponse for CrudReply {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.into_body())).into_response()
    }
}

pub fn error_body(message: &str) -> Value {
    serde_json::json!({ "Error": message })
}

//! CRUD middleware: takes requests under either prefix, declines everything else.

use crate::error::AppError;
use crate::extractors::CallerRole;
use crate::policy::Verb;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::Instrument;

/// Largest JSON body read for post/put.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub async fn crud_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(mut crud) = state.router.route(req.method().as_str(), req.uri().path(), Vec::new()) else {
        return next.run(req).await;
    };
    let expose = state.engine.config().runtime_errors;

    if req.uri().query().is_some() {
        match Query::<Vec<(String, String)>>::try_from_uri(req.uri()) {
            Ok(Query(pairs)) => crud.query = pairs,
            Err(e) => return AppError::BadRequest(format!("query string: {}", e)).into_response_with(expose),
        }
    }

    let (parts, body) = req.into_parts();
    let role = CallerRole::from_extensions(&parts.extensions);
    let body = match crud.verb {
        Verb::Post | Verb::Put => match read_json(body).await {
            Ok(v) => v,
            Err(e) => return e.into_response_with(expose),
        },
        Verb::Get | Verb::Delete => None,
    };

    let span = tracing::info_span!(
        "crud",
        verb = %crud.verb,
        table = %crud.table,
        role = %role.as_str(),
        versioned = crud.versioned
    );
    let engine = state.engine.clone();
    let deadline = engine.config().request_timeout;
    let result = async {
        match tokio::time::timeout(deadline, engine.handle(role.as_str(), &crud, body)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(deadline.as_millis() as u64)),
        }
    }
    .instrument(span)
    .await;

    match result {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response_with(expose),
    }
}

/// Empty body reads as `None`.
async fn read_json(body: Body) -> Result<Option<Value>, AppError> {
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("body: {}", e)))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
}

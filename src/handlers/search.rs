use crate::extractors::CallerRole;
use crate::service::search::{parse_limit, search as run_search};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::Instrument;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<String>,
}

/// GET /search?q=<keyword>[&limit=n]
pub async fn search(
    State(state): State<AppState>,
    role: CallerRole,
    Query(params): Query<SearchParams>,
) -> Response {
    let expose = state.engine.config().runtime_errors;
    let limit = match parse_limit(params.limit.as_deref()) {
        Ok(l) => l,
        Err(e) => return e.into_response_with(expose),
    };
    let span = tracing::info_span!("search", role = %role.as_str());
    match run_search(&state.engine, role.as_str(), &params.q, limit).instrument(span).await {
        Ok(v) => Json(v).into_response(),
        Err(e) => e.into_response_with(expose),
    }
}

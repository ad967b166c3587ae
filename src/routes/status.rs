//! Liveness, readiness and build info for the gateway process.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Readiness {
    database: &'static str,
    tables: usize,
    search_targets: usize,
}

async fn live() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// 200 once the pool answers; 503 otherwise. Reports what the gateway serves.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let engine = &state.engine;
    let report = |database| Readiness {
        database,
        tables: engine.catalog().len(),
        search_targets: engine.config().search.len(),
    };
    match engine.gateway().ping().await {
        Ok(()) => (StatusCode::OK, Json(report("ok"))),
        Err(e) => {
            tracing::warn!(error = %e, "database not reachable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(report("unavailable")))
        }
    }
}

async fn build_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `GET /health` (204), `GET /ready` (pings the database) and `GET /version`.
pub fn status_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(live))
        .route("/ready", get(ready))
        .route("/version", get(build_info))
        .with_state(state)
}

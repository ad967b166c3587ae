use crate::handlers::search;
use crate::state::AppState;
use axum::{routing::get, Router};

/// GET /search over the configured search targets.
pub fn search_routes(state: AppState) -> Router {
    Router::new().route("/search", get(search)).with_state(state)
}

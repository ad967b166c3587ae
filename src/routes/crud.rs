//! CRUD hook installed as middleware so unmatched requests fall through to the app's own routes.

use crate::handlers::crud_middleware;
use crate::state::AppState;
use axum::{middleware::from_fn_with_state, Router};

/// Wraps `app` with the CRUD middleware. Requests outside both prefixes reach `app` untouched.
pub fn crud_layer<S>(app: Router<S>, state: AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    app.layer(from_fn_with_state(state, crud_middleware))
}

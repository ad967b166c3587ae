//! Shared state for the CRUD middleware and the search and readiness routes.

use crate::request::RequestRouter;
use crate::service::CrudEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CrudEngine>,
    pub router: RequestRouter,
}

impl AppState {
    pub fn new(engine: CrudEngine) -> Self {
        let router = RequestRouter::from_config(engine.config());
        AppState {
            engine: Arc::new(engine),
            router,
        }
    }
}

//! HTTP handlers for the CRUD middleware and search.

pub mod crud;
pub mod search;
pub use crud::{crud_middleware, MAX_BODY_BYTES};
pub use search::search;

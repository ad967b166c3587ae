//! CrudEngine and search over the SQL gateway.

mod crud;
pub mod search;
pub use crud::CrudEngine;
pub use search::{search, DEFAULT_SEARCH_LIMIT};

//! Routers and layers the host application mounts.

mod crud;
mod search;
mod status;
pub use crud::crud_layer;
pub use search::search_routes;
pub use status::status_routes;

//! tablegate: REST verbs over PostgreSQL tables, gated by a role policy, with append-only version chains.

pub mod catalog;
pub mod config;
pub mod error;
pub mod extractors;
pub mod gateway;
pub mod handlers;
pub mod hooks;
pub mod policy;
pub mod request;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod version;

pub use catalog::SchemaCatalog;
pub use config::{resolve, GatewayConfig, ResolvedConfig};
pub use error::{AppError, ConfigError};
pub use extractors::CallerRole;
pub use gateway::SqlGateway;
pub use hooks::{ModerationEvent, ModerationWorker, PasswordHashHook, WriteHook};
pub use policy::{AccessPolicy, Verb, VerbSet};
pub use request::{CrudRequest, RequestRouter};
pub use response::{error_body, CrudReply};
pub use routes::{crud_layer, search_routes, status_routes};
pub use service::CrudEngine;
pub use state::AppState;
pub use version::VersionStrategy;

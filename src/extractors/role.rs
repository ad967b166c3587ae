//! Caller role placed in request extensions by the auth layer.

use crate::policy::DEFAULT_ROLE;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Role of the current caller. Requests without one act as `visitor`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerRole(pub String);

impl CallerRole {
    pub fn new(role: impl Into<String>) -> Self {
        CallerRole(role.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the role from extensions; blank or missing falls back to the default.
    pub fn from_extensions(ext: &axum::http::Extensions) -> Self {
        ext.get::<CallerRole>()
            .filter(|r| !r.0.trim().is_empty())
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for CallerRole {
    fn default() -> Self {
        CallerRole(DEFAULT_ROLE.to_string())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerRole
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CallerRole::from_extensions(&parts.extensions))
    }
}

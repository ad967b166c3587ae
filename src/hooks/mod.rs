//! Write hooks and post-commit side effects.

pub mod moderation;
pub mod password;

use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub use moderation::{ModerationEvent, ModerationWorker, MODERATION_QUEUE};
pub use password::PasswordHashHook;

/// Runs on the request body before plain and versioned post/put.
#[async_trait]
pub trait WriteHook: Send + Sync {
    async fn before_write(&self, table: &str, body: &mut Map<String, Value>) -> Result<(), AppError>;
}

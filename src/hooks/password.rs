use crate::error::AppError;
use crate::hooks::WriteHook;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Replaces a plaintext password column with its Argon2id PHC string.
#[derive(Clone, Debug)]
pub struct PasswordHashHook {
    tables: HashSet<String>,
    column: String,
}

impl PasswordHashHook {
    pub fn new(tables: impl IntoIterator<Item = String>, column: impl Into<String>) -> Self {
        PasswordHashHook {
            tables: tables.into_iter().collect(),
            column: column.into(),
        }
    }
}

/// Argon2id with the crate's default parameters and a random salt.
pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("password hash: {}", e)))
}

#[async_trait]
impl WriteHook for PasswordHashHook {
    async fn before_write(&self, table: &str, body: &mut Map<String, Value>) -> Result<(), AppError> {
        if !self.tables.contains(table) {
            return Ok(());
        }
        let plain = match body.get(&self.column) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Ok(()),
        };
        let hashed = tokio::task::spawn_blocking(move || hash_password(&plain))
            .await
            .map_err(|e| AppError::Internal(format!("password hash task: {}", e)))??;
        body.insert(self.column.clone(), Value::String(hashed));
        Ok(())
    }
}

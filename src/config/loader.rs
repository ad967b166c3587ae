//! Load config from a JSON file, with environment overrides.

use crate::config::{validate, GatewayConfig, PolicyConfig};
use crate::error::ConfigError;
use std::path::Path;

/// Env var overriding `database.url`.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

impl GatewayConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::Load(format!("invalid config json: {}", e)))
    }

    /// Reads the config file, merges a referenced policy file, applies env overrides, then validates.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        let mut config = Self::from_json_str(&raw)?;

        if let Some(policy_file) = config.policy_file.clone() {
            let policy_path = path.parent().unwrap_or_else(|| Path::new(".")).join(policy_file);
            let policy = load_policy_file(&policy_path).await?;
            config.merge_policy(policy);
        }

        config.apply_env();
        validate(&config)?;
        Ok(config)
    }

    /// Reads `.env` if present, then applies `DATABASE_URL`.
    pub fn apply_env(&mut self) {
        dotenvy::dotenv().ok();
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database.url = url;
            }
        }
    }

    /// Table entries in `other` replace same-named entries for the same role.
    pub fn merge_policy(&mut self, other: PolicyConfig) {
        for (role, tables) in other {
            self.policy.entry(role).or_default().extend(tables);
        }
    }
}

pub async fn load_policy_file(path: &Path) -> Result<PolicyConfig, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("invalid policy json: {}", e)))
}

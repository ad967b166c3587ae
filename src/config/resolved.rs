//! Config checked against the schema catalog and flattened for runtime use.

use crate::catalog::SchemaCatalog;
use crate::config::{GatewayConfig, ModerationConfig, SearchTargetConfig, VersioningConfig};
use crate::error::ConfigError;
use crate::policy::AccessPolicy;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Default id column when a table has no `id_map` entry.
pub const DEFAULT_ID_COLUMN: &str = "id";

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    /// Plain-table prefix, always ending in '/'.
    pub base_url: String,
    /// Versioned-table prefix, always ending in '/'.
    pub base_url_for_vid_tables: String,
    pub id_map: HashMap<String, String>,
    pub runtime_errors: bool,
    pub request_timeout: Duration,
    pub versioning: VersioningConfig,
    pub password_tables: HashSet<String>,
    pub password_column: String,
    pub moderation: Option<ModerationConfig>,
    pub search: Vec<SearchTargetConfig>,
}

impl ResolvedConfig {
    pub fn id_column<'a>(&'a self, table: &str) -> &'a str {
        self.id_map.get(table).map(String::as_str).unwrap_or(DEFAULT_ID_COLUMN)
    }

    /// Builds runtime settings without a catalog check. Tests use this directly.
    pub fn unchecked(config: &GatewayConfig) -> Self {
        ResolvedConfig {
            base_url: with_trailing_slash(&config.base_url),
            base_url_for_vid_tables: with_trailing_slash(&config.base_url_for_vid_tables),
            id_map: config.id_map.clone(),
            runtime_errors: config.runtime_errors,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            versioning: config.versioning.clone(),
            password_tables: config.password_hashing.tables.iter().cloned().collect(),
            password_column: config.password_hashing.column.clone(),
            moderation: config.moderation.clone(),
            search: config.search.clone(),
        }
    }
}

pub fn with_trailing_slash(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{}/", prefix)
    }
}

/// Checks every table and column the config names against the catalog and compiles the policy.
pub fn resolve(
    config: &GatewayConfig,
    catalog: &SchemaCatalog,
) -> Result<(ResolvedConfig, AccessPolicy), ConfigError> {
    crate::config::validate(config)?;

    for (table, column) in &config.id_map {
        catalog.require_column(table, column)?;
    }
    for table in &config.password_hashing.tables {
        catalog.require_column(table, &config.password_hashing.column)?;
    }

    let resolved = ResolvedConfig::unchecked(config);
    if let Some(m) = &config.moderation {
        for column in [&m.warnings_column, &m.role_column] {
            catalog.require_column(&m.users_table, column)?;
        }
        catalog.require_column(&m.users_table, resolved.id_column(&m.users_table))?;
        for table in &m.content_tables {
            catalog.require_column(table, &m.changer_column)?;
        }
    }
    for target in &config.search {
        for column in &target.columns {
            catalog.require_column(&target.table, column)?;
        }
        if target.versioned {
            catalog.require_column(&target.table, &config.versioning.version_column)?;
            catalog.require_column(&target.table, resolved.id_column(&target.table))?;
        }
    }

    let policy = AccessPolicy::compile(&config.policy, catalog)?;
    tracing::info!(
        roles = policy.roles().count(),
        base_url = %resolved.base_url,
        vid_base_url = %resolved.base_url_for_vid_tables,
        "gateway config resolved"
    );
    Ok((resolved, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnInfo, TableInfo};
    use crate::policy::Verb;

    fn catalog() -> SchemaCatalog {
        let col = |name: &str, t: &str| ColumnInfo { name: name.into(), sql_type: t.into() };
        SchemaCatalog::from_tables(
            "public",
            vec![
                TableInfo::new("films", vec![col("id", "integer"), col("versionId", "integer"), col("title", "text")]),
                TableInfo::new("films_actors", vec![col("filmId", "integer"), col("actorId", "integer")]),
                TableInfo::new("users", vec![col("id", "integer"), col("password", "text")]),
            ],
        )
    }

    #[test]
    fn test_resolve_normalizes_prefixes() {
        let config: GatewayConfig = serde_json::from_value(serde_json::json!({
            "base_url": "/rest",
            "base_url_for_vid_tables": "/vid/",
            "id_map": { "films_actors": "filmId" },
            "policy": { "visitor": { "films": "get" } }
        }))
        .unwrap();
        let (resolved, policy) = resolve(&config, &catalog()).unwrap();
        assert_eq!(resolved.base_url, "/rest/");
        assert_eq!(resolved.base_url_for_vid_tables, "/vid/");
        assert_eq!(resolved.id_column("films_actors"), "filmId");
        assert_eq!(resolved.id_column("films"), "id");
        assert!(policy.permits("visitor", "films", Verb::Get));
    }

    #[test]
    fn test_id_map_column_must_exist() {
        let config: GatewayConfig =
            serde_json::from_value(serde_json::json!({ "id_map": { "films_actors": "personId" } })).unwrap();
        assert!(matches!(resolve(&config, &catalog()), Err(ConfigError::UnknownColumn { .. })));
    }

    #[test]
    fn test_versioned_search_target_needs_version_column() {
        let config: GatewayConfig = serde_json::from_value(serde_json::json!({
            "search": [{ "table": "users", "columns": ["password"], "versioned": true }]
        }))
        .unwrap();
        assert!(matches!(resolve(&config, &catalog()), Err(ConfigError::UnknownColumn { .. })));
    }

    #[test]
    fn test_password_table_checked() {
        let config: GatewayConfig = serde_json::from_value(serde_json::json!({
            "password_hashing": { "tables": ["films"] }
        }))
        .unwrap();
        assert!(resolve(&config, &catalog()).is_err());
    }
}

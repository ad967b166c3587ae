//! Structural config validation, run before anything touches the database.

use crate::config::GatewayConfig;
use crate::error::ConfigError;
use crate::policy::Verb;
use regex::Regex;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static identifier regex"))
}

pub fn is_identifier(s: &str) -> bool {
    identifier_re().is_match(s)
}

fn check_identifier(kind: &str, s: &str) -> Result<(), ConfigError> {
    if is_identifier(s) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("invalid {} identifier: '{}'", kind, s)))
    }
}

fn check_prefix(name: &str, prefix: &str) -> Result<(), ConfigError> {
    if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} must start with '/' and name a path segment, got '{}'",
            name, prefix
        )));
    }
    Ok(())
}

pub fn validate(config: &GatewayConfig) -> Result<(), ConfigError> {
    check_prefix("base_url", &config.base_url)?;
    check_prefix("base_url_for_vid_tables", &config.base_url_for_vid_tables)?;
    if config.base_url.trim_end_matches('/') == config.base_url_for_vid_tables.trim_end_matches('/') {
        return Err(ConfigError::Validation(
            "base_url and base_url_for_vid_tables must differ".into(),
        ));
    }
    if config.request_timeout_ms == 0 {
        return Err(ConfigError::Validation("request_timeout_ms must be positive".into()));
    }
    if config.database.max_connections == 0 {
        return Err(ConfigError::Validation("database.max_connections must be positive".into()));
    }
    check_identifier("schema", &config.database.schema)?;

    for (table, column) in &config.id_map {
        check_identifier("table", table)?;
        check_identifier("column", column)?;
    }
    check_identifier("column", &config.versioning.version_column)?;
    check_identifier("column", &config.versioning.created_column)?;

    for table in &config.password_hashing.tables {
        check_identifier("table", table)?;
    }
    check_identifier("column", &config.password_hashing.column)?;

    if let Some(m) = &config.moderation {
        check_identifier("table", &m.users_table)?;
        for c in [&m.warnings_column, &m.role_column, &m.changer_column] {
            check_identifier("column", c)?;
        }
        for t in &m.content_tables {
            check_identifier("table", t)?;
        }
        if m.threshold <= 0 {
            return Err(ConfigError::Validation("moderation.threshold must be positive".into()));
        }
    }

    for target in &config.search {
        check_identifier("table", &target.table)?;
        if target.columns.is_empty() {
            return Err(ConfigError::Validation(format!(
                "search target {} needs at least one column",
                target.table
            )));
        }
        for c in &target.columns {
            check_identifier("column", c)?;
        }
    }

    for (role, tables) in &config.policy {
        if role.trim().is_empty() {
            return Err(ConfigError::Validation("policy role name must not be empty".into()));
        }
        for (table, spec) in tables {
            check_identifier("table", table)?;
            for verb in spec.names() {
                if Verb::parse(verb).is_none() {
                    return Err(ConfigError::UnknownVerb {
                        role: role.clone(),
                        table: table.clone(),
                        verb: verb.to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}

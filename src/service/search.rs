//! Keyword search across the configured tables the caller may read.

use crate::error::AppError;
use crate::policy::Verb;
use crate::service::crud::{target_for, CrudEngine};
use crate::sql::{self, Source};
use serde_json::{Map, Value};

pub const DEFAULT_SEARCH_LIMIT: i64 = 50;

/// `*` wildcards become `%`; the keyword matches anywhere in the text.
pub fn search_pattern(keyword: &str) -> String {
    format!("%{}%", keyword.trim().replace('*', "%"))
}

/// Returns `{ <table>: [rows...] }` for every search target `role` may get. Targets the role
/// cannot read are left out of the reply.
pub async fn search(engine: &CrudEngine, role: &str, keyword: &str, limit: Option<i64>) -> Result<Value, AppError> {
    if keyword.trim().is_empty() {
        return Err(AppError::Validation("q must not be empty".into()));
    }
    let pattern = search_pattern(keyword);
    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let mut out = Map::new();
    for t in &engine.config().search {
        if !engine.policy().permits(role, &t.table, Verb::Get) {
            tracing::debug!(role, table = %t.table, "search target skipped");
            continue;
        }
        let Some(info) = engine.catalog().table(&t.table) else {
            continue;
        };
        let source = if t.versioned { engine.versions().source() } else { Source::Table };
        let q = sql::search(&target_for(engine, info), source, &t.columns, &pattern, limit);
        let rows = engine.gateway().fetch_all(&q).await?;
        out.insert(t.table.clone(), Value::Array(rows));
    }
    Ok(Value::Object(out))
}

/// Parses the optional `limit` query value.
pub fn parse_limit(raw: Option<&str>) -> Result<Option<i64>, AppError> {
    raw.map(|s| {
        s.trim()
            .parse::<u32>()
            .map(i64::from)
            .map_err(|_| AppError::Validation(format!("limit must be a non-negative integer, got '{}'", s)))
    })
    .transpose()
}

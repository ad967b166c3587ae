//! Query-string → filter, ordering and pagination.

use crate::error::AppError;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    /// (column, pattern) pairs, combined with AND, each matched with LIKE.
    pub conditions: Vec<(String, Value)>,
    pub order_by: Option<String>,
    pub descending: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl QueryFilter {
    /// `order_by`, `desc`, `limit` and `offset` are reserved; every other key becomes a predicate.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, AppError> {
        let mut filter = QueryFilter::default();
        for (key, value) in pairs {
            match key.as_str() {
                "order_by" => {
                    if !value.is_empty() {
                        filter.order_by = Some(value.clone());
                    }
                }
                "desc" => filter.descending = value == "1",
                "limit" => filter.limit = Some(parse_count("limit", value)?),
                "offset" => filter.offset = Some(parse_count("offset", value)?),
                _ => filter.conditions.push((key.clone(), like_value(value))),
            }
        }
        Ok(filter)
    }
}

fn parse_count(key: &str, value: &str) -> Result<i64, AppError> {
    value
        .trim()
        .parse::<u32>()
        .map(i64::from)
        .map_err(|_| AppError::Validation(format!("{} must be a non-negative integer, got '{}'", key, value)))
}

/// `*` becomes `%`; a value that reads as a plain number is bound as a number.
pub fn like_value(raw: &str) -> Value {
    let pattern = raw.replace('*', "%");
    let trimmed = pattern.trim();
    if !trimmed.is_empty() {
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::from(i);
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E')) {
            if let Some(n) = trimmed.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                return Value::Number(n);
            }
        }
    }
    Value::String(pattern)
}

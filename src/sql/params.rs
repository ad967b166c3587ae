//! Convert serde_json::Value into values sqlx can bind.

use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value bound to a PostgreSQL placeholder. The SQL text casts each placeholder to its column type,
/// so the bound type only has to be castable.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
    Json(Value),
}

impl PgBindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PgBindValue::I64(i)
                } else if let Some(f) = n.as_f64() {
                    PgBindValue::F64(f)
                } else {
                    PgBindValue::Text(n.to_string())
                }
            }
            Value::String(s) => PgBindValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }

    pub fn bind<'q>(self, q: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        match self {
            PgBindValue::Null => q.bind(None::<String>),
            PgBindValue::Bool(b) => q.bind(b),
            PgBindValue::I64(n) => q.bind(n),
            PgBindValue::F64(n) => q.bind(n),
            PgBindValue::Text(s) => q.bind(s),
            PgBindValue::Json(v) => q.bind(v),
        }
    }
}

/// Binds every param in order.
pub fn bind_all<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    params: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        q = PgBindValue::from_json(p).bind(q);
    }
    q
}

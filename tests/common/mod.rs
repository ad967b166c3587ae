//! Shared setup for database-backed tests. They run only when TABLEGATE_TEST_DATABASE_URL points at a
//! PostgreSQL database the test may create schemas in; otherwise `fixture` returns `None` and the test
//! returns early.

#![allow(dead_code)]

use axum::{body::Body, http::Request, http::StatusCode, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tablegate::{
    config::DatabaseConfig, resolve, AppError, CallerRole, CrudEngine, CrudReply, CrudRequest, GatewayConfig,
    SchemaCatalog, SqlGateway, Verb,
};
use tower::ServiceExt;

pub const TEST_DB_ENV: &str = "TABLEGATE_TEST_DATABASE_URL";

pub struct Fixture {
    pub gateway: SqlGateway,
    pub schema: String,
    pub catalog: Arc<SchemaCatalog>,
}

/// Fresh schema holding the tables `ddl` creates. `{schema}` in each statement is replaced by the
/// quoted schema name.
pub async fn fixture(ddl: &[&str]) -> Option<Fixture> {
    let url = std::env::var(TEST_DB_ENV).ok()?;
    let schema = format!("tg_{}", uuid::Uuid::new_v4().simple());
    let gateway = SqlGateway::connect(&DatabaseConfig {
        url,
        schema: schema.clone(),
        ..DatabaseConfig::default()
    })
    .await
    .unwrap();
    let mut f = Fixture {
        gateway,
        schema,
        catalog: Arc::new(SchemaCatalog::default()),
    };
    f.exec("CREATE SCHEMA {schema}").await;
    for stmt in ddl {
        f.exec(stmt).await;
    }
    f.catalog = Arc::new(SchemaCatalog::load(f.gateway.pool(), &f.schema).await.unwrap());
    Some(f)
}

impl Fixture {
    pub async fn exec(&self, sql: &str) {
        let sql = sql.replace("{schema}", &format!("\"{}\"", self.schema));
        sqlx::query(&sql).execute(self.gateway.pool()).await.unwrap();
    }

    /// Single scalar rendered as text, e.g. `SELECT salary::text FROM ...`.
    pub async fn text(&self, sql: &str) -> Option<String> {
        let sql = sql.replace("{schema}", &format!("\"{}\"", self.schema));
        sqlx::query_scalar::<_, Option<String>>(&sql).fetch_one(self.gateway.pool()).await.unwrap()
    }

    /// Config pointed at this schema, built from the JSON fields given.
    pub fn config(&self, fields: Value) -> GatewayConfig {
        let mut config: GatewayConfig = serde_json::from_value(fields).unwrap();
        config.database.schema = self.schema.clone();
        config
    }

    /// Engine for `config`, checked against the live catalog the way startup does it.
    pub fn engine(&self, config: &GatewayConfig) -> CrudEngine {
        let (resolved, policy) = resolve(config, &self.catalog).unwrap();
        CrudEngine::new(self.gateway.clone(), policy, Arc::clone(&self.catalog), resolved)
    }

    pub async fn drop_schema(self) {
        self.exec("DROP SCHEMA {schema} CASCADE").await;
        self.gateway.close().await;
    }
}

/// Policy granting every verb on each table to `role`.
pub fn grant_all(role: &str, tables: &[&str]) -> Value {
    let verbs = json!(["get", "post", "put", "delete"]);
    let per_table: serde_json::Map<String, Value> = tables.iter().map(|t| (t.to_string(), verbs.clone())).collect();
    let mut policy = serde_json::Map::new();
    policy.insert(role.to_string(), Value::Object(per_table));
    Value::Object(policy)
}

pub fn req(verb: Verb, table: &str, id: Option<&str>, versioned: bool, query: &[(&str, &str)]) -> CrudRequest {
    CrudRequest {
        table: table.into(),
        id: id.map(String::from),
        verb,
        versioned,
        query: query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    }
}

pub async fn call(engine: &CrudEngine, role: &str, r: CrudRequest, body: Option<Value>) -> Result<Value, AppError> {
    engine.handle(role, &r, body).await.map(CrudReply::into_body)
}

/// Sends one request through `app`; `role` lands in the request extensions.
pub async fn send(app: Router, method: &str, uri: &str, role: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder.extension(CallerRole::new(role));
    }
    let resp = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

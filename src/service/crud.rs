//! Request execution: policy check, table lookup, statement build, run, reply.

use crate::catalog::{SchemaCatalog, TableInfo};
use crate::config::ResolvedConfig;
use crate::error::AppError;
use crate::gateway::SqlGateway;
use crate::hooks::{moderation, ModerationEvent, PasswordHashHook, WriteHook};
use crate::policy::{AccessPolicy, Verb};
use crate::request::CrudRequest;
use crate::response::CrudReply;
use crate::sql::{self, QueryFilter, Source, Target};
use crate::version::VersionStrategy;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

pub struct CrudEngine {
    gateway: SqlGateway,
    policy: AccessPolicy,
    catalog: Arc<SchemaCatalog>,
    config: ResolvedConfig,
    versions: VersionStrategy,
    hooks: Vec<Arc<dyn WriteHook>>,
    moderation: Option<mpsc::Sender<ModerationEvent>>,
}

impl CrudEngine {
    /// Installs the password hook when the config names any password tables.
    pub fn new(gateway: SqlGateway, policy: AccessPolicy, catalog: Arc<SchemaCatalog>, config: ResolvedConfig) -> Self {
        let mut hooks: Vec<Arc<dyn WriteHook>> = Vec::new();
        if !config.password_tables.is_empty() {
            hooks.push(Arc::new(PasswordHashHook::new(
                config.password_tables.iter().cloned(),
                config.password_column.clone(),
            )));
        }
        CrudEngine {
            versions: VersionStrategy::new(&config.versioning),
            gateway,
            policy,
            catalog,
            config,
            hooks,
            moderation: None,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn WriteHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Channel to the moderation worker. Without it, threshold puts publish nothing.
    pub fn with_moderation(mut self, sender: mpsc::Sender<ModerationEvent>) -> Self {
        self.moderation = Some(sender);
        self
    }

    pub fn gateway(&self) -> &SqlGateway {
        &self.gateway
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn versions(&self) -> &VersionStrategy {
        &self.versions
    }

    /// Runs one CRUD request for `role`. A denied request returns before any statement is built.
    pub async fn handle(&self, role: &str, req: &CrudRequest, body: Option<Value>) -> Result<CrudReply, AppError> {
        if !self.policy.permits(role, &req.table, req.verb) {
            tracing::info!(role, table = %req.table, verb = %req.verb, "denied");
            return Err(AppError::Unauthorized);
        }
        let table = self
            .catalog
            .table(&req.table)
            .ok_or_else(|| AppError::NotFound(format!("table {}", req.table)))?;
        if req.versioned && !table.has_column(self.versions.version_column()) {
            return Err(AppError::BadRequest(format!("table {} has no version chain", req.table)));
        }
        let target = Target::new(&self.catalog.schema, table, self.config.id_column(&req.table));
        if let Some(id) = &req.id {
            check_id(&target, id)?;
        }

        match req.verb {
            Verb::Get => self.get(&target, req).await,
            Verb::Post => {
                if req.id.is_some() {
                    return Err(AppError::BadRequest("post takes no id".into()));
                }
                let mut body = body_object(body)?;
                self.run_hooks(&req.table, &mut body).await?;
                let row = if req.versioned {
                    self.versions.create(&self.gateway, &target, &body).await?
                } else {
                    self.gateway
                        .fetch_optional(&sql::insert(&target, &body))
                        .await?
                        .ok_or_else(|| AppError::Internal(format!("insert into {} returned no row", req.table)))?
                };
                Ok(CrudReply::Created(row))
            }
            Verb::Put => {
                let id = require_id(req)?;
                let mut body = body_object(body)?;
                let publish = !req.versioned
                    && self
                        .config
                        .moderation
                        .as_ref()
                        .is_some_and(|m| moderation::reaches_threshold(m, &req.table, &body));
                self.run_hooks(&req.table, &mut body).await?;
                let row = if req.versioned {
                    self.versions.update(&self.gateway, &target, id, &body).await?
                } else {
                    let q = sql::update(&target, id, &body)
                        .ok_or_else(|| AppError::BadRequest("nothing to update".into()))?;
                    self.gateway
                        .fetch_optional(&q)
                        .await?
                        .ok_or_else(|| AppError::NotFound(format!("{}/{}", req.table, id)))?
                };
                if publish {
                    self.publish(ModerationEvent::WarningThresholdReached { user_id: id.to_string() });
                }
                Ok(CrudReply::Updated(row))
            }
            Verb::Delete => {
                let id = require_id(req)?;
                // plain delete on the underlying table: a versioned entity loses its whole chain
                let affected_rows = self.gateway.execute(&sql::delete(&target, id)).await?;
                if affected_rows == 0 {
                    return Err(AppError::NotFound(format!("{}/{}", req.table, id)));
                }
                Ok(CrudReply::Deleted { affected_rows })
            }
        }
    }

    async fn get(&self, target: &Target<'_>, req: &CrudRequest) -> Result<CrudReply, AppError> {
        let source = if req.versioned { self.versions.source() } else { Source::Table };
        match &req.id {
            Some(id) => {
                let row = self
                    .gateway
                    .fetch_optional(&sql::select_by_id(target, source, id))
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("{}/{}", req.table, id)))?;
                Ok(CrudReply::One(row))
            }
            None => {
                let filter = QueryFilter::from_pairs(&req.query)?;
                let rows = self.gateway.fetch_all(&sql::select_list(target, source, &filter)).await?;
                Ok(CrudReply::Many(rows))
            }
        }
    }

    async fn run_hooks(&self, table: &str, body: &mut Map<String, Value>) -> Result<(), AppError> {
        for hook in &self.hooks {
            hook.before_write(table, body).await?;
        }
        Ok(())
    }

    fn publish(&self, event: ModerationEvent) {
        let Some(tx) = &self.moderation else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(e)) => tracing::warn!(event = ?e, "moderation queue full, event dropped"),
            Err(TrySendError::Closed(e)) => tracing::warn!(event = ?e, "moderation worker gone, event dropped"),
        }
    }
}

fn require_id(req: &CrudRequest) -> Result<&str, AppError> {
    req.id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest(format!("{} needs an id", req.verb)))
}

/// Integer id columns only accept integer ids.
fn check_id(target: &Target<'_>, id: &str) -> Result<(), AppError> {
    let is_integer = target
        .table
        .column(target.id_column)
        .is_some_and(|c| c.is_integer());
    if is_integer && id.trim().parse::<i64>().is_err() {
        return Err(AppError::Validation(format!("invalid id '{}'", id)));
    }
    Ok(())
}

fn body_object(body: Option<Value>) -> Result<Map<String, Value>, AppError> {
    match body {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(m)) => Ok(m),
        Some(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Table lookup shared with search.
pub(crate) fn target_for<'a>(engine: &'a CrudEngine, table: &'a TableInfo) -> Target<'a> {
    Target::new(&engine.catalog.schema, table, engine.config.id_column(&table.name))
}

//! Warning-threshold cascade, run off the request path.
//!
//! A plain put that sets a user's warnings to the threshold publishes an event; the worker bans every
//! user at or over the threshold who is not banned yet and deletes that user's rows from the content
//! tables, one transaction per user.

use crate::catalog::SchemaCatalog;
use crate::config::ModerationConfig;
use crate::error::AppError;
use crate::gateway::{self, SqlGateway};
use crate::sql::{self, Target};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Bounded queue depth between the engine and the worker.
pub const MODERATION_QUEUE: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum ModerationEvent {
    WarningThresholdReached { user_id: String },
}

pub struct ModerationWorker {
    gateway: SqlGateway,
    catalog: Arc<SchemaCatalog>,
    config: ModerationConfig,
    users_id_column: String,
}

impl ModerationWorker {
    pub fn new(
        gateway: SqlGateway,
        catalog: Arc<SchemaCatalog>,
        config: ModerationConfig,
        users_id_column: impl Into<String>,
    ) -> Self {
        ModerationWorker {
            gateway,
            catalog,
            config,
            users_id_column: users_id_column.into(),
        }
    }

    /// Starts the worker. It stops once every sender is dropped.
    pub fn spawn(self) -> (mpsc::Sender<ModerationEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(MODERATION_QUEUE);
        let handle = tokio::spawn(self.run(rx));
        (tx, handle)
    }

    async fn run(self, mut rx: mpsc::Receiver<ModerationEvent>) {
        while let Some(event) = rx.recv().await {
            let ModerationEvent::WarningThresholdReached { user_id } = &event;
            tracing::info!(user_id = %user_id, "warning threshold reached");
            match self.sweep().await {
                Ok(banned) => tracing::debug!(banned, "moderation sweep done"),
                Err(e) => tracing::error!(error = %e, "moderation sweep failed"),
            }
        }
        tracing::debug!("moderation worker stopped");
    }

    /// Bans every pending user. Returns how many were banned.
    pub async fn sweep(&self) -> Result<usize, AppError> {
        let users = self.catalog.require_table(&self.config.users_table)?;
        let target = Target::new(&self.catalog.schema, users, &self.users_id_column);
        let q = sql::select_ids_at_threshold(
            &target,
            &self.config.warnings_column,
            self.config.threshold,
            &self.config.role_column,
            &self.config.banned_role,
        );
        let candidates = self.gateway.fetch_all(&q).await?;
        let mut banned = 0;
        for row in candidates {
            let Some(id) = row.get(&self.users_id_column).cloned() else {
                continue;
            };
            match self.ban(&target, id.clone()).await {
                Ok(removed) => {
                    banned += 1;
                    tracing::warn!(user_id = %id, removed, "user banned and content deleted");
                }
                Err(e) => tracing::error!(user_id = %id, error = %e, "ban failed"),
            }
        }
        Ok(banned)
    }

    /// Sets the banned role and deletes the user's content rows in one transaction.
    /// Returns the number of content rows deleted.
    async fn ban(&self, users: &Target<'_>, user_id: Value) -> Result<u64, AppError> {
        let id = id_text(&user_id);
        let mut set_role = Map::new();
        set_role.insert(self.config.role_column.clone(), Value::String(self.config.banned_role.clone()));

        let mut tx = self.gateway.begin().await?;
        if let Some(q) = sql::update(users, &id, &set_role) {
            gateway::execute(&mut *tx, &q).await?;
        }
        let mut removed = 0;
        for table in &self.config.content_tables {
            let info = self.catalog.require_table(table)?;
            let target = Target::new(&self.catalog.schema, info, users.id_column);
            let q = sql::delete_by_column(&target, &self.config.changer_column, user_id.clone());
            removed += gateway::execute(&mut *tx, &q).await?;
        }
        tx.commit().await?;
        Ok(removed)
    }
}

/// Whether a plain put body on `table` should trigger the cascade.
pub fn reaches_threshold(config: &ModerationConfig, table: &str, body: &Map<String, Value>) -> bool {
    table == config.users_table
        && body
            .get(&config.warnings_column)
            .and_then(warning_count)
            .is_some_and(|n| n == config.threshold)
}

fn warning_count(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn id_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

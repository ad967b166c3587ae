//! Example consumer: serves tablegate's CRUD prefixes, search and health routes.
//!
//! Run from repo root: `CONFIG_PATH=example_consumer/tablegate.json cargo run -p example-consumer`

use axum::Router;
use std::sync::Arc;
use tablegate::{
    crud_layer, handlers::MAX_BODY_BYTES, resolve, search_routes, status_routes, AppState, CrudEngine,
    GatewayConfig, ModerationWorker, SchemaCatalog, SqlGateway,
};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tablegate=info")),
        )
        .init();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "tablegate.json".into());
    let config = GatewayConfig::from_path(&config_path).await?;

    let gateway = SqlGateway::connect(&config.database).await?;
    let catalog = Arc::new(SchemaCatalog::load(gateway.pool(), &config.database.schema).await?);
    let (resolved, policy) = resolve(&config, &catalog)?;

    let mut engine = CrudEngine::new(gateway.clone(), policy, catalog.clone(), resolved.clone());
    let mut worker = None;
    if let Some(moderation) = resolved.moderation.clone() {
        let id_column = resolved.id_column(&moderation.users_table).to_string();
        let (tx, handle) = ModerationWorker::new(gateway.clone(), catalog.clone(), moderation, id_column).spawn();
        engine = engine.with_moderation(tx);
        worker = Some(handle);
    }
    let state = AppState::new(engine);

    let app = crud_layer(
        Router::new()
            .merge(search_routes(state.clone()))
            .merge(status_routes(state.clone())),
        state,
    )
    .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("tablegate listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    // the app owned the last event sender; the worker drains its queue and stops
    if let Some(handle) = worker {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "moderation worker ended abnormally");
        }
    }
    gateway.close().await;
    tracing::info!("tablegate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

//! Keyword search over configured targets against a live database.

mod common;

use axum::http::StatusCode;
use common::{call, fixture, grant_all, req, send, Fixture};
use serde_json::{json, Value};
use tablegate::{search_routes, service, AppError, AppState, CrudEngine, Verb};

async fn searchable() -> Option<(Fixture, CrudEngine)> {
    let f = fixture(&[
        "CREATE TABLE {schema}.persons (id integer NOT NULL, \"versionId\" integer NOT NULL, name text, \
         \"timeCreated\" timestamptz NOT NULL DEFAULT now(), PRIMARY KEY (id, \"versionId\"))",
        "CREATE TABLE {schema}.films (id serial PRIMARY KEY, title text NOT NULL)",
    ])
    .await?;
    let mut policy = grant_all("admin", &["persons", "films"]);
    policy["visitor"] = json!({ "persons": "get" });
    let engine = f.engine(&f.config(json!({
        "search": [
            { "table": "persons", "columns": ["name"], "versioned": true },
            { "table": "films", "columns": ["title"] }
        ],
        "policy": policy
    })));

    let seeded = &engine;
    let admin = move |r, body| call(seeded, "admin", r, body);
    admin(req(Verb::Post, "persons", None, true, &[]), Some(json!({"name": "Oskar"}))).await.unwrap();
    admin(req(Verb::Put, "persons", Some("1"), true, &[]), Some(json!({"name": "Oskarsson"}))).await.unwrap();
    admin(req(Verb::Post, "persons", None, true, &[]), Some(json!({"name": "Bo"}))).await.unwrap();
    admin(req(Verb::Post, "films", None, false, &[]), Some(json!({"title": "Oskars resa"}))).await.unwrap();
    admin(req(Verb::Post, "films", None, false, &[]), Some(json!({"title": "Heat"}))).await.unwrap();
    Some((f, engine))
}

fn names(rows: &Value, column: &str) -> Vec<String> {
    rows.as_array()
        .unwrap()
        .iter()
        .map(|r| r[column].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn search_skips_targets_the_role_cannot_read() {
    let Some((f, engine)) = searchable().await else { return };

    let found = service::search(&engine, "visitor", "SKAR", None).await.unwrap();
    let tables: Vec<&String> = found.as_object().unwrap().keys().collect();
    assert_eq!(tables, vec!["persons"]);
    let persons = found["persons"].as_array().unwrap();
    assert_eq!(persons.len(), 1);
    assert_eq!(persons[0]["name"], "Oskarsson");
    assert_eq!(persons[0]["versionId"], 2);

    let found = service::search(&engine, "admin", "skar", None).await.unwrap();
    assert_eq!(names(&found["persons"], "name"), vec!["Oskarsson"]);
    assert_eq!(names(&found["films"], "title"), vec!["Oskars resa"]);

    let nothing = service::search(&engine, "ghost", "skar", None).await.unwrap();
    assert_eq!(nothing, json!({}));

    let blank = service::search(&engine, "admin", "  ", None).await;
    assert!(matches!(blank, Err(AppError::Validation(_))));

    f.drop_schema().await;
}

#[tokio::test]
async fn search_route_applies_wildcard_and_limit() {
    let Some((f, engine)) = searchable().await else { return };
    let state = AppState::new(engine);

    let (status, found) = send(search_routes(state.clone()), "GET", "/search?q=o*s", Some("admin")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&found["persons"], "name"), vec!["Oskarsson"]);
    assert_eq!(names(&found["films"], "title"), vec!["Oskars resa"]);

    let (status, found) = send(search_routes(state.clone()), "GET", "/search?q=o&limit=1", Some("admin")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["persons"].as_array().unwrap().len(), 1);
    assert_eq!(found["films"].as_array().unwrap().len(), 1);

    let (status, found) = send(search_routes(state), "GET", "/search?q=heat", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, json!({ "persons": [] }));

    f.drop_schema().await;
}

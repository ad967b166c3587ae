//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and version-chain statements.
//! Identifiers are always quoted; every value is a placeholder cast to its catalog column type.

use crate::catalog::TableInfo;
use crate::sql::QueryFilter;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// Table a statement runs against, with its id column.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub schema: &'a str,
    pub table: &'a TableInfo,
    pub id_column: &'a str,
}

impl<'a> Target<'a> {
    pub fn new(schema: &'a str, table: &'a TableInfo, id_column: &'a str) -> Self {
        Target {
            schema,
            table,
            id_column,
        }
    }

    fn name(&self) -> String {
        qualified_table(self.schema, &self.table.name)
    }

    /// `$n` cast to the column's type when the catalog knows the column; bare `$n` otherwise.
    fn placeholder(&self, column: &str, n: u32) -> String {
        match self.table.column(column) {
            Some(c) => format!("CAST(${} AS {})", n, c.sql_type),
            None => format!("${}", n),
        }
    }
}

/// What a SELECT reads from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source<'a> {
    /// The table itself.
    Table,
    /// Only the max-version row per id.
    CurrentVersions { version_column: &'a str },
}

/// FROM clause for the source. The versioned form is a derived table, so WHERE/ORDER/LIMIT compose on top of it.
pub fn from_clause(target: &Target<'_>, source: Source<'_>) -> String {
    let table = target.name();
    match source {
        Source::Table => table,
        Source::CurrentVersions { version_column } => {
            let id = quoted(target.id_column);
            let version = quoted(version_column);
            format!(
                "(SELECT x.* FROM (SELECT {id}, MAX({version}) AS {version} FROM {table} GROUP BY {id}) AS latest \
                 JOIN {table} AS x ON latest.{id} = x.{id} AND latest.{version} = x.{version}) AS current_rows"
            )
        }
    }
}

/// SELECT * by id.
pub fn select_by_id(target: &Target<'_>, source: Source<'_>, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::String(id.to_string()));
    q.sql = format!(
        "SELECT * FROM {} WHERE {} = {}",
        from_clause(target, source),
        quoted(target.id_column),
        target.placeholder(target.id_column, n)
    );
    q
}

/// SELECT * with LIKE predicates (AND), optional ORDER BY, LIMIT and OFFSET.
pub fn select_list(target: &Target<'_>, source: Source<'_>, filter: &QueryFilter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (col, val) in &filter.conditions {
        let n = q.push_param(val.clone());
        where_parts.push(format!("CAST({} AS TEXT) LIKE CAST(${} AS TEXT)", quoted(col), n));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let order_clause = filter
        .order_by
        .as_deref()
        .map(|col| format!(" ORDER BY {}{}", quoted(col), if filter.descending { " DESC" } else { " ASC" }))
        .unwrap_or_default();
    let limit_clause = filter
        .limit
        .map(|n| format!(" LIMIT ${}", q.push_param(Value::from(n))))
        .unwrap_or_default();
    let offset_clause = filter
        .offset
        .map(|n| format!(" OFFSET ${}", q.push_param(Value::from(n))))
        .unwrap_or_default();
    q.sql = format!(
        "SELECT * FROM {}{}{}{}{}",
        from_clause(target, source),
        where_clause,
        order_clause,
        limit_clause,
        offset_clause
    );
    q
}

/// INSERT one row from the body. Empty body inserts defaults.
pub fn insert(target: &Target<'_>, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    if body.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING *", target.name());
        return q;
    }
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (name, val) in body {
        let n = q.push_param(val.clone());
        cols.push(quoted(name));
        placeholders.push(target.placeholder(name, n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        target.name(),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE by id: SET only the body columns. The id column itself is never rewritten.
/// Returns `None` when nothing is left to set.
pub fn update(target: &Target<'_>, id: &str, body: &Map<String, Value>) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in body {
        if k == target.id_column {
            continue;
        }
        let n = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(k), target.placeholder(k, n)));
    }
    if sets.is_empty() {
        return None;
    }
    let id_param = q.push_param(Value::String(id.to_string()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING *",
        target.name(),
        sets.join(", "),
        quoted(target.id_column),
        target.placeholder(target.id_column, id_param)
    );
    Some(q)
}

/// DELETE by id. On a versioned table this matches every version of the entity.
pub fn delete(target: &Target<'_>, id: &str) -> QueryBuf {
    delete_by_column(target, target.id_column, Value::String(id.to_string()))
}

pub fn delete_by_column(target: &Target<'_>, column: &str, value: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(value);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        target.name(),
        quoted(column),
        target.placeholder(column, n)
    );
    q
}

/// Ids whose `counter` is at least `threshold` and whose `flag_column` is not `flag` (NULL counts as not).
pub fn select_ids_at_threshold(
    target: &Target<'_>,
    counter: &str,
    threshold: i64,
    flag_column: &str,
    flag: &str,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let t = q.push_param(Value::from(threshold));
    let f = q.push_param(Value::String(flag.to_string()));
    let id = quoted(target.id_column);
    q.sql = format!(
        "SELECT {id} FROM {} WHERE {} >= {} AND CAST({} AS TEXT) IS DISTINCT FROM ${f} ORDER BY {id}",
        target.name(),
        quoted(counter),
        target.placeholder(counter, t),
        quoted(flag_column),
    );
    q
}

/// First version of a new entity: id = max(id) + 1 (1 on an empty table), version = 1,
/// both computed inside the statement.
pub fn insert_first_version(target: &Target<'_>, version_column: &str, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = target.name();
    let id = quoted(target.id_column);
    let mut cols = vec![id.clone(), quoted(version_column)];
    let mut exprs = vec![format!("COALESCE(MAX({}), 0) + 1", id), "1".to_string()];
    for (name, val) in body {
        if name == target.id_column || name == version_column {
            continue;
        }
        let n = q.push_param(val.clone());
        cols.push(quoted(name));
        exprs.push(target.placeholder(name, n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) SELECT {} FROM {} RETURNING *",
        table,
        cols.join(", "),
        exprs.join(", "),
        table
    );
    q
}

/// Next version of an existing entity, built from its current row inside the statement.
/// Body columns are bound; every other catalog column is copied from the current row, except
/// `created_column`, which takes its default. Inserts nothing when the id has no current row.
pub fn insert_next_version(
    target: &Target<'_>,
    version_column: &str,
    created_column: &str,
    id: &str,
    body: &Map<String, Value>,
) -> QueryBuf {
    const CURRENT: &str = "current_rows";
    let mut q = QueryBuf::new();
    let id_col = quoted(target.id_column);
    let version = quoted(version_column);
    let id_ph = target.placeholder(target.id_column, q.push_param(Value::String(id.to_string())));
    let mut cols = vec![id_col.clone(), version.clone()];
    let mut exprs = vec![format!("{CURRENT}.{id_col}"), format!("{CURRENT}.{version} + 1")];
    for column in &target.table.columns {
        let name = column.name.as_str();
        if name == target.id_column || name == version_column {
            continue;
        }
        match body.get(name) {
            Some(val) => {
                let n = q.push_param(val.clone());
                cols.push(quoted(name));
                exprs.push(target.placeholder(name, n));
            }
            None if name == created_column => {}
            None => {
                cols.push(quoted(name));
                exprs.push(format!("{CURRENT}.{}", quoted(name)));
            }
        }
    }
    // unknown body columns still go to the database, which rejects them
    for (name, val) in body {
        if target.table.has_column(name) || name == target.id_column || name == version_column {
            continue;
        }
        let n = q.push_param(val.clone());
        cols.push(quoted(name));
        exprs.push(format!("${}", n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) SELECT {} FROM {} WHERE {CURRENT}.{id_col} = {id_ph} RETURNING *",
        target.name(),
        cols.join(", "),
        exprs.join(", "),
        from_clause(target, Source::CurrentVersions { version_column }),
    );
    q
}

/// Transaction-scoped advisory lock keyed by a string; released at commit or rollback.
pub fn advisory_lock(key: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::String(key.to_string()));
    q.sql = format!("SELECT pg_advisory_xact_lock(hashtext(${}))", n);
    q
}

/// SELECT * where any of `columns` contains the pattern (case-insensitive), capped at `limit` rows.
pub fn search(target: &Target<'_>, source: Source<'_>, columns: &[String], pattern: &str, limit: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::String(pattern.to_string()));
    let ors: Vec<String> = columns
        .iter()
        .map(|c| format!("CAST({} AS TEXT) ILIKE ${}", quoted(c), n))
        .collect();
    let limit_param = q.push_param(Value::from(limit));
    q.sql = format!(
        "SELECT * FROM {} WHERE {} ORDER BY {} LIMIT ${}",
        from_clause(target, source),
        ors.join(" OR "),
        quoted(target.id_column),
        limit_param
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnInfo;

    fn persons() -> TableInfo {
        let col = |name: &str, t: &str| ColumnInfo { name: name.into(), sql_type: t.into() };
        TableInfo::new(
            "persons",
            vec![
                col("id", "integer"),
                col("versionId", "integer"),
                col("name", "character varying"),
                col("nationality", "text"),
                col("timeCreated", "timestamp with time zone"),
            ],
        )
    }

    fn body(v: serde_json::Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    const CURRENT: Source<'static> = Source::CurrentVersions { version_column: "versionId" };

    #[test]
    fn test_quoted_escapes() {
        assert_eq!(quoted("films"), "\"films\"");
        assert_eq!(quoted("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_current_versions_source() {
        let t = persons();
        let target = Target::new("public", &t, "id");
        let from = from_clause(&target, CURRENT);
        assert!(from.starts_with("(SELECT x.* FROM (SELECT \"id\", MAX(\"versionId\") AS \"versionId\""));
        assert!(from.contains("GROUP BY \"id\""));
        assert!(from.ends_with("AS current_rows"));
        assert_eq!(from_clause(&target, Source::Table), "\"public\".\"persons\"");
    }

    #[test]
    fn test_select_by_id_casts_to_column_type() {
        let t = persons();
        let q = select_by_id(&Target::new("public", &t, "id"), Source::Table, "7");
        assert_eq!(q.sql, "SELECT * FROM \"public\".\"persons\" WHERE \"id\" = CAST($1 AS integer)");
        assert_eq!(q.params, vec![Value::String("7".into())]);
    }

    #[test]
    fn test_select_list_full() {
        let t = persons();
        let filter = QueryFilter {
            conditions: vec![("name".into(), Value::String("Jo%".into()))],
            order_by: Some("name".into()),
            descending: true,
            limit: Some(2),
            offset: Some(1),
        };
        let q = select_list(&Target::new("public", &t, "id"), Source::Table, &filter);
        assert_eq!(
            q.sql,
            "SELECT * FROM \"public\".\"persons\" WHERE CAST(\"name\" AS TEXT) LIKE CAST($1 AS TEXT) \
             ORDER BY \"name\" DESC LIMIT $2 OFFSET $3"
        );
        assert_eq!(q.params, vec![Value::String("Jo%".into()), Value::from(2), Value::from(1)]);
    }

    #[test]
    fn test_select_list_no_clauses() {
        let t = persons();
        let q = select_list(&Target::new("public", &t, "id"), Source::Table, &QueryFilter::default());
        assert_eq!(q.sql, "SELECT * FROM \"public\".\"persons\"");
        assert!(q.params.is_empty());
    }

    #[test]
    fn test_select_list_composes_over_current_versions() {
        let t = persons();
        let filter = QueryFilter {
            conditions: vec![("nationality".into(), Value::String("SE".into()))],
            order_by: Some("name".into()),
            ..QueryFilter::default()
        };
        let q = select_list(&Target::new("public", &t, "id"), CURRENT, &filter);
        assert!(q.sql.contains("AS current_rows WHERE CAST(\"nationality\" AS TEXT) LIKE"));
        assert!(q.sql.ends_with("ORDER BY \"name\" ASC"));
    }

    #[test]
    fn test_insert_unknown_column_left_uncast() {
        let t = persons();
        let q = insert(&Target::new("public", &t, "id"), &body(serde_json::json!({"name": "Jo", "shoe": 44})));
        assert_eq!(
            q.sql,
            "INSERT INTO \"public\".\"persons\" (\"name\", \"shoe\") VALUES (CAST($1 AS character varying), $2) RETURNING *"
        );
    }

    #[test]
    fn test_insert_empty_body() {
        let t = persons();
        let q = insert(&Target::new("public", &t, "id"), &Map::new());
        assert_eq!(q.sql, "INSERT INTO \"public\".\"persons\" DEFAULT VALUES RETURNING *");
    }

    #[test]
    fn test_update_skips_id_column() {
        let t = persons();
        let target = Target::new("public", &t, "id");
        let q = update(&target, "3", &body(serde_json::json!({"id": 9, "name": "Ann"}))).unwrap();
        assert_eq!(
            q.sql,
            "UPDATE \"public\".\"persons\" SET \"name\" = CAST($1 AS character varying) WHERE \"id\" = CAST($2 AS integer) RETURNING *"
        );
        assert_eq!(q.params[1], Value::String("3".into()));
        assert!(update(&target, "3", &body(serde_json::json!({"id": 9}))).is_none());
    }

    #[test]
    fn test_delete_by_id() {
        let t = persons();
        let q = delete(&Target::new("public", &t, "id"), "4");
        assert_eq!(q.sql, "DELETE FROM \"public\".\"persons\" WHERE \"id\" = CAST($1 AS integer)");
    }

    #[test]
    fn test_insert_first_version() {
        let t = persons();
        let q = insert_first_version(
            &Target::new("public", &t, "id"),
            "versionId",
            &body(serde_json::json!({"name": "Jo", "versionId": 5})),
        );
        assert_eq!(
            q.sql,
            "INSERT INTO \"public\".\"persons\" (\"id\", \"versionId\", \"name\") \
             SELECT COALESCE(MAX(\"id\"), 0) + 1, 1, CAST($1 AS character varying) FROM \"public\".\"persons\" RETURNING *"
        );
        assert_eq!(q.params, vec![Value::String("Jo".into())]);
    }

    #[test]
    fn test_insert_next_version_copies_from_current_row() {
        let t = persons();
        let q = insert_next_version(
            &Target::new("public", &t, "id"),
            "versionId",
            "timeCreated",
            "7",
            &body(serde_json::json!({"nationality": "SE"})),
        );
        assert!(q.sql.starts_with(
            "INSERT INTO \"public\".\"persons\" (\"id\", \"versionId\", \"name\", \"nationality\") \
             SELECT current_rows.\"id\", current_rows.\"versionId\" + 1, current_rows.\"name\", CAST($2 AS text) \
             FROM (SELECT x.* FROM"
        ));
        assert!(q.sql.ends_with("AS current_rows WHERE current_rows.\"id\" = CAST($1 AS integer) RETURNING *"));
        assert_eq!(q.params, vec![Value::String("7".into()), Value::String("SE".into())]);
    }

    #[test]
    fn test_insert_next_version_body_overrides_created_and_passes_unknown() {
        let t = persons();
        let q = insert_next_version(
            &Target::new("public", &t, "id"),
            "versionId",
            "timeCreated",
            "7",
            &body(serde_json::json!({"timeCreated": "2024-05-01T00:00:00Z", "shoe": 44, "versionId": 99})),
        );
        assert!(q.sql.contains(
            "(\"id\", \"versionId\", \"name\", \"nationality\", \"timeCreated\", \"shoe\")"
        ));
        assert!(q.sql.contains("CAST($2 AS timestamp with time zone), $3 FROM"));
        assert_eq!(q.params.len(), 3);
    }

    #[test]
    fn test_delete_by_changer_column() {
        let t = TableInfo::new("reviews", vec![ColumnInfo { name: "changerId".into(), sql_type: "bigint".into() }]);
        let q = delete_by_column(&Target::new("public", &t, "id"), "changerId", Value::from(12));
        assert_eq!(q.sql, "DELETE FROM \"public\".\"reviews\" WHERE \"changerId\" = CAST($1 AS bigint)");
        assert_eq!(q.params, vec![Value::from(12)]);
    }

    #[test]
    fn test_select_ids_at_threshold() {
        let col = |name: &str, t: &str| ColumnInfo { name: name.into(), sql_type: t.into() };
        let t = TableInfo::new("users", vec![col("id", "integer"), col("warnings", "integer"), col("role", "text")]);
        let q = select_ids_at_threshold(&Target::new("public", &t, "id"), "warnings", 3, "role", "banned");
        assert_eq!(
            q.sql,
            "SELECT \"id\" FROM \"public\".\"users\" WHERE \"warnings\" >= CAST($1 AS integer) \
             AND CAST(\"role\" AS TEXT) IS DISTINCT FROM $2 ORDER BY \"id\""
        );
        assert_eq!(q.params, vec![Value::from(3), Value::String("banned".into())]);
    }

    #[test]
    fn test_advisory_lock() {
        let q = advisory_lock("persons:7");
        assert_eq!(q.sql, "SELECT pg_advisory_xact_lock(hashtext($1))");
        assert_eq!(q.params, vec![Value::String("persons:7".into())]);
    }

    #[test]
    fn test_search_disjunction() {
        let t = persons();
        let q = search(
            &Target::new("public", &t, "id"),
            CURRENT,
            &["name".to_string(), "nationality".to_string()],
            "%ska%",
            50,
        );
        assert!(q.sql.contains("CAST(\"name\" AS TEXT) ILIKE $1 OR CAST(\"nationality\" AS TEXT) ILIKE $1"));
        assert!(q.sql.ends_with("ORDER BY \"id\" LIMIT $2"));
        assert_eq!(q.params, vec![Value::String("%ska%".into()), Value::from(50)]);
    }
}

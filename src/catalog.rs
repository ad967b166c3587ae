//! Table/column allowlist read from the live schema at startup.

use crate::error::ConfigError;
use sqlx::PgPool;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    /// Type name as printed by `format_type` (e.g. "integer", "character varying"). Used for placeholder casts.
    pub sql_type: String,
}

impl ColumnInfo {
    pub fn is_integer(&self) -> bool {
        matches!(self.sql_type.as_str(), "smallint" | "integer" | "bigint")
    }
}

#[derive(Clone, Debug)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        TableInfo {
            name: name.into(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct SchemaCatalog {
    pub schema: String,
    tables: HashMap<String, TableInfo>,
}

impl SchemaCatalog {
    pub fn from_tables(schema: impl Into<String>, tables: Vec<TableInfo>) -> Self {
        SchemaCatalog {
            schema: schema.into(),
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// Reads ordinary tables, partitioned tables and views of `schema` with their columns.
    pub async fn load(pool: &PgPool, schema: &str) -> Result<Self, ConfigError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT c.relname::text, a.attname::text, format_type(a.atttypid, NULL)
            FROM pg_catalog.pg_attribute a
            JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1
              AND c.relkind IN ('r', 'p', 'v')
              AND a.attnum > 0
              AND NOT a.attisdropped
            ORDER BY c.relname, a.attnum
            "#,
        )
        .bind(schema)
        .fetch_all(pool)
        .await?;

        let mut tables: HashMap<String, TableInfo> = HashMap::new();
        for (table, column, sql_type) in rows {
            tables
                .entry(table.clone())
                .or_insert_with(|| TableInfo::new(table, Vec::new()))
                .columns
                .push(ColumnInfo { name: column, sql_type });
        }
        tracing::info!(schema = %schema, tables = tables.len(), "schema catalog loaded");
        Ok(SchemaCatalog {
            schema: schema.to_string(),
            tables,
        })
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.get(name)
    }

    pub fn require_table(&self, name: &str) -> Result<&TableInfo, ConfigError> {
        self.table(name).ok_or_else(|| ConfigError::UnknownTable(name.to_string()))
    }

    pub fn require_column(&self, table: &str, column: &str) -> Result<&ColumnInfo, ConfigError> {
        self.require_table(table)?
            .column(column)
            .ok_or_else(|| ConfigError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

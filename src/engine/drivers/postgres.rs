//! PostgreSQL Driver
//!
//! Implements the DataEngine trait for PostgreSQL databases using SQLx.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};
use tokio::sync::RwLock;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::DataEngine;
use crate::engine::types::{
    ColumnInfo, ConnectionConfig, FunctionInfo, QueryResult, ResultColumn, RowObject,
    SchemaSnapshot, SessionId, TableData, TableSummary,
};

const TABLES_QUERY: &str = r#"
    SELECT c.relname::text AS table_name,
           CASE c.relkind
               WHEN 'r' THEN 'table'
               WHEN 'p' THEN 'table'
               WHEN 'v' THEN 'view'
               WHEN 'm' THEN 'materialized view'
               ELSE c.relkind::text
           END AS table_type
    FROM pg_class c
    JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1
      AND c.relkind IN ('r', 'p', 'v', 'm')
      AND NOT EXISTS (
          SELECT 1 FROM pg_catalog.pg_depend d
          WHERE d.objid = c.oid
            AND d.deptype = 'e'
      )
    ORDER BY c.relname
"#;

const FUNCTIONS_QUERY: &str = r#"
    SELECT p.proname::text AS name,
           pg_get_function_result(p.oid)::text AS return_type,
           pg_get_function_arguments(p.oid)::text AS arguments
    FROM pg_proc p
    JOIN pg_namespace n ON p.pronamespace = n.oid
    WHERE n.nspname = $1
    ORDER BY p.proname
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT a.attname::text AS column_name,
           format_type(a.atttypid, a.atttypmod)::text AS data_type,
           NOT a.attnotnull AS is_nullable,
           EXISTS (
               SELECT 1 FROM pg_constraint p
               WHERE p.conrelid = a.attrelid
                 AND p.contype = 'p'
                 AND a.attnum = ANY(p.conkey)
           ) AS is_primary_key,
           EXISTS (
               SELECT 1 FROM pg_constraint f
               WHERE f.conrelid = a.attrelid
                 AND f.contype = 'f'
                 AND a.attnum = ANY(f.conkey)
           ) AS is_foreign_key,
           col_description(a.attrelid, a.attnum)::text AS description
    FROM pg_attribute a
    JOIN pg_class c ON c.oid = a.attrelid
    JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1
      AND c.relname = $2
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

/// PostgreSQL driver implementation
pub struct PostgresDriver {
    sessions: Arc<RwLock<HashMap<SessionId, PgPool>>>,
}

impl PostgresDriver {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn get_pool(&self, session: SessionId) -> EngineResult<PgPool> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session)
            .cloned()
            .ok_or_else(|| EngineError::session_not_found(session.to_string()))
    }

    /// Builds connect options from config; credentials are passed as-is, never URL-encoded
    fn connect_options(config: &ConnectionConfig) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
    }

    /// Quotes an identifier for interpolation into SQL
    fn quote_ident(ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn map_query_error(e: sqlx::Error) -> EngineError {
        let msg = e.to_string();
        if msg.contains("syntax error") {
            EngineError::syntax_error(msg)
        } else {
            EngineError::execution_error(msg)
        }
    }

    /// Converts a SQLx row to a JSON object keyed by column name
    fn convert_row(pg_row: &PgRow) -> RowObject {
        pg_row
            .columns()
            .iter()
            .map(|col| (col.name().to_string(), Self::extract_value(pg_row, col.ordinal())))
            .collect()
    }

    /// Extracts a value from a PgRow at the given index
    fn extract_value(row: &PgRow, idx: usize) -> JsonValue {
        // Integers before bool so int columns are not misread
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            return v.map(|f| JsonValue::from(f as f64)).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<rust_decimal::Decimal>, _>(idx) {
            return v
                .map(|d| JsonValue::String(d.to_string()))
                .unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
            return v
                .map(|dt| JsonValue::String(dt.to_rfc3339()))
                .unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
            return v
                .map(|dt| JsonValue::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
                .unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
            return v
                .map(|d| JsonValue::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
            return v
                .map(|t| JsonValue::String(t.format("%H:%M:%S").to_string()))
                .unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            return v
                .map(|b| JsonValue::String(STANDARD.encode(b)))
                .unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<JsonValue>, _>(idx) {
            return v.unwrap_or(JsonValue::Null);
        }

        JsonValue::Null
    }

    fn result_columns(row: &PgRow) -> Vec<ResultColumn> {
        row.columns()
            .iter()
            .map(|col| ResultColumn {
                name: col.name().to_string(),
                data_type: col.type_info().name().to_string(),
            })
            .collect()
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataEngine for PostgresDriver {
    fn driver_id(&self) -> &'static str {
        "postgres"
    }

    fn driver_name(&self) -> &'static str {
        "PostgreSQL"
    }

    async fn connect(&self, config: &ConnectionConfig) -> EngineResult<SessionId> {
        let options = Self::connect_options(config);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                if e.to_string().contains("password authentication failed") {
                    EngineError::auth_failed(e.to_string())
                } else {
                    EngineError::connection_failed(e.to_string())
                }
            })?;

        let session_id = SessionId::new();
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, pool);

        Ok(session_id)
    }

    async fn disconnect(&self, session: SessionId) -> EngineResult<()> {
        let pool = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(&session)
                .ok_or_else(|| EngineError::session_not_found(session.to_string()))?
        };

        pool.close().await;
        Ok(())
    }

    fn default_schema(&self, _config: &ConnectionConfig) -> String {
        "public".to_string()
    }

    async fn schema_snapshot(
        &self,
        session: SessionId,
        schema: &str,
    ) -> EngineResult<SchemaSnapshot> {
        let pool = self.get_pool(session).await?;

        let table_rows: Vec<(String, String)> = sqlx::query_as(TABLES_QUERY)
            .bind(schema)
            .fetch_all(&pool)
            .await
            .map_err(|e| EngineError::execution_error(e.to_string()))?;

        let function_rows: Vec<(String, String, String)> = sqlx::query_as(FUNCTIONS_QUERY)
            .bind(schema)
            .fetch_all(&pool)
            .await
            .map_err(|e| EngineError::execution_error(e.to_string()))?;

        Ok(SchemaSnapshot {
            schema: schema.to_string(),
            tables: table_rows
                .into_iter()
                .map(|(name, table_type)| TableSummary {
                    name,
                    table_type,
                    columns: Vec::new(),
                })
                .collect(),
            functions: function_rows
                .into_iter()
                .map(|(name, return_type, arguments)| FunctionInfo {
                    name,
                    return_type,
                    arguments,
                })
                .collect(),
            connection: None,
        })
    }

    async fn table_data(
        &self,
        session: SessionId,
        schema: &str,
        table: &str,
        limit: i64,
        offset: i64,
    ) -> EngineResult<TableData> {
        let pool = self.get_pool(session).await?;

        let column_rows: Vec<(String, String, bool, bool, bool, Option<String>)> =
            sqlx::query_as(COLUMNS_QUERY)
                .bind(schema)
                .bind(table)
                .fetch_all(&pool)
                .await
                .map_err(|e| EngineError::execution_error(format!("Failed to get columns: {}", e)))?;

        let columns = column_rows
            .into_iter()
            .map(
                |(name, data_type, is_nullable, is_primary_key, is_foreign_key, description)| {
                    ColumnInfo {
                        name,
                        data_type,
                        is_nullable,
                        is_primary_key,
                        is_foreign_key,
                        description,
                    }
                },
            )
            .collect();

        let qualified = format!("{}.{}", Self::quote_ident(schema), Self::quote_ident(table));

        let total_rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", qualified))
            .fetch_one(&pool)
            .await
            .map_err(|e| EngineError::execution_error(format!("Failed to get row count: {}", e)))?;

        let pg_rows: Vec<PgRow> =
            sqlx::query(&format!("SELECT * FROM {} LIMIT $1 OFFSET $2", qualified))
                .bind(limit)
                .bind(offset)
                .fetch_all(&pool)
                .await
                .map_err(|e| EngineError::execution_error(format!("Failed to get rows: {}", e)))?;

        Ok(TableData {
            columns,
            rows: pg_rows.iter().map(Self::convert_row).collect(),
            total_rows,
        })
    }

    async fn execute(&self, session: SessionId, query: &str) -> EngineResult<QueryResult> {
        let pool = self.get_pool(session).await?;
        let start = Instant::now();

        let trimmed = query.trim_start().to_uppercase();
        let is_select = trimmed.starts_with("SELECT")
            || trimmed.starts_with("WITH")
            || trimmed.starts_with("SHOW")
            || trimmed.starts_with("EXPLAIN")
            || trimmed.starts_with("VALUES");

        if !is_select {
            let result = sqlx::query(query)
                .execute(&pool)
                .await
                .map_err(Self::map_query_error)?;
            return Ok(QueryResult::with_affected_rows(
                result.rows_affected(),
                start.elapsed().as_micros() as f64 / 1000.0,
            ));
        }

        let pg_rows: Vec<PgRow> = sqlx::query(query)
            .fetch_all(&pool)
            .await
            .map_err(Self::map_query_error)?;

        let execution_time_ms = start.elapsed().as_micros() as f64 / 1000.0;

        Ok(QueryResult {
            columns: pg_rows.first().map(Self::result_columns).unwrap_or_default(),
            rows: pg_rows.iter().map(Self::convert_row).collect(),
            affected_rows: None,
            execution_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::DbType;

    #[test]
    fn connect_options_keep_reserved_characters() {
        let config = ConnectionConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "app@ops".to_string(),
            password: "s3cr/et#1".to_string(),
            database: "testdb".to_string(),
            db_type: DbType::Postgres,
            connection_name: None,
        };

        let options = PostgresDriver::connect_options(&config);
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "app@ops");
        assert_eq!(options.get_database(), Some("testdb"));
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(PostgresDriver::quote_ident("users"), "\"users\"");
        assert_eq!(
            PostgresDriver::quote_ident("we\"ird"),
            "\"we\"\"ird\""
        );
    }
}

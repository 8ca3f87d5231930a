//! MySQL Driver
//!
//! Implements the DataEngine trait for MySQL/MariaDB databases using SQLx.
//! A MySQL "schema" is a database, so the explorer starts at the configured one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo};
use tokio::sync::RwLock;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::DataEngine;
use crate::engine::types::{
    ColumnInfo, ConnectionConfig, FunctionInfo, QueryResult, ResultColumn, RowObject,
    SchemaSnapshot, SessionId, TableData, TableSummary,
};

// Cast to CHAR to avoid BINARY type mismatch with Rust String
const TABLES_QUERY: &str = r#"
    SELECT CAST(TABLE_NAME AS CHAR) AS table_name,
           CAST(CASE TABLE_TYPE WHEN 'VIEW' THEN 'view' ELSE 'table' END AS CHAR) AS table_type
    FROM information_schema.TABLES
    WHERE TABLE_SCHEMA = ?
    ORDER BY TABLE_NAME
"#;

const FUNCTIONS_QUERY: &str = r#"
    SELECT CAST(r.ROUTINE_NAME AS CHAR) AS name,
           CAST(COALESCE(r.DTD_IDENTIFIER, '') AS CHAR) AS return_type,
           CAST(COALESCE((
               SELECT GROUP_CONCAT(CONCAT(p.PARAMETER_NAME, ' ', p.DTD_IDENTIFIER)
                                   ORDER BY p.ORDINAL_POSITION SEPARATOR ', ')
               FROM information_schema.PARAMETERS p
               WHERE p.SPECIFIC_SCHEMA = r.ROUTINE_SCHEMA
                 AND p.SPECIFIC_NAME = r.SPECIFIC_NAME
                 AND p.ORDINAL_POSITION > 0
           ), '') AS CHAR) AS arguments
    FROM information_schema.ROUTINES r
    WHERE r.ROUTINE_SCHEMA = ?
      AND r.ROUTINE_TYPE = 'FUNCTION'
    ORDER BY r.ROUTINE_NAME
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT CAST(c.COLUMN_NAME AS CHAR) AS column_name,
           CAST(c.COLUMN_TYPE AS CHAR) AS column_type,
           CAST(c.IS_NULLABLE AS CHAR) AS is_nullable,
           CAST(c.COLUMN_KEY AS CHAR) AS column_key,
           CAST(EXISTS (
               SELECT 1 FROM information_schema.KEY_COLUMN_USAGE k
               WHERE k.TABLE_SCHEMA = c.TABLE_SCHEMA
                 AND k.TABLE_NAME = c.TABLE_NAME
                 AND k.COLUMN_NAME = c.COLUMN_NAME
                 AND k.REFERENCED_TABLE_NAME IS NOT NULL
           ) AS SIGNED) AS is_foreign_key,
           CAST(NULLIF(c.COLUMN_COMMENT, '') AS CHAR) AS description
    FROM information_schema.COLUMNS c
    WHERE c.TABLE_SCHEMA = ? AND c.TABLE_NAME = ?
    ORDER BY c.ORDINAL_POSITION
"#;

/// MySQL driver implementation
pub struct MySqlDriver {
    sessions: Arc<RwLock<HashMap<SessionId, MySqlPool>>>,
}

impl MySqlDriver {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn get_pool(&self, session: SessionId) -> EngineResult<MySqlPool> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session)
            .cloned()
            .ok_or_else(|| EngineError::session_not_found(session.to_string()))
    }

    fn connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
    }

    /// Backtick-quotes an identifier
    fn quote_ident(ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn map_query_error(e: sqlx::Error) -> EngineError {
        let msg = e.to_string();
        if msg.contains("You have an error in your SQL syntax") {
            EngineError::syntax_error(msg)
        } else {
            EngineError::execution_error(msg)
        }
    }

    fn convert_row(mysql_row: &MySqlRow) -> RowObject {
        mysql_row
            .columns()
            .iter()
            .map(|col| {
                (
                    col.name().to_string(),
                    Self::extract_value(mysql_row, col.ordinal()),
                )
            })
            .collect()
    }

    /// Extracts a value from a MySqlRow at the given index
    fn extract_value(row: &MySqlRow, idx: usize) -> JsonValue {
        // u64 first for BIGINT UNSIGNED columns
        if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<u32>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<u16>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i8>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<u8>, _>(idx) {
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
        if let Ok(v) = row.try_get::<Option<Decimal>, _>(idx) {
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

    fn result_columns(row: &MySqlRow) -> Vec<ResultColumn> {
        row.columns()
            .iter()
            .map(|col| ResultColumn {
                name: col.name().to_string(),
                data_type: col.type_info().name().to_string(),
            })
            .collect()
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataEngine for MySqlDriver {
    fn driver_id(&self) -> &'static str {
        "mysql"
    }

    fn driver_name(&self) -> &'static str {
        "MySQL"
    }

    async fn connect(&self, config: &ConnectionConfig) -> EngineResult<SessionId> {
        let options = Self::connect_options(config);

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| {
                if e.to_string().contains("Access denied") {
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

        let column_rows: Vec<(String, String, String, String, i64, Option<String>)> =
            sqlx::query_as(COLUMNS_QUERY)
                .bind(schema)
                .bind(table)
                .fetch_all(&pool)
                .await
                .map_err(|e| EngineError::execution_error(format!("Failed to get columns: {}", e)))?;

        let columns = column_rows
            .into_iter()
            .map(
                |(name, data_type, is_nullable, column_key, is_foreign_key, description)| {
                    ColumnInfo {
                        name,
                        data_type,
                        is_nullable: is_nullable == "YES",
                        is_primary_key: column_key == "PRI",
                        is_foreign_key: is_foreign_key != 0,
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

        let mysql_rows: Vec<MySqlRow> =
            sqlx::query(&format!("SELECT * FROM {} LIMIT ? OFFSET ?", qualified))
                .bind(limit)
                .bind(offset)
                .fetch_all(&pool)
                .await
                .map_err(|e| EngineError::execution_error(format!("Failed to get rows: {}", e)))?;

        Ok(TableData {
            columns,
            rows: mysql_rows.iter().map(Self::convert_row).collect(),
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
            || trimmed.starts_with("DESCRIBE")
            || trimmed.starts_with("EXPLAIN");

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

        let mysql_rows: Vec<MySqlRow> = sqlx::query(query)
            .fetch_all(&pool)
            .await
            .map_err(Self::map_query_error)?;

        let execution_time_ms = start.elapsed().as_micros() as f64 / 1000.0;

        Ok(QueryResult {
            columns: mysql_rows
                .first()
                .map(Self::result_columns)
                .unwrap_or_default(),
            rows: mysql_rows.iter().map(Self::convert_row).collect(),
            affected_rows: None,
            execution_time_ms,
        })
    }
}

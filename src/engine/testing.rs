//! In-memory driver used by unit tests across the crate.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::DataEngine;
use crate::engine::types::{
    ColumnInfo, ConnectionConfig, QueryResult, ResultColumn, RowObject, SchemaSnapshot, SessionId,
    TableData, TableSummary,
};

pub struct FakeDriver {
    id: &'static str,
    pub fail_connect: Option<String>,
    pub fail_snapshot: Option<String>,
    pub connect_delay: Option<Duration>,
    sessions: Mutex<HashSet<SessionId>>,
    pub table_requests: Mutex<Vec<(String, String, i64, i64)>>,
}

impl FakeDriver {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            fail_connect: None,
            fail_snapshot: None,
            connect_delay: None,
            sessions: Mutex::new(HashSet::new()),
            table_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_connect(id: &'static str, message: &str) -> Self {
        let mut driver = Self::new(id);
        driver.fail_connect = Some(message.to_string());
        driver
    }

    pub fn failing_snapshot(id: &'static str, message: &str) -> Self {
        let mut driver = Self::new(id);
        driver.fail_snapshot = Some(message.to_string());
        driver
    }

    /// Waits on the tokio clock before each connect completes
    pub fn slow_connect(id: &'static str, delay: Duration) -> Self {
        let mut driver = Self::new(id);
        driver.connect_delay = Some(delay);
        driver
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    fn check_session(&self, session: SessionId) -> EngineResult<()> {
        if self.sessions.lock().unwrap().contains(&session) {
            Ok(())
        } else {
            Err(EngineError::session_not_found(session.to_string()))
        }
    }

    pub fn users_columns() -> Vec<ColumnInfo> {
        vec![
            ColumnInfo {
                name: "id".to_string(),
                data_type: "integer".to_string(),
                is_nullable: false,
                is_primary_key: true,
                is_foreign_key: false,
                description: None,
            },
            ColumnInfo {
                name: "email".to_string(),
                data_type: "text".to_string(),
                is_nullable: true,
                is_primary_key: false,
                is_foreign_key: false,
                description: Some("login address".to_string()),
            },
        ]
    }
}

#[async_trait]
impl DataEngine for FakeDriver {
    fn driver_id(&self) -> &'static str {
        self.id
    }

    fn driver_name(&self) -> &'static str {
        "Fake"
    }

    async fn connect(&self, config: &ConnectionConfig) -> EngineResult<SessionId> {
        if let Some(message) = &self.fail_connect {
            return Err(EngineError::auth_failed(message.clone()));
        }
        let _ = config;
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        let session = SessionId::new();
        self.sessions.lock().unwrap().insert(session);
        Ok(session)
    }

    async fn disconnect(&self, session: SessionId) -> EngineResult<()> {
        if self.sessions.lock().unwrap().remove(&session) {
            Ok(())
        } else {
            Err(EngineError::session_not_found(session.to_string()))
        }
    }

    fn default_schema(&self, _config: &ConnectionConfig) -> String {
        "public".to_string()
    }

    async fn schema_snapshot(
        &self,
        session: SessionId,
        schema: &str,
    ) -> EngineResult<SchemaSnapshot> {
        self.check_session(session)?;
        if let Some(message) = &self.fail_snapshot {
            return Err(EngineError::execution_error(message.clone()));
        }
        Ok(SchemaSnapshot {
            schema: schema.to_string(),
            tables: vec![TableSummary {
                name: "users".to_string(),
                table_type: "table".to_string(),
                columns: Vec::new(),
            }],
            functions: Vec::new(),
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
        self.check_session(session)?;
        self.table_requests.lock().unwrap().push((
            schema.to_string(),
            table.to_string(),
            limit,
            offset,
        ));

        let mut row = RowObject::new();
        row.insert("id".to_string(), json!(1));
        row.insert("email".to_string(), json!("ada@example.com"));

        Ok(TableData {
            columns: Self::users_columns(),
            rows: vec![row],
            total_rows: 1,
        })
    }

    async fn execute(&self, session: SessionId, query: &str) -> EngineResult<QueryResult> {
        self.check_session(session)?;
        if query.trim().is_empty() {
            return Err(EngineError::syntax_error("empty query"));
        }
        let mut result = QueryResult::empty();
        result.columns.push(ResultColumn {
            name: "?column?".to_string(),
            data_type: "int4".to_string(),
        });
        let mut row = RowObject::new();
        row.insert("?column?".to_string(), json!(1));
        result.rows.push(row);
        Ok(result)
    }
}

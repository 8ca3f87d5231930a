//! Command bridge
//!
//! The generic command-dispatch surface the UI talks to. `LocalBridge` serves
//! it in-process from the session manager; the Tauri commands are thin
//! wrappers over it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{ConnectionEvent, EventChannel};
use crate::engine::types::{ConnectionConfig, QueryResult, SchemaSnapshot, SessionId, TableData};
use crate::engine::validation::normalize_config;
use crate::engine::SessionManager;

const CONNECTED_MESSAGE: &str = "Connected successfully";

#[async_trait]
pub trait CommandBridge: Send + Sync {
    /// Opens a connection. The outcome is also published on the
    /// `database-connection` channel, exactly once per call.
    async fn connect_database(&self, config: ConnectionConfig) -> EngineResult<SessionId>;

    async fn get_table_data(
        &self,
        session: SessionId,
        schema: &str,
        table: &str,
        limit: i64,
        offset: i64,
    ) -> EngineResult<TableData>;

    async fn execute_query(&self, session: SessionId, query: &str) -> EngineResult<QueryResult>;

    async fn close_connection(&self, session: SessionId) -> EngineResult<()>;
}

pub struct LocalBridge {
    sessions: Arc<SessionManager>,
    events: EventChannel,
}

impl LocalBridge {
    pub fn new(sessions: Arc<SessionManager>, events: EventChannel) -> Self {
        Self { sessions, events }
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    async fn open(&self, config: ConnectionConfig) -> EngineResult<(SessionId, SchemaSnapshot)> {
        let config = normalize_config(config).map_err(EngineError::invalid_config)?;
        let driver = self.sessions.driver_for(&config)?;
        let schema = driver.default_schema(&config);
        let info = config.connection_info();

        let session = self.sessions.connect(config).await?;

        match driver.schema_snapshot(session, &schema).await {
            Ok(mut snapshot) => {
                snapshot.connection = Some(info);
                Ok((session, snapshot))
            }
            Err(err) => {
                if let Err(close_err) = self.sessions.disconnect(session).await {
                    tracing::warn!(
                        session_id = %session,
                        error = %close_err,
                        "failed to release session after snapshot error"
                    );
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl CommandBridge for LocalBridge {
    #[instrument(
        skip(self, config),
        fields(db_type = %config.db_type, host = %config.host, port = config.port)
    )]
    async fn connect_database(&self, config: ConnectionConfig) -> EngineResult<SessionId> {
        match self.open(config).await {
            Ok((session, snapshot)) => {
                tracing::info!(
                    session_id = %session,
                    schema = %snapshot.schema,
                    tables = snapshot.tables.len(),
                    "connection established"
                );
                self.events.emit(ConnectionEvent::success(
                    CONNECTED_MESSAGE,
                    vec![snapshot],
                    Some(session),
                ));
                Ok(session)
            }
            Err(err) => {
                tracing::warn!(error = %err, "connection failed");
                self.events.emit(ConnectionEvent::error(err.detail()));
                Err(err)
            }
        }
    }

    #[instrument(skip(self), fields(session_id = %session))]
    async fn get_table_data(
        &self,
        session: SessionId,
        schema: &str,
        table: &str,
        limit: i64,
        offset: i64,
    ) -> EngineResult<TableData> {
        // Zero means unbounded to MongoDB
        if limit <= 0 || offset < 0 {
            return Err(EngineError::invalid_config(
                "limit must be positive and offset must not be negative",
            ));
        }
        let driver = self.sessions.get_driver(session).await?;
        driver.table_data(session, schema, table, limit, offset).await
    }

    #[instrument(skip(self, query), fields(session_id = %session, query_len = query.len()))]
    async fn execute_query(&self, session: SessionId, query: &str) -> EngineResult<QueryResult> {
        let driver = self.sessions.get_driver(session).await?;
        let start_time = std::time::Instant::now();
        let mut result = driver.execute(session, query).await?;
        result.execution_time_ms = start_time.elapsed().as_micros() as f64 / 1000.0;
        Ok(result)
    }

    async fn close_connection(&self, session: SessionId) -> EngineResult<()> {
        self.sessions.disconnect(session).await
    }
}

//! DataEngine trait definition
//!
//! Every database driver implements this trait. The session manager and the
//! command bridge only ever talk to drivers through it.

use async_trait::async_trait;

use crate::engine::error::EngineResult;
use crate::engine::types::{ConnectionConfig, QueryResult, SchemaSnapshot, SessionId, TableData};

/// Core trait that all database drivers must implement
#[async_trait]
pub trait DataEngine: Send + Sync {
    /// Returns the unique identifier for this driver (e.g., "postgres", "mysql", "mongodb")
    fn driver_id(&self) -> &'static str;

    /// Returns a human-readable name for this driver
    fn driver_name(&self) -> &'static str;

    /// Establishes a connection and returns a session identifier
    async fn connect(&self, config: &ConnectionConfig) -> EngineResult<SessionId>;

    /// Closes a session and releases associated resources
    async fn disconnect(&self, session: SessionId) -> EngineResult<()>;

    /// Schema explored right after connecting
    fn default_schema(&self, config: &ConnectionConfig) -> String {
        config.database.clone()
    }

    /// Lists the relations and callables of one schema
    ///
    /// Table columns are left empty; they are fetched on demand.
    async fn schema_snapshot(&self, session: SessionId, schema: &str)
        -> EngineResult<SchemaSnapshot>;

    /// Returns column metadata, one page of rows, and the total row count
    async fn table_data(
        &self,
        session: SessionId,
        schema: &str,
        table: &str,
        limit: i64,
        offset: i64,
    ) -> EngineResult<TableData>;

    /// Executes a statement from the query editor
    async fn execute(&self, session: SessionId, query: &str) -> EngineResult<QueryResult> {
        let _ = (session, query);
        Err(crate::engine::error::EngineError::not_supported(
            "Ad-hoc queries are not supported by this driver",
        ))
    }
}

//! On-demand enrichment of connection records
//!
//! Expanding a table in the explorer fetches its first page of rows and its
//! columns from the backend and merges them into the shared record.

use std::sync::Arc;

use tracing::instrument;

use crate::engine::bridge::CommandBridge;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{QueryResult, SessionId};
use crate::explorer::model::{ColumnNode, ConnectionId};
use crate::explorer::store::{read_record, ConnectionRegistry};

pub const DEFAULT_PAGE_SIZE: i64 = 100;

pub struct Explorer {
    registry: Arc<ConnectionRegistry>,
    bridge: Arc<dyn CommandBridge>,
    page_size: i64,
}

impl Explorer {
    pub fn new(registry: Arc<ConnectionRegistry>, bridge: Arc<dyn CommandBridge>) -> Self {
        Self {
            registry,
            bridge,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    fn session_of(&self, id: &ConnectionId) -> Option<SessionId> {
        let record = self.registry.get(id)?;
        let guard = read_record(&record);
        guard.session_id
    }

    /// Fetches the first page of `schema.table` and stores it on the record.
    ///
    /// Returns `Ok(false)` when there is nothing to enrich: unknown connection,
    /// a record without a backend session, or a table the record does not list.
    #[instrument(skip(self), fields(connection_id = %id))]
    pub async fn expand_table(
        &self,
        id: ConnectionId,
        schema: &str,
        table: &str,
    ) -> EngineResult<bool> {
        let Some(session) = self.session_of(&id) else {
            tracing::debug!("no backend session, skipping enrichment");
            return Ok(false);
        };

        let data = self
            .bridge
            .get_table_data(session, schema, table, self.page_size, 0)
            .await?;

        let columns = data.columns.into_iter().map(ColumnNode::from).collect();
        let columns_applied = self
            .registry
            .update_table_columns(&id, schema, table, columns);
        let rows_applied =
            self.registry
                .update_table_rows(&id, schema, table, data.rows, data.total_rows);

        Ok(columns_applied && rows_applied)
    }

    /// Runs a statement against the record's backend session
    #[instrument(skip(self, query), fields(connection_id = %id))]
    pub async fn run_query(&self, id: ConnectionId, query: &str) -> EngineResult<QueryResult> {
        let session = self
            .session_of(&id)
            .ok_or_else(|| EngineError::invalid_config(format!("Connection {} is not open", id)))?;
        self.bridge.execute_query(session, query).await
    }
}

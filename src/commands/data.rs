//! Data Tauri Commands
//!
//! Table paging, explorer enrichment, and the query editor.

use serde::Serialize;
use std::sync::Arc;
use tauri::State;
use tracing::instrument;

use crate::engine::types::{QueryResult, SessionId, TableData};
use crate::engine::CommandBridge;
use crate::explorer::ConnectionId;
use crate::SharedState;

#[derive(Debug, Serialize)]
pub struct TableDataResponse {
    pub success: bool,
    pub data: Option<TableData>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExpandResponse {
    pub success: bool,
    /// False when the table could not be matched to a loaded record
    pub applied: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub result: Option<QueryResult>,
    pub error: Option<String>,
}

/// Raw page fetch against a backend session
#[tauri::command]
#[instrument(skip(state), fields(session_id = %session_id, schema = %schema, table = %table))]
pub async fn get_table_data(
    state: State<'_, SharedState>,
    session_id: String,
    schema: String,
    table: String,
    limit: i64,
    offset: i64,
) -> Result<TableDataResponse, String> {
    let session = SessionId::parse(&session_id)?;
    let bridge = {
        let state = state.lock().await;
        Arc::clone(&state.bridge)
    };

    match bridge
        .get_table_data(session, &schema, &table, limit, offset)
        .await
    {
        Ok(data) => Ok(TableDataResponse {
            success: true,
            data: Some(data),
            error: None,
        }),
        Err(e) => Ok(TableDataResponse {
            success: false,
            data: None,
            error: Some(e.to_string()),
        }),
    }
}

/// Loads columns and the first page of rows into the connection record
#[tauri::command]
pub async fn expand_table(
    state: State<'_, SharedState>,
    connection_id: String,
    schema: String,
    table: String,
) -> Result<ExpandResponse, String> {
    let id = ConnectionId::parse(&connection_id)?;
    let explorer = {
        let state = state.lock().await;
        Arc::clone(&state.explorer)
    };

    match explorer.expand_table(id, &schema, &table).await {
        Ok(applied) => Ok(ExpandResponse {
            success: true,
            applied,
            error: None,
        }),
        Err(e) => Ok(ExpandResponse {
            success: false,
            applied: false,
            error: Some(e.to_string()),
        }),
    }
}

#[tauri::command]
pub async fn execute_query(
    state: State<'_, SharedState>,
    connection_id: String,
    query: String,
) -> Result<QueryResponse, String> {
    let id = ConnectionId::parse(&connection_id)?;
    let explorer = {
        let state = state.lock().await;
        Arc::clone(&state.explorer)
    };

    match explorer.run_query(id, &query).await {
        Ok(result) => Ok(QueryResponse {
            success: true,
            result: Some(result),
            error: None,
        }),
        Err(e) => Ok(QueryResponse {
            success: false,
            result: None,
            error: Some(e.to_string()),
        }),
    }
}

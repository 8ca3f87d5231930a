//! Connection Tauri Commands
//!
//! Commands for opening, selecting, and closing database connections.

use serde::Serialize;
use std::sync::Arc;
use tauri::State;
use tracing::instrument;

use crate::engine::types::ConnectionConfig;
use crate::engine::validation;
use crate::engine::CommandBridge;
use crate::explorer::{ConnectionId, ConnectionRecord, ConnectionTab, FooterInfo};
use crate::explorer::store::read_record;
use crate::SharedState;

/// Response for connection operations
///
/// The connection outcome itself arrives on the `database-connection` event;
/// this only acknowledges the request.
#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub success: bool,
    pub session_id: Option<String>,
    pub error: Option<String>,
}

/// Session info for list response
#[derive(Debug, Serialize)]
pub struct SessionListItem {
    pub id: String,
    pub display_name: String,
}

fn parse_connection_id(raw: &str) -> Result<ConnectionId, String> {
    ConnectionId::parse(raw)
}

/// Opens a connection and reports the outcome on `database-connection`
#[tauri::command]
#[instrument(
    skip(state, config),
    fields(
        db_type = %config.db_type,
        host = %config.host,
        port = config.port,
        database = %config.database
    )
)]
pub async fn connect_database(
    state: State<'_, SharedState>,
    config: ConnectionConfig,
) -> Result<ConnectionResponse, String> {
    let (bridge, workspace) = {
        let state = state.lock().await;
        (Arc::clone(&state.bridge), Arc::clone(&state.workspace))
    };

    workspace.begin_connect(&config.display_name());

    match bridge.connect_database(config).await {
        Ok(session_id) => Ok(ConnectionResponse {
            success: true,
            session_id: Some(session_id.to_string()),
            error: None,
        }),
        Err(e) => Ok(ConnectionResponse {
            success: false,
            session_id: None,
            error: Some(e.to_string()),
        }),
    }
}

/// Checks the connection form without contacting the database
#[tauri::command]
pub fn validate_connection(config: ConnectionConfig) -> Vec<String> {
    validation::validate_connection(&config)
}

#[tauri::command]
pub async fn list_connections(state: State<'_, SharedState>) -> Result<Vec<ConnectionTab>, String> {
    let workspace = {
        let state = state.lock().await;
        Arc::clone(&state.workspace)
    };
    Ok(workspace.tabs())
}

/// Returns a copy of the active record for rendering
#[tauri::command]
pub async fn get_active_connection(
    state: State<'_, SharedState>,
) -> Result<Option<ConnectionRecord>, String> {
    let workspace = {
        let state = state.lock().await;
        Arc::clone(&state.workspace)
    };
    Ok(workspace.active_record().map(|record| {
        let guard = read_record(&record);
        guard.clone()
    }))
}

#[tauri::command]
pub async fn set_active_connection(
    state: State<'_, SharedState>,
    connection_id: String,
) -> Result<bool, String> {
    let id = parse_connection_id(&connection_id)?;
    let workspace = {
        let state = state.lock().await;
        Arc::clone(&state.workspace)
    };
    Ok(workspace.set_active(id))
}

/// Removes a connection from the workspace and releases its backend session
#[tauri::command]
#[instrument(skip(state), fields(connection_id = %connection_id))]
pub async fn close_connection(
    state: State<'_, SharedState>,
    connection_id: String,
) -> Result<ConnectionResponse, String> {
    let id = parse_connection_id(&connection_id)?;
    let (bridge, workspace) = {
        let state = state.lock().await;
        (Arc::clone(&state.bridge), Arc::clone(&state.workspace))
    };

    let Some(session) = workspace.close_connection(&id) else {
        return Ok(ConnectionResponse {
            success: true,
            session_id: None,
            error: None,
        });
    };

    match bridge.close_connection(session).await {
        Ok(()) => Ok(ConnectionResponse {
            success: true,
            session_id: Some(session.to_string()),
            error: None,
        }),
        Err(e) => Ok(ConnectionResponse {
            success: false,
            session_id: Some(session.to_string()),
            error: Some(e.to_string()),
        }),
    }
}

#[tauri::command]
pub async fn get_footer(state: State<'_, SharedState>) -> Result<FooterInfo, String> {
    let workspace = {
        let state = state.lock().await;
        Arc::clone(&state.workspace)
    };
    Ok(workspace.footer())
}

/// Lists backend sessions, including ones whose record was never created
#[tauri::command]
pub async fn list_sessions(state: State<'_, SharedState>) -> Result<Vec<SessionListItem>, String> {
    let session_manager = {
        let state = state.lock().await;
        Arc::clone(&state.session_manager)
    };

    let sessions = session_manager.list_sessions().await;
    Ok(sessions
        .into_iter()
        .map(|(id, display_name)| SessionListItem {
            id: id.to_string(),
            display_name,
        })
        .collect())
}

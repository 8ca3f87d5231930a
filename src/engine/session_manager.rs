//! Session Manager
//!
//! Centralized management of all live backend sessions.
//! Pools live in the drivers; this map is what ties a session id back to them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::{timeout, Duration};
use tracing::instrument;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::DataEngine;
use crate::engine::types::{ConnectionConfig, SessionId};
use crate::engine::DriverRegistry;

/// Live session with the config it was opened with
pub struct ActiveSession {
    pub driver_id: String,
    pub config: ConnectionConfig,
    pub display_name: String,
}

/// Manages all live database sessions
pub struct SessionManager {
    registry: Arc<DriverRegistry>,
    sessions: RwLock<HashMap<SessionId, ActiveSession>>,
    connect_timeout: Duration,
}

impl SessionManager {
    const CONNECT_TIMEOUT_MS: u64 = 15000;

    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        Self {
            registry,
            sessions: RwLock::new(HashMap::new()),
            connect_timeout: Duration::from_millis(Self::CONNECT_TIMEOUT_MS),
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Establishes a new connection and returns its session ID
    #[instrument(
        skip(self, config),
        fields(
            db_type = %config.db_type,
            host = %config.host,
            port = config.port,
            database = %config.database
        )
    )]
    pub async fn connect(&self, config: ConnectionConfig) -> EngineResult<SessionId> {
        let driver = self.driver_for(&config)?;

        let connect_future = async {
            let session_id = driver.connect(&config).await?;

            let session = ActiveSession {
                driver_id: driver.driver_id().to_string(),
                display_name: config.display_name(),
                config,
            };

            let mut sessions = self.sessions.write().await;
            sessions.insert(session_id, session);

            Ok(session_id)
        };

        match timeout(self.connect_timeout, connect_future).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                timeout_ms: self.connect_timeout.as_millis() as u64,
            }),
        }
    }

    /// Disconnects a session
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn disconnect(&self, session_id: SessionId) -> EngineResult<()> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(&session_id)
                .ok_or_else(|| EngineError::session_not_found(session_id.to_string()))?
        };

        let driver = self
            .registry
            .get(&session.driver_id)
            .ok_or_else(|| EngineError::driver_not_found(&session.driver_id))?;

        driver.disconnect(session_id).await
    }

    /// Resolves the driver that serves a config's database type
    pub fn driver_for(&self, config: &ConnectionConfig) -> EngineResult<Arc<dyn DataEngine>> {
        let driver_id = config.db_type.driver_id();
        self.registry
            .get(driver_id)
            .ok_or_else(|| EngineError::driver_not_found(driver_id))
    }

    /// Gets a driver for an existing session
    pub async fn get_driver(&self, session_id: SessionId) -> EngineResult<Arc<dyn DataEngine>> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(&session_id)
            .ok_or_else(|| EngineError::session_not_found(session_id.to_string()))?;

        self.registry
            .get(&session.driver_id)
            .ok_or_else(|| EngineError::driver_not_found(&session.driver_id))
    }

    /// Lists all live sessions
    pub async fn list_sessions(&self) -> Vec<(SessionId, String)> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .map(|(id, session)| (*id, session.display_name.clone()))
            .collect()
    }

    pub async fn get_session_info(&self, session_id: SessionId) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions.get(&session_id).map(|s| s.display_name.clone())
    }

    pub async fn session_exists(&self, session_id: SessionId) -> bool {
        let sessions = self.sessions.read().await;
        sessions.contains_key(&session_id)
    }
}

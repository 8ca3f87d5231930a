//! Engine error types
//!
//! Every driver and the session manager report failures through `EngineError`.
//! Commands flatten these to strings at the Tauri boundary.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Driver not found: {driver}")]
    DriverNotFound { driver: String },

    #[error("Session not found: {session}")]
    SessionNotFound { session: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Syntax error: {message}")]
    SyntaxError { message: String },

    #[error("Execution error: {message}")]
    ExecutionError { message: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Not supported: {message}")]
    NotSupported { message: String },
}

impl EngineError {
    pub fn driver_not_found(driver: impl Into<String>) -> Self {
        Self::DriverNotFound {
            driver: driver.into(),
        }
    }

    pub fn session_not_found(session: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session: session.into(),
        }
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::AuthFailed {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::SyntaxError {
            message: message.into(),
        }
    }

    pub fn execution_error(message: impl Into<String>) -> Self {
        Self::ExecutionError {
            message: message.into(),
        }
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Message without the variant prefix, as shown in the status pill.
    pub fn detail(&self) -> String {
        match self {
            Self::DriverNotFound { driver } => format!("unknown database type '{}'", driver),
            Self::SessionNotFound { session } => format!("no active session {}", session),
            Self::ConnectionFailed { message }
            | Self::AuthFailed { message }
            | Self::InvalidConfig { message }
            | Self::SyntaxError { message }
            | Self::ExecutionError { message }
            | Self::NotSupported { message } => message.clone(),
            Self::Timeout { timeout_ms } => format!("timed out after {}ms", timeout_ms),
        }
    }
}

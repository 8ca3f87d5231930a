//! Status pill and footer data derived for the UI

use serde::{Deserialize, Serialize};

use crate::explorer::model::ConnectionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub is_loading: bool,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: StatusKind,
}

impl ConnectionStatus {
    pub fn loading(message: impl Into<String>) -> Self {
        Self {
            is_loading: true,
            message: message.into(),
            kind: StatusKind::Loading,
        }
    }

    pub fn established(message: &str) -> Self {
        Self {
            is_loading: false,
            message: format!("Connection established: {}", message),
            kind: StatusKind::Success,
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            is_loading: false,
            message: format!("Connection failed: {}", message),
            kind: StatusKind::Error,
        }
    }
}

/// What the footer shows: the active connection's endpoint and the last status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterInfo {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub status: Option<ConnectionStatus>,
}

impl FooterInfo {
    pub fn new(active: Option<&ConnectionRecord>, status: Option<ConnectionStatus>) -> Self {
        match active {
            Some(record) => Self {
                host: Some(record.connection_info.host.clone()),
                port: Some(record.connection_info.port),
                database: Some(record.connection_info.database.clone()),
                status,
            },
            None => Self {
                status,
                ..Self::default()
            },
        }
    }
}

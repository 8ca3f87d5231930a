//! Configuration commands.

use serde::Serialize;
use std::sync::Arc;
use tauri::State;

use crate::assistant::GeminiClient;
use crate::config::AppConfig;
use crate::explorer::Explorer;
use crate::SharedState;

/// Config as shown to the webview; the API key itself never leaves the backend
#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub gemini_model: String,
    pub gemini_api_url: String,
    pub has_api_key: bool,
    pub error_status_delay_ms: u64,
    pub page_size: i64,
}

impl From<&AppConfig> for ConfigView {
    fn from(config: &AppConfig) -> Self {
        Self {
            gemini_model: config.gemini.model.clone(),
            gemini_api_url: config.gemini.api_url.clone(),
            has_api_key: config.gemini.api_key.is_some(),
            error_status_delay_ms: config.error_status_delay_ms,
            page_size: config.page_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub success: bool,
    pub config: Option<ConfigView>,
    pub error: Option<String>,
}

/// Returns the effective config (env overrides applied).
#[tauri::command]
pub async fn get_config(state: State<'_, SharedState>) -> Result<ConfigResponse, String> {
    let state = state.lock().await;
    Ok(ConfigResponse {
        success: true,
        config: Some(ConfigView::from(&state.config)),
        error: None,
    })
}

/// Stores the config and rebuilds the assistant client and explorer.
/// An API key passed here is kept for this session only.
#[tauri::command]
pub async fn set_config(
    state: State<'_, SharedState>,
    config: AppConfig,
) -> Result<ConfigResponse, String> {
    if let Err(err) = config.save_to_file() {
        return Ok(ConfigResponse {
            success: false,
            config: None,
            error: Some(err),
        });
    }

    let mut effective = AppConfig::load();
    if effective.gemini.api_key.is_none() {
        effective.gemini.api_key = config.gemini.api_key;
    }

    let mut state = state.lock().await;
    state.assistant = Arc::new(GeminiClient::new(&effective.gemini));
    state.explorer = Arc::new(
        Explorer::new(Arc::clone(&state.connections), state.bridge.clone())
            .with_page_size(effective.page_size),
    );
    let view = ConfigView::from(&effective);
    state.config = effective;

    Ok(ConfigResponse {
        success: true,
        config: Some(view),
        error: None,
    })
}

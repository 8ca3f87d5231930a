//! Assistant Tauri Commands

use serde::Serialize;
use std::sync::Arc;
use tauri::State;

use crate::assistant::ChatMessage;
use crate::explorer::store::read_record;
use crate::SharedState;

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub message: Option<ChatMessage>,
    pub error: Option<String>,
}

/// Asks the assistant for SQL, using the active connection's schemas as context
#[tauri::command]
pub async fn ask_assistant(
    state: State<'_, SharedState>,
    prompt: String,
) -> Result<ChatResponse, String> {
    let (chat, assistant, workspace) = {
        let state = state.lock().await;
        (
            Arc::clone(&state.chat),
            Arc::clone(&state.assistant),
            Arc::clone(&state.workspace),
        )
    };

    let context = workspace
        .active_record()
        .map(|record| {
            let guard = read_record(&record);
            guard.schemas.clone()
        })
        .unwrap_or_default();

    match chat.ask(assistant.as_ref(), &prompt, &context).await {
        Some(message) => Ok(ChatResponse {
            success: true,
            message: Some(message),
            error: None,
        }),
        None => Ok(ChatResponse {
            success: false,
            message: None,
            error: Some("Nothing to send or a request is already running".to_string()),
        }),
    }
}

#[tauri::command]
pub async fn get_chat_messages(state: State<'_, SharedState>) -> Result<Vec<ChatMessage>, String> {
    let state = state.lock().await;
    Ok(state.chat.messages())
}

#[tauri::command]
pub async fn clear_chat(state: State<'_, SharedState>) -> Result<(), String> {
    let state = state.lock().await;
    state.chat.clear();
    Ok(())
}

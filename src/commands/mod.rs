// Tauri Commands
// Webview entry points; errors become strings at this boundary

pub mod assistant;
pub mod config;
pub mod connection;
pub mod data;

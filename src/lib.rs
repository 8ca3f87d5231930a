// dbchat - Desktop database client with an AI query assistant
// Core library

pub mod assistant;
#[cfg(feature = "desktop")]
pub mod commands;
pub mod config;
pub mod engine;
pub mod explorer;
pub mod observability;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use assistant::{ChatSession, GeminiClient, SqlGenerator};
use config::AppConfig;
use engine::drivers::mongodb::MongoDriver;
use engine::drivers::mysql::MySqlDriver;
use engine::drivers::postgres::PostgresDriver;
use engine::{DriverRegistry, EventChannel, LocalBridge, SessionManager};
use explorer::{ConnectionListener, ConnectionRegistry, Explorer, Subscription, Workspace};

pub type SharedState = Arc<Mutex<AppState>>;
pub struct AppState {
    pub drivers: Arc<DriverRegistry>,
    pub session_manager: Arc<SessionManager>,
    pub bridge: Arc<LocalBridge>,
    pub connections: Arc<ConnectionRegistry>,
    pub workspace: Arc<Workspace>,
    pub explorer: Arc<Explorer>,
    pub assistant: Arc<dyn SqlGenerator>,
    pub chat: Arc<ChatSession>,
    pub config: AppConfig,
    listener: Arc<ConnectionListener>,
    subscription: Option<Subscription>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let mut drivers = DriverRegistry::new();

        drivers.register(Arc::new(PostgresDriver::new()));
        drivers.register(Arc::new(MySqlDriver::new()));
        drivers.register(Arc::new(MongoDriver::new()));

        let assistant = Arc::new(GeminiClient::new(&config.gemini));
        Self::with_parts(drivers, assistant, config)
    }

    pub fn with_parts(
        drivers: DriverRegistry,
        assistant: Arc<dyn SqlGenerator>,
        config: AppConfig,
    ) -> Self {
        let drivers = Arc::new(drivers);
        let session_manager = Arc::new(SessionManager::new(Arc::clone(&drivers)));
        let bridge = Arc::new(LocalBridge::new(
            Arc::clone(&session_manager),
            EventChannel::new(),
        ));

        let connections = Arc::new(ConnectionRegistry::new());
        let workspace = Arc::new(Workspace::new(Arc::clone(&connections)));
        let listener = Arc::new(
            ConnectionListener::new(Arc::clone(&connections), workspace.clone())
                .with_error_delay(Duration::from_millis(config.error_status_delay_ms)),
        );
        let explorer = Arc::new(
            Explorer::new(Arc::clone(&connections), bridge.clone())
                .with_page_size(config.page_size),
        );

        Self {
            drivers,
            session_manager,
            bridge,
            connections,
            workspace,
            explorer,
            assistant,
            chat: Arc::new(ChatSession::new()),
            config,
            listener,
            subscription: None,
        }
    }

    /// Starts applying `database-connection` events to the workspace.
    /// Must run inside the tokio runtime.
    pub fn start_listener(&mut self) {
        if self.subscription.is_none() {
            let channel = self.bridge.events().clone();
            self.subscription = Some(Arc::clone(&self.listener).start(&channel));
        }
    }

    /// Tears the view down: stops the listener and ignores late callbacks
    pub fn shutdown(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.dispose();
        }
        self.workspace.unmount();
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::load())
    }
}

/// Relays `database-connection` events to the webview
#[cfg(feature = "desktop")]
fn forward_events(app: tauri::AppHandle, events: EventChannel) {
    use tauri::Emitter;
    use tokio::sync::broadcast::error::RecvError;

    let mut receiver = events.subscribe();
    tauri::async_runtime::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = app.emit(engine::CONNECTION_EVENT, &event) {
                        tracing::warn!(error = %e, "failed to forward connection event");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event forwarder lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    observability::init_tracing();

    let state: SharedState = Arc::new(Mutex::new(AppState::new(AppConfig::load())));
    let setup_state = Arc::clone(&state);
    let exit_state = Arc::clone(&state);

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .manage(state)
        .setup(move |app| {
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                let mut state = setup_state.lock().await;
                state.start_listener();
                forward_events(handle, state.bridge.events().clone());
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Connection commands
            commands::connection::connect_database,
            commands::connection::validate_connection,
            commands::connection::list_connections,
            commands::connection::get_active_connection,
            commands::connection::set_active_connection,
            commands::connection::close_connection,
            commands::connection::get_footer,
            commands::connection::list_sessions,
            // Data commands
            commands::data::get_table_data,
            commands::data::expand_table,
            commands::data::execute_query,
            // Assistant commands
            commands::assistant::ask_assistant,
            commands::assistant::get_chat_messages,
            commands::assistant::clear_chat,
            // Config commands
            commands::config::get_config,
            commands::config::set_config,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(move |_app, event| {
            if let tauri::RunEvent::Exit = event {
                let state = Arc::clone(&exit_state);
                tauri::async_runtime::block_on(async move {
                    state.lock().await.shutdown();
                });
                tracing::info!("connection listener stopped");
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::AssistantResult;
    use crate::engine::testing::FakeDriver;
    use crate::engine::types::{ConnectionConfig, DbType};
    use crate::engine::CommandBridge;
    use crate::explorer::model::SchemaNode;
    use crate::explorer::StatusKind;
    use crate::explorer::store::read_record;
    use async_trait::async_trait;

    struct EchoSchema;

    #[async_trait]
    impl SqlGenerator for EchoSchema {
        async fn generate(&self, _prompt: &str, context: &[SchemaNode]) -> AssistantResult<String> {
            Ok(format!("-- {} schema(s)", context.len()))
        }
    }

    fn state() -> AppState {
        let mut drivers = DriverRegistry::new();
        drivers.register(Arc::new(FakeDriver::new("postgres")));
        let config = AppConfig {
            error_status_delay_ms: 100,
            ..AppConfig::default()
        };
        AppState::with_parts(drivers, Arc::new(EchoSchema), config)
    }

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "secret".to_string(),
            database: "shop".to_string(),
            db_type: DbType::Postgres,
            connection_name: Some("Shop".to_string()),
        }
    }

    async fn wait_for_status(workspace: &Workspace, kind: StatusKind) {
        for _ in 0..100 {
            if workspace.status().map(|s| s.kind) == Some(kind) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("status {:?} never reached", kind);
    }

    #[tokio::test]
    async fn connect_flows_from_bridge_to_workspace() {
        let mut state = state();
        state.start_listener();

        state.workspace.begin_connect("Shop");
        state.bridge.connect_database(config()).await.unwrap();
        wait_for_status(&state.workspace, StatusKind::Success).await;

        let record = state.workspace.active_record().expect("active record");
        let id = read_record(&record).connection_id;
        assert_eq!(read_record(&record).connection_info.name, "Shop");

        assert!(state.explorer.expand_table(id, "public", "users").await.unwrap());

        let schemas = read_record(&record).schemas.clone();
        let reply = state
            .chat
            .ask(state.assistant.as_ref(), "count users", &schemas)
            .await
            .unwrap();
        assert_eq!(reply.content, "-- 1 schema(s)");

        state.shutdown();
    }

    #[tokio::test]
    async fn failed_connect_reports_after_configured_delay() {
        let mut state = state();
        state.start_listener();

        let mut bad = config();
        bad.host = String::new();
        assert!(state.bridge.connect_database(bad).await.is_err());

        wait_for_status(&state.workspace, StatusKind::Error).await;
        let status = state.workspace.status().unwrap();
        assert_eq!(status.message, "Connection failed: Host cannot be empty");
        assert!(state.connections.is_empty());
    }

    #[tokio::test]
    async fn shutdown_stops_applying_connection_events() {
        let state: SharedState = Arc::new(Mutex::new(state()));
        state.lock().await.start_listener();

        let (bridge, workspace, connections) = {
            let mut state = state.lock().await;
            state.shutdown();
            (
                Arc::clone(&state.bridge),
                Arc::clone(&state.workspace),
                Arc::clone(&state.connections),
            )
        };
        assert!(!workspace.is_mounted());

        workspace.begin_connect("Shop");
        bridge.connect_database(config()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(connections.is_empty());
        assert!(workspace.active_id().is_none());

        // A second shutdown is a no-op
        state.lock().await.shutdown();
    }
}

//! Workspace state shared by the explorer, query editor, chat, and footer
//!
//! Holds only the active connection id and resolves records through the
//! registry on every read.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::engine::types::SessionId;
use crate::explorer::listener::ConnectionObserver;
use crate::explorer::model::ConnectionId;
use crate::explorer::status::{ConnectionStatus, FooterInfo};
use crate::explorer::store::{read_record, write_record, ConnectionRegistry, SharedRecord};

/// One entry of the connection tab strip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTab {
    pub connection_id: ConnectionId,
    pub name: String,
    pub is_active: bool,
}

struct ViewState {
    active: Option<ConnectionId>,
    status: Option<ConnectionStatus>,
    mounted: bool,
}

pub struct Workspace {
    registry: Arc<ConnectionRegistry>,
    state: Mutex<ViewState>,
}

impl Workspace {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            state: Mutex::new(ViewState {
                active: None,
                status: None,
                mounted: true,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Shows the loading pill while a connection request is outstanding
    pub fn begin_connect(&self, name: &str) {
        self.connection_status(ConnectionStatus::loading(format!("Connecting to {}...", name)));
    }

    pub fn active_id(&self) -> Option<ConnectionId> {
        self.state().active
    }

    pub fn active_record(&self) -> Option<SharedRecord> {
        let id = self.active_id()?;
        self.registry.get(&id)
    }

    /// Activates a known record. Unknown ids leave the selection unchanged.
    pub fn set_active(&self, id: ConnectionId) -> bool {
        if self.registry.get(&id).is_none() {
            return false;
        }
        self.state().active = Some(id);
        true
    }

    /// Removes a record and returns the backend session it held, if any.
    /// Closing the active record activates the first remaining one.
    pub fn close_connection(&self, id: &ConnectionId) -> Option<SessionId> {
        let record = self.registry.remove(id)?;
        let session = {
            let mut guard = write_record(&record);
            let session = guard.session_id.take();
            guard.disconnect();
            session
        };

        let mut state = self.state();
        if state.active == Some(*id) {
            state.active = self.registry.ids().first().copied();
        }
        tracing::info!(connection_id = %id, "connection closed");
        session
    }

    pub fn tabs(&self) -> Vec<ConnectionTab> {
        let active = self.active_id();
        self.registry
            .get_all()
            .iter()
            .map(|record| {
                let record = read_record(record);
                ConnectionTab {
                    connection_id: record.connection_id,
                    name: record.connection_info.name.clone(),
                    is_active: active == Some(record.connection_id),
                }
            })
            .collect()
    }

    pub fn status(&self) -> Option<ConnectionStatus> {
        self.state().status.clone()
    }

    pub fn footer(&self) -> FooterInfo {
        let status = self.status();
        let Some(record) = self.active_record() else {
            return FooterInfo::new(None, status);
        };
        let guard = read_record(&record);
        FooterInfo::new(Some(&guard), status)
    }

    /// Marks the view as torn down; later callbacks are ignored
    pub fn unmount(&self) {
        self.state().mounted = false;
    }

    pub fn is_mounted(&self) -> bool {
        self.state().mounted
    }
}

impl ConnectionObserver for Workspace {
    fn set_active_connection(&self, id: ConnectionId) {
        let mut state = self.state();
        if state.mounted {
            state.active = Some(id);
        } else {
            tracing::debug!(connection_id = %id, "activation ignored after unmount");
        }
    }

    fn connection_status(&self, status: ConnectionStatus) {
        let mut state = self.state();
        if state.mounted {
            state.status = Some(status);
        } else {
            tracing::debug!(message = %status.message, "status ignored after unmount");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::events::{ConnectionEvent, EventChannel};
    use crate::engine::types::ConnectionInfo;
    use crate::explorer::listener::tests::snapshot;
    use crate::explorer::listener::ConnectionListener;
    use crate::explorer::status::StatusKind;

    fn named_snapshot(name: &str, schema: &str) -> ConnectionEvent {
        let mut snapshot = snapshot(schema, "users");
        snapshot.connection = Some(ConnectionInfo {
            name: name.to_string(),
            host: "localhost".to_string(),
            port: 5432,
            database: "shop".to_string(),
            username: "postgres".to_string(),
        });
        ConnectionEvent::success("ok", vec![snapshot], Some(SessionId::new()))
    }

    fn wired() -> (Arc<Workspace>, Arc<ConnectionListener>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let workspace = Arc::new(Workspace::new(registry.clone()));
        let listener = Arc::new(ConnectionListener::new(registry, workspace.clone()));
        (workspace, listener)
    }

    #[tokio::test]
    async fn success_selects_the_new_connection() {
        let (workspace, listener) = wired();
        workspace.begin_connect("Local");
        assert_eq!(
            workspace.status().map(|s| s.message),
            Some("Connecting to Local...".to_string())
        );

        let id = listener.handle_event(named_snapshot("Local", "public")).unwrap();

        assert_eq!(workspace.active_id(), Some(id));
        let footer = workspace.footer();
        assert_eq!(footer.host.as_deref(), Some("localhost"));
        assert_eq!(footer.status.map(|s| s.kind), Some(StatusKind::Success));
    }

    #[tokio::test]
    async fn tabs_follow_insertion_order() {
        let (workspace, listener) = wired();
        let first = listener.handle_event(named_snapshot("One", "public")).unwrap();
        let second = listener.handle_event(named_snapshot("Two", "public")).unwrap();

        let tabs = workspace.tabs();
        assert_eq!(
            tabs.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            vec!["One", "Two"]
        );
        assert!(!tabs[0].is_active);
        assert!(tabs[1].is_active);

        assert!(workspace.set_active(first));
        assert!(!workspace.set_active(ConnectionId::new()));
        assert_eq!(workspace.active_id(), Some(first));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn closing_the_active_connection_falls_back() {
        let (workspace, listener) = wired();
        let first = listener.handle_event(named_snapshot("One", "public")).unwrap();
        let second = listener.handle_event(named_snapshot("Two", "public")).unwrap();
        let held = workspace.registry().get(&second).unwrap();

        let session = workspace.close_connection(&second);

        assert!(session.is_some());
        assert_eq!(workspace.active_id(), Some(first));
        assert!(!read_record(&held).is_connected);
        assert!(workspace.close_connection(&second).is_none());

        workspace.close_connection(&first);
        assert_eq!(workspace.active_id(), None);
        assert!(workspace.active_record().is_none());
        assert_eq!(workspace.footer().host, None);
    }

    #[tokio::test(start_paused = true)]
    async fn late_error_after_unmount_is_ignored() {
        let (workspace, listener) = wired();
        let channel = EventChannel::new();
        let mut subscription = listener.start(&channel);

        workspace.begin_connect("Local");
        channel.emit(ConnectionEvent::error("auth failed"));
        tokio::time::sleep(Duration::from_millis(10)).await;

        subscription.dispose();
        workspace.unmount();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!workspace.is_mounted());
        assert_eq!(workspace.status().map(|s| s.kind), Some(StatusKind::Loading));
    }

    #[tokio::test(start_paused = true)]
    async fn error_replaces_loading_after_delay() {
        let (workspace, listener) = wired();
        workspace.begin_connect("Local");

        listener.handle_event(ConnectionEvent::error("auth failed"));
        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(workspace.status().map(|s| s.kind), Some(StatusKind::Loading));

        tokio::time::sleep(Duration::from_millis(2)).await;
        let status = workspace.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, "Connection failed: auth failed");
    }
}

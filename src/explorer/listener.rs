//! Connection Event Listener
//!
//! Turns `database-connection` notifications into registry entries and status
//! updates. Notifications are not correlated with the request that caused
//! them: each success creates a new record and becomes the active connection,
//! so two attempts in flight at once can be attributed to either form.
//!
//! Failures are reported after a fixed delay so a preceding "connecting"
//! status stays visible. The delayed report is detached from the subscription
//! and still fires after `Subscription::dispose`; observers must tolerate
//! updates that arrive after their view is gone.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::engine::events::{ConnectionEvent, EventChannel, EventStatus};
use crate::explorer::model::{ConnectionId, ConnectionRecord};
use crate::explorer::status::ConnectionStatus;
use crate::explorer::store::{share, ConnectionRegistry};

pub const ERROR_STATUS_DELAY_MS: u64 = 3000;

/// Callbacks the listener drives, implemented by the owning view
pub trait ConnectionObserver: Send + Sync + 'static {
    fn set_active_connection(&self, id: ConnectionId);
    fn connection_status(&self, status: ConnectionStatus);
}

pub struct ConnectionListener {
    registry: Arc<ConnectionRegistry>,
    observer: Arc<dyn ConnectionObserver>,
    error_delay: Duration,
}

impl ConnectionListener {
    pub fn new(registry: Arc<ConnectionRegistry>, observer: Arc<dyn ConnectionObserver>) -> Self {
        Self {
            registry,
            observer,
            error_delay: Duration::from_millis(ERROR_STATUS_DELAY_MS),
        }
    }

    pub fn with_error_delay(mut self, delay: Duration) -> Self {
        self.error_delay = delay;
        self
    }

    /// Applies one notification. Returns the id of the record created for a
    /// success, `None` for a failure.
    ///
    /// Must be called from within a tokio runtime; the failure report is a
    /// spawned task.
    pub fn handle_event(&self, event: ConnectionEvent) -> Option<ConnectionId> {
        match event.status {
            EventStatus::Success => {
                let id = ConnectionId::new();
                let record = ConnectionRecord::from_event(id, &event);
                self.registry.put(id, share(record));
                tracing::info!(connection_id = %id, "connection registered");

                self.observer.set_active_connection(id);
                self.observer
                    .connection_status(ConnectionStatus::established(&event.message));
                Some(id)
            }
            EventStatus::Error => {
                tracing::warn!(message = %event.message, "connection attempt failed");

                let deadline = Instant::now() + self.error_delay;
                let observer = Arc::clone(&self.observer);
                let status = ConnectionStatus::failed(&event.message);
                tokio::spawn(async move {
                    tokio::time::sleep_until(deadline).await;
                    observer.connection_status(status);
                });
                None
            }
        }
    }

    /// Subscribes to the channel and applies notifications in arrival order
    /// until the returned handle is disposed or dropped.
    pub fn start(self: Arc<Self>, channel: &EventChannel) -> Subscription {
        let mut receiver = channel.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        self.handle_event(event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "connection listener lagged behind");
                        self.observer.connection_status(ConnectionStatus::failed(&format!(
                            "{} connection notification(s) were missed",
                            skipped
                        )));
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Subscription {
            handle: Some(handle),
        }
    }
}

/// Live subscription to `database-connection`
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stops processing further notifications. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

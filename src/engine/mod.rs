// Data Engine Module
// Native backend behind the command bridge

pub mod bridge;
pub mod drivers;
pub mod error;
pub mod events;
pub mod registry;
pub mod session_manager;
pub mod traits;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::{CommandBridge, LocalBridge};
pub use error::{EngineError, EngineResult};
pub use events::{ConnectionEvent, EventChannel, EventStatus, CONNECTION_EVENT};
pub use registry::DriverRegistry;
pub use session_manager::SessionManager;
pub use traits::DataEngine;
pub use types::*;

// Explorer Module
// Connection registry, event listener, and the view state built on them

pub mod enrichment;
pub mod listener;
pub mod model;
pub mod status;
pub mod store;
pub mod workspace;

pub use enrichment::Explorer;
pub use listener::{ConnectionListener, ConnectionObserver, Subscription};
pub use model::{ColumnNode, ConnectionId, ConnectionRecord, FunctionNode, SchemaNode, TableNode};
pub use status::{ConnectionStatus, FooterInfo, StatusKind};
pub use store::{ConnectionRegistry, SharedRecord};
pub use workspace::{ConnectionTab, Workspace};

// API host module.
// Exposes backend operations to the front-end process through a timed dispatcher.

pub mod backend;
pub mod dispatcher;
pub mod operation;
pub mod transport;

pub use backend::{AppInfo, Backend, LocalBackend};
pub use dispatcher::{
    CorrelationToken, DEFAULT_TIMEOUT, Dispatcher, Inbound, LIST_OPERATIONS, Reply, Request,
};
pub use operation::{Operation, OperationName};

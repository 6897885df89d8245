mod resource;
mod tcp;

pub use resource::{ServerResource, ServerState};
pub use tcp::{AcceptedConnection, Listener, TcpServer};

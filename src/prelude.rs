//! Convenience re-export of the whole public API surface

pub use crate::client::{Client, ClientId, ClientPort, ClientState};
pub use crate::constants::{coil, exceptions, function, limits};
pub use crate::decode::PduDecodeLevel;
pub use crate::device::Device;
pub use crate::exception::ExceptionCode;
pub use crate::frame::Frame;
pub use crate::port::Port;
pub use crate::server::{AcceptedConnection, Listener, ServerResource, ServerState, TcpServer};
pub use crate::signal::{PortEvents, Signal, SlotId, TcpServerEvents};
pub use crate::status::StatusCode;
pub use crate::types::ProtocolType;
pub use crate::unit_map::UnitMap;

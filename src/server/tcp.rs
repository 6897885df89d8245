use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::constants::tcp;
use crate::decode::PduDecodeLevel;
use crate::device::Device;
use crate::port::Port;
use crate::server::resource::ServerResource;
use crate::signal::{PortEvent, TcpServerEvents};
use crate::status::StatusCode;
use crate::types::ProtocolType;
use crate::unit_map::UnitMap;

/// A socket accepted by a [`Listener`], already wrapped in a TCP-framed
/// port, plus the peer name used as the connection's source identifier
pub struct AcceptedConnection {
    /// Ready-to-serve port over the accepted socket
    pub port: Box<dyn Port>,
    /// Peer identification, e.g. `"192.168.0.5:1421"`
    pub peer: String,
}

/// Seam to the concrete TCP acceptor, which is an external collaborator.
///
/// Implementations bind and listen in [`open`](Listener::open) (which may
/// return `Processing`) and surface each pending socket as an
/// [`AcceptedConnection`] whose port applies the MBAP envelope.
pub trait Listener {
    /// Start listening on the given endpoint
    fn open(&mut self, ipaddr: &str, port: u16) -> StatusCode;

    /// Stop listening
    fn close(&mut self) -> StatusCode;

    /// Whether the acceptor is currently listening
    fn is_open(&self) -> bool;

    /// The next pending connection, if any
    fn accept(&mut self) -> Option<AcceptedConnection>;
}

/// TCP server shell: accepts sockets and serves each one with its own
/// [`ServerResource`] over a shared device.
///
/// Per [`process`](TcpServer::process) tick the shell keeps the acceptor
/// listening, drains pending connections under the `max_connections` policy,
/// ticks every child machine, and reaps the ones that closed. Child
/// `tx`/`rx`/`error`/`completed` signals are re-emitted on the shell with
/// the child's source identifier; a child's lifecycle surfaces as
/// `new_connection`/`close_connection`.
pub struct TcpServer<T: Device, L: Listener> {
    listener: L,
    device: Arc<Mutex<T>>,
    children: Vec<ServerResource<T>>,
    events: TcpServerEvents,
    name: String,
    ipaddr: String,
    port: u16,
    timeout_ms: u32,
    max_connections: u32,
    broadcast_enabled: bool,
    unit_map: Option<UnitMap>,
    decode_level: PduDecodeLevel,
    cmd_close: bool,
    listening: bool,
    last_error_status: StatusCode,
    last_error_text: String,
}

impl<T: Device, L: Listener> TcpServer<T, L> {
    pub fn new(device: Arc<Mutex<T>>, listener: L) -> Self {
        TcpServer {
            listener,
            device,
            children: Vec::new(),
            events: TcpServerEvents::default(),
            name: String::from("tcp-server"),
            ipaddr: String::new(),
            port: tcp::DEFAULT_PORT,
            timeout_ms: tcp::DEFAULT_TIMEOUT_MS,
            max_connections: tcp::DEFAULT_MAX_CONNECTIONS,
            broadcast_enabled: true,
            unit_map: None,
            decode_level: PduDecodeLevel::Nothing,
            cmd_close: false,
            listening: false,
            last_error_status: StatusCode::Good,
            last_error_text: String::new(),
        }
    }

    /// Run one cooperative tick: listen, accept, serve, reap
    pub fn process(&mut self) -> StatusCode {
        if self.cmd_close {
            return self.process_close();
        }
        if !self.listener.is_open() {
            let status = self.listener.open(&self.ipaddr, self.port);
            if status.is_processing() {
                return status;
            }
            if status.is_bad() {
                self.raise_error(
                    status,
                    format!("cannot listen on {}:{}", self.ipaddr, self.port),
                );
                return status;
            }
        }
        if !self.listening {
            self.listening = true;
            debug!("{}: listening on {}:{}", self.name, self.ipaddr, self.port);
            self.events.opened.emit(&self.name);
        }
        while let Some(connection) = self.listener.accept() {
            if (self.children.len() as u32) < self.max_connections {
                self.adopt(connection);
            } else {
                warn!(
                    "{}: connection limit {} reached, dropping {}",
                    self.name, self.max_connections, connection.peer
                );
            }
        }
        let mut result = StatusCode::Good;
        let mut index = 0;
        while index < self.children.len() {
            let status = self.children[index].process();
            if status.is_processing() {
                result = StatusCode::Processing;
            }
            self.bubble(index);
            if self.children[index].is_state_closed() {
                self.reap(index);
            } else {
                index += 1;
            }
        }
        result
    }

    /// Request the shell to start listening; clears a prior close request
    pub fn open(&mut self) -> StatusCode {
        self.cmd_close = false;
        StatusCode::Good
    }

    /// Request an orderly shutdown: children drain, then the acceptor closes
    pub fn close(&mut self) -> StatusCode {
        self.cmd_close = true;
        StatusCode::Good
    }

    /// Lifecycle signals of the shell and its connections
    pub fn events(&mut self) -> &mut TcpServerEvents {
        &mut self.events
    }

    pub fn is_open(&self) -> bool {
        self.listener.is_open()
    }

    pub fn protocol_type(&self) -> ProtocolType {
        ProtocolType::Tcp
    }

    /// Shared handle to the application back-end
    pub fn device(&self) -> Arc<Mutex<T>> {
        self.device.clone()
    }

    /// Number of currently served connections
    pub fn connection_count(&self) -> usize {
        self.children.len()
    }

    pub fn object_name(&self) -> &str {
        &self.name
    }

    pub fn set_object_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Address the acceptor binds to; empty means any interface
    pub fn ipaddr(&self) -> &str {
        &self.ipaddr
    }

    pub fn set_ipaddr(&mut self, ipaddr: &str) {
        self.ipaddr = ipaddr.to_string();
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn timeout(&self) -> u32 {
        self.timeout_ms
    }

    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    /// Limit on concurrently served connections; zero is coerced to one
    pub fn set_max_connections(&mut self, max_connections: u32) {
        self.max_connections = max_connections.max(1);
    }

    pub fn is_broadcast_enabled(&self) -> bool {
        self.broadcast_enabled
    }

    pub fn set_broadcast_enabled(&mut self, enabled: bool) {
        self.broadcast_enabled = enabled;
    }

    /// The unit filter new connections inherit, or `None` to accept all
    pub fn unit_map(&self) -> Option<&UnitMap> {
        self.unit_map.as_ref()
    }

    pub fn set_unit_map(&mut self, map: Option<UnitMap>) {
        self.unit_map = map;
    }

    /// Textual form of the unit filter; empty when absent
    pub fn unit_map_string(&self) -> String {
        match &self.unit_map {
            Some(map) => map.to_string(),
            None => String::new(),
        }
    }

    /// Set the unit filter from its textual form. An empty string removes
    /// the filter; malformed input keeps the current one.
    pub fn set_unit_map_string(&mut self, text: &str) {
        if text.is_empty() {
            self.unit_map = None;
            return;
        }
        if let Some(map) = UnitMap::parse(text) {
            self.unit_map = Some(map);
        }
    }

    pub fn decode_level(&self) -> PduDecodeLevel {
        self.decode_level
    }

    pub fn set_decode_level(&mut self, level: PduDecodeLevel) {
        self.decode_level = level;
    }

    pub fn last_error_status(&self) -> StatusCode {
        self.last_error_status
    }

    pub fn last_error_text(&self) -> &str {
        &self.last_error_text
    }

    fn process_close(&mut self) -> StatusCode {
        let mut index = 0;
        while index < self.children.len() {
            self.children[index].close();
            self.children[index].process();
            self.bubble(index);
            if self.children[index].is_state_closed() {
                self.reap(index);
            } else {
                index += 1;
            }
        }
        if !self.children.is_empty() {
            return StatusCode::Processing;
        }
        if self.listener.is_open() {
            let status = self.listener.close();
            if status.is_processing() {
                return status;
            }
        }
        if self.listening {
            self.listening = false;
            debug!("{}: closed", self.name);
            self.events.closed.emit(&self.name);
        }
        StatusCode::Good
    }

    fn adopt(&mut self, connection: AcceptedConnection) {
        let AcceptedConnection { port, peer } = connection;
        let mut child = ServerResource::new(port, self.device.clone());
        child.set_object_name(&peer);
        child.set_broadcast_enabled(self.broadcast_enabled);
        child.set_unit_map(self.unit_map.clone());
        child.set_timeout(self.timeout_ms);
        child.set_decode_level(self.decode_level);
        child.set_event_forwarding(true);
        debug!("{}: new connection {}", self.name, peer);
        self.events.new_connection.emit(&peer);
        self.children.push(child);
    }

    fn reap(&mut self, index: usize) {
        let child = self.children.remove(index);
        let name = child.object_name();
        debug!("{}: connection {} closed", self.name, name);
        self.events.close_connection.emit(name);
    }

    /// Re-emit a child's recorded events under its source identifier
    fn bubble(&mut self, index: usize) {
        let events = self.children[index].drain_events();
        if events.is_empty() {
            return;
        }
        let name = self.children[index].object_name().to_string();
        for event in events {
            match event {
                PortEvent::Tx(data) => self.events.tx.emit(&name, &data),
                PortEvent::Rx(data) => self.events.rx.emit(&name, &data),
                PortEvent::Error(status, text) => self.events.error.emit(&name, status, &text),
                PortEvent::Completed(status) => self.events.completed.emit(&name, status),
                // a child's own lifecycle surfaces as new/close connection
                PortEvent::Opened | PortEvent::Closed => {}
            }
        }
    }

    fn raise_error(&mut self, status: StatusCode, text: String) {
        warn!("{}: {text}", self.name);
        self.last_error_status = status;
        self.last_error_text = text;
        self.events
            .error
            .emit(&self.name, status, &self.last_error_text);
    }
}

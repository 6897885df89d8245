mod requests;

use tracing::{debug, warn};

use crate::constants::function::EXCEPTION_BIT;
use crate::decode::{PayloadDisplay, PduDecodeLevel};
use crate::exception::ExceptionCode;
use crate::frame::Frame;
use crate::port::Port;
use crate::signal::PortEvents;
use crate::status::StatusCode;
use crate::types::ProtocolType;

pub use requests::*;

/// Handle identifying one logical client on a shared [`ClientPort`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u32);

impl ClientId {
    /// The port itself, used by the helper methods called without a client
    pub(crate) const LOCAL: ClientId = ClientId(0);
}

/// Lifecycle of the client transaction engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Idle, no transaction in flight
    Begin,
    /// About to issue the first `open` step
    BeginOpen,
    /// An `open` step returned `Processing`
    WaitForOpen,
    /// About to issue the first `write` step of a transaction
    BeginWrite,
    /// Waiting for the request frame to drain
    Write,
    /// About to issue the first `read` step
    BeginRead,
    /// Waiting for the response frame to complete
    Read,
    /// Port observed closed after the last transaction
    Closed,
}

struct Transaction {
    owner: ClientId,
    unit: u8,
    function: u8,
    broadcast: bool,
    attempt: u32,
}

/// Client protocol engine over one exclusively-owned port, shared by any
/// number of logical clients.
///
/// At most one transaction is in flight per port. The client that starts a
/// transaction becomes the *current client*; every helper call from another
/// client returns [`Processing`](StatusCode::Processing) until ownership
/// rotates. On a non-blocking port the owner itself polls by repeating the
/// same helper call until it returns a terminal status.
pub struct ClientPort {
    port: Box<dyn Port>,
    state: ClientState,
    txn: Option<Transaction>,
    next_client: u32,
    name: String,
    tries: u32,
    broadcast_enabled: bool,
    decode_level: PduDecodeLevel,
    last_tries: u32,
    last_status: StatusCode,
    last_status_timestamp: Option<std::time::Instant>,
    last_error_status: StatusCode,
    last_error_text: String,
    events: PortEvents,
}

impl ClientPort {
    /// Take exclusive ownership of `port`. The port is switched into client
    /// mode.
    pub fn new(mut port: Box<dyn Port>) -> Self {
        port.set_server_mode(false);
        ClientPort {
            port,
            state: ClientState::Begin,
            txn: None,
            next_client: 0,
            name: String::from("client"),
            tries: 1,
            broadcast_enabled: true,
            decode_level: PduDecodeLevel::Nothing,
            last_tries: 0,
            last_status: StatusCode::Good,
            last_status_timestamp: None,
            last_error_status: StatusCode::Good,
            last_error_text: String::new(),
            events: PortEvents::default(),
        }
    }

    /// Replace the underlying port, closing the previous one. Any in-flight
    /// transaction is abandoned.
    pub fn set_port(&mut self, mut port: Box<dyn Port>) {
        self.port.close();
        port.set_server_mode(false);
        self.port = port;
        self.txn = None;
        self.state = ClientState::Begin;
    }

    /// Allocate a handle for one more logical client of this port
    pub fn attach(&mut self) -> ClientId {
        self.next_client += 1;
        ClientId(self.next_client)
    }

    /// The client whose transaction currently owns the port
    pub fn current_client(&self) -> Option<ClientId> {
        self.txn.as_ref().map(|txn| txn.owner)
    }

    /// Lifecycle signals of this port
    pub fn events(&mut self) -> &mut PortEvents {
        &mut self.events
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.port.is_open()
    }

    /// Delegates to the port
    pub fn open(&mut self) -> StatusCode {
        self.port.open()
    }

    /// Delegates to the port
    pub fn close(&mut self) -> StatusCode {
        self.port.close()
    }

    pub fn protocol_type(&self) -> ProtocolType {
        self.port.protocol_type()
    }

    pub fn object_name(&self) -> &str {
        &self.name
    }

    pub fn set_object_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// How many attempts a transaction makes before reporting a transport
    /// read failure; always at least one
    pub fn tries(&self) -> u32 {
        self.tries
    }

    pub fn set_tries(&mut self, tries: u32) {
        self.tries = tries.max(1);
    }

    /// Synonym of [`tries`](ClientPort::tries)
    pub fn repeat_count(&self) -> u32 {
        self.tries()
    }

    /// Synonym of [`set_tries`](ClientPort::set_tries)
    pub fn set_repeat_count(&mut self, count: u32) {
        self.set_tries(count);
    }

    pub fn is_broadcast_enabled(&self) -> bool {
        self.broadcast_enabled
    }

    /// When enabled, a request to unit 0 is write-and-forget: the engine
    /// reports `Good` right after the request drains and never reads
    pub fn set_broadcast_enabled(&mut self, enabled: bool) {
        self.broadcast_enabled = enabled;
    }

    pub fn decode_level(&self) -> PduDecodeLevel {
        self.decode_level
    }

    pub fn set_decode_level(&mut self, level: PduDecodeLevel) {
        self.decode_level = level;
    }

    /// Attempts used by the last completed transaction
    pub fn last_tries(&self) -> u32 {
        self.last_tries
    }

    /// Terminal status of the last completed transaction
    pub fn last_status(&self) -> StatusCode {
        self.last_status
    }

    /// When the last transaction completed
    pub fn last_status_timestamp(&self) -> Option<std::time::Instant> {
        self.last_status_timestamp
    }

    pub fn last_error_status(&self) -> StatusCode {
        self.last_error_status
    }

    pub fn last_error_text(&self) -> &str {
        &self.last_error_text
    }

    /// Start or continue one transaction on behalf of `client`.
    ///
    /// `encode` validates the parameters and builds the request body; it
    /// runs once, when the transaction is claimed. `decode` interprets the
    /// success response body; it runs once, in whichever call observes the
    /// response.
    pub(crate) fn transaction<E, D>(
        &mut self,
        client: ClientId,
        unit: u8,
        function: u8,
        encode: E,
        decode: D,
    ) -> StatusCode
    where
        E: FnOnce(&mut Vec<u8>) -> StatusCode,
        D: FnOnce(&[u8]) -> StatusCode,
    {
        match self.current_client() {
            Some(owner) if owner != client => return StatusCode::Processing,
            Some(_) => {}
            None => {
                let broadcast = unit == 0 && self.broadcast_enabled;
                self.txn = Some(Transaction {
                    owner: client,
                    unit,
                    function,
                    broadcast,
                    attempt: 1,
                });
                let mut body = Vec::new();
                let status = encode(&mut body);
                if status.is_bad() {
                    self.raise_error(
                        status,
                        format!("invalid request parameters for function {function:#04X}"),
                    );
                    return self.complete(status);
                }
                if self.decode_level.enabled() {
                    debug!(
                        "{}: request unit={unit} function={function:#04X} {}",
                        self.name,
                        PayloadDisplay::new(&body, self.decode_level)
                    );
                }
                let status = self.port.write_buffer(unit, function, &body);
                if status.is_bad() {
                    self.raise_port_error(status);
                    return self.complete(status);
                }
                self.set_state(ClientState::BeginWrite);
            }
        }
        self.poll(decode)
    }

    fn poll<D>(&mut self, decode: D) -> StatusCode
    where
        D: FnOnce(&[u8]) -> StatusCode,
    {
        loop {
            match self.state {
                ClientState::Begin | ClientState::Closed => {
                    self.set_state(ClientState::BeginWrite);
                }
                ClientState::BeginWrite => {
                    if !self.port.is_open() {
                        self.set_state(ClientState::BeginOpen);
                        continue;
                    }
                    self.set_state(ClientState::Write);
                }
                ClientState::BeginOpen | ClientState::WaitForOpen => {
                    let status = self.port.open();
                    if status.is_processing() {
                        self.set_state(ClientState::WaitForOpen);
                        return status;
                    }
                    if status.is_bad() {
                        self.raise_port_error(status);
                        return self.complete(status);
                    }
                    if !self.port.is_open() {
                        let status = StatusCode::BadPortClosed;
                        self.raise_error(status, status.to_string());
                        return self.complete(status);
                    }
                    self.emit_opened();
                    self.set_state(ClientState::BeginWrite);
                }
                ClientState::Write => {
                    let status = self.port.write();
                    if status.is_processing() {
                        return status;
                    }
                    if status.is_bad() {
                        self.raise_port_error(status);
                        return self.complete(status);
                    }
                    self.emit_tx();
                    let broadcast = self.txn.as_ref().is_some_and(|txn| txn.broadcast);
                    if broadcast {
                        // write-and-forget: no response follows a broadcast
                        return self.complete(StatusCode::Good);
                    }
                    self.set_state(ClientState::BeginRead);
                }
                ClientState::BeginRead => {
                    self.set_state(ClientState::Read);
                }
                ClientState::Read => {
                    let status = self.port.read();
                    if status.is_processing() {
                        return status;
                    }
                    if status.is_bad() {
                        let retry = match self.txn.as_mut() {
                            Some(txn) if txn.attempt < self.tries => {
                                txn.attempt += 1;
                                true
                            }
                            _ => false,
                        };
                        if retry {
                            let unit = self.txn.as_ref().map_or(0, |txn| txn.unit);
                            debug!(
                                "{}: read failed ({status}), resending request to unit {unit}",
                                self.name
                            );
                            self.set_state(ClientState::Write);
                            continue;
                        }
                        self.raise_port_error(status);
                        return self.complete(status);
                    }
                    self.emit_rx();
                    let mut frame = Frame::new();
                    let status = self.port.read_buffer(&mut frame);
                    if status.is_bad() {
                        self.raise_port_error(status);
                        return self.complete(status);
                    }
                    let expected = self.txn.as_ref().map_or(0, |txn| txn.function);
                    return if frame.function == expected {
                        let status = decode(frame.body());
                        if status.is_bad() {
                            self.raise_error(
                                status,
                                format!("bad response body for function {expected:#04X}"),
                            );
                        }
                        self.complete(status)
                    } else if frame.function == expected | EXCEPTION_BIT {
                        let status = match frame.body().first() {
                            Some(code) => StatusCode::from(ExceptionCode::from(*code)),
                            None => StatusCode::BadNotCorrectResponse,
                        };
                        self.raise_error(status, format!("server exception: {status}"));
                        self.complete(status)
                    } else {
                        let status = StatusCode::BadNotCorrectResponse;
                        self.raise_error(
                            status,
                            format!(
                                "unexpected response function {:#04X}, expected {expected:#04X}",
                                frame.function
                            ),
                        );
                        self.complete(status)
                    };
                }
            }
        }
    }

    /// Terminate the current transaction, release ownership, and park the
    /// machine according to the link state
    fn complete(&mut self, status: StatusCode) -> StatusCode {
        if let Some(txn) = self.txn.take() {
            self.last_tries = txn.attempt;
        }
        self.last_status = status;
        self.last_status_timestamp = Some(std::time::Instant::now());
        self.events.completed.emit(&self.name, status);
        if !self.port.is_open() {
            self.emit_closed();
            self.set_state(ClientState::Closed);
        } else {
            self.set_state(ClientState::Begin);
        }
        status
    }

    fn raise_port_error(&mut self, status: StatusCode) {
        let text = self.port.last_error_text();
        let text = if text.is_empty() {
            status.to_string()
        } else {
            text.to_string()
        };
        self.raise_error(status, text);
    }

    fn raise_error(&mut self, status: StatusCode, text: String) {
        warn!("{}: {text}", self.name);
        self.last_error_status = status;
        self.last_error_text = text;
        self.events
            .error
            .emit(&self.name, status, &self.last_error_text);
    }

    fn emit_opened(&mut self) {
        debug!("{}: opened", self.name);
        self.events.opened.emit(&self.name);
    }

    fn emit_closed(&mut self) {
        debug!("{}: closed", self.name);
        self.events.closed.emit(&self.name);
    }

    fn emit_tx(&mut self) {
        let data = self.port.write_buffer_data();
        if self.decode_level.enabled() {
            debug!(
                "{}: tx {}",
                self.name,
                PayloadDisplay::new(data, self.decode_level)
            );
        }
        self.events.tx.emit(&self.name, data);
    }

    fn emit_rx(&mut self) {
        let data = self.port.read_buffer_data();
        if self.decode_level.enabled() {
            debug!(
                "{}: rx {}",
                self.name,
                PayloadDisplay::new(data, self.decode_level)
            );
        }
        self.events.rx.emit(&self.name, data);
    }

    fn set_state(&mut self, state: ClientState) {
        if state != self.state {
            debug!("{}: {:?} -> {:?}", self.name, self.state, state);
            self.state = state;
        }
    }
}

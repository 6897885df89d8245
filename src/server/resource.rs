use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::codec::{self, ParseError, Request};
use crate::constants::function::EXCEPTION_BIT;
use crate::decode::{PayloadDisplay, PduDecodeLevel};
use crate::device::Device;
use crate::exception::ExceptionCode;
use crate::frame::Frame;
use crate::port::Port;
use crate::signal::{PortEvent, PortEvents};
use crate::status::StatusCode;
use crate::types::ProtocolType;
use crate::unit_map::UnitMap;

/// Lifecycle of a server connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Initial state, port condition not probed yet
    Unknown,
    /// About to issue the first `open` step
    BeginOpen,
    /// An `open` step returned `Processing`
    WaitForOpen,
    /// Port open, no transaction started
    Opened,
    /// About to issue the first `read` step of a transaction
    BeginRead,
    /// Waiting for an inbound frame to complete
    Read,
    /// Request decoded, dispatching to the device
    ProcessDevice,
    /// About to stage and send the response
    BeginWrite,
    /// Waiting for the outbound frame to drain
    Write,
    /// A `close` step returned `Processing`
    WaitForClose,
    /// Connection expired without traffic
    Timeout,
    /// Port closed
    Closed,
}

struct PendingRequest {
    unit: u8,
    broadcast: bool,
    request: Request,
}

/// Per-connection server protocol engine.
///
/// Owns its port exclusively and drives one request → device-dispatch →
/// response cycle per [`process`](ServerResource::process) completion. The
/// same machine serves blocking ports (a whole transaction per call) and
/// non-blocking ports (`Processing` until the port finishes each step).
pub struct ServerResource<T: Device> {
    port: Box<dyn Port>,
    device: Arc<Mutex<T>>,
    state: ServerState,
    cmd_close: bool,
    name: String,
    broadcast_enabled: bool,
    unit_map: Option<UnitMap>,
    timeout_ms: u32,
    decode_level: PduDecodeLevel,
    last_status: StatusCode,
    last_status_timestamp: Option<std::time::Instant>,
    last_error_status: StatusCode,
    last_error_text: String,
    events: PortEvents,
    forward: bool,
    forwarded: Vec<PortEvent>,
    pending: Option<PendingRequest>,
    response_unit: u8,
    response_function: u8,
    response: Vec<u8>,
    final_status: StatusCode,
}

impl<T: Device> ServerResource<T> {
    /// Take exclusive ownership of `port` and serve `device` over it.
    /// The port is switched into server mode.
    pub fn new(mut port: Box<dyn Port>, device: Arc<Mutex<T>>) -> Self {
        port.set_server_mode(true);
        ServerResource {
            port,
            device,
            state: ServerState::Unknown,
            cmd_close: false,
            name: String::from("server"),
            broadcast_enabled: true,
            unit_map: None,
            timeout_ms: crate::constants::tcp::DEFAULT_TIMEOUT_MS,
            decode_level: PduDecodeLevel::Nothing,
            last_status: StatusCode::Good,
            last_status_timestamp: None,
            last_error_status: StatusCode::Good,
            last_error_text: String::new(),
            events: PortEvents::default(),
            forward: false,
            forwarded: Vec::new(),
            pending: None,
            response_unit: 0,
            response_function: 0,
            response: Vec::new(),
            final_status: StatusCode::Good,
        }
    }

    /// Drive the machine. Returns the terminal status of the transaction
    /// that completed during this call, or `Processing` while one is in
    /// flight.
    pub fn process(&mut self) -> StatusCode {
        loop {
            match self.state {
                ServerState::Unknown | ServerState::Closed | ServerState::Timeout => {
                    if self.cmd_close {
                        return StatusCode::Good;
                    }
                    if self.port.is_open() {
                        self.set_state(ServerState::BeginRead);
                        self.emit_opened();
                    } else {
                        self.set_state(ServerState::BeginOpen);
                    }
                }
                ServerState::BeginOpen | ServerState::WaitForOpen => {
                    let status = self.port.open();
                    if status.is_processing() {
                        self.set_state(ServerState::WaitForOpen);
                        return status;
                    }
                    if status.is_bad() {
                        self.raise_port_error(status);
                        self.emit_completed(status);
                        self.set_state(ServerState::Closed);
                        return status;
                    }
                    self.emit_opened();
                    self.set_state(ServerState::Opened);
                }
                ServerState::Opened | ServerState::BeginRead => {
                    self.pending = None;
                    self.set_state(ServerState::Read);
                }
                ServerState::Read => {
                    if self.closing_requested() {
                        return self.enter_close();
                    }
                    let status = self.port.read();
                    if status.is_processing() {
                        return status;
                    }
                    if status.is_bad() {
                        return self.abort_transaction(status);
                    }
                    self.emit_rx();
                    let mut frame = Frame::new();
                    let status = self.port.read_buffer(&mut frame);
                    if status.is_bad() {
                        return self.abort_transaction(status);
                    }
                    let broadcast = frame.unit == 0 && self.broadcast_enabled;
                    if !broadcast && !self.is_unit_enabled(frame.unit) {
                        debug!("{}: ignoring request for unit {}", self.name, frame.unit);
                        self.set_state(ServerState::BeginRead);
                        return StatusCode::Processing;
                    }
                    match Request::parse(frame.function, frame.body()) {
                        Ok(request) => {
                            self.pending = Some(PendingRequest {
                                unit: frame.unit,
                                broadcast,
                                request,
                            });
                            self.set_state(ServerState::ProcessDevice);
                        }
                        Err(ParseError::NotCorrect) => {
                            let status = StatusCode::BadNotCorrectRequest;
                            self.raise_error(
                                status,
                                format!(
                                    "malformed request body for function {:#04X}",
                                    frame.function
                                ),
                            );
                            return self.finish_without_response(status);
                        }
                        Err(kind) => {
                            let (status, code) = match kind {
                                ParseError::OutOfRange => (
                                    StatusCode::BadIllegalDataValue,
                                    ExceptionCode::IllegalDataValue,
                                ),
                                _ => (
                                    StatusCode::BadIllegalFunction,
                                    ExceptionCode::IllegalFunction,
                                ),
                            };
                            self.raise_error(
                                status,
                                format!("rejecting request for function {:#04X}: {status}", frame.function),
                            );
                            if broadcast {
                                return self.finish_without_response(status);
                            }
                            self.stage_exception(frame.unit, frame.function, code, status);
                            self.set_state(ServerState::BeginWrite);
                        }
                    }
                }
                ServerState::ProcessDevice => {
                    if self.closing_requested() {
                        return self.enter_close();
                    }
                    let (unit, function, broadcast) = match self.pending.as_ref() {
                        Some(pending) => (pending.unit, pending.request.function(), pending.broadcast),
                        None => {
                            self.set_state(ServerState::BeginRead);
                            continue;
                        }
                    };
                    let status = self.dispatch();
                    if status.is_processing() {
                        return status;
                    }
                    if broadcast {
                        if status.is_bad() {
                            self.raise_error(status, format!("device returned: {status}"));
                        }
                        return self.finish_without_response(status);
                    }
                    if status.is_good() {
                        self.response_unit = unit;
                        self.response_function = function;
                        self.final_status = StatusCode::Good;
                        self.set_state(ServerState::BeginWrite);
                    } else if status == StatusCode::BadGatewayPathUnavailable {
                        // silent gateway: no wire response, transaction counts as good
                        return self.finish_without_response(StatusCode::Good);
                    } else {
                        let code = status
                            .exception()
                            .unwrap_or(ExceptionCode::ServerDeviceFailure);
                        self.raise_error(status, format!("device returned: {status}"));
                        self.stage_exception(unit, function, code, status);
                        self.set_state(ServerState::BeginWrite);
                    }
                }
                ServerState::BeginWrite => {
                    if self.closing_requested() {
                        return self.enter_close();
                    }
                    let status = self.port.write_buffer(
                        self.response_unit,
                        self.response_function,
                        &self.response,
                    );
                    if status.is_bad() {
                        return self.abort_transaction(status);
                    }
                    self.set_state(ServerState::Write);
                }
                ServerState::Write => {
                    if self.closing_requested() {
                        return self.enter_close();
                    }
                    let status = self.port.write();
                    if status.is_processing() {
                        return status;
                    }
                    if status.is_bad() {
                        return self.abort_transaction(status);
                    }
                    self.emit_tx();
                    let final_status = self.final_status;
                    self.emit_completed(final_status);
                    self.set_state(ServerState::BeginRead);
                    return final_status;
                }
                ServerState::WaitForClose => {
                    let status = self.port.close();
                    if status.is_processing() {
                        return status;
                    }
                    self.finish_close();
                    return StatusCode::Good;
                }
            }
        }
    }

    /// Request the machine to start serving; clears a prior close request
    pub fn open(&mut self) -> StatusCode {
        self.cmd_close = false;
        if self.is_state_closed() {
            self.set_state(ServerState::BeginOpen);
        }
        StatusCode::Good
    }

    /// Request an orderly close; honored at the next safe transition
    pub fn close(&mut self) -> StatusCode {
        self.cmd_close = true;
        StatusCode::Good
    }

    /// Lifecycle signals of this connection
    pub fn events(&mut self) -> &mut PortEvents {
        &mut self.events
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn is_state_closed(&self) -> bool {
        matches!(
            self.state,
            ServerState::Unknown | ServerState::Closed | ServerState::Timeout
        )
    }

    pub fn is_open(&self) -> bool {
        self.port.is_open()
    }

    pub fn protocol_type(&self) -> ProtocolType {
        self.port.protocol_type()
    }

    /// Shared handle to the application back-end
    pub fn device(&self) -> Arc<Mutex<T>> {
        self.device.clone()
    }

    pub fn object_name(&self) -> &str {
        &self.name
    }

    pub fn set_object_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn is_broadcast_enabled(&self) -> bool {
        self.broadcast_enabled
    }

    pub fn set_broadcast_enabled(&mut self, enabled: bool) {
        self.broadcast_enabled = enabled;
    }

    /// Inactivity timeout in milliseconds, forwarded to port implementations
    /// as configuration; enforcement is the port's responsibility
    pub fn timeout(&self) -> u32 {
        self.timeout_ms
    }

    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    /// The unit filter, or `None` to accept every unit
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

    /// Whether a request addressed to `unit` would be served
    pub fn is_unit_enabled(&self, unit: u8) -> bool {
        if unit == 0 && self.broadcast_enabled {
            return true;
        }
        match &self.unit_map {
            None => true,
            Some(map) => map.get(unit),
        }
    }

    /// Enable or disable one unit, materializing an empty filter first if
    /// none was set
    pub fn set_unit_enabled(&mut self, unit: u8, enabled: bool) {
        self.unit_map
            .get_or_insert_with(UnitMap::empty)
            .set(unit, enabled);
    }

    pub fn decode_level(&self) -> PduDecodeLevel {
        self.decode_level
    }

    pub fn set_decode_level(&mut self, level: PduDecodeLevel) {
        self.decode_level = level;
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

    pub(crate) fn set_event_forwarding(&mut self, enabled: bool) {
        self.forward = enabled;
    }

    pub(crate) fn drain_events(&mut self) -> Vec<PortEvent> {
        std::mem::take(&mut self.forwarded)
    }

    fn dispatch(&mut self) -> StatusCode {
        let pending = match self.pending.as_ref() {
            Some(pending) => pending,
            None => return StatusCode::Bad,
        };
        let mut guard = match self.device.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        codec::server::execute(
            &pending.request,
            pending.unit,
            &mut *guard,
            &mut self.response,
        )
    }

    fn stage_exception(
        &mut self,
        unit: u8,
        function: u8,
        code: ExceptionCode,
        status: StatusCode,
    ) {
        self.response_unit = unit;
        self.response_function = function | EXCEPTION_BIT;
        self.response.clear();
        self.response.push(code.into());
        self.final_status = status;
    }

    fn closing_requested(&self) -> bool {
        self.cmd_close || !self.port.is_open()
    }

    fn enter_close(&mut self) -> StatusCode {
        let status = self.port.close();
        if status.is_processing() {
            self.set_state(ServerState::WaitForClose);
            return status;
        }
        self.finish_close();
        StatusCode::Good
    }

    fn finish_close(&mut self) {
        self.emit_closed();
        self.emit_completed(StatusCode::Good);
        self.set_state(ServerState::Closed);
    }

    /// Transaction ends with no wire response: error already raised if any
    fn finish_without_response(&mut self, status: StatusCode) -> StatusCode {
        self.emit_completed(status);
        self.set_state(ServerState::BeginRead);
        status
    }

    /// A port step failed mid-transaction
    fn abort_transaction(&mut self, status: StatusCode) -> StatusCode {
        self.raise_port_error(status);
        self.emit_completed(status);
        self.set_state(ServerState::BeginRead);
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
        if self.forward {
            self.forwarded
                .push(PortEvent::Error(status, self.last_error_text.clone()));
        }
    }

    fn emit_opened(&mut self) {
        debug!("{}: opened", self.name);
        self.events.opened.emit(&self.name);
        if self.forward {
            self.forwarded.push(PortEvent::Opened);
        }
    }

    fn emit_closed(&mut self) {
        debug!("{}: closed", self.name);
        self.events.closed.emit(&self.name);
        if self.forward {
            self.forwarded.push(PortEvent::Closed);
        }
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
        if self.forward {
            self.forwarded.push(PortEvent::Tx(data.to_vec()));
        }
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
        if self.forward {
            self.forwarded.push(PortEvent::Rx(data.to_vec()));
        }
    }

    fn emit_completed(&mut self, status: StatusCode) {
        self.last_status = status;
        self.last_status_timestamp = Some(std::time::Instant::now());
        self.events.completed.emit(&self.name, status);
        if self.forward {
            self.forwarded.push(PortEvent::Completed(status));
        }
    }

    fn set_state(&mut self, state: ServerState) {
        if state != self.state {
            debug!("{}: {:?} -> {:?}", self.name, self.state, state);
            self.state = state;
        }
    }
}

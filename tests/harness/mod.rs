//! Scripted test doubles: a port whose step results are queued by the test,
//! an in-memory bench device, a scripted acceptor, and signal counters.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use pollbus::frame::Frame;
use pollbus::port::Port;
use pollbus::prelude::*;
use pollbus::server::AcceptedConnection;

// ---------------------------------------------------------------------------
// scripted port
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PortState {
    open_results: VecDeque<StatusCode>,
    read_results: VecDeque<StatusCode>,
    write_results: VecDeque<StatusCode>,
    write_buffer_results: VecDeque<StatusCode>,
    read_buffer_results: VecDeque<StatusCode>,
    open_queue: VecDeque<bool>,
    open_fallback: bool,
    frames: VecDeque<(u8, u8, Vec<u8>)>,
    writes: Vec<(u8, u8, Vec<u8>)>,
    open_calls: u32,
    close_calls: u32,
    read_calls: u32,
    write_calls: u32,
    server_mode: Option<bool>,
}

/// The `Port` half handed to the engine under test
pub struct PortScript {
    shared: Rc<RefCell<PortState>>,
    current: Option<(u8, u8, Vec<u8>)>,
    rx_data: Vec<u8>,
    tx_data: Vec<u8>,
}

/// The scripting half kept by the test
pub struct PortHandle {
    shared: Rc<RefCell<PortState>>,
}

/// Build a scripted port: the port is open by default, `read` idles with
/// `Processing` until a result is queued, `open`/`write` default to `Good`.
pub fn script_port() -> (PortScript, PortHandle) {
    let shared = Rc::new(RefCell::new(PortState {
        open_fallback: true,
        ..PortState::default()
    }));
    (
        PortScript {
            shared: shared.clone(),
            current: None,
            rx_data: Vec::new(),
            tx_data: Vec::new(),
        },
        PortHandle { shared },
    )
}

impl Port for PortScript {
    fn open(&mut self) -> StatusCode {
        let mut state = self.shared.borrow_mut();
        state.open_calls += 1;
        state.open_results.pop_front().unwrap_or(StatusCode::Good)
    }

    fn close(&mut self) -> StatusCode {
        let mut state = self.shared.borrow_mut();
        state.close_calls += 1;
        state.open_fallback = false;
        StatusCode::Good
    }

    fn is_open(&self) -> bool {
        let mut state = self.shared.borrow_mut();
        match state.open_queue.pop_front() {
            Some(value) => value,
            None => state.open_fallback,
        }
    }

    fn protocol_type(&self) -> ProtocolType {
        ProtocolType::Tcp
    }

    fn set_server_mode(&mut self, server_mode: bool) {
        self.shared.borrow_mut().server_mode = Some(server_mode);
    }

    fn read(&mut self) -> StatusCode {
        let mut state = self.shared.borrow_mut();
        state.read_calls += 1;
        let status = state
            .read_results
            .pop_front()
            .unwrap_or(StatusCode::Processing);
        if status.is_good() {
            self.current = state.frames.pop_front();
            self.rx_data.clear();
            if let Some((_, function, body)) = &self.current {
                self.rx_data.push(*function);
                self.rx_data.extend_from_slice(body);
            }
        }
        status
    }

    fn write(&mut self) -> StatusCode {
        let mut state = self.shared.borrow_mut();
        state.write_calls += 1;
        state.write_results.pop_front().unwrap_or(StatusCode::Good)
    }

    fn write_buffer(&mut self, unit: u8, function: u8, body: &[u8]) -> StatusCode {
        let mut state = self.shared.borrow_mut();
        let status = state
            .write_buffer_results
            .pop_front()
            .unwrap_or(StatusCode::Good);
        if !status.is_bad() {
            state.writes.push((unit, function, body.to_vec()));
            self.tx_data.clear();
            self.tx_data.push(function);
            self.tx_data.extend_from_slice(body);
        }
        status
    }

    fn read_buffer(&mut self, frame: &mut Frame) -> StatusCode {
        let status = self
            .shared
            .borrow_mut()
            .read_buffer_results
            .pop_front()
            .unwrap_or(StatusCode::Good);
        if let Some((unit, function, body)) = &self.current {
            frame.unit = *unit;
            frame.function = *function;
            assert!(frame.set_body(body));
        }
        status
    }

    fn read_buffer_data(&self) -> &[u8] {
        &self.rx_data
    }

    fn write_buffer_data(&self) -> &[u8] {
        &self.tx_data
    }
}

impl PortHandle {
    pub fn push_open(&self, status: StatusCode) {
        self.shared.borrow_mut().open_results.push_back(status);
    }

    pub fn push_read(&self, status: StatusCode) {
        self.shared.borrow_mut().read_results.push_back(status);
    }

    pub fn push_write(&self, status: StatusCode) {
        self.shared.borrow_mut().write_results.push_back(status);
    }

    pub fn push_write_buffer(&self, status: StatusCode) {
        self.shared
            .borrow_mut()
            .write_buffer_results
            .push_back(status);
    }

    pub fn push_read_buffer(&self, status: StatusCode) {
        self.shared
            .borrow_mut()
            .read_buffer_results
            .push_back(status);
    }

    /// Steady-state answer of `is_open` once the queued sequence drains
    pub fn set_open(&self, open: bool) {
        self.shared.borrow_mut().open_fallback = open;
    }

    /// One-shot `is_open` answers consumed before the steady state applies
    pub fn queue_open_states(&self, states: &[bool]) {
        self.shared
            .borrow_mut()
            .open_queue
            .extend(states.iter().copied());
    }

    /// Queue one inbound frame; pair it with a `push_read(Good)`
    pub fn enqueue_frame(&self, unit: u8, function: u8, body: &[u8]) {
        self.shared
            .borrow_mut()
            .frames
            .push_back((unit, function, body.to_vec()));
    }

    /// Queue a frame and the read step that completes it
    pub fn expect_request(&self, unit: u8, function: u8, body: &[u8]) {
        self.push_read(StatusCode::Good);
        self.enqueue_frame(unit, function, body);
    }

    pub fn writes(&self) -> Vec<(u8, u8, Vec<u8>)> {
        self.shared.borrow().writes.clone()
    }

    pub fn last_write(&self) -> Option<(u8, u8, Vec<u8>)> {
        self.shared.borrow().writes.last().cloned()
    }

    pub fn open_calls(&self) -> u32 {
        self.shared.borrow().open_calls
    }

    pub fn read_calls(&self) -> u32 {
        self.shared.borrow().read_calls
    }

    pub fn write_calls(&self) -> u32 {
        self.shared.borrow().write_calls
    }

    pub fn server_mode(&self) -> Option<bool> {
        self.shared.borrow().server_mode
    }
}

// ---------------------------------------------------------------------------
// bench device
// ---------------------------------------------------------------------------

/// In-memory device: serves canned data, records writes, and can be forced
/// to fail every handler with one status.
#[derive(Default)]
pub struct BenchDevice {
    pub force: Option<StatusCode>,
    pub coil_bytes: Vec<u8>,
    pub discrete_bytes: Vec<u8>,
    pub holding: Vec<u16>,
    pub input: Vec<u16>,
    pub exception_status: u8,
    pub comm_status: u16,
    pub comm_event_count: u16,
    pub comm_message_count: u16,
    pub comm_events: Vec<u8>,
    pub server_id: Vec<u8>,
    pub fifo: Vec<u16>,
    pub single_coil_writes: Vec<(u8, u16, bool)>,
    pub single_register_writes: Vec<(u8, u16, u16)>,
    pub multiple_coil_writes: Vec<(u8, u16, u16, Vec<u8>)>,
    pub multiple_register_writes: Vec<(u8, u16, Vec<u16>)>,
    pub mask_writes: Vec<(u8, u16, u16, u16)>,
    pub dispatch_count: u32,
}

impl BenchDevice {
    fn forced(&mut self) -> Option<StatusCode> {
        self.dispatch_count += 1;
        self.force
    }
}

impl Device for BenchDevice {
    fn read_coils(&mut self, _unit: u8, _offset: u16, _count: u16, values: &mut [u8]) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        let needed = values.len();
        if self.coil_bytes.len() < needed {
            return StatusCode::BadIllegalDataAddress;
        }
        values.copy_from_slice(&self.coil_bytes[..needed]);
        StatusCode::Good
    }

    fn read_discrete_inputs(
        &mut self,
        _unit: u8,
        _offset: u16,
        _count: u16,
        values: &mut [u8],
    ) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        let needed = values.len();
        if self.discrete_bytes.len() < needed {
            return StatusCode::BadIllegalDataAddress;
        }
        values.copy_from_slice(&self.discrete_bytes[..needed]);
        StatusCode::Good
    }

    fn read_holding_registers(
        &mut self,
        _unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
    ) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        let start = offset as usize;
        match self.holding.get(start..start + count as usize) {
            Some(registers) => {
                values[..registers.len()].copy_from_slice(registers);
                StatusCode::Good
            }
            None => StatusCode::BadIllegalDataAddress,
        }
    }

    fn read_input_registers(
        &mut self,
        _unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
    ) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        let start = offset as usize;
        match self.input.get(start..start + count as usize) {
            Some(registers) => {
                values[..registers.len()].copy_from_slice(registers);
                StatusCode::Good
            }
            None => StatusCode::BadIllegalDataAddress,
        }
    }

    fn write_single_coil(&mut self, unit: u8, offset: u16, value: bool) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        self.single_coil_writes.push((unit, offset, value));
        StatusCode::Good
    }

    fn write_single_register(&mut self, unit: u8, offset: u16, value: u16) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        self.single_register_writes.push((unit, offset, value));
        StatusCode::Good
    }

    fn read_exception_status(&mut self, _unit: u8, status: &mut u8) -> StatusCode {
        if let Some(forced) = self.forced() {
            return forced;
        }
        *status = self.exception_status;
        StatusCode::Good
    }

    fn diagnostics(
        &mut self,
        _unit: u8,
        _sub_function: u16,
        data: &[u8],
        output: &mut Vec<u8>,
    ) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        output.extend_from_slice(data);
        StatusCode::Good
    }

    fn get_comm_event_counter(
        &mut self,
        _unit: u8,
        status: &mut u16,
        event_count: &mut u16,
    ) -> StatusCode {
        if let Some(forced) = self.forced() {
            return forced;
        }
        *status = self.comm_status;
        *event_count = self.comm_event_count;
        StatusCode::Good
    }

    fn get_comm_event_log(
        &mut self,
        _unit: u8,
        status: &mut u16,
        event_count: &mut u16,
        message_count: &mut u16,
        events: &mut Vec<u8>,
    ) -> StatusCode {
        if let Some(forced) = self.forced() {
            return forced;
        }
        *status = self.comm_status;
        *event_count = self.comm_event_count;
        *message_count = self.comm_message_count;
        events.extend_from_slice(&self.comm_events);
        StatusCode::Good
    }

    fn write_multiple_coils(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &[u8],
    ) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        self.multiple_coil_writes
            .push((unit, offset, count, values.to_vec()));
        StatusCode::Good
    }

    fn write_multiple_registers(&mut self, unit: u8, offset: u16, values: &[u16]) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        self.multiple_register_writes
            .push((unit, offset, values.to_vec()));
        StatusCode::Good
    }

    fn report_server_id(&mut self, _unit: u8, data: &mut Vec<u8>) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        data.extend_from_slice(&self.server_id);
        StatusCode::Good
    }

    fn mask_write_register(
        &mut self,
        unit: u8,
        offset: u16,
        and_mask: u16,
        or_mask: u16,
    ) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        self.mask_writes.push((unit, offset, and_mask, or_mask));
        StatusCode::Good
    }

    fn read_write_multiple_registers(
        &mut self,
        unit: u8,
        read_offset: u16,
        read_count: u16,
        read_values: &mut [u16],
        write_offset: u16,
        write_values: &[u16],
    ) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        self.multiple_register_writes
            .push((unit, write_offset, write_values.to_vec()));
        let start = read_offset as usize;
        match self.holding.get(start..start + read_count as usize) {
            Some(registers) => {
                read_values[..registers.len()].copy_from_slice(registers);
                StatusCode::Good
            }
            None => StatusCode::BadIllegalDataAddress,
        }
    }

    fn read_fifo_queue(&mut self, _unit: u8, _fifo_address: u16, values: &mut Vec<u16>) -> StatusCode {
        if let Some(status) = self.forced() {
            return status;
        }
        values.extend_from_slice(&self.fifo);
        StatusCode::Good
    }
}

// ---------------------------------------------------------------------------
// scripted listener
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ListenerState {
    open: bool,
    open_results: VecDeque<StatusCode>,
    pending: VecDeque<AcceptedConnection>,
    opened_endpoint: Option<(String, u16)>,
}

pub struct ListenerScript {
    shared: Rc<RefCell<ListenerState>>,
}

pub struct ListenerHandle {
    shared: Rc<RefCell<ListenerState>>,
}

pub fn script_listener() -> (ListenerScript, ListenerHandle) {
    let shared = Rc::new(RefCell::new(ListenerState::default()));
    (
        ListenerScript {
            shared: shared.clone(),
        },
        ListenerHandle { shared },
    )
}

impl Listener for ListenerScript {
    fn open(&mut self, ipaddr: &str, port: u16) -> StatusCode {
        let mut state = self.shared.borrow_mut();
        let status = state.open_results.pop_front().unwrap_or(StatusCode::Good);
        if status.is_good() {
            state.open = true;
            state.opened_endpoint = Some((ipaddr.to_string(), port));
        }
        status
    }

    fn close(&mut self) -> StatusCode {
        self.shared.borrow_mut().open = false;
        StatusCode::Good
    }

    fn is_open(&self) -> bool {
        self.shared.borrow().open
    }

    fn accept(&mut self) -> Option<AcceptedConnection> {
        self.shared.borrow_mut().pending.pop_front()
    }
}

impl ListenerHandle {
    pub fn push_open(&self, status: StatusCode) {
        self.shared.borrow_mut().open_results.push_back(status);
    }

    pub fn push_connection(&self, port: Box<dyn Port>, peer: &str) {
        self.shared.borrow_mut().pending.push_back(AcceptedConnection {
            port,
            peer: peer.to_string(),
        });
    }

    pub fn opened_endpoint(&self) -> Option<(String, u16)> {
        self.shared.borrow().opened_endpoint.clone()
    }
}

// ---------------------------------------------------------------------------
// signal counters
// ---------------------------------------------------------------------------

/// Shared counters incremented by signal subscriptions
#[derive(Clone, Default)]
pub struct Counters {
    pub opened: Rc<Cell<u32>>,
    pub closed: Rc<Cell<u32>>,
    pub tx: Rc<Cell<u32>>,
    pub rx: Rc<Cell<u32>>,
    pub error: Rc<Cell<u32>>,
    pub completed: Rc<Cell<u32>>,
    pub new_connection: Rc<Cell<u32>>,
    pub close_connection: Rc<Cell<u32>>,
    pub last_completed: Rc<Cell<Option<StatusCode>>>,
    pub last_tx: Rc<RefCell<Vec<u8>>>,
    pub last_rx: Rc<RefCell<Vec<u8>>>,
}

fn bump(counter: &Rc<Cell<u32>>) {
    counter.set(counter.get() + 1);
}

impl Counters {
    pub fn connect(events: &mut PortEvents) -> Counters {
        let counters = Counters::default();
        let c = counters.clone();
        events.opened.connect(move |_| bump(&c.opened));
        let c = counters.clone();
        events.closed.connect(move |_| bump(&c.closed));
        let c = counters.clone();
        events.tx.connect(move |_, data| {
            bump(&c.tx);
            *c.last_tx.borrow_mut() = data.to_vec();
        });
        let c = counters.clone();
        events.rx.connect(move |_, data| {
            bump(&c.rx);
            *c.last_rx.borrow_mut() = data.to_vec();
        });
        let c = counters.clone();
        events.error.connect(move |_, _, _| bump(&c.error));
        let c = counters.clone();
        events.completed.connect(move |_, status| {
            bump(&c.completed);
            c.last_completed.set(Some(status));
        });
        counters
    }

    pub fn connect_tcp(events: &mut TcpServerEvents) -> Counters {
        let counters = Counters::default();
        let c = counters.clone();
        events.opened.connect(move |_| bump(&c.opened));
        let c = counters.clone();
        events.closed.connect(move |_| bump(&c.closed));
        let c = counters.clone();
        events.tx.connect(move |_, data| {
            bump(&c.tx);
            *c.last_tx.borrow_mut() = data.to_vec();
        });
        let c = counters.clone();
        events.rx.connect(move |_, data| {
            bump(&c.rx);
            *c.last_rx.borrow_mut() = data.to_vec();
        });
        let c = counters.clone();
        events.error.connect(move |_, _, _| bump(&c.error));
        let c = counters.clone();
        events.completed.connect(move |_, status| {
            bump(&c.completed);
            c.last_completed.set(Some(status));
        });
        let c = counters.clone();
        events.new_connection.connect(move |_| bump(&c.new_connection));
        let c = counters.clone();
        events
            .close_connection
            .connect(move |_| bump(&c.close_connection));
        counters
    }

    pub fn snapshot(&self) -> (u32, u32, u32, u32, u32, u32) {
        (
            self.opened.get(),
            self.closed.get(),
            self.tx.get(),
            self.rx.get(),
            self.error.get(),
            self.completed.get(),
        )
    }
}

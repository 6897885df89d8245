//! Lifecycle signal subscription and delivery.
//!
//! Every engine object exposes its events as a struct of typed [`Signal`]
//! fields. Subscribing returns a [`SlotId`] that can later be used to
//! disconnect. Delivery is synchronous on the emitting call, in subscription
//! order. Handlers receive only event data, so they cannot mutate the
//! emitting state machine mid-signal; follow-up calls must be enqueued by
//! the application.

use crate::status::StatusCode;

/// Identifies one subscription on one signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

/// An observable event to which typed callbacks may subscribe.
///
/// The type parameter is the callback shape, e.g.
/// `Signal<dyn FnMut(&str, StatusCode)>`.
pub struct Signal<F: ?Sized> {
    slots: Vec<(SlotId, Box<F>)>,
    next: u64,
}

impl<F: ?Sized> Default for Signal<F> {
    fn default() -> Self {
        Signal {
            slots: Vec::new(),
            next: 0,
        }
    }
}

impl<F: ?Sized> Signal<F> {
    fn insert(&mut self, slot: Box<F>) -> SlotId {
        let id = SlotId(self.next);
        self.next += 1;
        self.slots.push((id, slot));
        id
    }

    /// Remove one subscription. Returns false when the id is unknown.
    pub fn disconnect(&mut self, id: SlotId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(slot, _)| *slot != id);
        self.slots.len() != before
    }

    /// Whether anything is subscribed
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Signal<dyn FnMut(&str)> {
    /// Subscribe a callback receiving the source identifier
    pub fn connect<F: FnMut(&str) + 'static>(&mut self, slot: F) -> SlotId {
        self.insert(Box::new(slot))
    }

    pub(crate) fn emit(&mut self, source: &str) {
        for (_, slot) in self.slots.iter_mut() {
            slot(source);
        }
    }
}

impl Signal<dyn FnMut(&str, &[u8])> {
    /// Subscribe a callback receiving the source identifier and the raw PDU bytes
    pub fn connect<F: FnMut(&str, &[u8]) + 'static>(&mut self, slot: F) -> SlotId {
        self.insert(Box::new(slot))
    }

    pub(crate) fn emit(&mut self, source: &str, data: &[u8]) {
        for (_, slot) in self.slots.iter_mut() {
            slot(source, data);
        }
    }
}

impl Signal<dyn FnMut(&str, StatusCode, &str)> {
    /// Subscribe a callback receiving the source identifier, the failed
    /// status, and its human-readable text
    pub fn connect<F: FnMut(&str, StatusCode, &str) + 'static>(&mut self, slot: F) -> SlotId {
        self.insert(Box::new(slot))
    }

    pub(crate) fn emit(&mut self, source: &str, status: StatusCode, text: &str) {
        for (_, slot) in self.slots.iter_mut() {
            slot(source, status, text);
        }
    }
}

impl Signal<dyn FnMut(&str, StatusCode)> {
    /// Subscribe a callback receiving the source identifier and the
    /// transaction's terminal status
    pub fn connect<F: FnMut(&str, StatusCode) + 'static>(&mut self, slot: F) -> SlotId {
        self.insert(Box::new(slot))
    }

    pub(crate) fn emit(&mut self, source: &str, status: StatusCode) {
        for (_, slot) in self.slots.iter_mut() {
            slot(source, status);
        }
    }
}

/// Lifecycle events common to server resources and client ports.
///
/// Within one transaction `completed` is always the last signal; `tx` fires
/// once per frame the port finished sending, `rx` once per frame it finished
/// receiving.
#[derive(Default)]
pub struct PortEvents {
    /// The port transitioned to open
    pub opened: Signal<dyn FnMut(&str)>,
    /// The port transitioned to closed
    pub closed: Signal<dyn FnMut(&str)>,
    /// A frame finished sending; payload is the raw PDU
    pub tx: Signal<dyn FnMut(&str, &[u8])>,
    /// A frame finished receiving; payload is the raw PDU
    pub rx: Signal<dyn FnMut(&str, &[u8])>,
    /// An operation failed
    pub error: Signal<dyn FnMut(&str, StatusCode, &str)>,
    /// A transaction reached its terminal status
    pub completed: Signal<dyn FnMut(&str, StatusCode)>,
}

/// [`PortEvents`] plus the connection-lifecycle events of the TCP server
#[derive(Default)]
pub struct TcpServerEvents {
    /// The acceptor started listening
    pub opened: Signal<dyn FnMut(&str)>,
    /// The acceptor stopped listening and all connections drained
    pub closed: Signal<dyn FnMut(&str)>,
    /// Re-emission of a child connection's tx, keyed by the child's source
    pub tx: Signal<dyn FnMut(&str, &[u8])>,
    /// Re-emission of a child connection's rx
    pub rx: Signal<dyn FnMut(&str, &[u8])>,
    /// Re-emission of a child connection's error, or an acceptor failure
    pub error: Signal<dyn FnMut(&str, StatusCode, &str)>,
    /// Re-emission of a child connection's completed
    pub completed: Signal<dyn FnMut(&str, StatusCode)>,
    /// A socket was accepted and a connection state machine created
    pub new_connection: Signal<dyn FnMut(&str)>,
    /// A connection state machine closed and was dropped
    pub close_connection: Signal<dyn FnMut(&str)>,
}

/// Owned record of an emitted event, used to re-emit child connection
/// signals on the TCP server with the child's source identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PortEvent {
    Opened,
    Closed,
    Tx(Vec<u8>),
    Rx(Vec<u8>),
    Error(StatusCode, String),
    Completed(StatusCode),
}

use crate::frame::Frame;
use crate::status::StatusCode;
use crate::types::ProtocolType;

/// Abstract duplex byte port with framed buffer accessors and step
/// semantics.
///
/// A port owns an inbound and an outbound frame buffer (capacity at least
/// [`FRAME_BUFFER_SIZE`](crate::frame::FRAME_BUFFER_SIZE)) and moves whole
/// frames between them and the transport. [`read`](Port::read) and
/// [`write`](Port::write) are *step* functions: a blocking port completes in
/// one call, a non-blocking port returns
/// [`Processing`](StatusCode::Processing) until the frame is complete and
/// must be called again with no intervening buffer mutation.
///
/// Contract the port promises to its state machine:
///
/// * once `read` returns `Good`, the inbound frame remains valid until the
///   next `read` call;
/// * [`write_buffer`](Port::write_buffer) is called exactly once per
///   outbound frame, before the first `write` step; a subsequent `write`
///   after completion re-sends the same staged frame (used by client
///   retries);
/// * [`is_open`](Port::is_open) may drop asynchronously on link loss; state
///   machines observe it either through a returned `Bad*` or on their next
///   tick.
pub trait Port {
    /// Start opening the transport. May return `Processing`; re-poll to
    /// continue. Idempotent once open.
    fn open(&mut self) -> StatusCode;

    /// Start closing the transport. May return `Processing`.
    fn close(&mut self) -> StatusCode;

    /// Current link state
    fn is_open(&self) -> bool;

    /// Framing family of this port
    fn protocol_type(&self) -> ProtocolType;

    /// Instructs the port whether inbound frames carry server-mode headers
    /// (affects e.g. TCP MBAP transaction-id handling)
    fn set_server_mode(&mut self, server_mode: bool);

    /// Attempt to complete one inbound frame into the read buffer.
    /// `Good` when a full frame is available, `Processing` while waiting,
    /// `Bad*` on transport failure.
    fn read(&mut self) -> StatusCode;

    /// Drain the currently staged outbound frame. Same tri-state result.
    fn write(&mut self) -> StatusCode;

    /// Stage one outbound frame. Returns
    /// [`BadWriteBufferOverflow`](StatusCode::BadWriteBufferOverflow) when
    /// the frame does not fit.
    fn write_buffer(&mut self, unit: u8, function: u8, body: &[u8]) -> StatusCode;

    /// Parse the completed inbound frame's header and copy its body into
    /// `frame`. Only valid after `read` returned `Good`.
    fn read_buffer(&mut self, frame: &mut Frame) -> StatusCode;

    /// Raw PDU bytes of the completed inbound frame, for logging and the
    /// `rx` signal payload
    fn read_buffer_data(&self) -> &[u8];

    /// Raw PDU bytes of the staged outbound frame, for logging and the
    /// `tx` signal payload
    fn write_buffer_data(&self) -> &[u8];

    /// Human-readable description of the port's last failure
    fn last_error_text(&self) -> &str {
        ""
    }
}

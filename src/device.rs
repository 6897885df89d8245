use std::sync::{Arc, Mutex};

use crate::status::StatusCode;

/// Application back-end invoked by the server, one method per function code.
///
/// Every method returns a [`StatusCode`]: `Good` produces a success
/// response, a status in the protocol-exception band produces the matching
/// wire exception, any other `Bad*` produces a ServerDeviceFailure
/// exception, and `Processing` keeps the server in its dispatch state so an
/// asynchronous device can finish on a later tick. The single special case
/// is [`BadGatewayPathUnavailable`](StatusCode::BadGatewayPathUnavailable),
/// which suppresses the wire response entirely.
///
/// Bit payloads cross this boundary packed in wire order: bit k of the
/// request maps to bit (k % 8) of byte k / 8. Registers are host-native
/// `u16`; the codec owns the big-endian conversion.
///
/// All methods default to
/// [`BadIllegalFunction`](StatusCode::BadIllegalFunction), so a device
/// implements only the functions it supports.
pub trait Device {
    /// Read `count` coils starting at `offset` into `values`, packed in
    /// wire order. `values` holds exactly the needed number of bytes.
    fn read_coils(&mut self, unit: u8, offset: u16, count: u16, values: &mut [u8]) -> StatusCode {
        let _ = (unit, offset, count, values);
        StatusCode::BadIllegalFunction
    }

    /// Read `count` discrete inputs starting at `offset`, packed like coils
    fn read_discrete_inputs(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u8],
    ) -> StatusCode {
        let _ = (unit, offset, count, values);
        StatusCode::BadIllegalFunction
    }

    /// Read `count` holding registers starting at `offset`
    fn read_holding_registers(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
    ) -> StatusCode {
        let _ = (unit, offset, count, values);
        StatusCode::BadIllegalFunction
    }

    /// Read `count` input registers starting at `offset`
    fn read_input_registers(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
    ) -> StatusCode {
        let _ = (unit, offset, count, values);
        StatusCode::BadIllegalFunction
    }

    /// Write one coil
    fn write_single_coil(&mut self, unit: u8, offset: u16, value: bool) -> StatusCode {
        let _ = (unit, offset, value);
        StatusCode::BadIllegalFunction
    }

    /// Write one register
    fn write_single_register(&mut self, unit: u8, offset: u16, value: u16) -> StatusCode {
        let _ = (unit, offset, value);
        StatusCode::BadIllegalFunction
    }

    /// Read the eight server exception-status outputs
    fn read_exception_status(&mut self, unit: u8, status: &mut u8) -> StatusCode {
        let _ = (unit, status);
        StatusCode::BadIllegalFunction
    }

    /// Run a diagnostic sub-function; the device appends its answer data to
    /// `output` (most sub-functions echo the request data)
    fn diagnostics(
        &mut self,
        unit: u8,
        sub_function: u16,
        data: &[u8],
        output: &mut Vec<u8>,
    ) -> StatusCode {
        let _ = (unit, sub_function, data, output);
        StatusCode::BadIllegalFunction
    }

    /// Report the communication event counter
    fn get_comm_event_counter(
        &mut self,
        unit: u8,
        status: &mut u16,
        event_count: &mut u16,
    ) -> StatusCode {
        let _ = (unit, status, event_count);
        StatusCode::BadIllegalFunction
    }

    /// Report the communication event log; the device appends its event
    /// bytes to `events`
    fn get_comm_event_log(
        &mut self,
        unit: u8,
        status: &mut u16,
        event_count: &mut u16,
        message_count: &mut u16,
        events: &mut Vec<u8>,
    ) -> StatusCode {
        let _ = (unit, status, event_count, message_count, events);
        StatusCode::BadIllegalFunction
    }

    /// Write `count` coils starting at `offset`; `values` is packed in wire
    /// order
    fn write_multiple_coils(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &[u8],
    ) -> StatusCode {
        let _ = (unit, offset, count, values);
        StatusCode::BadIllegalFunction
    }

    /// Write `values.len()` registers starting at `offset`
    fn write_multiple_registers(&mut self, unit: u8, offset: u16, values: &[u16]) -> StatusCode {
        let _ = (unit, offset, values);
        StatusCode::BadIllegalFunction
    }

    /// Report the server identification bytes by appending them to `data`
    fn report_server_id(&mut self, unit: u8, data: &mut Vec<u8>) -> StatusCode {
        let _ = (unit, data);
        StatusCode::BadIllegalFunction
    }

    /// Modify one register: `(current & and_mask) | (or_mask & !and_mask)`
    fn mask_write_register(
        &mut self,
        unit: u8,
        offset: u16,
        and_mask: u16,
        or_mask: u16,
    ) -> StatusCode {
        let _ = (unit, offset, and_mask, or_mask);
        StatusCode::BadIllegalFunction
    }

    /// Write `write_values` starting at `write_offset`, then read
    /// `read_count` registers starting at `read_offset` into `read_values`
    fn read_write_multiple_registers(
        &mut self,
        unit: u8,
        read_offset: u16,
        read_count: u16,
        read_values: &mut [u16],
        write_offset: u16,
        write_values: &[u16],
    ) -> StatusCode {
        let _ = (
            unit,
            read_offset,
            read_count,
            read_values,
            write_offset,
            write_values,
        );
        StatusCode::BadIllegalFunction
    }

    /// Read the FIFO queue registered at `fifo_address` by appending its
    /// contents to `values` (at most 31 entries per the specification)
    fn read_fifo_queue(&mut self, unit: u8, fifo_address: u16, values: &mut Vec<u16>) -> StatusCode {
        let _ = (unit, fifo_address, values);
        StatusCode::BadIllegalFunction
    }

    /// Moves a device implementation into the shared handle servers take
    fn wrap(self) -> Arc<Mutex<Self>>
    where
        Self: Sized,
    {
        Arc::new(Mutex::new(self))
    }
}

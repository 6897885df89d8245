//! Typed transaction helpers, one per function code, plus the lightweight
//! [`Client`] handle.
//!
//! Every helper exists in two forms: the plain form issues the transaction
//! as the port itself, the `_for` form on behalf of a [`ClientId`] obtained
//! from [`ClientPort::attach`]. On a non-blocking port the caller repeats
//! the same call until it returns a terminal status; calls from a client
//! that does not own the in-flight transaction return
//! [`Processing`](StatusCode::Processing) without touching the port.

use crate::client::{ClientId, ClientPort};
use crate::codec::response;
use crate::codec::Request;
use crate::constants::{function, limits};
use crate::status::StatusCode;
use crate::types::coil_to_u16;
use crate::util::bits::{num_bytes_for_bits, pack_bits, unpack_bits};

impl ClientPort {
    /// fc 0x01: read `count` coils into `values`, packed in wire order
    pub fn read_coils(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u8],
    ) -> StatusCode {
        self.read_coils_for(ClientId::LOCAL, unit, offset, count, values)
    }

    pub fn read_coils_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u8],
    ) -> StatusCode {
        let capacity = values.len();
        self.transaction(
            client,
            unit,
            function::READ_COILS,
            move |body| {
                if count == 0 || count > limits::MAX_DISCRETS || capacity < num_bytes_for_bits(count)
                {
                    return StatusCode::BadNotCorrectRequest;
                }
                Request::ReadCoils { offset, count }.serialize(body);
                StatusCode::Good
            },
            |body| response::read_bits(body, count, values),
        )
    }

    /// fc 0x01: read `count` coils into a bool slice
    pub fn read_coils_as_bools(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [bool],
    ) -> StatusCode {
        self.read_coils_as_bools_for(ClientId::LOCAL, unit, offset, count, values)
    }

    pub fn read_coils_as_bools_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [bool],
    ) -> StatusCode {
        let capacity = values.len();
        self.transaction(
            client,
            unit,
            function::READ_COILS,
            move |body| {
                if count == 0 || count > limits::MAX_DISCRETS || capacity < count as usize {
                    return StatusCode::BadNotCorrectRequest;
                }
                Request::ReadCoils { offset, count }.serialize(body);
                StatusCode::Good
            },
            |body| unpack_bit_response(body, count, values),
        )
    }

    /// fc 0x02: read `count` discrete inputs into `values`, packed in wire order
    pub fn read_discrete_inputs(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u8],
    ) -> StatusCode {
        self.read_discrete_inputs_for(ClientId::LOCAL, unit, offset, count, values)
    }

    pub fn read_discrete_inputs_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u8],
    ) -> StatusCode {
        let capacity = values.len();
        self.transaction(
            client,
            unit,
            function::READ_DISCRETE_INPUTS,
            move |body| {
                if count == 0 || count > limits::MAX_DISCRETS || capacity < num_bytes_for_bits(count)
                {
                    return StatusCode::BadNotCorrectRequest;
                }
                Request::ReadDiscreteInputs { offset, count }.serialize(body);
                StatusCode::Good
            },
            |body| response::read_bits(body, count, values),
        )
    }

    /// fc 0x02: read `count` discrete inputs into a bool slice
    pub fn read_discrete_inputs_as_bools(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [bool],
    ) -> StatusCode {
        self.read_discrete_inputs_as_bools_for(ClientId::LOCAL, unit, offset, count, values)
    }

    pub fn read_discrete_inputs_as_bools_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [bool],
    ) -> StatusCode {
        let capacity = values.len();
        self.transaction(
            client,
            unit,
            function::READ_DISCRETE_INPUTS,
            move |body| {
                if count == 0 || count > limits::MAX_DISCRETS || capacity < count as usize {
                    return StatusCode::BadNotCorrectRequest;
                }
                Request::ReadDiscreteInputs { offset, count }.serialize(body);
                StatusCode::Good
            },
            |body| unpack_bit_response(body, count, values),
        )
    }

    /// fc 0x03: read `count` holding registers
    pub fn read_holding_registers(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
    ) -> StatusCode {
        self.read_holding_registers_for(ClientId::LOCAL, unit, offset, count, values)
    }

    pub fn read_holding_registers_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
    ) -> StatusCode {
        let capacity = values.len();
        self.transaction(
            client,
            unit,
            function::READ_HOLDING_REGISTERS,
            move |body| {
                if count == 0 || count > limits::MAX_REGISTERS || capacity < count as usize {
                    return StatusCode::BadNotCorrectRequest;
                }
                Request::ReadHoldingRegisters { offset, count }.serialize(body);
                StatusCode::Good
            },
            |body| response::read_registers(body, count, values),
        )
    }

    /// fc 0x04: read `count` input registers
    pub fn read_input_registers(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
    ) -> StatusCode {
        self.read_input_registers_for(ClientId::LOCAL, unit, offset, count, values)
    }

    pub fn read_input_registers_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
    ) -> StatusCode {
        let capacity = values.len();
        self.transaction(
            client,
            unit,
            function::READ_INPUT_REGISTERS,
            move |body| {
                if count == 0 || count > limits::MAX_REGISTERS || capacity < count as usize {
                    return StatusCode::BadNotCorrectRequest;
                }
                Request::ReadInputRegisters { offset, count }.serialize(body);
                StatusCode::Good
            },
            |body| response::read_registers(body, count, values),
        )
    }

    /// fc 0x05: write one coil
    pub fn write_single_coil(&mut self, unit: u8, offset: u16, value: bool) -> StatusCode {
        self.write_single_coil_for(ClientId::LOCAL, unit, offset, value)
    }

    pub fn write_single_coil_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        value: bool,
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::WRITE_SINGLE_COIL,
            move |body| {
                Request::WriteSingleCoil { offset, value }.serialize(body);
                StatusCode::Good
            },
            move |body| response::echo_pair(body, offset, coil_to_u16(value)),
        )
    }

    /// fc 0x06: write one register
    pub fn write_single_register(&mut self, unit: u8, offset: u16, value: u16) -> StatusCode {
        self.write_single_register_for(ClientId::LOCAL, unit, offset, value)
    }

    pub fn write_single_register_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        value: u16,
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::WRITE_SINGLE_REGISTER,
            move |body| {
                Request::WriteSingleRegister { offset, value }.serialize(body);
                StatusCode::Good
            },
            move |body| response::echo_pair(body, offset, value),
        )
    }

    /// fc 0x07: read the eight exception-status outputs
    pub fn read_exception_status(&mut self, unit: u8, status: &mut u8) -> StatusCode {
        self.read_exception_status_for(ClientId::LOCAL, unit, status)
    }

    pub fn read_exception_status_for(
        &mut self,
        client: ClientId,
        unit: u8,
        status: &mut u8,
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::READ_EXCEPTION_STATUS,
            |_| StatusCode::Good,
            |body| response::exception_status(body, status),
        )
    }

    /// fc 0x08: run a diagnostic sub-function; the answer data replaces the
    /// contents of `output`
    pub fn diagnostics(
        &mut self,
        unit: u8,
        sub_function: u16,
        data: &[u8],
        output: &mut Vec<u8>,
    ) -> StatusCode {
        self.diagnostics_for(ClientId::LOCAL, unit, sub_function, data, output)
    }

    pub fn diagnostics_for(
        &mut self,
        client: ClientId,
        unit: u8,
        sub_function: u16,
        data: &[u8],
        output: &mut Vec<u8>,
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::DIAGNOSTICS,
            move |body| {
                Request::Diagnostics {
                    sub_function,
                    data: data.to_vec(),
                }
                .serialize(body);
                StatusCode::Good
            },
            |body| {
                output.clear();
                response::diagnostics(body, sub_function, output)
            },
        )
    }

    /// fc 0x0B: read the communication event counter
    pub fn get_comm_event_counter(
        &mut self,
        unit: u8,
        status: &mut u16,
        event_count: &mut u16,
    ) -> StatusCode {
        self.get_comm_event_counter_for(ClientId::LOCAL, unit, status, event_count)
    }

    pub fn get_comm_event_counter_for(
        &mut self,
        client: ClientId,
        unit: u8,
        status: &mut u16,
        event_count: &mut u16,
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::GET_COMM_EVENT_COUNTER,
            |_| StatusCode::Good,
            |body| response::comm_event_counter(body, status, event_count),
        )
    }

    /// fc 0x0C: read the communication event log; the event bytes replace
    /// the contents of `events`
    pub fn get_comm_event_log(
        &mut self,
        unit: u8,
        status: &mut u16,
        event_count: &mut u16,
        message_count: &mut u16,
        events: &mut Vec<u8>,
    ) -> StatusCode {
        self.get_comm_event_log_for(
            ClientId::LOCAL,
            unit,
            status,
            event_count,
            message_count,
            events,
        )
    }

    pub fn get_comm_event_log_for(
        &mut self,
        client: ClientId,
        unit: u8,
        status: &mut u16,
        event_count: &mut u16,
        message_count: &mut u16,
        events: &mut Vec<u8>,
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::GET_COMM_EVENT_LOG,
            |_| StatusCode::Good,
            |body| {
                events.clear();
                response::comm_event_log(body, status, event_count, message_count, events)
            },
        )
    }

    /// fc 0x0F: write `count` coils from `values`, packed in wire order
    pub fn write_multiple_coils(
        &mut self,
        unit: u8,
        offset: u16,
        count: u16,
        values: &[u8],
    ) -> StatusCode {
        self.write_multiple_coils_for(ClientId::LOCAL, unit, offset, count, values)
    }

    pub fn write_multiple_coils_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        count: u16,
        values: &[u8],
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::WRITE_MULTIPLE_COILS,
            move |body| {
                let needed = num_bytes_for_bits(count);
                if count == 0 || count > limits::MAX_DISCRETS || values.len() < needed {
                    return StatusCode::BadNotCorrectRequest;
                }
                Request::WriteMultipleCoils {
                    offset,
                    count,
                    values: values[..needed].to_vec(),
                }
                .serialize(body);
                StatusCode::Good
            },
            move |body| response::write_multiple_echo(body, offset, count),
        )
    }

    /// fc 0x0F: write coils from a bool slice
    pub fn write_multiple_coils_as_bools(
        &mut self,
        unit: u8,
        offset: u16,
        values: &[bool],
    ) -> StatusCode {
        self.write_multiple_coils_as_bools_for(ClientId::LOCAL, unit, offset, values)
    }

    pub fn write_multiple_coils_as_bools_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        values: &[bool],
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::WRITE_MULTIPLE_COILS,
            move |body| {
                if values.is_empty() || values.len() > limits::MAX_DISCRETS as usize {
                    return StatusCode::BadNotCorrectRequest;
                }
                let count = values.len() as u16;
                let mut packed = vec![0u8; num_bytes_for_bits(count)];
                pack_bits(values, &mut packed);
                Request::WriteMultipleCoils {
                    offset,
                    count,
                    values: packed,
                }
                .serialize(body);
                StatusCode::Good
            },
            move |body| response::write_multiple_echo(body, offset, values.len() as u16),
        )
    }

    /// fc 0x10: write registers
    pub fn write_multiple_registers(
        &mut self,
        unit: u8,
        offset: u16,
        values: &[u16],
    ) -> StatusCode {
        self.write_multiple_registers_for(ClientId::LOCAL, unit, offset, values)
    }

    pub fn write_multiple_registers_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        values: &[u16],
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::WRITE_MULTIPLE_REGISTERS,
            move |body| {
                if values.is_empty() || values.len() > limits::MAX_REGISTERS as usize {
                    return StatusCode::BadNotCorrectRequest;
                }
                Request::WriteMultipleRegisters {
                    offset,
                    values: values.to_vec(),
                }
                .serialize(body);
                StatusCode::Good
            },
            move |body| response::write_multiple_echo(body, offset, values.len() as u16),
        )
    }

    /// fc 0x11: read the server identification; replaces the contents of `data`
    pub fn report_server_id(&mut self, unit: u8, data: &mut Vec<u8>) -> StatusCode {
        self.report_server_id_for(ClientId::LOCAL, unit, data)
    }

    pub fn report_server_id_for(
        &mut self,
        client: ClientId,
        unit: u8,
        data: &mut Vec<u8>,
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::REPORT_SERVER_ID,
            |_| StatusCode::Good,
            |body| {
                data.clear();
                response::server_id(body, data)
            },
        )
    }

    /// fc 0x16: masked register modification
    pub fn mask_write_register(
        &mut self,
        unit: u8,
        offset: u16,
        and_mask: u16,
        or_mask: u16,
    ) -> StatusCode {
        self.mask_write_register_for(ClientId::LOCAL, unit, offset, and_mask, or_mask)
    }

    pub fn mask_write_register_for(
        &mut self,
        client: ClientId,
        unit: u8,
        offset: u16,
        and_mask: u16,
        or_mask: u16,
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::MASK_WRITE_REGISTER,
            move |body| {
                Request::MaskWriteRegister {
                    offset,
                    and_mask,
                    or_mask,
                }
                .serialize(body);
                StatusCode::Good
            },
            move |body| response::mask_write_echo(body, offset, and_mask, or_mask),
        )
    }

    /// fc 0x17: write `write_values`, then read `read_count` registers
    pub fn read_write_multiple_registers(
        &mut self,
        unit: u8,
        read_offset: u16,
        read_count: u16,
        read_values: &mut [u16],
        write_offset: u16,
        write_values: &[u16],
    ) -> StatusCode {
        self.read_write_multiple_registers_for(
            ClientId::LOCAL,
            unit,
            read_offset,
            read_count,
            read_values,
            write_offset,
            write_values,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn read_write_multiple_registers_for(
        &mut self,
        client: ClientId,
        unit: u8,
        read_offset: u16,
        read_count: u16,
        read_values: &mut [u16],
        write_offset: u16,
        write_values: &[u16],
    ) -> StatusCode {
        let capacity = read_values.len();
        self.transaction(
            client,
            unit,
            function::READ_WRITE_MULTIPLE_REGISTERS,
            move |body| {
                if read_count == 0
                    || read_count > limits::MAX_RW_REGISTERS
                    || capacity < read_count as usize
                    || write_values.is_empty()
                    || write_values.len() > limits::MAX_RW_REGISTERS as usize
                {
                    return StatusCode::BadNotCorrectRequest;
                }
                Request::ReadWriteMultipleRegisters {
                    read_offset,
                    read_count,
                    write_offset,
                    write_values: write_values.to_vec(),
                }
                .serialize(body);
                StatusCode::Good
            },
            |body| response::read_registers(body, read_count, read_values),
        )
    }

    /// fc 0x18: read a FIFO queue; replaces the contents of `values`
    pub fn read_fifo_queue(
        &mut self,
        unit: u8,
        fifo_address: u16,
        values: &mut Vec<u16>,
    ) -> StatusCode {
        self.read_fifo_queue_for(ClientId::LOCAL, unit, fifo_address, values)
    }

    pub fn read_fifo_queue_for(
        &mut self,
        client: ClientId,
        unit: u8,
        fifo_address: u16,
        values: &mut Vec<u16>,
    ) -> StatusCode {
        self.transaction(
            client,
            unit,
            function::READ_FIFO_QUEUE,
            move |body| {
                Request::ReadFifoQueue { fifo_address }.serialize(body);
                StatusCode::Good
            },
            |body| {
                values.clear();
                response::fifo_queue(body, values)
            },
        )
    }
}

fn unpack_bit_response(body: &[u8], count: u16, values: &mut [bool]) -> StatusCode {
    let mut packed = vec![0u8; num_bytes_for_bits(count)];
    let status = response::read_bits(body, count, &mut packed);
    if status.is_good() {
        unpack_bits(&packed, &mut values[..count as usize]);
    }
    status
}

/// One logical client of a shared [`ClientPort`], owning a unit address.
///
/// Holds only a [`ClientId`] handle; the port outlives its clients and is
/// passed explicitly to every call.
#[derive(Debug, Clone, Copy)]
pub struct Client {
    id: ClientId,
    unit: u8,
}

impl Client {
    /// Register one more logical client of `port`, addressing `unit`
    pub fn new(unit: u8, port: &mut ClientPort) -> Self {
        Client {
            id: port.attach(),
            unit,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn unit(&self) -> u8 {
        self.unit
    }

    pub fn read_coils(
        &self,
        port: &mut ClientPort,
        offset: u16,
        count: u16,
        values: &mut [u8],
    ) -> StatusCode {
        port.read_coils_for(self.id, self.unit, offset, count, values)
    }

    pub fn read_coils_as_bools(
        &self,
        port: &mut ClientPort,
        offset: u16,
        count: u16,
        values: &mut [bool],
    ) -> StatusCode {
        port.read_coils_as_bools_for(self.id, self.unit, offset, count, values)
    }

    pub fn read_discrete_inputs(
        &self,
        port: &mut ClientPort,
        offset: u16,
        count: u16,
        values: &mut [u8],
    ) -> StatusCode {
        port.read_discrete_inputs_for(self.id, self.unit, offset, count, values)
    }

    pub fn read_discrete_inputs_as_bools(
        &self,
        port: &mut ClientPort,
        offset: u16,
        count: u16,
        values: &mut [bool],
    ) -> StatusCode {
        port.read_discrete_inputs_as_bools_for(self.id, self.unit, offset, count, values)
    }

    pub fn read_holding_registers(
        &self,
        port: &mut ClientPort,
        offset: u16,
        count: u16,
        values: &mut [u16],
    ) -> StatusCode {
        port.read_holding_registers_for(self.id, self.unit, offset, count, values)
    }

    pub fn read_input_registers(
        &self,
        port: &mut ClientPort,
        offset: u16,
        count: u16,
        values: &mut [u16],
    ) -> StatusCode {
        port.read_input_registers_for(self.id, self.unit, offset, count, values)
    }

    pub fn write_single_coil(&self, port: &mut ClientPort, offset: u16, value: bool) -> StatusCode {
        port.write_single_coil_for(self.id, self.unit, offset, value)
    }

    pub fn write_single_register(
        &self,
        port: &mut ClientPort,
        offset: u16,
        value: u16,
    ) -> StatusCode {
        port.write_single_register_for(self.id, self.unit, offset, value)
    }

    pub fn read_exception_status(&self, port: &mut ClientPort, status: &mut u8) -> StatusCode {
        port.read_exception_status_for(self.id, self.unit, status)
    }

    pub fn diagnostics(
        &self,
        port: &mut ClientPort,
        sub_function: u16,
        data: &[u8],
        output: &mut Vec<u8>,
    ) -> StatusCode {
        port.diagnostics_for(self.id, self.unit, sub_function, data, output)
    }

    pub fn get_comm_event_counter(
        &self,
        port: &mut ClientPort,
        status: &mut u16,
        event_count: &mut u16,
    ) -> StatusCode {
        port.get_comm_event_counter_for(self.id, self.unit, status, event_count)
    }

    pub fn get_comm_event_log(
        &self,
        port: &mut ClientPort,
        status: &mut u16,
        event_count: &mut u16,
        message_count: &mut u16,
        events: &mut Vec<u8>,
    ) -> StatusCode {
        port.get_comm_event_log_for(self.id, self.unit, status, event_count, message_count, events)
    }

    pub fn write_multiple_coils(
        &self,
        port: &mut ClientPort,
        offset: u16,
        count: u16,
        values: &[u8],
    ) -> StatusCode {
        port.write_multiple_coils_for(self.id, self.unit, offset, count, values)
    }

    pub fn write_multiple_coils_as_bools(
        &self,
        port: &mut ClientPort,
        offset: u16,
        values: &[bool],
    ) -> StatusCode {
        port.write_multiple_coils_as_bools_for(self.id, self.unit, offset, values)
    }

    pub fn write_multiple_registers(
        &self,
        port: &mut ClientPort,
        offset: u16,
        values: &[u16],
    ) -> StatusCode {
        port.write_multiple_registers_for(self.id, self.unit, offset, values)
    }

    pub fn report_server_id(&self, port: &mut ClientPort, data: &mut Vec<u8>) -> StatusCode {
        port.report_server_id_for(self.id, self.unit, data)
    }

    pub fn mask_write_register(
        &self,
        port: &mut ClientPort,
        offset: u16,
        and_mask: u16,
        or_mask: u16,
    ) -> StatusCode {
        port.mask_write_register_for(self.id, self.unit, offset, and_mask, or_mask)
    }

    pub fn read_write_multiple_registers(
        &self,
        port: &mut ClientPort,
        read_offset: u16,
        read_count: u16,
        read_values: &mut [u16],
        write_offset: u16,
        write_values: &[u16],
    ) -> StatusCode {
        port.read_write_multiple_registers_for(
            self.id,
            self.unit,
            read_offset,
            read_count,
            read_values,
            write_offset,
            write_values,
        )
    }

    pub fn read_fifo_queue(
        &self,
        port: &mut ClientPort,
        fifo_address: u16,
        values: &mut Vec<u16>,
    ) -> StatusCode {
        port.read_fifo_queue_for(self.id, self.unit, fifo_address, values)
    }
}

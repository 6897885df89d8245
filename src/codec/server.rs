use crate::codec::request::Request;
use crate::device::Device;
use crate::status::StatusCode;
use crate::util::bits::num_bytes_for_bits;

/// Dispatch a parsed request into the device and build the success response
/// body.
///
/// `response` is cleared first and only filled when the device reports
/// `Good`; the returned status is the device's verbatim, so the caller can
/// synthesize the exception response (or suppress it) per policy. Safe to
/// call again with the same request when the device returned `Processing`.
pub(crate) fn execute<T: Device>(
    request: &Request,
    unit: u8,
    device: &mut T,
    response: &mut Vec<u8>,
) -> StatusCode {
    response.clear();
    match request {
        Request::ReadCoils { offset, count } => {
            let byte_count = num_bytes_for_bits(*count);
            let mut bits = vec![0u8; byte_count];
            let status = device.read_coils(unit, *offset, *count, &mut bits);
            if status.is_good() {
                response.push(byte_count as u8);
                response.extend_from_slice(&bits);
            }
            status
        }
        Request::ReadDiscreteInputs { offset, count } => {
            let byte_count = num_bytes_for_bits(*count);
            let mut bits = vec![0u8; byte_count];
            let status = device.read_discrete_inputs(unit, *offset, *count, &mut bits);
            if status.is_good() {
                response.push(byte_count as u8);
                response.extend_from_slice(&bits);
            }
            status
        }
        Request::ReadHoldingRegisters { offset, count } => {
            let mut values = vec![0u16; *count as usize];
            let status = device.read_holding_registers(unit, *offset, *count, &mut values);
            if status.is_good() {
                push_registers(response, &values);
            }
            status
        }
        Request::ReadInputRegisters { offset, count } => {
            let mut values = vec![0u16; *count as usize];
            let status = device.read_input_registers(unit, *offset, *count, &mut values);
            if status.is_good() {
                push_registers(response, &values);
            }
            status
        }
        Request::WriteSingleCoil { offset, value } => {
            let status = device.write_single_coil(unit, *offset, *value);
            if status.is_good() {
                request.serialize(response);
            }
            status
        }
        Request::WriteSingleRegister { offset, value } => {
            let status = device.write_single_register(unit, *offset, *value);
            if status.is_good() {
                request.serialize(response);
            }
            status
        }
        Request::ReadExceptionStatus => {
            let mut value = 0u8;
            let status = device.read_exception_status(unit, &mut value);
            if status.is_good() {
                response.push(value);
            }
            status
        }
        Request::Diagnostics { sub_function, data } => {
            let mut output = Vec::new();
            let status = device.diagnostics(unit, *sub_function, data, &mut output);
            if status.is_good() {
                response.extend_from_slice(&sub_function.to_be_bytes());
                response.extend_from_slice(&output);
            }
            status
        }
        Request::GetCommEventCounter => {
            let mut comm_status = 0u16;
            let mut event_count = 0u16;
            let status = device.get_comm_event_counter(unit, &mut comm_status, &mut event_count);
            if status.is_good() {
                response.extend_from_slice(&comm_status.to_be_bytes());
                response.extend_from_slice(&event_count.to_be_bytes());
            }
            status
        }
        Request::GetCommEventLog => {
            let mut comm_status = 0u16;
            let mut event_count = 0u16;
            let mut message_count = 0u16;
            let mut events = Vec::new();
            let status = device.get_comm_event_log(
                unit,
                &mut comm_status,
                &mut event_count,
                &mut message_count,
                &mut events,
            );
            if status.is_good() {
                response.push((events.len() + 6) as u8);
                response.extend_from_slice(&comm_status.to_be_bytes());
                response.extend_from_slice(&event_count.to_be_bytes());
                response.extend_from_slice(&message_count.to_be_bytes());
                response.extend_from_slice(&events);
            }
            status
        }
        Request::WriteMultipleCoils {
            offset,
            count,
            values,
        } => {
            let status = device.write_multiple_coils(unit, *offset, *count, values);
            if status.is_good() {
                response.extend_from_slice(&offset.to_be_bytes());
                response.extend_from_slice(&count.to_be_bytes());
            }
            status
        }
        Request::WriteMultipleRegisters { offset, values } => {
            let status = device.write_multiple_registers(unit, *offset, values);
            if status.is_good() {
                response.extend_from_slice(&offset.to_be_bytes());
                response.extend_from_slice(&(values.len() as u16).to_be_bytes());
            }
            status
        }
        Request::ReportServerId => {
            let mut data = Vec::new();
            let status = device.report_server_id(unit, &mut data);
            if status.is_good() {
                response.push(data.len() as u8);
                response.extend_from_slice(&data);
            }
            status
        }
        Request::MaskWriteRegister {
            offset,
            and_mask,
            or_mask,
        } => {
            let status = device.mask_write_register(unit, *offset, *and_mask, *or_mask);
            if status.is_good() {
                request.serialize(response);
            }
            status
        }
        Request::ReadWriteMultipleRegisters {
            read_offset,
            read_count,
            write_offset,
            write_values,
        } => {
            let mut read_values = vec![0u16; *read_count as usize];
            let status = device.read_write_multiple_registers(
                unit,
                *read_offset,
                *read_count,
                &mut read_values,
                *write_offset,
                write_values,
            );
            if status.is_good() {
                push_registers(response, &read_values);
            }
            status
        }
        Request::ReadFifoQueue { fifo_address } => {
            let mut values = Vec::new();
            let status = device.read_fifo_queue(unit, *fifo_address, &mut values);
            if status.is_good() {
                let byte_count = (values.len() * 2 + 2) as u16;
                response.extend_from_slice(&byte_count.to_be_bytes());
                response.extend_from_slice(&(values.len() as u16).to_be_bytes());
                for value in &values {
                    response.extend_from_slice(&value.to_be_bytes());
                }
            }
            status
        }
    }
}

fn push_registers(response: &mut Vec<u8>, values: &[u16]) {
    response.push((values.len() * 2) as u8);
    for value in values {
        response.extend_from_slice(&value.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        coils: Vec<u8>,
        holding: Vec<u16>,
    }

    impl Device for Fixed {
        fn read_coils(
            &mut self,
            _unit: u8,
            _offset: u16,
            _count: u16,
            values: &mut [u8],
        ) -> StatusCode {
            values.copy_from_slice(&self.coils[..values.len()]);
            StatusCode::Good
        }

        fn read_holding_registers(
            &mut self,
            _unit: u8,
            offset: u16,
            count: u16,
            values: &mut [u16],
        ) -> StatusCode {
            let start = offset as usize;
            values.copy_from_slice(&self.holding[start..start + count as usize]);
            StatusCode::Good
        }
    }

    #[test]
    fn read_coils_packs_device_bytes_verbatim() {
        let mut device = Fixed {
            coils: vec![0xAA, 0xAA],
            holding: vec![],
        };
        let request = Request::ReadCoils {
            offset: 0,
            count: 15,
        };
        let mut response = Vec::new();
        let status = execute(&request, 1, &mut device, &mut response);
        assert!(status.is_good());
        assert_eq!(response, [0x02, 0xAA, 0xAA]);
    }

    #[test]
    fn read_holding_registers_marshals_big_endian() {
        let mut device = Fixed {
            coils: vec![],
            holding: vec![0x1234, 0x5678],
        };
        let request = Request::ReadHoldingRegisters {
            offset: 0,
            count: 2,
        };
        let mut response = Vec::new();
        let status = execute(&request, 1, &mut device, &mut response);
        assert!(status.is_good());
        assert_eq!(response, [0x04, 0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn unimplemented_function_defaults_to_illegal_function() {
        let mut device = Fixed {
            coils: vec![],
            holding: vec![],
        };
        let request = Request::ReadExceptionStatus;
        let mut response = Vec::new();
        let status = execute(&request, 1, &mut device, &mut response);
        assert_eq!(status, StatusCode::BadIllegalFunction);
        assert!(response.is_empty());
    }
}

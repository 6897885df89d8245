use scursor::ReadCursor;

use crate::constants::{function, limits};
use crate::types::{coil_from_u16, coil_to_u16};
use crate::util::bits::num_bytes_for_bits;

/// Why a request body was rejected before reaching the device.
///
/// The framing check always runs first: a body whose sizes are inconsistent
/// is [`NotCorrect`](ParseError::NotCorrect) even when a quantity in it also
/// exceeds its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParseError {
    /// Malformed body; the server discards the frame without a response
    NotCorrect,
    /// A quantity exceeds its bound; the server answers exception 0x03
    OutOfRange,
    /// The function code is not in the catalogue; the server answers
    /// exception 0x01
    UnknownFunction,
}

type Result<T> = std::result::Result<T, ParseError>;

fn malformed<E>(_: E) -> ParseError {
    ParseError::NotCorrect
}

/// A decoded request, one variant per function code.
///
/// [`parse`](Request::parse) is the server-side decoder (with the
/// per-function size and quantity checks of the wire tables);
/// [`serialize`](Request::serialize) is the client-side encoder. The two are
/// exact inverses for every valid request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Request {
    ReadCoils {
        offset: u16,
        count: u16,
    },
    ReadDiscreteInputs {
        offset: u16,
        count: u16,
    },
    ReadHoldingRegisters {
        offset: u16,
        count: u16,
    },
    ReadInputRegisters {
        offset: u16,
        count: u16,
    },
    WriteSingleCoil {
        offset: u16,
        value: bool,
    },
    WriteSingleRegister {
        offset: u16,
        value: u16,
    },
    ReadExceptionStatus,
    Diagnostics {
        sub_function: u16,
        data: Vec<u8>,
    },
    GetCommEventCounter,
    GetCommEventLog,
    WriteMultipleCoils {
        offset: u16,
        count: u16,
        values: Vec<u8>,
    },
    WriteMultipleRegisters {
        offset: u16,
        values: Vec<u16>,
    },
    ReportServerId,
    MaskWriteRegister {
        offset: u16,
        and_mask: u16,
        or_mask: u16,
    },
    ReadWriteMultipleRegisters {
        read_offset: u16,
        read_count: u16,
        write_offset: u16,
        write_values: Vec<u16>,
    },
    ReadFifoQueue {
        fifo_address: u16,
    },
}

impl Request {
    pub(crate) fn function(&self) -> u8 {
        match self {
            Request::ReadCoils { .. } => function::READ_COILS,
            Request::ReadDiscreteInputs { .. } => function::READ_DISCRETE_INPUTS,
            Request::ReadHoldingRegisters { .. } => function::READ_HOLDING_REGISTERS,
            Request::ReadInputRegisters { .. } => function::READ_INPUT_REGISTERS,
            Request::WriteSingleCoil { .. } => function::WRITE_SINGLE_COIL,
            Request::WriteSingleRegister { .. } => function::WRITE_SINGLE_REGISTER,
            Request::ReadExceptionStatus => function::READ_EXCEPTION_STATUS,
            Request::Diagnostics { .. } => function::DIAGNOSTICS,
            Request::GetCommEventCounter => function::GET_COMM_EVENT_COUNTER,
            Request::GetCommEventLog => function::GET_COMM_EVENT_LOG,
            Request::WriteMultipleCoils { .. } => function::WRITE_MULTIPLE_COILS,
            Request::WriteMultipleRegisters { .. } => function::WRITE_MULTIPLE_REGISTERS,
            Request::ReportServerId => function::REPORT_SERVER_ID,
            Request::MaskWriteRegister { .. } => function::MASK_WRITE_REGISTER,
            Request::ReadWriteMultipleRegisters { .. } => function::READ_WRITE_MULTIPLE_REGISTERS,
            Request::ReadFifoQueue { .. } => function::READ_FIFO_QUEUE,
        }
    }

    /// Decode and validate one request body
    pub(crate) fn parse(function_code: u8, body: &[u8]) -> Result<Request> {
        let mut cursor = ReadCursor::new(body);
        match function_code {
            function::READ_COILS | function::READ_DISCRETE_INPUTS => {
                let offset = cursor.read_u16_be().map_err(malformed)?;
                let count = cursor.read_u16_be().map_err(malformed)?;
                cursor.expect_empty().map_err(malformed)?;
                if count == 0 || count > limits::MAX_DISCRETS {
                    return Err(ParseError::OutOfRange);
                }
                Ok(if function_code == function::READ_COILS {
                    Request::ReadCoils { offset, count }
                } else {
                    Request::ReadDiscreteInputs { offset, count }
                })
            }
            function::READ_HOLDING_REGISTERS | function::READ_INPUT_REGISTERS => {
                let offset = cursor.read_u16_be().map_err(malformed)?;
                let count = cursor.read_u16_be().map_err(malformed)?;
                cursor.expect_empty().map_err(malformed)?;
                if count == 0 || count > limits::MAX_REGISTERS {
                    return Err(ParseError::OutOfRange);
                }
                Ok(if function_code == function::READ_HOLDING_REGISTERS {
                    Request::ReadHoldingRegisters { offset, count }
                } else {
                    Request::ReadInputRegisters { offset, count }
                })
            }
            function::WRITE_SINGLE_COIL => {
                let offset = cursor.read_u16_be().map_err(malformed)?;
                let raw = cursor.read_u16_be().map_err(malformed)?;
                cursor.expect_empty().map_err(malformed)?;
                let value = coil_from_u16(raw).ok_or(ParseError::NotCorrect)?;
                Ok(Request::WriteSingleCoil { offset, value })
            }
            function::WRITE_SINGLE_REGISTER => {
                let offset = cursor.read_u16_be().map_err(malformed)?;
                let value = cursor.read_u16_be().map_err(malformed)?;
                cursor.expect_empty().map_err(malformed)?;
                Ok(Request::WriteSingleRegister { offset, value })
            }
            function::READ_EXCEPTION_STATUS => {
                cursor.expect_empty().map_err(malformed)?;
                Ok(Request::ReadExceptionStatus)
            }
            function::DIAGNOSTICS => {
                let sub_function = cursor.read_u16_be().map_err(malformed)?;
                let data = cursor.read_bytes(cursor.remaining()).map_err(malformed)?;
                Ok(Request::Diagnostics {
                    sub_function,
                    data: data.to_vec(),
                })
            }
            function::GET_COMM_EVENT_COUNTER => {
                cursor.expect_empty().map_err(malformed)?;
                Ok(Request::GetCommEventCounter)
            }
            function::GET_COMM_EVENT_LOG => {
                cursor.expect_empty().map_err(malformed)?;
                Ok(Request::GetCommEventLog)
            }
            function::WRITE_MULTIPLE_COILS => {
                let offset = cursor.read_u16_be().map_err(malformed)?;
                let count = cursor.read_u16_be().map_err(malformed)?;
                let byte_count = cursor.read_u8().map_err(malformed)?;
                let values = cursor.read_bytes(byte_count as usize).map_err(malformed)?;
                cursor.expect_empty().map_err(malformed)?;
                if byte_count as usize != num_bytes_for_bits(count) {
                    return Err(ParseError::NotCorrect);
                }
                if count == 0 || count > limits::MAX_DISCRETS {
                    return Err(ParseError::OutOfRange);
                }
                Ok(Request::WriteMultipleCoils {
                    offset,
                    count,
                    values: values.to_vec(),
                })
            }
            function::WRITE_MULTIPLE_REGISTERS => {
                let offset = cursor.read_u16_be().map_err(malformed)?;
                let count = cursor.read_u16_be().map_err(malformed)?;
                let byte_count = cursor.read_u8().map_err(malformed)?;
                if byte_count as usize != count as usize * 2 {
                    return Err(ParseError::NotCorrect);
                }
                if cursor.remaining() != byte_count as usize {
                    return Err(ParseError::NotCorrect);
                }
                if count == 0 || count > limits::MAX_REGISTERS {
                    return Err(ParseError::OutOfRange);
                }
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(cursor.read_u16_be().map_err(malformed)?);
                }
                Ok(Request::WriteMultipleRegisters { offset, values })
            }
            function::REPORT_SERVER_ID => {
                cursor.expect_empty().map_err(malformed)?;
                Ok(Request::ReportServerId)
            }
            function::MASK_WRITE_REGISTER => {
                let offset = cursor.read_u16_be().map_err(malformed)?;
                let and_mask = cursor.read_u16_be().map_err(malformed)?;
                let or_mask = cursor.read_u16_be().map_err(malformed)?;
                cursor.expect_empty().map_err(malformed)?;
                Ok(Request::MaskWriteRegister {
                    offset,
                    and_mask,
                    or_mask,
                })
            }
            function::READ_WRITE_MULTIPLE_REGISTERS => {
                let read_offset = cursor.read_u16_be().map_err(malformed)?;
                let read_count = cursor.read_u16_be().map_err(malformed)?;
                let write_offset = cursor.read_u16_be().map_err(malformed)?;
                let write_count = cursor.read_u16_be().map_err(malformed)?;
                let byte_count = cursor.read_u8().map_err(malformed)?;
                if byte_count as usize != write_count as usize * 2 {
                    return Err(ParseError::NotCorrect);
                }
                if cursor.remaining() != byte_count as usize {
                    return Err(ParseError::NotCorrect);
                }
                if read_count == 0 || read_count > limits::MAX_RW_REGISTERS {
                    return Err(ParseError::OutOfRange);
                }
                if write_count == 0 || write_count > limits::MAX_RW_REGISTERS {
                    return Err(ParseError::OutOfRange);
                }
                let mut write_values = Vec::with_capacity(write_count as usize);
                for _ in 0..write_count {
                    write_values.push(cursor.read_u16_be().map_err(malformed)?);
                }
                Ok(Request::ReadWriteMultipleRegisters {
                    read_offset,
                    read_count,
                    write_offset,
                    write_values,
                })
            }
            function::READ_FIFO_QUEUE => {
                let fifo_address = cursor.read_u16_be().map_err(malformed)?;
                cursor.expect_empty().map_err(malformed)?;
                Ok(Request::ReadFifoQueue { fifo_address })
            }
            _ => Err(ParseError::UnknownFunction),
        }
    }

    /// Encode the request body, exactly inverse to [`parse`](Request::parse)
    pub(crate) fn serialize(&self, out: &mut Vec<u8>) {
        match self {
            Request::ReadCoils { offset, count }
            | Request::ReadDiscreteInputs { offset, count }
            | Request::ReadHoldingRegisters { offset, count }
            | Request::ReadInputRegisters { offset, count } => {
                out.extend_from_slice(&offset.to_be_bytes());
                out.extend_from_slice(&count.to_be_bytes());
            }
            Request::WriteSingleCoil { offset, value } => {
                out.extend_from_slice(&offset.to_be_bytes());
                out.extend_from_slice(&coil_to_u16(*value).to_be_bytes());
            }
            Request::WriteSingleRegister { offset, value } => {
                out.extend_from_slice(&offset.to_be_bytes());
                out.extend_from_slice(&value.to_be_bytes());
            }
            Request::ReadExceptionStatus
            | Request::GetCommEventCounter
            | Request::GetCommEventLog
            | Request::ReportServerId => {}
            Request::Diagnostics { sub_function, data } => {
                out.extend_from_slice(&sub_function.to_be_bytes());
                out.extend_from_slice(data);
            }
            Request::WriteMultipleCoils {
                offset,
                count,
                values,
            } => {
                out.extend_from_slice(&offset.to_be_bytes());
                out.extend_from_slice(&count.to_be_bytes());
                out.push(num_bytes_for_bits(*count) as u8);
                out.extend_from_slice(values);
            }
            Request::WriteMultipleRegisters { offset, values } => {
                out.extend_from_slice(&offset.to_be_bytes());
                out.extend_from_slice(&(values.len() as u16).to_be_bytes());
                out.push((values.len() * 2) as u8);
                for value in values {
                    out.extend_from_slice(&value.to_be_bytes());
                }
            }
            Request::MaskWriteRegister {
                offset,
                and_mask,
                or_mask,
            } => {
                out.extend_from_slice(&offset.to_be_bytes());
                out.extend_from_slice(&and_mask.to_be_bytes());
                out.extend_from_slice(&or_mask.to_be_bytes());
            }
            Request::ReadWriteMultipleRegisters {
                read_offset,
                read_count,
                write_offset,
                write_values,
            } => {
                out.extend_from_slice(&read_offset.to_be_bytes());
                out.extend_from_slice(&read_count.to_be_bytes());
                out.extend_from_slice(&write_offset.to_be_bytes());
                out.extend_from_slice(&(write_values.len() as u16).to_be_bytes());
                out.push((write_values.len() * 2) as u8);
                for value in write_values {
                    out.extend_from_slice(&value.to_be_bytes());
                }
            }
            Request::ReadFifoQueue { fifo_address } => {
                out.extend_from_slice(&fifo_address.to_be_bytes());
            }
        }
    }
}

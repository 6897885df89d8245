//! Client-side decoding of success response bodies.
//!
//! Every decoder returns [`Good`](StatusCode::Good) or
//! [`BadNotCorrectResponse`](StatusCode::BadNotCorrectResponse); the caller
//! has already matched the function byte and routed exception responses
//! elsewhere. Echo fields are verified against the outstanding request where
//! the protocol requires it.

use scursor::ReadCursor;

use crate::status::StatusCode;
use crate::util::bits::num_bytes_for_bits;

const NOT_CORRECT: StatusCode = StatusCode::BadNotCorrectResponse;

/// fc 0x01 / 0x02: byte count then packed bits
pub(crate) fn read_bits(body: &[u8], count: u16, values: &mut [u8]) -> StatusCode {
    let expected = num_bytes_for_bits(count);
    let mut cursor = ReadCursor::new(body);
    let byte_count = match cursor.read_u8() {
        Ok(x) => x as usize,
        Err(_) => return NOT_CORRECT,
    };
    if byte_count != expected || cursor.remaining() != byte_count {
        return NOT_CORRECT;
    }
    match cursor.read_bytes(byte_count) {
        Ok(bits) => {
            values[..byte_count].copy_from_slice(bits);
            StatusCode::Good
        }
        Err(_) => NOT_CORRECT,
    }
}

/// fc 0x03 / 0x04, and the read half of fc 0x17: byte count then registers
pub(crate) fn read_registers(body: &[u8], count: u16, values: &mut [u16]) -> StatusCode {
    let mut cursor = ReadCursor::new(body);
    let byte_count = match cursor.read_u8() {
        Ok(x) => x as usize,
        Err(_) => return NOT_CORRECT,
    };
    if byte_count != count as usize * 2 || cursor.remaining() != byte_count {
        return NOT_CORRECT;
    }
    for value in values.iter_mut().take(count as usize) {
        match cursor.read_u16_be() {
            Ok(x) => *value = x,
            Err(_) => return NOT_CORRECT,
        }
    }
    StatusCode::Good
}

/// fc 0x05 / 0x06: the request body echoed back
pub(crate) fn echo_pair(body: &[u8], offset: u16, value: u16) -> StatusCode {
    let mut cursor = ReadCursor::new(body);
    match (
        cursor.read_u16_be(),
        cursor.read_u16_be(),
        cursor.expect_empty(),
    ) {
        (Ok(o), Ok(v), Ok(())) if o == offset && v == value => StatusCode::Good,
        _ => NOT_CORRECT,
    }
}

/// fc 0x07: one status byte
pub(crate) fn exception_status(body: &[u8], status: &mut u8) -> StatusCode {
    match body {
        [value] => {
            *status = *value;
            StatusCode::Good
        }
        _ => NOT_CORRECT,
    }
}

/// fc 0x08: echoed sub-function then answer data
pub(crate) fn diagnostics(body: &[u8], sub_function: u16, output: &mut Vec<u8>) -> StatusCode {
    let mut cursor = ReadCursor::new(body);
    match cursor.read_u16_be() {
        Ok(echoed) if echoed == sub_function => {}
        _ => return NOT_CORRECT,
    }
    match cursor.read_bytes(cursor.remaining()) {
        Ok(data) => {
            output.extend_from_slice(data);
            StatusCode::Good
        }
        Err(_) => NOT_CORRECT,
    }
}

/// fc 0x0B: status then event count
pub(crate) fn comm_event_counter(body: &[u8], status: &mut u16, event_count: &mut u16) -> StatusCode {
    let mut cursor = ReadCursor::new(body);
    match (
        cursor.read_u16_be(),
        cursor.read_u16_be(),
        cursor.expect_empty(),
    ) {
        (Ok(s), Ok(c), Ok(())) => {
            *status = s;
            *event_count = c;
            StatusCode::Good
        }
        _ => NOT_CORRECT,
    }
}

/// fc 0x0C: byte count, status, event count, message count, event bytes
pub(crate) fn comm_event_log(
    body: &[u8],
    status: &mut u16,
    event_count: &mut u16,
    message_count: &mut u16,
    events: &mut Vec<u8>,
) -> StatusCode {
    let mut cursor = ReadCursor::new(body);
    let byte_count = match cursor.read_u8() {
        Ok(x) => x as usize,
        Err(_) => return NOT_CORRECT,
    };
    if byte_count < 6 || cursor.remaining() != byte_count {
        return NOT_CORRECT;
    }
    let fields = (
        cursor.read_u16_be(),
        cursor.read_u16_be(),
        cursor.read_u16_be(),
    );
    match fields {
        (Ok(s), Ok(e), Ok(m)) => {
            *status = s;
            *event_count = e;
            *message_count = m;
        }
        _ => return NOT_CORRECT,
    }
    match cursor.read_bytes(byte_count - 6) {
        Ok(data) => {
            events.extend_from_slice(data);
            StatusCode::Good
        }
        Err(_) => NOT_CORRECT,
    }
}

/// fc 0x0F / 0x10: echoed offset and count
pub(crate) fn write_multiple_echo(body: &[u8], offset: u16, count: u16) -> StatusCode {
    echo_pair(body, offset, count)
}

/// fc 0x11: byte count then identification data
pub(crate) fn server_id(body: &[u8], data: &mut Vec<u8>) -> StatusCode {
    let mut cursor = ReadCursor::new(body);
    let byte_count = match cursor.read_u8() {
        Ok(x) => x as usize,
        Err(_) => return NOT_CORRECT,
    };
    if cursor.remaining() != byte_count {
        return NOT_CORRECT;
    }
    match cursor.read_bytes(byte_count) {
        Ok(bytes) => {
            data.extend_from_slice(bytes);
            StatusCode::Good
        }
        Err(_) => NOT_CORRECT,
    }
}

/// fc 0x16: the request body echoed back
pub(crate) fn mask_write_echo(body: &[u8], offset: u16, and_mask: u16, or_mask: u16) -> StatusCode {
    let mut cursor = ReadCursor::new(body);
    let fields = (
        cursor.read_u16_be(),
        cursor.read_u16_be(),
        cursor.read_u16_be(),
        cursor.expect_empty(),
    );
    match fields {
        (Ok(o), Ok(a), Ok(r), Ok(()))
            if o == offset && a == and_mask && r == or_mask =>
        {
            StatusCode::Good
        }
        _ => NOT_CORRECT,
    }
}

/// fc 0x18: u16 byte count, u16 fifo count, registers
pub(crate) fn fifo_queue(body: &[u8], values: &mut Vec<u16>) -> StatusCode {
    let mut cursor = ReadCursor::new(body);
    let byte_count = match cursor.read_u16_be() {
        Ok(x) => x as usize,
        Err(_) => return NOT_CORRECT,
    };
    let count = match cursor.read_u16_be() {
        Ok(x) => x as usize,
        Err(_) => return NOT_CORRECT,
    };
    if byte_count != count * 2 + 2 || cursor.remaining() != count * 2 {
        return NOT_CORRECT;
    }
    for _ in 0..count {
        match cursor.read_u16_be() {
            Ok(x) => values.push(x),
            Err(_) => return NOT_CORRECT,
        }
    }
    StatusCode::Good
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_bits_checks_byte_count_against_request() {
        let mut values = [0u8; 2];
        assert!(read_bits(&[0x02, 0xAA, 0xAA], 15, &mut values).is_good());
        assert_eq!(values, [0xAA, 0xAA]);
        // byte count disagrees with the requested quantity
        assert_eq!(read_bits(&[0x01, 0xAA], 15, &mut values), NOT_CORRECT);
        // byte count disagrees with the actual payload
        assert_eq!(read_bits(&[0x02, 0xAA], 15, &mut values), NOT_CORRECT);
    }

    #[test]
    fn read_registers_marshals_big_endian() {
        let mut values = [0u16; 2];
        let body = [0x04, 0x00, 0x0A, 0x00, 0x14];
        assert!(read_registers(&body, 2, &mut values).is_good());
        assert_eq!(values, [0x000A, 0x0014]);
        assert_eq!(read_registers(&body, 3, &mut values), NOT_CORRECT);
    }

    #[test]
    fn echo_checks_fire_on_mismatch() {
        assert!(echo_pair(&[0x00, 0x0A, 0xFF, 0x00], 0x000A, 0xFF00).is_good());
        assert_eq!(echo_pair(&[0x00, 0x0B, 0xFF, 0x00], 0x000A, 0xFF00), NOT_CORRECT);
        assert!(mask_write_echo(&[0x00, 0x04, 0xF2, 0xFF, 0x00, 0x25], 4, 0xF2FF, 0x0025).is_good());
        assert_eq!(
            mask_write_echo(&[0x00, 0x04, 0xF2, 0xFF, 0x00, 0x26], 4, 0xF2FF, 0x0025),
            NOT_CORRECT
        );
    }

    #[test]
    fn fifo_queue_validates_both_counts() {
        let mut values = Vec::new();
        let body = [0x00, 0x08, 0x00, 0x03, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC];
        assert!(fifo_queue(&body, &mut values).is_good());
        assert_eq!(values, [0x1234, 0x5678, 0x9ABC]);

        let bad = [0x00, 0x07, 0x00, 0x03, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC];
        assert_eq!(fifo_queue(&bad, &mut Vec::new()), NOT_CORRECT);
    }

    #[test]
    fn comm_event_log_requires_minimum_length() {
        let mut status = 0;
        let mut events = 0;
        let mut messages = 0;
        let mut log = Vec::new();
        let body = [0x08, 0x00, 0x00, 0x01, 0x08, 0x01, 0x21, 0x20, 0x00];
        assert!(comm_event_log(&body, &mut status, &mut events, &mut messages, &mut log).is_good());
        assert_eq!((status, events, messages), (0x0000, 0x0108, 0x0121));
        assert_eq!(log, [0x20, 0x00]);

        let short = [0x05, 0x00, 0x00, 0x01, 0x08, 0x01];
        assert_eq!(
            comm_event_log(&short, &mut status, &mut events, &mut messages, &mut Vec::new()),
            NOT_CORRECT
        );
    }
}

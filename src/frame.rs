/// Maximum size of a PDU (function byte + body)
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum size of a function-specific body
pub const MAX_BODY_SIZE: usize = MAX_PDU_SIZE - 1;

/// Minimum capacity of a port's frame buffers: unit + PDU + the largest
/// transport envelope the engine cares about
pub const FRAME_BUFFER_SIZE: usize = 260;

/// Owned (unit, function, body) triple used to move a completed inbound
/// frame out of a port without aliasing its internal buffers.
#[derive(Clone)]
pub struct Frame {
    /// Logical device the frame addresses; zero is broadcast
    pub unit: u8,
    /// Function code; bit 0x80 marks an exception response
    pub function: u8,
    length: usize,
    body: [u8; MAX_BODY_SIZE],
}

impl Frame {
    pub fn new() -> Frame {
        Frame {
            unit: 0,
            function: 0,
            length: 0,
            body: [0; MAX_BODY_SIZE],
        }
    }

    /// Copy a body into the frame. Returns false when `src` exceeds the
    /// maximum body size, leaving the frame unchanged.
    pub fn set_body(&mut self, src: &[u8]) -> bool {
        if src.len() > self.body.len() {
            return false;
        }
        self.body[0..src.len()].copy_from_slice(src);
        self.length = src.len();
        true
    }

    /// The function-specific bytes after the (unit, function) header
    pub fn body(&self) -> &[u8] {
        &self.body[0..self.length]
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::new()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("unit", &self.unit)
            .field("function", &self.function)
            .field("body", &self.body())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_body() {
        let mut frame = Frame::new();
        assert!(frame.set_body(&[0; MAX_BODY_SIZE]));
        assert_eq!(frame.body().len(), MAX_BODY_SIZE);
        assert!(!frame.set_body(&[0; MAX_BODY_SIZE + 1]));
        assert_eq!(frame.body().len(), MAX_BODY_SIZE);
    }
}

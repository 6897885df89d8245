/// u16 encodings of a coil state used by write single coil
pub mod coil {
    /// u16 representation of COIL == ON when performing write single coil
    pub const ON: u16 = 0xFF00;
    /// u16 representation of COIL == OFF when performing write single coil
    pub const OFF: u16 = 0x0000;
}

/// quantity limits enforced before dispatching to the device
pub mod limits {
    /// Maximum count allowed in a read coils / read discrete inputs request
    /// and in a write multiple coils request
    pub const MAX_DISCRETS: u16 = 2000;
    /// Maximum count allowed in a read holding/input registers request
    /// and in a write multiple registers request
    pub const MAX_REGISTERS: u16 = 125;
    /// Maximum read and write counts in a read/write multiple registers request
    pub const MAX_RW_REGISTERS: u16 = 123;
}

/// public function codes understood by the engine
pub mod function {
    /// Read Coils (0x01)
    pub const READ_COILS: u8 = 0x01;
    /// Read Discrete Inputs (0x02)
    pub const READ_DISCRETE_INPUTS: u8 = 0x02;
    /// Read Holding Registers (0x03)
    pub const READ_HOLDING_REGISTERS: u8 = 0x03;
    /// Read Input Registers (0x04)
    pub const READ_INPUT_REGISTERS: u8 = 0x04;
    /// Write Single Coil (0x05)
    pub const WRITE_SINGLE_COIL: u8 = 0x05;
    /// Write Single Register (0x06)
    pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
    /// Read Exception Status (0x07)
    pub const READ_EXCEPTION_STATUS: u8 = 0x07;
    /// Diagnostics (0x08)
    pub const DIAGNOSTICS: u8 = 0x08;
    /// Get Comm Event Counter (0x0B)
    pub const GET_COMM_EVENT_COUNTER: u8 = 0x0B;
    /// Get Comm Event Log (0x0C)
    pub const GET_COMM_EVENT_LOG: u8 = 0x0C;
    /// Write Multiple Coils (0x0F)
    pub const WRITE_MULTIPLE_COILS: u8 = 0x0F;
    /// Write Multiple Registers (0x10)
    pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
    /// Report Server ID (0x11)
    pub const REPORT_SERVER_ID: u8 = 0x11;
    /// Mask Write Register (0x16)
    pub const MASK_WRITE_REGISTER: u8 = 0x16;
    /// Read/Write Multiple Registers (0x17)
    pub const READ_WRITE_MULTIPLE_REGISTERS: u8 = 0x17;
    /// Read FIFO Queue (0x18)
    pub const READ_FIFO_QUEUE: u8 = 0x18;

    /// Bit set on the function byte of an exception response
    pub const EXCEPTION_BIT: u8 = 0x80;
}

/// 1-byte sub-status codes carried by exception responses
pub mod exceptions {
    pub const ILLEGAL_FUNCTION: u8 = 0x01;
    pub const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
    pub const ILLEGAL_DATA_VALUE: u8 = 0x03;
    pub const SERVER_DEVICE_FAILURE: u8 = 0x04;
    pub const ACKNOWLEDGE: u8 = 0x05;
    pub const SERVER_DEVICE_BUSY: u8 = 0x06;
    pub const NEGATIVE_ACKNOWLEDGE: u8 = 0x07;
    pub const MEMORY_PARITY_ERROR: u8 = 0x08;
    pub const GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;
    pub const GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND: u8 = 0x0B;
}

/// TCP-specific defaults
pub mod tcp {
    /// Standard Modbus TCP port
    pub const DEFAULT_PORT: u16 = 502;
    /// Default connection timeout in milliseconds
    pub const DEFAULT_TIMEOUT_MS: u32 = 3000;
    /// Default limit on concurrently served connections
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
}

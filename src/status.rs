use crate::exception::ExceptionCode;

/// Universal result of every engine operation.
///
/// The space is partitioned into three classes: [`Good`](StatusCode::Good),
/// [`Processing`](StatusCode::Processing) (the operation has not completed
/// yet and the same call must be repeated to make progress), and the `Bad*`
/// family. `Bad*` itself splits into protocol exceptions (1:1 with wire
/// exception codes), transport errors raised by ports, and framing errors
/// raised by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum StatusCode {
    /// The operation completed successfully
    Good,
    /// The operation has not completed yet; repeat the same call to make progress
    Processing,
    /// The function code received in the query is not an allowable action for the server
    BadIllegalFunction,
    /// The data address received in the query is not an allowable address for the server
    BadIllegalDataAddress,
    /// A value contained in the request is not an allowable value for the server
    BadIllegalDataValue,
    /// An unrecoverable error occurred while the server was attempting to perform the
    /// requested action
    BadServerFailure,
    /// The server has accepted the request and is processing it
    BadAcknowledge,
    /// The server is engaged in processing a long-duration command, try again later
    BadServerBusy,
    /// The server cannot perform the program function received in the query
    BadNegativeAcknowledge,
    /// The server attempted to read a record file, but detected a parity error in the memory
    BadMemoryParityError,
    /// The gateway was unable to allocate an internal communication path for the request
    BadGatewayPathUnavailable,
    /// No response was obtained from the target device behind the gateway
    BadGatewayTargetNoResponse,
    /// The port is not open
    BadPortClosed,
    /// Writing to the TCP socket failed
    BadTcpWrite,
    /// The TCP peer disconnected
    BadTcpDisconnect,
    /// Opening the serial line failed
    BadSerialOpen,
    /// Writing to the serial line timed out
    BadSerialWriteTimeout,
    /// Reading from the serial line timed out
    BadSerialReadTimeout,
    /// The frame checksum did not verify
    BadCrc,
    /// The outbound frame does not fit in the port's write buffer
    BadWriteBufferOverflow,
    /// The inbound request is malformed and is discarded without a response
    BadNotCorrectRequest,
    /// The inbound response does not match the outstanding request
    BadNotCorrectResponse,
    /// Unspecific failure
    Bad,
}

impl StatusCode {
    /// The operation completed successfully
    pub fn is_good(self) -> bool {
        self == StatusCode::Good
    }

    /// The operation has not completed yet and may be retried with the same arguments
    pub fn is_processing(self) -> bool {
        self == StatusCode::Processing
    }

    /// Any outcome that is neither [`Good`](StatusCode::Good) nor
    /// [`Processing`](StatusCode::Processing)
    pub fn is_bad(self) -> bool {
        !self.is_good() && !self.is_processing()
    }

    /// The wire exception this status maps to, if it belongs to the
    /// protocol-exception band
    pub fn exception(self) -> Option<ExceptionCode> {
        match self {
            StatusCode::BadIllegalFunction => Some(ExceptionCode::IllegalFunction),
            StatusCode::BadIllegalDataAddress => Some(ExceptionCode::IllegalDataAddress),
            StatusCode::BadIllegalDataValue => Some(ExceptionCode::IllegalDataValue),
            StatusCode::BadServerFailure => Some(ExceptionCode::ServerDeviceFailure),
            StatusCode::BadAcknowledge => Some(ExceptionCode::Acknowledge),
            StatusCode::BadServerBusy => Some(ExceptionCode::ServerDeviceBusy),
            StatusCode::BadNegativeAcknowledge => Some(ExceptionCode::NegativeAcknowledge),
            StatusCode::BadMemoryParityError => Some(ExceptionCode::MemoryParityError),
            StatusCode::BadGatewayPathUnavailable => Some(ExceptionCode::GatewayPathUnavailable),
            StatusCode::BadGatewayTargetNoResponse => {
                Some(ExceptionCode::GatewayTargetDeviceFailedToRespond)
            }
            _ => None,
        }
    }
}

impl From<ExceptionCode> for StatusCode {
    fn from(ex: ExceptionCode) -> Self {
        match ex {
            ExceptionCode::IllegalFunction => StatusCode::BadIllegalFunction,
            ExceptionCode::IllegalDataAddress => StatusCode::BadIllegalDataAddress,
            ExceptionCode::IllegalDataValue => StatusCode::BadIllegalDataValue,
            ExceptionCode::ServerDeviceFailure => StatusCode::BadServerFailure,
            ExceptionCode::Acknowledge => StatusCode::BadAcknowledge,
            ExceptionCode::ServerDeviceBusy => StatusCode::BadServerBusy,
            ExceptionCode::NegativeAcknowledge => StatusCode::BadNegativeAcknowledge,
            ExceptionCode::MemoryParityError => StatusCode::BadMemoryParityError,
            ExceptionCode::GatewayPathUnavailable => StatusCode::BadGatewayPathUnavailable,
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                StatusCode::BadGatewayTargetNoResponse
            }
            ExceptionCode::Unknown(_) => StatusCode::Bad,
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            StatusCode::Good => f.write_str("good"),
            StatusCode::Processing => f.write_str("operation in progress"),
            StatusCode::BadPortClosed => f.write_str("port is not open"),
            StatusCode::BadTcpWrite => f.write_str("writing to the TCP socket failed"),
            StatusCode::BadTcpDisconnect => f.write_str("TCP peer disconnected"),
            StatusCode::BadSerialOpen => f.write_str("opening the serial line failed"),
            StatusCode::BadSerialWriteTimeout => f.write_str("serial write timed out"),
            StatusCode::BadSerialReadTimeout => f.write_str("serial read timed out"),
            StatusCode::BadCrc => f.write_str("frame checksum did not verify"),
            StatusCode::BadWriteBufferOverflow => {
                f.write_str("frame does not fit in the write buffer")
            }
            StatusCode::BadNotCorrectRequest => f.write_str("malformed request"),
            StatusCode::BadNotCorrectResponse => {
                f.write_str("response does not match the outstanding request")
            }
            StatusCode::Bad => f.write_str("unspecified failure"),
            _ => match self.exception() {
                Some(ex) => write!(f, "{ex}"),
                None => f.write_str("unspecified failure"),
            },
        }
    }
}

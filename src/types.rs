use crate::constants::coil;

/// Framing family a port implements; higher layers use it to pick defaults
/// but never interpret frames themselves
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum ProtocolType {
    /// Binary serial framing with CRC-16
    Rtu,
    /// ASCII serial framing with LRC
    Ascii,
    /// TCP framing with the MBAP header
    Tcp,
}

impl std::fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ProtocolType::Rtu => f.write_str("RTU"),
            ProtocolType::Ascii => f.write_str("ASCII"),
            ProtocolType::Tcp => f.write_str("TCP"),
        }
    }
}

pub(crate) fn coil_to_u16(value: bool) -> u16 {
    if value {
        coil::ON
    } else {
        coil::OFF
    }
}

pub(crate) fn coil_from_u16(value: u16) -> Option<bool> {
    match value {
        coil::ON => Some(true),
        coil::OFF => Some(false),
        _ => None,
    }
}

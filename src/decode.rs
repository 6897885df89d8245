/// Controls how much of each transmitted and received PDU is rendered into
/// log events at the INFO level
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum PduDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the unit id and the function code only
    FunctionCode,
    /// Decode the unit id, the function code, and the raw body as hexadecimal
    DataValues,
}

impl PduDecodeLevel {
    pub(crate) fn enabled(self) -> bool {
        match self {
            PduDecodeLevel::Nothing => false,
            PduDecodeLevel::FunctionCode => true,
            PduDecodeLevel::DataValues => true,
        }
    }

    pub(crate) fn data_values(self) -> bool {
        match self {
            PduDecodeLevel::Nothing => false,
            PduDecodeLevel::FunctionCode => false,
            PduDecodeLevel::DataValues => true,
        }
    }
}

/// Renders a PDU payload as space-separated hex when the decode level asks
/// for data values, and elides it otherwise.
pub(crate) struct PayloadDisplay<'a> {
    bytes: &'a [u8],
    level: PduDecodeLevel,
}

impl<'a> PayloadDisplay<'a> {
    pub(crate) fn new(bytes: &'a [u8], level: PduDecodeLevel) -> Self {
        Self { bytes, level }
    }
}

impl std::fmt::Display for PayloadDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if !self.level.data_values() {
            return write!(f, "({} bytes)", self.bytes.len());
        }
        for (pos, byte) in self.bytes.iter().enumerate() {
            if pos != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

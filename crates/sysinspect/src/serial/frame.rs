use std::fmt;

/// Payload of the probe frame; the checksum byte is appended to it.
pub const PROBE_PAYLOAD: [u8; 5] = [0x57, 0xAB, 0x00, 0x01, 0x00];

/// Rule for the trailing validation byte. Firmware variants disagree on
/// which one they expect, so both are tried.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Checksum {
    /// Unsigned byte sum modulo 256.
    Sum,
    /// Running XOR.
    Xor,
}

impl Checksum {
    /// Order in which the conventions are tried at each baud rate.
    pub const ALL: [Checksum; 2] = [Checksum::Sum, Checksum::Xor];

    pub fn compute(self, bytes: &[u8]) -> u8 {
        match self {
            Self::Sum => bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)),
            Self::Xor => bytes.iter().fold(0u8, |acc, b| acc ^ b),
        }
    }

    /// `payload` followed by its checksum byte.
    pub fn frame(self, payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.extend_from_slice(payload);
        frame.push(self.compute(payload));
        frame
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum => f.write_str("sum"),
            Self::Xor => f.write_str("xor"),
        }
    }
}

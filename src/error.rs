//! Status codes for all framing layers.
//!
//! Every fallible operation in this crate reports its outcome through one of
//! three enumerations, one per layer. The numeric values of the three layers
//! never overlap (COBS uses 12..=22, CRC 52..=56, transfer 105..=120), so a
//! single status byte forwarded over a debug channel is enough to identify
//! both the failing layer and the exact failure.

/// COBS codec failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CobsError {
    /// Encoder rejected an empty payload.
    PayloadTooSmall = 12,
    /// Encoder rejected a payload longer than 254 bytes.
    PayloadTooLarge = 13,
    /// Buffer cannot hold the payload plus overhead and delimiter bytes.
    EncodeBufferTooSmall = 14,
    /// Overhead slot is non-zero, the buffer already holds an encoded packet.
    AlreadyEncoded = 15,
    /// Decoder rejected a packet shorter than 3 bytes.
    PacketTooSmall = 17,
    /// Decoder rejected a packet longer than 256 bytes.
    PacketTooLarge = 18,
    /// Buffer is shorter than the declared packet length.
    DecodeBufferTooSmall = 19,
    /// The distance chain ran past the end of the packet without reaching
    /// the delimiter.
    DelimiterNotFound = 20,
    /// An unencoded delimiter byte appeared before the end of the packet.
    DelimiterTooEarly = 21,
    /// Overhead slot is zero, the buffer has already been decoded.
    AlreadyDecoded = 22,
}

/// CRC engine failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CrcError {
    /// The requested checksum range runs past the end of the buffer.
    ComputeBufferTooSmall = 52,
    /// Not enough room left in the buffer to append the checksum bytes.
    AppendBufferTooSmall = 54,
    /// Not enough bytes left in the buffer to read the checksum back.
    ExtractBufferTooSmall = 56,
}

/// Transfer engine failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferError {
    /// The stream drained without producing the start byte. Only reported
    /// when start byte errors are enabled in the configuration.
    StartByteNotFound = 105,
    /// The delimiter did not show up within the space the reception buffer
    /// reserves for the packet.
    PacketOutOfBufferSpace = 107,
    /// The gap between two packet bytes exceeded the configured timeout.
    PacketTimeout = 108,
    /// The gap between two checksum bytes exceeded the configured timeout.
    PostambleTimeout = 109,
    /// Checksumming packet plus postamble did not yield zero.
    CrcCheckFailed = 111,
    /// Write would run past the end of the transmission payload region.
    WritePayloadTooSmall = 114,
    /// Read would run past the received payload.
    ReadPayloadTooSmall = 116,
    /// The stream drained without producing the start byte.
    NoBytesToParse = 118,
    /// A value could not be serialized into the payload region.
    ValueSerialization = 119,
    /// The received payload did not deserialize into the requested value.
    ValueDeserialization = 120,
}

/// Any failure reported by [`TransferLayer`](crate::TransferLayer).
///
/// Sub-layer errors pass through unchanged so the caller always sees the
/// originating failure, never a generic wrapper code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Cobs(CobsError),
    Crc(CrcError),
    Transfer(TransferError),
}

impl Error {
    /// The stable status byte for this failure.
    pub fn code(self) -> u8 {
        match self {
            Error::Cobs(e) => e as u8,
            Error::Crc(e) => e as u8,
            Error::Transfer(e) => e as u8,
        }
    }
}

impl From<CobsError> for Error {
    fn from(e: CobsError) -> Self {
        Error::Cobs(e)
    }
}

impl From<CrcError> for Error {
    fn from(e: CrcError) -> Self {
        Error::Crc(e)
    }
}

impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        Error::Transfer(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COBS: &[CobsError] = &[
        CobsError::PayloadTooSmall,
        CobsError::PayloadTooLarge,
        CobsError::EncodeBufferTooSmall,
        CobsError::AlreadyEncoded,
        CobsError::PacketTooSmall,
        CobsError::PacketTooLarge,
        CobsError::DecodeBufferTooSmall,
        CobsError::DelimiterNotFound,
        CobsError::DelimiterTooEarly,
        CobsError::AlreadyDecoded,
    ];

    const CRC: &[CrcError] = &[
        CrcError::ComputeBufferTooSmall,
        CrcError::AppendBufferTooSmall,
        CrcError::ExtractBufferTooSmall,
    ];

    const TRANSFER: &[TransferError] = &[
        TransferError::StartByteNotFound,
        TransferError::PacketOutOfBufferSpace,
        TransferError::PacketTimeout,
        TransferError::PostambleTimeout,
        TransferError::CrcCheckFailed,
        TransferError::WritePayloadTooSmall,
        TransferError::ReadPayloadTooSmall,
        TransferError::NoBytesToParse,
        TransferError::ValueSerialization,
        TransferError::ValueDeserialization,
    ];

    #[test]
    fn layer_code_ranges_are_disjoint() {
        for &e in COBS {
            assert!((11..=50).contains(&(e as u8)), "{:?}", e);
        }
        for &e in CRC {
            assert!((51..=100).contains(&(e as u8)), "{:?}", e);
        }
        for &e in TRANSFER {
            assert!((101..=150).contains(&(e as u8)), "{:?}", e);
        }
    }

    #[test]
    fn wrapped_code_matches_layer_code() {
        assert_eq!(Error::from(CobsError::DelimiterNotFound).code(), 20);
        assert_eq!(Error::from(CrcError::AppendBufferTooSmall).code(), 54);
        assert_eq!(Error::from(TransferError::PacketTimeout).code(), 108);
    }

    #[test]
    fn codes_are_unique() {
        let mut seen = std::vec::Vec::new();
        for &e in COBS {
            seen.push(e as u8);
        }
        for &e in CRC {
            seen.push(e as u8);
        }
        for &e in TRANSFER {
            seen.push(e as u8);
        }
        let count = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), count);
    }
}

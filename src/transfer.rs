//! Packet-based transfer engine.
//!
//! [`TransferLayer`] owns two fixed staging buffers and composes the COBS
//! codec and the CRC engine into a deterministic send/receive protocol over
//! a [`SerialStream`]. Callers stage payload bytes with
//! [`write_payload`](TransferLayer::write_payload), transmit with
//! [`send`](TransferLayer::send), and on the other side pull a validated
//! payload out with [`receive`](TransferLayer::receive) and
//! [`read_payload`](TransferLayer::read_payload). No heap allocation
//! happens anywhere on the packet path.
//!
//! Both buffers follow the same layout: index 0 is the COBS overhead slot,
//! the payload starts at index 1, one byte after the payload is reserved
//! for the delimiter and the last `W::WIDTH` bytes for the checksum. The
//! buffers are staging areas, not mailboxes: `send` resets the transmit
//! side, `receive` resets the receive side on entry.

use crate::cobs;
use crate::crc::{Crc, CrcRegister};
use crate::error::{Error, TransferError};
use crate::stream::{ElapsedTimer, SerialStream};

/// Default frame start marker.
pub const DEFAULT_START_BYTE: u8 = 129;
/// Default packet delimiter.
pub const DEFAULT_DELIMITER: u8 = 0;
/// Default inter-byte reception timeout.
pub const DEFAULT_TIMEOUT_US: u32 = 20_000;

/// Construction-time engine configuration.
///
/// `Default` is implemented per CRC width with the customary non-reflected
/// parameter set for that width: CRC-8/SMBUS, CRC-16/CCITT-FALSE and
/// CRC-32/MPEG-2.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config<W> {
    pub polynomial: W,
    pub initial: W,
    pub final_xor: W,
    /// Marker preceding every frame on the wire.
    pub start_byte: u8,
    /// Byte value reserved for packet termination; COBS removes it from
    /// payloads. Zero is the only value the overhead byte can never take,
    /// which makes it the safest choice.
    pub delimiter: u8,
    /// Longest tolerated gap between two received bytes of one frame.
    pub timeout_us: u32,
    /// Report a scan that drains the stream without finding the start byte
    /// as [`TransferError::StartByteNotFound`] instead of the quieter
    /// [`TransferError::NoBytesToParse`]. Noise bytes make the latter
    /// common in normal operation, so this is off by default.
    pub allow_start_byte_errors: bool,
}

impl<W: CrcRegister> Config<W> {
    /// Configuration with the given CRC parameters and stock framing
    /// (start byte 129, delimiter 0, 20 ms timeout).
    pub fn with_crc(polynomial: W, initial: W, final_xor: W) -> Self {
        Self {
            polynomial,
            initial,
            final_xor,
            start_byte: DEFAULT_START_BYTE,
            delimiter: DEFAULT_DELIMITER,
            timeout_us: DEFAULT_TIMEOUT_US,
            allow_start_byte_errors: false,
        }
    }
}

impl Default for Config<u8> {
    fn default() -> Self {
        Self::with_crc(0x07, 0x00, 0x00)
    }
}

impl Default for Config<u16> {
    fn default() -> Self {
        Self::with_crc(0x1021, 0xFFFF, 0x0000)
    }
}

impl Default for Config<u32> {
    fn default() -> Self {
        Self::with_crc(0x04C1_1DB7, 0xFFFF_FFFF, 0x0000_0000)
    }
}

/// Bidirectional framed transfer over a serial stream.
///
/// `TX_SIZE` and `RX_SIZE` are the total staging buffer sizes, i.e. the
/// largest payload plus 2 framing bytes plus the checksum width; a layer
/// moving up to 254-byte payloads with a 16-bit CRC uses 258-byte buffers.
/// Smaller buffers trade maximum payload size for RAM.
///
/// Outbound frames are `[start][len][overhead][encoded payload][delimiter]
/// [crc]`; inbound frames are expected without the length byte, the
/// delimiter alone marks the packet end. The asymmetry matches the host
/// side, which wants the length up front while the controller does not.
pub struct TransferLayer<W, S, T, const TX_SIZE: usize, const RX_SIZE: usize>
where
    W: CrcRegister,
    S: SerialStream,
    T: ElapsedTimer,
{
    stream: S,
    timer: T,
    crc: Crc<W>,
    start_byte: u8,
    delimiter: u8,
    timeout_us: u32,
    allow_start_byte_errors: bool,
    tx: [u8; TX_SIZE],
    rx: [u8; RX_SIZE],
    tx_filled: usize,
    rx_filled: usize,
}

impl<W, S, T, const TX_SIZE: usize, const RX_SIZE: usize> TransferLayer<W, S, T, TX_SIZE, RX_SIZE>
where
    W: CrcRegister,
    S: SerialStream,
    T: ElapsedTimer,
{
    /// Largest payload the transmit buffer can stage.
    pub const MAX_TX_PAYLOAD: usize = TX_SIZE - 2 - W::WIDTH;
    /// Largest payload the receive buffer can hold.
    pub const MAX_RX_PAYLOAD: usize = RX_SIZE - 2 - W::WIDTH;

    // Buffers must fit one payload byte plus framing and checksum, and COBS
    // cannot address packets past 256 bytes.
    const TX_SIZE_OK: () = assert!(
        TX_SIZE >= cobs::MIN_PACKET_LEN + W::WIDTH && TX_SIZE <= cobs::MAX_PACKET_LEN + W::WIDTH,
        "TX_SIZE must be between 3 + CRC width and 256 + CRC width"
    );
    const RX_SIZE_OK: () = assert!(
        RX_SIZE >= cobs::MIN_PACKET_LEN + W::WIDTH && RX_SIZE <= cobs::MAX_PACKET_LEN + W::WIDTH,
        "RX_SIZE must be between 3 + CRC width and 256 + CRC width"
    );

    /// Creates an engine owning `stream` and `timer`, with zeroed staging
    /// buffers. Builds the CRC lookup table once.
    pub fn new(stream: S, timer: T, config: Config<W>) -> Self {
        let () = Self::TX_SIZE_OK;
        let () = Self::RX_SIZE_OK;

        Self {
            crc: Crc::new(config.polynomial, config.initial, config.final_xor),
            start_byte: config.start_byte,
            delimiter: config.delimiter,
            timeout_us: config.timeout_us,
            allow_start_byte_errors: config.allow_start_byte_errors,
            tx: [0; TX_SIZE],
            rx: [0; RX_SIZE],
            tx_filled: 0,
            rx_filled: 0,
            stream,
            timer,
        }
    }

    /// Copies `src` into the transmit payload region at payload index
    /// `offset`, returning the index just past the written bytes so calls
    /// can be chained.
    ///
    /// The staged length only ever grows: overwriting earlier bytes does
    /// not shrink what [`send`](Self::send) will transmit. Use
    /// [`reset_tx`](Self::reset_tx) to start over.
    pub fn write_payload(&mut self, src: &[u8], offset: usize) -> Result<usize, Error> {
        let end = offset
            .checked_add(src.len())
            .filter(|&end| end <= Self::MAX_TX_PAYLOAD)
            .ok_or(TransferError::WritePayloadTooSmall)?;

        self.tx[1 + offset..1 + end].copy_from_slice(src);
        self.tx_filled = self.tx_filled.max(end);
        Ok(end)
    }

    /// Copies received payload bytes starting at payload index `offset`
    /// into `dst`. Reading never consumes: the payload stays available
    /// until the next [`receive`](Self::receive) or
    /// [`reset_rx`](Self::reset_rx).
    pub fn read_payload(&self, dst: &mut [u8], offset: usize) -> Result<usize, Error> {
        let end = offset
            .checked_add(dst.len())
            .filter(|&end| end <= self.rx_filled)
            .ok_or(TransferError::ReadPayloadTooSmall)?;

        dst.copy_from_slice(&self.rx[1 + offset..1 + end]);
        Ok(end)
    }

    /// Serializes `value` into the transmit payload region at payload
    /// index `offset`, returning the index just past the encoded bytes.
    #[cfg(feature = "serde")]
    pub fn write_value<V: serde::Serialize>(
        &mut self,
        value: &V,
        offset: usize,
    ) -> Result<usize, Error> {
        if offset >= Self::MAX_TX_PAYLOAD {
            return Err(TransferError::WritePayloadTooSmall.into());
        }
        let written = postcard::to_slice(value, &mut self.tx[1 + offset..1 + Self::MAX_TX_PAYLOAD])
            .map_err(|err| match err {
                postcard::Error::SerializeBufferFull => {
                    Error::from(TransferError::WritePayloadTooSmall)
                }
                _ => TransferError::ValueSerialization.into(),
            })?
            .len();

        self.tx_filled = self.tx_filled.max(offset + written);
        Ok(offset + written)
    }

    /// Deserializes a value from the received payload at payload index
    /// `offset`. Returns the value and the index just past its bytes.
    #[cfg(feature = "serde")]
    pub fn read_value<V: serde::de::DeserializeOwned>(
        &self,
        offset: usize,
    ) -> Result<(V, usize), Error> {
        if offset > self.rx_filled {
            return Err(TransferError::ReadPayloadTooSmall.into());
        }
        let window = &self.rx[1 + offset..1 + self.rx_filled];
        let (value, rest) = postcard::take_from_bytes(window).map_err(|err| match err {
            postcard::Error::DeserializeUnexpectedEnd => {
                Error::from(TransferError::ReadPayloadTooSmall)
            }
            _ => TransferError::ValueDeserialization.into(),
        })?;
        Ok((value, self.rx_filled - rest.len()))
    }

    /// Encodes, checksums and transmits the staged payload, then resets
    /// the transmit side.
    ///
    /// Nothing reaches the stream until the frame is fully constructed, so
    /// a failed call never half-transmits. Failures from the codec or the
    /// CRC engine pass through unchanged.
    pub fn send(&mut self) -> Result<(), Error> {
        let payload_len = self.tx_filled;
        let packet_len = cobs::encode(&mut self.tx, payload_len, self.delimiter)?;
        let checksum = self.crc.compute(&self.tx, 0, packet_len)?;
        let frame_len = self.crc.append(&mut self.tx, packet_len, checksum)?;

        // The host-side parser wants the payload length up front; see the
        // frame layout note on the type.
        let preamble = [self.start_byte, payload_len as u8];
        self.stream.write_bytes(&preamble);
        self.stream.write_bytes(&self.tx[..frame_len]);

        self.reset_tx();
        Ok(())
    }

    /// Parses one frame out of the stream, validates it and leaves the
    /// decoded payload in the receive buffer.
    ///
    /// Any previously received payload is discarded on entry. On failure
    /// the tracker stays at zero, so a partial or corrupt frame is never
    /// readable.
    pub fn receive(&mut self) -> Result<(), Error> {
        self.reset_rx();
        let packet_len = self.parse_packet()?;
        let payload_len = self.validate_packet(packet_len)?;
        self.rx_filled = payload_len;
        Ok(())
    }

    /// Whether the stream has unread bytes, i.e. whether calling
    /// [`receive`](Self::receive) can make progress at all.
    pub fn available(&self) -> bool {
        self.stream.bytes_available() > 0
    }

    /// Clears the transmit tracker and the overhead slot.
    pub fn reset_tx(&mut self) {
        self.tx[0] = 0;
        self.tx_filled = 0;
    }

    /// Clears the receive tracker and the overhead slot.
    pub fn reset_rx(&mut self) {
        self.rx[0] = 0;
        self.rx_filled = 0;
    }

    /// Payload bytes currently staged for transmission.
    pub fn bytes_in_tx(&self) -> usize {
        self.tx_filled
    }

    /// Payload bytes of the last successfully received frame.
    pub fn bytes_in_rx(&self) -> usize {
        self.rx_filled
    }

    pub const fn max_tx_payload(&self) -> usize {
        Self::MAX_TX_PAYLOAD
    }

    pub const fn max_rx_payload(&self) -> usize {
        Self::MAX_RX_PAYLOAD
    }

    pub const fn tx_buffer_size(&self) -> usize {
        TX_SIZE
    }

    pub const fn rx_buffer_size(&self) -> usize {
        RX_SIZE
    }

    /// The underlying stream, e.g. to inspect a test double.
    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Reads one packet plus its checksum postamble into the receive
    /// buffer. Returns the packet length (checksum excluded).
    fn parse_packet(&mut self) -> Result<usize, Error> {
        // Hunt for the start byte; anything in front of it is line noise
        // and is dropped. The start byte itself is consumed.
        let mut started = false;
        while let Ok(byte) = self.stream.read_byte() {
            if byte == self.start_byte {
                started = true;
                break;
            }
        }
        if !started {
            return Err(if self.allow_start_byte_errors {
                TransferError::StartByteNotFound.into()
            } else {
                TransferError::NoBytesToParse.into()
            });
        }

        // Read packet bytes until the delimiter. The buffer tail stays
        // reserved for the checksum, so the packet can never overrun the
        // postamble slot. The timeout covers the gap between consecutive
        // bytes, not the whole packet.
        let limit = RX_SIZE - W::WIDTH;
        let mut bytes_read = 0usize;
        let mut delimited = false;
        self.timer.restart();
        while bytes_read < limit {
            match self.stream.read_byte() {
                Ok(byte) => {
                    self.rx[bytes_read] = byte;
                    bytes_read += 1;
                    // The first stored byte is the overhead slot, which may
                    // legitimately equal a non-zero delimiter; it never
                    // terminates the packet.
                    if byte == self.delimiter && bytes_read > 1 {
                        delimited = true;
                        break;
                    }
                    self.timer.restart();
                }
                Err(nb::Error::WouldBlock) => {
                    if self.timer.elapsed_us() >= self.timeout_us {
                        return Err(TransferError::PacketTimeout.into());
                    }
                }
                Err(nb::Error::Other(e)) => match e {},
            }
        }
        if !delimited {
            return Err(TransferError::PacketOutOfBufferSpace.into());
        }

        // The fixed-width checksum follows the delimiter immediately, each
        // byte under its own timeout.
        for i in 0..W::WIDTH {
            self.timer.restart();
            loop {
                match self.stream.read_byte() {
                    Ok(byte) => {
                        self.rx[bytes_read + i] = byte;
                        break;
                    }
                    Err(nb::Error::WouldBlock) => {
                        if self.timer.elapsed_us() >= self.timeout_us {
                            return Err(TransferError::PostambleTimeout.into());
                        }
                    }
                    Err(nb::Error::Other(e)) => match e {},
                }
            }
        }

        Ok(bytes_read)
    }

    /// Zero-checks the packet plus postamble and decodes the payload in
    /// place. Returns the payload length.
    fn validate_packet(&mut self, packet_len: usize) -> Result<usize, Error> {
        // Checksumming data together with its own checksum yields zero for
        // intact frames; no extraction or comparison needed.
        let checksum = self.crc.compute(&self.rx, 0, packet_len + W::WIDTH)?;
        if checksum != W::ZERO {
            return Err(TransferError::CrcCheckFailed.into());
        }

        let payload_len = cobs::decode(&mut self.rx, packet_len, self.delimiter)?;
        Ok(payload_len)
    }
}

//! In-place Consistent Overhead Byte Stuffing.
//!
//! Both routines operate directly on the staging buffer used by the transfer
//! engine: index 0 holds the overhead byte, the payload occupies indices
//! `1..=len`, and index `len + 1` receives the trailing delimiter. Working in
//! place avoids a second packet-sized buffer, which matters on targets where
//! the whole engine has to fit next to an application.
//!
//! The overhead slot doubles as an encoding marker: zero means "plain
//! payload", anything else means "encoded packet". [`encode`] refuses a
//! non-zero slot and [`decode`] refuses a zero one, so running either twice
//! on the same buffer fails loudly instead of scrambling the data.

use crate::error::CobsError;

/// Smallest payload that can be framed.
pub const MIN_PAYLOAD_LEN: usize = 1;
/// Largest payload a single distance byte can span.
pub const MAX_PAYLOAD_LEN: usize = 254;
/// Smallest well-formed packet: overhead, one payload byte, delimiter.
pub const MIN_PACKET_LEN: usize = 3;
/// Largest packet: maximum payload plus overhead and delimiter.
pub const MAX_PACKET_LEN: usize = 256;

/// Encodes the payload stored in `buf[1..=payload_len]` in place.
///
/// Walks the payload backwards, replacing every delimiter-valued byte with
/// the distance to the next one (or to the trailing delimiter appended at
/// `buf[payload_len + 1]`), then stores the distance to the first link in
/// the overhead slot. Returns the resulting packet length, which is always
/// `payload_len + 2`.
pub fn encode(buf: &mut [u8], payload_len: usize, delimiter: u8) -> Result<usize, CobsError> {
    if payload_len < MIN_PAYLOAD_LEN {
        return Err(CobsError::PayloadTooSmall);
    }
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(CobsError::PayloadTooLarge);
    }
    if buf.len() < payload_len + 2 {
        return Err(CobsError::EncodeBufferTooSmall);
    }
    if buf[0] != 0 {
        return Err(CobsError::AlreadyEncoded);
    }

    buf[payload_len + 1] = delimiter;

    // Backward pass: each delimiter byte becomes the jump distance to the
    // previously rewritten one, the first rewrite points at the trailing
    // delimiter.
    let mut last = 0usize;
    for i in (1..=payload_len).rev() {
        if buf[i] == delimiter {
            buf[i] = if last == 0 {
                (payload_len + 1 - i) as u8
            } else {
                (last - i) as u8
            };
            last = i;
        }
    }

    buf[0] = if last != 0 {
        last as u8
    } else {
        (payload_len + 1) as u8
    };

    Ok(payload_len + 2)
}

/// Decodes the packet stored in `buf[..packet_len]` in place.
///
/// Follows the distance chain from the overhead slot, restoring the
/// delimiter value at every link, and succeeds only when the chain lands
/// exactly on the last byte of the packet. Returns the payload length,
/// `packet_len - 2`.
///
/// The overhead slot is cleared before the chain is walked. A corrupted
/// chain therefore still leaves the buffer marked as decoded, and a repeat
/// call reports [`CobsError::AlreadyDecoded`] instead of walking garbage.
pub fn decode(buf: &mut [u8], packet_len: usize, delimiter: u8) -> Result<usize, CobsError> {
    if packet_len < MIN_PACKET_LEN {
        return Err(CobsError::PacketTooSmall);
    }
    if packet_len > MAX_PACKET_LEN {
        return Err(CobsError::PacketTooLarge);
    }
    if buf.len() < packet_len {
        return Err(CobsError::DecodeBufferTooSmall);
    }
    if buf[0] == 0 {
        return Err(CobsError::AlreadyDecoded);
    }

    let mut read = 0usize;
    let mut jump = buf[0] as usize;
    buf[0] = 0;

    // The chain starts at the overhead slot, so an overhead byte that
    // happens to equal the delimiter (possible for non-zero delimiters) is
    // never mistaken for the packet end.
    while read + jump < packet_len {
        read += jump;
        if buf[read] == delimiter {
            if read == packet_len - 1 {
                return Ok(packet_len - 2);
            }
            return Err(CobsError::DelimiterTooEarly);
        }
        jump = buf[read] as usize;
        buf[read] = delimiter;
    }

    Err(CobsError::DelimiterNotFound)
}

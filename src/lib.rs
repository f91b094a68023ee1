//! Reliable byte-oriented framing for microcontroller-to-host serial links.
//!
//! `framelink` turns in-memory payloads of up to 254 bytes into
//! self-delimiting packets protected by a CRC, and parses such packets back
//! out of a noisy stream. Payloads are COBS-encoded in place, checksummed
//! with a table-driven CRC (8, 16 or 32 bit) and framed like this on the
//! wire:
//!
//! ```text
//! ┌───────┬────────┬──────────┬─────────────────┬───────────┬─────────┐
//! │ START │ LENGTH │ OVERHEAD │ ENCODED PAYLOAD │ DELIMITER │ CRC     │
//! │ 1B    │ 1B     │ 1B       │ 1–254B          │ 1B        │ 1/2/4B  │
//! └───────┴────────┴──────────┴─────────────────┴───────────┴─────────┘
//! ```
//!
//! The LENGTH byte is outbound-only: the host parser wants the payload size
//! up front, while the inbound parser relies solely on the delimiter to
//! find the packet end.
//!
//! The crate is transport-agnostic. Hardware access goes through the two
//! small traits in [`stream`]; [`mock`] ships in-memory doubles so protocol
//! logic can be exercised without any wiring:
//!
//! ```
//! use framelink::mock::{MockTimer, StreamMock};
//! use framelink::{Config, TransferLayer};
//!
//! // 16-bit CRC, full 254-byte payloads: 254 + 2 + 2 buffer bytes.
//! let mut link: TransferLayer<u16, StreamMock, MockTimer, 258, 258> =
//!     TransferLayer::new(StreamMock::new(), MockTimer::new(1_000), Config::default());
//!
//! link.write_payload(&[1, 2, 3], 0)?;
//! link.send()?;
//! assert_eq!(link.stream().transmitted()[0], 129);
//! # Ok::<(), framelink::Error>(())
//! ```

#![no_std]

// Use std when running tests, see: https://stackoverflow.com/a/28186509
// Make sure to use different target when testing, e.g.
//   cargo test --target x86_64-unknown-linux-gnu
#[cfg(test)]
#[macro_use]
extern crate std;

pub mod cobs;
pub mod crc;
pub mod error;
pub mod mock;
pub mod stream;
pub mod transfer;

pub use crc::{Crc, CrcRegister};
pub use error::{CobsError, CrcError, Error, TransferError};
pub use stream::{ElapsedTimer, SerialStream};
pub use transfer::{Config, TransferLayer};

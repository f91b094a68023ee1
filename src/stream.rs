//! Hardware ports consumed by the transfer engine.
//!
//! The engine talks to the outside world through two small traits: a byte
//! stream (USB CDC, UART, or the in-memory double from [`crate::mock`]) and
//! a free-running microsecond timer used to bound the receive loops. Both
//! are intended to be implemented once per board support crate.

use core::convert::Infallible;

/// A bidirectional byte stream.
///
/// No buffering behaviour is assumed beyond what the methods state; the
/// engine tolerates bytes trickling in one at a time.
pub trait SerialStream {
    /// Pops the next received byte, or [`nb::Error::WouldBlock`] when the
    /// line is currently idle.
    fn read_byte(&mut self) -> nb::Result<u8, Infallible>;

    /// Number of received bytes currently buffered.
    fn bytes_available(&self) -> usize;

    /// Queues the whole slice for transmission, blocking until the
    /// transport has accepted every byte.
    fn write_bytes(&mut self, bytes: &[u8]);
}

/// A restartable elapsed-time counter with microsecond resolution.
///
/// The engine restarts the timer after every successfully received byte, so
/// implementations only need to measure short spans; wrap-around beyond the
/// configured timeout never matters.
pub trait ElapsedTimer {
    /// Restarts the measurement from zero.
    fn restart(&mut self);

    /// Microseconds elapsed since the last [`restart`](Self::restart).
    fn elapsed_us(&mut self) -> u32;
}

impl<S: SerialStream + ?Sized> SerialStream for &mut S {
    fn read_byte(&mut self) -> nb::Result<u8, Infallible> {
        (**self).read_byte()
    }

    fn bytes_available(&self) -> usize {
        (**self).bytes_available()
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        (**self).write_bytes(bytes)
    }
}

impl<T: ElapsedTimer + ?Sized> ElapsedTimer for &mut T {
    fn restart(&mut self) {
        (**self).restart()
    }

    fn elapsed_us(&mut self) -> u32 {
        (**self).elapsed_us()
    }
}

//! Byte transport used by the collector uplink
//!
//! One connection at a time: `connect`, write the request, read the status
//! line, `close`. Implementations resolve host names themselves.

use core::future::Future;

/// Transport operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Host name could not be resolved
    Dns,
    /// TCP connection could not be established
    Connect,
    /// Write to the peer failed
    Write,
    /// Read from the peer failed
    Read,
    /// No data arrived before the deadline
    Timeout,
    /// Peer closed the connection
    Closed,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Dns => write!(f, "DNS resolution failed"),
            Self::Connect => write!(f, "Connect failed"),
            Self::Write => write!(f, "Write failed"),
            Self::Read => write!(f, "Read failed"),
            Self::Timeout => write!(f, "Timed out"),
            Self::Closed => write!(f, "Connection closed by peer"),
        }
    }
}

impl core::error::Error for TransportError {}

impl embedded_io_async::Error for TransportError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::Connect => embedded_io_async::ErrorKind::ConnectionRefused,
            Self::Write | Self::Closed => embedded_io_async::ErrorKind::BrokenPipe,
            Self::Timeout => embedded_io_async::ErrorKind::TimedOut,
            Self::Read => embedded_io_async::ErrorKind::InvalidData,
            Self::Dns => embedded_io_async::ErrorKind::Other,
        }
    }
}

/// Connection-oriented transport (TCP on real hardware)
///
/// Implementors log and return errors rather than panicking; the caller
/// decides whether to retry on its next cycle.
pub trait Transport {
    /// Open a connection to `host:port`
    fn connect(
        &mut self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<(), TransportError>>;

    /// Write the whole buffer
    fn write_all(&mut self, buf: &[u8]) -> impl Future<Output = Result<(), TransportError>>;

    /// Read one line into `buf`, waiting at most `timeout_ms` for it
    ///
    /// Returns the line length without the `\r`/`\n` terminator. A line longer
    /// than `buf` is truncated to `buf.len()`.
    fn read_line(
        &mut self,
        buf: &mut [u8],
        timeout_ms: u64,
    ) -> impl Future<Output = Result<usize, TransportError>>;

    /// Close the connection, discarding unread data
    fn close(&mut self) -> impl Future<Output = ()>;
}

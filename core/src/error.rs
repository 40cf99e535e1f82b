//! Uplink error types

use redlight_hal::TransportError;

/// Collector delivery errors
///
/// All of them are transient: the pending batch is kept and the next
/// transmit cycle tries again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UplinkError {
    /// Transport failed (DNS, connect, write, read, timeout)
    Transport(TransportError),
    /// Collector answered with a non-200 status
    Status(u16),
    /// Response line was not an HTTP status line
    MalformedResponse,
    /// Document or request head did not fit its buffer
    PayloadTooLarge,
    /// Network stack has no usable configuration
    NetworkDown,
}

impl From<TransportError> for UplinkError {
    fn from(e: TransportError) -> Self {
        UplinkError::Transport(e)
    }
}

impl core::fmt::Display for UplinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Status(code) => write!(f, "Collector returned HTTP {}", code),
            Self::MalformedResponse => write!(f, "Malformed response"),
            Self::PayloadTooLarge => write!(f, "Payload too large"),
            Self::NetworkDown => write!(f, "Network down"),
        }
    }
}

impl core::error::Error for UplinkError {}

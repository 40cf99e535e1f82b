//! Wall-clock abstraction
//!
//! The clock is battery backed and survives resets. It may be stopped
//! (calendar never initialised, oscillator fault), in which case session
//! intervals cannot be timestamped.

/// Timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    /// Unix timestamp in seconds since epoch (1970-01-01 00:00:00 UTC)
    pub unix_secs: u64,
    /// Microseconds component (0-999,999)
    pub micros: u32,
}

impl Timestamp {
    /// Unix epoch
    pub const EPOCH: Self = Self::new(0, 0);

    /// Create a new timestamp
    pub const fn new(unix_secs: u64, micros: u32) -> Self {
        Self { unix_secs, micros }
    }

    /// Create a timestamp from milliseconds since the Unix epoch
    pub const fn from_unix_millis(millis: u64) -> Self {
        Self::new(millis / 1000, ((millis % 1000) * 1000) as u32)
    }

    /// Milliseconds since the Unix epoch
    pub const fn as_unix_millis(&self) -> u64 {
        self.unix_secs * 1000 + (self.micros / 1000) as u64
    }

    /// Convert from NTP timestamp (seconds since 1900-01-01)
    pub fn from_ntp(ntp_secs: u64, ntp_frac: u32) -> Self {
        /// NTP epoch offset (1900-01-01 to 1970-01-01 in seconds)
        const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

        let unix_secs = ntp_secs.saturating_sub(NTP_UNIX_OFFSET);
        // NTP fraction is in units of 2^-32 seconds
        let micros = ((ntp_frac as u64 * 1_000_000) >> 32) as u32;
        Self::new(unix_secs, micros)
    }

    /// Advance by `micros`, carrying into seconds
    pub fn add_micros(self, micros: u64) -> Self {
        let total = self.micros as u64 + micros;
        Self::new(
            self.unix_secs.saturating_add(total / 1_000_000),
            (total % 1_000_000) as u32,
        )
    }
}

/// Battery-backed real-time clock
pub trait WallClock {
    /// Error returned by clock reads and writes
    type Error: core::fmt::Debug;

    /// Current wall-clock time
    ///
    /// Fails if the clock is not running.
    fn now(&mut self) -> Result<Timestamp, Self::Error>;

    /// Whether the clock is running and its time can be trusted
    fn is_running(&mut self) -> bool;

    /// Set the clock, starting it if it was stopped
    fn adjust(&mut self, time: Timestamp) -> Result<(), Self::Error>;
}

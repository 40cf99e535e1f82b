//! Internal RTC wrapper implementing `WallClock`
//!
//! The STM32F405 RTC runs from the 32.768 kHz LSE in the backup domain, so
//! with VBAT present it keeps counting across resets. It has 1-second
//! resolution.

use defmt::Format;
use embassy_stm32::rtc::Rtc;
use redlight_hal::{Timestamp, WallClock};

use super::calendar::{datetime_to_unix, unix_to_datetime};

/// RTC operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum RtcError {
    /// Calendar never initialised (or lost with backup power)
    NotRunning,
    /// Time outside the range the calendar registers hold
    OutOfRange,
    /// Register read or write failed
    HardwareError,
}

impl core::fmt::Display for RtcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotRunning => write!(f, "RTC not running"),
            Self::OutOfRange => write!(f, "Time out of RTC range"),
            Self::HardwareError => write!(f, "RTC hardware error"),
        }
    }
}

impl core::error::Error for RtcError {}

impl From<embassy_stm32::rtc::RtcError> for RtcError {
    fn from(e: embassy_stm32::rtc::RtcError) -> Self {
        match e {
            embassy_stm32::rtc::RtcError::NotRunning => RtcError::NotRunning,
            embassy_stm32::rtc::RtcError::InvalidDateTime(_) => RtcError::OutOfRange,
            _ => RtcError::HardwareError,
        }
    }
}

/// Battery-backed wall clock
pub struct RtcClock {
    rtc: Rtc,
}

impl RtcClock {
    pub fn new(rtc: Rtc) -> Self {
        Self { rtc }
    }
}

impl WallClock for RtcClock {
    type Error = RtcError;

    fn now(&mut self) -> Result<Timestamp, RtcError> {
        let datetime = self.rtc.now()?;
        Ok(Timestamp::new(datetime_to_unix(&datetime), 0))
    }

    fn is_running(&mut self) -> bool {
        self.rtc.now().is_ok()
    }

    fn adjust(&mut self, time: Timestamp) -> Result<(), RtcError> {
        let datetime = unix_to_datetime(time.unix_secs)?;
        self.rtc
            .set_datetime(datetime)
            .map_err(|_| RtcError::HardwareError)
    }
}

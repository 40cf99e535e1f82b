//! Wall-clock time for the board
//!
//! ## Architecture
//! - The internal RTC (LSE, battery backed) is the only wall clock
//! - `RtcClock` implements `redlight_hal::WallClock` and lives in an RTIC
//!   shared resource, locked briefly by the input and network tasks
//! - SNTP corrects it after DHCP and every 15 minutes
//! - If it is stopped at boot, or a sync fails while it is stopped, it is
//!   seeded with the firmware build time so sessions still get timestamps
#![deny(unsafe_code)]
#![deny(warnings)]

mod calendar;
mod rtc;

use defmt::info;
use embassy_stm32::rtc::{Rtc, RtcConfig};
use redlight_core::{apply_sync, TimeSource};
use redlight_hal::{Timestamp, WallClock};

pub use rtc::{RtcClock, RtcError};

include!(concat!(env!("OUT_DIR"), "/build_time.rs"));

/// Firmware build time, the fallback when no better time is known
pub const fn build_time() -> Timestamp {
    Timestamp::new(BUILD_UNIX_SECS, 0)
}

/// Bring up the RTC and make sure its calendar is running
pub fn init_clock(rtc_peripheral: embassy_stm32::Peri<'static, embassy_stm32::peripherals::RTC>) -> RtcClock {
    let rtc = Rtc::new(rtc_peripheral, RtcConfig::default());
    info!("Internal RTC initialized with LSE (32.768kHz, ±20-50ppm accuracy)");

    let mut clock = RtcClock::new(rtc);
    match clock.now() {
        Ok(now) => info!("RTC running: {} UTC", now.unix_secs),
        Err(e) => {
            info!("RTC not running ({}), using build time", e);
            apply_sync(&mut clock, None, build_time());
        }
    }
    clock
}

/// Write a sync result to the clock, falling back as needed
pub fn resync(clock: &mut RtcClock, synced: Option<Timestamp>) -> TimeSource {
    apply_sync(clock, synced, build_time())
}

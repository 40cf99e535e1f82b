//! Conversions between Unix time and the RTC calendar registers
#![deny(unsafe_code)]
#![deny(warnings)]

use embassy_stm32::rtc::{DateTime, DayOfWeek};
use redlight_core::calendar::{civil_to_unix, unix_to_civil, CivilDateTime};

use super::rtc::RtcError;

/// Unix seconds to an RTC `DateTime` (UTC)
pub fn unix_to_datetime(unix_secs: u64) -> Result<DateTime, RtcError> {
    let civil = unix_to_civil(unix_secs);
    DateTime::from(
        civil.year,
        civil.month,
        civil.day,
        day_of_week(civil.weekday),
        civil.hour,
        civil.minute,
        civil.second,
        0,
    )
    .map_err(|_| RtcError::OutOfRange)
}

/// RTC `DateTime` to Unix seconds (UTC)
pub fn datetime_to_unix(dt: &DateTime) -> u64 {
    civil_to_unix(&CivilDateTime {
        year: dt.year(),
        month: dt.month(),
        day: dt.day(),
        hour: dt.hour(),
        minute: dt.minute(),
        second: dt.second(),
        weekday: dt.day_of_week() as u8,
    })
}

fn day_of_week(iso_weekday: u8) -> DayOfWeek {
    match iso_weekday {
        1 => DayOfWeek::Monday,
        2 => DayOfWeek::Tuesday,
        3 => DayOfWeek::Wednesday,
        4 => DayOfWeek::Thursday,
        5 => DayOfWeek::Friday,
        6 => DayOfWeek::Saturday,
        _ => DayOfWeek::Sunday,
    }
}

//! Hardware abstraction traits for the red-light monitor firmware
//!
//! This crate defines the traits the capture core consumes and the board
//! support crate implements:
//! - **`rtc`**: battery-backed wall clock (`WallClock`) and `Timestamp`
//! - **`network`**: connection-oriented byte transport (`Transport`)
//!
//! Pin levels come from `embedded_hal::digital::InputPin` directly.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod network;
pub mod rtc;

pub use network::{Transport, TransportError};
pub use rtc::{Timestamp, WallClock};

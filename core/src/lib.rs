//! Platform-agnostic core logic for the red-light monitor firmware
//!
//! Debounced signal capture, red-light session tracking, the bounded pending
//! batch and the collector uplink. It has NO hardware dependencies: the board
//! crate supplies pins (`embedded_hal::digital::InputPin`), the wall clock
//! (`redlight_hal::WallClock`) and the transport (`redlight_hal::Transport`).
//!
//! ## Data flow
//!
//! ```text
//! InputPin ──> SignalMonitor ──(Debouncer)──> StableTransition
//!                   │                              │
//!                   │                        SessionTracker ──> CompletedSession
//!                   │                                                  │
//!                   └──────────────── append ──────────────> PendingBatch<K>
//!                                                                      │
//!                                               Uploader::drain_and_send (JSON/HTTP)
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

pub mod batch;
pub mod calendar;
pub mod config;
pub mod debounce;
pub mod error;
pub mod http;
pub mod monitor;
pub mod report;
pub mod session;
pub mod time;
pub mod uplink;

pub use batch::{BatchStore, PendingBatch, Snapshot, MAX_PENDING_SESSIONS};
pub use config::{ChannelConfig, MonitorConfig, UplinkConfig};
pub use debounce::{ActiveLevel, Debouncer, SignalState, StableTransition};
pub use error::UplinkError;
pub use monitor::{Channel, MonitorStats, SignalMonitor};
pub use report::{body_capacity, RtcStatus, StatusReport, BODY_CAPACITY};
pub use redlight_hal::{Timestamp, Transport, TransportError, WallClock};
pub use session::{ChannelId, CompletedSession, SessionTracker};
pub use time::{apply_sync, ClockStatus, TimeSource};
pub use uplink::{DeliveryResult, Uploader, UplinkStats};

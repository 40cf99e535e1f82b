//! Capture and uplink configuration

use crate::debounce::ActiveLevel;

/// Signal capture configuration
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    /// Time a new level must hold before it is accepted
    pub debounce_ms: u64,
    /// Input sampling period
    pub poll_interval_ms: u64,
    /// Period of the per-channel status log line
    pub status_log_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            poll_interval_ms: 10,
            status_log_interval_ms: 5000,
        }
    }
}

/// Per-channel wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Pin label used in logs (board GPIO number)
    pub pin: u8,
    /// Electrical level that means "red lamp lit"
    pub active_level: ActiveLevel,
}

impl ChannelConfig {
    /// Input with pull-up that the lamp drives low
    pub const fn active_low(pin: u8) -> Self {
        Self {
            pin,
            active_level: ActiveLevel::Low,
        }
    }

    /// Input that the lamp drives high
    pub const fn active_high(pin: u8) -> Self {
        Self {
            pin,
            active_level: ActiveLevel::High,
        }
    }
}

/// Collector uplink configuration
#[derive(Debug, Clone, Copy)]
pub struct UplinkConfig<'a> {
    /// Identity reported in every document
    pub device_id: &'a str,
    /// Collector hostname (resolved by the transport)
    pub host: &'a str,
    /// Collector TCP port
    pub port: u16,
    /// Heartbeat endpoint
    pub status_path: &'a str,
    /// Session batch endpoint
    pub batch_path: &'a str,
    /// `User-Agent` header value
    pub user_agent: &'a str,
    /// Deadline for the response status line
    pub response_timeout_ms: u64,
    /// Period between transmit cycles
    pub interval_ms: u64,
}

impl Default for UplinkConfig<'static> {
    fn default() -> Self {
        Self {
            device_id: "redlight-monitor",
            host: "collector.local",
            port: 80,
            // Legacy collector endpoint name, kept for compatibility
            status_path: "/w5100",
            batch_path: "/traffic_lights",
            user_agent: "redlight-feather/0.1",
            response_timeout_ms: 2000,
            interval_ms: 5000,
        }
    }
}

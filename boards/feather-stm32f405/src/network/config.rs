#![deny(unsafe_code)]
#![deny(warnings)]
//! Network configuration structures

use redlight_core::UplinkConfig;

/// SNTP client configuration
#[derive(Debug, Clone)]
pub struct SntpConfig {
    /// NTP servers to try (in order)
    pub servers: &'static [&'static str],
    /// Server UDP port
    pub port: u16,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Number of retry attempts per server
    pub retry_count: usize,
    /// Delay between attempts in milliseconds
    pub retry_backoff_ms: u64,
    /// Maximum accepted stratum level (1-15)
    pub max_stratum: u8,
    /// Period between re-synchronizations
    pub resync_interval_secs: u64,
}

impl Default for SntpConfig {
    fn default() -> Self {
        Self {
            servers: &["pool.ntp.org", "time.google.com", "time.cloudflare.com"],
            port: 123,
            timeout_ms: 5000,
            retry_count: 3,
            retry_backoff_ms: 2000,
            max_stratum: 3,
            resync_interval_secs: 15 * 60,
        }
    }
}

/// Network stack configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// MAC address for Ethernet
    pub mac_addr: [u8; 6],
    /// Random seed for network stack
    pub seed: u64,
}

impl NetworkConfig {
    /// MAC and seed derived from the chip UID
    pub fn for_device() -> Self {
        let uid = crate::device_id::uid();
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&uid[4..12]);
        Self {
            mac_addr: crate::device_id::mac_address(),
            seed: u64::from_le_bytes(seed_bytes),
        }
    }
}

/// Collector endpoint for this board
pub fn uplink_config(device_id: &'static str) -> UplinkConfig<'static> {
    UplinkConfig {
        device_id,
        ..UplinkConfig::default()
    }
}

#![deny(unsafe_code)]
#![deny(warnings)]
//! Device identity derived from the STM32F405 unique ID
//!
//! The factory-programmed 96-bit UID is stable across reboots and unique to
//! each chip. It names the device to the collector and seeds the Ethernet MAC.

use heapless::String;
use static_cell::StaticCell;

/// Format: "redlight-" (9 chars) + 24 hex chars
pub const DEVICE_ID_MAX_LEN: usize = 33;

const DEVICE_ID_PREFIX: &str = "redlight-";

/// Raw 12-byte UID
pub fn uid() -> &'static [u8; 12] {
    embassy_stm32::uid::uid()
}

/// 24-character lowercase hex UID
pub fn uid_hex() -> &'static str {
    embassy_stm32::uid::uid_hex()
}

/// Collector-facing device identity, `redlight-{uid_hex}`
///
/// Must be called once; the string lives for the rest of the program.
pub fn device_id() -> &'static str {
    static DEVICE_ID: StaticCell<String<DEVICE_ID_MAX_LEN>> = StaticCell::new();

    let mut id = String::<DEVICE_ID_MAX_LEN>::new();
    // Both fit: 9 + 24 == DEVICE_ID_MAX_LEN
    id.push_str(DEVICE_ID_PREFIX).expect("prefix should fit");
    id.push_str(uid_hex()).expect("UID should fit");
    DEVICE_ID.init(id).as_str()
}

/// Locally administered unicast MAC derived from the UID
pub fn mac_address() -> [u8; 6] {
    let uid = uid();
    // Fold all 96 bits into the low five octets
    let mut tail = [0u8; 5];
    for (i, byte) in uid.iter().enumerate() {
        tail[i % 5] ^= byte;
    }
    [0x02, tail[0], tail[1], tail[2], tail[3], tail[4]]
}

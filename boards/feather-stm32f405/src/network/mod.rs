#![deny(warnings)]
//! Network module with trait-based client architecture
//!
//! - **`client`**: `NetworkClient` trait for protocol implementations
//! - **`collector`**: pending-batch access for the uplink
//! - **`config`**: Configuration structs with `Default` implementations
//! - **`error`**: Simple error enum for network operations
//! - **`manager`**: DHCP wait and link state
//! - **`sntp`**: SNTP client implementing `NetworkClient`
//! - **`socket`**: TCP transport implementing `redlight_hal::Transport`
//!
//! The stack is `embassy-net` over `embassy-net-wiznet`; the W5500 handles its
//! own buffering, so no driver-channel layer sits in between.

pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod manager;
pub mod sntp;
pub mod socket;

// Re-export commonly used types
pub use client::NetworkClient;
pub use collector::SharedBatch;
pub use config::{uplink_config, NetworkConfig, SntpConfig};
pub use error::NetworkError;
pub use sntp::SntpClient;
pub use socket::TcpTransport;

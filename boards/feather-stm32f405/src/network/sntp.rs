#![deny(unsafe_code)]
#![deny(warnings)]
//! SNTP client implementing NetworkClient trait
//!
//! Produces a corrected network time; the caller decides what to do with the
//! clock (see `time::resync`).

use defmt::{error, info, warn, Debug2Format};
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{Duration, Instant, Timer};
use redlight_hal::Timestamp;
use rtic_monotonics::fugit::ExtU64;
use rtic_monotonics::Monotonic;

use crate::Mono;

use super::client::NetworkClient;
use super::config::SntpConfig;
use super::error::NetworkError;

/// NTP packet length (no extension fields)
const NTP_PACKET_LEN: usize = 48;

/// SNTP client for time synchronization
pub struct SntpClient {
    config: SntpConfig,
}

impl SntpClient {
    pub fn new(config: SntpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SntpConfig {
        &self.config
    }

    /// Try each configured server in turn
    async fn sync(&self, stack: &Stack<'static>) -> Result<Timestamp, NetworkError> {
        info!("Starting SNTP synchronization");
        for server in self.config.servers {
            for attempt in 0..self.config.retry_count {
                info!(
                    "Attempting SNTP sync with {} (attempt {})",
                    server,
                    attempt + 1
                );
                match self.sntp_request(stack, server).await {
                    Ok(timestamp) => return Ok(timestamp),
                    Err(e) => {
                        warn!("SNTP request failed: {}, retrying...", e);
                        Mono::delay(self.config.retry_backoff_ms.millis()).await;
                    }
                }
            }
        }
        error!("All SNTP sync attempts failed");
        Err(NetworkError::AllServersFailed)
    }

    async fn sntp_request(
        &self,
        stack: &Stack<'static>,
        server: &str,
    ) -> Result<Timestamp, NetworkError> {
        let server_ip = stack
            .dns_query(server, DnsQueryType::A)
            .await
            .map_err(|_| NetworkError::DnsError)?
            .first()
            .copied()
            .ok_or(NetworkError::DnsError)?;

        let server_endpoint = IpEndpoint::new(server_ip, self.config.port);
        info!("Resolved {} to {}", server, Debug2Format(&server_endpoint));

        let mut rx_meta = [PacketMetadata::EMPTY; 2];
        let mut rx_buffer = [0u8; 64];
        let mut tx_meta = [PacketMetadata::EMPTY; 2];
        let mut tx_buffer = [0u8; 64];
        let mut socket = UdpSocket::new(
            *stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| NetworkError::SocketError)?;

        // LI=0, VN=3, Mode=3 (client)
        let mut request = [0u8; NTP_PACKET_LEN];
        request[0] = 0x1B;
        let transmit_time = Instant::now();
        socket
            .send_to(&request, server_endpoint)
            .await
            .map_err(|_| NetworkError::SocketError)?;

        let mut response = [0u8; NTP_PACKET_LEN];
        let timeout_future = Timer::after(Duration::from_millis(self.config.timeout_ms));
        let recv_future = socket.recv_from(&mut response);
        let (recv_len, from_addr) =
            match embassy_futures::select::select(timeout_future, recv_future).await {
                embassy_futures::select::Either::First(_) => return Err(NetworkError::Timeout),
                embassy_futures::select::Either::Second(result) => {
                    result.map_err(|_| NetworkError::SocketError)?
                }
            };
        let rtt = Instant::now().duration_since(transmit_time);

        if recv_len < NTP_PACKET_LEN || from_addr.endpoint.addr != server_ip {
            return Err(NetworkError::InvalidResponse);
        }

        let stratum = response[1];
        if stratum == 0 || stratum > self.config.max_stratum {
            warn!(
                "Invalid stratum {} (max {})",
                stratum, self.config.max_stratum
            );
            return Err(NetworkError::ServerError);
        }

        let tx_secs =
            u32::from_be_bytes([response[40], response[41], response[42], response[43]]) as u64;
        let tx_frac = u32::from_be_bytes([response[44], response[45], response[46], response[47]]);

        let rtt_correction_micros = rtt.as_micros() / 2;
        let timestamp = Timestamp::from_ntp(tx_secs, tx_frac).add_micros(rtt_correction_micros);

        info!(
            "NTP timestamp: {}.{:06} UTC (stratum {}, RTT correction: {} µs)",
            timestamp.unix_secs, timestamp.micros, stratum, rtt_correction_micros
        );
        Ok(timestamp)
    }
}

impl Default for SntpClient {
    fn default() -> Self {
        Self::new(SntpConfig::default())
    }
}

impl NetworkClient for SntpClient {
    type Output = Timestamp;

    async fn run(&mut self, stack: &Stack<'static>) -> Result<Self::Output, NetworkError> {
        self.sync(stack).await
    }
}

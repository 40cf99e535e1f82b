#![deny(unsafe_code)]
#![deny(warnings)]
//! TCP transport for the collector uplink
//!
//! Wraps one long-lived `embassy_net::tcp::TcpSocket`. Each request opens a
//! fresh connection on it and `close` aborts it back to the closed state, so
//! the buffers are reused for every upload.

use defmt::{debug, warn, Debug2Format};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpEndpoint, Stack};
use embassy_time::{with_timeout, Duration};
use embedded_io_async::{ErrorType, Read, Write};
use redlight_hal::{Transport, TransportError};

/// Deadline for DNS resolution plus the TCP handshake
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle timeout applied to the open connection
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Async TCP transport implementing `Transport` and the embedded-io-async traits
pub struct TcpTransport<'a> {
    stack: Stack<'a>,
    socket: TcpSocket<'a>,
}

impl<'a> TcpTransport<'a> {
    /// Create a transport over `stack` with caller-provided socket buffers
    pub fn new(stack: Stack<'a>, rx_buffer: &'a mut [u8], tx_buffer: &'a mut [u8]) -> Self {
        let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        Self { stack, socket }
    }

    async fn resolve(&self, host: &str) -> Result<embassy_net::IpAddress, TransportError> {
        let addrs = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|e| {
                warn!("DNS lookup for {} failed: {}", host, Debug2Format(&e));
                TransportError::Dns
            })?;
        addrs.first().copied().ok_or(TransportError::Dns)
    }

    /// Read one `\n`-terminated line, dropping `\r` and anything past `buf`
    async fn read_until_newline(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut len = 0;
        let mut byte = [0u8; 1];
        loop {
            if self.read(&mut byte).await? == 0 {
                return if len > 0 { Ok(len) } else { Err(TransportError::Closed) };
            }
            match byte[0] {
                b'\n' => return Ok(len),
                b'\r' => {}
                b if len < buf.len() => {
                    buf[len] = b;
                    len += 1;
                }
                _ => {}
            }
        }
    }

    async fn open(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        let addr = self.resolve(host).await?;
        let endpoint = IpEndpoint::new(addr, port);
        debug!("Connecting to {}", Debug2Format(&endpoint));
        self.socket.connect(endpoint).await.map_err(|e| {
            warn!("Connect to {} failed: {}", Debug2Format(&endpoint), Debug2Format(&e));
            TransportError::Connect
        })
    }
}

impl Transport for TcpTransport<'_> {
    async fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        match with_timeout(CONNECT_TIMEOUT, self.open(host, port)).await {
            Ok(result) => result,
            Err(_) => {
                self.socket.abort();
                Err(TransportError::Timeout)
            }
        }
    }

    async fn write_all(&mut self, mut buf: &[u8]) -> Result<(), TransportError> {
        while !buf.is_empty() {
            let written = self.write(buf).await?;
            buf = &buf[written..];
        }
        self.flush().await
    }

    async fn read_line(&mut self, buf: &mut [u8], timeout_ms: u64) -> Result<usize, TransportError> {
        with_timeout(Duration::from_millis(timeout_ms), self.read_until_newline(buf))
            .await
            .map_err(|_| TransportError::Timeout)?
    }

    async fn close(&mut self) {
        self.socket.abort();
        // Flush drives the abort (RST) out and returns once the socket is closed
        if let Err(e) = self.socket.flush().await {
            debug!("Socket flush on close: {}", Debug2Format(&e));
        }
    }
}

impl ErrorType for TcpTransport<'_> {
    type Error = TransportError;
}

impl Read for TcpTransport<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.socket
            .read(buf)
            .await
            .map_err(|_| TransportError::Read)
    }
}

impl Write for TcpTransport<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        match self.socket.write(buf).await {
            Ok(0) if !buf.is_empty() => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(_) => Err(TransportError::Write),
        }
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket
            .flush()
            .await
            .map_err(|_| TransportError::Write)
    }
}

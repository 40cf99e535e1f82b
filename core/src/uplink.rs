//! Collector uplink
//!
//! Each transmit cycle makes exactly one delivery attempt: the pending batch
//! if there is one, a heartbeat otherwise. The batch lock is held only to take
//! the snapshot and to acknowledge it, never across network I/O, so input
//! capture keeps appending while a request is in flight.

use heapless::String;
use redlight_hal::Transport;

use crate::batch::{BatchStore, Snapshot};
use crate::config::UplinkConfig;
use crate::error::UplinkError;
use crate::http::{self, STATUS_LINE_CAPACITY};
use crate::report::{body_capacity, StatusReport, BODY_CAPACITY};
use crate::time::ClockStatus;

/// Outcome of one transmit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeliveryResult {
    /// Collector answered 200; `sessions` were removed from the batch (0 for a heartbeat)
    Success { sessions: usize },
    /// Nothing was removed from the batch
    Failure(UplinkError),
}

impl DeliveryResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryResult::Success { .. })
    }
}

/// Delivery counters since boot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UplinkStats {
    pub successes: u32,
    pub failures: u32,
    pub consecutive_failures: u32,
    pub sessions_delivered: u32,
}

/// Batch transmitter
///
/// `B` is the JSON body buffer. It must hold a full batch, which
/// [`body_capacity`] sizes; `drain_and_send` fails to compile otherwise.
pub struct Uploader<'a, const B: usize = BODY_CAPACITY> {
    config: UplinkConfig<'a>,
    request_counter: u32,
    stats: UplinkStats,
}

impl<'a, const B: usize> Uploader<'a, B> {
    pub const fn new(config: UplinkConfig<'a>) -> Self {
        Self {
            config,
            request_counter: 0,
            stats: UplinkStats {
                successes: 0,
                failures: 0,
                consecutive_failures: 0,
                sessions_delivered: 0,
            },
        }
    }

    pub fn config(&self) -> &UplinkConfig<'a> {
        &self.config
    }

    /// Number of the last request attempted (0 before the first)
    pub fn request_number(&self) -> u32 {
        self.request_counter
    }

    pub fn stats(&self) -> UplinkStats {
        self.stats
    }

    /// Deliver the pending batch, or a heartbeat if it is empty
    ///
    /// On success exactly the delivered sessions are removed from the store;
    /// on failure the store is left as it was.
    pub async fn drain_and_send<T, S, const K: usize>(
        &mut self,
        transport: &mut T,
        store: &mut S,
        clock: ClockStatus,
        uptime_secs: u64,
    ) -> DeliveryResult
    where
        T: Transport,
        S: BatchStore<K>,
    {
        const { assert!(B >= body_capacity(K), "body buffer cannot hold a full batch") };

        let (snapshot, dropped): (Snapshot<K>, u32) =
            store.with_batch(|batch| (batch.take_snapshot(), batch.dropped()));

        if snapshot.is_empty() {
            return self.send_heartbeat(transport, clock, uptime_secs).await;
        }

        info!(
            "Uploading {} session(s) ({} dropped since boot)",
            snapshot.len(),
            dropped
        );
        for session in &snapshot {
            debug!(
                "  light {}: {} -> {} ({} s)",
                session.channel.number(),
                session.start.unix_secs,
                session.end.unix_secs,
                session.duration_secs()
            );
        }

        let request_number = self.next_request_number();
        let report = StatusReport::batch(
            self.config.device_id,
            request_number,
            uptime_secs,
            clock,
            &snapshot,
        );

        match self.post(transport, self.config.batch_path, &report).await {
            Ok(()) => {
                let delivered = snapshot.len();
                let remaining = store.with_batch(|batch| {
                    batch.acknowledge(delivered);
                    batch.count()
                });
                self.record_success(delivered);
                info!(
                    "Request #{}: delivered {} session(s), {} still pending",
                    request_number, delivered, remaining
                );
                DeliveryResult::Success {
                    sessions: delivered,
                }
            }
            Err(e) => self.record_failure(request_number, e),
        }
    }

    /// Send a status-only document
    pub async fn send_heartbeat<T: Transport>(
        &mut self,
        transport: &mut T,
        clock: ClockStatus,
        uptime_secs: u64,
    ) -> DeliveryResult {
        let request_number = self.next_request_number();
        let report =
            StatusReport::heartbeat(self.config.device_id, request_number, uptime_secs, clock);

        match self.post(transport, self.config.status_path, &report).await {
            Ok(()) => {
                self.record_success(0);
                debug!("Request #{}: heartbeat acknowledged", request_number);
                DeliveryResult::Success { sessions: 0 }
            }
            Err(e) => self.record_failure(request_number, e),
        }
    }

    /// Count a cycle that could not be attempted
    pub fn skip(&mut self, reason: UplinkError) -> DeliveryResult {
        self.stats.failures = self.stats.failures.saturating_add(1);
        self.stats.consecutive_failures = self.stats.consecutive_failures.saturating_add(1);
        warn!(
            "Transmit cycle skipped: {} ({} consecutive failures)",
            reason, self.stats.consecutive_failures
        );
        DeliveryResult::Failure(reason)
    }

    fn next_request_number(&mut self) -> u32 {
        self.request_counter = self.request_counter.wrapping_add(1);
        self.request_counter
    }

    fn record_success(&mut self, sessions: usize) {
        self.stats.successes = self.stats.successes.saturating_add(1);
        self.stats.consecutive_failures = 0;
        self.stats.sessions_delivered = self
            .stats
            .sessions_delivered
            .saturating_add(sessions as u32);
    }

    fn record_failure(&mut self, request_number: u32, e: UplinkError) -> DeliveryResult {
        self.stats.failures = self.stats.failures.saturating_add(1);
        self.stats.consecutive_failures = self.stats.consecutive_failures.saturating_add(1);
        warn!(
            "Request #{} failed: {} ({} consecutive failures), will retry",
            request_number, e, self.stats.consecutive_failures
        );
        DeliveryResult::Failure(e)
    }

    /// One POST: connect, send, read the status line, close
    async fn post<T: Transport>(
        &self,
        transport: &mut T,
        path: &str,
        report: &StatusReport<'_>,
    ) -> Result<(), UplinkError> {
        let body: String<B> = report.render()?;
        let head = http::write_post_head(
            self.config.host,
            path,
            self.config.user_agent,
            body.len(),
        )?;

        transport.connect(self.config.host, self.config.port).await?;
        let result = self.exchange(transport, head.as_bytes(), body.as_bytes()).await;
        transport.close().await;
        result
    }

    async fn exchange<T: Transport>(
        &self,
        transport: &mut T,
        head: &[u8],
        body: &[u8],
    ) -> Result<(), UplinkError> {
        transport.write_all(head).await?;
        transport.write_all(body).await?;

        let mut line = [0u8; STATUS_LINE_CAPACITY];
        let len = transport
            .read_line(&mut line, self.config.response_timeout_ms)
            .await?;
        match http::parse_status_line(&line[..len]) {
            Some(200) => Ok(()),
            Some(code) => Err(UplinkError::Status(code)),
            None => Err(UplinkError::MalformedResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::PendingBatch;
    use crate::session::{ChannelId, CompletedSession};
    use embassy_futures::block_on;
    use redlight_hal::{Timestamp, TransportError};

    /// Scripted transport that records every request
    #[derive(Default)]
    struct MockTransport {
        connect_error: Option<TransportError>,
        response: Option<&'static str>,
        connected: Option<(std::string::String, u16)>,
        written: Vec<u8>,
        requests: Vec<Vec<u8>>,
        closes: usize,
    }

    impl MockTransport {
        fn responding(line: &'static str) -> Self {
            Self {
                response: Some(line),
                ..Self::default()
            }
        }

        fn last_request(&self) -> &str {
            std::str::from_utf8(self.requests.last().unwrap()).unwrap()
        }

        fn last_body(&self) -> &str {
            self.last_request().split("\r\n\r\n").nth(1).unwrap()
        }
    }

    impl Transport for MockTransport {
        async fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
            if let Some(e) = self.connect_error {
                return Err(e);
            }
            self.connected = Some((host.into(), port));
            self.written.clear();
            Ok(())
        }

        async fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
            self.written.extend_from_slice(buf);
            Ok(())
        }

        async fn read_line(&mut self, buf: &mut [u8], _timeout_ms: u64) -> Result<usize, TransportError> {
            let line = self.response.ok_or(TransportError::Timeout)?;
            let len = line.len().min(buf.len());
            buf[..len].copy_from_slice(&line.as_bytes()[..len]);
            Ok(len)
        }

        async fn close(&mut self) {
            self.requests.push(core::mem::take(&mut self.written));
            self.connected = None;
            self.closes += 1;
        }
    }

    /// Store that appends a session on its second access, as if the input
    /// task ran while the request was in flight
    struct ConcurrentStore {
        batch: PendingBatch,
        accesses: usize,
        late: CompletedSession,
    }

    impl BatchStore<20> for ConcurrentStore {
        fn with_batch<R>(&mut self, f: impl FnOnce(&mut PendingBatch) -> R) -> R {
            self.accesses += 1;
            if self.accesses == 2 {
                self.batch.append(self.late);
            }
            f(&mut self.batch)
        }
    }

    /// Store that records every access and whether the closure changed the
    /// batch; `late` is appended right after the first access releases it
    struct RecordingStore {
        batch: PendingBatch,
        accesses: usize,
        mutating_accesses: usize,
        late: Option<CompletedSession>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                batch: PendingBatch::new(),
                accesses: 0,
                mutating_accesses: 0,
                late: None,
            }
        }
    }

    impl BatchStore<20> for RecordingStore {
        fn with_batch<R>(&mut self, f: impl FnOnce(&mut PendingBatch) -> R) -> R {
            self.accesses += 1;
            let before = (self.batch.take_snapshot(), self.batch.dropped());
            let result = f(&mut self.batch);
            if (self.batch.take_snapshot(), self.batch.dropped()) != before {
                self.mutating_accesses += 1;
            }
            if self.accesses == 1 {
                if let Some(late) = self.late.take() {
                    self.batch.append(late);
                }
            }
            result
        }
    }

    fn session(channel: u8, start: u64, end: u64) -> CompletedSession {
        CompletedSession {
            channel: ChannelId(channel),
            start: Timestamp::new(start, 0),
            end: Timestamp::new(end, 0),
        }
    }

    fn uploader() -> Uploader<'static> {
        Uploader::new(UplinkConfig {
            device_id: "redlight-test",
            ..UplinkConfig::default()
        })
    }

    fn running() -> ClockStatus {
        ClockStatus::running(Timestamp::new(1_000, 0))
    }

    #[test]
    fn test_heartbeat_when_empty() {
        let mut uploader = uploader();
        let mut transport = MockTransport::responding("HTTP/1.1 200 OK");
        let mut batch: PendingBatch = PendingBatch::new();

        let result = block_on(uploader.drain_and_send(&mut transport, &mut batch, running(), 12));

        assert_eq!(result, DeliveryResult::Success { sessions: 0 });
        assert!(transport.last_request().starts_with("POST /w5100 HTTP/1.1\r\n"));
        assert!(!transport.last_body().contains("traffic_light_sessions"));
        assert!(!transport.last_body().contains("total_sessions"));
        assert!(transport.last_body().contains(r#""request_number":1"#));
        assert!(batch.is_empty());
    }

    #[test]
    fn test_heartbeat_reads_batch_once_without_mutating() {
        let mut uploader = uploader();
        let mut transport = MockTransport::responding("HTTP/1.1 200 OK");
        let mut store = RecordingStore::new();

        let result = block_on(uploader.drain_and_send(&mut transport, &mut store, running(), 12));

        assert_eq!(result, DeliveryResult::Success { sessions: 0 });
        assert_eq!(store.accesses, 1);
        assert_eq!(store.mutating_accesses, 0);
    }

    #[test]
    fn test_append_during_heartbeat_survives() {
        let mut uploader = uploader();
        let mut transport = MockTransport::responding("HTTP/1.1 200 OK");
        let mut store = RecordingStore::new();
        store.late = Some(session(0, 300, 305));

        let result = block_on(uploader.drain_and_send(&mut transport, &mut store, running(), 12));

        assert_eq!(result, DeliveryResult::Success { sessions: 0 });
        assert!(transport.last_request().starts_with("POST /w5100 HTTP/1.1\r\n"));
        assert_eq!(store.accesses, 1);
        assert_eq!(store.mutating_accesses, 0);
        assert_eq!(store.batch.snapshot(), &[session(0, 300, 305)]);

        // Next cycle delivers it
        let result = block_on(uploader.drain_and_send(&mut transport, &mut store, running(), 17));
        assert_eq!(result, DeliveryResult::Success { sessions: 1 });
        assert!(store.batch.is_empty());
    }

    #[test]
    fn test_batch_success_clears() {
        let mut uploader = uploader();
        let mut transport = MockTransport::responding("HTTP/1.1 200 OK");
        let mut batch: PendingBatch = PendingBatch::new();
        batch.append(session(0, 100, 104));
        batch.append(session(1, 101, 109));

        let result = block_on(uploader.drain_and_send(&mut transport, &mut batch, running(), 60));

        assert_eq!(result, DeliveryResult::Success { sessions: 2 });
        assert_eq!(batch.count(), 0);
        assert_eq!(transport.connected, None);
        assert_eq!(transport.closes, 1);

        let request = transport.last_request();
        assert!(request.starts_with("POST /traffic_lights HTTP/1.1\r\n"));
        assert!(request.contains("Host: collector.local\r\n"));
        assert!(request.contains("Connection: close\r\n"));
        let body = transport.last_body();
        assert!(request.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert!(body.contains(r#""traffic_light_id":2,"start_timestamp":101,"end_timestamp":109"#));
        assert!(body.contains(r#""total_sessions":2"#));
        assert!(body.contains(r#""device_id":"redlight-test""#));
        assert_eq!(uploader.stats().sessions_delivered, 2);
    }

    #[test]
    fn test_non_ok_status_keeps_batch() {
        let mut uploader = uploader();
        let mut transport = MockTransport::responding("HTTP/1.1 500 Internal Server Error");
        let mut batch: PendingBatch = PendingBatch::new();
        batch.append(session(0, 100, 104));
        let before = batch.take_snapshot();

        let result = block_on(uploader.drain_and_send(&mut transport, &mut batch, running(), 60));

        assert_eq!(result, DeliveryResult::Failure(UplinkError::Status(500)));
        assert_eq!(batch.take_snapshot(), before);
        assert_eq!(transport.closes, 1);
    }

    #[test]
    fn test_connect_failure_keeps_batch() {
        let mut uploader = uploader();
        let mut transport = MockTransport {
            connect_error: Some(TransportError::Connect),
            ..MockTransport::default()
        };
        let mut batch: PendingBatch = PendingBatch::new();
        batch.append(session(0, 100, 104));

        let result = block_on(uploader.drain_and_send(&mut transport, &mut batch, running(), 60));

        assert_eq!(
            result,
            DeliveryResult::Failure(UplinkError::Transport(TransportError::Connect))
        );
        assert_eq!(batch.count(), 1);
        assert_eq!(uploader.stats().consecutive_failures, 1);
    }

    #[test]
    fn test_response_timeout_keeps_batch() {
        let mut uploader = uploader();
        let mut transport = MockTransport::default();
        let mut batch: PendingBatch = PendingBatch::new();
        batch.append(session(0, 100, 104));

        let result = block_on(uploader.drain_and_send(&mut transport, &mut batch, running(), 60));

        assert_eq!(
            result,
            DeliveryResult::Failure(UplinkError::Transport(TransportError::Timeout))
        );
        assert_eq!(batch.count(), 1);
        assert_eq!(transport.closes, 1);
    }

    #[test]
    fn test_malformed_response() {
        let mut uploader = uploader();
        let mut transport = MockTransport::responding("garbage");
        let mut batch: PendingBatch = PendingBatch::new();

        let result = block_on(uploader.drain_and_send(&mut transport, &mut batch, running(), 0));

        assert_eq!(result, DeliveryResult::Failure(UplinkError::MalformedResponse));
    }

    #[test]
    fn test_request_number_increments_per_attempt() {
        let mut uploader = uploader();
        let mut batch: PendingBatch = PendingBatch::new();
        let mut failing = MockTransport::responding("HTTP/1.1 404 Not Found");
        let mut ok = MockTransport::responding("HTTP/1.1 200 OK");

        block_on(uploader.drain_and_send(&mut failing, &mut batch, running(), 0));
        block_on(uploader.drain_and_send(&mut failing, &mut batch, running(), 5));
        block_on(uploader.drain_and_send(&mut ok, &mut batch, running(), 10));

        assert_eq!(uploader.request_number(), 3);
        assert!(ok.last_body().contains(r#""request_number":3"#));
        assert_eq!(uploader.stats().failures, 2);
        assert_eq!(uploader.stats().consecutive_failures, 0);
    }

    #[test]
    fn test_clock_stopped_reported() {
        let mut uploader = uploader();
        let mut transport = MockTransport::responding("HTTP/1.1 200 OK");
        let mut batch: PendingBatch = PendingBatch::new();

        block_on(uploader.drain_and_send(&mut transport, &mut batch, ClockStatus::stopped(), 0));

        assert!(transport.last_body().contains(r#""rtc_status":"not_running""#));
        assert!(!transport.last_body().contains("unix_timestamp"));
    }

    #[test]
    fn test_append_during_flight_survives() {
        let mut uploader = uploader();
        let mut transport = MockTransport::responding("HTTP/1.1 200 OK");
        let mut store = ConcurrentStore {
            batch: PendingBatch::new(),
            accesses: 0,
            late: session(1, 200, 201),
        };
        store.batch.append(session(0, 100, 104));

        let result = block_on(uploader.drain_and_send(&mut transport, &mut store, running(), 0));

        assert_eq!(result, DeliveryResult::Success { sessions: 1 });
        assert_eq!(store.batch.snapshot(), &[session(1, 200, 201)]);
        assert!(!transport.last_body().contains(r#""start_timestamp":200"#));
    }

    #[test]
    fn test_larger_batch_delivered_whole() {
        const K: usize = 25;
        let mut uploader: Uploader<'static, { body_capacity(K) }> = Uploader::new(UplinkConfig {
            device_id: "redlight-test",
            ..UplinkConfig::default()
        });
        let mut transport = MockTransport::responding("HTTP/1.1 200 OK");
        let mut batch: PendingBatch<K> = PendingBatch::new();
        for i in 0..K as u64 {
            assert!(batch.append(session((i % 2) as u8, 1_760_000_000 + i, 1_760_000_010 + i)));
        }

        let result = block_on(uploader.drain_and_send(&mut transport, &mut batch, running(), 60));

        assert_eq!(result, DeliveryResult::Success { sessions: K });
        assert!(batch.is_empty());
        assert_eq!(transport.closes, 1);
        assert!(transport.last_body().contains(r#""total_sessions":25"#));
        assert!(transport.last_body().contains(r#""start_timestamp":1760000024"#));
    }

    #[test]
    fn test_skip_counts_failure() {
        let mut uploader = uploader();
        assert_eq!(
            uploader.skip(UplinkError::NetworkDown),
            DeliveryResult::Failure(UplinkError::NetworkDown)
        );
        assert_eq!(uploader.request_number(), 0);
        assert_eq!(uploader.stats().failures, 1);
    }
}

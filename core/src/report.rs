//! JSON documents sent to the collector

use heapless::String;
use serde::{Serialize, Serializer};

use crate::batch::MAX_PENDING_SESSIONS;
use crate::error::UplinkError;
use crate::session::CompletedSession;
use crate::time::ClockStatus;

/// Worst-case bytes for one session record, separator included
pub const SESSION_RECORD_CAPACITY: usize = 104;

/// Worst-case bytes for every field outside the session list, with room for
/// a device id of up to 96 bytes
pub const REPORT_ENVELOPE_CAPACITY: usize = 320;

/// Buffer size that holds a document carrying `sessions` records
pub const fn body_capacity(sessions: usize) -> usize {
    REPORT_ENVELOPE_CAPACITY + sessions * SESSION_RECORD_CAPACITY
}

/// Body buffer for a full default-sized batch
pub const BODY_CAPACITY: usize = body_capacity(MAX_PENDING_SESSIONS);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RtcStatus {
    Running,
    NotRunning,
}

/// Status document: a heartbeat, or a heartbeat plus a session batch
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport<'a> {
    pub device_id: &'a str,
    pub request_number: u32,
    pub uptime_seconds: u64,
    pub rtc_status: RtcStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unix_timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic_light_sessions: Option<SessionList<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sessions: Option<usize>,
}

impl<'a> StatusReport<'a> {
    /// Document without session data
    pub fn heartbeat(
        device_id: &'a str,
        request_number: u32,
        uptime_seconds: u64,
        clock: ClockStatus,
    ) -> Self {
        let (rtc_status, unix_timestamp) = match clock.now() {
            Some(now) => (RtcStatus::Running, Some(now.unix_secs)),
            None => (RtcStatus::NotRunning, None),
        };
        Self {
            device_id,
            request_number,
            uptime_seconds,
            rtc_status,
            unix_timestamp,
            traffic_light_sessions: None,
            total_sessions: None,
        }
    }

    /// Document carrying `sessions`, oldest first
    pub fn batch(
        device_id: &'a str,
        request_number: u32,
        uptime_seconds: u64,
        clock: ClockStatus,
        sessions: &'a [CompletedSession],
    ) -> Self {
        Self {
            traffic_light_sessions: Some(SessionList(sessions)),
            total_sessions: Some(sessions.len()),
            ..Self::heartbeat(device_id, request_number, uptime_seconds, clock)
        }
    }

    /// Serialize to JSON
    pub fn render<const N: usize>(&self) -> Result<String<N>, UplinkError> {
        serde_json_core::to_string(self).map_err(|_| UplinkError::PayloadTooLarge)
    }
}

/// Sessions as they appear on the wire
#[derive(Debug, Clone, Copy)]
pub struct SessionList<'a>(pub &'a [CompletedSession]);

impl Serialize for SessionList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(SessionRecord::from))
    }
}

#[derive(Serialize)]
struct SessionRecord {
    /// 1-based light number
    traffic_light_id: u8,
    start_timestamp: u64,
    end_timestamp: u64,
}

impl From<&CompletedSession> for SessionRecord {
    fn from(session: &CompletedSession) -> Self {
        Self {
            traffic_light_id: session.channel.number(),
            start_timestamp: session.start.unix_secs,
            end_timestamp: session.end.unix_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ChannelId;
    use redlight_hal::Timestamp;

    fn session(channel: u8, start: u64, end: u64) -> CompletedSession {
        CompletedSession {
            channel: ChannelId(channel),
            start: Timestamp::new(start, 0),
            end: Timestamp::new(end, 999_999),
        }
    }

    #[test]
    fn test_heartbeat_clock_stopped() {
        let report = StatusReport::heartbeat("redlight-01", 3, 42, ClockStatus::stopped());
        let json: String<256> = report.render().unwrap();
        assert_eq!(
            json.as_str(),
            r#"{"device_id":"redlight-01","request_number":3,"uptime_seconds":42,"rtc_status":"not_running"}"#
        );
    }

    #[test]
    fn test_heartbeat_clock_running() {
        let clock = ClockStatus::running(Timestamp::new(1_760_000_000, 500));
        let report = StatusReport::heartbeat("redlight-01", 1, 0, clock);
        let json: String<256> = report.render().unwrap();
        assert_eq!(
            json.as_str(),
            r#"{"device_id":"redlight-01","request_number":1,"uptime_seconds":0,"rtc_status":"running","unix_timestamp":1760000000}"#
        );
        assert!(!json.contains("traffic_light_sessions"));
    }

    #[test]
    fn test_batch_document() {
        let sessions = [session(0, 100, 104), session(1, 110, 111)];
        let clock = ClockStatus::running(Timestamp::new(120, 0));
        let report = StatusReport::batch("dev", 7, 60, clock, &sessions);
        let json: String<512> = report.render().unwrap();
        assert_eq!(
            json.as_str(),
            concat!(
                r#"{"device_id":"dev","request_number":7,"uptime_seconds":60,"rtc_status":"running","unix_timestamp":120,"#,
                r#""traffic_light_sessions":[{"traffic_light_id":1,"start_timestamp":100,"end_timestamp":104},"#,
                r#"{"traffic_light_id":2,"start_timestamp":110,"end_timestamp":111}],"total_sessions":2}"#
            )
        );
    }

    #[test]
    fn test_full_batch_fits_body() {
        let sessions = [session(1, 4_102_444_800, 4_102_444_900); MAX_PENDING_SESSIONS];
        let clock = ClockStatus::running(Timestamp::new(4_102_445_000, 0));
        let report = StatusReport::batch(
            "redlight-0123456789abcdef01234567",
            u32::MAX,
            u64::MAX,
            clock,
            &sessions,
        );
        let json: Result<String<BODY_CAPACITY>, _> = report.render();
        assert!(json.is_ok());
    }

    #[test]
    fn test_worst_case_batch_fits_derived_capacity() {
        const K: usize = 40;
        let record = CompletedSession {
            channel: ChannelId(254),
            start: Timestamp::new(u64::MAX, 0),
            end: Timestamp::new(u64::MAX, 0),
        };
        let sessions = [record; K];
        let device_id = core::str::from_utf8(&[b'x'; 96]).unwrap();
        let report = StatusReport::batch(
            device_id,
            u32::MAX,
            u64::MAX,
            ClockStatus::stopped(),
            &sessions,
        );
        let json: String<{ body_capacity(K) }> = report.render().unwrap();
        assert!(json.contains(r#""traffic_light_id":255"#));
        assert!(json.ends_with(r#""total_sessions":40}"#));
    }

    #[test]
    fn test_render_overflow() {
        let sessions = [session(0, 1, 2); 4];
        let report = StatusReport::batch("dev", 1, 1, ClockStatus::stopped(), &sessions);
        let json: Result<String<64>, _> = report.render();
        assert_eq!(json, Err(UplinkError::PayloadTooLarge));
    }
}

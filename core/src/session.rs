//! Red-light session tracking
//!
//! A session opens when a channel's debounced state goes active with the
//! clock running and closes on the next inactive transition. Without a
//! running clock the interval is not recorded at all.

use redlight_hal::Timestamp;

use crate::debounce::SignalState;

/// Zero-based index of a monitored channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelId(pub u8);

impl ChannelId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// One-based identifier used on the wire and in logs
    pub const fn number(self) -> u8 {
        self.0 + 1
    }
}

/// A closed red-light interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompletedSession {
    pub channel: ChannelId,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl CompletedSession {
    /// Whole seconds between start and end
    pub fn duration_secs(&self) -> u64 {
        self.end.unix_secs.saturating_sub(self.start.unix_secs)
    }

    pub fn duration_millis(&self) -> u64 {
        self.end
            .as_unix_millis()
            .saturating_sub(self.start.as_unix_millis())
    }
}

/// Open/close pairing for one channel
#[derive(Debug, Clone, Copy)]
pub struct SessionTracker {
    channel: ChannelId,
    open_start: Option<Timestamp>,
}

impl SessionTracker {
    pub const fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            open_start: None,
        }
    }

    /// Start time of the open session, if any
    pub fn open_since(&self) -> Option<Timestamp> {
        self.open_start
    }

    pub fn has_open_session(&self) -> bool {
        self.open_start.is_some()
    }

    /// Apply a debounced transition observed at wall-clock `now`
    ///
    /// Returns the completed session when an open session closes.
    pub fn on_transition(
        &mut self,
        state: SignalState,
        now: Timestamp,
        clock_running: bool,
    ) -> Option<CompletedSession> {
        match state {
            SignalState::Active => {
                if clock_running {
                    self.open_start = Some(now);
                    info!(
                        "Light {}: RED ON at {}",
                        self.channel.number(),
                        now.unix_secs
                    );
                } else {
                    self.open_start = None;
                    warn!(
                        "Light {}: RED ON, clock not running - interval not recorded",
                        self.channel.number()
                    );
                }
                None
            }
            SignalState::Inactive => {
                let start = match self.open_start.take() {
                    Some(start) => start,
                    None => {
                        warn!(
                            "Light {}: RED OFF with no open session",
                            self.channel.number()
                        );
                        return None;
                    }
                };

                if !clock_running {
                    warn!(
                        "Light {}: RED OFF, clock not running - session dropped",
                        self.channel.number()
                    );
                    return None;
                }

                let end = if now < start {
                    warn!(
                        "Light {}: clock moved backwards during session ({} < {}), clamping",
                        self.channel.number(),
                        now.unix_secs,
                        start.unix_secs
                    );
                    start
                } else {
                    now
                };

                let session = CompletedSession {
                    channel: self.channel,
                    start,
                    end,
                };
                info!(
                    "Light {}: RED OFF at {} ({} s)",
                    self.channel.number(),
                    end.unix_secs,
                    session.duration_secs()
                );
                Some(session)
            }
        }
    }
}

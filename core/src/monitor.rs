//! Multi-channel signal monitor
//!
//! Owns one [`Channel`] per monitored line. Each tick samples every pin,
//! debounces it, and feeds committed transitions to that channel's session
//! tracker; completed sessions go straight into the pending batch.

use embedded_hal::digital::InputPin;
use redlight_hal::{Timestamp, WallClock};

use crate::batch::PendingBatch;
use crate::config::{ChannelConfig, MonitorConfig};
use crate::debounce::{ActiveLevel, Debouncer, SignalState, StableTransition};
use crate::session::{ChannelId, CompletedSession, SessionTracker};
use crate::time::ClockStatus;

/// One monitored signal line
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    id: ChannelId,
    pin: u8,
    active_level: ActiveLevel,
    debouncer: Debouncer,
    session: SessionTracker,
}

impl Channel {
    fn new(id: ChannelId, config: ChannelConfig, initial: SignalState, debounce_ms: u64) -> Self {
        Self {
            id,
            pin: config.pin,
            active_level: config.active_level,
            debouncer: Debouncer::new(initial, debounce_ms),
            session: SessionTracker::new(id),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn state(&self) -> SignalState {
        self.debouncer.stable_state()
    }

    pub fn is_settling(&self) -> bool {
        self.debouncer.is_settling()
    }

    pub fn open_since(&self) -> Option<Timestamp> {
        self.session.open_since()
    }

    /// Debounce one raw pin level
    pub fn poll(&mut self, level_high: bool, now_ms: u64) -> Option<StableTransition> {
        let raw = self.active_level.state(level_high);
        self.debouncer
            .poll(raw, now_ms)
            .map(|state| StableTransition {
                channel: self.id,
                state,
            })
    }
}

/// Counters since boot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorStats {
    /// Debounced transitions on all channels
    pub transitions: u32,
    /// Sessions closed (queued or dropped)
    pub sessions_completed: u32,
    /// Pin reads that returned an error
    pub read_errors: u32,
}

/// Debounced monitor for `N` signal lines
pub struct SignalMonitor<const N: usize> {
    channels: [Channel; N],
    stats: MonitorStats,
}

impl<const N: usize> SignalMonitor<N> {
    /// Build the monitor from the current pin levels
    ///
    /// Every channel's stable state is its first read; a pin that cannot be
    /// read starts inactive.
    pub fn new<P: InputPin>(
        config: &MonitorConfig,
        channels: [ChannelConfig; N],
        pins: &mut [P; N],
    ) -> Self {
        let mut levels = [false; N];
        for (i, (pin, level)) in pins.iter_mut().zip(levels.iter_mut()).enumerate() {
            *level = match pin.is_high() {
                Ok(high) => high,
                Err(e) => {
                    warn!("Light {}: initial read failed: {:?}", i + 1, debug2format!(e));
                    // Reads as the inactive level
                    channels[i].active_level == ActiveLevel::Low
                }
            };
        }
        Self::with_levels(config, channels, levels)
    }

    /// Build the monitor from explicit initial levels (`true` = high)
    pub fn with_levels(config: &MonitorConfig, channels: [ChannelConfig; N], levels: [bool; N]) -> Self {
        const { assert!(N <= u8::MAX as usize, "at most 255 channels") };

        let channels = core::array::from_fn(|i| {
            let cfg = channels[i];
            let initial = cfg.active_level.state(levels[i]);
            info!(
                "Light {} (pin {}): {}",
                i + 1,
                cfg.pin,
                if initial.is_active() { "RED" } else { "not red" }
            );
            Channel::new(ChannelId(i as u8), cfg, initial, config.debounce_ms)
        });
        Self {
            channels,
            stats: MonitorStats::default(),
        }
    }

    pub fn channels(&self) -> &[Channel; N] {
        &self.channels
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// Sample every pin once at monotonic time `now_ms`
    pub fn poll<P, C, const K: usize>(
        &mut self,
        pins: &mut [P; N],
        now_ms: u64,
        clock: &mut C,
        batch: &mut PendingBatch<K>,
    ) where
        P: InputPin,
        C: WallClock,
    {
        for (index, pin) in pins.iter_mut().enumerate() {
            match pin.is_high() {
                Ok(level_high) => {
                    self.observe(index, level_high, now_ms, clock, batch);
                }
                Err(e) => {
                    self.stats.read_errors = self.stats.read_errors.saturating_add(1);
                    debug!("Light {}: read failed: {:?}", index + 1, debug2format!(e));
                }
            }
        }
    }

    /// Feed one raw level for channel `index`
    ///
    /// The wall clock is read only when a transition commits. Returns the
    /// session closed by this sample, whether or not the batch accepted it.
    pub fn observe<C, const K: usize>(
        &mut self,
        index: usize,
        level_high: bool,
        now_ms: u64,
        clock: &mut C,
        batch: &mut PendingBatch<K>,
    ) -> Option<CompletedSession>
    where
        C: WallClock,
    {
        let channel = self.channels.get_mut(index)?;
        let transition = channel.poll(level_high, now_ms)?;
        self.stats.transitions = self.stats.transitions.saturating_add(1);

        let status = ClockStatus::read(clock);
        let now = status.now().unwrap_or(Timestamp::EPOCH);
        let session = channel
            .session
            .on_transition(transition.state, now, status.is_running())?;
        self.stats.sessions_completed = self.stats.sessions_completed.saturating_add(1);

        if batch.append(session) {
            info!(
                "Light {}: session queued ({} pending)",
                session.channel.number(),
                batch.count()
            );
        } else {
            error!(
                "Light {}: pending batch full ({}), session lost ({} lost since boot)",
                session.channel.number(),
                batch.capacity(),
                batch.dropped()
            );
        }
        Some(session)
    }

    /// Log the state of every channel
    pub fn log_status(&self) {
        for channel in &self.channels {
            match channel.open_since() {
                Some(start) => info!(
                    "Light {}: RED since {}",
                    channel.id().number(),
                    start.unix_secs
                ),
                None => info!(
                    "Light {}: {}",
                    channel.id().number(),
                    if channel.state().is_active() { "RED (untimed)" } else { "not red" }
                ),
            }
        }
    }
}

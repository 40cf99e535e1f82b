//! Delay-based debouncing of a digital signal line
//!
//! A new level is accepted only after it has differed from the stable state
//! for the whole settle window, measured from the first differing sample.
//! Returning to the stable level before the window elapses discards the
//! glitch without touching the stable state.

use crate::session::ChannelId;

/// Debounced state of a monitored signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalState {
    /// Red lamp off
    Inactive,
    /// Red lamp lit
    Active,
}

impl SignalState {
    pub fn is_active(self) -> bool {
        self == SignalState::Active
    }
}

/// Electrical level that corresponds to `SignalState::Active`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActiveLevel {
    High,
    Low,
}

impl ActiveLevel {
    /// Map a raw pin level (`true` = high) to a signal state
    pub fn state(self, level_high: bool) -> SignalState {
        match (self, level_high) {
            (ActiveLevel::High, true) | (ActiveLevel::Low, false) => SignalState::Active,
            _ => SignalState::Inactive,
        }
    }
}

/// A committed change of debounced state on one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StableTransition {
    pub channel: ChannelId,
    pub state: SignalState,
}

/// Settle-window debouncer for one signal
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    stable: SignalState,
    /// Monotonic time of the first sample that differed from `stable`
    observed_at_ms: u64,
    settling: bool,
    window_ms: u64,
}

impl Debouncer {
    /// Start from a known stable state (the first read at startup)
    pub const fn new(initial: SignalState, window_ms: u64) -> Self {
        Self {
            stable: initial,
            observed_at_ms: 0,
            settling: false,
            window_ms,
        }
    }

    pub fn stable_state(&self) -> SignalState {
        self.stable
    }

    pub fn is_settling(&self) -> bool {
        self.settling
    }

    /// Feed one raw sample taken at monotonic time `now_ms`
    ///
    /// Returns the new stable state when a change commits.
    pub fn poll(&mut self, raw: SignalState, now_ms: u64) -> Option<SignalState> {
        if raw == self.stable {
            self.settling = false;
            return None;
        }

        if !self.settling {
            self.observed_at_ms = now_ms;
            self.settling = true;
            return None;
        }

        if now_ms.saturating_sub(self.observed_at_ms) >= self.window_ms {
            self.stable = raw;
            self.settling = false;
            return Some(raw);
        }

        None
    }
}

//! Clock status as seen by the capture core and the uplink, and the policy
//! for applying a network time sync result to the wall clock

use redlight_hal::{Timestamp, WallClock};

/// Snapshot of the wall clock taken at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockStatus {
    now: Option<Timestamp>,
}

impl ClockStatus {
    /// Clock running at `now`
    pub const fn running(now: Timestamp) -> Self {
        Self { now: Some(now) }
    }

    /// Clock stopped; no trustworthy time
    pub const fn stopped() -> Self {
        Self { now: None }
    }

    /// Read the clock, treating a failed read as stopped
    pub fn read<C: WallClock>(clock: &mut C) -> Self {
        if !clock.is_running() {
            return Self::stopped();
        }
        match clock.now() {
            Ok(now) => Self::running(now),
            Err(e) => {
                warn!("Clock reports running but read failed: {:?}", debug2format!(e));
                Self::stopped()
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.now.is_some()
    }

    /// Current time if the clock is running
    pub fn now(&self) -> Option<Timestamp> {
        self.now
    }
}

/// Where the wall clock's time came from after a sync attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeSource {
    /// Set from the network time service
    Network,
    /// Sync failed; the clock kept running on its last-known time
    LastKnown,
    /// Sync failed on a stopped clock; seeded with the firmware build time
    BuildTime,
    /// Clock could not be set at all
    Unavailable,
}

/// Apply the outcome of a time sync to `clock`
///
/// A synced time is written as is. Without one, a running clock is left
/// alone and a stopped clock is started from `build_time`.
pub fn apply_sync<C: WallClock>(
    clock: &mut C,
    synced: Option<Timestamp>,
    build_time: Timestamp,
) -> TimeSource {
    if let Some(time) = synced {
        match clock.adjust(time) {
            Ok(()) => {
                info!("Clock set from network: {}.{:06} UTC", time.unix_secs, time.micros);
                return TimeSource::Network;
            }
            Err(e) => warn!("Failed to set clock: {:?}", debug2format!(e)),
        }
    }

    if clock.is_running() {
        warn!("Time sync unavailable, keeping last-known clock time");
        return TimeSource::LastKnown;
    }

    match clock.adjust(build_time) {
        Ok(()) => {
            warn!("Clock was stopped, seeded with build time {}", build_time.unix_secs);
            TimeSource::BuildTime
        }
        Err(e) => {
            error!("Clock stopped and cannot be set: {:?}", debug2format!(e));
            TimeSource::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FixedClock {
        running: bool,
        fail_reads: bool,
        fail_writes: bool,
        set_to: Option<Timestamp>,
    }

    impl WallClock for FixedClock {
        type Error = ();

        fn now(&mut self) -> Result<Timestamp, ()> {
            if self.fail_reads {
                Err(())
            } else {
                Ok(self.set_to.unwrap_or(Timestamp::new(1_767_571_200, 0)))
            }
        }

        fn is_running(&mut self) -> bool {
            self.running
        }

        fn adjust(&mut self, time: Timestamp) -> Result<(), ()> {
            if self.fail_writes {
                return Err(());
            }
            self.set_to = Some(time);
            self.running = true;
            Ok(())
        }
    }

    const BUILD: Timestamp = Timestamp::new(1_760_000_000, 0);

    #[test]
    fn test_read_running_clock() {
        let mut clock = FixedClock {
            running: true,
            ..FixedClock::default()
        };
        let status = ClockStatus::read(&mut clock);
        assert!(status.is_running());
        assert_eq!(status.now(), Some(Timestamp::new(1_767_571_200, 0)));
    }

    #[test]
    fn test_read_stopped_clock() {
        let mut clock = FixedClock::default();
        assert_eq!(ClockStatus::read(&mut clock), ClockStatus::stopped());
    }

    #[test]
    fn test_failed_read_counts_as_stopped() {
        let mut clock = FixedClock {
            running: true,
            fail_reads: true,
            ..FixedClock::default()
        };
        assert!(!ClockStatus::read(&mut clock).is_running());
    }

    #[test]
    fn test_sync_sets_clock() {
        let mut clock = FixedClock::default();
        let synced = Timestamp::new(1_767_571_234, 250_000);
        assert_eq!(apply_sync(&mut clock, Some(synced), BUILD), TimeSource::Network);
        assert_eq!(clock.set_to, Some(synced));
    }

    #[test]
    fn test_failed_sync_keeps_running_clock() {
        let mut clock = FixedClock {
            running: true,
            ..FixedClock::default()
        };
        assert_eq!(apply_sync(&mut clock, None, BUILD), TimeSource::LastKnown);
        assert_eq!(clock.set_to, None);
    }

    #[test]
    fn test_failed_sync_seeds_stopped_clock() {
        let mut clock = FixedClock::default();
        assert_eq!(apply_sync(&mut clock, None, BUILD), TimeSource::BuildTime);
        assert_eq!(clock.set_to, Some(BUILD));
        assert!(clock.running);
    }

    #[test]
    fn test_unwritable_clock() {
        let mut clock = FixedClock {
            fail_writes: true,
            ..FixedClock::default()
        };
        assert_eq!(
            apply_sync(&mut clock, Some(Timestamp::new(5, 0)), BUILD),
            TimeSource::Unavailable
        );
    }
}

//! Connection state tracking.
//!
//! The transport is polled once per loop iteration for a raw "connected"
//! flag. The tracker turns that level into `Established` / `Lost` edges
//! and keeps the two timestamps the sleep policy works from: when a host
//! was last connected, and when a button was last active.
//!
//! Losing the host is an expected, recoverable condition; the only
//! consequence of staying disconnected is the give-up sleep.

use crate::config::{CONNECTION_GIVE_UP_DURATION_MS, REPORT_BUTTONS_CHANGED_INTERVAL_MS};
use crate::power_logic::{self, SleepReason};
use crate::time::{IntervalTimer, Millis};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// No host has connected since power-on.
    Disconnected,
    /// A host was connected before and the link dropped.
    Connecting,
    Connected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionEdge {
    Established,
    Lost,
}

#[derive(Debug)]
pub struct ConnectionTracker {
    state: ConnectionState,
    /// Refreshed every iteration while connected.
    last_connected: IntervalTimer,
    /// Last button activity; also gates button sampling.
    activity: IntervalTimer,
}

impl ConnectionTracker {
    pub const fn new(now: Millis) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            last_connected: IntervalTimer::armed_at(now, CONNECTION_GIVE_UP_DURATION_MS),
            activity: IntervalTimer::armed_at(now, REPORT_BUTTONS_CHANGED_INTERVAL_MS),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Feed this iteration's raw connection status.
    pub fn update(&mut self, now: Millis, connected: bool) -> Option<ConnectionEdge> {
        let edge = match (self.is_connected(), connected) {
            (false, true) => {
                self.state = ConnectionState::Connected;
                // Don't fall asleep right after pairing.
                self.activity.rearm(now);
                Some(ConnectionEdge::Established)
            }
            (true, false) => {
                self.state = ConnectionState::Connecting;
                Some(ConnectionEdge::Lost)
            }
            _ => None,
        };

        if connected {
            self.last_connected.rearm(now);
        }

        edge
    }

    pub fn since_last_connected(&self, now: Millis) -> Millis {
        self.last_connected.elapsed(now)
    }

    pub fn since_activity(&self, now: Millis) -> Millis {
        self.activity.elapsed(now)
    }

    pub fn activity_mut(&mut self) -> &mut IntervalTimer {
        &mut self.activity
    }

    pub fn sleep_reason(&self, now: Millis) -> Option<SleepReason> {
        power_logic::sleep_reason(
            self.is_connected(),
            self.since_last_connected(now),
            self.since_activity(now),
        )
    }

    /// Start a fresh connect attempt after waking from sleep.
    pub fn restart(&mut self, now: Millis) {
        self.last_connected.rearm(now);
        self.activity.rearm(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        let tracker = ConnectionTracker::new(0);
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
        assert!(!tracker.is_connected());
    }

    #[test]
    fn edges_are_reported_once() {
        let mut tracker = ConnectionTracker::new(0);
        assert_eq!(tracker.update(10, false), None);
        assert_eq!(tracker.update(20, true), Some(ConnectionEdge::Established));
        assert_eq!(tracker.update(30, true), None);
        assert_eq!(tracker.update(40, false), Some(ConnectionEdge::Lost));
        assert_eq!(tracker.state(), ConnectionState::Connecting);
        assert_eq!(tracker.update(50, false), None);
        assert_eq!(tracker.update(60, true), Some(ConnectionEdge::Established));
    }

    #[test]
    fn established_resets_activity() {
        let mut tracker = ConnectionTracker::new(0);
        tracker.update(5_000, true);
        assert_eq!(tracker.since_activity(5_000), 0);
        assert_eq!(tracker.since_activity(5_400), 400);
    }

    #[test]
    fn last_connected_follows_connected_ticks() {
        let mut tracker = ConnectionTracker::new(0);
        tracker.update(100, true);
        tracker.update(200, true);
        tracker.update(300, false);
        assert_eq!(tracker.since_last_connected(300), 100);
    }

    #[test]
    fn gives_up_after_duration_without_connection() {
        let mut tracker = ConnectionTracker::new(0);
        tracker.update(1_000, true);
        tracker.update(1_001, false);
        assert_eq!(tracker.sleep_reason(31_000), None);
        assert_eq!(
            tracker.sleep_reason(31_001),
            Some(SleepReason::GaveUpConnecting)
        );
    }

    #[test]
    fn never_paired_gives_up_from_power_on() {
        let tracker = ConnectionTracker::new(500);
        assert_eq!(tracker.sleep_reason(30_500), None);
        assert_eq!(
            tracker.sleep_reason(30_501),
            Some(SleepReason::GaveUpConnecting)
        );
    }

    #[test]
    fn restart_rearms_give_up() {
        let mut tracker = ConnectionTracker::new(0);
        assert_eq!(
            tracker.sleep_reason(40_000),
            Some(SleepReason::GaveUpConnecting)
        );
        tracker.restart(40_000);
        assert_eq!(tracker.sleep_reason(70_000), None);
        assert_eq!(tracker.since_activity(40_000), 0);
    }
}

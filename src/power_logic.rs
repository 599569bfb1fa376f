//! When to stop and sleep.

use crate::config::{
    CONNECTION_GIVE_UP_DURATION_MS, IDLE_SLEEP_DURATION_MS, SHUTDOWN_BOND_FLUSH_TIMEOUT_MS,
    SHUTDOWN_LINK_DOWN_TIMEOUT_MS,
};
use crate::time::Millis;

/// Why the remote decided to enter low-power sleep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepReason {
    /// No host connected within the give-up duration.
    GaveUpConnecting,
    /// Connected, but no button was pressed for the idle duration.
    Idle,
}

/// Decide whether to sleep based on connection state and inactivity.
pub fn sleep_reason(
    connected: bool,
    since_last_connected: Millis,
    since_activity: Millis,
) -> Option<SleepReason> {
    if !connected {
        return (since_last_connected > CONNECTION_GIVE_UP_DURATION_MS)
            .then_some(SleepReason::GaveUpConnecting);
    }

    (since_activity > IDLE_SLEEP_DURATION_MS).then_some(SleepReason::Idle)
}

/// Work done between the sleep decision and System OFF.
///
/// The host link has to close first so its CCCD state lands in the bond,
/// then the bond has to reach flash; System OFF loses everything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShutdownStep {
    /// Wait for the transport to drop the host connection.
    CloseLink,
    /// Wait for pending bond writes to finish.
    FlushBond,
    /// Nothing left to wait for.
    PowerOff,
}

impl ShutdownStep {
    /// First step for a remote that is (or is not) still linked to a host.
    pub const fn first(link_up: bool) -> Self {
        if link_up {
            ShutdownStep::CloseLink
        } else {
            ShutdownStep::FlushBond
        }
    }

    pub const fn next(self) -> Self {
        match self {
            ShutdownStep::CloseLink => ShutdownStep::FlushBond,
            ShutdownStep::FlushBond | ShutdownStep::PowerOff => ShutdownStep::PowerOff,
        }
    }

    /// Upper bound on the wait, so a stuck link or flash still powers off.
    pub const fn timeout_ms(self) -> Millis {
        match self {
            ShutdownStep::CloseLink => SHUTDOWN_LINK_DOWN_TIMEOUT_MS,
            ShutdownStep::FlushBond => SHUTDOWN_BOND_FLUSH_TIMEOUT_MS,
            ShutdownStep::PowerOff => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn give_up_is_strictly_after_duration() {
        assert_eq!(sleep_reason(false, 30_000, 0), None);
        assert_eq!(
            sleep_reason(false, 30_001, 0),
            Some(SleepReason::GaveUpConnecting)
        );
    }

    #[test]
    fn connected_ignores_give_up_duration() {
        assert_eq!(sleep_reason(true, 60_000, 0), None);
    }

    #[test]
    fn idle_sleep_only_when_connected() {
        assert_eq!(
            sleep_reason(true, 0, IDLE_SLEEP_DURATION_MS + 1),
            Some(SleepReason::Idle)
        );
        assert_eq!(sleep_reason(true, 0, IDLE_SLEEP_DURATION_MS), None);
        assert_eq!(sleep_reason(false, 0, IDLE_SLEEP_DURATION_MS + 1), None);
    }

    fn steps(link_up: bool) -> [ShutdownStep; 3] {
        let first = ShutdownStep::first(link_up);
        [first, first.next(), first.next().next()]
    }

    #[test]
    fn connected_shutdown_closes_link_before_flushing_bond() {
        assert_eq!(
            steps(true),
            [
                ShutdownStep::CloseLink,
                ShutdownStep::FlushBond,
                ShutdownStep::PowerOff
            ]
        );
    }

    #[test]
    fn unlinked_shutdown_still_flushes_bond() {
        assert_eq!(ShutdownStep::first(false), ShutdownStep::FlushBond);
        assert_eq!(ShutdownStep::FlushBond.next(), ShutdownStep::PowerOff);
        assert_eq!(ShutdownStep::PowerOff.next(), ShutdownStep::PowerOff);
    }

    #[test]
    fn every_wait_is_bounded() {
        assert!(ShutdownStep::CloseLink.timeout_ms() > 0);
        assert!(ShutdownStep::FlushBond.timeout_ms() > 0);
        assert_eq!(ShutdownStep::PowerOff.timeout_ms(), 0);
    }
}

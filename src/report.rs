//! Turns button samples into HID press/release reports.
//!
//! A report goes out only when the number of pressed buttons changes, so
//! holding a button produces one press report and one release report.

use crate::input::ButtonSampleSet;
use crate::platform::ConnectionProvider;

/// What the dispatcher sent to the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportEvent {
    /// Report with `count` active key codes.
    Press { count: usize },
    /// All keys released.
    Release,
}

#[derive(Debug, Default)]
pub struct ReportDispatcher {
    last_count: usize,
}

impl ReportDispatcher {
    pub const fn new() -> Self {
        Self { last_count: 0 }
    }

    /// Pressed-button count of the last dispatched sample.
    pub fn last_count(&self) -> usize {
        self.last_count
    }

    pub fn dispatch<P: ConnectionProvider>(
        &mut self,
        sample: &ButtonSampleSet,
        provider: &mut P,
    ) -> Option<ReportEvent> {
        let count = sample.count();
        let event = if count == self.last_count {
            None
        } else if count > 0 {
            provider.send_key_report(&sample.to_report_codes(), 0);
            Some(ReportEvent::Press { count })
        } else {
            provider.send_key_release();
            Some(ReportEvent::Release)
        };
        self.last_count = count;
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keyboard::{KeyCode, KEY_VOLUME_DOWN, MAX_REPORT_KEYS};
    use crate::platform::AdvertisingConfig;

    #[derive(Default)]
    struct Transport {
        reports: usize,
        releases: usize,
        last: Option<[KeyCode; MAX_REPORT_KEYS]>,
    }

    impl ConnectionProvider for Transport {
        fn is_connected(&self) -> bool {
            true
        }

        fn send_key_report(&mut self, keycodes: &[KeyCode; MAX_REPORT_KEYS], _modifier: u8) {
            self.reports += 1;
            self.last = Some(*keycodes);
        }

        fn send_key_release(&mut self) {
            self.releases += 1;
        }

        fn start_advertising(&mut self, _config: &AdvertisingConfig) {}

        fn stop_advertising(&mut self) {}

        fn report_battery(&mut self, _percent: u8) {}
    }

    fn sample(count: usize) -> ButtonSampleSet {
        let mut s = ButtonSampleSet::new();
        for _ in 0..count {
            s.push(KEY_VOLUME_DOWN);
        }
        s
    }

    #[test]
    fn unchanged_count_is_a_no_op() {
        let mut dispatcher = ReportDispatcher::new();
        let mut transport = Transport::default();
        assert_eq!(dispatcher.dispatch(&sample(0), &mut transport), None);
        assert_eq!(transport.reports + transport.releases, 0);
    }

    #[test]
    fn repeated_press_reports_once() {
        let mut dispatcher = ReportDispatcher::new();
        let mut transport = Transport::default();
        let events: [Option<ReportEvent>; 4] =
            core::array::from_fn(|_| dispatcher.dispatch(&sample(1), &mut transport));
        assert_eq!(events[0], Some(ReportEvent::Press { count: 1 }));
        assert!(events[1..].iter().all(Option::is_none));
        assert_eq!(transport.reports, 1);
    }

    #[test]
    fn press_report_pads_with_key_none() {
        let mut dispatcher = ReportDispatcher::new();
        let mut transport = Transport::default();
        dispatcher.dispatch(&sample(2), &mut transport);
        assert_eq!(
            transport.last,
            Some([KEY_VOLUME_DOWN, KEY_VOLUME_DOWN, 0, 0, 0, 0])
        );
    }

    #[test]
    fn drop_to_zero_releases() {
        let mut dispatcher = ReportDispatcher::new();
        let mut transport = Transport::default();
        dispatcher.dispatch(&sample(2), &mut transport);
        assert_eq!(
            dispatcher.dispatch(&sample(0), &mut transport),
            Some(ReportEvent::Release)
        );
        assert_eq!(transport.releases, 1);
        assert_eq!(dispatcher.last_count(), 0);
    }
}

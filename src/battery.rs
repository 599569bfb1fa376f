//! Battery level reporting.
//!
//! The level is sent once after every (re)connection and then every
//! `BATTERY_REPORT_INTERVAL_MS` while the host stays connected.

use crate::config::BATTERY_REPORT_INTERVAL_MS;
use crate::platform::{BatteryMonitor, ConnectionProvider};
use crate::time::{IntervalTimer, Millis};

/// SAADC full scale with gain 1/6 and the 0.6 V internal reference.
pub const ADC_FULL_SCALE_MV: u32 = 3600;

/// 12-bit conversion range.
pub const ADC_MAX_COUNT: u32 = 4096;

/// VBAT reaches the ADC through a 1:2 resistor divider.
pub const VBAT_DIVIDER: u32 = 2;

/// Convert a raw single-ended SAADC sample of the VBAT divider to cell millivolts.
/// Negative samples (noise around 0 V) read as 0.
pub fn adc_to_millivolts(raw: i16) -> u16 {
    let counts = raw.max(0) as u32;
    (counts * ADC_FULL_SCALE_MV * VBAT_DIVIDER / ADC_MAX_COUNT) as u16
}

/// Convert a LiPo cell voltage to a charge percentage.
///
/// Piecewise linear: below 3300 mV is empty, 3300..3600 mV covers 0..10 %,
/// 3600..4200 mV covers 10..100 %.
pub fn millivolts_to_percent(mv: u16) -> u8 {
    match mv {
        0..=3299 => 0,
        3300..=3599 => ((mv - 3300) / 30) as u8,
        _ => {
            let above = u32::from(mv - 3600);
            (10 + above * 15 / 100).min(100) as u8
        }
    }
}

#[derive(Debug)]
pub struct BatteryReporter {
    reported: bool,
    timer: IntervalTimer,
}

impl BatteryReporter {
    pub const fn new() -> Self {
        Self {
            reported: false,
            timer: IntervalTimer::new(BATTERY_REPORT_INTERVAL_MS),
        }
    }

    /// Whether the level went out since the last (re)connection.
    pub fn has_reported(&self) -> bool {
        self.reported
    }

    /// Forget the last report so the next connection sends one.
    pub fn reset(&mut self) {
        self.reported = false;
    }

    /// Report the level if one is owed. Returns the reported percentage.
    pub fn update<P, B>(
        &mut self,
        now: Millis,
        connected: bool,
        provider: &mut P,
        monitor: &mut B,
    ) -> Option<u8>
    where
        P: ConnectionProvider,
        B: BatteryMonitor,
    {
        if !connected || (self.reported && !self.timer.is_due(now)) {
            return None;
        }

        let percent = monitor.level_percent()?;
        provider.report_battery(percent);
        self.reported = true;
        self.timer.rearm(now);
        Some(percent)
    }
}

impl Default for BatteryReporter {
    fn default() -> Self {
        Self::new()
    }
}

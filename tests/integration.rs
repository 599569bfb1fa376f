//! Integration tests for the printer-remote control loop.
//!
//! These drive `Remote` end-to-end through mock transport, pins and
//! battery gauge, advancing a simulated millisecond clock.

mod common;

use common::*;
use printer_remote::config::{
    CONNECTION_BLINK_ON_DURATION_MS, CONNECTION_GIVE_UP_DURATION_MS, CONNECTION_LED_PIN,
    IDLE_SLEEP_DURATION_MS,
};
use printer_remote::connection::{ConnectionEdge, ConnectionState};
use printer_remote::input::Button;
use printer_remote::platform::Level;
use printer_remote::power_logic::SleepReason;
use printer_remote::report::ReportEvent;
use printer_remote::Remote;

type TestRemote<'a> = Remote<'a, MockHost, MockIo, MockBattery>;

fn remote(buttons: &[Button], battery: Option<u8>) -> TestRemote<'_> {
    Remote::new(
        buttons,
        MockHost::default(),
        MockIo::default(),
        MockBattery(battery),
    )
}

/// `begin(0)` and connect on the first tick.
fn connected_remote(buttons: &[Button]) -> TestRemote<'_> {
    let mut r = remote(buttons, None);
    r.begin(0);
    r.provider_mut().connected = true;
    assert_eq!(r.tick(0).edge, Some(ConnectionEdge::Established));
    r
}

#[test]
fn begin_starts_advertising_with_led_off() {
    let mut r = remote(&TWO_BUTTONS, None);
    r.begin(0);
    assert_eq!(r.provider().calls, vec![HostCall::StartAdvertising]);
    assert_eq!(r.io().level(CONNECTION_LED_PIN), Some(Level::Low));
    assert_eq!(r.connection_state(), ConnectionState::Disconnected);
}

#[test]
fn press_sequence_reports_only_changes() {
    let mut r = connected_remote(&TWO_BUTTONS);
    let steps: [(&[_], Option<ReportEvent>); 5] = [
        (&[], None),
        (&[PIN_A], Some(ReportEvent::Press { count: 1 })),
        (&[PIN_A], None),
        (&[PIN_A, PIN_B], Some(ReportEvent::Press { count: 2 })),
        (&[], Some(ReportEvent::Release)),
    ];

    for (i, (pressed, expected)) in steps.iter().enumerate() {
        r.io_mut().press(pressed);
        let now = 1_000 * (i as u32 + 1);
        assert_eq!(r.tick(now).report, *expected, "sampling tick {}", i);
    }

    assert_eq!(
        r.provider().key_calls(),
        vec![
            HostCall::Report([0x81, 0, 0, 0, 0, 0]),
            HostCall::Report([0x81, 0x80, 0, 0, 0, 0]),
            HostCall::Release,
        ]
    );
}

#[test]
fn held_button_is_reported_once() {
    let mut r = connected_remote(&TWO_BUTTONS);
    r.io_mut().press(&[PIN_B]);
    for step in 1..=20 {
        r.tick(step * 1_000);
    }
    assert_eq!(r.provider().key_calls(), vec![HostCall::Report([0x80, 0, 0, 0, 0, 0])]);
}

#[test]
fn sampling_waits_for_interval_after_press() {
    let mut r = connected_remote(&TWO_BUTTONS);
    r.io_mut().press(&[PIN_A]);
    assert_eq!(r.tick(999).report, None);
    assert_eq!(r.tick(1_000).report, Some(ReportEvent::Press { count: 1 }));

    r.io_mut().release_all();
    // Press at 1_000 re-armed the gate; release is only seen a second later.
    assert_eq!(r.tick(1_500).report, None);
    assert_eq!(r.tick(2_000).report, Some(ReportEvent::Release));
}

#[test]
fn buttons_ignored_while_disconnected() {
    let mut r = remote(&TWO_BUTTONS, None);
    r.begin(0);
    r.io_mut().press(&[PIN_A]);
    for now in (0..20_000).step_by(500) {
        assert_eq!(r.tick(now).report, None);
    }
    assert_eq!(r.io().reads, 0);
    assert!(r.provider().key_calls().is_empty());
}

#[test]
fn seventh_button_is_truncated() {
    let table = seven_buttons();
    let mut r = connected_remote(&table);
    let pins: Vec<_> = table.iter().map(|b| b.pin).collect();
    r.io_mut().press(&pins);

    assert_eq!(r.tick(1_000).report, Some(ReportEvent::Press { count: 6 }));
    assert_eq!(
        r.provider().key_calls(),
        vec![HostCall::Report([0x04, 0x05, 0x06, 0x07, 0x08, 0x09])]
    );
}

#[test]
fn connection_edges_alternate() {
    let mut r = remote(&TWO_BUTTONS, None);
    r.begin(0);

    // Deterministic pseudo-random connection samples.
    let mut seed: u32 = 0x1234_5678;
    let mut edges = Vec::new();
    for now in 0..2_000u32 {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        r.provider_mut().connected = (seed >> 28) & 1 == 1;
        if let Some(edge) = r.tick(now).edge {
            edges.push(edge);
        }
    }

    assert!(edges.len() > 10);
    for (i, edge) in edges.iter().enumerate() {
        let expected = if i % 2 == 0 {
            ConnectionEdge::Established
        } else {
            ConnectionEdge::Lost
        };
        assert_eq!(*edge, expected);
    }
}

#[test]
fn lost_connection_moves_to_connecting() {
    let mut r = connected_remote(&TWO_BUTTONS);
    r.provider_mut().connected = false;
    assert_eq!(r.tick(10).edge, Some(ConnectionEdge::Lost));
    assert_eq!(r.connection_state(), ConnectionState::Connecting);
}

#[test]
fn gives_up_connecting_after_duration() {
    let mut r = connected_remote(&TWO_BUTTONS);
    r.tick(100);
    r.provider_mut().connected = false;
    r.tick(101);

    for now in [1_000, 10_000, 20_000, 100 + CONNECTION_GIVE_UP_DURATION_MS] {
        assert_eq!(r.tick(now).sleep, None, "slept early at {}", now);
    }
    assert!(!r.is_asleep());

    let outcome = r.tick(100 + CONNECTION_GIVE_UP_DURATION_MS + 1);
    assert_eq!(outcome.sleep, Some(SleepReason::GaveUpConnecting));
    assert!(r.is_asleep());
    assert_eq!(r.provider().count(HostCall::StopAdvertising), 1);
    assert_eq!(r.io().level(CONNECTION_LED_PIN), Some(Level::Low));
}

#[test]
fn never_paired_gives_up_from_power_on() {
    let mut r = remote(&TWO_BUTTONS, None);
    r.begin(0);
    assert_eq!(r.tick(CONNECTION_GIVE_UP_DURATION_MS).sleep, None);
    assert_eq!(
        r.tick(CONNECTION_GIVE_UP_DURATION_MS + 1).sleep,
        Some(SleepReason::GaveUpConnecting)
    );
}

#[test]
fn asleep_ticks_do_nothing_until_wake() {
    let mut r = remote(&TWO_BUTTONS, None);
    r.begin(0);
    r.tick(CONNECTION_GIVE_UP_DURATION_MS + 1);
    assert!(r.is_asleep());

    let calls = r.provider().calls.len();
    let writes = r.io().writes.len();
    r.provider_mut().connected = true;
    assert!(r.tick(40_000).is_quiet());
    assert!(r.tick(41_000).is_quiet());
    assert_eq!(r.provider().calls.len(), calls);
    assert_eq!(r.io().writes.len(), writes);

    r.wake(50_000);
    assert!(!r.is_asleep());
    assert_eq!(r.provider().count(HostCall::StartAdvertising), 2);
    assert_eq!(r.tick(50_001).edge, Some(ConnectionEdge::Established));
}

#[test]
fn idle_connection_goes_to_sleep() {
    let mut r = connected_remote(&TWO_BUTTONS);
    r.io_mut().press(&[PIN_A]);
    r.tick(1_000);
    r.io_mut().release_all();

    assert_eq!(r.tick(1_000 + IDLE_SLEEP_DURATION_MS).sleep, None);
    assert_eq!(
        r.tick(1_000 + IDLE_SLEEP_DURATION_MS + 1).sleep,
        Some(SleepReason::Idle)
    );
}

#[test]
fn connected_led_pulses_once_per_ten_seconds() {
    let mut r = connected_remote(&TWO_BUTTONS);
    let mut high_ms = 0;
    let mut rising = 0;
    let mut cycle_start = 0;

    for now in 1..=30_000u32 {
        let outcome = r.tick(now);
        if r.state().indicator.cycle_start() != cycle_start {
            cycle_start = r.state().indicator.cycle_start();
        }
        if outcome.indicator == Some(Level::High) {
            rising += 1;
        }
        if now > 10_000 && now <= 20_000 && r.state().indicator.level() == Level::High {
            high_ms += 1;
            assert!(now - cycle_start <= CONNECTION_BLINK_ON_DURATION_MS);
        }
    }

    assert_eq!(rising, 2);
    assert_eq!(high_ms, CONNECTION_BLINK_ON_DURATION_MS);
}

#[test]
fn connecting_led_blinks_faster() {
    let mut r = remote(&TWO_BUTTONS, None);
    r.begin(0);
    let mut rising = 0;
    for now in 0..10_000u32 {
        if r.tick(now).indicator == Some(Level::High) {
            rising += 1;
        }
    }
    assert_eq!(rising, 10);
}

#[test]
fn repeated_tick_at_same_time_writes_nothing() {
    let mut r = connected_remote(&TWO_BUTTONS);
    r.tick(5);
    let writes = r.io().writes.len();
    assert_eq!(r.tick(5).indicator, None);
    assert_eq!(r.tick(5).indicator, None);
    assert_eq!(r.io().writes.len(), writes);
}

#[test]
fn battery_reported_per_connection() {
    let mut r = remote(&TWO_BUTTONS, Some(87));
    r.begin(0);
    r.provider_mut().connected = true;
    assert_eq!(r.tick(10).battery, Some(87));
    assert_eq!(r.tick(20).battery, None);

    r.provider_mut().connected = false;
    r.tick(30);
    r.battery_monitor_mut().0 = Some(86);
    r.provider_mut().connected = true;
    assert_eq!(r.tick(40).battery, Some(86));
    assert_eq!(r.provider().battery_calls(), vec![87, 86]);
}

#[test]
fn clock_wraparound_keeps_sampling() {
    let start = u32::MAX - 1_500;
    let mut r = remote(&TWO_BUTTONS, None);
    r.begin(start);
    r.provider_mut().connected = true;
    r.tick(start);

    r.io_mut().press(&[PIN_A]);
    assert_eq!(r.tick(start.wrapping_add(999)).report, None);
    assert_eq!(
        r.tick(start.wrapping_add(1_000)).report,
        Some(ReportEvent::Press { count: 1 })
    );
    r.io_mut().release_all();
    // Past the wrap: u32::MAX - 500 + 1_000.
    assert_eq!(
        r.tick(start.wrapping_add(2_000)).report,
        Some(ReportEvent::Release)
    );
}

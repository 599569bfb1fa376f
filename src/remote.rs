//! The control loop.
//!
//! `Remote::tick` runs one iteration: poll the transport and derive
//! connection edges, sample the buttons, dispatch a report if the pressed
//! count changed, report the battery, decide about sleep, and advance the
//! indicator. Every step compares timestamps; nothing blocks, so the loop
//! can be re-entered as fast as the clock advances.

use crate::battery::BatteryReporter;
use crate::config::{ADVERTISING, CONNECTION_LED_PIN};
use crate::connection::{ConnectionEdge, ConnectionState, ConnectionTracker};
use crate::indicator::IndicatorScheduler;
use crate::input::{Button, InputSampler};
use crate::platform::{BatteryMonitor, ConnectionProvider, DigitalIo, Level};
use crate::power_logic::SleepReason;
use crate::report::{ReportDispatcher, ReportEvent};
use crate::time::Millis;

/// Everything one loop iteration changed, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickOutcome {
    pub edge: Option<ConnectionEdge>,
    pub report: Option<ReportEvent>,
    /// New indicator level, if the pin was written.
    pub indicator: Option<Level>,
    /// Battery percentage sent to the host.
    pub battery: Option<u8>,
    /// Set on the iteration that put the remote to sleep.
    pub sleep: Option<SleepReason>,
}

impl TickOutcome {
    pub fn is_quiet(&self) -> bool {
        *self == Self::default()
    }
}

/// All mutable loop state, owned by [`Remote`].
#[derive(Debug)]
pub struct RemoteState {
    pub connection: ConnectionTracker,
    pub dispatcher: ReportDispatcher,
    pub indicator: IndicatorScheduler,
    pub battery: BatteryReporter,
    pub asleep: bool,
}

impl RemoteState {
    pub const fn new(now: Millis) -> Self {
        Self {
            connection: ConnectionTracker::new(now),
            dispatcher: ReportDispatcher::new(),
            indicator: IndicatorScheduler::new(CONNECTION_LED_PIN, now),
            battery: BatteryReporter::new(),
            asleep: false,
        }
    }
}

pub struct Remote<'a, P, D, B> {
    provider: P,
    io: D,
    battery: B,
    sampler: InputSampler<'a>,
    state: RemoteState,
}

impl<'a, P, D, B> Remote<'a, P, D, B>
where
    P: ConnectionProvider,
    D: DigitalIo,
    B: BatteryMonitor,
{
    pub fn new(buttons: &'a [Button], provider: P, io: D, battery: B) -> Self {
        Self {
            provider,
            io,
            battery,
            sampler: InputSampler::new(buttons),
            state: RemoteState::new(0),
        }
    }

    /// Power-on setup: drive the LED low, start advertising and arm the timers at `now`.
    pub fn begin(&mut self, now: Millis) {
        self.state = RemoteState::new(now);
        self.state.indicator.sync(&mut self.io);
        self.provider.start_advertising(&ADVERTISING);
    }

    /// Run one loop iteration at `now`.
    pub fn tick(&mut self, now: Millis) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.state.asleep {
            return outcome;
        }

        let state = &mut self.state;

        let connected = self.provider.is_connected();
        outcome.edge = state.connection.update(now, connected);
        if outcome.edge == Some(ConnectionEdge::Lost) {
            state.battery.reset();
        }

        if let Some(sample) =
            self.sampler
                .poll(now, connected, state.connection.activity_mut(), &mut self.io)
        {
            outcome.report = state.dispatcher.dispatch(&sample, &mut self.provider);
        }

        outcome.battery =
            state
                .battery
                .update(now, connected, &mut self.provider, &mut self.battery);

        if let Some(reason) = state.connection.sleep_reason(now) {
            self.provider.stop_advertising();
            state.asleep = true;
            outcome.indicator = state.indicator.set(Level::Low, &mut self.io);
            outcome.sleep = Some(reason);
            return outcome;
        }

        outcome.indicator = state.indicator.update(now, connected, &mut self.io);
        outcome
    }

    /// Resume after sleep: restart advertising and give the host a fresh
    /// give-up window.
    pub fn wake(&mut self, now: Millis) {
        if !self.state.asleep {
            return;
        }
        self.state.asleep = false;
        self.state.connection.restart(now);
        self.state.indicator.restart(now);
        self.provider.start_advertising(&ADVERTISING);
    }

    pub fn is_asleep(&self) -> bool {
        self.state.asleep
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.connection.state()
    }

    pub fn state(&self) -> &RemoteState {
        &self.state
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn io(&self) -> &D {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut D {
        &mut self.io
    }

    pub fn battery_monitor_mut(&mut self) -> &mut B {
        &mut self.battery
    }
}

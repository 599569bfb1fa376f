//! Board adapters: button/LED GPIO and the VBAT gauge.

use core::sync::atomic::{AtomicU16, Ordering};

use defmt::{debug, info};
use embassy_nrf::saadc::Saadc;
use embassy_time::{Duration, Timer};
use embedded_hal::digital::{InputPin, OutputPin};
use printer_remote::battery::{adc_to_millivolts, millivolts_to_percent};
use printer_remote::config::BATTERY_SAMPLE_INTERVAL_MS;
use printer_remote::platform::{BatteryMonitor, DigitalIo, Level, PinId};

/// Latest VBAT reading in millivolts, 0 until the first sample.
static BATTERY_MV: AtomicU16 = AtomicU16::new(0);

/// [`DigitalIo`] over the configured button inputs and the LED output.
pub struct BoardIo<I, O, const N: usize> {
    inputs: [(PinId, I); N],
    led: (PinId, O),
}

impl<I, O, const N: usize> BoardIo<I, O, N>
where
    I: InputPin,
    O: OutputPin,
{
    pub fn new(inputs: [(PinId, I); N], led: (PinId, O)) -> Self {
        Self { inputs, led }
    }
}

impl<I, O, const N: usize> DigitalIo for BoardIo<I, O, N>
where
    I: InputPin,
    O: OutputPin,
{
    fn read_pin(&mut self, pin: PinId) -> Level {
        // Unknown pins and read errors count as released (pulled up).
        self.inputs
            .iter_mut()
            .find(|(id, _)| *id == pin)
            .and_then(|(_, input)| input.is_high().ok())
            .map_or(Level::High, Level::from)
    }

    fn write_pin(&mut self, pin: PinId, level: Level) {
        let (id, led) = &mut self.led;
        if *id != pin {
            return;
        }
        let _ = match level {
            Level::High => led.set_high(),
            Level::Low => led.set_low(),
        };
    }
}

/// [`BatteryMonitor`] reading the value kept fresh by [`battery_task`].
pub struct BatteryGauge;

impl BatteryMonitor for BatteryGauge {
    fn level_percent(&mut self) -> Option<u8> {
        match BATTERY_MV.load(Ordering::Relaxed) {
            0 => None,
            mv => Some(millivolts_to_percent(mv)),
        }
    }
}

/// Samples the VBAT divider periodically.
#[embassy_executor::task]
pub async fn battery_task(mut saadc: Saadc<'static, 1>) -> ! {
    saadc.calibrate().await;
    info!("SAADC calibrated");

    loop {
        let mut buf = [0i16; 1];
        saadc.sample(&mut buf).await;
        let mv = adc_to_millivolts(buf[0]);
        BATTERY_MV.store(mv, Ordering::Relaxed);
        debug!("VBAT {} mV", mv);

        Timer::after(Duration::from_millis(u64::from(BATTERY_SAMPLE_INTERVAL_MS))).await;
    }
}

use std::{thread, time::Duration};

use rppal::gpio::{Gpio, OutputPin};

use crate::prelude::*;

/// Pause between opening one branch relay and closing the other, so the
/// charger and the load are never bridged through a switching transient.
const BREAK_BEFORE_MAKE: Duration = Duration::from_millis(200);

/// Relay and indicator pin assignments per mux channel.
const CHARGE_PINS: [u8; 3] = [21, 23, 24];
const DISCHARGE_PINS: [u8; 3] = [22, 26, 27];
const INDICATOR_PINS: [u8; 3] = [12, 13, 14];

/// Charger relay, load relay, and the test-done indicator of one channel.
///
/// All writes are fire-and-forget at the GPIO layer.
pub trait RelayBank {
    fn set_charge(&mut self, engaged: bool);
    fn set_discharge(&mut self, engaged: bool);
    fn set_indicator(&mut self, lit: bool);
}

pub struct GpioRelayBank {
    charge: OutputPin,
    discharge: OutputPin,
    indicator: OutputPin,
}

impl GpioRelayBank {
    /// Claim the channel's pins, all initially low.
    pub fn open(channel: usize) -> Result<Self> {
        ensure!(channel < CHARGE_PINS.len(), "no relay pins assigned to channel {channel}");
        let gpio = Gpio::new().context("could not access the GPIO controller")?;
        Ok(Self {
            charge: gpio.get(CHARGE_PINS[channel])?.into_output_low(),
            discharge: gpio.get(DISCHARGE_PINS[channel])?.into_output_low(),
            indicator: gpio.get(INDICATOR_PINS[channel])?.into_output_low(),
        })
    }
}

impl RelayBank for GpioRelayBank {
    fn set_charge(&mut self, engaged: bool) {
        if engaged {
            thread::sleep(BREAK_BEFORE_MAKE);
            self.charge.set_high();
        } else {
            self.charge.set_low();
        }
    }

    fn set_discharge(&mut self, engaged: bool) {
        if engaged {
            thread::sleep(BREAK_BEFORE_MAKE);
            self.discharge.set_high();
        } else {
            self.discharge.set_low();
        }
    }

    fn set_indicator(&mut self, lit: bool) {
        if lit {
            self.indicator.set_high();
        } else {
            self.indicator.set_low();
        }
    }
}

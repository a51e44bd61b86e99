use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use rppal::i2c::I2c;

use crate::{
    hardware::gauge::FuelGauge,
    prelude::*,
    quantity::{charge::MilliampHours, voltage::Volts},
};

/// The LTC2944 sits behind a TCA9548A mux, one pack per mux channel. The mux
/// and every gauge share one physical bus, so channel-select-then-access must
/// be atomic across channels.
pub type SharedBus = Arc<Mutex<I2c>>;

const BUS: u8 = 0;
const LTC_ADDRESS: u16 = 0x64;
const MUX_ADDRESS: u16 = 0x70;

// Registers.
const STATUS: u8 = 0x00;
const CONTROL: u8 = 0x01;
const ACCUM_CHARGE_MSB: u8 = 0x02;
const ACCUM_CHARGE_LSB: u8 = 0x03;
const VOLTAGE_MSB: u8 = 0x08;
const VOLTAGE_LSB: u8 = 0x09;

// Control word: automatic conversions, ÷1024 prescaler, ALCC pin disabled.
const AUTOMATIC_MODE: u8 = 0xC0;
const PRESCALER_M_1024: u8 = 0x28;
const DISABLE_ALCC_PIN: u8 = 0x00;

// Conversion constants from the datasheet and the board.
const VOLTAGE_FULL_SCALE: f64 = 70.0;
const CHARGE_LSB_MAH: f64 = 0.34e-3;
const PRESCALER: f64 = 1024.0;
const SENSE_RESISTOR_OHMS: f64 = 0.01;

/// Mid-scale value the accumulated-charge register resets to, so discharge
/// can count down from it.
const CHARGE_REGISTER_INIT: u16 = 0x7FFF;

/// Mux output settle time after switching channels.
const CHANNEL_SETTLE: Duration = Duration::from_millis(100);

pub fn open_bus() -> Result<SharedBus> {
    let bus = I2c::with_bus(BUS).context("could not open the I²C bus")?;
    Ok(Arc::new(Mutex::new(bus)))
}

/// Whether a gauge answers on the channel, without configuring it.
#[must_use]
pub fn probe_channel(bus: &SharedBus, channel: u8) -> bool {
    Ltc2944 { bus: Arc::clone(bus), channel }.probe()
}

pub struct Ltc2944 {
    bus: SharedBus,
    channel: u8,
}

impl Ltc2944 {
    /// Attach to the gauge on the channel and put it in automatic mode.
    pub fn connect(bus: SharedBus, channel: u8) -> Result<Self> {
        let gauge = Self { bus, channel };
        gauge.with_chip(|bus| {
            write_register(bus, CONTROL, AUTOMATIC_MODE | PRESCALER_M_1024 | DISABLE_ALCC_PIN)
        })?;
        Ok(gauge)
    }

    /// Select the mux channel, then run the operation against the gauge.
    ///
    /// Holds the bus lock for the whole select-settle-access sequence.
    fn with_chip<T>(&self, operation: impl FnOnce(&mut I2c) -> Result<T>) -> Result<T> {
        let mut bus =
            self.bus.lock().map_err(|_| Error::msg("the I²C bus mutex is poisoned"))?;
        bus.set_slave_address(MUX_ADDRESS)?;
        bus.write(&[1 << self.channel])?;
        thread::sleep(CHANNEL_SETTLE);
        bus.set_slave_address(LTC_ADDRESS)?;
        operation(&mut bus)
    }
}

impl FuelGauge for Ltc2944 {
    fn read_voltage(&mut self) -> Result<Volts> {
        self.with_chip(|bus| {
            let msb = read_register(bus, VOLTAGE_MSB)?;
            let lsb = read_register(bus, VOLTAGE_LSB)?;
            let adc = u16::from(msb) << 8 | u16::from(lsb);
            Ok(Volts(f64::from(adc) / 65535.0 * VOLTAGE_FULL_SCALE))
        })
    }

    fn read_accumulated_charge(&mut self) -> Result<MilliampHours> {
        self.with_chip(|bus| {
            let msb = read_register(bus, ACCUM_CHARGE_MSB)?;
            let lsb = read_register(bus, ACCUM_CHARGE_LSB)?;
            let adc = i32::from(u16::from(msb) << 8 | u16::from(lsb))
                - i32::from(CHARGE_REGISTER_INIT);
            let charge =
                1000.0 * (f64::from(adc) * CHARGE_LSB_MAH * PRESCALER * 50e-3)
                    / (SENSE_RESISTOR_OHMS * 4096.0);
            Ok(MilliampHours(charge))
        })
    }

    fn reset_integrator(&mut self) -> Result {
        #[expect(clippy::cast_possible_truncation)]
        let (msb, lsb) = ((CHARGE_REGISTER_INIT >> 8) as u8, (CHARGE_REGISTER_INIT & 0xFF) as u8);
        self.with_chip(|bus| {
            write_register(bus, ACCUM_CHARGE_MSB, msb)?;
            write_register(bus, ACCUM_CHARGE_LSB, lsb)
        })
    }

    fn probe(&mut self) -> bool {
        self.with_chip(|bus| read_register(bus, STATUS)).is_ok()
    }
}

fn read_register(bus: &mut I2c, register: u8) -> Result<u8> {
    let mut buffer = [0];
    bus.write(&[register])?;
    bus.read(&mut buffer)?;
    Ok(buffer[0])
}

fn write_register(bus: &mut I2c, register: u8, value: u8) -> Result {
    bus.write(&[register, value])?;
    Ok(())
}

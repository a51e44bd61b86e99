use crate::{
    prelude::*,
    quantity::{charge::MilliampHours, voltage::Volts},
};

/// Calibrated view of the fuel-gauge chip.
pub trait FuelGauge {
    fn read_voltage(&mut self) -> Result<Volts>;

    /// Charge accumulated since the last integrator reset. Negative while
    /// discharging.
    fn read_accumulated_charge(&mut self) -> Result<MilliampHours>;

    fn reset_integrator(&mut self) -> Result;

    /// Cheap presence check, used to detect pack connection and removal.
    fn probe(&mut self) -> bool;
}

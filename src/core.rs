mod capacity;
mod policy;
mod serial;
mod state;
mod trend;
mod unit;

pub use self::{
    capacity::{CapacityPhase, CapacityReport, CapacityTest, Leg},
    policy::{
        charge_leg_complete,
        discharge_leg_complete,
        evaluate_warning,
        partial_charge_reached,
        partial_discharge_reached,
    },
    serial::SerialNumber,
    state::{Action, PhysicalState, Warning},
    trend::VoltageWindow,
    unit::{BatteryUnit, CAPACITY_REST_TIME},
};

mod gauge;
mod ltc2944;
mod relays;

pub use self::{
    gauge::FuelGauge,
    ltc2944::{Ltc2944, SharedBus, open_bus, probe_channel},
    relays::{GpioRelayBank, RelayBank},
};

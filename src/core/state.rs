use derive_more::Display;

/// Actual relay configuration of the pack, as opposed to the intent in [`Action`].
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum PhysicalState {
    #[display("RESTING")]
    Resting,

    #[display("CHARGING")]
    Charging,

    #[display("DISCHARGING")]
    Discharging,
}

/// What the pack is currently asked to do.
///
/// [`Action::CapacityTest`] is composite: it immediately rewrites itself to
/// [`Action::ChargeFull`] and the sequencer routes the pack through the
/// remaining legs on subsequent ticks.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, clap::ValueEnum)]
pub enum Action {
    /// Open both relays and let the pack settle.
    #[display("REST")]
    Rest,

    /// Charge until the full-charge completion policy fires.
    #[display("CHARGE_FULL")]
    ChargeFull,

    /// Charge up to the partial (storage) voltage.
    #[display("CHARGE_PARTIAL")]
    ChargePartial,

    /// Discharge until the full-discharge completion policy fires.
    #[display("DISCHARGE_FULL")]
    DischargeFull,

    /// Discharge down to the partial (storage) voltage.
    #[display("DISCHARGE_PARTIAL")]
    DischargePartial,

    /// Run the four-leg capacity test.
    #[display("CAPACITY_TEST")]
    CapacityTest,
}

/// Stall warning, recomputed on every tick and never persisted.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum Warning {
    #[display("NONE")]
    None,

    #[display("CHECK_CHARGER")]
    CheckCharger,

    #[display("CHECK_LOAD")]
    CheckLoad,
}

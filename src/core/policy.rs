use chrono::TimeDelta;

use crate::{
    core::state::{Action, Warning},
    quantity::{charge::MilliampHours, voltage::Volts},
};

/// Grace period before a zero accumulated charge is treated as a stall.
pub const WARNING_GRACE_PERIOD: TimeDelta = TimeDelta::seconds(30);

/// Whether a full-charge leg is done.
///
/// The slope cutoff is a safety check against a declining pack voltage under
/// charge, not a charge-complete detector.
#[must_use]
pub fn charge_leg_complete(
    voltage: Volts,
    elapsed: TimeDelta,
    slope: Option<f64>,
    max_charge_time: TimeDelta,
    max_voltage: Volts,
    slope_threshold: f64,
) -> bool {
    elapsed >= max_charge_time
        || voltage >= max_voltage
        || slope.is_some_and(|slope| slope <= slope_threshold)
}

/// Whether a full-discharge leg is done.
#[must_use]
pub fn discharge_leg_complete(
    voltage: Volts,
    elapsed: TimeDelta,
    max_discharge_time: TimeDelta,
    min_voltage: Volts,
) -> bool {
    elapsed >= max_discharge_time || voltage <= min_voltage
}

#[must_use]
pub fn partial_charge_reached(voltage: Volts, partial_voltage: Volts) -> bool {
    voltage >= partial_voltage
}

#[must_use]
pub fn partial_discharge_reached(voltage: Volts, partial_voltage: Volts) -> bool {
    voltage <= partial_voltage
}

/// Flag a stalled charger or load: relays engaged, yet no charge has moved
/// after the grace period.
#[must_use]
pub fn evaluate_warning(
    action: Action,
    accumulated_charge: Option<MilliampHours>,
    elapsed: TimeDelta,
) -> Warning {
    if accumulated_charge != Some(MilliampHours::ZERO) || elapsed <= WARNING_GRACE_PERIOD {
        return Warning::None;
    }
    match action {
        Action::ChargeFull | Action::ChargePartial => Warning::CheckCharger,
        Action::DischargeFull | Action::DischargePartial => Warning::CheckLoad,
        Action::Rest | Action::CapacityTest => Warning::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_CHARGE_TIME: TimeDelta = TimeDelta::seconds(28_800);
    const MAX_DISCHARGE_TIME: TimeDelta = TimeDelta::seconds(19_800);

    fn charge_complete(voltage: Volts, elapsed: TimeDelta, slope: Option<f64>) -> bool {
        charge_leg_complete(voltage, elapsed, slope, MAX_CHARGE_TIME, Volts(29.6), -1.0)
    }

    #[test]
    fn test_charge_not_complete() {
        assert!(!charge_complete(Volts(27.0), TimeDelta::seconds(60), None));
    }

    #[test]
    fn test_charge_complete_on_max_voltage() {
        assert!(charge_complete(Volts(29.6), TimeDelta::seconds(60), None));
    }

    #[test]
    fn test_charge_complete_on_timeout() {
        assert!(charge_complete(Volts(27.0), MAX_CHARGE_TIME, None));
    }

    #[test]
    fn test_charge_complete_on_declining_slope() {
        assert!(charge_complete(Volts(27.0), TimeDelta::seconds(60), Some(-2.0)));
        assert!(!charge_complete(Volts(27.0), TimeDelta::seconds(60), Some(-0.5)));
    }

    #[test]
    fn test_charge_completion_is_monotone_in_elapsed() {
        let elapsed = TimeDelta::seconds(100);
        assert!(charge_complete(Volts(29.7), elapsed, None));
        assert!(charge_complete(Volts(29.7), elapsed + TimeDelta::hours(10), None));
    }

    #[test]
    fn test_discharge_complete() {
        assert!(!discharge_leg_complete(
            Volts(25.0),
            TimeDelta::seconds(60),
            MAX_DISCHARGE_TIME,
            Volts(22.0),
        ));
        assert!(discharge_leg_complete(
            Volts(21.9),
            TimeDelta::seconds(60),
            MAX_DISCHARGE_TIME,
            Volts(22.0),
        ));
        assert!(discharge_leg_complete(
            Volts(25.0),
            MAX_DISCHARGE_TIME,
            MAX_DISCHARGE_TIME,
            Volts(22.0),
        ));
    }

    #[test]
    fn test_partial_thresholds() {
        assert!(partial_charge_reached(Volts(28.3), Volts(28.3)));
        assert!(!partial_charge_reached(Volts(28.2), Volts(28.3)));
        assert!(partial_discharge_reached(Volts(28.2), Volts(28.3)));
        assert!(!partial_discharge_reached(Volts(28.4), Volts(28.3)));
    }

    #[test]
    fn test_stalled_charger() {
        let warning = evaluate_warning(
            Action::ChargeFull,
            Some(MilliampHours::ZERO),
            TimeDelta::seconds(31),
        );
        assert_eq!(warning, Warning::CheckCharger);
    }

    #[test]
    fn test_stall_within_grace_period() {
        let warning = evaluate_warning(
            Action::ChargeFull,
            Some(MilliampHours::ZERO),
            TimeDelta::seconds(29),
        );
        assert_eq!(warning, Warning::None);
    }

    #[test]
    fn test_stalled_load() {
        let warning = evaluate_warning(
            Action::DischargePartial,
            Some(MilliampHours::ZERO),
            TimeDelta::seconds(31),
        );
        assert_eq!(warning, Warning::CheckLoad);
    }

    #[test]
    fn test_no_warning_with_moving_charge() {
        let warning = evaluate_warning(
            Action::ChargeFull,
            Some(MilliampHours(12.5)),
            TimeDelta::seconds(31),
        );
        assert_eq!(warning, Warning::None);
    }

    #[test]
    fn test_no_warning_on_failed_reading() {
        assert_eq!(
            evaluate_warning(Action::ChargeFull, None, TimeDelta::seconds(31)),
            Warning::None,
        );
    }
}

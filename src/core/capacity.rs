use bon::Builder;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::{core::serial::SerialNumber, prelude::*, quantity::charge::MilliampHours};

/// Where the four-leg capacity protocol currently is.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CapacityPhase {
    #[default]
    Idle,
    Charging,
    SettlingBeforeDischarge,
    Discharging,
    PartialCharging,
    Done,
}

/// Milestone bookkeeping for one capacity test run.
///
/// The sequencer records milestones strictly in protocol order; assembling the
/// report fails if any are missing (a sensor fault may have skipped a leg).
#[derive(Default)]
pub struct CapacityTest {
    phase: CapacityPhase,
    charge_started_at: Option<DateTime<Local>>,
    charge_ended_at: Option<DateTime<Local>>,
    charge: Option<MilliampHours>,
    discharge_started_at: Option<DateTime<Local>>,
    discharge_ended_at: Option<DateTime<Local>>,
    discharge: Option<MilliampHours>,
    partial_charge_ended_at: Option<DateTime<Local>>,
    partial_charge: Option<MilliampHours>,
}

impl CapacityTest {
    /// Drop any previous bookkeeping and start over at the full-charge leg.
    pub fn begin(&mut self, now: DateTime<Local>) {
        *self = Self {
            phase: CapacityPhase::Charging,
            charge_started_at: Some(now),
            ..Self::default()
        };
    }

    #[must_use]
    pub const fn phase(&self) -> CapacityPhase {
        self.phase
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self.phase,
            CapacityPhase::Charging
                | CapacityPhase::SettlingBeforeDischarge
                | CapacityPhase::Discharging
                | CapacityPhase::PartialCharging
        )
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.phase, CapacityPhase::Done)
    }

    pub fn cancel(&mut self) {
        self.phase = CapacityPhase::Idle;
    }

    pub fn complete_charge(&mut self, now: DateTime<Local>, charge: MilliampHours) {
        if self.is_active() {
            self.charge_ended_at = Some(now);
            self.charge = Some(charge);
            self.phase = CapacityPhase::SettlingBeforeDischarge;
        }
    }

    pub fn enter_discharge(&mut self, now: DateTime<Local>) {
        if self.is_active() {
            self.discharge_started_at = Some(now);
            self.phase = CapacityPhase::Discharging;
        }
    }

    pub fn complete_discharge(&mut self, now: DateTime<Local>, charge: MilliampHours) {
        if self.is_active() {
            self.discharge_ended_at = Some(now);
            self.discharge = Some(charge);
            self.phase = CapacityPhase::PartialCharging;
        }
    }

    pub fn finish(&mut self, now: DateTime<Local>, charge: MilliampHours) {
        if self.is_active() {
            self.partial_charge_ended_at = Some(now);
            self.partial_charge = Some(charge);
            self.phase = CapacityPhase::Done;
        }
    }

    /// Assemble the report payload from the recorded milestones.
    pub fn report(
        &self,
        serial_number: &SerialNumber,
        measured_capacity: Option<MilliampHours>,
    ) -> Result<CapacityReport> {
        let discharge_ended_at =
            self.discharge_ended_at.context("the full-discharge end was never recorded")?;
        let partial_charge_ended_at =
            self.partial_charge_ended_at.context("the partial-charge end was never recorded")?;
        Ok(CapacityReport::builder()
            .serial_number(serial_number.clone())
            .measured_capacity(measured_capacity.context("the capacity was never measured")?)
            .full_charge(
                Leg::builder()
                    .started_at(
                        self.charge_started_at.context("the full-charge start was never recorded")?,
                    )
                    .ended_at(
                        self.charge_ended_at.context("the full-charge end was never recorded")?,
                    )
                    .charge(self.charge.context("the full-charge total was never recorded")?)
                    .build(),
            )
            .full_discharge(
                Leg::builder()
                    .started_at(
                        self.discharge_started_at
                            .context("the full-discharge start was never recorded")?,
                    )
                    .ended_at(discharge_ended_at)
                    .charge(self.discharge.context("the full-discharge total was never recorded")?)
                    .build(),
            )
            .partial_charge(
                Leg::builder()
                    .started_at(discharge_ended_at)
                    .ended_at(partial_charge_ended_at)
                    .charge(
                        self.partial_charge.context("the partial-charge total was never recorded")?,
                    )
                    .build(),
            )
            .build())
    }
}

/// The payload handed to the report writer when a capacity test finishes.
#[derive(Builder, Clone, Debug, Serialize)]
pub struct CapacityReport {
    pub serial_number: SerialNumber,
    pub measured_capacity: MilliampHours,
    pub full_charge: Leg,
    pub full_discharge: Leg,
    pub partial_charge: Leg,
}

/// One contiguous charge or discharge phase and the charge it moved.
#[derive(Builder, Copy, Clone, Debug, Serialize)]
pub struct Leg {
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub charge: MilliampHours,
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn at(seconds: i64) -> DateTime<Local> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap().with_timezone(&Local)
            + TimeDelta::seconds(seconds)
    }

    fn serial() -> SerialNumber {
        "PACK-01".parse().unwrap()
    }

    #[test]
    fn test_phases_advance_in_order() {
        let mut test = CapacityTest::default();
        assert!(!test.is_active());

        test.begin(at(0));
        assert_eq!(test.phase(), CapacityPhase::Charging);
        test.complete_charge(at(100), MilliampHours(3000.0));
        assert_eq!(test.phase(), CapacityPhase::SettlingBeforeDischarge);
        test.enter_discharge(at(220));
        assert_eq!(test.phase(), CapacityPhase::Discharging);
        test.complete_discharge(at(400), MilliampHours(-5000.0));
        assert_eq!(test.phase(), CapacityPhase::PartialCharging);
        test.finish(at(500), MilliampHours(2000.0));
        assert_eq!(test.phase(), CapacityPhase::Done);
        assert!(test.is_finished());
        assert!(!test.is_active());

        let report = test.report(&serial(), Some(MilliampHours(5000.0))).unwrap();
        assert_eq!(report.measured_capacity, MilliampHours(5000.0));
        assert_eq!(report.full_charge.started_at, at(0));
        assert_eq!(report.full_charge.ended_at, at(100));
        assert_eq!(report.full_discharge.started_at, at(220));
        assert_eq!(report.full_discharge.ended_at, at(400));
        assert_eq!(report.partial_charge.started_at, at(400));
        assert_eq!(report.partial_charge.ended_at, at(500));
        assert_eq!(report.partial_charge.charge, MilliampHours(2000.0));
    }

    #[test]
    fn test_begin_clears_previous_run() {
        let mut test = CapacityTest::default();
        test.begin(at(0));
        test.complete_charge(at(100), MilliampHours(3000.0));
        test.begin(at(200));
        assert_eq!(test.phase(), CapacityPhase::Charging);
        assert!(test.report(&serial(), Some(MilliampHours(1.0))).is_err());
    }

    #[test]
    fn test_incomplete_payload_is_rejected() {
        let mut test = CapacityTest::default();
        test.begin(at(0));
        test.enter_discharge(at(120));
        test.complete_discharge(at(300), MilliampHours(-4000.0));
        test.finish(at(400), MilliampHours(1500.0));
        assert!(test.report(&serial(), Some(MilliampHours(4000.0))).is_err());
    }

    #[test]
    fn test_milestones_ignored_when_idle() {
        let mut test = CapacityTest::default();
        test.complete_charge(at(100), MilliampHours(3000.0));
        assert_eq!(test.phase(), CapacityPhase::Idle);
    }
}

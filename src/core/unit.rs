use chrono::{DateTime, Local, TimeDelta};

use crate::{
    config::BenchConfig,
    core::{
        capacity::{CapacityReport, CapacityTest},
        policy,
        serial::SerialNumber,
        state::{Action, PhysicalState, Warning},
        trend::VoltageWindow,
    },
    hardware::{FuelGauge, RelayBank},
    journal::{Category, EventSink},
    prelude::*,
    quantity::{charge::MilliampHours, voltage::Volts},
};

/// Settle window between the legs of a capacity test. Hard-coded upstream;
/// whether it should scale with pack size is unresolved.
pub const CAPACITY_REST_TIME: TimeDelta = TimeDelta::seconds(120);

/// One pack under test: its relays, its gauge, its journal, and the control
/// state machine that drives them tick by tick.
pub struct BatteryUnit<G, R, S> {
    serial_number: SerialNumber,
    gauge: G,
    relays: R,
    journal: S,
    physical_state: PhysicalState,
    current_action: Action,
    last_action_started_at: DateTime<Local>,
    last_voltage: Option<Volts>,
    last_accumulated_charge: Option<MilliampHours>,
    voltage_window: VoltageWindow,
    capacity_test: CapacityTest,
    measured_capacity: Option<MilliampHours>,
    warning: Warning,
}

impl<G, R, S> BatteryUnit<G, R, S>
where
    G: FuelGauge,
    R: RelayBank,
    S: EventSink,
{
    pub fn new(
        serial_number: SerialNumber,
        gauge: G,
        relays: R,
        journal: S,
        now: DateTime<Local>,
    ) -> Self {
        let mut unit = Self {
            serial_number,
            gauge,
            relays,
            journal,
            physical_state: PhysicalState::Resting,
            current_action: Action::Rest,
            last_action_started_at: now,
            last_voltage: None,
            last_accumulated_charge: None,
            voltage_window: VoltageWindow::default(),
            capacity_test: CapacityTest::default(),
            measured_capacity: None,
            warning: Warning::None,
        };
        unit.reset_integrator(now);
        unit.journal.append(now, Category::General, "Connected");
        unit
    }

    #[must_use]
    pub const fn serial_number(&self) -> &SerialNumber {
        &self.serial_number
    }

    #[must_use]
    pub const fn physical_state(&self) -> PhysicalState {
        self.physical_state
    }

    #[must_use]
    pub const fn current_action(&self) -> Action {
        self.current_action
    }

    #[must_use]
    pub const fn warning(&self) -> Warning {
        self.warning
    }

    #[must_use]
    pub const fn journal(&self) -> &S {
        &self.journal
    }

    #[must_use]
    pub const fn capacity_test_active(&self) -> bool {
        self.capacity_test.is_active()
    }

    #[must_use]
    pub const fn capacity_test_finished(&self) -> bool {
        self.capacity_test.is_finished()
    }

    #[must_use]
    pub fn elapsed(&self, now: DateTime<Local>) -> TimeDelta {
        now - self.last_action_started_at
    }

    pub fn probe(&mut self) -> bool {
        self.gauge.probe()
    }

    pub fn record_error(&mut self, now: DateTime<Local>, message: impl std::fmt::Display) {
        self.journal.append(now, Category::Error, message);
    }

    /// One control cycle: sample the gauge, run the current action's logic,
    /// re-evaluate the stall warning.
    ///
    /// Returns the report payload when the partial-charge leg of an active
    /// capacity test completes.
    #[instrument(
        skip_all,
        fields(serial_number = %self.serial_number, action = %self.current_action),
    )]
    pub fn tick(&mut self, now: DateTime<Local>, config: &BenchConfig) -> Option<CapacityReport> {
        self.read_gauge(now);
        if (self.last_voltage.is_none() || self.last_accumulated_charge.is_none())
            && self.current_action != Action::Rest
        {
            // Never leave relays engaged on a sensing fault.
            self.apply_sequencer_action(Action::Rest, now);
        }

        let report = match self.current_action {
            Action::Rest => {
                self.update_rest(now);
                None
            }
            Action::ChargeFull => {
                self.update_charge_full(now, config);
                None
            }
            Action::ChargePartial => self.update_charge_partial(now, config),
            Action::DischargeFull => {
                self.update_discharge_full(now, config);
                None
            }
            Action::DischargePartial => {
                self.update_discharge_partial(now, config);
                None
            }
            Action::CapacityTest => {
                self.update_capacity_test(now);
                None
            }
        };

        self.warning = policy::evaluate_warning(
            self.current_action,
            self.last_accumulated_charge,
            self.elapsed(now),
        );
        report
    }

    /// Set the operator's intent. Any operator action other than starting a
    /// capacity test cancels an in-flight one.
    pub fn apply_operator_action(&mut self, action: Action, now: DateTime<Local>) {
        self.set_action(action, now);
        if action != Action::CapacityTest {
            self.capacity_test.cancel();
        }
    }

    /// Re-assign the serial number; the journal rotates with it.
    pub fn set_serial_number(&mut self, serial_number: SerialNumber, now: DateTime<Local>) {
        self.journal.append(now, Category::General, format!("New SN: {serial_number}"));
        self.serial_number = serial_number;
        self.journal.set_id(self.serial_number.as_str());
        self.journal.append(now, Category::General, format!("New SN: {}", self.serial_number));
    }

    /// Force everything off before the unit is dropped.
    pub fn shutdown(&mut self, now: DateTime<Local>) {
        self.ensure_physical_state(PhysicalState::Resting, now);
        self.relays.set_indicator(false);
        self.journal.append(now, Category::General, "Disconnected");
    }

    fn read_gauge(&mut self, now: DateTime<Local>) {
        match self.gauge.read_voltage() {
            Ok(voltage) => {
                self.last_voltage = Some(voltage);
                self.voltage_window.push(now, voltage);
                self.journal.append(now, Category::Voltage, voltage.0);
            }
            Err(error) => {
                self.last_voltage = None;
                warn!("could not read the voltage: {error:#}");
                self.journal.append(now, Category::Error, "Could not read voltage");
            }
        }
        match self.gauge.read_accumulated_charge() {
            Ok(charge) => {
                self.last_accumulated_charge = Some(charge);
                self.journal.append(now, Category::Charge, charge.0);
            }
            Err(error) => {
                self.last_accumulated_charge = None;
                warn!("could not read the accumulated charge: {error:#}");
                self.journal.append(now, Category::Error, "Could not read accumulated charge");
            }
        }
    }

    fn update_rest(&mut self, now: DateTime<Local>) {
        self.ensure_physical_state(PhysicalState::Resting, now);
        if self.capacity_test.is_active() && self.elapsed(now) >= CAPACITY_REST_TIME {
            self.capacity_test.enter_discharge(now);
            self.apply_sequencer_action(Action::DischargeFull, now);
        }
    }

    fn update_charge_full(&mut self, now: DateTime<Local>, config: &BenchConfig) {
        self.ensure_physical_state(PhysicalState::Charging, now);
        let (Some(voltage), Some(charge)) = (self.last_voltage, self.last_accumulated_charge)
        else {
            return;
        };
        let complete = policy::charge_leg_complete(
            voltage,
            self.elapsed(now),
            self.voltage_window.slope(),
            config.max_charge_time(),
            config.max_voltage,
            config.charge_slope_threshold,
        );
        if complete {
            self.journal.append(
                now,
                Category::General,
                format!(
                    "Fully Charged in {}s, {:.0}mAh",
                    self.elapsed(now).num_seconds(),
                    charge.0,
                ),
            );
            self.capacity_test.complete_charge(now, charge);
            self.apply_sequencer_action(Action::Rest, now);
        }
    }

    fn update_charge_partial(
        &mut self,
        now: DateTime<Local>,
        config: &BenchConfig,
    ) -> Option<CapacityReport> {
        self.ensure_physical_state(PhysicalState::Charging, now);
        let (Some(voltage), Some(charge)) = (self.last_voltage, self.last_accumulated_charge)
        else {
            return None;
        };
        if !policy::partial_charge_reached(voltage, config.partial_voltage) {
            return None;
        }
        self.journal.append(
            now,
            Category::General,
            format!(
                "Partially Charged in {}s, {:.0}mAh",
                self.elapsed(now).num_seconds(),
                charge.0,
            ),
        );

        let report = if self.capacity_test.is_active() {
            self.capacity_test.finish(now, charge);
            self.relays.set_indicator(true);
            self.journal.append(now, Category::General, "Capacity Test Done!");
            if let Some(capacity) = self.measured_capacity {
                self.journal.append(now, Category::General, format!("Capacity = {capacity:?}"));
            }
            match self.capacity_test.report(&self.serial_number, self.measured_capacity) {
                Ok(report) => Some(report),
                Err(error) => {
                    self.journal.append(
                        now,
                        Category::Error,
                        format!("Unable to assemble the capacity test report: {error:#}"),
                    );
                    None
                }
            }
        } else {
            None
        };

        self.apply_sequencer_action(Action::Rest, now);
        report
    }

    fn update_discharge_full(&mut self, now: DateTime<Local>, config: &BenchConfig) {
        self.ensure_physical_state(PhysicalState::Discharging, now);
        let (Some(voltage), Some(charge)) = (self.last_voltage, self.last_accumulated_charge)
        else {
            return;
        };
        let complete = policy::discharge_leg_complete(
            voltage,
            self.elapsed(now),
            config.max_discharge_time(),
            config.min_voltage,
        );
        if complete {
            self.journal.append(
                now,
                Category::General,
                format!(
                    "Fully Discharged in {}s, {:.0}mAh",
                    self.elapsed(now).num_seconds(),
                    charge.0,
                ),
            );
            if self.capacity_test.is_active() {
                self.measured_capacity = Some(charge.magnitude());
                self.capacity_test.complete_discharge(now, charge);
                self.apply_sequencer_action(Action::ChargePartial, now);
            } else {
                self.apply_sequencer_action(Action::Rest, now);
            }
        }
    }

    fn update_discharge_partial(&mut self, now: DateTime<Local>, config: &BenchConfig) {
        self.ensure_physical_state(PhysicalState::Discharging, now);
        let (Some(voltage), Some(charge)) = (self.last_voltage, self.last_accumulated_charge)
        else {
            return;
        };
        if policy::partial_discharge_reached(voltage, config.partial_voltage) {
            self.journal.append(
                now,
                Category::General,
                format!(
                    "Partially Discharged in {}s, {:.0}mAh",
                    self.elapsed(now).num_seconds(),
                    charge.0,
                ),
            );
            self.apply_sequencer_action(Action::Rest, now);
        }
    }

    /// Reset the bookkeeping and hand over to the full-charge leg.
    fn update_capacity_test(&mut self, now: DateTime<Local>) {
        self.measured_capacity = None;
        self.capacity_test.begin(now);
        self.relays.set_indicator(false);
        self.apply_sequencer_action(Action::ChargeFull, now);
    }

    fn apply_sequencer_action(&mut self, action: Action, now: DateTime<Local>) {
        self.set_action(action, now);
    }

    fn set_action(&mut self, action: Action, now: DateTime<Local>) {
        self.current_action = action;
        self.last_action_started_at = now;
        self.journal.append(now, Category::Action, action);
    }

    /// Bring the relays in line with the target state. Idempotent; a branch
    /// relay is always opened before the opposite one is closed.
    fn ensure_physical_state(&mut self, target: PhysicalState, now: DateTime<Local>) {
        if self.physical_state == target {
            return;
        }
        match target {
            PhysicalState::Resting => {
                self.relays.set_charge(false);
                self.relays.set_discharge(false);
            }
            PhysicalState::Charging => {
                self.relays.set_discharge(false);
                self.relays.set_charge(true);
                self.voltage_window.clear();
                self.reset_integrator(now);
            }
            PhysicalState::Discharging => {
                self.relays.set_charge(false);
                self.relays.set_discharge(true);
                self.reset_integrator(now);
            }
        }
        self.physical_state = target;
        self.journal.append(now, Category::Status, target);
    }

    fn reset_integrator(&mut self, now: DateTime<Local>) {
        match self.gauge.reset_integrator() {
            Ok(()) => self.journal.append(now, Category::General, "Charge integrator reset"),
            Err(error) => {
                warn!("could not reset the charge integrator: {error:#}");
                self.journal.append(now, Category::Error, "Could not reset charge integrator");
            }
        }
    }
}

use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::Local;
use tokio::time::sleep;

use crate::{
    cli::{ChannelSpec, RunArgs},
    config::BenchConfig,
    core::{Action, BatteryUnit, Warning},
    hardware::{self, GpioRelayBank, Ltc2944, SharedBus},
    journal::Journal,
    prelude::*,
    report,
};

type Unit = BatteryUnit<Ltc2944, GpioRelayBank, Journal>;

/// Drive the bench until SIGINT/SIGTERM: one task per configured channel.
pub async fn run(args: RunArgs) -> Result {
    let bus = hardware::open_bus()?;

    let should_terminate = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&should_terminate))?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&should_terminate))?;

    let mut tasks = Vec::with_capacity(args.channels.len());
    for spec in args.channels {
        let bus = Arc::clone(&bus);
        let should_terminate = Arc::clone(&should_terminate);
        let config_path = args.config.config.clone();
        let initial_action = args.action;
        tasks.push(tokio::spawn(async move {
            run_channel(&bus, spec, &config_path, initial_action, &should_terminate).await;
        }));
    }
    for task in tasks {
        task.await.context("a channel task panicked")?;
    }
    Ok(())
}

async fn run_channel(
    bus: &SharedBus,
    spec: ChannelSpec,
    config_path: &Path,
    initial_action: Action,
    should_terminate: &AtomicBool,
) {
    let mut unit = None;

    while !should_terminate.load(Ordering::Relaxed) {
        let config = BenchConfig::load(config_path);
        step(bus, &spec, &config, initial_action, &mut unit);
        sleep(config.update_interval()).await;
    }

    if let Some(mut unit) = unit {
        unit.shutdown(Local::now());
        info!(channel = spec.channel, "shut down");
    }
}

/// One bench cycle on the channel: presence detection, then a tick.
fn step(
    bus: &SharedBus,
    spec: &ChannelSpec,
    config: &BenchConfig,
    initial_action: Action,
    unit: &mut Option<Unit>,
) {
    let now = Local::now();

    if unit.is_none() {
        *unit = match connect(bus, spec, config, initial_action) {
            Ok(connected) => connected,
            Err(error) => {
                error!(channel = spec.channel, "could not set the pack up: {error:#}");
                None
            }
        };
    }
    let Some(existing) = unit.as_mut() else {
        return;
    };

    if !existing.probe() {
        info!(channel = spec.channel, "pack disconnected");
        existing.shutdown(now);
        *unit = None;
        return;
    }

    if let Some(finished) = existing.tick(now, config) {
        match report::write(&finished, existing.journal(), &config.reports_folder) {
            Ok(folder) => info!(channel = spec.channel, "report written to `{}`", folder.display()),
            Err(error) => {
                error!(channel = spec.channel, "could not write the report: {error:#}");
                existing.record_error(now, format!("Unable to write the report: {error:#}"));
            }
        }
    }

    if existing.warning() != Warning::None {
        warn!(channel = spec.channel, "{}", existing.warning());
    }
    debug!(
        channel = spec.channel,
        state = %existing.physical_state(),
        action = %existing.current_action(),
        "cycle done",
    );
}

fn connect(
    bus: &SharedBus,
    spec: &ChannelSpec,
    config: &BenchConfig,
    initial_action: Action,
) -> Result<Option<Unit>> {
    if !hardware::probe_channel(bus, spec.channel) {
        return Ok(None);
    }
    let now = Local::now();
    info!(channel = spec.channel, serial_number = %spec.serial_number, "pack connected");

    let gauge = Ltc2944::connect(Arc::clone(bus), spec.channel)?;
    let relays = GpioRelayBank::open(usize::from(spec.channel))?;
    let journal = Journal::create(&config.logs_folder, spec.serial_number.as_str(), now)?;
    let mut unit = BatteryUnit::new(spec.serial_number.clone(), gauge, relays, journal, now);
    if initial_action != Action::Rest {
        unit.apply_operator_action(initial_action, now);
    }
    Ok(Some(unit))
}

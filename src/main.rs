mod bench;
mod cli;
mod config;
mod core;
mod hardware;
mod journal;
mod prelude;
mod quantity;
mod report;

use std::sync::Arc;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command, ConfigArgs, ProbeArgs},
    config::BenchConfig,
    hardware::{FuelGauge, Ltc2944},
    prelude::*,
};

#[tokio::main]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Run(args) => bench::run(*args).await?,
        Command::Probe(args) => probe(&args)?,
        Command::Config(args) => print_config(&args)?,
    }

    info!("done!");
    Ok(())
}

fn probe(args: &ProbeArgs) -> Result {
    let bus = hardware::open_bus()?;
    for &channel in &args.channels {
        if !hardware::probe_channel(&bus, channel) {
            info!(channel, "no gauge detected");
            continue;
        }
        let mut gauge = Ltc2944::connect(Arc::clone(&bus), channel)?;
        let voltage = gauge.read_voltage()?;
        let charge = gauge.read_accumulated_charge()?;
        info!(channel, %voltage, %charge, "gotcha");
    }
    Ok(())
}

fn print_config(args: &ConfigArgs) -> Result {
    let config = BenchConfig::load(&args.config);
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

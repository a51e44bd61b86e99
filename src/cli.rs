use std::{path::PathBuf, str::FromStr};

use clap::{Parser, Subcommand};

use crate::{
    core::{Action, SerialNumber},
    prelude::*,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the bench: watch the configured channels and drive the packs on them.
    Run(Box<RunArgs>),

    /// Read the gauge once on each given channel and print the measurements.
    Probe(ProbeArgs),

    /// Print the effective configuration.
    Config(ConfigArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Channels to drive, as `<channel>:<serial-number>` pairs.
    #[clap(
        long = "channel",
        env = "CYCLER_CHANNELS",
        value_delimiter = ',',
        num_args = 1..,
        required = true,
    )]
    pub channels: Vec<ChannelSpec>,

    /// Action applied to a pack once it is detected on its channel.
    #[clap(long, value_enum, default_value = "rest", env = "CYCLER_INITIAL_ACTION")]
    pub action: Action,

    #[clap(flatten)]
    pub config: ConfigArgs,
}

#[derive(Parser)]
pub struct ProbeArgs {
    /// Mux channels to probe.
    #[clap(long = "channel", value_delimiter = ',', num_args = 1.., default_value = "0,1,2")]
    pub channels: Vec<u8>,
}

#[derive(Parser)]
pub struct ConfigArgs {
    /// Path of the hot-reloadable configuration file.
    #[clap(long, env = "CYCLER_CONFIG", default_value = "config.json")]
    pub config: PathBuf,
}

/// One bench channel and the serial number of the pack expected on it.
#[derive(Clone)]
pub struct ChannelSpec {
    pub channel: u8,
    pub serial_number: SerialNumber,
}

impl FromStr for ChannelSpec {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let (channel, serial_number) =
            raw.split_once(':').context("expected `<channel>:<serial-number>`")?;
        let channel = channel.parse().context("the channel must be a small number")?;
        ensure!(channel < 3, "the bench only has channels 0 through 2");
        Ok(Self { channel, serial_number: serial_number.parse()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_spec() {
        let spec: ChannelSpec = "1:PACK-01".parse().unwrap();
        assert_eq!(spec.channel, 1);
        assert_eq!(spec.serial_number.as_str(), "PACK-01");
    }

    #[test]
    fn test_channel_spec_rejects_garbage() {
        assert!("PACK-01".parse::<ChannelSpec>().is_err());
        assert!("9:PACK-01".parse::<ChannelSpec>().is_err());
        assert!("x:PACK-01".parse::<ChannelSpec>().is_err());
    }
}

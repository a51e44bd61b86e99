use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::{prelude::*, quantity::voltage::Volts};

/// Bench configuration, re-read from disk on every tick so that threshold
/// changes apply without a restart.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Seconds between ticks.
    pub update_time: u64,

    pub max_voltage: Volts,
    pub partial_voltage: Volts,
    pub min_voltage: Volts,

    /// Full-charge leg timeout, seconds.
    pub max_charge_time: i64,

    /// Full-discharge leg timeout, seconds.
    pub max_discharge_time: i64,

    /// Volts per second at which a declining voltage ends a charge leg.
    /// Not calibrated, keep it adjustable.
    pub charge_slope_threshold: f64,

    pub logs_folder: PathBuf,
    pub reports_folder: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            update_time: 5,
            max_voltage: Volts(29.6),
            partial_voltage: Volts(28.3),
            min_voltage: Volts(22.0),
            max_charge_time: 28_800,
            max_discharge_time: 19_800,
            charge_slope_threshold: -1.0,
            logs_folder: "logs".into(),
            reports_folder: "reports".into(),
        }
    }
}

impl BenchConfig {
    /// Load the configuration, falling back to the defaults when the file is
    /// missing, empty, or broken.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(error) => {
                warn!("falling back to the default configuration: {error:#}");
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("could not read `{}`", path.display()))?;
        if contents.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("could not parse `{}`", path.display()))
    }

    #[must_use]
    pub const fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_time)
    }

    #[must_use]
    pub const fn max_charge_time(&self) -> TimeDelta {
        TimeDelta::seconds(self.max_charge_time)
    }

    #[must_use]
    pub const fn max_discharge_time(&self) -> TimeDelta {
        TimeDelta::seconds(self.max_discharge_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.update_time, 5);
        assert_eq!(config.max_voltage, Volts(29.6));
        assert_eq!(config.max_charge_time(), TimeDelta::hours(8));
    }

    #[test]
    fn test_missing_file_is_the_defaults() {
        let config = BenchConfig::load(Path::new("does-not-exist.json"));
        assert_eq!(config.partial_voltage, Volts(28.3));
    }

    #[test]
    fn test_partial_overrides() {
        let config: BenchConfig =
            serde_json::from_str(r#"{"max_voltage": 30.1, "update_time": 2}"#).unwrap();
        assert_eq!(config.max_voltage, Volts(30.1));
        assert_eq!(config.update_time, 2);
        assert_eq!(config.min_voltage, Volts(22.0));
    }
}

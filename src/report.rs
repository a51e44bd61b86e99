use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use comfy_table::{Attribute, Cell, CellAlignment, Table, modifiers, presets};
use itertools::Itertools;

use crate::{
    core::CapacityReport,
    journal::{Category, Journal},
    prelude::*,
};

/// Consumer-side cap on the exported time series.
const MAX_EXPORT_POINTS: usize = 1000;

/// Write the report artifacts for a finished capacity test: a copy of the
/// journal, the voltage and charge series as CSV, and a TOML summary.
pub fn write(report: &CapacityReport, journal: &Journal, reports_folder: &Path) -> Result<PathBuf> {
    let folder = reports_folder.join(journal.file_stem());
    fs::create_dir_all(&folder)
        .with_context(|| format!("could not create the report folder `{}`", folder.display()))?;

    journal.copy_to(&folder)?;
    export_csv(journal, Category::Voltage, &folder.join("voltage.csv"))?;
    export_csv(journal, Category::Charge, &folder.join("charge.csv"))?;
    fs::write(
        folder.join("summary.toml"),
        toml::to_string_pretty(report).context("could not serialize the summary")?,
    )
    .context("could not write the summary")?;

    info!(
        serial_number = %report.serial_number,
        measured_capacity = %report.measured_capacity,
        "capacity test finished",
    );
    info!("\n{}", build_summary_table(report));
    Ok(folder)
}

fn export_csv(journal: &Journal, category: Category, path: &Path) -> Result {
    let mut samples = journal.query(category)?;
    downsample(&mut samples);
    let contents = format!(
        "time,value\n{}",
        samples
            .iter()
            .map(|(timestamp, value)| format!("{},{value}", timestamp.to_rfc3339()))
            .join("\n"),
    );
    fs::write(path, contents)
        .with_context(|| format!("could not write `{}`", path.display()))
}

/// Evict excess points round-robin so the export stays plottable.
fn downsample(samples: &mut Vec<(DateTime<Local>, f64)>) {
    let excess = samples.len().saturating_sub(MAX_EXPORT_POINTS);
    for index in 0..excess {
        samples.remove(index % samples.len());
    }
}

fn build_summary_table(report: &CapacityReport) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec!["Leg", "Started", "Ended", "Charge"]);
    for (label, leg) in [
        ("Full charge", report.full_charge),
        ("Full discharge", report.full_discharge),
        ("Partial charge", report.partial_charge),
    ] {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(leg.started_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(leg.ended_at.format("%Y-%m-%d %H:%M:%S")).add_attribute(Attribute::Dim),
            Cell::new(format!("{:.0} mAh", leg.charge.0)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn at(seconds: i64) -> DateTime<Local> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap().with_timezone(&Local)
            + TimeDelta::seconds(seconds)
    }

    #[test]
    fn test_downsample_caps_the_series() {
        let mut samples: Vec<_> = (0..1005_i64).map(|index| (at(index), 28.0)).collect();
        downsample(&mut samples);
        assert_eq!(samples.len(), MAX_EXPORT_POINTS);
    }

    #[test]
    fn test_downsample_keeps_short_series() {
        let mut samples = vec![(at(0), 28.1), (at(5), 28.2)];
        downsample(&mut samples);
        assert_eq!(samples.len(), 2);
    }
}

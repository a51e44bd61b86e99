use std::{
    fmt::Display,
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};

use crate::prelude::*;

const SEPARATOR: char = '\t';

/// Event categories, one per journal line.
#[derive(Copy, Clone, Debug, derive_more::Display, Eq, PartialEq)]
pub enum Category {
    #[display("GENERAL")]
    General,

    #[display("STATUS")]
    Status,

    #[display("VOLTAGE")]
    Voltage,

    #[display("ERROR")]
    Error,

    #[display("ACTION")]
    Action,

    #[display("CHARGE")]
    Charge,
}

/// The core's only view of the event log.
pub trait EventSink {
    fn append(&mut self, at: DateTime<Local>, category: Category, value: impl Display);

    /// Rotate to a new identifier, for example after a serial number change.
    fn set_id(&mut self, _id: &str) {}
}

/// Append-only TSV event log, one file per pack.
///
/// Lines are `timestamp TAB id TAB CATEGORY TAB value`, timestamps in
/// RFC 3339. Append failures are traced and swallowed so that a full disk
/// cannot take the state machine down.
pub struct Journal {
    id: String,
    file_name: String,
    path: PathBuf,
    folder: PathBuf,
}

impl Journal {
    pub fn create(folder: &Path, id: &str, now: DateTime<Local>) -> Result<Self> {
        fs::create_dir_all(folder)
            .with_context(|| format!("could not create the log folder `{}`", folder.display()))?;
        let file_name = Self::file_name_for(id, now);
        Ok(Self {
            id: id.to_owned(),
            path: folder.join(&file_name),
            file_name,
            folder: folder.to_owned(),
        })
    }

    fn file_name_for(id: &str, now: DateTime<Local>) -> String {
        format!("{id}_{}.log", now.format("%Y-%m-%dT%H-%M-%S"))
    }

    #[must_use]
    pub fn file_stem(&self) -> &str {
        self.file_name.trim_end_matches(".log")
    }

    /// Copy the journal file into another folder, keeping the file name.
    pub fn copy_to(&self, folder: &Path) -> Result<PathBuf> {
        let target = folder.join(&self.file_name);
        fs::copy(&self.path, &target)
            .with_context(|| format!("could not copy the journal to `{}`", target.display()))?;
        Ok(target)
    }

    /// All numeric samples of the category, in append order.
    pub fn query(&self, category: Category) -> Result<Vec<(DateTime<Local>, f64)>> {
        let file = File::open(&self.path)
            .with_context(|| format!("could not open the journal `{}`", self.path.display()))?;
        let mut samples = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.context("could not read a journal line")?;
            let mut fields = line.split(SEPARATOR);
            let (Some(timestamp), Some(_id), Some(kind), Some(value)) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            if kind != category.to_string() {
                continue;
            }
            let Ok(timestamp) = DateTime::parse_from_rfc3339(timestamp) else {
                continue;
            };
            let Ok(value) = value.trim().parse::<f64>() else {
                continue;
            };
            samples.push((timestamp.with_timezone(&Local), value));
        }
        Ok(samples)
    }

    fn append_line(&self, line: &str) -> Result {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

impl EventSink for Journal {
    fn append(&mut self, at: DateTime<Local>, category: Category, value: impl Display) {
        let line =
            format!("{}{SEPARATOR}{}{SEPARATOR}{category}{SEPARATOR}{value}", at.to_rfc3339(), self.id);
        debug!("{line}");
        if let Err(error) = self.append_line(&line) {
            error!("could not append to `{}`: {error:#}", self.path.display());
        }
    }

    fn set_id(&mut self, id: &str) {
        self.id = id.to_owned();
        self.file_name = Self::file_name_for(id, Local::now());
        self.path = self.folder.join(&self.file_name);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn at(seconds: i64) -> DateTime<Local> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap().with_timezone(&Local)
            + TimeDelta::seconds(seconds)
    }

    fn scratch_folder(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("cycler-journal-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_append_and_query() {
        let folder = scratch_folder("roundtrip");
        let mut journal = Journal::create(&folder, "PACK-01", at(0)).unwrap();

        journal.append(at(0), Category::Voltage, 28.1);
        journal.append(at(5), Category::Charge, -120.5);
        journal.append(at(10), Category::Voltage, 28.2);
        journal.append(at(10), Category::General, "Connected");

        let voltages = journal.query(Category::Voltage).unwrap();
        assert_eq!(voltages.len(), 2);
        assert_eq!(voltages[0], (at(0), 28.1));
        assert_eq!(voltages[1], (at(10), 28.2));

        let charges = journal.query(Category::Charge).unwrap();
        assert_eq!(charges, vec![(at(5), -120.5)]);

        assert!(journal.query(Category::Error).unwrap().is_empty());
        fs::remove_dir_all(&folder).unwrap();
    }

    #[test]
    fn test_copy_to() {
        let folder = scratch_folder("copy");
        let mut journal = Journal::create(&folder, "PACK-02", at(0)).unwrap();
        journal.append(at(0), Category::General, "Connected");

        let target_folder = folder.join("report");
        fs::create_dir_all(&target_folder).unwrap();
        let copied = journal.copy_to(&target_folder).unwrap();
        assert!(copied.exists());
        fs::remove_dir_all(&folder).unwrap();
    }
}

//! The daily time series of host counts, and its CSV form.
//!
//! One row is recorded at the start of a run and one more for every whole day the clock
//! crosses. The CSV header is `time,infected,uninfected,infested,uninfested,treated`.

use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::Path;

use csv::{Reader, Writer};
use serde_derive::{Deserialize, Serialize};

use crate::error::SimError;
use crate::world::HostCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounts {
    /// Whole day of the run the row was recorded for.
    pub time: u32,
    pub infected: usize,
    pub uninfected: usize,
    pub infested: usize,
    pub uninfested: usize,
    pub treated: usize,
}

impl DailyCounts {
    #[must_use]
    pub fn new(time: u32, counts: HostCounts) -> Self {
        DailyCounts {
            time,
            infected: counts.infected,
            uninfected: counts.uninfected,
            infested: counts.infested,
            uninfested: counts.uninfested,
            treated: counts.treated,
        }
    }

    #[must_use]
    pub fn hosts(&self) -> usize {
        self.infected + self.uninfected
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    rows: Vec<DailyCounts>,
}

// Checks that the path names a CSV file, creating parent directories as needed.
fn generate_validate_filepath(path: &Path) -> Result<File, SimError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    create_dir_all(parent)?;
                }
            }
            Ok(File::create(path)?)
        }
        _ => Err(SimError::SimError(format!(
            "time series files must be CSVs: {}",
            path.display()
        ))),
    }
}

impl TimeSeries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: DailyCounts) {
        self.rows.push(row);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    #[must_use]
    pub fn rows(&self) -> &[DailyCounts] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&DailyCounts> {
        self.rows.last()
    }

    /// # Errors
    /// Returns a `SimError` if a row cannot be serialized or written.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), SimError> {
        let mut writer = Writer::from_writer(writer);
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// # Errors
    /// Returns a `SimError` if the text is not a well-formed time series.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, SimError> {
        let mut reader = Reader::from_reader(reader);
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: DailyCounts = record?;
            rows.push(row);
        }
        Ok(TimeSeries { rows })
    }

    /// Writes the series to a `.csv` file, creating parent directories.
    ///
    /// # Errors
    /// Returns a `SimError` for a non-CSV path or any I/O failure.
    pub fn export(&self, path: &Path) -> Result<(), SimError> {
        let file = generate_validate_filepath(path)?;
        self.write_csv(file)
    }

    /// # Errors
    /// Returns a `SimError` if the file cannot be opened or parsed.
    pub fn import(path: &Path) -> Result<Self, SimError> {
        let file = File::open(path)?;
        Self::read_csv(file)
    }
}

impl FromIterator<DailyCounts> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = DailyCounts>>(iter: I) -> Self {
        TimeSeries {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> TimeSeries {
        (0..3u32)
            .map(|day| DailyCounts {
                time: day,
                infected: 10 + day as usize,
                uninfected: 90 - day as usize,
                infested: 20,
                uninfested: 80,
                treated: 0,
            })
            .collect()
    }

    #[test]
    fn csv_header_and_rows() {
        let mut buffer = Vec::new();
        sample().write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("time,infected,uninfected,infested,uninfested,treated")
        );
        assert_eq!(lines.next(), Some("0,10,90,20,80,0"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn export_then_import() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("runs").join("series.csv");
        let series = sample();
        series.export(&path).unwrap();
        assert!(path.exists(), "CSV file should exist");
        let loaded = TimeSeries::import(&path).unwrap();
        assert_eq!(loaded, series);
        assert_eq!(loaded.last().unwrap().hosts(), 100);
    }

    #[test]
    fn only_csvs_allowed() {
        let temp_dir = tempdir().unwrap();
        let result = sample().export(&temp_dir.path().join("series.tsv"));
        assert!(matches!(result, Err(SimError::SimError(msg)) if msg.contains("CSVs")));
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let text = "time,infected,uninfected,infested,uninfested,treated\n0,1,x,0,0,0\n";
        assert!(matches!(
            TimeSeries::read_csv(text.as_bytes()),
            Err(SimError::CSVError(_))
        ));
    }
}

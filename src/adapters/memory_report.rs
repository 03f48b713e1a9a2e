//! In-memory report sink with CSV export.

use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::domain::error::SimError;
use crate::ports::report_port::ReportSink;

/// Collects every series by instant. Values received outside a reporting
/// cycle are ignored.
#[derive(Debug, Clone, Default)]
pub struct MemoryReport {
    instants: Vec<NaiveDate>,
    series: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
    current: Option<NaiveDate>,
    cycles: usize,
}

impl MemoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instants(&self) -> &[NaiveDate] {
        &self.instants
    }

    pub fn series_names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Points of one series in time order.
    pub fn series(&self, name: &str) -> Vec<(NaiveDate, f64)> {
        self.series
            .get(name)
            .map(|points| points.iter().map(|(d, v)| (*d, *v)).collect())
            .unwrap_or_default()
    }

    pub fn value(&self, instant: NaiveDate, name: &str) -> Option<f64> {
        self.series.get(name)?.get(&instant).copied()
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// One row per instant, one column per series; blank where a series had
    /// no value on that instant.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), SimError> {
        let mut wtr = csv::Writer::from_writer(writer);
        let csv_err = |e: csv::Error| SimError::Io(std::io::Error::other(e));

        let mut header = vec!["date".to_string()];
        header.extend(self.series.keys().cloned());
        wtr.write_record(&header).map_err(csv_err)?;

        for instant in &self.instants {
            let mut row = vec![instant.format("%Y-%m-%d").to_string()];
            row.extend(
                self.series
                    .values()
                    .map(|points| points.get(instant).map(|v| v.to_string()).unwrap_or_default()),
            );
            wtr.write_record(&row).map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv_file(&self, path: &Path) -> Result<(), SimError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

impl ReportSink for MemoryReport {
    fn start_reporting_cycle(&mut self, instant: NaiveDate) {
        if self.instants.last() != Some(&instant) {
            self.instants.push(instant);
        }
        self.current = Some(instant);
    }

    fn receive_data(&mut self, source: &str, value: f64) {
        let Some(instant) = self.current else {
            debug!("dropping {source}={value} outside a reporting cycle");
            return;
        };
        self.series
            .entry(source.to_string())
            .or_default()
            .insert(instant, value);
    }

    fn collect_reports(&mut self) {
        self.current = None;
        self.cycles += 1;
    }
}

//! Reporting sink port trait.

use chrono::NaiveDate;

/// Receives named scalar time series produced during a simulation.
///
/// A cycle is opened once per simulated instant, data points are pushed
/// while accounts process that instant, then the cycle is collected.
pub trait ReportSink {
    fn start_reporting_cycle(&mut self, instant: NaiveDate);
    fn receive_data(&mut self, source: &str, value: f64);
    fn collect_reports(&mut self);
}

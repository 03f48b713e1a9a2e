//! Narrow `emit(name, value)` capability handed to reporting components.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ports::report_port::ReportSink;

/// A sink shared between the driver and everything that emits into it.
/// Simulations are single threaded.
pub type SharedSink = Rc<RefCell<dyn ReportSink>>;

/// Emits series named `<prefix>.<name>`. A disabled emitter drops everything.
#[derive(Clone, Default)]
pub struct Emitter {
    sink: Option<SharedSink>,
    prefix: String,
}

impl Emitter {
    pub fn new(sink: SharedSink, prefix: impl Into<String>) -> Self {
        Emitter {
            sink: Some(sink),
            prefix: prefix.into(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Emitter sharing the same sink under `<prefix>.<child>`.
    pub fn scoped(&self, child: &str) -> Emitter {
        Emitter {
            sink: self.sink.clone(),
            prefix: self.series_name(child),
        }
    }

    pub fn emit(&self, name: &str, value: f64) {
        if let Some(sink) = &self.sink {
            sink.borrow_mut().receive_data(&self.series_name(name), value);
        }
    }

    fn series_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix, name)
        }
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("prefix", &self.prefix)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Default)]
    struct Recorder {
        points: Vec<(String, f64)>,
    }

    impl ReportSink for Recorder {
        fn start_reporting_cycle(&mut self, _instant: NaiveDate) {}
        fn receive_data(&mut self, source: &str, value: f64) {
            self.points.push((source.to_string(), value));
        }
        fn collect_reports(&mut self) {}
    }

    #[test]
    fn scoped_names() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let emitter = Emitter::new(recorder.clone(), "acct");
        emitter.emit("NAV", 1.0);
        emitter.scoped("XX").emit("POS", 2.0);

        let points = &recorder.borrow().points;
        assert_eq!(points[0], ("acct.NAV".to_string(), 1.0));
        assert_eq!(points[1], ("acct.XX.POS".to_string(), 2.0));
    }

    #[test]
    fn disabled_drops_everything() {
        let emitter = Emitter::disabled();
        emitter.emit("NAV", 1.0);
        assert!(!emitter.is_enabled());
        assert!(!emitter.scoped("x").is_enabled());
    }
}

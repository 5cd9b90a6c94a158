use foundation::Millis;
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    /// Shown to the user as a non-blocking message.
    Notice,
}

/// One degradation or noteworthy event, kept for the host to inspect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub at: f64,
    pub component: &'static str,
    pub severity: Severity,
    pub message: String,
}

/// Ordered record of what went wrong (or nearly so) since the last drain.
/// Every report is also logged.
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &mut self,
        at: Millis,
        component: &'static str,
        severity: Severity,
        message: impl Into<String>,
    ) {
        let message = message.into();
        match severity {
            Severity::Info => info!(component, "{message}"),
            Severity::Warning | Severity::Notice => warn!(component, "{message}"),
            Severity::Error => error!(component, "{message}"),
        }
        self.records.push(Diagnostic {
            at: at.0,
            component,
            severity,
            message,
        });
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn notices(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records
            .iter()
            .filter(|d| d.severity == Severity::Notice)
    }

    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostics, Severity};
    use foundation::Millis;

    #[test]
    fn keeps_reports_in_order() {
        let mut d = Diagnostics::new();
        d.report(Millis(1.0), "overlay", Severity::Warning, "HTTP 503");
        d.report(Millis(2.0), "geocoder", Severity::Notice, "search unavailable");
        assert_eq!(d.records().len(), 2);
        assert_eq!(d.records()[0].component, "overlay");
        assert_eq!(d.notices().count(), 1);
    }

    #[test]
    fn drain_clears_records() {
        let mut d = Diagnostics::new();
        d.report(Millis(0.0), "basemap", Severity::Error, "style missing");
        let drained = d.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].severity, Severity::Error);
        assert!(d.records().is_empty());
    }
}

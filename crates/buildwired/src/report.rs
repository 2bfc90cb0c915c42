//! Serialization of build reports into response records.

use buildwire_protocol::BuildReport;
use thiserror::Error;

/// Failure to render a report.
#[derive(Debug, Error)]
#[error("failed to render build report: {message}")]
pub struct ReportError {
    message: String,
}

impl ReportError {
    /// Creates an error with a description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Renders a [`BuildReport`] into the text stored in `Response::report`.
pub trait ReportFormat: Send + Sync {
    /// Renders `report`.
    ///
    /// # Errors
    ///
    /// Returns a [`ReportError`] when the report cannot be rendered; the
    /// session then sends an empty report.
    fn render(&self, report: &BuildReport) -> Result<String, ReportError>;
}

/// JSON rendering understood by the client.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReport;

impl ReportFormat for JsonReport {
    fn render(&self, report: &BuildReport) -> Result<String, ReportError> {
        report
            .to_json()
            .map_err(|error| ReportError::new(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use buildwire_protocol::BuildEvent;

    use super::*;

    #[test]
    fn json_report_round_trips_through_the_client_parser() {
        let report = BuildReport::new(vec![BuildEvent::TargetStarted {
            target: "compile".into(),
        }]);
        let text = JsonReport.render(&report).expect("render");
        assert_eq!(BuildReport::from_json(&text).expect("parse"), report);
    }
}

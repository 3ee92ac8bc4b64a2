use std::path::Path;

use junit_report::{Duration, ReportBuilder, TestCaseBuilder, TestSuiteBuilder};

use crate::runner::TestReport;
use crate::TbError;

/// Writes one JUnit test suite named `suite` with a test case per report.
pub fn write_junit_xml(path: &Path, suite: &str, reports: &[TestReport]) -> Result<(), TbError> {
    let test_cases: Vec<_> = reports
        .iter()
        .map(|r| {
            let time = Duration::seconds_f64(r.time_secs);
            match &r.result {
                Ok(_) => TestCaseBuilder::success(&r.name, time),
                Err(e) => TestCaseBuilder::failure(&r.name, time, failure_kind(e), &e.to_string()),
            }
            .build()
        })
        .collect();

    let test_suite = TestSuiteBuilder::new(suite)
        .add_testcases(test_cases)
        .build();
    let report = ReportBuilder::new().add_testsuite(test_suite).build();
    let file = std::fs::File::create(path)
        .map_err(|e| TbError::Report(format!("{}: {}", path.display(), e)))?;
    report
        .write_xml(file)
        .map_err(|e| TbError::Report(format!("{}: {}", path.display(), e)))
}

fn failure_kind(err: &TbError) -> &'static str {
    match err {
        TbError::Timeout { .. } => "timeout",
        TbError::InvariantViolation { .. } => "invariant",
        _ => "harness",
    }
}

// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use serde::Deserialize;

use crate::errors::ReportError;

/// Summary attributes of one test run, as emitted by the test runner's XML report.  Counters the
/// runner omits default to zero.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct TestReport {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@result", default)]
    pub result: String,
    #[serde(rename = "@assertions_passed", default)]
    pub assertions_passed: i64,
    #[serde(rename = "@assertions_failed", default)]
    pub assertions_failed: i64,
    #[serde(rename = "@test_cases_passed", default)]
    pub cases_passed: i64,
    #[serde(rename = "@test_cases_failed", default)]
    pub cases_failed: i64,
    #[serde(rename = "@test_cases_skipped", default)]
    pub cases_skipped: i64,
    #[serde(rename = "@test_cases_aborted", default)]
    pub cases_aborted: i64,
}

pub fn parse_report(xml: &str) -> Result<TestReport, ReportError> {
    Ok(quick_xml::de::from_str(xml)?)
}

/// A test result awaiting insertion alongside its build.  Built from a report document only; the
/// row-backed shape is [`TestResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTestResult {
    pub name: String,
    pub result: String,
    pub assertions_passed: i64,
    pub assertions_failed: i64,
    pub cases_passed: i64,
    pub cases_failed: i64,
    pub cases_skipped: i64,
    pub cases_aborted: i64,
}

impl NewTestResult {
    #[must_use]
    pub fn from_report(report: &TestReport) -> NewTestResult {
        NewTestResult {
            name: report.name.clone(),
            result: report.result.clone(),
            assertions_passed: report.assertions_passed,
            assertions_failed: report.assertions_failed,
            cases_passed: report.cases_passed,
            cases_failed: report.cases_failed,
            cases_skipped: report.cases_skipped,
            cases_aborted: report.cases_aborted,
        }
    }

    /// A report with an empty `result` is never persisted; its build simply has no test result
    /// row.
    #[must_use]
    pub fn has_result(&self) -> bool {
        !self.result.is_empty()
    }
}

/// One stored test result; 1:1 with its build, immutable once inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub build_id: i64,
    pub name: String,
    pub result: String,
    pub assertions_passed: i64,
    pub assertions_failed: i64,
    pub cases_passed: i64,
    pub cases_failed: i64,
    pub cases_skipped: i64,
    pub cases_aborted: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_report_parses() {
        let xml = r#"<TestResult name="main_suite" result="FAIL"
            assertions_passed="10" assertions_failed="2"
            test_cases_passed="4" test_cases_failed="1"
            test_cases_skipped="0" test_cases_aborted="0"/>"#;
        let report = parse_report(xml).unwrap();
        assert_eq!(report.name, "main_suite");
        assert_eq!(report.result, "FAIL");
        assert_eq!(report.assertions_passed, 10);
        assert_eq!(report.assertions_failed, 2);
        assert_eq!(report.cases_passed, 4);
        assert_eq!(report.cases_failed, 1);
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let report = parse_report(r#"<TestResult name="t" result="PASS"/>"#).unwrap();
        assert_eq!(report.assertions_passed, 0);
        assert_eq!(report.cases_aborted, 0);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(parse_report("<TestResult").is_err());
    }

    #[test]
    fn empty_result_is_not_insertable() {
        let report = parse_report(r#"<TestResult name="t"/>"#).unwrap();
        assert!(!NewTestResult::from_report(&report).has_result());

        let report = parse_report(r#"<TestResult name="t" result="PASS"/>"#).unwrap();
        assert!(NewTestResult::from_report(&report).has_result());
    }
}

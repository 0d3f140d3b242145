// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::LazyLock;

use regex::Regex;

use crate::model::Verdict;

/// Phrase the build system prints when nothing needed rebuilding; such an invocation must not be
/// recorded at all.
const UP_TO_DATE_SENTINEL: &str = "`test' is up to date.";

static DIAGNOSTIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^.*(?:error:|warning:|note:|undefined reference|ld returned \d exit status).*$")
        .unwrap()
});

static BINARY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"test output written to \./([A-Za-z0-9_-]+)").unwrap());

// Build output lands under a profile-specific directory whose absolute prefix differs between
// build machines; diagnostics must compare equal across them.
static BUILD_DIR_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\s:]*build/(?:debug|release)/").unwrap());

/// Outcome of scanning one build transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The transcript reported that everything was already built; the caller must not persist a
    /// record for this invocation.
    UpToDate,
    Outcome(ClassifiedBuild),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedBuild {
    pub verdict: Verdict,
    /// Newline-joined diagnostic lines in transcript order; may be empty even on a good build.
    pub diagnostics: String,
    /// Name of the produced test binary, when the transcript got far enough to mention one.
    pub binary_name: Option<String>,
}

/// Classify a raw compiler transcript.  Pure function; persistence is the caller's concern.
///
/// A transcript with no recognizable pattern is not an error -- it classifies as a good build
/// with empty diagnostics.
#[must_use]
pub fn classify(transcript: &str) -> Classification {
    if transcript.contains(UP_TO_DATE_SENTINEL) {
        return Classification::UpToDate;
    }

    let transcript = BUILD_DIR_PREFIX.replace_all(transcript, "");

    let diagnostics = DIAGNOSTIC_LINE
        .find_iter(&transcript)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    // The overall verdict is a substring check over the joined diagnostic text, not a structured
    // per-line classification; any `ld returned` occurrence also fails the build.  Long-standing
    // behavior, kept as-is.
    let verdict = if diagnostics.contains("error") || diagnostics.contains("ld returned") {
        Verdict::Error
    } else {
        Verdict::Good
    };

    let binary_name = BINARY_NAME
        .captures(&transcript)
        .map(|c| c[1].to_string());

    Classification::Outcome(ClassifiedBuild {
        verdict,
        diagnostics,
        binary_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(transcript: &str) -> ClassifiedBuild {
        match classify(transcript) {
            Classification::Outcome(o) => o,
            Classification::UpToDate => panic!("unexpected up-to-date classification"),
        }
    }

    #[test]
    fn up_to_date_is_skipped() {
        let c = classify("scons: `test' is up to date.\n");
        assert_eq!(c, Classification::UpToDate);
    }

    #[test]
    fn error_line_fails_the_build() {
        let o = outcome("compiling...\nfoo.cpp: error: missing semicolon\n");
        assert_eq!(o.verdict, Verdict::Error);
        assert_eq!(o.diagnostics, "foo.cpp: error: missing semicolon");
    }

    #[test]
    fn warnings_and_notes_stay_good_but_are_retained() {
        let transcript = "\
g++ -c foo.cpp
foo.cpp:10: warning: unused variable 'x'
foo.cpp:11: note: declared here
g++ -c bar.cpp
";
        let o = outcome(transcript);
        assert_eq!(o.verdict, Verdict::Good);
        assert_eq!(
            o.diagnostics,
            "foo.cpp:10: warning: unused variable 'x'\nfoo.cpp:11: note: declared here"
        );
    }

    #[test]
    fn diagnostics_preserve_transcript_order() {
        let transcript = "\
a.cpp:1: warning: first
b.cpp:2: note: second
c.cpp:3: warning: third
";
        let o = outcome(transcript);
        assert_eq!(
            o.diagnostics,
            "a.cpp:1: warning: first\nb.cpp:2: note: second\nc.cpp:3: warning: third"
        );
    }

    #[test]
    fn undefined_reference_is_collected() {
        let o = outcome("foo.o: undefined reference to `bar()'\ncollect2: ld returned 1 exit status\n");
        assert_eq!(o.verdict, Verdict::Error);
        assert!(o.diagnostics.contains("undefined reference"));
        assert!(o.diagnostics.contains("ld returned 1 exit status"));
    }

    // Line collection is case-insensitive, but the verdict substring check is not; an
    // upper-case diagnostic is retained without failing the build.
    #[test]
    fn line_matching_is_case_insensitive() {
        let o = outcome("foo.cpp: ERROR: bad cast\n");
        assert_eq!(o.diagnostics, "foo.cpp: ERROR: bad cast");
        assert_eq!(o.verdict, Verdict::Good);
    }

    #[test]
    fn build_dir_prefixes_are_stripped() {
        let o = outcome("/home/ci/wt/build/debug/foo.cpp: warning: shadowed\n");
        assert_eq!(o.diagnostics, "foo.cpp: warning: shadowed");
    }

    #[test]
    fn binary_name_is_captured() {
        let o = outcome("linking...\ntest output written to ./unit_tests-v2\n");
        assert_eq!(o.binary_name, Some(String::from("unit_tests-v2")));
        assert_eq!(o.verdict, Verdict::Good);
    }

    #[test]
    fn unmatched_transcript_is_good_and_empty() {
        let o = outcome("compiling foo.cpp\nlinking test\ndone\n");
        assert_eq!(o.verdict, Verdict::Good);
        assert_eq!(o.diagnostics, "");
        assert_eq!(o.binary_name, None);
    }

    // A warning whose text happens to contain the `error` substring flips the verdict; the rule
    // is a substring check over the joined text.
    #[test]
    fn error_substring_in_warning_fails_the_build() {
        let o = outcome("foo.cpp: warning: unused variable 'error_count'\n");
        assert_eq!(o.verdict, Verdict::Error);
    }
}

// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use time::PrimitiveDateTime;
use tokio::sync::OnceCell;

use crate::classify::ClassifiedBuild;
use crate::report::TestResult;
use crate::store::{BuildDatabase, BuildDatabaseDetailedError};

/// Reserved id for the "before any real build" record; always good, so lineage walks terminate.
pub const BASELINE_ID: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Good,
    Error,
}

impl Verdict {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Good => "good",
            Verdict::Error => "error",
        }
    }

    /// Style token handed to the presentation layer.
    #[must_use]
    pub fn style(self) -> &'static str {
        match self {
            Verdict::Good => "passed",
            Verdict::Error => "failed",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVerdict(pub String);

impl fmt::Display for UnknownVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown verdict: `{}`", self.0)
    }
}

impl std::error::Error for UnknownVerdict {}

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(Verdict::Good),
            "error" => Ok(Verdict::Error),
            other => Err(UnknownVerdict(String::from(other))),
        }
    }
}

/// A build awaiting insertion; produced from a classification, never from a store row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBuild {
    pub revision: i64,
    pub build_time: PrimitiveDateTime,
    pub verdict: Verdict,
    pub diagnostics: String,
    pub binary_name: Option<String>,
}

impl NewBuild {
    #[must_use]
    pub fn from_classification(
        revision: i64,
        build_time: PrimitiveDateTime,
        classified: ClassifiedBuild,
    ) -> NewBuild {
        NewBuild {
            revision,
            build_time,
            verdict: classified.verdict,
            diagnostics: classified.diagnostics,
            binary_name: classified.binary_name,
        }
    }
}

/// One persisted build.  Insert-only; the pruner deletes whole records but nothing edits them.
#[derive(Debug)]
pub struct BuildRecord {
    pub id: i64,
    pub revision: i64,
    pub build_time: PrimitiveDateTime,
    pub verdict: Verdict,
    pub diagnostics: String,
    pub binary_name: Option<String>,
    // Lineage resolution is a store round-trip, so the result is memoized per instance.
    previous_good: OnceCell<i64>,
}

impl BuildRecord {
    /// Construct from an already-persisted row.  The only other way to obtain a build is to
    /// insert a [`NewBuild`] and fetch it back.
    #[must_use]
    pub fn from_row(
        id: i64,
        revision: i64,
        build_time: PrimitiveDateTime,
        verdict: Verdict,
        diagnostics: String,
        binary_name: Option<String>,
    ) -> BuildRecord {
        BuildRecord {
            id,
            revision,
            build_time,
            verdict,
            diagnostics,
            binary_name,
            previous_good: OnceCell::new(),
        }
    }

    /// Id of the most recent good build strictly before this one, falling back to the baseline
    /// when no such build exists.  Resolved against the store once and cached.
    pub async fn previous_good<DB: BuildDatabase>(
        &self,
        db: &DB,
    ) -> Result<i64, BuildDatabaseDetailedError> {
        let id = self
            .previous_good
            .get_or_try_init(|| async {
                Ok::<_, BuildDatabaseDetailedError>(
                    db.previous_good_id(self.id).await?.unwrap_or(BASELINE_ID),
                )
            })
            .await?;
        Ok(*id)
    }

    /// The anchor for "since when has this been broken": the build itself when good, otherwise
    /// its most recent good ancestor.
    pub async fn last_working_id<DB: BuildDatabase>(
        &self,
        db: &DB,
    ) -> Result<i64, BuildDatabaseDetailedError> {
        if self.verdict == Verdict::Good {
            return Ok(self.id);
        }
        self.previous_good(db).await
    }
}

/// Per-build row handed to the presentation layer; no markup, just data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub id: i64,
    pub build_time: PrimitiveDateTime,
    pub style: &'static str,
    pub result_line: String,
    pub diagnostics: String,
    pub revision: i64,
    /// Absent when the test runner never produced a usable report for this build.
    pub test: Option<TestResult>,
}

impl BuildSummary {
    #[must_use]
    pub fn new(build: &BuildRecord, test: Option<TestResult>) -> BuildSummary {
        let result_line = match build.verdict {
            Verdict::Good => String::from("Build succeeded."),
            Verdict::Error => format!("Build failed:\n{}", build.diagnostics),
        };
        BuildSummary {
            id: build.id,
            build_time: build.build_time,
            style: build.verdict.style(),
            result_line,
            diagnostics: build.diagnostics.clone(),
            revision: build.revision,
            test,
        }
    }
}

/// One page of build history, most recent build first.
#[derive(Debug)]
pub struct HistoryPage {
    pub page: u32,
    pub total_pages: u32,
    pub summaries: Vec<BuildSummary>,
}

/// Fetch one page of history.  Pages are 1-based; a page beyond the data yields an empty list,
/// not an error.
pub async fn fetch_history_page<DB: BuildDatabase>(
    db: &DB,
    page: u32,
    builds_per_page: u32,
) -> Result<HistoryPage, BuildDatabaseDetailedError> {
    let page = page.max(1);
    let per_page = i64::from(builds_per_page);
    if per_page == 0 {
        // A zero page size is presentable as an empty history, not a panic.
        return Ok(HistoryPage {
            page,
            total_pages: 0,
            summaries: vec![],
        });
    }

    let count = db.build_count().await?;
    let total_pages = u32::try_from((count + per_page - 1) / per_page).unwrap_or(u32::MAX);

    let offset = i64::from(page - 1) * per_page;
    let builds = db.fetch_page(offset, per_page).await?;

    // One query for the whole page's test results, keyed back to their builds.
    let ids: Vec<i64> = builds.iter().map(|b| b.id).collect();
    let mut results: HashMap<i64, TestResult> = db
        .fetch_test_results(&ids)
        .await?
        .into_iter()
        .map(|tr| (tr.build_id, tr))
        .collect();

    let summaries = builds
        .iter()
        .map(|build| BuildSummary::new(build, results.remove(&build.id)))
        .collect();

    Ok(HistoryPage {
        page,
        total_pages,
        summaries,
    })
}

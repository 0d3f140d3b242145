// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Result;
use log::{debug, info};
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use crate::stats::ErrorCatalog;
use crate::store::BuildDatabase;

/// Periodic sweep that deletes builds behaviorally identical to their immediate predecessor,
/// once they are older than the retention window.  Not part of the ingestion path; safe to run
/// alongside concurrent inserts.
pub struct RetentionPruner {
    retention: Duration,
    max_candidates: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneOutcome {
    pub deleted: u64,
    /// Candidates whose predicate no longer held at delete time, plus error-catalog boundary
    /// builds.  Skips are recovered locally and never fail the sweep.
    pub skipped: u64,
}

impl RetentionPruner {
    #[must_use]
    pub fn new(retention: Duration, max_candidates: i64) -> RetentionPruner {
        RetentionPruner {
            retention,
            max_candidates,
        }
    }

    /// Run one bounded sweep: at most `max_candidates` candidates are examined, so the sweep can
    /// be time-sliced; stopping between candidates is always safe.
    pub async fn prune<DB: BuildDatabase, C: ErrorCatalog>(
        &self,
        db: &DB,
        catalog: &C,
    ) -> Result<PruneOutcome> {
        let now = OffsetDateTime::now_utc();
        let now = PrimitiveDateTime::new(now.date(), now.time());
        let cutoff = now - self.retention;
        self.prune_at(db, catalog, cutoff).await
    }

    /// As [`Self::prune`], with an explicit cutoff instant.
    pub async fn prune_at<DB: BuildDatabase, C: ErrorCatalog>(
        &self,
        db: &DB,
        catalog: &C,
        cutoff: PrimitiveDateTime,
    ) -> Result<PruneOutcome> {
        let candidates = db.prune_candidates(cutoff, self.max_candidates).await?;
        debug!("prune sweep: {} candidate(s)", candidates.len());

        let mut outcome = PruneOutcome::default();
        for id in candidates {
            // Builds marking where a tracked error first appeared or was last seen must stay.
            if catalog.is_boundary(id).await? {
                debug!("build {id} is an error-catalog boundary; retained");
                outcome.skipped += 1;
                continue;
            }

            if db.delete_if_redundant(id, cutoff).await? {
                debug!("build {id} pruned");
                outcome.deleted += 1;
            } else {
                // The record changed between selection and delete (e.g. it became the newest
                // build); skip it this cycle.
                debug!("build {id} no longer redundant; skipped");
                outcome.skipped += 1;
            }
        }

        info!(
            "prune sweep finished: {} deleted, {} skipped",
            outcome.deleted, outcome.skipped
        );
        Ok(outcome)
    }
}

// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Result;

use crate::model::BuildRecord;
use crate::store::BuildDatabase;

/// Read-only view onto the external error catalog, which tracks named errors and the build range
/// over which each was observed.  This crate never writes to it.
#[allow(async_fn_in_trait)]
pub trait ErrorCatalog {
    /// Errors whose observed range touches any build with id >= `build_id`.
    async fn errors_since(&self, build_id: i64) -> Result<Vec<TrackedError>>;

    /// Whether `build_id` is the first or last observed build of any tracked error.  Such builds
    /// must never be pruned.
    async fn is_boundary(&self, build_id: i64) -> Result<bool>;
}

/// One tracked error as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedError {
    pub name: String,
    pub occurrences: i64,
    pub first_build_id: i64,
    pub last_build_id: i64,
}

impl TrackedError {
    #[must_use]
    pub fn statistics(&self) -> ErrorStatistics {
        ErrorStatistics {
            name: self.name.clone(),
            occurrences: self.occurrences,
            first_build_id: self.first_build_id,
            last_build_id: self.last_build_id,
        }
    }
}

/// Per-error occurrence summary for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorStatistics {
    pub name: String,
    pub occurrences: i64,
    pub first_build_id: i64,
    pub last_build_id: i64,
}

/// Error statistics for a build's lineage: everything the catalog has recorded since the build's
/// last working ancestor.  Thin aggregation only; the catalog owns the error data.
pub async fn error_statistics<DB: BuildDatabase, C: ErrorCatalog>(
    build: &BuildRecord,
    db: &DB,
    catalog: &C,
) -> Result<Vec<ErrorStatistics>> {
    let anchor = build.last_working_id(db).await?;
    let errors = catalog.errors_since(anchor).await?;
    Ok(errors.iter().map(TrackedError::statistics).collect())
}

/// Catalog with no tracked errors; the default when no catalog integration is configured.
pub struct NullErrorCatalog;

impl ErrorCatalog for NullErrorCatalog {
    async fn errors_since(&self, _build_id: i64) -> Result<Vec<TrackedError>> {
        Ok(vec![])
    }

    async fn is_boundary(&self, _build_id: i64) -> Result<bool> {
        Ok(false)
    }
}

/// Fixed in-memory catalog, mostly useful for tests and local experimentation.
#[derive(Debug, Default)]
pub struct StaticErrorCatalog {
    errors: Vec<TrackedError>,
}

impl StaticErrorCatalog {
    #[must_use]
    pub fn new(errors: Vec<TrackedError>) -> StaticErrorCatalog {
        StaticErrorCatalog { errors }
    }
}

impl ErrorCatalog for StaticErrorCatalog {
    async fn errors_since(&self, build_id: i64) -> Result<Vec<TrackedError>> {
        Ok(self
            .errors
            .iter()
            .filter(|e| e.last_build_id >= build_id)
            .cloned()
            .collect())
    }

    async fn is_boundary(&self, build_id: i64) -> Result<bool> {
        Ok(self
            .errors
            .iter()
            .any(|e| e.first_build_id == build_id || e.last_build_id == build_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(name: &str, first: i64, last: i64) -> TrackedError {
        TrackedError {
            name: String::from(name),
            occurrences: last - first + 1,
            first_build_id: first,
            last_build_id: last,
        }
    }

    #[tokio::test]
    async fn null_catalog_is_empty() {
        let catalog = NullErrorCatalog;
        assert!(catalog.errors_since(0).await.unwrap().is_empty());
        assert!(!catalog.is_boundary(5).await.unwrap());
    }

    #[tokio::test]
    async fn static_catalog_filters_by_lineage_anchor() {
        let catalog = StaticErrorCatalog::new(vec![
            tracked("assertion in display.cpp", 3, 7),
            tracked("segfault in units", 1, 2),
        ]);

        let errors = catalog.errors_since(3).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name, "assertion in display.cpp");
    }

    #[tokio::test]
    async fn boundary_builds_are_flagged() {
        let catalog = StaticErrorCatalog::new(vec![tracked("assertion in display.cpp", 3, 7)]);
        assert!(catalog.is_boundary(3).await.unwrap());
        assert!(catalog.is_boundary(7).await.unwrap());
        assert!(!catalog.is_boundary(5).await.unwrap());
    }
}

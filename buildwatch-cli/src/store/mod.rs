// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{env, fmt};

use enum_dispatch::enum_dispatch;
use sqlite_diesel::DieselBuildDatabase;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::{
    model::{BuildRecord, NewBuild},
    report::{NewTestResult, TestResult},
};

mod sqlite_diesel;

/// Transactional record store for builds and their test results.
///
/// Absence is always an explicit `Option`, never a sentinel id; callers fall back to the
/// baseline where that is the right behavior.
#[enum_dispatch]
#[allow(async_fn_in_trait)] // only used internally to this project
pub trait BuildDatabase {
    /// Append one build, and its test result when one was produced, inside a single
    /// transaction.  Returns the assigned id.  A test result with an empty `result` string is
    /// not persisted.
    async fn insert_build(
        &self,
        build: &NewBuild,
        test_result: Option<&NewTestResult>,
    ) -> Result<i64, BuildDatabaseDetailedError>;

    /// Establish the id-0 good baseline record; a no-op when it already exists.
    async fn insert_baseline(&self) -> Result<(), BuildDatabaseDetailedError>;

    async fn fetch_build(&self, id: i64)
    -> Result<Option<BuildRecord>, BuildDatabaseDetailedError>;

    async fn fetch_latest(&self) -> Result<Option<BuildRecord>, BuildDatabaseDetailedError>;

    /// Page of builds ordered by descending id (most recent first).  An offset beyond the data
    /// yields an empty vec.
    async fn fetch_page(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<BuildRecord>, BuildDatabaseDetailedError>;

    async fn build_count(&self) -> Result<i64, BuildDatabaseDetailedError>;

    /// MAX id with a good verdict strictly below `before_id`.
    async fn previous_good_id(
        &self,
        before_id: i64,
    ) -> Result<Option<i64>, BuildDatabaseDetailedError>;

    async fn fetch_test_result(
        &self,
        build_id: i64,
    ) -> Result<Option<TestResult>, BuildDatabaseDetailedError>;

    /// Test results for a set of builds in one query; builds without a result are simply absent
    /// from the returned vec.
    async fn fetch_test_results(
        &self,
        build_ids: &[i64],
    ) -> Result<Vec<TestResult>, BuildDatabaseDetailedError>;

    /// Ids of builds older than `cutoff` whose immediate predecessor has the same verdict and
    /// diagnostics.  Never includes the newest build.  Test-result equality and error-catalog
    /// boundaries are checked by the pruner, and the whole predicate again at delete time.
    async fn prune_candidates(
        &self,
        cutoff: PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<i64>, BuildDatabaseDetailedError>;

    /// Delete `id` (record plus any test result) if the redundancy predicate still holds inside
    /// the deleting transaction; returns whether a delete happened.
    async fn delete_if_redundant(
        &self,
        id: i64,
        cutoff: PrimitiveDateTime,
    ) -> Result<bool, BuildDatabaseDetailedError>;
}

#[derive(Error, Debug)]
pub enum CreateDatabaseError {
    #[error("unsupported database url: `{0}`")]
    UnsupportedDatabaseUrl(String),
    #[error("error managing default SQLite DB: `{0}`")]
    SqliteDefaultDatabaseError(#[from] sqlite_diesel::DefaultDatabaseError),
}

#[derive(Error, Debug)]
pub enum BuildDatabaseError {
    #[error("database error: `{0}`")]
    DatabaseError(String),
    #[error("data parsing error: `{0}`")]
    ParsingError(String),
}

#[derive(Error, Debug)]
pub struct BuildDatabaseDetailedError {
    pub error: BuildDatabaseError,
    pub context: Option<String>,
}

impl fmt::Display for BuildDatabaseDetailedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{} ({})", self.error, context),
            None => write!(f, "{}", self.error),
        }
    }
}

impl BuildDatabaseDetailedError {
    fn context(self, context: &str) -> BuildDatabaseDetailedError {
        BuildDatabaseDetailedError {
            error: self.error,
            context: Some(String::from(context)),
        }
    }
}

impl From<BuildDatabaseError> for BuildDatabaseDetailedError {
    fn from(value: BuildDatabaseError) -> Self {
        BuildDatabaseDetailedError {
            error: value,
            context: None,
        }
    }
}

trait ResultWithContext<T> {
    fn context(self, context: &str) -> Result<T, BuildDatabaseDetailedError>;
}

impl<T> ResultWithContext<T> for Result<T, BuildDatabaseDetailedError> {
    fn context(self, context: &str) -> Result<T, BuildDatabaseDetailedError> {
        self.map_err(|e| e.context(context))
    }
}

impl<Res, Err> ResultWithContext<Res> for Result<Res, Err>
where
    Err: Into<BuildDatabaseError>,
{
    fn context(self, context: &str) -> Result<Res, BuildDatabaseDetailedError> {
        self.map_err(|e| BuildDatabaseDetailedError {
            error: e.into(),
            context: Some(String::from(context)),
        })
    }
}

#[enum_dispatch(BuildDatabase)]
pub enum BuildDatabaseDispatch {
    Sqlite(DieselBuildDatabase),
}

pub fn create_db() -> Result<BuildDatabaseDispatch, CreateDatabaseError> {
    match env::var("BUILDWATCH_DATABASE_URL") {
        Ok(db_url) if db_url.starts_with("file://") => {
            Ok(DieselBuildDatabase::new_sqlite(db_url).into())
        }
        Ok(db_url) if db_url.starts_with(":memory:") => {
            Ok(DieselBuildDatabase::new_sqlite(db_url).into())
        }
        Ok(db_url) => Err(CreateDatabaseError::UnsupportedDatabaseUrl(db_url)),
        Err(_) => Ok(DieselBuildDatabase::new_sqlite_from_default_url()?.into()),
    }
}

#[must_use]
pub fn create_test_db() -> BuildDatabaseDispatch {
    DieselBuildDatabase::new_sqlite(String::from(":memory:")).into()
}

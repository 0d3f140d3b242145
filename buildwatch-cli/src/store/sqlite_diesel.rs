// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    env::{self, VarError},
    fs, io,
    path::Path,
};

use diesel::{
    connection::{Instrumentation, SimpleConnection as _},
    dsl::max,
    prelude::*,
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::trace;
use thiserror::Error;
use time::PrimitiveDateTime;
use tokio::sync::{Mutex, MutexGuard, OnceCell};

use crate::{
    model::{BuildRecord, NewBuild, UnknownVerdict, Verdict},
    report::{NewTestResult, TestResult},
};

use super::{BuildDatabase, BuildDatabaseDetailedError, BuildDatabaseError, ResultWithContext};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../db/sqlite/migrations");

struct DbLogger;

impl Instrumentation for DbLogger {
    fn on_connection_event(&mut self, event: diesel::connection::InstrumentationEvent<'_>) {
        trace!("DB event: {:?}", event);
    }
}

#[derive(Error, Debug)]
pub enum DefaultDatabaseError {
    #[error("unset environment variable: `{0}`")]
    EnvironmentVariableError(#[from] VarError),
    #[error("i/o error: `{0}`")]
    IoError(#[from] io::Error),
}

impl From<diesel::result::Error> for BuildDatabaseError {
    fn from(value: diesel::result::Error) -> Self {
        BuildDatabaseError::DatabaseError(value.to_string())
    }
}

impl From<diesel::result::Error> for BuildDatabaseDetailedError {
    fn from(value: diesel::result::Error) -> Self {
        BuildDatabaseDetailedError {
            error: BuildDatabaseError::DatabaseError(value.to_string()),
            context: None,
        }
    }
}

impl From<diesel::ConnectionError> for BuildDatabaseError {
    fn from(value: diesel::ConnectionError) -> Self {
        BuildDatabaseError::DatabaseError(value.to_string())
    }
}

impl From<UnknownVerdict> for BuildDatabaseError {
    fn from(value: UnknownVerdict) -> Self {
        BuildDatabaseError::ParsingError(value.to_string())
    }
}

impl From<UnknownVerdict> for BuildDatabaseDetailedError {
    fn from(value: UnknownVerdict) -> Self {
        BuildDatabaseDetailedError {
            error: BuildDatabaseError::ParsingError(value.to_string()),
            context: None,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = crate::schema::builds)]
struct BuildRow {
    id: i64,
    revision: i64,
    build_time: PrimitiveDateTime,
    verdict: String,
    diagnostics: String,
    binary_name: Option<String>,
}

impl BuildRow {
    fn into_record(self) -> Result<BuildRecord, BuildDatabaseDetailedError> {
        let verdict: Verdict = self.verdict.parse()?;
        Ok(BuildRecord::from_row(
            self.id,
            self.revision,
            self.build_time,
            verdict,
            self.diagnostics,
            self.binary_name,
        ))
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = crate::schema::test_results)]
struct TestResultRow {
    build_id: i64,
    name: String,
    result: String,
    assertions_passed: i64,
    assertions_failed: i64,
    cases_passed: i64,
    cases_failed: i64,
    cases_skipped: i64,
    cases_aborted: i64,
}

impl TestResultRow {
    fn into_result(self) -> TestResult {
        TestResult {
            build_id: self.build_id,
            name: self.name,
            result: self.result,
            assertions_passed: self.assertions_passed,
            assertions_failed: self.assertions_failed,
            cases_passed: self.cases_passed,
            cases_failed: self.cases_failed,
            cases_skipped: self.cases_skipped,
            cases_aborted: self.cases_aborted,
        }
    }
}

pub struct DieselBuildDatabase {
    database_url: String,
    connection: OnceCell<Mutex<SqliteConnection>>,
}

impl DieselBuildDatabase {
    pub fn new_sqlite_from_default_url() -> Result<DieselBuildDatabase, DefaultDatabaseError> {
        let target = match (env::var("XDG_CACHE_HOME"), env::var("LOCALAPPDATA")) {
            (Ok(xdg), _) => Path::new(&xdg).join("buildwatch").join("buildwatch.db"),
            (Err(_), Ok(localappdata)) => Path::new(&localappdata)
                .join("buildwatch")
                .join("buildwatch.db"),
            (Err(_), Err(_)) => Path::new(&env::var("HOME")?)
                .join(".cache")
                .join("buildwatch")
                .join("buildwatch.db"),
        };

        fs::create_dir_all(target.parent().unwrap()).or_else(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                Ok(())
            } else {
                Err(e)
            }
        })?;

        Ok(DieselBuildDatabase::new_sqlite(String::from(
            target.to_string_lossy(),
        )))
    }

    #[must_use]
    pub fn new_sqlite(database_url: String) -> DieselBuildDatabase {
        DieselBuildDatabase {
            database_url,
            connection: OnceCell::new(),
        }
    }

    async fn get_connection(
        &self,
    ) -> Result<MutexGuard<'_, SqliteConnection>, BuildDatabaseDetailedError> {
        Ok(self
            .connection
            .get_or_try_init(async || {
                let mut connection = SqliteConnection::establish(&self.database_url)
                    .context("connecting to the database")?;
                connection.set_instrumentation(DbLogger {});

                connection.batch_execute(
                    "
                PRAGMA journal_mode = WAL;
                PRAGMA busy_timeout = 5000;
                ",
                )?;

                connection.run_pending_migrations(MIGRATIONS).map_err(|e| {
                    BuildDatabaseError::DatabaseError(format!(
                        "failed to run pending migrations: {e}"
                    ))
                })?;

                Ok::<_, BuildDatabaseDetailedError>(Mutex::new(connection))
            })
            .await?
            .lock()
            .await)
    }

    fn fetch_row(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Option<BuildRow>, diesel::result::Error> {
        use crate::schema::builds;

        builds::dsl::builds
            .filter(builds::dsl::id.eq(id))
            .select(BuildRow::as_select())
            .first(conn)
            .optional()
    }

    fn fetch_result_row(
        conn: &mut SqliteConnection,
        build_id: i64,
    ) -> Result<Option<TestResultRow>, diesel::result::Error> {
        use crate::schema::test_results;

        test_results::dsl::test_results
            .filter(test_results::dsl::build_id.eq(build_id))
            .select(TestResultRow::as_select())
            .first(conn)
            .optional()
    }

    fn newest_id(conn: &mut SqliteConnection) -> Result<Option<i64>, diesel::result::Error> {
        use crate::schema::builds;

        builds::dsl::builds
            .select(max(builds::dsl::id))
            .get_result::<Option<i64>>(conn)
    }
}

impl BuildDatabase for DieselBuildDatabase {
    async fn insert_build(
        &self,
        build: &NewBuild,
        test_result: Option<&NewTestResult>,
    ) -> Result<i64, BuildDatabaseDetailedError> {
        use crate::schema::{builds, test_results};

        let mut conn_guard = self.get_connection().await?;
        let conn = &mut *conn_guard;

        // One transaction for the pair: a reader either sees the build with its test result
        // insertable state settled, or sees neither.
        conn.immediate_transaction(|conn| {
            let id: i64 = diesel::insert_into(builds::dsl::builds)
                .values((
                    builds::dsl::revision.eq(build.revision),
                    builds::dsl::build_time.eq(build.build_time),
                    builds::dsl::verdict.eq(build.verdict.as_str()),
                    builds::dsl::diagnostics.eq(&build.diagnostics),
                    builds::dsl::binary_name.eq(&build.binary_name),
                ))
                .returning(builds::dsl::id)
                .get_result(conn)
                .context("insert into builds")?;

            if let Some(tr) = test_result {
                // Runner reports without a result leave no row at all.
                if tr.has_result() {
                    diesel::insert_into(test_results::dsl::test_results)
                        .values((
                            test_results::dsl::build_id.eq(id),
                            test_results::dsl::name.eq(&tr.name),
                            test_results::dsl::result.eq(&tr.result),
                            test_results::dsl::assertions_passed.eq(tr.assertions_passed),
                            test_results::dsl::assertions_failed.eq(tr.assertions_failed),
                            test_results::dsl::cases_passed.eq(tr.cases_passed),
                            test_results::dsl::cases_failed.eq(tr.cases_failed),
                            test_results::dsl::cases_skipped.eq(tr.cases_skipped),
                            test_results::dsl::cases_aborted.eq(tr.cases_aborted),
                        ))
                        .execute(conn)
                        .context("insert into test_results")?;
                }
            }

            Ok::<_, BuildDatabaseDetailedError>(id)
        })
    }

    async fn insert_baseline(&self) -> Result<(), BuildDatabaseDetailedError> {
        use crate::schema::builds;

        let mut conn_guard = self.get_connection().await?;
        let conn = &mut *conn_guard;

        diesel::insert_into(builds::dsl::builds)
            .values((
                builds::dsl::id.eq(crate::model::BASELINE_ID),
                builds::dsl::revision.eq(0),
                builds::dsl::build_time.eq(PrimitiveDateTime::MIN),
                builds::dsl::verdict.eq(Verdict::Good.as_str()),
                builds::dsl::diagnostics.eq(""),
            ))
            .on_conflict(builds::dsl::id)
            .do_nothing()
            .execute(conn)
            .context("insert baseline into builds")?;

        Ok(())
    }

    async fn fetch_build(
        &self,
        id: i64,
    ) -> Result<Option<BuildRecord>, BuildDatabaseDetailedError> {
        let mut conn_guard = self.get_connection().await?;
        let conn = &mut *conn_guard;

        let row = Self::fetch_row(conn, id).context("loading build by id")?;
        row.map(BuildRow::into_record).transpose()
    }

    async fn fetch_latest(&self) -> Result<Option<BuildRecord>, BuildDatabaseDetailedError> {
        use crate::schema::builds;

        let mut conn_guard = self.get_connection().await?;
        let conn = &mut *conn_guard;

        let row = builds::dsl::builds
            .order(builds::dsl::id.desc())
            .select(BuildRow::as_select())
            .first(conn)
            .optional()
            .context("loading latest build")?;
        row.map(BuildRow::into_record).transpose()
    }

    async fn fetch_page(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<BuildRecord>, BuildDatabaseDetailedError> {
        use crate::schema::builds;

        let mut conn_guard = self.get_connection().await?;
        let conn = &mut *conn_guard;

        let rows = builds::dsl::builds
            .order(builds::dsl::id.desc())
            .offset(offset)
            .limit(limit)
            .select(BuildRow::as_select())
            .get_results(conn)
            .context("loading build page")?;
        rows.into_iter().map(BuildRow::into_record).collect()
    }

    async fn build_count(&self) -> Result<i64, BuildDatabaseDetailedError> {
        use crate::schema::builds;

        let mut conn_guard = self.get_connection().await?;
        let conn = &mut *conn_guard;

        builds::dsl::builds
            .count()
            .get_result::<i64>(conn)
            .context("counting builds")
    }

    async fn previous_good_id(
        &self,
        before_id: i64,
    ) -> Result<Option<i64>, BuildDatabaseDetailedError> {
        use crate::schema::builds;

        let mut conn_guard = self.get_connection().await?;
        let conn = &mut *conn_guard;

        builds::dsl::builds
            .filter(builds::dsl::id.lt(before_id))
            .filter(builds::dsl::verdict.eq(Verdict::Good.as_str()))
            .select(max(builds::dsl::id))
            .get_result::<Option<i64>>(conn)
            .context("loading previous good build id")
    }

    async fn fetch_test_result(
        &self,
        build_id: i64,
    ) -> Result<Option<TestResult>, BuildDatabaseDetailedError> {
        let mut conn_guard = self.get_connection().await?;
        let conn = &mut *conn_guard;

        let row = Self::fetch_result_row(conn, build_id).context("loading test result")?;
        Ok(row.map(TestResultRow::into_result))
    }

    async fn fetch_test_results(
        &self,
        build_ids: &[i64],
    ) -> Result<Vec<TestResult>, BuildDatabaseDetailedError> {
        use crate::schema::test_results;

        let mut conn_guard = self.get_connection().await?;
        let conn = &mut *conn_guard;

        let rows = test_results::dsl::test_results
            .filter(test_results::dsl::build_id.eq_any(build_ids))
            .select(TestResultRow::as_select())
            .get_results(conn)
            .context("loading test results for builds")?;
        Ok(rows.into_iter().map(TestResultRow::into_result).collect())
    }

    async fn prune_candidates(
        &self,
        cutoff: PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<i64>, BuildDatabaseDetailedError> {
        use crate::schema::builds;

        let mut conn_guard = self.get_connection().await?;
        let conn = &mut *conn_guard;

        let Some(newest) = Self::newest_id(conn).context("loading newest build id")? else {
            return Ok(vec![]);
        };

        let predecessors = diesel::alias!(crate::schema::builds as predecessors);

        builds::dsl::builds
            .inner_join(
                predecessors
                    .on(predecessors.field(builds::dsl::id).eq(builds::dsl::id - 1)),
            )
            .filter(builds::dsl::build_time.lt(cutoff))
            .filter(builds::dsl::id.lt(newest))
            .filter(builds::dsl::verdict.eq(predecessors.field(builds::dsl::verdict)))
            .filter(builds::dsl::diagnostics.eq(predecessors.field(builds::dsl::diagnostics)))
            .select(builds::dsl::id)
            .order(builds::dsl::id.asc())
            .limit(limit)
            .get_results::<i64>(conn)
            .context("selecting prune candidates")
    }

    async fn delete_if_redundant(
        &self,
        id: i64,
        cutoff: PrimitiveDateTime,
    ) -> Result<bool, BuildDatabaseDetailedError> {
        use crate::schema::{builds, test_results};

        let mut conn_guard = self.get_connection().await?;
        let conn = &mut *conn_guard;

        // Candidate selection may be stale; the whole predicate is re-checked against current
        // state inside the deleting transaction.  A candidate that no longer qualifies is left
        // alone.
        conn.immediate_transaction(|conn| {
            let Some(newest) = Self::newest_id(conn)? else {
                return Ok(false);
            };
            if id >= newest {
                return Ok(false);
            }

            let Some(b1) = Self::fetch_row(conn, id)? else {
                return Ok(false);
            };
            if b1.build_time >= cutoff {
                return Ok(false);
            }
            let Some(b2) = Self::fetch_row(conn, id - 1)? else {
                return Ok(false);
            };
            if b1.verdict != b2.verdict || b1.diagnostics != b2.diagnostics {
                return Ok(false);
            }

            let r1 = Self::fetch_result_row(conn, id)?;
            let r2 = Self::fetch_result_row(conn, id - 1)?;
            let results_match = match (r1, r2) {
                (None, None) => true,
                (Some(r1), Some(r2)) => {
                    r1.result == r2.result
                        && r1.assertions_passed == r2.assertions_passed
                        && r1.assertions_failed == r2.assertions_failed
                }
                _ => false,
            };
            if !results_match {
                return Ok(false);
            }

            diesel::delete(
                test_results::dsl::test_results.filter(test_results::dsl::build_id.eq(id)),
            )
            .execute(conn)?;
            diesel::delete(builds::dsl::builds.filter(builds::dsl::id.eq(id))).execute(conn)?;

            Ok::<_, BuildDatabaseDetailedError>(true)
        })
        .context("deleting redundant build")
    }
}

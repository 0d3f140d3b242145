// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::process::ExitCode;

use anyhow::Result;
use log::error;

use crate::{
    model::BuildSummary,
    stats::{ErrorStatistics, NullErrorCatalog, error_statistics},
    store::{BuildDatabase, create_db},
};

#[allow(clippy::print_stdout)]
pub async fn cli(id: i64) -> ExitCode {
    match run(id).await {
        Ok(Some((summary, last_working, errors))) => {
            print_build(&summary, last_working, &errors);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            // Absence is a presentable state, not a failure.
            println!("no build with id {id}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("show failed: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(id: i64) -> Result<Option<(BuildSummary, i64, Vec<ErrorStatistics>)>> {
    let db = create_db()?;
    let Some(build) = db.fetch_build(id).await? else {
        return Ok(None);
    };
    let last_working = build.last_working_id(&db).await?;
    let errors = error_statistics(&build, &db, &NullErrorCatalog).await?;
    let test = db.fetch_test_result(build.id).await?;
    Ok(Some((BuildSummary::new(&build, test), last_working, errors)))
}

#[allow(clippy::print_stdout)]
fn print_build(summary: &BuildSummary, last_working: i64, errors: &[ErrorStatistics]) {
    println!("build {} (revision {})", summary.id, summary.revision);
    println!("time: {}", summary.build_time);
    println!("status: {}", summary.style);
    println!("{}", summary.result_line);
    match &summary.test {
        Some(tr) => println!(
            "tests: {} -- assertions {} passed / {} failed; cases {} passed / {} failed / {} skipped / {} aborted",
            tr.result,
            tr.assertions_passed,
            tr.assertions_failed,
            tr.cases_passed,
            tr.cases_failed,
            tr.cases_skipped,
            tr.cases_aborted
        ),
        None => println!("tests: no result"),
    }
    println!("last working build: {last_working}");
    for e in errors {
        println!(
            "error `{}`: {} occurrence(s), builds {}..{}",
            e.name, e.occurrences, e.first_build_id, e.last_build_id
        );
    }
}

// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{
    fs,
    io::Read as _,
    path::PathBuf,
    process::ExitCode,
};

use anyhow::Result;
use log::{error, info};
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::{
    classify::{Classification, classify},
    errors::IngestError,
    model::NewBuild,
    report::{NewTestResult, parse_report},
    store::{BuildDatabase, create_db},
};

// Design note: the `cli` function of each command performs the interactive output, while
// delegating as much actual functionality as possible to library methods that don't do
// interactive output but instead return data structures.
#[allow(clippy::print_stdout)]
pub async fn cli(
    revision: i64,
    transcript: Option<&PathBuf>,
    report: Option<&PathBuf>,
) -> ExitCode {
    match run(revision, transcript, report).await {
        Ok(Some(id)) => {
            println!("recorded build {id}");
            ExitCode::SUCCESS
        }
        Ok(None) => {
            // Not an error; the build system had nothing to do and nothing is persisted.
            info!("target already up to date; no build recorded");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("ingest failed: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    revision: i64,
    transcript: Option<&PathBuf>,
    report: Option<&PathBuf>,
) -> Result<Option<i64>> {
    let transcript_text = match transcript {
        Some(path) => fs::read_to_string(path).map_err(|source| IngestError::TranscriptRead {
            path: path.clone(),
            source,
        })?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let classified = match classify(&transcript_text) {
        Classification::UpToDate => return Ok(None),
        Classification::Outcome(classified) => classified,
    };

    let test_result = match report {
        Some(path) => {
            let xml = fs::read_to_string(path).map_err(|source| IngestError::ReportRead {
                path: path.clone(),
                source,
            })?;
            Some(NewTestResult::from_report(&parse_report(&xml)?))
        }
        None => None,
    };

    let now = OffsetDateTime::now_utc();
    let now = PrimitiveDateTime::new(now.date(), now.time());
    let build = NewBuild::from_classification(revision, now, classified);

    let db = create_db()?;
    db.insert_baseline().await?;
    let id = db.insert_build(&build, test_result.as_ref()).await?;
    info!(
        "build {id} recorded with verdict {} for revision {revision}",
        build.verdict
    );
    Ok(Some(id))
}

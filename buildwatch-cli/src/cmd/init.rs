// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::process::ExitCode;

use log::error;

use crate::store::{BuildDatabase, create_db};

#[allow(clippy::print_stdout)]
pub async fn cli() -> ExitCode {
    let db = match create_db() {
        Ok(db) => db,
        Err(e) => {
            error!("unable to open build DB: {e:?}");
            return ExitCode::FAILURE;
        }
    };
    match db.insert_baseline().await {
        Ok(()) => {
            println!("baseline record established");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("unable to establish baseline: {e:?}");
            ExitCode::FAILURE
        }
    }
}

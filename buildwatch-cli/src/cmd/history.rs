// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::process::ExitCode;

use anyhow::Result;
use log::error;

use super::cli::CommonOptions;
use crate::{
    model::{HistoryPage, fetch_history_page},
    repo_config::get_repo_config,
    store::create_db,
};

#[allow(clippy::print_stdout)]
pub async fn cli(common_opts: &CommonOptions, page: u32) -> ExitCode {
    match run(common_opts, page).await {
        Ok(history) => {
            print_page(&history);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("history failed: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(common_opts: &CommonOptions, page: u32) -> Result<HistoryPage> {
    let config = get_repo_config(common_opts.override_config.as_ref())?;
    let db = create_db()?;
    Ok(fetch_history_page(&db, page, config.builds_per_page()).await?)
}

#[allow(clippy::print_stdout)]
fn print_page(history: &HistoryPage) {
    if history.summaries.is_empty() {
        println!("no builds recorded");
        return;
    }
    for summary in &history.summaries {
        let tests = match &summary.test {
            Some(tr) => format!(
                "{} ({} passed / {} failed)",
                tr.result, tr.assertions_passed, tr.assertions_failed
            ),
            None => String::from("no test result"),
        };
        println!(
            "build {:>6}  r{:<8}  {}  {:<6}  {}",
            summary.id, summary.revision, summary.build_time, summary.style, tests
        );
    }
    println!("page {} of {}", history.page, history.total_pages);
}

// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::process::ExitCode;

use anyhow::Result;
use log::error;

use super::cli::CommonOptions;
use crate::{
    prune::{PruneOutcome, RetentionPruner},
    repo_config::get_repo_config,
    stats::NullErrorCatalog,
    store::create_db,
};

#[allow(clippy::print_stdout)]
pub async fn cli(common_opts: &CommonOptions) -> ExitCode {
    match run(common_opts).await {
        Ok(outcome) => {
            println!(
                "pruned {} build(s), skipped {} candidate(s)",
                outcome.deleted, outcome.skipped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("prune sweep failed: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(common_opts: &CommonOptions) -> Result<PruneOutcome> {
    let config = get_repo_config(common_opts.override_config.as_ref())?;
    let db = create_db()?;
    let pruner = RetentionPruner::new(config.retention(), config.prune_batch_size());
    pruner.prune(&db, &NullErrorCatalog).await
}

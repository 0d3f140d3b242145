// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use log::set_max_level;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use super::{history, ingest, init, prune, show};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
pub struct CommonOptions {
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    /// Override the in-repo .config/buildwatch.toml with a static config file
    #[arg(short, long, global = true)]
    pub override_config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Establish the id-0 baseline record; safe to run repeatedly
    Init,

    /// Classify a compiler transcript and record the build outcome
    Ingest {
        /// Source-control revision that was built
        #[arg(short, long)]
        revision: i64,

        /// Transcript file; read from stdin when omitted
        transcript: Option<PathBuf>,

        /// Structured test-run report (XML) to attach to the build
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print a page of build history, most recent build first
    History {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Print one build with its lineage and error statistics
    Show { id: i64 },

    /// Run one retention sweep over the build history
    Prune,
}

pub async fn run_cli() -> ExitCode {
    let cli = Cli::parse();
    let _ = TermLogger::init(
        cli.common.verbose.log_level_filter(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
    set_max_level(cli.common.verbose.log_level_filter());

    match &cli.command {
        Commands::Init => init::cli().await,
        Commands::Ingest {
            revision,
            transcript,
            report,
        } => ingest::cli(*revision, transcript.as_ref(), report.as_ref()).await,
        Commands::History { page } => history::cli(&cli.common, *page).await,
        Commands::Show { id } => show::cli(*id).await,
        Commands::Prune => prune::cli(&cli.common).await,
    }
}

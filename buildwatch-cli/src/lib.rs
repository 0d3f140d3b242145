// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![warn(clippy::print_stderr)]
#![warn(clippy::print_stdout)]

pub mod classify;
pub mod cmd;
pub mod errors;
pub mod model;
pub mod prune;
pub mod report;
mod repo_config;
mod schema;
pub mod stats;
pub mod store;

// allow-print-in-tests

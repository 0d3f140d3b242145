// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod cli;
pub mod history;
pub mod ingest;
pub mod init;
pub mod prune;
pub mod show;

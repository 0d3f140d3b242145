// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("test report could not be parsed: {0}")]
    Malformed(#[from] quick_xml::DeError),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("transcript `{path}` could not be read: {source}")]
    TranscriptRead { path: PathBuf, source: io::Error },

    #[error("test report `{path}` could not be read: {source}")]
    ReportRead { path: PathBuf, source: io::Error },
}

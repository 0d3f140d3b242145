// SPDX-FileCopyrightText: 2026 buildwatch contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;

use anyhow::{Result, anyhow};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct RepoConfig {
    builds_per_page: u32,
    retention_days: i64,
    prune_batch_size: i64,
}

impl Default for RepoConfig {
    fn default() -> Self {
        RepoConfig {
            builds_per_page: 18,
            retention_days: 2,
            prune_batch_size: 64,
        }
    }
}

impl RepoConfig {
    pub fn builds_per_page(&self) -> u32 {
        self.builds_per_page
    }

    pub fn retention(&self) -> time::Duration {
        time::Duration::days(self.retention_days)
    }

    pub fn prune_batch_size(&self) -> i64 {
        self.prune_batch_size
    }
}

pub fn get_repo_config(override_config: Option<&String>) -> Result<RepoConfig> {
    let path = match override_config {
        Some(path) => path,
        None => ".config/buildwatch.toml",
    };
    if fs::exists(path)? {
        Ok(toml::from_str(&fs::read_to_string(path)?)?)
    } else {
        if let Some(override_config) = override_config {
            return Err(anyhow!(
                "override config path {override_config} could not be opened"
            ));
        }
        Ok(RepoConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn defaults() {
        let config = RepoConfig::default();
        assert_eq!(config.builds_per_page(), 18);
        assert_eq!(config.retention(), time::Duration::days(2));
        assert_eq!(config.prune_batch_size(), 64);
    }

    #[test]
    fn override_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "builds-per-page = 25\nretention-days = 7").unwrap();

        let path = file.path().to_string_lossy().to_string();
        let config = get_repo_config(Some(&path)).unwrap();
        assert_eq!(config.builds_per_page(), 25);
        assert_eq!(config.retention(), time::Duration::days(7));
        // Unset keys keep their defaults.
        assert_eq!(config.prune_batch_size(), 64);
    }

    #[test]
    fn missing_override_is_an_error() {
        let path = String::from("/nonexistent/buildwatch.toml");
        assert!(get_repo_config(Some(&path)).is_err());
    }
}

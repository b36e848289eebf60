// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "taxi-rs.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("config file {} has no [{section}] section", path.display())]
    MissingSection { path: PathBuf, section: &'static str },
}

/// Candidate files, most specific first: CWD, XDG config dir, /etc.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("taxi-rs").join(CONFIG_FILE_NAME));
    }
    paths.push(Path::new("/etc/taxi-rs").join(CONFIG_FILE_NAME));
    paths
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Deserialize `[section]` of the TOML document at `path`, if present.
fn read_section<T: DeserializeOwned>(path: &Path, section: &str) -> Result<Option<T>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut doc: toml::Table = toml::from_str(&text).map_err(|e| parse_error(path, e))?;
    match doc.remove(section) {
        Some(value) => value.try_into::<T>().map(Some).map_err(|e| parse_error(path, e)),
        None => Ok(None),
    }
}

/// A configuration struct stored as one section of `taxi-rs.toml`.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// Section name, e.g. `"taxi"`.
    fn section_key() -> &'static str;

    /// Load from an explicit file; the section must be present.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        read_section(path, Self::section_key())?.ok_or_else(|| ConfigError::MissingSection {
            path: path.to_path_buf(),
            section: Self::section_key(),
        })
    }

    /// Load the first file on the search path that has the section.
    /// Falls back to defaults with no path when none does.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        Self::load_from_paths(&config_search_paths())
    }

    fn load_from_paths(paths: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in paths.iter().filter(|p| p.is_file()) {
            if let Some(cfg) = read_section(path, Self::section_key())? {
                return Ok((cfg, Some(path.clone())));
            }
        }
        Ok((Self::default(), None))
    }
}

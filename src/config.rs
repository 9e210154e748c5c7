// SPDX-FileCopyrightText: 2026 OpenDisplay Project
//
// SPDX-License-Identifier: BSD-3-Clause

//! Run configuration, built once at startup and read-only afterwards.

use std::env;
use std::path::PathBuf;

/// Settings shared by the components of a single run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory downloaded DFU packages are cached under.
    pub cache_dir: PathBuf,
}

impl Config {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.unwrap_or_else(default_cache_dir),
        }
    }
}

/// Platform cache directory for this tool.
///
/// Falls back to a path under the current directory if the environment gives
/// us nothing to work with, so the tool stays usable in stripped-down shells.
fn default_cache_dir() -> PathBuf {
    let base = if cfg!(windows) {
        env::var_os("LOCALAPPDATA").map(PathBuf::from)
    } else {
        env::var_os("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
    };
    base.unwrap_or_else(|| PathBuf::from(".cache"))
        .join("xiao-bl-tools")
}

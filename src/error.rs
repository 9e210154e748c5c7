// SPDX-FileCopyrightText: 2026 OpenDisplay Project
//
// SPDX-License-Identifier: BSD-3-Clause

//! Error taxonomy for the updater.
//!
//! Every failure is terminal for the run: the top level prints the error, a
//! one-line remedy, and exits with a code distinct per failure kind.

use std::io;
use std::result;

use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

/// Errors that can abort an update or version-check run.
#[derive(Error, Debug)]
pub enum Error {
    /// The external flashing tool is not installed or not runnable.
    #[error("flashing tool '{0}' not found")]
    MissingTool(String),
    /// No release asset matches the requested board variant.
    #[error("no release asset matches board '{0}'")]
    NoMatchingAsset(String),
    /// The release host could not be reached or answered with an error.
    #[error("network request failed: {0}")]
    Network(String),
    /// A user-supplied DFU package is missing, empty, or the wrong kind of file.
    #[error("invalid DFU package: {0}")]
    InvalidPackage(String),
    /// No serial port that looks like the board could be found.
    #[error("no serial port found for the board")]
    NoPortFound,
    /// The device metadata file had no recognizable version information.
    #[error("could not parse device metadata: {0}")]
    Parse(String),
    /// The flashing subprocess exited with a failure status.
    #[error("flashing failed: {0}")]
    FlashFailed(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serial(#[from] serialport::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl Error {
    /// Process exit code for this failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingTool(_) => 2,
            Self::NoMatchingAsset(_) => 3,
            Self::Network(_) => 4,
            Self::InvalidPackage(_) => 5,
            Self::NoPortFound => 6,
            Self::Parse(_) => 7,
            Self::FlashFailed(_) => 8,
            Self::Io(_) | Self::Serial(_) => 1,
        }
    }

    /// One-line suggested remedy, printed alongside the error at top level.
    pub fn remedy(&self) -> Option<&'static str> {
        match self {
            Self::MissingTool(_) => Some("install it with: pip install adafruit-nrfutil"),
            Self::NoMatchingAsset(_) => {
                Some("check the --board variant, or pass a local package with --pkg")
            }
            Self::Network(_) => {
                Some("check your connection; set GITHUB_TOKEN if you hit API rate limits")
            }
            Self::InvalidPackage(_) => Some("pass a .zip DFU package built for this board"),
            Self::NoPortFound => Some(
                "connect the board over USB and double-tap RESET to enter DFU mode, \
                 or pass --port explicitly",
            ),
            Self::FlashFailed(_) => Some(
                "double-tap RESET to enter DFU mode and retry; never unplug mid-flash",
            ),
            Self::Parse(_) | Self::Io(_) | Self::Serial(_) => None,
        }
    }
}

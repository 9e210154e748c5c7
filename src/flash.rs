// SPDX-FileCopyrightText: 2026 OpenDisplay Project
//
// SPDX-License-Identifier: BSD-3-Clause

//! Invocation of the external DFU flashing tool.
//!
//! The DFU wire protocol itself lives in `adafruit-nrfutil`; this module only
//! builds its command line, checks that it is installed, and runs it as a
//! child process with output streamed to the console. Flashing is never
//! retried automatically: a partial write can leave the device needing
//! manual recovery, so a failed run stops here.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use log::{debug, info};

use crate::error::{Error, Result};

/// Name of the external flashing executable, resolved via the search path.
pub const FLASH_TOOL: &str = "adafruit-nrfutil";
/// Fixed DFU serial parameters for the nRF52840 bootloader.
const BAUD_RATE: &str = "115200";
const TOUCH_BAUD: &str = "1200";

/// Verify the flashing tool is installed and runnable.
///
/// Runs `adafruit-nrfutil version` with captured output; returns the version
/// line. This runs before any network or device I/O so a missing tool fails
/// the run without a wasted download.
pub fn check_tool() -> Result<String> {
    let output = Command::new(FLASH_TOOL)
        .arg("version")
        .stdin(Stdio::null())
        .output()
        .map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::MissingTool(FLASH_TOOL.to_string()),
            _ => Error::Io(err),
        })?;
    if !output.status.success() {
        return Err(Error::MissingTool(FLASH_TOOL.to_string()));
    }
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    info!("{FLASH_TOOL}: {version}");
    Ok(version)
}

/// Build the argument vector for a serial DFU run.
///
/// Single-bank write keeps the update within one flash bank, and the 1200
/// baud touch resets the board into its bootloader before the transfer.
pub fn dfu_args(package: &Path, port: &str) -> Vec<String> {
    vec![
        "dfu".to_string(),
        "serial".to_string(),
        "--package".to_string(),
        package.display().to_string(),
        "--port".to_string(),
        port.to_string(),
        "--baudrate".to_string(),
        BAUD_RATE.to_string(),
        "--singlebank".to_string(),
        "--touch".to_string(),
        TOUCH_BAUD.to_string(),
    ]
}

/// Flash `package` through `port`, streaming the tool's output.
pub fn flash(package: &Path, port: &str) -> Result<()> {
    let args = dfu_args(package, port);
    println!("  Running: {FLASH_TOOL} {}", args.join(" "));
    println!();
    debug!("spawning flasher child process");

    let status = Command::new(FLASH_TOOL)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::MissingTool(FLASH_TOOL.to_string()),
            _ => Error::Io(err),
        })?;

    if !status.success() {
        return Err(Error::FlashFailed(match status.code() {
            Some(code) => format!("{FLASH_TOOL} exited with code {code}"),
            None => format!("{FLASH_TOOL} was terminated by a signal"),
        }));
    }
    Ok(())
}

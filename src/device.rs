// SPDX-FileCopyrightText: 2026 OpenDisplay Project
//
// SPDX-License-Identifier: BSD-3-Clause

//! Device-reported version metadata.
//!
//! When the board sits in UF2 bootloader mode it exposes a small mass-storage
//! volume carrying `INFO_UF2.TXT`. This module finds that volume and parses
//! the descriptor. Parsing is line-based and tolerant: unknown lines are
//! ignored so newer bootloaders with extra fields still read fine.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use semver::Version;

use crate::error::{Error, Result};
use crate::version;

/// Volume labels the bootloader is known to use.
const VOLUME_NAMES: [&str; 4] = ["XIAO-SENSE", "XIAO-BLE", "NRF52BOOT", "FTHR840BOOT"];
const INFO_FILE: &str = "INFO_UF2.TXT";
/// How deep below a mount root to look (`/media/<user>/<volume>` is depth 2).
const MAX_SCAN_DEPTH: usize = 2;

/// Version metadata read from `INFO_UF2.TXT`.
///
/// At least one of `bootloader` and `softdevice` is present; `parse_info`
/// fails otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceVersionInfo {
    /// Bootloader version from the `UF2 Bootloader <version> ...` banner.
    pub bootloader: Option<String>,
    /// `SoftDevice:` line, e.g. `S140 version 7.3.0`.
    pub softdevice: Option<String>,
    /// `Model:` line.
    pub model: Option<String>,
    /// `Board-ID:` line.
    pub board_id: Option<String>,
    /// `Date:` build date line.
    pub date: Option<String>,
}

impl DeviceVersionInfo {
    /// Bootloader version as a semantic version, when it parses as one.
    pub fn semver(&self) -> Option<Version> {
        self.bootloader.as_deref().and_then(version::parse)
    }
}

/// Parse the text of an `INFO_UF2.TXT` descriptor.
///
/// Unrecognized lines are skipped. Fails with [`Error::Parse`] only when no
/// version information at all could be extracted.
pub fn parse_info(text: &str) -> Result<DeviceVersionInfo> {
    let mut info = DeviceVersionInfo::default();
    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("UF2 Bootloader") {
            // Banner shape: `UF2 Bootloader 0.6.1 lib/nrfx (v2.0.0) ...`
            if let Some(token) = rest.split_whitespace().next() {
                info.bootloader = Some(token.to_string());
            }
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            debug!("ignoring descriptor line: {line}");
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "SoftDevice" => info.softdevice = Some(value.to_string()),
            "Model" => info.model = Some(value.to_string()),
            "Board-ID" => info.board_id = Some(value.to_string()),
            "Date" => info.date = Some(value.to_string()),
            other => debug!("ignoring descriptor key: {other}"),
        }
    }
    if info.bootloader.is_none() && info.softdevice.is_none() {
        return Err(Error::Parse(
            "no bootloader banner or SoftDevice line in descriptor".to_string(),
        ));
    }
    Ok(info)
}

fn is_uf2_volume(path: &Path) -> bool {
    if path.join(INFO_FILE).is_file() {
        return true;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| VOLUME_NAMES.contains(&name))
        .unwrap_or(false)
}

fn scan(dir: &Path, depth: usize) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if is_uf2_volume(&path) {
            return Some(path);
        }
        subdirs.push(path);
    }
    if depth > 1 {
        for sub in subdirs {
            if let Some(found) = scan(&sub, depth - 1) {
                return Some(found);
            }
        }
    }
    None
}

/// Scan a set of mount roots for a UF2 bootloader volume.
pub fn scan_roots(roots: &[PathBuf]) -> Option<PathBuf> {
    roots.iter().find_map(|root| scan(root, MAX_SCAN_DEPTH))
}

fn mount_roots() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        vec![PathBuf::from("/Volumes")]
    } else if cfg!(windows) {
        ('A'..='Z').map(|l| PathBuf::from(format!("{l}:\\"))).collect()
    } else {
        ["/media", "/run/media", "/mnt"]
            .iter()
            .map(PathBuf::from)
            .collect()
    }
}

/// Find the mounted UF2 volume, if the board currently exposes one.
pub fn find_volume() -> Option<PathBuf> {
    if cfg!(windows) {
        // Drive letters are roots themselves, not directories of mounts.
        mount_roots()
            .into_iter()
            .find(|drive| drive.join(INFO_FILE).is_file())
    } else {
        scan_roots(&mount_roots())
    }
}

/// Read version metadata from the device, or `None` when no UF2 volume is
/// mounted (the board is not in bootloader mode; not an error by itself).
pub fn read_device_version() -> Result<Option<DeviceVersionInfo>> {
    let Some(volume) = find_volume() else {
        return Ok(None);
    };
    info!("found UF2 volume at {}", volume.display());
    let text = match fs::read_to_string(volume.join(INFO_FILE)) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // Labeled like a bootloader volume but with no descriptor on it.
            return Err(Error::Parse(format!(
                "{} has no {INFO_FILE}",
                volume.display()
            )));
        }
        Err(err) => return Err(err.into()),
    };
    parse_info(&text).map(Some)
}

// SPDX-FileCopyrightText: 2026 OpenDisplay Project
//
// SPDX-License-Identifier: BSD-3-Clause

//! Version-string parsing and ordering.
//!
//! Release tags and device-reported versions come in slightly different
//! shapes (`0.9.2`, `v0.9.2`, `0.6.1-12-gdeadbee`), so parsing is kept here
//! as a pure function and everything else compares `semver::Version` values.

use semver::Version;

/// Parse a release tag or device version string into a semantic version.
///
/// Strips a leading `v`/`V` before parsing. Returns `None` for strings that
/// are not semantic versions; callers treat those as non-candidates rather
/// than errors.
pub fn parse(tag: &str) -> Option<Version> {
    let tag = tag.trim();
    let tag = tag.strip_prefix(['v', 'V']).unwrap_or(tag);
    Version::parse(tag).ok()
}

/// True when `device` is at least as new as `latest`.
pub fn up_to_date(device: &Version, latest: &Version) -> bool {
    device >= latest
}

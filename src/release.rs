// SPDX-FileCopyrightText: 2026 OpenDisplay Project
//
// SPDX-License-Identifier: BSD-3-Clause

//! Bootloader release resolution.
//!
//! Resolves the DFU package to flash: either a user-supplied local `.zip`, or
//! the newest matching asset from the Adafruit_nRF52_Bootloader GitHub
//! releases, downloaded into the tool cache. Downloads are skipped when a
//! cached copy of the same version and size is already present.

use std::env;
use std::fs;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use semver::Version;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::version;

const RELEASES_URL: &str =
    "https://api.github.com/repos/adafruit/Adafruit_nRF52_Bootloader/releases";
const LISTING_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// XIAO nRF52840 board variant, selecting which package family to fetch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Board {
    /// XIAO nRF52840 Sense
    Sense,
    /// XIAO nRF52840 (non-Sense)
    Standard,
}

impl Board {
    /// Name fragment identifying this board's assets in the release listing.
    pub fn asset_fragment(self) -> &'static str {
        match self {
            Self::Sense => "xiao_nrf52840_ble_sense_bootloader",
            Self::Standard => "xiao_nrf52840_ble_bootloader",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sense => "XIAO nRF52840 Sense",
            Self::Standard => "XIAO nRF52840",
        }
    }
}

/// One release in the GitHub listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// One downloadable file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// A concrete DFU package selected from the release listing.
#[derive(Debug, Clone)]
pub struct ReleaseAsset {
    pub version: Version,
    pub tag: String,
    pub name: String,
    pub url: String,
    pub size: u64,
}

/// Select the newest `.zip` DFU package for `board` from the listing.
///
/// Prereleases and drafts are skipped unless `include_prerelease` is set
/// (drafts are always skipped). Releases whose tags are not semantic
/// versions are not considered.
pub fn select_asset(
    releases: &[Release],
    board: Board,
    include_prerelease: bool,
) -> Result<ReleaseAsset> {
    let mut best: Option<ReleaseAsset> = None;
    for release in releases {
        if release.draft || (release.prerelease && !include_prerelease) {
            continue;
        }
        let Some(version) = version::parse(&release.tag_name) else {
            debug!("skipping release with non-semver tag '{}'", release.tag_name);
            continue;
        };
        for asset in &release.assets {
            if !asset.name.contains(board.asset_fragment()) || !asset.name.ends_with(".zip") {
                continue;
            }
            if best.as_ref().map_or(true, |b| version > b.version) {
                best = Some(ReleaseAsset {
                    version: version.clone(),
                    tag: release.tag_name.clone(),
                    name: asset.name.clone(),
                    url: asset.browser_download_url.clone(),
                    size: asset.size,
                });
            }
        }
    }
    best.ok_or_else(|| Error::NoMatchingAsset(board.asset_fragment().to_string()))
}

/// Validate a user-supplied local package path.
///
/// No network access happens on this path; the file just has to exist, be
/// non-empty, and look like a DFU `.zip`.
pub fn validate_local(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(Error::InvalidPackage(format!(
            "file not found: {}",
            path.display()
        )));
    }
    if path.extension().and_then(|e| e.to_str()) != Some("zip") {
        return Err(Error::InvalidPackage(format!(
            "expected a .zip DFU package, got: {}",
            path.display()
        )));
    }
    if fs::metadata(path)?.len() == 0 {
        return Err(Error::InvalidPackage(format!(
            "package is empty: {}",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// Fetches the release listing and downloads DFU packages into the cache.
pub struct Resolver {
    client: reqwest::blocking::Client,
    cache_dir: PathBuf,
}

impl Resolver {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("xiao-bl-tools/", env!("CARGO_PKG_VERSION")))
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            cache_dir: config.cache_dir.clone(),
        })
    }

    /// Resolve the package to flash, per the precedence rules above.
    pub fn resolve(
        &self,
        board: Board,
        explicit: Option<&Path>,
        include_prerelease: bool,
    ) -> Result<PathBuf> {
        if let Some(path) = explicit {
            let path = validate_local(path)?;
            println!("  Using local package: {}", path.display());
            return Ok(path);
        }
        let asset = self.latest(board, include_prerelease)?;
        println!("  Latest bootloader version: {}", asset.tag);
        self.fetch_package(&asset)
    }

    /// Listing-only step: the newest matching asset, nothing downloaded.
    pub fn latest(&self, board: Board, include_prerelease: bool) -> Result<ReleaseAsset> {
        info!("fetching release listing from {RELEASES_URL}");
        let releases: Vec<Release> = self
            .get_with_retry(RELEASES_URL, LISTING_TIMEOUT)?
            .json()
            .map_err(|err| Error::Network(format!("bad release listing: {err}")))?;
        select_asset(&releases, board, include_prerelease)
    }

    /// Cache location for an asset: `<cache>/<tag>/<asset name>`.
    pub fn cache_path(&self, asset: &ReleaseAsset) -> PathBuf {
        self.cache_dir.join(&asset.tag).join(&asset.name)
    }

    /// True when the cached copy exists and its size matches the listing.
    pub fn is_cached(&self, asset: &ReleaseAsset) -> bool {
        let path = self.cache_path(asset);
        match fs::metadata(&path) {
            Ok(meta) => meta.is_file() && meta.len() == asset.size,
            Err(_) => false,
        }
    }

    /// Download `asset` into the cache, or reuse the cached copy.
    pub fn fetch_package(&self, asset: &ReleaseAsset) -> Result<PathBuf> {
        let dest = self.cache_path(asset);
        if self.is_cached(asset) {
            info!("cache hit for {}, skipping download", asset.name);
            println!("  Using cached package: {}", dest.display());
            return Ok(dest);
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        println!("  Downloading: {}", asset.name);
        let response = self.get_with_retry(&asset.url, DOWNLOAD_TIMEOUT)?;
        let total = response.content_length().unwrap_or(asset.size);

        let progress_bar = ProgressBar::new(total);
        progress_bar.set_style(
            ProgressStyle::with_template("{bar:^20.red/white.bold} {bytes}/{total_bytes}")
                .unwrap(),
        );
        let mut reader = progress_bar.wrap_read(response);
        let mut file = File::create(&dest)?;
        let written = io::copy(&mut reader, &mut file)?;
        progress_bar.finish_and_clear();

        if asset.size != 0 && written != asset.size {
            fs::remove_file(&dest).ok();
            return Err(Error::Network(format!(
                "truncated download: got {written} bytes, expected {}",
                asset.size
            )));
        }
        println!("  Downloaded: {:.1} KB", written as f64 / 1024.0);
        Ok(dest)
    }

    /// GET with one transient re-attempt on connect/timeout failures.
    ///
    /// HTTP error statuses are not retried; they are not transient.
    fn get_with_retry(&self, url: &str, timeout: Duration) -> Result<reqwest::blocking::Response> {
        let response = match self.request(url, timeout).send() {
            Ok(response) => response,
            Err(err) if err.is_timeout() || err.is_connect() => {
                info!("transient network failure ({err}), retrying once");
                self.request(url, timeout).send()?
            }
            Err(err) => return Err(err.into()),
        };
        Ok(response.error_for_status()?)
    }

    fn request(&self, url: &str, timeout: Duration) -> reqwest::blocking::RequestBuilder {
        let mut request = self
            .client
            .get(url)
            .timeout(timeout)
            .header("Accept", "application/vnd.github+json");
        if let Ok(token) = env::var("GITHUB_TOKEN") {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn listing(json: &str) -> Vec<Release> {
        serde_json::from_str(json).unwrap()
    }

    const SAMPLE: &str = r#"[
        {
            "tag_name": "0.9.2",
            "prerelease": false,
            "assets": [
                {
                    "name": "xiao_nrf52840_ble_sense_bootloader-0.9.2.zip",
                    "browser_download_url": "https://example.com/sense-0.9.2.zip",
                    "size": 40960
                },
                {
                    "name": "xiao_nrf52840_ble_sense_bootloader-0.9.2_nosd.uf2",
                    "browser_download_url": "https://example.com/sense-0.9.2.uf2",
                    "size": 20480
                },
                {
                    "name": "xiao_nrf52840_ble_bootloader-0.9.2.zip",
                    "browser_download_url": "https://example.com/std-0.9.2.zip",
                    "size": 40000
                }
            ]
        },
        {
            "tag_name": "0.10.0-rc1",
            "prerelease": true,
            "assets": [
                {
                    "name": "xiao_nrf52840_ble_sense_bootloader-0.10.0-rc1.zip",
                    "browser_download_url": "https://example.com/sense-0.10.0-rc1.zip",
                    "size": 41000
                }
            ]
        },
        {
            "tag_name": "0.8.0",
            "prerelease": false,
            "assets": [
                {
                    "name": "xiao_nrf52840_ble_sense_bootloader-0.8.0.zip",
                    "browser_download_url": "https://example.com/sense-0.8.0.zip",
                    "size": 39000
                }
            ]
        }
    ]"#;

    #[test]
    fn selects_newest_stable_zip_for_board() {
        let releases = listing(SAMPLE);
        let asset = select_asset(&releases, Board::Sense, false).unwrap();
        assert_eq!(asset.tag, "0.9.2");
        assert_eq!(asset.name, "xiao_nrf52840_ble_sense_bootloader-0.9.2.zip");
        assert_eq!(asset.size, 40960);
    }

    #[test]
    fn prerelease_included_only_on_request() {
        let releases = listing(SAMPLE);
        let asset = select_asset(&releases, Board::Sense, true).unwrap();
        assert_eq!(asset.tag, "0.10.0-rc1");
    }

    #[test]
    fn standard_board_matches_only_its_own_assets() {
        // The two fragments differ only by the `_sense` infix; make sure the
        // Standard filter does not grab Sense files from the same release.
        let releases = listing(SAMPLE);
        let asset = select_asset(&releases, Board::Standard, false).unwrap();
        assert_eq!(asset.name, "xiao_nrf52840_ble_bootloader-0.9.2.zip");
    }

    #[test]
    fn no_matching_asset_for_unknown_board_files() {
        let releases = listing(
            r#"[{"tag_name": "1.0.0", "assets": [
                {"name": "feather_bootloader-1.0.0.zip",
                 "browser_download_url": "https://example.com/f.zip", "size": 1}
            ]}]"#,
        );
        let err = select_asset(&releases, Board::Sense, false).unwrap_err();
        assert!(matches!(err, Error::NoMatchingAsset(_)));
    }

    #[test]
    fn drafts_and_non_semver_tags_are_skipped() {
        let releases = listing(
            r#"[
                {"tag_name": "2.0.0", "draft": true, "assets": [
                    {"name": "xiao_nrf52840_ble_sense_bootloader-2.0.0.zip",
                     "browser_download_url": "https://example.com/d.zip", "size": 1}
                ]},
                {"tag_name": "nightly", "assets": [
                    {"name": "xiao_nrf52840_ble_sense_bootloader-nightly.zip",
                     "browser_download_url": "https://example.com/n.zip", "size": 1}
                ]}
            ]"#,
        );
        let err = select_asset(&releases, Board::Sense, true).unwrap_err();
        assert!(matches!(err, Error::NoMatchingAsset(_)));
    }

    #[test]
    fn missing_local_package_is_invalid() {
        let err = validate_local(Path::new("/nonexistent/bootloader.zip")).unwrap_err();
        assert!(matches!(err, Error::InvalidPackage(_)));
    }

    #[test]
    fn wrong_extension_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bootloader.uf2");
        fs::write(&path, b"data").unwrap();
        let err = validate_local(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidPackage(_)));
    }

    #[test]
    fn empty_package_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bootloader.zip");
        File::create(&path).unwrap();
        let err = validate_local(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidPackage(_)));
    }

    #[test]
    fn valid_local_package_passes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bootloader.zip");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"PK\x03\x04").unwrap();
        assert_eq!(validate_local(&path).unwrap(), path);
    }

    fn test_resolver(cache_dir: &Path) -> Resolver {
        let config = Config::new(Some(cache_dir.to_path_buf()));
        Resolver::new(&config).unwrap()
    }

    fn sense_asset() -> ReleaseAsset {
        ReleaseAsset {
            version: version::parse("0.9.2").unwrap(),
            tag: "0.9.2".to_string(),
            name: "xiao_nrf52840_ble_sense_bootloader-0.9.2.zip".to_string(),
            url: "https://example.com/sense-0.9.2.zip".to_string(),
            size: 4,
        }
    }

    #[test]
    fn cached_package_with_matching_size_skips_download() {
        let dir = TempDir::new().unwrap();
        let resolver = test_resolver(dir.path());
        let asset = sense_asset();

        let cached = resolver.cache_path(&asset);
        fs::create_dir_all(cached.parent().unwrap()).unwrap();
        fs::write(&cached, b"PK\x03\x04").unwrap();

        assert!(resolver.is_cached(&asset));
        // fetch_package must not touch the network when the cache hits; the
        // example.com URL would fail the test if it tried.
        assert_eq!(resolver.fetch_package(&asset).unwrap(), cached);
    }

    #[test]
    fn size_mismatch_invalidates_cache_entry() {
        let dir = TempDir::new().unwrap();
        let resolver = test_resolver(dir.path());
        let asset = sense_asset();

        let cached = resolver.cache_path(&asset);
        fs::create_dir_all(cached.parent().unwrap()).unwrap();
        fs::write(&cached, b"PK").unwrap();

        assert!(!resolver.is_cached(&asset));
    }

    #[test]
    fn explicit_path_is_resolved_without_network() {
        let dir = TempDir::new().unwrap();
        let resolver = test_resolver(dir.path());
        let pkg = dir.path().join("local.zip");
        fs::write(&pkg, b"PK\x03\x04").unwrap();
        let resolved = resolver.resolve(Board::Sense, Some(&pkg), false).unwrap();
        assert_eq!(resolved, pkg);
    }

    #[test]
    fn explicit_missing_path_fails_without_network() {
        let dir = TempDir::new().unwrap();
        let resolver = test_resolver(dir.path());
        let err = resolver
            .resolve(Board::Sense, Some(Path::new("/nope/local.zip")), false)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPackage(_)));
    }
}

// SPDX-FileCopyrightText: 2026 OpenDisplay Project
//
// SPDX-License-Identifier: BSD-3-Clause

//! # xiao-bl-tools
//!
//! CLI for updating the Adafruit nRF52 bootloader on Seeed XIAO nRF52840
//! boards over serial DFU. Fixes boards shipped with broken OTA DFU support
//! by flashing the latest released bootloader + SoftDevice package through
//! `adafruit-nrfutil`.
//!
//! Modes supported: update (default), --version (read-only check)

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info};

use xiao_bl_tools::config::Config;
use xiao_bl_tools::device;
use xiao_bl_tools::error::Result;
use xiao_bl_tools::flash;
use xiao_bl_tools::port;
use xiao_bl_tools::port::StdinPrompt;
use xiao_bl_tools::release::{Board, Resolver};
use xiao_bl_tools::version;

#[derive(Parser)]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    #[arg(long = "version")]
    /// Report the device's bootloader version and the latest release, without flashing.
    check_version: bool,
    #[arg(short, long)]
    /// Serial port connected to the board (e.g. /dev/ttyACM0, COM3).
    port: Option<String>,
    #[arg(short, long, value_enum, default_value = "sense")]
    /// Board variant.
    board: Board,
    #[arg(long)]
    /// Path to a local .zip DFU package (skips the download).
    pkg: Option<PathBuf>,
    #[arg(long)]
    /// Consider prerelease bootloader versions as well.
    prerelease: bool,
    #[arg(long)]
    /// Directory to cache downloaded packages under.
    cache_dir: Option<PathBuf>,
    #[command(flatten)]
    /// The level of output verbosity.
    verbose: clap_verbosity_flag::Verbosity,
}

fn print_step(number: u8, message: &str) {
    println!();
    println!("  Step {number}: {message}");
    println!("  {}", "-".repeat(50));
}

/// Read-only version check: device metadata vs. latest release.
fn check_version(cli: &Cli, config: &Config) -> Result<()> {
    let Some(device_info) = device::read_device_version()? else {
        // Nothing mounted means the board is not in bootloader mode; report
        // it and stop before any network traffic.
        println!("  Device not found: no UF2 bootloader volume is mounted.");
        println!("  Double-tap RESET to enter bootloader mode and retry.");
        process::exit(1);
    };

    if let Some(model) = &device_info.model {
        println!("  Model:      {model}");
    }
    if let Some(bootloader) = &device_info.bootloader {
        println!("  Bootloader: {bootloader}");
    }
    if let Some(softdevice) = &device_info.softdevice {
        println!("  SoftDevice: {softdevice}");
    }
    if let Some(date) = &device_info.date {
        println!("  Built:      {date}");
    }

    let resolver = Resolver::new(config)?;
    let latest = resolver.latest(cli.board, cli.prerelease)?;
    println!("  Latest:     {}", latest.tag);

    match device_info.semver() {
        Some(device_version) if version::up_to_date(&device_version, &latest.version) => {
            println!();
            println!("  Bootloader is up to date.");
        }
        Some(_) => {
            println!();
            println!("  Update available. Run without --version to flash it.");
        }
        None => {
            println!();
            println!("  Device version is not comparable to the release tag.");
        }
    }
    Ok(())
}

/// The update sequence: prerequisites, package, port, flash.
///
/// Each step fails the run outright; the flasher is never invoked with
/// incomplete inputs, and a failed flash is never retried.
fn update(cli: &Cli, config: &Config) -> Result<()> {
    print_step(1, "Checking prerequisites");
    let tool_version = flash::check_tool()?;
    println!("  {}: {tool_version}", flash::FLASH_TOOL);

    print_step(2, "Preparing bootloader DFU package");
    println!("  Board: {}", cli.board.label());
    let resolver = Resolver::new(config)?;
    let package = resolver.resolve(cli.board, cli.pkg.as_deref(), cli.prerelease)?;

    print_step(3, "Detecting serial port");
    let mut prompt = StdinPrompt;
    let port = port::locate(cli.port.clone(), &mut prompt)?;

    print_step(4, "Flashing bootloader via serial DFU");
    println!();
    println!("  Package: {}", package.display());
    println!("  Port:    {}", port.path);
    println!();
    println!("  This updates both the bootloader and the SoftDevice.");
    println!("  It takes about 30-60 seconds. Do not unplug the board.");
    println!();
    flash::flash(&package, &port.path)?;

    println!();
    println!("  {}", "=".repeat(50));
    println!("  Bootloader update completed successfully!");
    println!("  The board will restart on its own.");
    println!("  {}", "=".repeat(50));
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    println!("XIAO nRF52840 Bootloader Updater");
    info!(
        "tool version: {}.{}",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR")
    );

    let config = Config::new(cli.cache_dir.clone());

    let result = if cli.check_version {
        check_version(&cli, &config)
    } else {
        update(&cli, &config)
    };

    if let Err(error) = result {
        println!();
        error!("{error}");
        if let Some(remedy) = error.remedy() {
            eprintln!("  Hint: {remedy}");
        }
        process::exit(error.exit_code());
    }
}

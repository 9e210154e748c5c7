// SPDX-FileCopyrightText: 2026 OpenDisplay Project
//
// SPDX-License-Identifier: BSD-3-Clause

//! This crate orchestrates Adafruit nRF52 bootloader updates for Seeed XIAO
//! nRF52840 boards: it resolves the newest DFU package from the bootloader's
//! GitHub releases (or takes a local one), finds the board's serial port,
//! drives `adafruit-nrfutil` to flash it, and reads the version metadata the
//! bootloader exposes on its UF2 volume.
//!
//! A binary companion is provided for the command line; the DFU wire
//! protocol itself is left entirely to `adafruit-nrfutil`.

pub mod config;
pub mod device;
pub mod error;
pub mod flash;
pub mod port;
pub mod release;
pub mod version;

pub use config::Config;
pub use error::{Error, Result};

// SPDX-FileCopyrightText: 2026 OpenDisplay Project
//
// SPDX-License-Identifier: BSD-3-Clause

//! Serial port discovery.
//!
//! The board shows up as a CDC-ACM serial device; candidates are picked by
//! USB vendor ID first (Seeed or Adafruit), then by product string, and only
//! then by device path shape for platforms that report no USB metadata.
//! A single candidate is selected automatically. With more than one the user
//! is asked to choose, never guessed at, so the wrong device cannot be
//! flashed by accident.

use std::io;
use std::io::Write;

use log::{debug, info};
use serialport::{SerialPortInfo, SerialPortType};

use crate::error::{Error, Result};

/// USB vendor IDs the board enumerates with (Seeed, Adafruit).
const KNOWN_VIDS: [u16; 2] = [0x2886, 0x239a];
/// Product-string fragments typical of the nRF52840 CDC-ACM interface.
const KNOWN_PRODUCTS: [&str; 3] = ["XIAO", "nRF", "Bluefruit"];

/// A serial device path, with whatever description the OS offered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortId {
    pub path: String,
    pub description: Option<String>,
}

impl SerialPortId {
    fn from_info(info: &SerialPortInfo) -> Self {
        let description = match &info.port_type {
            SerialPortType::UsbPort(usb) => usb.product.clone(),
            _ => None,
        };
        Self {
            path: info.port_name.clone(),
            description,
        }
    }
}

/// Capability for asking the operator to pick among several options.
///
/// Swapped for a canned implementation in tests so `pick` stays testable
/// without a terminal.
pub trait Prompt {
    fn choose(&mut self, prompt: &str, options: &[String]) -> io::Result<usize>;
}

/// Interactive prompt reading a numeric selection from stdin.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn choose(&mut self, prompt: &str, options: &[String]) -> io::Result<usize> {
        for (i, option) in options.iter().enumerate() {
            println!("    [{i}] {option}");
        }
        print!("  {prompt}: ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        let index: usize = line
            .trim()
            .parse()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "not a number"))?;
        if index >= options.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "selection out of range",
            ));
        }
        Ok(index)
    }
}

/// Heuristic: does this enumerated port look like the board?
fn is_candidate(info: &SerialPortInfo) -> bool {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => {
            if KNOWN_VIDS.contains(&usb.vid) {
                return true;
            }
            usb.product
                .as_deref()
                .map(|p| KNOWN_PRODUCTS.iter().any(|k| p.contains(k)))
                .unwrap_or(false)
        }
        // No USB metadata to go on; fall back to CDC-ACM style path names.
        _ => info.port_name.contains("ttyACM") || info.port_name.contains("cu.usbmodem"),
    }
}

/// Narrow an enumeration down to likely board ports.
pub fn candidates(ports: &[SerialPortInfo]) -> Vec<SerialPortId> {
    let mut found: Vec<SerialPortId> = ports
        .iter()
        .filter(|p| is_candidate(p))
        .map(SerialPortId::from_info)
        .collect();
    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}

/// Settle on one port: fail on zero, auto-select one, prompt on several.
pub fn pick(candidates: Vec<SerialPortId>, prompt: &mut dyn Prompt) -> Result<SerialPortId> {
    match candidates.len() {
        0 => Err(Error::NoPortFound),
        1 => {
            let port = candidates.into_iter().next().unwrap();
            println!("  Detected serial port: {}", port.path);
            Ok(port)
        }
        _ => {
            println!("  Multiple serial ports found:");
            let options: Vec<String> = candidates
                .iter()
                .map(|p| match &p.description {
                    Some(desc) => format!("{} ({desc})", p.path),
                    None => p.path.clone(),
                })
                .collect();
            let index = prompt.choose("Select port number", &options)?;
            let port = candidates.into_iter().nth(index).unwrap();
            println!("  Selected: {}", port.path);
            Ok(port)
        }
    }
}

/// Locate the port to flash through.
///
/// An explicit port is used verbatim with no validation; the flashing tool
/// fails loudly on its own if the path is wrong.
pub fn locate(explicit: Option<String>, prompt: &mut dyn Prompt) -> Result<SerialPortId> {
    if let Some(path) = explicit {
        println!("  Using specified port: {path}");
        return Ok(SerialPortId {
            path,
            description: None,
        });
    }
    let ports = serialport::available_ports()?;
    debug!("enumerated {} serial ports", ports.len());
    let found = candidates(&ports);
    info!("{} candidate port(s) after filtering", found.len());
    pick(found, prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn usb_port(name: &str, vid: u16, product: Option<&str>) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid,
                pid: 0x0045,
                serial_number: None,
                manufacturer: None,
                product: product.map(str::to_string),
            }),
        }
    }

    fn bare_port(name: &str) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::Unknown,
        }
    }

    struct StubPrompt {
        choice: usize,
        called: bool,
    }

    impl Prompt for StubPrompt {
        fn choose(&mut self, _prompt: &str, options: &[String]) -> io::Result<usize> {
            self.called = true;
            assert!(self.choice < options.len());
            Ok(self.choice)
        }
    }

    #[test]
    fn known_vendor_ids_are_candidates() {
        let ports = vec![
            usb_port("/dev/ttyACM0", 0x2886, Some("XIAO nRF52840 Sense")),
            usb_port("/dev/ttyUSB0", 0x0403, Some("FT232R USB UART")),
        ];
        let found = candidates(&ports);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "/dev/ttyACM0");
    }

    #[test]
    fn product_string_matches_unknown_vendor() {
        let ports = vec![usb_port("COM7", 0x1234, Some("nRF52 DFU Serial"))];
        assert_eq!(candidates(&ports).len(), 1);
    }

    #[test]
    fn path_shape_fallback_without_usb_metadata() {
        let ports = vec![
            bare_port("/dev/ttyACM1"),
            bare_port("/dev/ttyS0"),
            bare_port("/dev/cu.usbmodem14101"),
        ];
        let found = candidates(&ports);
        let paths: Vec<&str> = found.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, ["/dev/cu.usbmodem14101", "/dev/ttyACM1"]);
    }

    #[test]
    fn zero_candidates_is_no_port_found() {
        let mut prompt = StubPrompt {
            choice: 0,
            called: false,
        };
        let err = pick(vec![], &mut prompt).unwrap_err();
        assert!(matches!(err, Error::NoPortFound));
        assert!(!prompt.called);
    }

    #[test]
    fn single_candidate_selected_without_prompting() {
        let mut prompt = StubPrompt {
            choice: 0,
            called: false,
        };
        let only = SerialPortId {
            path: "/dev/ttyACM0".to_string(),
            description: None,
        };
        let picked = pick(vec![only.clone()], &mut prompt).unwrap();
        assert_eq!(picked, only);
        assert!(!prompt.called);
    }

    #[test]
    fn multiple_candidates_go_through_the_prompt() {
        let mut prompt = StubPrompt {
            choice: 1,
            called: false,
        };
        let ports = vec![
            SerialPortId {
                path: "/dev/ttyACM0".to_string(),
                description: Some("XIAO nRF52840".to_string()),
            },
            SerialPortId {
                path: "/dev/ttyACM1".to_string(),
                description: None,
            },
        ];
        let picked = pick(ports, &mut prompt).unwrap();
        assert!(prompt.called);
        assert_eq!(picked.path, "/dev/ttyACM1");
    }

    #[test]
    fn explicit_port_is_used_verbatim() {
        let mut prompt = StubPrompt {
            choice: 0,
            called: false,
        };
        let picked = locate(Some("/dev/ttyACM9".to_string()), &mut prompt).unwrap();
        assert_eq!(picked.path, "/dev/ttyACM9");
        assert!(!prompt.called);
    }
}

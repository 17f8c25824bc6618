// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! PCI bus addresses
//!
//! Adapters and controllers are identified by their PCI address. The kernel and
//! `/dev/disk/by-path` use the canonical `dddd:bb:dd.f` form while `lspci` prints
//! the short `bb:dd.f` form by default, so both are accepted here. Domains are
//! printed with at least four digits; Intel VMD domains such as `10000` take more.

use std::{fmt, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::Error;

/// A PCI address in domain:bus:device.function form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct PciAddress {
    /// PCI segment (domain)
    pub domain: u32,
    /// Bus number
    pub bus: u8,
    /// Device number (0..=0x1f)
    pub device: u8,
    /// Function number (0..=7)
    pub function: u8,
}

impl PciAddress {
    /// Create a new address from its components
    pub const fn new(domain: u32, bus: u8, device: u8, function: u8) -> Self {
        Self {
            domain,
            bus,
            device,
            function,
        }
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

impl FromStr for PciAddress {
    type Err = Error;

    /// Parse either `dddd:bb:dd.f` or `bb:dd.f`
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidPciAddress(value.to_owned());

        let (head, function) = value.trim().rsplit_once('.').ok_or_else(invalid)?;
        let parts = head.split(':').collect::<Vec<_>>();
        let (domain, bus, device) = match parts.as_slice() {
            [domain, bus, device] => (*domain, *bus, *device),
            [bus, device] => ("0000", *bus, *device),
            _ => return Err(invalid()),
        };

        // Wider domains never carry leading zeros
        let domain_ok = domain.len() == 4 || ((5..=8).contains(&domain.len()) && !domain.starts_with('0'));
        if !domain_ok || bus.len() != 2 || device.len() != 2 || function.len() != 1 {
            return Err(invalid());
        }

        let domain = u32::from_str_radix(domain, 16).map_err(|_| invalid())?;
        let bus = u8::from_str_radix(bus, 16).map_err(|_| invalid())?;
        let device = u8::from_str_radix(device, 16).map_err(|_| invalid())?;
        let function = u8::from_str_radix(function, 16).map_err(|_| invalid())?;

        if device > 0x1f || function > 7 {
            return Err(invalid());
        }

        Ok(Self::new(domain, bus, device, function))
    }
}

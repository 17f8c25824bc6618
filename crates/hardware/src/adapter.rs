// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Host bus adapter descriptors and model families
//!
//! Families are recognised from the free-form model string alone. No capability
//! probing happens here: a `9305-24i` is a 24 port card because its name says so.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PciAddress;

/// An installed host bus adapter, as reported by the hardware inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HbaDescriptor {
    /// Adapter model name (e.g. "SAS9305-16i", "HBA 9400-16i", "9361-24i")
    #[serde(rename = "Model")]
    pub model: String,

    /// PCI address of the adapter
    #[serde(rename = "Bus Address")]
    pub bus_address: PciAddress,
}

impl HbaDescriptor {
    /// Create a new descriptor
    pub fn new(model: impl Into<String>, bus_address: PciAddress) -> Self {
        Self {
            model: model.into(),
            bus_address,
        }
    }

    /// Returns the model family of this adapter, if it is a known one
    pub fn family(&self) -> Option<AdapterFamily> {
        AdapterFamily::from_model(&self.model)
    }
}

impl fmt::Display for HbaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.model, self.bus_address)
    }
}

/// Known adapter model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterFamily {
    /// LSI/Broadcom SAS 9305-16i
    Sas9305_16i,
    /// LSI/Broadcom SAS 9305-24i
    Sas9305_24i,
    /// Broadcom HBA 9400-16i
    Hba9400_16i,
    /// Broadcom 9600-16i tri-mode
    Tri9600_16i,
    /// Broadcom 9600-24i tri-mode
    Tri9600_24i,
    /// Broadcom MegaRAID 9361-16i
    Raid9361_16i,
    /// Broadcom MegaRAID 9361-24i
    Raid9361_24i,
}

// Model fragments, checked in order against the adapter model string
const FAMILIES: &[(&str, AdapterFamily)] = &[
    ("9305-16i", AdapterFamily::Sas9305_16i),
    ("9305-24i", AdapterFamily::Sas9305_24i),
    ("9400-16i", AdapterFamily::Hba9400_16i),
    ("9600-16i", AdapterFamily::Tri9600_16i),
    ("9600-24i", AdapterFamily::Tri9600_24i),
    ("9361-16i", AdapterFamily::Raid9361_16i),
    ("9361-24i", AdapterFamily::Raid9361_24i),
];

impl AdapterFamily {
    /// Match a model string against the known families
    pub fn from_model(model: &str) -> Option<Self> {
        let model = model.trim().to_ascii_lowercase();
        FAMILIES
            .iter()
            .find(|(fragment, _)| model.contains(fragment))
            .map(|(_, family)| *family)
    }

    /// Number of phys the adapter exposes
    pub fn ports(&self) -> u8 {
        match self {
            Self::Sas9305_16i | Self::Hba9400_16i | Self::Tri9600_16i | Self::Raid9361_16i => 16,
            Self::Sas9305_24i | Self::Tri9600_24i | Self::Raid9361_24i => 24,
        }
    }

    /// Whether drives sit behind RAID firmware rather than being passed through
    pub fn is_raid(&self) -> bool {
        matches!(self, Self::Raid9361_16i | Self::Raid9361_24i)
    }
}

impl fmt::Display for AdapterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sas9305_16i => f.write_str("9305-16i"),
            Self::Sas9305_24i => f.write_str("9305-24i"),
            Self::Hba9400_16i => f.write_str("9400-16i"),
            Self::Tri9600_16i => f.write_str("9600-16i"),
            Self::Tri9600_24i => f.write_str("9600-24i"),
            Self::Raid9361_16i => f.write_str("9361-16i"),
            Self::Raid9361_24i => f.write_str("9361-24i"),
        }
    }
}

// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! The hardware inventory record alias generation works from

use std::{collections::HashSet, sync::OnceLock};

use hardware::HbaDescriptor;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{DuplicateBusAddress, Error, MissingField, MissingModel};

// Enterprise Linux rebuilds whose 7.x releases need the legacy SATA discovery path
static ENTERPRISE_LINUX: OnceLock<Regex> = OnceLock::new();

/// Motherboard identification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Motherboard {
    #[serde(rename = "Manufacturer", default)]
    pub manufacturer: String,

    #[serde(rename = "Product Name", default)]
    pub product_name: String,

    #[serde(rename = "Serial Number", default)]
    pub serial: String,
}

/// Operating system identification, as found in os-release
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    /// `NAME`, e.g. "Rocky Linux"
    pub name: String,
    /// `VERSION_ID`, e.g. "9" or "7.9"
    pub version_id: String,
}

impl OsRelease {
    /// Major component of the version id
    pub fn major_version(&self) -> Option<u32> {
        self.version_id.split('.').next()?.trim().parse().ok()
    }

    /// Whether this is an enterprise Linux 7 release
    pub fn is_legacy_el7(&self) -> bool {
        let pattern = ENTERPRISE_LINUX.get_or_init(|| {
            Regex::new(r"(?i)\b(centos|red hat|rhel|oracle|scientific)\b")
                .expect("Failed to initialise known-working regex")
        });
        self.major_version() == Some(7) && pattern.is_match(&self.name)
    }
}

/// Everything known about the server for one alias generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDescriptor {
    #[serde(rename = "Motherboard", default)]
    pub motherboard: Motherboard,

    #[serde(rename = "HBA", default)]
    pub hbas: Vec<HbaDescriptor>,

    #[serde(rename = "Chassis Size")]
    pub chassis_size: String,

    #[serde(rename = "Alias Style")]
    pub alias_style: String,

    #[serde(rename = "OS NAME", default)]
    pub os_name: String,

    #[serde(rename = "OS VERSION_ID", default)]
    pub os_version_id: String,

    #[serde(rename = "Hybrid", default)]
    pub hybrid: bool,

    #[serde(rename = "VM", default)]
    pub vm: bool,

    #[serde(rename = "Edit Mode", default)]
    pub edit_mode: bool,
}

impl InventoryDescriptor {
    /// Parse and validate a server-info JSON record
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let inventory: Self = serde_json::from_str(json)?;
        inventory.validate()?;
        Ok(inventory)
    }

    /// The operating system this inventory was taken on
    pub fn os(&self) -> OsRelease {
        OsRelease {
            name: self.os_name.clone(),
            version_id: self.os_version_id.clone(),
        }
    }

    /// Check the record is structurally usable
    pub fn validate(&self) -> Result<(), Error> {
        if self.alias_style.trim().is_empty() {
            return Err(MissingField {
                id: "Alias Style",
                advice: Some("use \"?\" when the style is not known".into()),
            })?;
        }
        if self.chassis_size.trim().is_empty() {
            return Err(MissingField {
                id: "Chassis Size",
                advice: Some("use \"?\" when the chassis is not known".into()),
            })?;
        }

        let mut seen = HashSet::new();
        for hba in &self.hbas {
            if hba.model.trim().is_empty() {
                return Err(MissingModel {
                    address: hba.bus_address,
                })?;
            }
            if !seen.insert(hba.bus_address) {
                return Err(DuplicateBusAddress {
                    address: hba.bus_address,
                    advice: Some("each adapter must be listed once".into()),
                })?;
            }
        }

        Ok(())
    }
}

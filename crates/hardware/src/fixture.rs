// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Canned discovery answers for testing.
//!
//! This module provides a [`Discovery`] implementation that answers from fixed
//! data, so alias generation can be exercised without the hardware present.

use std::{collections::BTreeMap, env, path::PathBuf};

use serde_json::Value;

use crate::{Discovery, Error, HbaDescriptor, PciAddress};

const ENV_SATA_ADDRS: &str = "DRIVEMAP_DMAP_SATA_ADDRS";
const ENV_LSPCI_JSON: &str = "DRIVEMAP_DMAP_LSPCI_JSON";
const ENV_SATA_PATHS_JSON: &str = "DRIVEMAP_DMAP_SATA_PATHS_JSON";
const ENV_HWRAID_JSON: &str = "DRIVEMAP_DMAP_HWRAID_JSON";

/// Discovery backed by fixed answers
///
/// Anything not configured behaves as "nothing found", except RAID queries which
/// fail for adapters without an entry, as an unreachable controller would.
#[derive(Debug, Clone, Default)]
pub struct FixtureDiscovery {
    sata_addresses: Vec<PciAddress>,
    sata_fails: bool,
    pci_lines: Vec<String>,
    ata_paths: BTreeMap<PciAddress, Vec<PathBuf>>,
    raid_disks: BTreeMap<PciAddress, Vec<String>>,
}

impl FixtureDiscovery {
    /// Create an empty fixture
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer SATA controller enumeration with `addresses`
    pub fn with_sata_addresses(self, addresses: impl IntoIterator<Item = PciAddress>) -> Self {
        Self {
            sata_addresses: addresses.into_iter().collect(),
            ..self
        }
    }

    /// Make SATA controller enumeration fail outright
    pub fn with_failing_sata_addresses(self) -> Self {
        Self {
            sata_fails: true,
            ..self
        }
    }

    /// Answer the PCI listing with `lines`
    pub fn with_pci_lines<S: Into<String>>(self, lines: impl IntoIterator<Item = S>) -> Self {
        Self {
            pci_lines: lines.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Answer ATA port enumeration for `controller` with `paths`
    pub fn with_ata_paths<P: Into<PathBuf>>(mut self, controller: PciAddress, paths: impl IntoIterator<Item = P>) -> Self {
        self.ata_paths
            .insert(controller, paths.into_iter().map(Into::into).collect());
        self
    }

    /// Answer RAID queries for the adapter at `adapter` with `ids`
    pub fn with_raid_disks<S: Into<String>>(mut self, adapter: PciAddress, ids: impl IntoIterator<Item = S>) -> Self {
        self.raid_disks
            .insert(adapter, ids.into_iter().map(Into::into).collect());
        self
    }

    /// Build a fixture from the `DRIVEMAP_DMAP_*` environment variables.
    ///
    /// Returns `Ok(None)` when none of them is set.
    pub fn from_env() -> Result<Option<Self>, Error> {
        Self::from_vars(|key| env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Build a fixture from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Option<Self>, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sata = lookup(ENV_SATA_ADDRS);
        let lspci = lookup(ENV_LSPCI_JSON);
        let paths = lookup(ENV_SATA_PATHS_JSON);
        let hwraid = lookup(ENV_HWRAID_JSON);

        if sata.is_none() && lspci.is_none() && paths.is_none() && hwraid.is_none() {
            return Ok(None);
        }

        let mut fixture = Self::new();

        if let Some(sata) = sata {
            fixture.sata_addresses = sata
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse::<PciAddress>)
                .collect::<Result<Vec<_>, _>>()?;
        }

        if let Some(lspci) = lspci {
            fixture.pci_lines = serde_json::from_str(&lspci)?;
        }

        if let Some(paths) = paths {
            let map: BTreeMap<String, Vec<PathBuf>> = serde_json::from_str(&paths)?;
            for (addr, paths) in map {
                fixture.ata_paths.insert(addr.parse()?, paths);
            }
        }

        if let Some(hwraid) = hwraid {
            let map: BTreeMap<String, Vec<Value>> = serde_json::from_str(&hwraid)?;
            for (addr, ids) in map {
                let ids = ids
                    .into_iter()
                    .map(|v| match v {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect();
                fixture.raid_disks.insert(addr.parse()?, ids);
            }
        }

        Ok(Some(fixture))
    }
}

impl Discovery for FixtureDiscovery {
    fn enumerate_sata_controller_addresses(&self) -> Result<Vec<PciAddress>, Error> {
        if self.sata_fails {
            return Err(Error::Unavailable("SATA controller enumeration".to_owned()));
        }
        Ok(self.sata_addresses.clone())
    }

    fn enumerate_pci_devices(&self) -> Result<Vec<String>, Error> {
        Ok(self.pci_lines.clone())
    }

    fn enumerate_ata_port_paths(&self, controller: &PciAddress) -> Result<Vec<PathBuf>, Error> {
        Ok(self.ata_paths.get(controller).cloned().unwrap_or_default())
    }

    fn query_raid_virtual_disks(&self, adapter: &HbaDescriptor) -> Result<Vec<String>, Error> {
        self.raid_disks
            .get(&adapter.bus_address)
            .cloned()
            .ok_or_else(|| Error::Unavailable(format!("RAID firmware for {adapter}")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use test_log::test;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_no_vars_no_fixture() {
        assert!(FixtureDiscovery::from_vars(vars(&[])).unwrap().is_none());
    }

    #[test]
    fn test_from_vars() {
        let fixture = FixtureDiscovery::from_vars(vars(&[
            (ENV_SATA_ADDRS, "0000:48:00.0,0000:49:00.0"),
            (ENV_LSPCI_JSON, r#"["00:17.0 Intel Corporation SATA Controller"]"#),
            (
                ENV_SATA_PATHS_JSON,
                r#"{"0000:48:00.0": ["/dev/disk/by-path/pci-0000:48:00.0-ata-5"]}"#,
            ),
            (ENV_HWRAID_JSON, r#"{"0000:31:00.0": ["200", 201]}"#),
        ]))
        .unwrap()
        .unwrap();

        let sata = fixture.enumerate_sata_controller_addresses().unwrap();
        assert_eq!(sata.len(), 2);
        assert_eq!(fixture.enumerate_pci_devices().unwrap().len(), 1);
        assert_eq!(
            fixture.enumerate_ata_port_paths(&sata[0]).unwrap(),
            vec![PathBuf::from("/dev/disk/by-path/pci-0000:48:00.0-ata-5")]
        );
        assert!(fixture.enumerate_ata_port_paths(&sata[1]).unwrap().is_empty());

        let raid = HbaDescriptor::new("9361-16i", "0000:31:00.0".parse().unwrap());
        assert_eq!(fixture.query_raid_virtual_disks(&raid).unwrap(), vec!["200", "201"]);
        let other = HbaDescriptor::new("9361-16i", "0000:32:00.0".parse().unwrap());
        assert!(fixture.query_raid_virtual_disks(&other).is_err());
    }

    #[test]
    fn test_malformed_vars() {
        assert!(FixtureDiscovery::from_vars(vars(&[(ENV_SATA_ADDRS, "nope")])).is_err());
        assert!(FixtureDiscovery::from_vars(vars(&[(ENV_LSPCI_JSON, "[1, 2")])).is_err());
    }

    #[test]
    fn test_failing_sata() {
        let fixture = FixtureDiscovery::new().with_failing_sata_addresses();
        assert!(fixture.enumerate_sata_controller_addresses().is_err());
    }
}

// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Discovery against the running system

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use log::debug;

use crate::{command, storcli, sysfs, Discovery, Error, HbaDescriptor, PciAddress, BY_PATH_DIR, PCI_DEVICES_DIR};

/// Live hardware discovery through sysfs, devfs and vendor tools
#[derive(Debug, Clone)]
pub struct SystemDiscovery {
    sysroot: PathBuf,
    by_path_dir: PathBuf,
    timeout: Duration,
    lspci: String,
    storcli: String,
}

impl Default for SystemDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemDiscovery {
    /// Create a discovery backend for the host root filesystem
    pub fn new() -> Self {
        Self {
            sysroot: PathBuf::from("/"),
            by_path_dir: PathBuf::from(BY_PATH_DIR),
            timeout: Duration::from_secs(5),
            lspci: "lspci".to_owned(),
            storcli: "storcli64".to_owned(),
        }
    }

    /// Look for sysfs below another root (e.g. a chroot or test tree)
    pub fn with_sysroot(self, sysroot: impl AsRef<Path>) -> Self {
        Self {
            sysroot: sysroot.as_ref().to_owned(),
            ..self
        }
    }

    /// Override the directory holding the by-path links
    pub fn with_by_path_dir(self, dir: impl AsRef<Path>) -> Self {
        Self {
            by_path_dir: dir.as_ref().to_owned(),
            ..self
        }
    }

    /// Bound every external tool invocation by `timeout`
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Use a different `lspci` binary
    pub fn with_lspci(self, program: impl Into<String>) -> Self {
        Self {
            lspci: program.into(),
            ..self
        }
    }

    /// Use a different MegaRAID CLI binary
    pub fn with_storcli(self, program: impl Into<String>) -> Self {
        Self {
            storcli: program.into(),
            ..self
        }
    }
}

impl Discovery for SystemDiscovery {
    fn enumerate_sata_controller_addresses(&self) -> Result<Vec<PciAddress>, Error> {
        let dir = self.sysroot.join(PCI_DEVICES_DIR);
        let found = sysfs::sata_controllers(&dir)?;
        debug!("sysfs reports {} SATA controllers", found.len());
        Ok(found)
    }

    fn enumerate_pci_devices(&self) -> Result<Vec<String>, Error> {
        let out = command::run(&self.lspci, &[], self.timeout)?;
        Ok(out.lines().map(str::to_owned).collect())
    }

    fn enumerate_ata_port_paths(&self, controller: &PciAddress) -> Result<Vec<PathBuf>, Error> {
        Ok(sysfs::ata_port_links(&self.by_path_dir, controller)?)
    }

    fn query_raid_virtual_disks(&self, adapter: &HbaDescriptor) -> Result<Vec<String>, Error> {
        let show = command::run(&self.storcli, &["/call", "show", "J"], self.timeout)?;
        let index = storcli::controller_index(&show, &adapter.bus_address)?;
        debug!("{adapter} is RAID controller {index}");

        let drives = command::run(&self.storcli, &["/call/eall/sall", "show", "J"], self.timeout)?;
        storcli::drive_ids(&drives, index)
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use super::*;

    #[test]
    fn test_sysroot_layout() {
        let root = env::temp_dir().join(format!("hardware-system-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        let node = root.join(PCI_DEVICES_DIR).join("0000:00:17.0");
        fs::create_dir_all(&node).unwrap();
        fs::write(node.join("class"), "0x010601\n").unwrap();
        let by_path = root.join("by-path");
        fs::create_dir_all(&by_path).unwrap();
        fs::write(by_path.join("pci-0000:00:17.0-ata-1"), "").unwrap();

        let discovery = SystemDiscovery::new().with_sysroot(&root).with_by_path_dir(&by_path);
        let controllers = discovery.enumerate_sata_controller_addresses().unwrap();
        assert_eq!(controllers, vec![PciAddress::new(0, 0, 0x17, 0)]);
        let ports = discovery.enumerate_ata_port_paths(&controllers[0]).unwrap();
        assert_eq!(ports, vec![by_path.join("pci-0000:00:17.0-ata-1")]);

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_missing_tools_fail() {
        let discovery = SystemDiscovery::new()
            .with_lspci("no-such-lspci")
            .with_storcli("no-such-storcli")
            .with_timeout(Duration::from_millis(200));
        assert!(discovery.enumerate_pci_devices().is_err());
        let hba = HbaDescriptor::new("9361-16i", PciAddress::new(0, 0x31, 0, 0));
        assert!(discovery.query_raid_virtual_disks(&hba).is_err());
    }
}

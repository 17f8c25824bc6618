// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

mod adapter;
pub use adapter::{AdapterFamily, HbaDescriptor};

mod command;
pub mod fixture;

mod pci;
pub use pci::PciAddress;

mod storcli;
mod sysfs;
pub use sysfs::ata_port_number;

mod system;
pub use system::SystemDiscovery;

const PCI_DEVICES_DIR: &str = "sys/bus/pci/devices";
const BY_PATH_DIR: &str = "/dev/disk/by-path";

/// Errors raised while probing hardware
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred
    #[error("io: {0}")]
    IO(#[from] io::Error),

    /// A string could not be read as a PCI address
    #[error("invalid PCI address: {0:?}")]
    InvalidPciAddress(String),

    /// An external program ran past its deadline and was killed
    #[error("{program} timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    /// An external program exited unsuccessfully
    #[error("{program} failed: {status}")]
    CommandFailed { program: String, status: String },

    /// Malformed JSON from a tool or fixture
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// RAID firmware did not report the requested controller
    #[error("no RAID controller reported at {0}")]
    UnknownController(PciAddress),

    /// The information source is not available
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Hardware discovery operations needed to turn bay locators into device paths.
///
/// Every operation is a blocking probe of the live system. Implementations report
/// failures rather than hiding them; deciding what a failure means for a bay is up
/// to the caller.
pub trait Discovery {
    /// Addresses of the SATA (AHCI) controllers the host knows about
    fn enumerate_sata_controller_addresses(&self) -> Result<Vec<PciAddress>, Error>;

    /// Raw PCI device listing, one line per device (`lspci` format)
    fn enumerate_pci_devices(&self) -> Result<Vec<String>, Error>;

    /// Stable `/dev/disk/by-path` entries for the ATA ports of a controller
    fn enumerate_ata_port_paths(&self, controller: &PciAddress) -> Result<Vec<PathBuf>, Error>;

    /// Virtual disk identifiers exposed by a RAID adapter, in firmware order
    fn query_raid_virtual_disks(&self, adapter: &HbaDescriptor) -> Result<Vec<String>, Error>;
}

/// Path of the by-path link for a SAS phy on a pass-through adapter
pub fn sas_phy_path(adapter: &PciAddress, phy: u8) -> PathBuf {
    PathBuf::from(BY_PATH_DIR).join(format!("pci-{adapter}-sas-phy{phy}-lun-0"))
}

/// Path of the by-path link for a drive exposed through RAID firmware
pub fn raid_disk_path(adapter: &PciAddress, id: &str) -> PathBuf {
    PathBuf::from(BY_PATH_DIR).join(format!("pci-{adapter}-scsi-0:0:{id}:0"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_path_names() {
        let addr = PciAddress::new(0, 1, 0, 0);
        assert_eq!(
            sas_phy_path(&addr, 7),
            PathBuf::from("/dev/disk/by-path/pci-0000:01:00.0-sas-phy7-lun-0")
        );
        assert_eq!(
            raid_disk_path(&addr, "99"),
            PathBuf::from("/dev/disk/by-path/pci-0000:01:00.0-scsi-0:0:99:0")
        );
    }
}

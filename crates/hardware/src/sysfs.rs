// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Helper functions for interacting with Linux sysfs and devfs link farms

use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    sync::OnceLock,
};

use log::trace;
use regex::Regex;

use crate::PciAddress;

/// PCI class code prefix for SATA mass storage controllers
const SATA_CLASS_PREFIX: &str = "0x0106";

// by-path ATA link names, e.g. pci-0000:00:17.0-ata-3 or pci-0000:00:17.0-ata-3.0
static ATA_LINK: OnceLock<Regex> = OnceLock::new();

fn ata_link() -> &'static Regex {
    ATA_LINK.get_or_init(|| {
        Regex::new(r"^pci-(\S+)-ata-(\d+)(?:\.\d+)?$").expect("Failed to initialise known-working regex")
    })
}

/// Reads a value from a sysfs node and attempts to parse it to type T
///
/// # Arguments
///
/// * `node` - Path to the sysfs node
/// * `key` - Name of the sysfs attribute to read
///
/// # Returns
///
/// * `Some(T)` if the value was successfully read and parsed
/// * `None` if the file could not be read or parsed
pub(crate) fn read<T>(node: &Path, key: &str) -> Option<T>
where
    T: FromStr,
{
    fs::read_to_string(node.join(key)).ok()?.trim().parse().ok()
}

/// Lists PCI devices below `devices_dir` whose class marks them as SATA controllers
pub(crate) fn sata_controllers(devices_dir: &Path) -> io::Result<Vec<PciAddress>> {
    let mut found = fs::read_dir(devices_dir)?
        .filter_map(Result::ok)
        .filter_map(|e| {
            let name = e.file_name().to_str()?.to_owned();
            let class: String = read(&e.path(), "class")?;
            trace!("pci {name} class {class}");
            if !class.to_ascii_lowercase().starts_with(SATA_CLASS_PREFIX) {
                return None;
            }
            match name.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    trace!("skipping SATA controller {name}: {e}");
                    None
                }
            }
        })
        .collect::<Vec<_>>();
    found.sort();
    Ok(found)
}

/// Lists the by-path links of the ATA ports attached to `controller`.
/// Partition links are skipped.
pub(crate) fn ata_port_links(by_path_dir: &Path, controller: &PciAddress) -> io::Result<Vec<PathBuf>> {
    let wanted = controller.to_string();
    let mut found = fs::read_dir(by_path_dir)?
        .filter_map(Result::ok)
        .filter_map(|e| {
            let name = e.file_name().to_str()?.to_owned();
            let captures = ata_link().captures(&name)?;
            (captures[1] == wanted).then(|| e.path())
        })
        .collect::<Vec<_>>();
    found.sort_by_key(|p| ata_port_number(p));
    Ok(found)
}

/// Returns the port number encoded in an ATA by-path link name
pub fn ata_port_number(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    ata_link().captures(name)?[2].parse().ok()
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("hardware-sysfs-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_sata_controllers() {
        let root = scratch("pci");
        for (addr, class) in [
            ("0000:00:17.0", "0x010601"),
            ("0000:05:00.0", "0x010700"),
            ("0000:00:11.5", "0x010601"),
            ("10000:e0:17.0", "0x010601"),
            ("not-an-address", "0x010601"),
        ] {
            let node = root.join(addr);
            fs::create_dir_all(&node).unwrap();
            fs::write(node.join("class"), format!("{class}\n")).unwrap();
        }

        let found = sata_controllers(&root).unwrap();
        let found = found.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(found, vec!["0000:00:11.5", "0000:00:17.0", "10000:e0:17.0"]);
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_ata_port_links() {
        let root = scratch("bypath");
        for name in [
            "pci-0000:00:17.0-ata-10",
            "pci-0000:00:17.0-ata-2",
            "pci-0000:00:17.0-ata-2-part1",
            "pci-0000:00:17.0-ata-1.0",
            "pci-0000:00:11.5-ata-1",
            "pci-0000:01:00.0-sas-phy0-lun-0",
        ] {
            fs::write(root.join(name), "").unwrap();
        }

        let controller: PciAddress = "0000:00:17.0".parse().unwrap();
        let links = ata_port_links(&root, &controller).unwrap();
        let ports = links.iter().filter_map(|p| ata_port_number(p)).collect::<Vec<_>>();
        assert_eq!(ports, vec![1, 2, 10]);
        fs::remove_dir_all(root).unwrap();
    }
}

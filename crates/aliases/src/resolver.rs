// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Turning bay locators into device paths
//!
//! Three strategies exist, one per [`Locator`] kind: SAS phys on pass-through
//! adapters, onboard ATA ports, and virtual disks behind RAID firmware. Discovery
//! failures never escape from here; they leave the affected bay unresolved, or for
//! RAID firmware, substitute a sentinel so the bay still shows up for an operator.

use std::{collections::HashMap, fmt, path::PathBuf, sync::OnceLock};

use hardware::{ata_port_number, raid_disk_path, sas_phy_path, Discovery, HbaDescriptor, PciAddress};
use itertools::Itertools;
use log::{debug, trace, warn};
use regex::Regex;

use crate::{AdapterClass, InventoryDescriptor, Locator, OsRelease, SlotDefinition};

/// Identifier substituted for every virtual disk when RAID firmware cannot be queried
pub const RAID_SENTINEL_ID: &str = "99";

/// Number of sentinel identifiers substituted, the most bays a RAID adapter can carry
pub const RAID_SENTINEL_LEN: usize = 24;

// Leading address of an lspci line that describes a SATA controller
static SATA_LISTING: OnceLock<Regex> = OnceLock::new();

/// Why a bay could not be mapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// The template wants more adapters of a class than are installed
    MissingAdapter { class: AdapterClass, adapter: usize },
    /// The adapter has fewer phys than the template expects
    PortOutOfRange { adapter: PciAddress, port: u8 },
    /// Fewer onboard ATA ports were found than the template expects
    MissingSataPort { port: usize },
    /// The RAID firmware reported fewer virtual disks than the template expects
    MissingVirtualDisk { adapter: PciAddress, disk: usize },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::MissingAdapter { class, adapter } => write!(f, "{class} #{adapter} is not installed"),
            Reason::PortOutOfRange { adapter, port } => write!(f, "adapter {adapter} has no phy {port}"),
            Reason::MissingSataPort { port } => write!(f, "onboard ATA port #{port} not found"),
            Reason::MissingVirtualDisk { adapter, disk } => {
                write!(f, "adapter {adapter} reports no virtual disk #{disk}")
            }
        }
    }
}

/// Outcome of resolving one bay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A real device path
    Path(String),
    /// A placeholder path signalling that the physical mapping is unknown
    Sentinel(String),
    /// No path at all
    Unresolved(Reason),
}

/// A bay label paired with its resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSlot {
    pub label: String,
    pub resolution: Resolution,
}

impl ResolvedSlot {
    /// The path to alias, if there is one
    pub fn target(&self) -> Option<&str> {
        match &self.resolution {
            Resolution::Path(path) | Resolution::Sentinel(path) => Some(path),
            Resolution::Unresolved(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
enum RaidDisks {
    Reported(Vec<String>),
    Sentinel,
}

/// Resolves slots for one inventory against one discovery backend.
///
/// Discovery answers are cached for the lifetime of the resolver, so each
/// external probe happens at most once per run.
pub struct Resolver<'a, D: Discovery + ?Sized> {
    discovery: &'a D,
    os: OsRelease,
    adapters: Vec<&'a HbaDescriptor>,
    sata_ports: Option<Vec<PathBuf>>,
    raid: HashMap<PciAddress, RaidDisks>,
}

impl<'a, D: Discovery + ?Sized> Resolver<'a, D> {
    /// Create a resolver for `inventory`
    pub fn new(discovery: &'a D, inventory: &'a InventoryDescriptor) -> Self {
        let adapters = inventory
            .hbas
            .iter()
            .filter(|hba| {
                let known = hba.family().is_some();
                if !known {
                    warn!("Ignoring unrecognised adapter {hba}");
                }
                known
            })
            .sorted_by_key(|hba| hba.bus_address)
            .collect::<Vec<_>>();

        debug!(
            "Recognised adapters: [{}]",
            adapters.iter().map(ToString::to_string).join(", ")
        );

        Self {
            discovery,
            os: inventory.os(),
            adapters,
            sata_ports: None,
            raid: HashMap::new(),
        }
    }

    /// Recognised adapters, in bus address order
    pub fn adapters(&self) -> &[&'a HbaDescriptor] {
        &self.adapters
    }

    /// The `index`-th installed adapter admitted by `class`, in bus address order
    pub fn adapter(&self, class: AdapterClass, index: usize) -> Option<&'a HbaDescriptor> {
        self.adapters
            .iter()
            .filter(|hba| hba.family().is_some_and(|f| class.admits(f)))
            .nth(index)
            .copied()
    }

    /// Pick the strategy for a templated locator given the installed adapters.
    ///
    /// A phy on an adapter that turns out to be a RAID controller is addressed
    /// through the firmware's virtual disks instead.
    pub fn select(&self, locator: Locator) -> Locator {
        match locator {
            Locator::HbaPort { class, adapter, port }
                if self
                    .adapter(class, adapter)
                    .and_then(|hba| hba.family())
                    .is_some_and(|f| f.is_raid()) =>
            {
                Locator::RaidVirtualDisk {
                    class,
                    adapter,
                    disk: port as usize,
                }
            }
            other => other,
        }
    }

    /// Resolve a single slot
    pub fn resolve(&mut self, slot: &SlotDefinition) -> ResolvedSlot {
        let locator = self.select(slot.locator);
        trace!("{}: {:?}", slot.label, locator);

        let resolution = match locator {
            Locator::HbaPort { class, adapter, port } => self.resolve_hba(class, adapter, port),
            Locator::SataPort { port } => self.resolve_sata(port),
            Locator::RaidVirtualDisk { class, adapter, disk } => self.resolve_raid(class, adapter, disk),
        };

        match &resolution {
            Resolution::Unresolved(reason) => warn!("Bay {} unresolved: {reason}", slot.label),
            Resolution::Sentinel(path) => warn!("Bay {} has no physical mapping, using {path}", slot.label),
            Resolution::Path(path) => trace!("Bay {} -> {path}", slot.label),
        }

        ResolvedSlot {
            label: slot.label.clone(),
            resolution,
        }
    }

    fn resolve_hba(&self, class: AdapterClass, adapter: usize, port: u8) -> Resolution {
        let Some(hba) = self.adapter(class, adapter) else {
            return Resolution::Unresolved(Reason::MissingAdapter { class, adapter });
        };

        // Only recognised adapters are kept, so the family is always known here
        let ports = hba.family().map(|f| f.ports()).unwrap_or_default();
        if port >= ports {
            return Resolution::Unresolved(Reason::PortOutOfRange {
                adapter: hba.bus_address,
                port,
            });
        }

        Resolution::Path(sas_phy_path(&hba.bus_address, port).display().to_string())
    }

    fn resolve_sata(&mut self, port: usize) -> Resolution {
        if self.sata_ports.is_none() {
            self.sata_ports = Some(self.discover_sata_ports());
        }

        match self.sata_ports.as_ref().and_then(|ports| ports.get(port)) {
            Some(path) => Resolution::Path(path.display().to_string()),
            None => Resolution::Unresolved(Reason::MissingSataPort { port }),
        }
    }

    fn resolve_raid(&mut self, class: AdapterClass, adapter: usize, disk: usize) -> Resolution {
        let Some(hba) = self.adapter(class, adapter) else {
            return Resolution::Unresolved(Reason::MissingAdapter { class, adapter });
        };

        let discovery = self.discovery;
        let disks = self.raid.entry(hba.bus_address).or_insert_with(|| {
            match discovery.query_raid_virtual_disks(hba) {
                Ok(ids) if !ids.is_empty() => {
                    debug!("{hba} reports {} virtual disks", ids.len());
                    RaidDisks::Reported(ids)
                }
                Ok(_) => {
                    warn!("{hba} reports no virtual disks, substituting sentinels");
                    RaidDisks::Sentinel
                }
                Err(e) => {
                    warn!("Cannot query RAID firmware of {hba}: {e}, substituting sentinels");
                    RaidDisks::Sentinel
                }
            }
        });

        let missing = || {
            Resolution::Unresolved(Reason::MissingVirtualDisk {
                adapter: hba.bus_address,
                disk,
            })
        };

        match disks {
            RaidDisks::Reported(ids) => match ids.get(disk) {
                Some(id) => Resolution::Path(raid_disk_path(&hba.bus_address, id).display().to_string()),
                None => missing(),
            },
            RaidDisks::Sentinel if disk < RAID_SENTINEL_LEN => {
                Resolution::Sentinel(raid_disk_path(&hba.bus_address, RAID_SENTINEL_ID).display().to_string())
            }
            RaidDisks::Sentinel => missing(),
        }
    }

    /// SATA controller addresses, preferring direct enumeration unless the OS
    /// release is known to report it unreliably
    fn sata_controllers(&self) -> Vec<PciAddress> {
        if self.os.is_legacy_el7() {
            debug!("{} {} needs the PCI listing for SATA controllers", self.os.name, self.os.version_id);
        } else {
            match self.discovery.enumerate_sata_controller_addresses() {
                Ok(found) if !found.is_empty() => return found.into_iter().sorted().dedup().collect(),
                Ok(_) => debug!("No SATA controllers enumerated, trying the PCI listing"),
                Err(e) => warn!("SATA controller enumeration failed: {e}, trying the PCI listing"),
            }
        }

        match self.discovery.enumerate_pci_devices() {
            Ok(lines) => sata_controllers_from_listing(&lines),
            Err(e) => {
                warn!("PCI listing failed: {e}");
                Vec::new()
            }
        }
    }

    /// All onboard ATA ports as one sequence: controllers by address, ports by number
    fn discover_sata_ports(&self) -> Vec<PathBuf> {
        let controllers = self.sata_controllers();
        debug!(
            "SATA controllers: [{}]",
            controllers.iter().map(ToString::to_string).join(", ")
        );

        let mut ports = Vec::new();
        for controller in controllers {
            match self.discovery.enumerate_ata_port_paths(&controller) {
                Ok(paths) => {
                    trace!("{controller}: {} ATA ports", paths.len());
                    ports.extend(
                        paths
                            .into_iter()
                            .sorted_by_key(|p| (ata_port_number(p).unwrap_or(u32::MAX), p.clone())),
                    );
                }
                Err(e) => warn!("Cannot list ATA ports of {controller}: {e}"),
            }
        }
        ports
    }
}

/// Extract SATA controller addresses from an `lspci` listing
pub fn sata_controllers_from_listing<S: AsRef<str>>(lines: &[S]) -> Vec<PciAddress> {
    let pattern = SATA_LISTING.get_or_init(|| {
        Regex::new(r"(?i)^\s*(\S+)\s+.*\bsata controller\b").expect("Failed to initialise known-working regex")
    });
    lines
        .iter()
        .filter_map(|line| {
            let captures = pattern.captures(line.as_ref())?;
            captures[1].parse::<PciAddress>().ok()
        })
        .sorted()
        .dedup()
        .collect()
}

#[cfg(test)]
mod tests {
    use hardware::fixture::FixtureDiscovery;
    use test_log::test;

    use super::*;

    fn addr(s: &str) -> PciAddress {
        s.parse().unwrap()
    }

    fn inventory(hbas: &[(&str, &str)]) -> InventoryDescriptor {
        InventoryDescriptor {
            motherboard: Default::default(),
            hbas: hbas.iter().map(|(m, a)| HbaDescriptor::new(*m, addr(a))).collect(),
            chassis_size: "S45".into(),
            alias_style: "STORINATOR".into(),
            os_name: "Rocky Linux".into(),
            os_version_id: "9".into(),
            hybrid: false,
            vm: false,
            edit_mode: false,
        }
    }

    fn phy(adapter: usize, port: u8) -> Locator {
        Locator::HbaPort {
            class: AdapterClass::Any,
            adapter,
            port,
        }
    }

    fn virtual_disk(adapter: usize, disk: usize) -> Locator {
        Locator::RaidVirtualDisk {
            class: AdapterClass::Any,
            adapter,
            disk,
        }
    }

    fn slot(label: &str, locator: Locator) -> SlotDefinition {
        SlotDefinition {
            label: label.into(),
            locator,
        }
    }

    #[test]
    fn test_adapters_sorted_and_filtered() {
        let inv = inventory(&[
            ("SAS9305-24i", "0000:03:00.0"),
            ("Mystery RAID 1000", "0000:00:05.0"),
            ("SAS9305-16i", "0000:01:00.0"),
        ]);
        let discovery = FixtureDiscovery::new();
        let resolver = Resolver::new(&discovery, &inv);
        let order = resolver.adapters().iter().map(|h| h.model.as_str()).collect::<Vec<_>>();
        assert_eq!(order, vec!["SAS9305-16i", "SAS9305-24i"]);
    }

    #[test]
    fn test_hba_port() {
        let inv = inventory(&[("SAS9305-16i", "0000:01:00.0")]);
        let discovery = FixtureDiscovery::new();
        let mut resolver = Resolver::new(&discovery, &inv);

        let ok = resolver.resolve(&slot("1-3", phy(0, 2)));
        assert_eq!(ok.target(), Some("/dev/disk/by-path/pci-0000:01:00.0-sas-phy2-lun-0"));

        let missing = resolver.resolve(&slot("2-1", phy(1, 0)));
        assert_eq!(
            missing.resolution,
            Resolution::Unresolved(Reason::MissingAdapter {
                class: AdapterClass::Any,
                adapter: 1
            })
        );

        // 23 bays on a 16 port card
        let short = resolver.resolve(&slot("1-20", phy(0, 19)));
        assert!(matches!(short.resolution, Resolution::Unresolved(Reason::PortOutOfRange { .. })));
    }

    #[test]
    fn test_raid_selection() {
        let inv = inventory(&[("9361-24i", "0000:32:00.0"), ("SAS9305-24i", "0000:33:00.0")]);
        let discovery = FixtureDiscovery::new();
        let resolver = Resolver::new(&discovery, &inv);
        assert_eq!(resolver.select(phy(0, 4)), virtual_disk(0, 4));
        assert_eq!(resolver.select(phy(1, 4)), phy(1, 4));

        // Indices count within the class, so the RAID card is the first 24 port adapter
        let first_24 = Locator::HbaPort {
            class: AdapterClass::Ports(24),
            adapter: 0,
            port: 4,
        };
        assert_eq!(
            resolver.select(first_24),
            Locator::RaidVirtualDisk {
                class: AdapterClass::Ports(24),
                adapter: 0,
                disk: 4
            }
        );
    }

    #[test]
    fn test_adapter_class_ignores_bus_position() {
        // The 24 port card sits below the 16 port card on the bus
        let inv = inventory(&[("SAS9305-24i", "0000:01:00.0"), ("SAS9305-16i", "0000:02:00.0")]);
        let discovery = FixtureDiscovery::new();
        let mut resolver = Resolver::new(&discovery, &inv);

        let sixteen = Locator::HbaPort {
            class: AdapterClass::Ports(16),
            adapter: 0,
            port: 14,
        };
        let twenty_four = Locator::HbaPort {
            class: AdapterClass::Ports(24),
            adapter: 0,
            port: 22,
        };
        assert_eq!(
            resolver.resolve(&slot("1-15", sixteen)).target(),
            Some("/dev/disk/by-path/pci-0000:02:00.0-sas-phy14-lun-0")
        );
        assert_eq!(
            resolver.resolve(&slot("2-23", twenty_four)).target(),
            Some("/dev/disk/by-path/pci-0000:01:00.0-sas-phy22-lun-0")
        );

        let second_24 = Locator::HbaPort {
            class: AdapterClass::Ports(24),
            adapter: 1,
            port: 0,
        };
        assert_eq!(
            resolver.resolve(&slot("3-1", second_24)).resolution,
            Resolution::Unresolved(Reason::MissingAdapter {
                class: AdapterClass::Ports(24),
                adapter: 1
            })
        );
    }

    #[test]
    fn test_raid_reported_order() {
        let inv = inventory(&[("9361-16i", "0000:31:00.0")]);
        let discovery = FixtureDiscovery::new().with_raid_disks(addr("0000:31:00.0"), ["17", "4", "9"]);
        let mut resolver = Resolver::new(&discovery, &inv);

        let first = resolver.resolve(&slot("1-1", phy(0, 0)));
        assert_eq!(first.target(), Some("/dev/disk/by-path/pci-0000:31:00.0-scsi-0:0:17:0"));
        let third = resolver.resolve(&slot("1-3", phy(0, 2)));
        assert_eq!(third.target(), Some("/dev/disk/by-path/pci-0000:31:00.0-scsi-0:0:9:0"));
        let fourth = resolver.resolve(&slot("1-4", phy(0, 3)));
        assert!(matches!(
            fourth.resolution,
            Resolution::Unresolved(Reason::MissingVirtualDisk { disk: 3, .. })
        ));
    }

    #[test]
    fn test_raid_sentinel() {
        let inv = inventory(&[("9361-16i", "0000:34:00.0")]);
        let discovery = FixtureDiscovery::new();
        let mut resolver = Resolver::new(&discovery, &inv);

        let sentinel = "/dev/disk/by-path/pci-0000:34:00.0-scsi-0:0:99:0".to_owned();
        for disk in 0..RAID_SENTINEL_LEN {
            let resolved = resolver.resolve(&slot("1-1", virtual_disk(0, disk)));
            assert_eq!(resolved.resolution, Resolution::Sentinel(sentinel.clone()));
        }
        let beyond = resolver.resolve(&slot("1-25", virtual_disk(0, RAID_SENTINEL_LEN)));
        assert!(matches!(beyond.resolution, Resolution::Unresolved(_)));
    }

    #[test]
    fn test_sata_concatenates_controllers() {
        let inv = inventory(&[]);
        let discovery = FixtureDiscovery::new()
            .with_sata_addresses([addr("0000:49:00.0"), addr("0000:48:00.0")])
            .with_ata_paths(
                addr("0000:48:00.0"),
                [
                    "/dev/disk/by-path/pci-0000:48:00.0-ata-10",
                    "/dev/disk/by-path/pci-0000:48:00.0-ata-2",
                ],
            )
            .with_ata_paths(addr("0000:49:00.0"), ["/dev/disk/by-path/pci-0000:49:00.0-ata-1"]);
        let mut resolver = Resolver::new(&discovery, &inv);

        let targets = (0..4)
            .map(|port| {
                resolver
                    .resolve(&slot("x", Locator::SataPort { port }))
                    .target()
                    .map(str::to_owned)
            })
            .collect::<Vec<_>>();
        assert_eq!(
            targets,
            vec![
                Some("/dev/disk/by-path/pci-0000:48:00.0-ata-2".to_owned()),
                Some("/dev/disk/by-path/pci-0000:48:00.0-ata-10".to_owned()),
                Some("/dev/disk/by-path/pci-0000:49:00.0-ata-1".to_owned()),
                None,
            ]
        );
    }

    #[test]
    fn test_sata_listing_fallback_on_failure() {
        let inv = inventory(&[]);
        let discovery = FixtureDiscovery::new()
            .with_failing_sata_addresses()
            .with_pci_lines(["00:17.0 SATA controller: Intel Corporation C620 Series AHCI"])
            .with_ata_paths(addr("0000:00:17.0"), ["/dev/disk/by-path/pci-0000:00:17.0-ata-1"]);
        let mut resolver = Resolver::new(&discovery, &inv);
        let resolved = resolver.resolve(&slot("1-1", Locator::SataPort { port: 0 }));
        assert_eq!(resolved.target(), Some("/dev/disk/by-path/pci-0000:00:17.0-ata-1"));
    }

    #[test]
    fn test_legacy_os_prefers_listing() {
        let mut inv = inventory(&[]);
        inv.os_name = "CentOS Linux".into();
        inv.os_version_id = "7".into();

        let discovery = FixtureDiscovery::new()
            .with_sata_addresses([addr("0000:10:00.0")])
            .with_pci_lines(["00:17.0 Intel Corporation SATA Controller"])
            .with_ata_paths(addr("0000:10:00.0"), ["/dev/disk/by-path/pci-0000:10:00.0-ata-1"])
            .with_ata_paths(addr("0000:00:17.0"), ["/dev/disk/by-path/pci-0000:00:17.0-ata-1"]);

        let mut legacy = Resolver::new(&discovery, &inv);
        let resolved = legacy.resolve(&slot("1-1", Locator::SataPort { port: 0 }));
        assert_eq!(resolved.target(), Some("/dev/disk/by-path/pci-0000:00:17.0-ata-1"));

        let modern_inv = inventory(&[]);
        let mut modern = Resolver::new(&discovery, &modern_inv);
        let resolved = modern.resolve(&slot("1-1", Locator::SataPort { port: 0 }));
        assert_eq!(resolved.target(), Some("/dev/disk/by-path/pci-0000:10:00.0-ata-1"));
    }

    #[test]
    fn test_listing_parse() {
        let lines = [
            "00:17.0 Intel Corporation SATA Controller",
            "05:00.0 Broadcom / LSI SAS3008 PCI-Express Fusion-MPT SAS-3",
            "0000:41:00.0 SATA controller: Advanced Micro Devices FCH SATA Controller [AHCI mode]",
            "00:1f.2 SATA controller: Intel Corporation 8 Series/C220 Series Chipset",
            "garbage SATA controller",
        ];
        assert_eq!(
            sata_controllers_from_listing(&lines),
            vec![addr("0000:00:17.0"), addr("0000:00:1f.2"), addr("0000:41:00.0")]
        );
        assert!(sata_controllers_from_listing::<&str>(&[]).is_empty());
    }
}

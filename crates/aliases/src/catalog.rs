// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Static alias templates, keyed by alias style and chassis size.
//!
//! A template is a list of rows. Each row is one "card" in the bay labels
//! (`<row>-<bay>`, both counted from 1) and is wired either to one adapter, where
//! bay N sits on phy N-1, or to the onboard SATA ports, which are numbered
//! continuously across all SATA rows of the template.
//!
//! Hybrid chassis mix 16 and 24 port cards. Their rows name the port class they
//! expect, and adapter N of a row means the Nth installed adapter of that class.

use std::fmt;

use hardware::AdapterFamily;
use itertools::Itertools;

/// Naming convention / product line selecting the template family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AliasStyle {
    Storinator,
    StorinatorUbm,
    H16,
    H32,
    Homelab,
    Professional,
    Studio,
    Stornado,
    Stornado2U,
    F2Stornado,
    Av15Base,
    Destroyinator,
    F8,
    ByPath,
}

/// Enclosure model, determining bay count and layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChassisSize {
    Av15,
    Q30,
    S45,
    Xl60,
    F32,
    C8,
    Mi4,
    Mi4Ubm,
    C8Ubm,
    Hl15,
    Hl15Beast,
    Hl4,
    Hl8,
    Pro15,
    Pro4,
    Pro8,
    Studio8,
    TwoU,
    F2,
    Vm2,
    Vm8,
    Vm16,
    Vm32,
    F8X1,
    F8X2,
    F8X3,
}

/// Map of alias style codes
static STYLES: phf::Map<&'static str, AliasStyle> = phf::phf_map! {
    "STORINATOR" => AliasStyle::Storinator,
    "STORINATORUBM" => AliasStyle::StorinatorUbm,
    "H16" => AliasStyle::H16,
    "H32" => AliasStyle::H32,
    "HOMELAB" => AliasStyle::Homelab,
    "PROFESSIONAL" => AliasStyle::Professional,
    "STUDIO" => AliasStyle::Studio,
    "STORNADO" => AliasStyle::Stornado,
    "2USTORNADO" => AliasStyle::Stornado2U,
    "F2STORNADO" => AliasStyle::F2Stornado,
    "AV15-BASE" => AliasStyle::Av15Base,
    "DESTROYINATOR" => AliasStyle::Destroyinator,
    "F8" => AliasStyle::F8,
    "BYPATH" => AliasStyle::ByPath,
};

/// Map of chassis size codes
static CHASSIS: phf::Map<&'static str, ChassisSize> = phf::phf_map! {
    "AV15" => ChassisSize::Av15,
    "Q30" => ChassisSize::Q30,
    "S45" => ChassisSize::S45,
    "XL60" => ChassisSize::Xl60,
    "F32" => ChassisSize::F32,
    "C8" => ChassisSize::C8,
    "MI4" => ChassisSize::Mi4,
    "MI4_UBM" => ChassisSize::Mi4Ubm,
    "C8_UBM" => ChassisSize::C8Ubm,
    "HL15" => ChassisSize::Hl15,
    "HL15_BEAST" => ChassisSize::Hl15Beast,
    "HL4" => ChassisSize::Hl4,
    "HL8" => ChassisSize::Hl8,
    "PRO15" => ChassisSize::Pro15,
    "PRO4" => ChassisSize::Pro4,
    "PRO8" => ChassisSize::Pro8,
    "STUDIO8" => ChassisSize::Studio8,
    "2U" => ChassisSize::TwoU,
    "F2" => ChassisSize::F2,
    "VM2" => ChassisSize::Vm2,
    "VM8" => ChassisSize::Vm8,
    "VM16" => ChassisSize::Vm16,
    "VM32" => ChassisSize::Vm32,
    "F8X1" => ChassisSize::F8X1,
    "F8X2" => ChassisSize::F8X2,
    "F8X3" => ChassisSize::F8X3,
};

impl AliasStyle {
    /// Look up a style by its exact (case-sensitive) code
    pub fn from_code(code: &str) -> Option<Self> {
        STYLES.get(code).copied()
    }

    /// The inventory code for this style
    pub fn code(&self) -> &'static str {
        STYLES
            .entries()
            .find(|(_, v)| *v == self)
            .map(|(k, _)| *k)
            .unwrap_or("?")
    }

    /// Every known style
    pub fn all() -> impl Iterator<Item = Self> {
        STYLES.values().copied().sorted()
    }
}

impl ChassisSize {
    /// Look up a chassis by its exact (case-sensitive) code
    pub fn from_code(code: &str) -> Option<Self> {
        CHASSIS.get(code).copied()
    }

    /// The inventory code for this chassis
    pub fn code(&self) -> &'static str {
        CHASSIS
            .entries()
            .find(|(_, v)| *v == self)
            .map(|(k, _)| *k)
            .unwrap_or("?")
    }

    /// Every known chassis
    pub fn all() -> impl Iterator<Item = Self> {
        CHASSIS.values().copied().sorted()
    }
}

impl fmt::Display for AliasStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl fmt::Display for ChassisSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Which installed adapters a template row may be wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterClass {
    /// Any recognised adapter
    Any,
    /// Adapters exposing exactly this many phys
    Ports(u8),
}

impl AdapterClass {
    /// Whether an adapter of `family` belongs to this class
    pub fn admits(&self, family: AdapterFamily) -> bool {
        match self {
            AdapterClass::Any => true,
            AdapterClass::Ports(ports) => family.ports() == *ports,
        }
    }
}

impl fmt::Display for AdapterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterClass::Any => f.write_str("adapter"),
            AdapterClass::Ports(ports) => write!(f, "{ports}-port adapter"),
        }
    }
}

/// Where a templated bay physically lives.
///
/// `adapter` counts, by bus address, only the installed adapters admitted by `class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// Phy `port` on an adapter
    HbaPort {
        class: AdapterClass,
        adapter: usize,
        port: u8,
    },
    /// The `port`-th onboard ATA port across all SATA controllers
    SataPort { port: usize },
    /// The `disk`-th virtual disk reported by an adapter's RAID firmware
    RaidVirtualDisk {
        class: AdapterClass,
        adapter: usize,
        disk: usize,
    },
}

/// One bay of a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDefinition {
    /// Bay label, e.g. "1-15"
    pub label: String,
    pub locator: Locator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    Hba {
        class: AdapterClass,
        adapter: usize,
        bays: u8,
    },
    Sata {
        bays: u8,
    },
}

const fn hba(adapter: usize, bays: u8) -> Row {
    Row::Hba {
        class: AdapterClass::Any,
        adapter,
        bays,
    }
}

const fn hba16(adapter: usize, bays: u8) -> Row {
    Row::Hba {
        class: AdapterClass::Ports(16),
        adapter,
        bays,
    }
}

const fn hba24(adapter: usize, bays: u8) -> Row {
    Row::Hba {
        class: AdapterClass::Ports(24),
        adapter,
        bays,
    }
}

const fn sata(bays: u8) -> Row {
    Row::Sata { bays }
}

impl Row {
    fn bays(&self) -> usize {
        match self {
            Row::Hba { bays, .. } | Row::Sata { bays } => *bays as usize,
        }
    }
}

/// Ordered bay layout for one (style, chassis) pair
#[derive(Debug, PartialEq, Eq)]
pub struct Template {
    rows: &'static [Row],
    /// Layout used instead when no adapter is installed
    onboard: Option<&'static [Row]>,
}

impl Template {
    /// Whether an onboard-only layout exists for hosts without adapters
    pub fn has_onboard(&self) -> bool {
        self.onboard.is_some()
    }

    /// Expand the template into its slot definitions, in bay order.
    ///
    /// `onboard` selects the adapter-less layout where one exists.
    pub fn slots(&self, onboard: bool) -> Vec<SlotDefinition> {
        let rows = match (onboard, self.onboard) {
            (true, Some(rows)) => rows,
            _ => self.rows,
        };

        let mut sata_port = 0;
        let mut slots = Vec::with_capacity(rows.iter().map(Row::bays).sum());
        for (card, row) in rows.iter().enumerate() {
            for bay in 0..row.bays() {
                let locator = match row {
                    Row::Hba { class, adapter, .. } => Locator::HbaPort {
                        class: *class,
                        adapter: *adapter,
                        port: bay as u8,
                    },
                    Row::Sata { .. } => {
                        sata_port += 1;
                        Locator::SataPort { port: sata_port - 1 }
                    }
                };
                slots.push(SlotDefinition {
                    label: format!("{}-{}", card + 1, bay + 1),
                    locator,
                });
            }
        }
        slots
    }

    /// Adapter class of each adapter row, in row order
    pub fn adapter_classes(&self) -> Vec<AdapterClass> {
        self.rows
            .iter()
            .filter_map(|row| match row {
                Row::Hba { class, .. } => Some(*class),
                Row::Sata { .. } => None,
            })
            .collect()
    }

    /// Number of bays per row
    pub fn row_lengths(&self) -> Vec<usize> {
        self.rows.iter().map(Row::bays).collect()
    }

    /// Total number of bays
    pub fn bay_count(&self) -> usize {
        self.rows.iter().map(Row::bays).sum()
    }
}

static X15_1: Template = Template { rows: &[hba(0, 15)], onboard: None };
static X15_2: Template = Template { rows: &[hba(0, 15), hba(1, 15)], onboard: None };
static X15_3: Template = Template { rows: &[hba(0, 15), hba(1, 15), hba(2, 15)], onboard: None };
static X15_4: Template = Template { rows: &[hba(0, 15), hba(1, 15), hba(2, 15), hba(3, 15)], onboard: None };
static X16_2: Template = Template { rows: &[hba(0, 16), hba(1, 16)], onboard: None };
static X16_4: Template = Template { rows: &[hba(0, 16), hba(1, 16), hba(2, 16), hba(3, 16)], onboard: None };
static X8_1: Template = Template { rows: &[hba(0, 8)], onboard: None };
static X8_2: Template = Template { rows: &[hba(0, 8), hba(1, 8)], onboard: None };
static X8_3: Template = Template { rows: &[hba(0, 8), hba(1, 8), hba(2, 8)], onboard: None };

static MI4: Template = Template {
    rows: &[hba(0, 4)],
    onboard: Some(&[sata(4)]),
};
static C8_UBM: Template = Template {
    rows: &[hba(0, 8)],
    onboard: Some(&[sata(8)]),
};

static H16_AV15: Template = Template { rows: &[hba24(0, 23)], onboard: None };
static H16_Q30: Template = Template { rows: &[hba16(0, 15), hba24(0, 23)], onboard: None };
static H16_S45: Template = Template {
    rows: &[hba16(0, 15), hba16(1, 15), hba24(0, 23)],
    onboard: None,
};
static H16_XL60: Template = Template {
    rows: &[hba16(0, 15), hba16(1, 15), hba16(2, 15), hba24(0, 23)],
    onboard: None,
};

static H32_Q30: Template = Template { rows: &[hba24(0, 23), hba24(1, 23)], onboard: None };
static H32_S45: Template = Template {
    rows: &[hba16(0, 15), hba24(0, 23), hba24(1, 23)],
    onboard: None,
};
static H32_XL60: Template = Template {
    rows: &[hba16(0, 15), hba16(1, 15), hba24(0, 23), hba24(1, 23)],
    onboard: None,
};

static HL15_BEAST: Template = Template { rows: &[hba(0, 15), sata(4)], onboard: None };
static VM32: Template = Template { rows: &[hba(0, 11), hba(1, 11), hba(2, 10)], onboard: None };

static SATA_2: Template = Template { rows: &[sata(2)], onboard: None };
static SATA_4: Template = Template { rows: &[sata(4)], onboard: None };
static SATA_8: Template = Template { rows: &[sata(8)], onboard: None };
static SATA_15: Template = Template { rows: &[sata(15)], onboard: None };

/// Find the template for a (style, chassis) pair
pub fn lookup(style: AliasStyle, chassis: ChassisSize) -> Option<&'static Template> {
    use AliasStyle as S;
    use ChassisSize as C;

    let template = match (style, chassis) {
        (S::Storinator | S::Destroyinator, C::Av15) => &X15_1,
        (S::Storinator | S::Destroyinator, C::Q30) => &X15_2,
        (S::Storinator | S::Destroyinator, C::S45) => &X15_3,
        (S::Storinator | S::Destroyinator, C::Xl60) => &X15_4,
        (S::Storinator, C::F32) => &X16_2,
        (S::Storinator, C::C8) => &X8_1,
        (S::Storinator, C::Mi4) => &MI4,

        (S::StorinatorUbm, C::Mi4Ubm) => &MI4,
        (S::StorinatorUbm, C::C8Ubm) => &C8_UBM,

        (S::H16, C::Av15) => &H16_AV15,
        (S::H16, C::Q30) => &H16_Q30,
        (S::H16, C::S45) => &H16_S45,
        (S::H16, C::Xl60) => &H16_XL60,

        (S::H32, C::Q30) => &H32_Q30,
        (S::H32, C::S45) => &H32_S45,
        (S::H32, C::Xl60) => &H32_XL60,

        (S::Homelab, C::Hl15) => &X15_1,
        (S::Homelab, C::Hl15Beast) => &HL15_BEAST,
        (S::Homelab, C::Hl4) => &SATA_4,
        (S::Homelab, C::Hl8) => &SATA_8,

        (S::Professional, C::Pro15) => &X15_1,
        (S::Professional, C::Pro4) => &SATA_4,
        (S::Professional, C::Pro8) => &SATA_8,
        (S::Studio, C::Studio8) => &SATA_8,

        (S::Stornado, C::Av15 | C::F32) => &X16_2,
        (S::Stornado2U, C::TwoU) => &X16_2,

        (S::F2Stornado, C::F2) => &X16_4,
        (S::F2Stornado, C::Vm8) => &X8_1,
        (S::F2Stornado, C::Vm16) => &X8_2,
        (S::F2Stornado, C::Vm32) => &VM32,

        (S::Av15Base, C::Av15) => &SATA_15,

        (S::F8, C::F8X1) => &X8_1,
        (S::F8, C::F8X2) => &X8_2,
        (S::F8, C::F8X3) => &X8_3,

        (S::ByPath, C::Vm2) => &SATA_2,

        _ => return None,
    };

    Some(template)
}

/// Find the template for a pair of inventory codes.
///
/// Unknown codes are simply "no mapping".
pub fn lookup_codes(style: &str, chassis: &str) -> Option<&'static Template> {
    lookup(AliasStyle::from_code(style)?, ChassisSize::from_code(chassis)?)
}

/// Bays per row for a pair of inventory codes, as drive-map renderers lay them out
pub fn row_lengths(style: &str, chassis: &str) -> Option<Vec<usize>> {
    lookup_codes(style, chassis).map(Template::row_lengths)
}

/// Every catalogued (style, chassis) pair with its template
pub fn entries() -> impl Iterator<Item = (AliasStyle, ChassisSize, &'static Template)> {
    AliasStyle::all()
        .cartesian_product(ChassisSize::all().collect_vec())
        .filter_map(|(style, chassis)| Some((style, chassis, lookup(style, chassis)?)))
}

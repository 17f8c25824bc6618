// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Drive-bay aliases for storage servers
//!
//! Given an inventory of the server, the [`catalog`] supplies the bay layout for
//! its chassis, the [`Resolver`] maps each bay onto a device path through
//! [`hardware::Discovery`], and the result is rendered as an [`AliasSet`].

pub mod catalog;
pub use catalog::{AdapterClass, AliasStyle, ChassisSize, Locator, SlotDefinition, Template};

mod composer;
pub use composer::{AliasLine, AliasSet};

mod errors;
pub use errors::*;

mod inventory;
pub use inventory::{InventoryDescriptor, Motherboard, OsRelease};

mod orchestrator;
pub use orchestrator::generate;

mod resolver;
pub use resolver::{
    sata_controllers_from_listing, Reason, Resolution, ResolvedSlot, Resolver, RAID_SENTINEL_ID, RAID_SENTINEL_LEN,
};

// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use hardware::Discovery;
use log::{debug, info};

use crate::{catalog, AliasSet, AliasStyle, ChassisSize, Error, InventoryDescriptor, Resolution, Resolver};

/// Generate the alias set for `inventory`, probing hardware through `discovery`.
///
/// Returns `Ok(None)` when the style or chassis has no catalogued layout. Only a
/// structurally broken inventory is an error; bays whose hardware cannot be found
/// are left out of the set.
pub fn generate<D>(inventory: &InventoryDescriptor, discovery: &D) -> Result<Option<AliasSet>, Error>
where
    D: Discovery + ?Sized,
{
    inventory.validate()?;

    let (Some(style), Some(chassis)) = (
        AliasStyle::from_code(&inventory.alias_style),
        ChassisSize::from_code(&inventory.chassis_size),
    ) else {
        info!(
            "No layout for style {:?} chassis {:?}",
            inventory.alias_style, inventory.chassis_size
        );
        return Ok(None);
    };

    let Some(template) = catalog::lookup(style, chassis) else {
        info!("{style} does not come in a {chassis} chassis");
        return Ok(None);
    };

    debug!(
        "{style} {chassis}: hybrid={} vm={} edit={}",
        inventory.hybrid, inventory.vm, inventory.edit_mode
    );

    let mut resolver = Resolver::new(discovery, inventory);
    let onboard = template.has_onboard() && resolver.adapters().is_empty();
    if onboard {
        debug!("No adapters installed, using the onboard layout");
    }

    let resolved = template
        .slots(onboard)
        .iter()
        .map(|slot| resolver.resolve(slot))
        .collect::<Vec<_>>();

    let unresolved = resolved
        .iter()
        .filter(|s| matches!(s.resolution, Resolution::Unresolved(_)))
        .count();
    let sentinels = resolved
        .iter()
        .filter(|s| matches!(s.resolution, Resolution::Sentinel(_)))
        .count();

    let aliases = AliasSet::compose(resolved);
    info!(
        "{style} {chassis}: {} aliases ({sentinels} placeholders, {unresolved} bays unresolved)",
        aliases.len()
    );

    Ok(Some(aliases))
}

// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::{
    env, fs,
    io::{self, Read},
};

use log::{debug, info, warn};
use miette::IntoDiagnostic;

use aliases::InventoryDescriptor;
use hardware::{fixture::FixtureDiscovery, Discovery, SystemDiscovery};

/// Reads the inventory record from the file named on the command line, or stdin
fn read_inventory() -> miette::Result<String> {
    match env::args().nth(1) {
        Some(path) => {
            debug!("Reading inventory from {path}");
            fs::read_to_string(path).into_diagnostic()
        }
        None => {
            debug!("Reading inventory from stdin");
            let mut json = String::new();
            io::stdin().read_to_string(&mut json).into_diagnostic()?;
            Ok(json)
        }
    }
}

fn main() -> miette::Result<()> {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let inventory = InventoryDescriptor::from_json(&read_inventory()?)?;
    info!(
        "Generating aliases for {} {} with {} adapters",
        inventory.alias_style,
        inventory.chassis_size,
        inventory.hbas.len()
    );

    // Canned answers from the environment stand in for live probing
    let discovery: Box<dyn Discovery> = match FixtureDiscovery::from_env().into_diagnostic()? {
        Some(fixture) => {
            info!("Using discovery fixture from the environment");
            Box::new(fixture)
        }
        None => Box::new(SystemDiscovery::new()),
    };

    match aliases::generate(&inventory, discovery.as_ref())? {
        Some(set) => {
            if set.is_empty() {
                warn!("No bays could be mapped");
            }
            print!("{set}");
        }
        None => warn!("No alias layout for this server"),
    }

    Ok(())
}

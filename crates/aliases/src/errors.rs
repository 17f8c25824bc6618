// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use hardware::PciAddress;
use miette::Diagnostic;
use thiserror::Error;

/// Error type for the aliases crate
///
/// Only structurally broken inventories end up here. Hardware that cannot be
/// found degrades individual bays instead.
#[derive(Diagnostic, Debug, Error)]
pub enum Error {
    #[error("invalid inventory record: {0}")]
    #[diagnostic(help("the record must be a JSON object in server-info format"))]
    Json(#[from] serde_json::Error),

    #[diagnostic(transparent)]
    #[error(transparent)]
    MissingField(#[from] MissingField),

    #[diagnostic(transparent)]
    #[error(transparent)]
    DuplicateBusAddress(#[from] DuplicateBusAddress),

    #[diagnostic(transparent)]
    #[error(transparent)]
    MissingModel(#[from] MissingModel),
}

/// Error for mandatory inventory fields left empty
#[derive(Debug, Diagnostic, Error)]
#[error("missing inventory field: {id}")]
#[diagnostic(severity(error))]
pub struct MissingField {
    pub id: &'static str,

    #[help]
    pub advice: Option<String>,
}

/// Error for two adapters claiming the same PCI address
#[derive(Debug, Diagnostic, Error)]
#[error("duplicate adapter bus address: {address}")]
#[diagnostic(severity(error))]
pub struct DuplicateBusAddress {
    pub address: PciAddress,

    #[help]
    pub advice: Option<String>,
}

/// Error for adapters listed without a model name
#[derive(Debug, Diagnostic, Error)]
#[error("adapter at {address} has no model")]
#[diagnostic(severity(error))]
pub struct MissingModel {
    pub address: PciAddress,
}

// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Parsing of the JSON emitted by the MegaRAID `storcli` utility
//!
//! Two replies are combined: `/call show J` tells us which controller index sits
//! at which PCI address, `/call/eall/sall show J` lists the drives (and their
//! device ids) behind each controller.

use serde::Deserialize;
use serde_json::Value;

use crate::{Error, PciAddress};

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(rename = "Controllers", default)]
    controllers: Vec<ControllerReply>,
}

#[derive(Debug, Deserialize)]
struct ControllerReply {
    #[serde(rename = "Command Status")]
    status: CommandStatus,
    #[serde(rename = "Response Data", default)]
    response: Value,
}

#[derive(Debug, Deserialize)]
struct CommandStatus {
    #[serde(rename = "Controller")]
    controller: Value,
}

impl ControllerReply {
    fn index(&self) -> Option<u64> {
        match &self.status.controller {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Compare a storcli PCI address (`00:31:00:00` style) against `addr`.
/// The trailing three fields are bus, device and function.
fn matches_address(reported: &str, addr: &PciAddress) -> bool {
    let fields = reported
        .split(':')
        .map(|f| u8::from_str_radix(f.trim(), 16).ok())
        .collect::<Option<Vec<_>>>();
    match fields.as_deref() {
        Some([.., bus, device, function]) => {
            *bus == addr.bus && *device == addr.device && *function == addr.function
        }
        _ => false,
    }
}

// "PCI Address" lives at the top of the response or below "Basics"
fn reported_address(response: &Value) -> Option<&str> {
    response
        .get("PCI Address")
        .or_else(|| response.get("Basics")?.get("PCI Address"))?
        .as_str()
}

/// Find the controller index that `storcli /call show J` reports at `addr`
pub(crate) fn controller_index(show: &str, addr: &PciAddress) -> Result<u64, Error> {
    let reply: Reply = serde_json::from_str(show)?;
    reply
        .controllers
        .iter()
        .find(|c| reported_address(&c.response).is_some_and(|r| matches_address(r, addr)))
        .and_then(ControllerReply::index)
        .ok_or(Error::UnknownController(*addr))
}

/// Extract the drive device ids of `controller` from `storcli /call/eall/sall show J`
pub(crate) fn drive_ids(drives: &str, controller: u64) -> Result<Vec<String>, Error> {
    let reply: Reply = serde_json::from_str(drives)?;
    let entry = reply
        .controllers
        .iter()
        .find(|c| c.index() == Some(controller))
        .ok_or_else(|| Error::Unavailable(format!("no drive listing for controller {controller}")))?;

    let ids = entry
        .response
        .get("Drive Information")
        .and_then(Value::as_array)
        .map(|drives| {
            drives
                .iter()
                .filter_map(|d| match d.get("DID")? {
                    Value::Number(n) => Some(n.to_string()),
                    Value::String(s) => Some(s.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOW: &str = r#"{
        "Controllers": [
            {"Command Status": {"Controller": 0, "Status": "Success"},
             "Response Data": {"Product Name": "AVAGO MegaRAID SAS 9361-16i", "PCI Address": "00:31:00:00"}},
            {"Command Status": {"Controller": 1, "Status": "Success"},
             "Response Data": {"Basics": {"PCI Address": "00:32:00:00"}}}
        ]
    }"#;

    const DRIVES: &str = r#"{
        "Controllers": [
            {"Command Status": {"Controller": 0, "Status": "Success"},
             "Response Data": {"Drive Information": [
                {"EID:Slt": "252:0", "DID": 12},
                {"EID:Slt": "252:1", "DID": 9},
                {"EID:Slt": "252:2", "DID": 31}
             ]}},
            {"Command Status": {"Controller": 1, "Status": "Success"},
             "Response Data": {}}
        ]
    }"#;

    #[test]
    fn test_controller_index() {
        let first: PciAddress = "0000:31:00.0".parse().unwrap();
        let second: PciAddress = "0000:32:00.0".parse().unwrap();
        let missing: PciAddress = "0000:33:00.0".parse().unwrap();
        assert_eq!(controller_index(SHOW, &first).unwrap(), 0);
        assert_eq!(controller_index(SHOW, &second).unwrap(), 1);
        assert!(matches!(
            controller_index(SHOW, &missing),
            Err(Error::UnknownController(_))
        ));
    }

    #[test]
    fn test_drive_ids_in_reported_order() {
        assert_eq!(drive_ids(DRIVES, 0).unwrap(), vec!["12", "9", "31"]);
        assert!(drive_ids(DRIVES, 1).unwrap().is_empty());
        assert!(drive_ids(DRIVES, 4).is_err());
        assert!(drive_ids("not json", 0).is_err());
    }
}

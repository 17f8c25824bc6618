// SPDX-FileCopyrightText: Copyright © 2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Rendering resolved bays as an alias file

use std::{fmt, str::FromStr};

use itertools::Itertools;

use crate::{Resolution, ResolvedSlot};

/// A single `alias <label> <target>` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasLine {
    pub label: String,
    pub target: String,
    /// The target is a RAID placeholder rather than a real device.
    /// Lines read back from a file are never marked.
    pub sentinel: bool,
}

impl AliasLine {
    /// Card component of the label, e.g. "2" for "2-7"
    pub fn card(&self) -> &str {
        self.label.split_once('-').map_or(self.label.as_str(), |(card, _)| card)
    }

    /// Whether the target is a RAID placeholder rather than a real device
    pub fn is_sentinel(&self) -> bool {
        self.sentinel
    }
}

impl fmt::Display for AliasLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alias {} {}", self.label, self.target)
    }
}

/// An ordered set of alias lines, one per resolved bay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasSet {
    lines: Vec<AliasLine>,
}

impl AliasSet {
    /// Build the set from resolved slots, keeping template order and
    /// dropping bays without a target
    pub fn compose(slots: impl IntoIterator<Item = ResolvedSlot>) -> Self {
        let lines = slots
            .into_iter()
            .filter_map(|slot| {
                let (target, sentinel) = match slot.resolution {
                    Resolution::Path(path) => (path, false),
                    Resolution::Sentinel(path) => (path, true),
                    Resolution::Unresolved(_) => return None,
                };
                Some(AliasLine {
                    label: slot.label,
                    target,
                    sentinel,
                })
            })
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[AliasLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines that point at real devices
    pub fn mapped(&self) -> impl Iterator<Item = &AliasLine> {
        self.lines.iter().filter(|line| !line.is_sentinel())
    }

    /// Lines grouped by card, in the order the cards first appear
    pub fn rows(&self) -> Vec<(String, Vec<&AliasLine>)> {
        let chunks = self.lines.iter().chunk_by(|line| line.card().to_owned());
        let rows = chunks
            .into_iter()
            .map(|(card, lines)| (card, lines.collect()))
            .collect();
        rows
    }
}

impl fmt::Display for AliasSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

impl FromStr for AliasSet {
    type Err = std::convert::Infallible;

    /// Parse an existing alias file. Anything other than well-formed alias lines
    /// (comments, blank lines, other directives) is skipped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines = s
            .lines()
            .filter_map(|line| {
                let mut words = line.split_whitespace();
                if words.next()? != "alias" {
                    return None;
                }
                let label = words.next()?;
                let target = words.next()?;
                Some(AliasLine {
                    label: label.to_owned(),
                    target: target.to_owned(),
                    sentinel: false,
                })
            })
            .collect();
        Ok(Self { lines })
    }
}

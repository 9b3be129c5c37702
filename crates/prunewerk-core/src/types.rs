// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Prunewerk resource pruner.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PrunewerkError, Result};

/// An indirect object number and generation, as in `12 0 R`.
pub type ObjectRef = (u32, u16);

/// The named resource tables a resource dictionary can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    Font,
    /// Images and form XObjects.
    ExternalObject,
    Pattern,
    Shading,
    /// Extended graphics states.
    ExtGState,
}

impl ResourceClass {
    /// All resource classes, in dictionary order.
    pub const ALL: [ResourceClass; 5] = [
        Self::Font,
        Self::ExternalObject,
        Self::Pattern,
        Self::Shading,
        Self::ExtGState,
    ];

    /// Key of this class's sub-dictionary inside a `/Resources` dictionary.
    pub fn key(&self) -> &'static [u8] {
        match self {
            Self::Font => b"Font",
            Self::ExternalObject => b"XObject",
            Self::Pattern => b"Pattern",
            Self::Shading => b"Shading",
            Self::ExtGState => b"ExtGState",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Font => "font",
            Self::ExternalObject => "xobject",
            Self::Pattern => "pattern",
            Self::Shading => "shading",
            Self::ExtGState => "extgstate",
        };
        f.write_str(label)
    }
}

/// Kinds of content owner: anything with its own instruction stream whose
/// names resolve against a resource dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Page,
    /// Form XObject.
    Form,
    TilingPattern,
    /// Transparency group referenced from a soft mask.
    TransparencyGroup,
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Page => "page",
            Self::Form => "form",
            Self::TilingPattern => "tiling pattern",
            Self::TransparencyGroup => "transparency group",
        };
        f.write_str(label)
    }
}

/// A content owner whose instruction stream could not be analysed. Its
/// resource dictionary was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerFailure {
    pub object: ObjectRef,
    pub kind: OwnerKind,
    /// 1-indexed page the owner was reached from.
    pub page: u32,
    pub detail: String,
}

impl fmt::Display for OwnerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} R on page {}: {}",
            self.kind, self.object.0, self.object.1, self.page, self.detail
        )
    }
}

/// What a pruning pass did to a document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    pub pages: usize,
    /// Distinct content owners scanned (pages included).
    pub owners_visited: usize,
    /// Entries deleted from resource dictionaries, per class.
    pub resources_removed: BTreeMap<ResourceClass, usize>,
    /// Font slots rebound to a shared standard font object.
    pub fonts_canonicalized: usize,
    pub matrices_dropped: usize,
    pub rotations_dropped: usize,
    pub crop_boxes_dropped: usize,
    pub proc_sets_dropped: usize,
    pub annotations_dropped: usize,
    pub contents_consolidated: usize,
    pub malformed: Vec<OwnerFailure>,
}

impl PruneReport {
    /// Entries of `class` removed during the pass.
    pub fn removed(&self, class: ResourceClass) -> usize {
        self.resources_removed.get(&class).copied().unwrap_or(0)
    }

    pub fn fonts_removed(&self) -> usize {
        self.removed(ResourceClass::Font)
    }

    /// Count `count` entries of `class` as removed.
    pub fn add_removed(&mut self, class: ResourceClass, count: usize) {
        if count > 0 {
            *self.resources_removed.entry(class).or_default() += count;
        }
    }

    /// True when every owner's stream was analysed successfully.
    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty()
    }

    /// Turn a report with malformed owners into an error listing them.
    pub fn into_result(self) -> Result<Self> {
        if self.malformed.is_empty() {
            Ok(self)
        } else {
            Err(PrunewerkError::MalformedOwners(self.malformed))
        }
    }

    /// Fold another report (e.g. from a second document) into this one.
    pub fn absorb(&mut self, other: PruneReport) {
        self.pages += other.pages;
        self.owners_visited += other.owners_visited;
        for (class, count) in other.resources_removed {
            self.add_removed(class, count);
        }
        self.fonts_canonicalized += other.fonts_canonicalized;
        self.matrices_dropped += other.matrices_dropped;
        self.rotations_dropped += other.rotations_dropped;
        self.crop_boxes_dropped += other.crop_boxes_dropped;
        self.proc_sets_dropped += other.proc_sets_dropped;
        self.annotations_dropped += other.annotations_dropped;
        self.contents_consolidated += other.contents_consolidated;
        self.malformed.extend(other.malformed);
    }
}

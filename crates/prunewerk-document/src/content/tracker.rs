// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Usage tracker — which named resources does an instruction stream reference?
//
// Consumes tokens, buffers the operands of the current instruction, and when a
// resource-invoking operator appears records the resource name it names. The
// buffer is cleared after every operator.

use std::collections::{BTreeMap, BTreeSet};

use prunewerk_core::{ObjectRef, ResourceClass};
use thiserror::Error;

use super::scanner::{Operand, ScanError, Token, tokenize};

/// Font selection: `/F1 12 Tf`.
pub const SELECT_FONT: &str = "Tf";

/// Which buffered operand carries the resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    First,
    Last,
}

/// Operators that name a resource.
///
/// Strict operators require a name in their slot; a missing or mistyped
/// operand makes the stream malformed. `scn`/`SCN` name a pattern only when
/// the last operand is a name, otherwise they set a plain colour.
const RESOURCE_OPERATORS: &[(&str, ResourceClass, Slot, bool)] = &[
    (SELECT_FONT, ResourceClass::Font, Slot::First, true),
    ("Do", ResourceClass::ExternalObject, Slot::First, true),
    ("gs", ResourceClass::ExtGState, Slot::First, true),
    ("sh", ResourceClass::Shading, Slot::First, true),
    ("scn", ResourceClass::Pattern, Slot::Last, false),
    ("SCN", ResourceClass::Pattern, Slot::Last, false),
];

/// Resource names referenced by one stream, per class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSet {
    names: BTreeMap<ResourceClass, BTreeSet<Vec<u8>>>,
}

impl UsageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` as live. Returns `true` if it was not already recorded.
    pub fn insert(&mut self, class: ResourceClass, name: impl Into<Vec<u8>>) -> bool {
        self.names.entry(class).or_default().insert(name.into())
    }

    pub fn contains(&self, class: ResourceClass, name: &[u8]) -> bool {
        self.names.get(&class).is_some_and(|set| set.contains(name))
    }

    /// Live names of one class, in byte order.
    pub fn names(&self, class: ResourceClass) -> impl Iterator<Item = &[u8]> {
        self.names
            .get(&class)
            .into_iter()
            .flat_map(|set| set.iter().map(Vec::as_slice))
    }

    pub fn fonts(&self) -> impl Iterator<Item = &[u8]> {
        self.names(ResourceClass::Font)
    }

    pub fn len(&self, class: ResourceClass) -> usize {
        self.names.get(&class).map_or(0, BTreeSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.names.values().all(BTreeSet::is_empty)
    }

    /// Union `other` into this set.
    pub fn merge(&mut self, other: &UsageSet) {
        for (class, names) in &other.names {
            self.names
                .entry(*class)
                .or_default()
                .extend(names.iter().cloned());
        }
    }
}

/// Why a stream's usage could not be determined.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("{operator} without a resource name")]
    MissingOperand { operator: String },

    #[error("{operator} expects a resource name, found {found}")]
    WrongOperandType {
        operator: String,
        found: &'static str,
    },
}

type Resolver<'r> = Box<dyn Fn(ObjectRef) -> Option<Operand> + 'r>;

/// Accumulates the live resource names of one stream.
pub struct UsageTracker<'r> {
    operands: Vec<Operand>,
    live: UsageSet,
    resolver: Option<Resolver<'r>>,
}

impl Default for UsageTracker<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> UsageTracker<'r> {
    pub fn new() -> Self {
        Self {
            operands: Vec::new(),
            live: UsageSet::new(),
            resolver: None,
        }
    }

    /// A tracker that replaces indirect-reference operands with the object
    /// they point to, when `resolve` can supply it.
    pub fn with_resolver(resolve: impl Fn(ObjectRef) -> Option<Operand> + 'r) -> Self {
        Self {
            resolver: Some(Box::new(resolve)),
            ..Self::new()
        }
    }

    /// Feed one token.
    pub fn observe(&mut self, token: Token) -> Result<(), TrackError> {
        match token {
            Token::Operand(Operand::Reference(reference)) => {
                let resolved = self
                    .resolver
                    .as_ref()
                    .and_then(|resolve| resolve(reference))
                    .unwrap_or(Operand::Reference(reference));
                self.operands.push(resolved);
                Ok(())
            }
            Token::Operand(operand) => {
                self.operands.push(operand);
                Ok(())
            }
            Token::Operator(operator) => {
                let outcome = self.record(&operator);
                self.operands.clear();
                outcome
            }
        }
    }

    fn record(&mut self, operator: &str) -> Result<(), TrackError> {
        let Some(&(_, class, slot, strict)) = RESOURCE_OPERATORS
            .iter()
            .find(|(mnemonic, ..)| *mnemonic == operator)
        else {
            return Ok(());
        };
        let operand = match slot {
            Slot::First => self.operands.first(),
            Slot::Last => self.operands.last(),
        };
        match operand {
            Some(Operand::Name(name)) => {
                self.live.insert(class, name.clone());
                Ok(())
            }
            _ if !strict => Ok(()),
            Some(other) => Err(TrackError::WrongOperandType {
                operator: operator.to_string(),
                found: other.type_name(),
            }),
            None => Err(TrackError::MissingOperand {
                operator: operator.to_string(),
            }),
        }
    }

    /// Live names recorded so far.
    pub fn live(&self) -> &UsageSet {
        &self.live
    }

    pub fn finish(self) -> UsageSet {
        self.live
    }

    /// Scan `bytes` and feed every token, stopping at the first error.
    pub fn consume(mut self, bytes: &[u8]) -> Result<UsageSet, TrackError> {
        for token in tokenize(bytes) {
            self.observe(token?)?;
        }
        Ok(self.finish())
    }
}

/// Live resource names of a decoded stream.
pub fn track_usage(bytes: &[u8]) -> Result<UsageSet, TrackError> {
    UsageTracker::new().consume(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::scanner::ScanErrorKind;

    fn fonts(usage: &UsageSet) -> Vec<String> {
        usage
            .fonts()
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .collect()
    }

    #[test]
    fn records_selected_fonts() {
        let usage = track_usage(b"BT /F1 12 Tf (Hello) Tj /F3 9 Tf (x) Tj ET").unwrap();
        assert_eq!(fonts(&usage), vec!["F1", "F3"]);
    }

    #[test]
    fn size_glued_to_operator_still_selects_the_font() {
        let usage = track_usage(b"BT /F1 12Tf (Hi) Tj /F2 9.5Tf (x) Tj ET").unwrap();
        assert!(usage.contains(ResourceClass::Font, b"F1"));
        assert!(usage.contains(ResourceClass::Font, b"F2"));
    }

    #[test]
    fn repeated_selection_is_recorded_once() {
        let usage = track_usage(b"/F1 12 Tf /F1 10 Tf").unwrap();
        assert_eq!(usage.len(ResourceClass::Font), 1);
    }

    #[test]
    fn names_not_in_font_position_are_not_fonts() {
        // /F2 is an operand of a marked-content operator, not of Tf.
        let usage = track_usage(b"/F2 BMC EMC /F1 12 Tf").unwrap();
        assert_eq!(fonts(&usage), vec!["F1"]);
    }

    #[test]
    fn operand_buffer_clears_after_each_operator() {
        // /F9 belongs to `gs`'s instruction, so the Tf below has no operands.
        let err = track_usage(b"/F9 gs Tf").unwrap_err();
        assert_eq!(
            err,
            TrackError::MissingOperand {
                operator: "Tf".into()
            }
        );
    }

    #[test]
    fn other_resource_classes_are_tracked() {
        let usage =
            track_usage(b"/GS1 gs /Im1 Do /Sh1 sh /P1 scn 0.5 0.5 0.5 /P2 SCN 1 0 0 sc").unwrap();
        assert!(usage.contains(ResourceClass::ExtGState, b"GS1"));
        assert!(usage.contains(ResourceClass::ExternalObject, b"Im1"));
        assert!(usage.contains(ResourceClass::Shading, b"Sh1"));
        assert!(usage.contains(ResourceClass::Pattern, b"P1"));
        assert!(usage.contains(ResourceClass::Pattern, b"P2"));
        assert_eq!(usage.len(ResourceClass::Font), 0);
    }

    #[test]
    fn colour_scn_is_not_a_pattern_use() {
        let usage = track_usage(b"0.2 0.4 0.6 scn").unwrap();
        assert!(usage.is_empty());
    }

    #[test]
    fn wrong_operand_type_is_malformed() {
        let err = track_usage(b"12 /F1 Tf").unwrap_err();
        assert_eq!(
            err,
            TrackError::WrongOperandType {
                operator: "Tf".into(),
                found: "integer",
            }
        );
    }

    #[test]
    fn scan_errors_surface() {
        match track_usage(b"/F1 12 Tf (oops").unwrap_err() {
            TrackError::Scan(err) => assert_eq!(err.kind, ScanErrorKind::UnterminatedString),
            other => panic!("expected scan error, got {other:?}"),
        }
    }

    #[test]
    fn references_resolve_through_resolver() {
        let tracker = UsageTracker::with_resolver(|reference| {
            (reference == (5, 0)).then(|| Operand::Name(b"F7".to_vec()))
        });
        let usage = tracker.consume(b"5 0 R 11 Tf").unwrap();
        assert_eq!(fonts(&usage), vec!["F7"]);
    }

    #[test]
    fn unresolved_reference_is_wrong_type() {
        let err = track_usage(b"5 0 R 11 Tf").unwrap_err();
        assert!(matches!(
            err,
            TrackError::WrongOperandType {
                found: "reference",
                ..
            }
        ));
    }

    #[test]
    fn unknown_operators_are_ignored() {
        let usage = track_usage(b"/F1 1 2 3 xyz /F1 12 Tf").unwrap();
        assert_eq!(fonts(&usage), vec!["F1"]);
    }

    #[test]
    fn merge_unions_classes() {
        let mut a = track_usage(b"/F1 12 Tf").unwrap();
        let b = track_usage(b"/F2 12 Tf /Im0 Do").unwrap();
        a.merge(&b);
        assert_eq!(fonts(&a), vec!["F1", "F2"]);
        assert!(a.contains(ResourceClass::ExternalObject, b"Im0"));
    }

    #[test]
    fn live_set_is_readable_mid_stream() {
        let mut tracker = UsageTracker::new();
        for token in tokenize(b"/F4 8 Tf") {
            tracker.observe(token.unwrap()).unwrap();
        }
        assert!(tracker.live().contains(ResourceClass::Font, b"F4"));
    }
}

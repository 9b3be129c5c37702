// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// prunewerk-document — Resource pruning for PDF documents.
//
// Scans the instruction streams of every page and nested content owner,
// removes resources no instruction references, rebinds standard fonts to
// shared canonical objects, and strips attributes that only restate defaults.

pub mod content;
pub mod fonts;
pub mod pdf;
pub mod prune;
pub mod walker;

// Re-export the primary entry points so callers can use `prunewerk_document::Shrinker` etc.
pub use pdf::shrinker::{Shrinker, shrink_file};
pub use walker::{GraphWalker, prune_document, prune_document_with};

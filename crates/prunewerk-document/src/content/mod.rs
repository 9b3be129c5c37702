// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content module — scanning instruction streams and tracking which resources
// they reference.

pub mod scanner;
pub mod tracker;

pub use scanner::{Operand, ScanError, ScanErrorKind, Token, Tokens, tokenize};
pub use tracker::{TrackError, UsageSet, UsageTracker, track_usage};

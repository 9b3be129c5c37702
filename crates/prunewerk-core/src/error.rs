// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Prunewerk.

use thiserror::Error;

use crate::types::OwnerFailure;

/// Top-level error type for all Prunewerk operations.
#[derive(Debug, Error)]
pub enum PrunewerkError {
    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    /// One or more content owners had instruction streams that could not be
    /// analysed. Every other owner in the document was still pruned.
    #[error("{} content owner(s) could not be analysed{}", .0.len(), summarize_failures(.0))]
    MalformedOwners(Vec<OwnerFailure>),

    // -- Invocation --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrunewerkError>;

fn summarize_failures(failures: &[OwnerFailure]) -> String {
    match failures.first() {
        Some(first) if failures.len() == 1 => format!(": {first}"),
        Some(first) => format!(": {first} (and {} more)", failures.len() - 1),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OwnerKind;

    fn failure(object: (u32, u16)) -> OwnerFailure {
        OwnerFailure {
            object,
            kind: OwnerKind::Form,
            page: 2,
            detail: "Tf without a font name".into(),
        }
    }

    #[test]
    fn single_failure_is_described_inline() {
        let err = PrunewerkError::MalformedOwners(vec![failure((7, 0))]);
        assert_eq!(
            err.to_string(),
            "1 content owner(s) could not be analysed: form 7 0 R on page 2: Tf without a font name"
        );
    }

    #[test]
    fn multiple_failures_are_counted() {
        let err = PrunewerkError::MalformedOwners(vec![failure((7, 0)), failure((9, 0))]);
        assert!(err.to_string().ends_with("(and 1 more)"));
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shrink configuration.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PrunewerkError, Result};
use crate::types::ResourceClass;

/// Which simplifications a shrink pass applies.
///
/// Every switch defaults to on, except that only fonts are pruned by default.
/// Missing fields in a JSON config fall back to these defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShrinkConfig {
    /// Resource classes whose unreferenced entries are deleted.
    pub prune_classes: BTreeSet<ResourceClass>,
    /// Rebind non-embedded standard 14 fonts to one shared object per name.
    pub canonicalize_standard_fonts: bool,
    /// Drop `/Matrix` entries equal to the identity matrix.
    pub drop_identity_matrices: bool,
    /// Drop a page's `/Rotate 0`.
    pub drop_default_rotation: bool,
    /// Drop a page's `/CropBox` when it equals the box it would fall back to.
    pub drop_redundant_crop_box: bool,
    /// Drop the obsolete `/ProcSet` entry from resource dictionaries.
    pub drop_proc_sets: bool,
    /// Drop a page's `/Annots` when it is an empty array.
    pub drop_empty_annotations: bool,
    /// Drop an interactive form that has no fields and no XFA.
    pub drop_empty_acroform: bool,
    /// Drop the catalog's XMP `/Metadata` stream.
    pub drop_metadata: bool,
    /// Merge a page's multiple content streams into one.
    pub consolidate_contents: bool,
    /// Flate-compress every uncompressed stream before saving.
    pub compress_streams: bool,
    /// Save with object streams and a cross-reference stream (PDF 1.5).
    pub use_object_streams: bool,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            prune_classes: BTreeSet::from([ResourceClass::Font]),
            canonicalize_standard_fonts: true,
            drop_identity_matrices: true,
            drop_default_rotation: true,
            drop_redundant_crop_box: true,
            drop_proc_sets: true,
            drop_empty_annotations: true,
            drop_empty_acroform: true,
            drop_metadata: true,
            consolidate_contents: true,
            compress_streams: true,
            use_object_streams: true,
        }
    }
}

impl ShrinkConfig {
    /// A configuration that only prunes fonts and touches nothing else.
    pub fn fonts_only() -> Self {
        Self {
            prune_classes: BTreeSet::from([ResourceClass::Font]),
            canonicalize_standard_fonts: false,
            drop_identity_matrices: false,
            drop_default_rotation: false,
            drop_redundant_crop_box: false,
            drop_proc_sets: false,
            drop_empty_annotations: false,
            drop_empty_acroform: false,
            drop_metadata: false,
            consolidate_contents: false,
            compress_streams: false,
            use_object_streams: false,
        }
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|err| {
            PrunewerkError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        Self::from_json(&data)
            .map_err(|err| PrunewerkError::Config(format!("{}: {}", path.display(), err)))
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn prunes(&self, class: ResourceClass) -> bool {
        self.prune_classes.contains(&class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prunes_only_fonts() {
        let config = ShrinkConfig::default();
        assert!(config.prunes(ResourceClass::Font));
        assert!(!config.prunes(ResourceClass::ExternalObject));
        assert!(config.canonicalize_standard_fonts);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config = ShrinkConfig::from_json(r#"{ "drop_metadata": false }"#).unwrap();
        assert!(!config.drop_metadata);
        assert!(config.drop_proc_sets);
        assert_eq!(config.prune_classes, ShrinkConfig::default().prune_classes);
    }

    #[test]
    fn classes_parse_from_snake_case() {
        let config =
            ShrinkConfig::from_json(r#"{ "prune_classes": ["font", "external_object"] }"#).unwrap();
        assert!(config.prunes(ResourceClass::ExternalObject));
        assert!(!config.prunes(ResourceClass::ExtGState));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ShrinkConfig::from_json(r#"{ "prune_everything": true }"#).is_err());
    }

    #[test]
    fn load_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shrink.json");
        std::fs::write(&path, "{ not json").unwrap();
        match ShrinkConfig::load(&path) {
            Err(PrunewerkError::Config(msg)) => assert!(msg.contains("shrink.json")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn load_round_trips_saved_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shrink.json");
        let config = ShrinkConfig {
            use_object_streams: false,
            ..ShrinkConfig::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(ShrinkConfig::load(&path).unwrap(), config);
    }
}

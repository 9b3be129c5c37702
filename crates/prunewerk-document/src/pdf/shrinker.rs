// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF shrinker — open a document, prune its content owners, tidy the
// catalog, and write it back out with object streams using the `lopdf` crate.

use std::path::{Path, PathBuf};

use lopdf::{Document, SaveOptions};
use prunewerk_core::error::{PrunewerkError, Result};
use prunewerk_core::{PruneReport, ShrinkConfig};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::walker::prune_document_with;

/// Lowest version that allows cross-reference and object streams.
const MODERN_VERSION: &str = "1.5";

/// Suffix added to the file stem of every shrunk document.
pub const OUTPUT_SUFFIX: &str = "_shrink";

/// Shrinks an existing PDF document in place.
pub struct Shrinker {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl Shrinker {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            PrunewerkError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a shrinker from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            PrunewerkError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self::from_document(document))
    }

    pub fn from_document(document: Document) -> Self {
        Self {
            document,
            source_path: None,
        }
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the shrinker was created via [`Shrinker::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    // -- Shrinking ------------------------------------------------------------

    /// Prune every content owner, then apply the document-level cleanups.
    ///
    /// Malformed owners are reported, not fatal.
    #[instrument(skip_all, fields(source = self.source_path.as_deref().unwrap_or("<memory>")))]
    pub fn shrink(&mut self, config: &ShrinkConfig) -> Result<PruneReport> {
        let report = prune_document_with(&mut self.document, config)?;
        for failure in &report.malformed {
            warn!(%failure, "owner left unpruned");
        }

        if config.drop_empty_acroform && self.drop_empty_acroform() {
            debug!("Removed empty AcroForm");
        }
        if config.drop_metadata && self.drop_metadata() {
            debug!("Removed catalog metadata");
        }
        if config.use_object_streams {
            self.require_modern_version();
        }

        let orphans = self.document.prune_objects();
        debug!(removed = orphans.len(), "Pruned unreachable objects");

        if config.compress_streams {
            self.document.compress();
        }
        Ok(report)
    }

    /// Serialise the document.
    pub fn to_bytes(&mut self, config: &ShrinkConfig) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let saved = if config.use_object_streams {
            let options = SaveOptions::builder()
                .use_object_streams(true)
                .use_xref_streams(true)
                .build();
            self.document.save_with_options(&mut output, options)
        } else {
            self.document.save_to(&mut output).map(|_| ())
        };
        saved.map_err(|err| PrunewerkError::PdfError(format!("failed to serialise PDF: {}", err)))?;

        debug!(output_bytes = output.len(), "PDF serialised");
        Ok(output)
    }

    /// Serialise to `path`. Returns the number of bytes written.
    pub fn save(&mut self, path: impl AsRef<Path>, config: &ShrinkConfig) -> Result<u64> {
        let bytes = self.to_bytes(config)?;
        std::fs::write(path.as_ref(), &bytes)?;
        Ok(bytes.len() as u64)
    }

    // -- Helpers --------------------------------------------------------------

    /// Remove an `/AcroForm` without XFA and without fields.
    fn drop_empty_acroform(&mut self) -> bool {
        let empty = self
            .document
            .catalog()
            .ok()
            .and_then(|catalog| catalog.get(b"AcroForm").ok())
            .and_then(|form| self.document.dereference(form).ok())
            .and_then(|(_, form)| form.as_dict().ok())
            .is_some_and(|form| {
                let no_fields = match form.get(b"Fields") {
                    Err(_) => true,
                    Ok(fields) => self
                        .document
                        .dereference(fields)
                        .ok()
                        .and_then(|(_, fields)| fields.as_array().ok())
                        .is_some_and(Vec::is_empty),
                };
                !form.has(b"XFA") && no_fields
            });
        empty
            && self
                .document
                .catalog_mut()
                .is_ok_and(|catalog| catalog.remove(b"AcroForm").is_some())
    }

    fn drop_metadata(&mut self) -> bool {
        self.document
            .catalog_mut()
            .is_ok_and(|catalog| catalog.remove(b"Metadata").is_some())
    }

    fn require_modern_version(&mut self) {
        let outdated = !matches!(self.document.version.parse::<f32>(), Ok(version) if version >= 1.5);
        if outdated {
            debug!(from = %self.document.version, to = MODERN_VERSION, "Raising PDF version");
            self.document.version = MODERN_VERSION.to_string();
        }
    }
}

/// Where the shrunk copy of `input` goes: `dir/name.pdf` → `dir/name_shrink.pdf`.
pub fn output_path_for(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}.pdf", stem, OUTPUT_SUFFIX))
}

/// Result of shrinking one file.
#[derive(Debug, Clone, Serialize)]
pub struct ShrinkOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub report: PruneReport,
}

/// Shrink `input` and write the result next to it.
#[instrument(skip_all, fields(input = %input.display()))]
pub fn shrink_file(input: &Path, config: &ShrinkConfig) -> Result<ShrinkOutcome> {
    let input_bytes = std::fs::metadata(input)?.len();
    let mut shrinker = Shrinker::open(input)?;
    let report = shrinker.shrink(config)?;
    let output = output_path_for(input);
    let output_bytes = shrinker.save(&output, config)?;

    info!(
        output = %output.display(),
        input_bytes,
        output_bytes,
        "Shrink complete"
    );
    Ok(ShrinkOutcome {
        input: input.to_path_buf(),
        output,
        input_bytes,
        output_bytes,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Object, Stream, dictionary};

    fn has_catalog_entry(doc: &Document, key: &[u8]) -> bool {
        doc.catalog().is_ok_and(|catalog| catalog.has(key))
    }

    fn sample(version: &str) -> Document {
        let mut doc = Document::with_version(version);
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let unused_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let first = doc.add_object(Stream::new(dictionary! {}, b"BT /F1 12 Tf".to_vec()));
        let second = doc.add_object(Stream::new(dictionary! {}, b"(Hi) Tj ET".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "CropBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Rotate" => 0,
            "Annots" => Vec::<Object>::new(),
            "Contents" => vec![first.into(), second.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id, "F2" => unused_id },
                "ProcSet" => vec![Object::Name(b"PDF".to_vec()), Object::Name(b"Text".to_vec())],
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let metadata_id = doc.add_object(Stream::new(
            dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
            b"<x:xmpmeta/>".to_vec(),
        ));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "Metadata" => metadata_id,
            "AcroForm" => dictionary! { "Fields" => Vec::<Object>::new() },
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn output_path_gets_suffix() {
        assert_eq!(
            output_path_for(Path::new("/tmp/books/volume.pdf")),
            PathBuf::from("/tmp/books/volume_shrink.pdf")
        );
        assert_eq!(
            output_path_for(Path::new("notes")),
            PathBuf::from("notes_shrink.pdf")
        );
    }

    #[test]
    fn shrink_cleans_the_document() {
        let mut shrinker = Shrinker::from_document(sample("1.4"));
        let report = shrinker.shrink(&ShrinkConfig::default()).unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.fonts_removed(), 1);
        assert_eq!(report.rotations_dropped, 1);
        assert_eq!(report.crop_boxes_dropped, 1);
        assert_eq!(report.annotations_dropped, 1);
        assert_eq!(report.proc_sets_dropped, 1);
        assert_eq!(report.contents_consolidated, 1);

        let doc = shrinker.document();
        assert_eq!(doc.version, "1.5");
        assert!(!has_catalog_entry(doc, b"Metadata"));
        assert!(!has_catalog_entry(doc, b"AcroForm"));
        // The unused Courier font and the split content streams are gone.
        assert!(
            !doc.objects
                .values()
                .filter_map(|object| object.as_dict().ok())
                .any(|dict| dict.get(b"BaseFont").and_then(Object::as_name).ok() == Some(b"Courier".as_slice()))
        );
    }

    #[test]
    fn acroform_with_fields_is_kept() {
        let mut doc = sample("1.7");
        let field = doc.add_object(dictionary! { "FT" => "Tx", "T" => Object::string_literal("name") });
        let catalog = doc.catalog_mut().unwrap();
        catalog.set("AcroForm", dictionary! { "Fields" => vec![Object::Reference(field)] });

        let mut shrinker = Shrinker::from_document(doc);
        shrinker.shrink(&ShrinkConfig::default()).unwrap();
        assert!(has_catalog_entry(shrinker.document(), b"AcroForm"));
        assert_eq!(shrinker.document().version, "1.7");
    }

    #[test]
    fn shrunk_bytes_reload() {
        let mut shrinker = Shrinker::from_document(sample("1.4"));
        let config = ShrinkConfig::default();
        shrinker.shrink(&config).unwrap();
        let bytes = shrinker.to_bytes(&config).unwrap();
        let reloaded = Shrinker::from_bytes(&bytes).unwrap();
        assert_eq!(reloaded.page_count(), 1);
        assert!(reloaded.source_path().is_none());
    }

    #[test]
    fn shrink_file_writes_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("report.pdf");
        let mut doc = sample("1.4");
        doc.save(&input).unwrap();

        let outcome = shrink_file(&input, &ShrinkConfig::default()).unwrap();
        assert_eq!(outcome.output, dir.path().join("report_shrink.pdf"));
        assert!(outcome.output.exists());
        assert_eq!(
            std::fs::metadata(&outcome.output).unwrap().len(),
            outcome.output_bytes
        );
        assert_eq!(outcome.report.fonts_removed(), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = shrink_file(&dir.path().join("absent.pdf"), &ShrinkConfig::default()).unwrap_err();
        assert!(matches!(err, PrunewerkError::Io(_)));
    }
}

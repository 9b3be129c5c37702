// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Graph walker — visits every content owner reachable from the pages of a
// document and prunes the resource dictionaries they draw from.
//
// The walk runs in two phases. The survey visits each owner once per
// resource scope, scans its instruction stream and records the live names
// against the dictionary it draws from, then queues the owners nested in that
// dictionary. The apply phase prunes each dictionary against the union of
// everything recorded for it, so a dictionary shared by several owners (page
// tree inheritance, a reused `/Resources` object) keeps every name any of them
// uses. A dictionary any of whose owners failed to scan is left untouched.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use lopdf::{Document, Object, ObjectId};
use prunewerk_core::error::Result;
use prunewerk_core::{OwnerFailure, PruneReport, ResourceClass, ShrinkConfig};
use tracing::{debug, info, instrument, warn};

use crate::content::{Operand, TrackError, UsageSet, UsageTracker};
use crate::fonts::CanonicalFonts;
use crate::pdf::owner::{ContentOwner, content_owners, decode_stream};
use crate::pdf::resources::{DictPath, FontResource, Pattern, ResourceDictionary, Shading, XObject};
use crate::prune;

/// Everything recorded against one resource dictionary during the survey.
#[derive(Debug, Default)]
struct Scope {
    live: UsageSet,
    malformed: bool,
}

/// One class table (`/Font`, `/XObject`, ...) and the scopes drawing on it.
struct ClassTable {
    resources: ResourceDictionary,
    live: UsageSet,
    malformed: bool,
}

/// A pending `Visit`. `parent` is the scope the owner was found in; owners
/// without resources of their own draw from it.
struct Visit {
    owner: ContentOwner,
    page: u32,
    parent: Option<ResourceDictionary>,
}

pub struct GraphWalker<'c> {
    config: &'c ShrinkConfig,
    visited: HashSet<(ObjectId, ResourceDictionary)>,
    scopes: BTreeMap<ResourceDictionary, Scope>,
    /// Nested owners, which may carry their own `/Matrix`.
    nested: BTreeSet<ContentOwner>,
    /// Pattern and shading dictionaries that may carry a `/Matrix`.
    matrices: BTreeSet<DictPath>,
    pages: Vec<ContentOwner>,
    report: PruneReport,
}

impl<'c> GraphWalker<'c> {
    pub fn new(config: &'c ShrinkConfig) -> Self {
        Self {
            config,
            visited: HashSet::new(),
            scopes: BTreeMap::new(),
            nested: BTreeSet::new(),
            matrices: BTreeSet::new(),
            pages: Vec::new(),
            report: PruneReport::default(),
        }
    }

    // -- Survey ---------------------------------------------------------------

    /// Visit every page in page order, and every owner nested below it.
    pub fn survey(&mut self, doc: &Document) {
        for (number, page) in content_owners(doc) {
            self.pages.push(page);
            let mut pending = vec![Visit {
                owner: page,
                page: number,
                parent: None,
            }];
            while let Some(visit) = pending.pop() {
                self.visit(doc, visit, &mut pending);
            }
        }
        self.report.pages = self.pages.len();
    }

    fn visit(&mut self, doc: &Document, visit: Visit, pending: &mut Vec<Visit>) {
        let Visit {
            owner,
            page,
            parent,
        } = visit;
        let Some(scope) = owner.resources(doc).or(parent) else {
            debug!(owner = ?owner.id(), kind = %owner.kind(), "no resource dictionary");
            return;
        };
        if !self.visited.insert((owner.id(), scope.clone())) {
            return;
        }
        self.report.owners_visited += 1;
        if !owner.is_page() {
            self.nested.insert(owner);
        }

        let outcome = scan(doc, &owner, &scope);
        let recorded = self.scopes.entry(scope.clone()).or_default();
        match outcome {
            Ok(live) => {
                debug!(
                    owner = ?owner.id(),
                    kind = %owner.kind(),
                    fonts = live.len(ResourceClass::Font),
                    "scanned content owner"
                );
                recorded.live.merge(&live);
            }
            Err(detail) => {
                warn!(owner = ?owner.id(), kind = %owner.kind(), page, %detail, "malformed content stream");
                recorded.malformed = true;
                self.report.malformed.push(OwnerFailure {
                    object: owner.id(),
                    kind: owner.kind(),
                    page,
                    detail,
                });
            }
        }

        self.queue_nested(doc, &scope, page, pending);
    }

    fn queue_nested(
        &mut self,
        doc: &Document,
        scope: &ResourceDictionary,
        page: u32,
        pending: &mut Vec<Visit>,
    ) {
        let nested = |owner| Visit {
            owner,
            page,
            parent: Some(scope.clone()),
        };

        for (_, xobject) in scope.external_objects(doc) {
            match xobject {
                XObject::Form(id) => pending.push(nested(ContentOwner::form(id))),
                XObject::Image(_) | XObject::Other => {}
            }
        }
        for (_, pattern) in scope.patterns(doc) {
            match pattern {
                Pattern::Tiling(id) => pending.push(nested(ContentOwner::tiling_pattern(id))),
                Pattern::Shading(path) => {
                    if let Some(shading) = path.child(doc, b"Shading") {
                        let shading = Shading::at(doc, shading);
                        if shading.is_function_based() {
                            self.matrices.insert(shading.path);
                        }
                    }
                    self.matrices.insert(path);
                }
                Pattern::Other => {}
            }
        }
        for (_, shading) in scope.shadings(doc) {
            if shading.is_function_based() {
                self.matrices.insert(shading.path);
            }
        }
        for (_, state) in scope.ext_gstates(doc) {
            if let Some(group) = state.soft_mask(doc).and_then(|mask| mask.group(doc)) {
                pending.push(nested(ContentOwner::transparency_group(group)));
            }
        }
    }

    // -- Apply ----------------------------------------------------------------

    /// Prune and normalise everything the survey recorded.
    pub fn apply(&mut self, doc: &mut Document) -> Result<()> {
        let mut canonical = CanonicalFonts::new();
        for class in ResourceClass::ALL {
            let prunes = self.config.prunes(class);
            let canonicalizes =
                class == ResourceClass::Font && self.config.canonicalize_standard_fonts;
            if !prunes && !canonicalizes {
                continue;
            }
            for table in self.class_tables(doc, class) {
                if table.malformed {
                    debug!(%class, resources = ?table.resources.path().root(), "skipping table of a malformed owner");
                    continue;
                }
                if prunes {
                    let removed =
                        prune::prune_unreferenced(doc, &table.resources, class, &table.live)?;
                    self.report.add_removed(class, removed.len());
                }
                if canonicalizes {
                    self.report.fonts_canonicalized +=
                        prune::canonicalize_standard_fonts(doc, &table.resources, &mut canonical)?;
                }
            }
        }

        if self.config.drop_proc_sets {
            for (resources, scope) in &self.scopes {
                if !scope.malformed && prune::drop_proc_set(doc, resources)? {
                    self.report.proc_sets_dropped += 1;
                }
            }
        }

        if self.config.drop_identity_matrices {
            for owner in &self.nested {
                if prune::drop_owner_identity_matrix(doc, owner)? {
                    self.report.matrices_dropped += 1;
                }
            }
            for path in &self.matrices {
                if prune::drop_identity_matrix(doc, path)? {
                    self.report.matrices_dropped += 1;
                }
            }
        }

        let pages = std::mem::take(&mut self.pages);
        let normalized = pages
            .iter()
            .try_for_each(|page| self.normalize_page(doc, page));
        self.pages = pages;
        normalized
    }

    /// Group the recorded scopes by the class table they resolve to.
    fn class_tables(&self, doc: &Document, class: ResourceClass) -> Vec<ClassTable> {
        let mut tables: BTreeMap<DictPath, ClassTable> = BTreeMap::new();
        for (resources, scope) in &self.scopes {
            let Some(path) = resources.class_path(doc, class) else {
                continue;
            };
            let table = tables.entry(path).or_insert_with(|| ClassTable {
                resources: resources.clone(),
                live: UsageSet::new(),
                malformed: false,
            });
            table.live.merge(&scope.live);
            table.malformed |= scope.malformed;
        }
        tables.into_values().collect()
    }

    fn normalize_page(&mut self, doc: &mut Document, page: &ContentOwner) -> Result<()> {
        if self.config.drop_default_rotation && page.clear_rotation_if_default(doc)? {
            self.report.rotations_dropped += 1;
        }
        if self.config.drop_redundant_crop_box && page.clear_crop_box_if_redundant(doc)? {
            self.report.crop_boxes_dropped += 1;
        }
        if self.config.drop_empty_annotations && prune::drop_empty_annotations(doc, page)? {
            self.report.annotations_dropped += 1;
        }
        if self.config.consolidate_contents && prune::consolidate_contents(doc, page)? {
            self.report.contents_consolidated += 1;
        }
        Ok(())
    }

    pub fn report(&self) -> &PruneReport {
        &self.report
    }

    pub fn finish(self) -> PruneReport {
        self.report
    }
}

// -- Scanning -----------------------------------------------------------------

fn scan(
    doc: &Document,
    owner: &ContentOwner,
    scope: &ResourceDictionary,
) -> std::result::Result<UsageSet, String> {
    let bytes = match owner.instruction_stream(doc) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Ok(UsageSet::new()),
        Err(err) => return Err(err.to_string()),
    };
    let mut live = track(doc, &bytes).map_err(|err| err.to_string())?;
    let glyphs = glyph_usage(doc, scope, &live)?;
    live.merge(&glyphs);
    Ok(live)
}

fn track(doc: &Document, bytes: &[u8]) -> std::result::Result<UsageSet, TrackError> {
    UsageTracker::with_resolver(|reference| operand_for(doc, reference)).consume(bytes)
}

/// Resources used by the glyph procedures of live Type3 fonts that have no
/// `/Resources` of their own and so draw from `scope`.
fn glyph_usage(
    doc: &Document,
    scope: &ResourceDictionary,
    live: &UsageSet,
) -> std::result::Result<UsageSet, String> {
    let mut usage = UsageSet::new();
    for name in live.fonts() {
        let Some(font) = scope
            .entry(doc, ResourceClass::Font, name)
            .and_then(|entry| FontResource::from_entry(doc, entry))
        else {
            continue;
        };
        if !font.is_type3() || font.has_resources() {
            continue;
        }
        for id in font.char_procs() {
            let bytes = doc
                .get_object(id)
                .ok()
                .and_then(|object| object.as_stream().ok())
                .ok_or_else(|| format!("glyph procedure {} {} R is not a stream", id.0, id.1))
                .and_then(|stream| decode_stream(stream).map_err(|err| err.to_string()))?;
            let glyph = track(doc, &bytes)
                .map_err(|err| format!("glyph procedure {} {} R: {}", id.0, id.1, err))?;
            usage.merge(&glyph);
        }
    }
    Ok(usage)
}

/// The operand an indirect reference in a content stream stands for.
fn operand_for(doc: &Document, id: ObjectId) -> Option<Operand> {
    match doc.get_object(id).ok()? {
        Object::Null => Some(Operand::Null),
        Object::Boolean(value) => Some(Operand::Boolean(*value)),
        Object::Integer(value) => Some(Operand::Integer(*value)),
        Object::Real(value) => Some(Operand::Real(*value)),
        Object::Name(name) => Some(Operand::Name(name.clone())),
        Object::String(bytes, _) => Some(Operand::String(bytes.clone())),
        _ => None,
    }
}

// -- Entry points -------------------------------------------------------------

/// Prune every content owner of `doc` in place.
///
/// Owners whose streams cannot be analysed keep their dictionaries as they
/// were; everything else is still pruned. Any such owner turns the result
/// into [`PrunewerkError::MalformedOwners`](prunewerk_core::PrunewerkError).
pub fn prune_document(doc: &mut Document) -> Result<()> {
    prune_document_with(doc, &ShrinkConfig::default())?.into_result()?;
    Ok(())
}

/// Prune with explicit settings, reporting malformed owners instead of
/// failing on them.
#[instrument(skip_all, fields(pages = doc.get_pages().len()))]
pub fn prune_document_with(doc: &mut Document, config: &ShrinkConfig) -> Result<PruneReport> {
    let mut walker = GraphWalker::new(config);
    walker.survey(doc);
    walker.apply(doc)?;
    let report = walker.finish();

    info!(
        owners = report.owners_visited,
        fonts_removed = report.fonts_removed(),
        fonts_canonicalized = report.fonts_canonicalized,
        malformed = report.malformed.len(),
        "pruned document"
    );
    Ok(report)
}

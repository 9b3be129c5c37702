// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pruner / normalizer — removes resource entries no stream references, rebinds
// standard fonts to their canonical object, and strips attributes whose value
// is the default anyway.

use std::collections::BTreeSet;

use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use prunewerk_core::ResourceClass;
use prunewerk_core::error::Result;
use tracing::{debug, warn};

use crate::content::UsageSet;
use crate::fonts::{self, CanonicalFonts, StandardFont};
use crate::pdf::owner::{self, ContentOwner};
use crate::pdf::resources::{DictPath, ResourceDictionary, object_dict};

/// Delete every entry of `class` whose name is not in `live`.
///
/// The dead names are collected in full before the first deletion. Returns
/// the removed names in byte order.
pub fn prune_unreferenced(
    doc: &mut Document,
    resources: &ResourceDictionary,
    class: ResourceClass,
    live: &UsageSet,
) -> Result<Vec<Vec<u8>>> {
    let dead: BTreeSet<Vec<u8>> = resources
        .names(doc, class)
        .into_iter()
        .filter(|name| !live.contains(class, name))
        .collect();

    let mut removed = Vec::with_capacity(dead.len());
    for name in dead {
        if resources.remove(doc, class, &name)?.is_some() {
            debug!(%class, name = %String::from_utf8_lossy(&name), "removed unreferenced resource");
            removed.push(name);
        }
    }
    Ok(removed)
}

enum Rebind {
    /// The entry already is a canonical object; remember it.
    Adopt(&'static StandardFont, ObjectId),
    Substitute(&'static StandardFont),
}

/// Rebind every non-embedded standard font of `resources` to the document's
/// single canonical object for that font. Returns how many slots changed.
pub fn canonicalize_standard_fonts(
    doc: &mut Document,
    resources: &ResourceDictionary,
    canonical: &mut CanonicalFonts,
) -> Result<usize> {
    let plan: Vec<(Vec<u8>, Rebind)> = resources
        .fonts(doc)
        .into_iter()
        .filter_map(|(name, font)| {
            let standard = fonts::canonical_for(&font)?;
            let id = font.object_id();
            if id.is_some() && id == canonical.object_id(standard) {
                return None;
            }
            let rebind = match id {
                Some(id)
                    if canonical.object_id(standard).is_none()
                        && standard.is_canonical_form(font.dictionary()) =>
                {
                    Rebind::Adopt(standard, id)
                }
                _ => Rebind::Substitute(standard),
            };
            Some((name, rebind))
        })
        .collect();

    let mut rebound = 0;
    for (name, rebind) in plan {
        match rebind {
            Rebind::Adopt(standard, id) => {
                // An earlier slot in this same table may have materialised
                // the font already.
                match canonical.object_id(standard) {
                    None => canonical.adopt(standard, id),
                    Some(existing) if existing != id => {
                        resources.put_font(doc, &name, Object::Reference(existing))?;
                        rebound += 1;
                    }
                    Some(_) => {}
                }
            }
            Rebind::Substitute(standard) => {
                let id = canonical.materialize(doc, standard);
                resources.put_font(doc, &name, Object::Reference(id))?;
                debug!(
                    name = %String::from_utf8_lossy(&name),
                    base_font = standard.base_font(),
                    "rebound standard font to canonical object"
                );
                rebound += 1;
            }
        }
    }
    Ok(rebound)
}

/// Remove a form's, tiling pattern's or group's own `/Matrix` when it is the
/// identity.
pub fn drop_owner_identity_matrix(doc: &mut Document, owner: &ContentOwner) -> Result<bool> {
    match owner.matrix_attribute(doc) {
        Some(matrix) if matrix.is_identity() => owner.clear_matrix_attribute(doc),
        _ => Ok(false),
    }
}

/// Remove the `/Matrix` at `path` when it is the identity.
pub fn drop_identity_matrix(doc: &mut Document, path: &DictPath) -> Result<bool> {
    match owner::matrix_at(doc, path) {
        Some(matrix) if matrix.is_identity() => owner::clear_matrix_at(doc, path),
        _ => Ok(false),
    }
}

/// Remove the obsolete `/ProcSet` entry of a resource dictionary.
pub fn drop_proc_set(doc: &mut Document, resources: &ResourceDictionary) -> Result<bool> {
    if resources
        .path()
        .resolve(doc)
        .is_none_or(|dict| !dict.has(b"ProcSet"))
    {
        return Ok(false);
    }
    Ok(resources.path().dict_mut(doc)?.remove(b"ProcSet").is_some())
}

/// Remove a page's `/Annots` when it is an empty array.
pub fn drop_empty_annotations(doc: &mut Document, page: &ContentOwner) -> Result<bool> {
    let path = DictPath::object(page.id());
    let empty = path
        .resolve(doc)
        .and_then(|dict| dict.get(b"Annots").ok())
        .and_then(|value| doc.dereference(value).ok())
        .is_some_and(|(_, value)| matches!(value, Object::Array(items) if items.is_empty()));
    if !empty {
        return Ok(false);
    }
    Ok(path.dict_mut(doc)?.remove(b"Annots").is_some())
}

/// Merge a page's multi-stream `/Contents` into one stream.
///
/// Leaves the page alone when any part cannot be decoded.
pub fn consolidate_contents(doc: &mut Document, page: &ContentOwner) -> Result<bool> {
    let parts = match doc
        .get_object(page.id())
        .ok()
        .and_then(object_dict)
        .and_then(|dict| dict.get(b"Contents").ok())
        .and_then(|value| doc.dereference(value).ok())
    {
        Some((_, Object::Array(parts))) if parts.len() > 1 => parts.clone(),
        _ => return Ok(false),
    };

    let mut merged = Vec::new();
    for part in &parts {
        let decoded = part
            .as_reference()
            .ok()
            .and_then(|id| doc.get_object(id).ok())
            .and_then(|object| object.as_stream().ok())
            .map(owner::decode_stream);
        match decoded {
            Some(Ok(bytes)) => {
                if !merged.is_empty() {
                    merged.push(b'\n');
                }
                merged.extend(bytes);
            }
            Some(Err(err)) => {
                warn!(page = ?page.id(), %err, "content stream cannot be decoded, not consolidating");
                return Ok(false);
            }
            None => {
                warn!(page = ?page.id(), "content entry is not a stream, not consolidating");
                return Ok(false);
            }
        }
    }

    let stream_id = doc.add_object(Stream::new(dictionary! {}, merged));
    DictPath::object(page.id())
        .dict_mut(doc)?
        .set("Contents", Object::Reference(stream_id));
    debug!(page = ?page.id(), parts = parts.len(), "consolidated content streams");
    Ok(true)
}

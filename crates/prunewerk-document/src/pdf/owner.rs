// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content owners — pages, forms, tiling patterns and transparency groups, the
// objects that carry both an instruction stream and a resource dictionary.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use prunewerk_core::OwnerKind;
use prunewerk_core::error::{PrunewerkError, Result};

use super::resources::{DictPath, ResourceDictionary, object_dict};

/// Upper bound on `/Parent` hops when resolving inherited page attributes.
const MAX_TREE_DEPTH: usize = 64;

// -- Geometry -----------------------------------------------------------------

/// A six-coefficient transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f32; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    /// Parse a `[a b c d e f]` array, following indirect references.
    pub fn from_object(doc: &Document, object: &Object) -> Option<Self> {
        let values = numbers(doc, object)?;
        let coefficients: [f32; 6] = values.try_into().ok()?;
        Some(Self(coefficients))
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// A rectangle with its corners normalised to lower-left / upper-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl Rect {
    pub fn from_object(doc: &Document, object: &Object) -> Option<Self> {
        let [x0, y0, x1, y1]: [f32; 4] = numbers(doc, object)?.try_into().ok()?;
        Some(Self {
            llx: x0.min(x1),
            lly: y0.min(y1),
            urx: x0.max(x1),
            ury: y0.max(y1),
        })
    }
}

fn numbers(doc: &Document, object: &Object) -> Option<Vec<f32>> {
    let (_, array) = doc.dereference(object).ok()?;
    array
        .as_array()
        .ok()?
        .iter()
        .map(|item| doc.dereference(item).ok()?.1.as_float().ok())
        .collect()
}

/// The `/Matrix` of the dictionary at `path`.
pub fn matrix_at(doc: &Document, path: &DictPath) -> Option<Matrix> {
    let value = path.resolve(doc)?.get(b"Matrix").ok()?;
    Matrix::from_object(doc, value)
}

/// Remove the `/Matrix` entry at `path`. Returns whether one was present.
pub fn clear_matrix_at(doc: &mut Document, path: &DictPath) -> Result<bool> {
    Ok(path.dict_mut(doc)?.remove(b"Matrix").is_some())
}

/// Decoded body of a stream, decompressing only when a filter is declared.
pub fn decode_stream(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .map_err(|err| PrunewerkError::PdfError(format!("cannot decode stream: {}", err)))
    } else {
        Ok(stream.content.clone())
    }
}

// -- Content owner ------------------------------------------------------------

/// Handle to a content owner inside a document's object table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentOwner {
    id: ObjectId,
    kind: OwnerKind,
}

impl ContentOwner {
    pub fn new(id: ObjectId, kind: OwnerKind) -> Self {
        Self { id, kind }
    }

    pub fn page(id: ObjectId) -> Self {
        Self::new(id, OwnerKind::Page)
    }

    pub fn form(id: ObjectId) -> Self {
        Self::new(id, OwnerKind::Form)
    }

    pub fn tiling_pattern(id: ObjectId) -> Self {
        Self::new(id, OwnerKind::TilingPattern)
    }

    pub fn transparency_group(id: ObjectId) -> Self {
        Self::new(id, OwnerKind::TransparencyGroup)
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> OwnerKind {
        self.kind
    }

    pub fn is_page(&self) -> bool {
        self.kind == OwnerKind::Page
    }

    fn path(&self) -> DictPath {
        DictPath::object(self.id)
    }

    fn dict<'a>(&self, doc: &'a Document) -> Option<&'a Dictionary> {
        object_dict(doc.get_object(self.id).ok()?)
    }

    /// The decoded instruction stream. Pages concatenate every `/Contents`
    /// stream. `Ok(None)` when the owner has no content at all.
    pub fn instruction_stream(&self, doc: &Document) -> Result<Option<Vec<u8>>> {
        if self.is_page() {
            let has_contents = self.dict(doc).is_some_and(|dict| dict.has(b"Contents"));
            let parts = doc.get_page_contents(self.id);
            if !has_contents || parts.is_empty() {
                return Ok(None);
            }
            let mut joined = Vec::new();
            for id in parts {
                let stream = stream_object(doc, id)?;
                if !joined.is_empty() {
                    joined.push(b'\n');
                }
                joined.extend(decode_stream(stream)?);
            }
            Ok(Some(joined))
        } else {
            Ok(Some(decode_stream(stream_object(doc, self.id)?)?))
        }
    }

    /// The resource dictionary in effect for this owner. Pages inherit one
    /// through `/Parent` when they lack their own.
    pub fn resources(&self, doc: &Document) -> Option<ResourceDictionary> {
        let holder = if self.is_page() {
            inherited_holder(doc, self.id, b"Resources", false)?
        } else {
            self.id
        };
        DictPath::object(holder)
            .child(doc, b"Resources")
            .map(ResourceDictionary::at)
    }

    pub fn matrix_attribute(&self, doc: &Document) -> Option<Matrix> {
        matrix_at(doc, &self.path())
    }

    pub fn clear_matrix_attribute(&self, doc: &mut Document) -> Result<bool> {
        clear_matrix_at(doc, &self.path())
    }

    // -- Page attributes ------------------------------------------------------

    /// Effective `/Rotate` in degrees, 0 when unset.
    pub fn rotation(&self, doc: &Document) -> i64 {
        inherited_value(doc, self.id, b"Rotate", false)
            .and_then(|value| doc.dereference(value).ok())
            .and_then(|(_, value)| value.as_i64().ok())
            .unwrap_or(0)
    }

    /// Drop the page's own `/Rotate` when it is a multiple of 360 and nothing
    /// it would otherwise inherit rotates the page.
    pub fn clear_rotation_if_default(&self, doc: &mut Document) -> Result<bool> {
        if !self.is_page() {
            return Ok(false);
        }
        let Some(own) = self
            .dict(doc)
            .and_then(|dict| dict.get(b"Rotate").ok())
            .and_then(|value| doc.dereference(value).ok())
            .and_then(|(_, value)| value.as_i64().ok())
        else {
            return Ok(false);
        };
        let inherited = inherited_value(doc, self.id, b"Rotate", true)
            .and_then(|value| doc.dereference(value).ok())
            .and_then(|(_, value)| value.as_i64().ok())
            .unwrap_or(0);
        if own.rem_euclid(360) != 0 || inherited.rem_euclid(360) != 0 {
            return Ok(false);
        }
        Ok(self.path().dict_mut(doc)?.remove(b"Rotate").is_some())
    }

    /// Effective `/CropBox`, inherited when the page has none of its own.
    pub fn crop_box(&self, doc: &Document) -> Option<Rect> {
        inherited_value(doc, self.id, b"CropBox", false)
            .and_then(|value| Rect::from_object(doc, value))
    }

    /// Effective `/MediaBox`.
    pub fn media_box(&self, doc: &Document) -> Option<Rect> {
        inherited_value(doc, self.id, b"MediaBox", false)
            .and_then(|value| Rect::from_object(doc, value))
    }

    /// Drop the page's own `/CropBox` when the page would get the same box
    /// without it: an inherited crop box, or else the media box.
    pub fn clear_crop_box_if_redundant(&self, doc: &mut Document) -> Result<bool> {
        if !self.is_page() {
            return Ok(false);
        }
        let Some(own) = self
            .dict(doc)
            .and_then(|dict| dict.get(b"CropBox").ok())
            .and_then(|value| Rect::from_object(doc, value))
        else {
            return Ok(false);
        };
        let fallback = match inherited_value(doc, self.id, b"CropBox", true) {
            Some(value) => Rect::from_object(doc, value),
            None => self.media_box(doc),
        };
        if fallback != Some(own) {
            return Ok(false);
        }
        Ok(self.path().dict_mut(doc)?.remove(b"CropBox").is_some())
    }
}

fn stream_object(doc: &Document, id: ObjectId) -> Result<&Stream> {
    doc.get_object(id)
        .and_then(Object::as_stream)
        .map_err(|err| PrunewerkError::PdfError(format!("object {:?} is not a stream: {}", id, err)))
}

/// The page-tree node (the page itself, or an ancestor) that holds `key`.
fn inherited_holder(doc: &Document, page: ObjectId, key: &[u8], skip_self: bool) -> Option<ObjectId> {
    let mut current = page;
    for depth in 0..MAX_TREE_DEPTH {
        let dict = object_dict(doc.get_object(current).ok()?)?;
        if (depth > 0 || !skip_self) && dict.has(key) {
            return Some(current);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

fn inherited_value<'a>(doc: &'a Document, page: ObjectId, key: &[u8], skip_self: bool) -> Option<&'a Object> {
    let holder = inherited_holder(doc, page, key, skip_self)?;
    object_dict(doc.get_object(holder).ok()?)?.get(key).ok()
}

/// Every page of the document, in page order, with its 1-based number.
pub fn content_owners(doc: &Document) -> Vec<(u32, ContentOwner)> {
    doc.get_pages()
        .into_iter()
        .map(|(number, id)| (number, ContentOwner::page(id)))
        .collect()
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resource dictionary model on top of `lopdf`.
//
// A resource dictionary maps resource class (font, xobject, pattern, shading,
// extgstate) to a name → resource table. Any of these dictionaries may be
// inline or behind an indirect reference, so each is addressed by a
// `DictPath`: the indirect object that physically holds it plus the chain of
// direct keys leading to it.

use lopdf::{Dictionary, Document, Object, ObjectId};
use prunewerk_core::ResourceClass;
use prunewerk_core::error::{PrunewerkError, Result};
use tracing::warn;

use crate::fonts;

// -- Dictionary addressing ----------------------------------------------------

/// Location of a dictionary inside a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DictPath {
    root: ObjectId,
    keys: Vec<Vec<u8>>,
}

impl DictPath {
    /// The dictionary of an indirect object (a stream's dictionary for streams).
    pub fn object(id: ObjectId) -> Self {
        Self {
            root: id,
            keys: Vec::new(),
        }
    }

    /// The indirect object holding this dictionary.
    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// True when the dictionary is the object itself rather than nested in it.
    pub fn is_object(&self) -> bool {
        self.keys.is_empty()
    }

    /// Path of the dictionary stored under `key`, following an indirect
    /// reference if there is one. `None` if the entry is missing or is not a
    /// dictionary.
    pub fn child(&self, doc: &Document, key: &[u8]) -> Option<DictPath> {
        let value = self.resolve(doc)?.get(key).ok()?;
        match value {
            Object::Dictionary(_) => {
                let mut keys = self.keys.clone();
                keys.push(key.to_vec());
                Some(Self {
                    root: self.root,
                    keys,
                })
            }
            Object::Reference(_) => match doc.dereference(value).ok()? {
                (Some(id), target) if object_dict(target).is_some() => Some(Self::object(id)),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn resolve<'a>(&self, doc: &'a Document) -> Option<&'a Dictionary> {
        let mut dict = object_dict(doc.get_object(self.root).ok()?)?;
        for key in &self.keys {
            dict = dict.get(key).ok()?.as_dict().ok()?;
        }
        Some(dict)
    }

    pub fn resolve_mut<'a>(&self, doc: &'a mut Document) -> Option<&'a mut Dictionary> {
        let mut dict = object_dict_mut(doc.get_object_mut(self.root).ok()?)?;
        for key in &self.keys {
            dict = dict.get_mut(key).ok()?.as_dict_mut().ok()?;
        }
        Some(dict)
    }

    /// Mutable access, as an error when the dictionary has gone away.
    pub fn dict_mut<'a>(&self, doc: &'a mut Document) -> Result<&'a mut Dictionary> {
        self.resolve_mut(doc).ok_or_else(|| {
            PrunewerkError::PdfError(format!(
                "dictionary {:?}/{} is no longer reachable",
                self.root,
                self.keys
                    .iter()
                    .map(|k| String::from_utf8_lossy(k).into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            ))
        })
    }
}

/// The dictionary of a dictionary or stream object.
pub fn object_dict(object: &Object) -> Option<&Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

pub fn object_dict_mut(object: &mut Object) -> Option<&mut Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&mut stream.dict),
        _ => None,
    }
}

fn name_of<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    dict.get(key).ok()?.as_name().ok()
}

fn int_of(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    let value = dict.get(key).ok()?;
    doc.dereference(value).ok()?.1.as_i64().ok()
}

// -- Resource kinds -----------------------------------------------------------

/// An `/XObject` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XObject {
    Form(ObjectId),
    Image(ObjectId),
    /// Unknown subtype, or an entry that does not resolve to a stream.
    Other,
}

/// A `/Pattern` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// PatternType 1: a stream with its own content.
    Tiling(ObjectId),
    /// PatternType 2: a dictionary wrapping a shading.
    Shading(DictPath),
    Other,
}

/// A `/Shading` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shading {
    pub path: DictPath,
    pub shading_type: Option<i64>,
}

impl Shading {
    pub fn at(doc: &Document, path: DictPath) -> Self {
        let shading_type = path
            .resolve(doc)
            .and_then(|dict| int_of(doc, dict, b"ShadingType"));
        Self { path, shading_type }
    }

    /// Only function-based shadings carry a `/Matrix`.
    pub fn is_function_based(&self) -> bool {
        self.shading_type == Some(1)
    }
}

/// An `/ExtGState` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtGState {
    pub path: DictPath,
}

impl ExtGState {
    /// The soft mask dictionary, unless absent or `/None`.
    pub fn soft_mask(&self, doc: &Document) -> Option<SoftMask> {
        self.path.child(doc, b"SMask").map(|path| SoftMask { path })
    }
}

/// A soft-mask dictionary inside an extended graphics state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftMask {
    pub path: DictPath,
}

impl SoftMask {
    /// The transparency group stream under `/G`.
    pub fn group(&self, doc: &Document) -> Option<ObjectId> {
        let value = self.path.resolve(doc)?.get(b"G").ok()?;
        match doc.dereference(value).ok()? {
            (Some(id), Object::Stream(_)) => Some(id),
            _ => None,
        }
    }
}

/// Read-only view of a font dictionary.
#[derive(Debug, Clone, Copy)]
pub struct FontResource<'a> {
    doc: &'a Document,
    id: Option<ObjectId>,
    dict: &'a Dictionary,
}

impl<'a> FontResource<'a> {
    /// Resolve a `/Font` entry value.
    pub fn from_entry(doc: &'a Document, value: &'a Object) -> Option<Self> {
        let (id, target) = doc.dereference(value).ok()?;
        Some(Self {
            doc,
            id,
            dict: target.as_dict().ok()?,
        })
    }

    /// The indirect object holding the font, `None` for an inline dictionary.
    pub fn object_id(&self) -> Option<ObjectId> {
        self.id
    }

    pub fn dictionary(&self) -> &'a Dictionary {
        self.dict
    }

    pub fn subtype(&self) -> Option<&'a [u8]> {
        name_of(self.dict, b"Subtype")
    }

    /// Raw `/BaseFont` name.
    pub fn base_font(&self) -> Option<&'a [u8]> {
        name_of(self.dict, b"BaseFont")
    }

    /// `/BaseFont` as text, empty when absent.
    pub fn declared_name(&self) -> String {
        self.base_font()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .unwrap_or_default()
    }

    /// True when the font, or a composite font's descendant, carries a font
    /// program.
    pub fn is_embedded(&self) -> bool {
        if has_font_file(self.doc, self.dict) {
            return true;
        }
        let Ok(descendants) = self.dict.get(b"DescendantFonts") else {
            return false;
        };
        let Ok((_, Object::Array(descendants))) = self.doc.dereference(descendants) else {
            return false;
        };
        descendants.iter().any(|descendant| {
            self.doc
                .dereference(descendant)
                .ok()
                .and_then(|(_, object)| object.as_dict().ok())
                .is_some_and(|dict| has_font_file(self.doc, dict))
        })
    }

    /// A non-embedded Type1 font whose base name is one of the standard 14.
    pub fn is_standard14(&self) -> bool {
        self.subtype() == Some(b"Type1".as_slice())
            && self.base_font().is_some_and(fonts::is_standard_14)
            && !self.is_embedded()
    }

    pub fn is_type3(&self) -> bool {
        self.subtype() == Some(b"Type3".as_slice())
    }

    /// Glyph procedure streams of a Type3 font.
    pub fn char_procs(&self) -> Vec<ObjectId> {
        let Some(procs) = self
            .dict
            .get(b"CharProcs")
            .ok()
            .and_then(|value| self.doc.dereference(value).ok())
            .and_then(|(_, object)| object.as_dict().ok())
        else {
            return Vec::new();
        };
        procs
            .iter()
            .filter_map(|(_, value)| value.as_reference().ok())
            .collect()
    }

    pub fn has_resources(&self) -> bool {
        self.dict.has(b"Resources")
    }
}

fn has_font_file(doc: &Document, font: &Dictionary) -> bool {
    let Some(descriptor) = font
        .get(b"FontDescriptor")
        .ok()
        .and_then(|value| doc.dereference(value).ok())
        .and_then(|(_, object)| object.as_dict().ok())
    else {
        return false;
    };
    [&b"FontFile"[..], b"FontFile2", b"FontFile3"]
        .iter()
        .any(|key| descriptor.has(key))
}

// -- Resource dictionary ------------------------------------------------------

/// A `/Resources` dictionary attached to a content owner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceDictionary {
    path: DictPath,
}

impl ResourceDictionary {
    pub fn at(path: DictPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &DictPath {
        &self.path
    }

    /// The name → resource table of one class.
    pub fn class_path(&self, doc: &Document, class: ResourceClass) -> Option<DictPath> {
        self.path.child(doc, class.key())
    }

    /// Snapshot of the declared names of one class.
    ///
    /// Taken before any deletion so that removal never runs while the same
    /// dictionary is being enumerated.
    pub fn names(&self, doc: &Document, class: ResourceClass) -> Vec<Vec<u8>> {
        self.class_path(doc, class)
            .and_then(|path| path.resolve(doc))
            .map(|dict| dict.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    /// The raw entry for `name`, possibly an indirect reference.
    pub fn entry<'a>(
        &self,
        doc: &'a Document,
        class: ResourceClass,
        name: &[u8],
    ) -> Option<&'a Object> {
        let path = self.class_path(doc, class)?;
        path.resolve(doc)?.get(name).ok()
    }

    /// Path of the dictionary (or stream dictionary) an entry resolves to.
    pub fn entry_path(&self, doc: &Document, class: ResourceClass, name: &[u8]) -> Option<DictPath> {
        self.class_path(doc, class)?.child(doc, name)
    }

    /// Delete an entry. Returns the removed value.
    pub fn remove(
        &self,
        doc: &mut Document,
        class: ResourceClass,
        name: &[u8],
    ) -> Result<Option<Object>> {
        let Some(path) = self.class_path(doc, class) else {
            return Ok(None);
        };
        Ok(path.dict_mut(doc)?.remove(name))
    }

    /// Bind `name` to `value`, replacing any previous entry.
    pub fn put(
        &self,
        doc: &mut Document,
        class: ResourceClass,
        name: &[u8],
        value: Object,
    ) -> Result<()> {
        match self.class_path(doc, class) {
            Some(path) => path.dict_mut(doc)?.set(name.to_vec(), value),
            None => {
                let mut table = Dictionary::new();
                table.set(name.to_vec(), value);
                self.path.dict_mut(doc)?.set(class.key(), Object::Dictionary(table));
            }
        }
        Ok(())
    }

    // -- Typed accessors ------------------------------------------------------

    pub fn fonts<'a>(&self, doc: &'a Document) -> Vec<(Vec<u8>, FontResource<'a>)> {
        self.names(doc, ResourceClass::Font)
            .into_iter()
            .filter_map(|name| {
                let entry = self.entry(doc, ResourceClass::Font, &name)?;
                let font = FontResource::from_entry(doc, entry);
                if font.is_none() {
                    warn!(name = %String::from_utf8_lossy(&name), "font entry does not resolve to a dictionary");
                }
                Some((name, font?))
            })
            .collect()
    }

    pub fn remove_font(&self, doc: &mut Document, name: &[u8]) -> Result<Option<Object>> {
        self.remove(doc, ResourceClass::Font, name)
    }

    pub fn put_font(&self, doc: &mut Document, name: &[u8], value: Object) -> Result<()> {
        self.put(doc, ResourceClass::Font, name, value)
    }

    pub fn external_objects(&self, doc: &Document) -> Vec<(Vec<u8>, XObject)> {
        self.names(doc, ResourceClass::ExternalObject)
            .into_iter()
            .map(|name| {
                let kind = self
                    .entry(doc, ResourceClass::ExternalObject, &name)
                    .and_then(|entry| doc.dereference(entry).ok())
                    .map_or(XObject::Other, |resolved| match resolved {
                        (Some(id), Object::Stream(stream)) => {
                            match name_of(&stream.dict, b"Subtype") {
                                Some(b"Form") => XObject::Form(id),
                                Some(b"Image") => XObject::Image(id),
                                _ => XObject::Other,
                            }
                        }
                        _ => XObject::Other,
                    });
                (name, kind)
            })
            .collect()
    }

    pub fn patterns(&self, doc: &Document) -> Vec<(Vec<u8>, Pattern)> {
        self.names(doc, ResourceClass::Pattern)
            .into_iter()
            .map(|name| {
                let kind = match self.entry_path(doc, ResourceClass::Pattern, &name) {
                    Some(path) => {
                        let pattern_type = path
                            .resolve(doc)
                            .and_then(|dict| int_of(doc, dict, b"PatternType"));
                        let is_stream = matches!(
                            doc.get_object(path.root()),
                            Ok(Object::Stream(_))
                        ) && path.is_object();
                        match pattern_type {
                            Some(1) if is_stream => Pattern::Tiling(path.root()),
                            Some(2) => Pattern::Shading(path),
                            _ => Pattern::Other,
                        }
                    }
                    None => Pattern::Other,
                };
                (name, kind)
            })
            .collect()
    }

    pub fn shadings(&self, doc: &Document) -> Vec<(Vec<u8>, Shading)> {
        self.names(doc, ResourceClass::Shading)
            .into_iter()
            .filter_map(|name| {
                let path = self.entry_path(doc, ResourceClass::Shading, &name)?;
                Some((name, Shading::at(doc, path)))
            })
            .collect()
    }

    pub fn ext_gstates(&self, doc: &Document) -> Vec<(Vec<u8>, ExtGState)> {
        self.names(doc, ResourceClass::ExtGState)
            .into_iter()
            .filter_map(|name| {
                let path = self.entry_path(doc, ResourceClass::ExtGState, &name)?;
                Some((name, ExtGState { path }))
            })
            .collect()
    }
}

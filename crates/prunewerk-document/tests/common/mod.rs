// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory document builder shared by the integration tests.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use prunewerk_core::ResourceClass;
use prunewerk_document::pdf::ContentOwner;

/// Builds a single-level page tree. Objects may be added before or between
/// pages; `finish` writes the `/Pages` node and catalog.
pub struct DocBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl DocBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn add(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    pub fn content(&mut self, content: Vec<u8>) -> ObjectId {
        self.add(Stream::new(dictionary! {}, content))
    }

    pub fn form(&mut self, extra: Dictionary, content: Vec<u8>) -> ObjectId {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
        };
        for (key, value) in extra.iter() {
            dict.set(key.clone(), value.clone());
        }
        self.add(Stream::new(dict, content))
    }

    pub fn page(&mut self, contents: ObjectId, resources: impl Into<Object>) -> ObjectId {
        self.page_with(contents, resources, Dictionary::new())
    }

    pub fn page_with(
        &mut self,
        contents: ObjectId,
        resources: impl Into<Object>,
        extra: Dictionary,
    ) -> ObjectId {
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => contents,
            "Resources" => resources.into(),
        };
        for (key, value) in extra.iter() {
            page.set(key.clone(), value.clone());
        }
        let id = self.add(page);
        self.kids.push(id);
        id
    }

    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => count }),
        );
        let catalog = dictionary! { "Type" => "Catalog", "Pages" => self.pages_id };
        let catalog_id = self.add(catalog);
        self.doc.trailer.set("Root", catalog_id);
        self.doc
    }
}

/// `BT /<name> <size> Tf (<text>) Tj ET`, encoded.
pub fn show_text(font: &str, size: i64, text: &str) -> Vec<u8> {
    Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), size.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    }
    .encode()
    .unwrap()
}

pub fn standard_font(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// A TrueType font carrying its own program.
pub fn embedded_font(builder: &mut DocBuilder, base_font: &str) -> ObjectId {
    let program = builder.add(Stream::new(dictionary! {}, vec![0, 1, 0, 0]));
    let descriptor = builder.add(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => base_font,
        "FontFile2" => program,
    });
    builder.add(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => base_font,
        "FontDescriptor" => descriptor,
    })
}

pub fn identity() -> Object {
    Object::Array(vec![1.into(), 0.into(), 0.into(), 1.into(), 0.into(), 0.into()])
}

/// Declared names of one class on a page or nested owner, in byte order.
pub fn declared(doc: &Document, owner: ContentOwner, class: ResourceClass) -> Vec<String> {
    owner
        .resources(doc)
        .map(|resources| resources.names(doc, class))
        .unwrap_or_default()
        .into_iter()
        .map(|name| String::from_utf8_lossy(&name).into_owned())
        .collect()
}

/// The object a font entry points at.
pub fn font_target(doc: &Document, owner: ContentOwner, name: &str) -> ObjectId {
    owner
        .resources(doc)
        .unwrap()
        .entry(doc, ResourceClass::Font, name.as_bytes())
        .unwrap()
        .as_reference()
        .unwrap()
}

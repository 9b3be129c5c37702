// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Canonical standard 14 fonts.
//
// Non-embedded standard fonts are fully described by their name and encoding,
// so every such font in a document can share one font object. The canonical
// descriptions are process-wide constants built once on first use; each
// document materialises them as indirect objects at most once.

use std::collections::HashMap;
use std::sync::LazyLock;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};

use crate::pdf::resources::FontResource;

/// The standard 14 base fonts.
const STANDARD_14: [&str; 14] = [
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Symbol",
    "ZapfDingbats",
];

/// Predefined encodings a simple font may name in `/Encoding`.
pub const PREDEFINED_ENCODINGS: [&str; 4] = [
    "StandardEncoding",
    "WinAnsiEncoding",
    "MacRomanEncoding",
    "MacExpertEncoding",
];

/// One canonical instance per base font and encoding: first the font with no
/// `/Encoding`, then one per predefined encoding.
static CANONICAL_FONTS: LazyLock<Vec<StandardFont>> = LazyLock::new(|| {
    STANDARD_14
        .iter()
        .flat_map(|&name| {
            std::iter::once(None)
                .chain(PREDEFINED_ENCODINGS.iter().copied().map(Some))
                .map(move |encoding| StandardFont::new(name, encoding))
        })
        .collect()
});

/// One immutable canonical standard font.
#[derive(Debug)]
pub struct StandardFont {
    base_font: &'static str,
    encoding: Option<&'static str>,
    dictionary: Dictionary,
}

impl StandardFont {
    fn new(base_font: &'static str, encoding: Option<&'static str>) -> Self {
        let mut dictionary = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base_font,
        };
        if let Some(encoding) = encoding {
            dictionary.set("Encoding", Object::Name(encoding.as_bytes().to_vec()));
        }
        Self {
            base_font,
            encoding,
            dictionary,
        }
    }

    pub fn base_font(&self) -> &'static str {
        self.base_font
    }

    /// The `/Encoding` name of this instance, if it has one.
    pub fn encoding(&self) -> Option<&'static [u8]> {
        self.encoding.map(str::as_bytes)
    }

    /// The font dictionary every substituted slot will share.
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Whether `font` renders identically to this canonical instance: a
    /// non-embedded standard font of the same name with the same encoding.
    pub fn matches(&self, font: &FontResource<'_>) -> bool {
        font.is_standard14()
            && font.base_font() == Some(self.base_font.as_bytes())
            && encoding_name(font.dictionary()) == Some(self.encoding())
    }

    /// Whether `dict` already is this canonical description, entry for entry.
    pub fn is_canonical_form(&self, dict: &Dictionary) -> bool {
        dict.len() == self.dictionary.len()
            && dict.get(b"Type").and_then(Object::as_name).ok() == Some(b"Font".as_slice())
            && dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Type1".as_slice())
            && dict.get(b"BaseFont").and_then(Object::as_name).ok()
                == Some(self.base_font.as_bytes())
            && encoding_name(dict) == Some(self.encoding())
    }

    fn key(&self) -> (&'static str, Option<&'static str>) {
        (self.base_font, self.encoding)
    }
}

/// `Some(None)` when `/Encoding` is absent, `Some(Some(name))` for a name,
/// `None` for anything else (a differences dictionary, say).
fn encoding_name(dict: &Dictionary) -> Option<Option<&[u8]>> {
    match dict.get(b"Encoding") {
        Err(_) => Some(None),
        Ok(Object::Name(name)) => Some(Some(name.as_slice())),
        Ok(_) => None,
    }
}

/// The canonical instance for a base font name and `/Encoding`. Both are
/// matched case-sensitively; `None` for unknown fonts or encodings.
pub fn canonical_variant(
    base_font: &[u8],
    encoding: Option<&[u8]>,
) -> Option<&'static StandardFont> {
    CANONICAL_FONTS
        .iter()
        .find(|font| font.base_font.as_bytes() == base_font && font.encoding() == encoding)
}

/// The canonical instance without `/Encoding` for a base font name.
pub fn canonical_font(base_font: &[u8]) -> Option<&'static StandardFont> {
    canonical_variant(base_font, None)
}

/// The canonical instance `font` can be rebound to, if any.
pub fn canonical_for(font: &FontResource<'_>) -> Option<&'static StandardFont> {
    if !font.is_standard14() {
        return None;
    }
    let encoding = encoding_name(font.dictionary())?;
    canonical_variant(font.base_font()?, encoding)
}

pub fn is_standard_14(base_font: &[u8]) -> bool {
    canonical_font(base_font).is_some()
}

/// Per-document record of which object holds each canonical font.
#[derive(Debug, Default)]
pub struct CanonicalFonts {
    objects: HashMap<(&'static str, Option<&'static str>), ObjectId>,
}

impl CanonicalFonts {
    pub fn new() -> Self {
        Self::default()
    }

    /// The object already holding `font` in this document, if any.
    pub fn object_id(&self, font: &StandardFont) -> Option<ObjectId> {
        self.objects.get(&font.key()).copied()
    }

    /// Record an existing object as the document's copy of `font`.
    pub fn adopt(&mut self, font: &'static StandardFont, id: ObjectId) {
        self.objects.entry(font.key()).or_insert(id);
    }

    /// The document's copy of `font`, adding it on first use.
    pub fn materialize(&mut self, doc: &mut Document, font: &'static StandardFont) -> ObjectId {
        *self
            .objects
            .entry(font.key())
            .or_insert_with(|| doc.add_object(font.dictionary().clone()))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_return_the_same_instance() {
        let first = canonical_font(b"Helvetica").unwrap();
        let second = canonical_font(b"Helvetica").unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn lookups_are_shared_across_threads() {
        let here = canonical_font(b"Courier").unwrap() as *const StandardFont as usize;
        let there = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| canonical_font(b"Courier").unwrap() as *const StandardFont as usize)
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });
        assert!(there.iter().all(|&p| p == here));
    }

    #[test]
    fn names_match_case_sensitively() {
        assert!(is_standard_14(b"ZapfDingbats"));
        assert!(!is_standard_14(b"helvetica"));
        assert!(!is_standard_14(b"Arial"));
    }

    #[test]
    fn plain_instance_has_no_encoding() {
        let helvetica = canonical_font(b"Helvetica").unwrap();
        assert_eq!(helvetica.encoding(), None);
        assert!(!helvetica.dictionary().has(b"Encoding"));
        assert!(helvetica.is_canonical_form(helvetica.dictionary()));
    }

    #[test]
    fn each_predefined_encoding_has_its_own_instance() {
        let plain = canonical_font(b"Times-Roman").unwrap();
        let win = canonical_variant(b"Times-Roman", Some(b"WinAnsiEncoding")).unwrap();
        let mac = canonical_variant(b"Times-Roman", Some(b"MacRomanEncoding")).unwrap();
        assert!(!std::ptr::eq(plain, win));
        assert!(!std::ptr::eq(win, mac));
        assert_eq!(win.encoding(), Some(&b"WinAnsiEncoding"[..]));
        assert!(win.is_canonical_form(win.dictionary()));
        assert!(!plain.is_canonical_form(win.dictionary()));
        assert!(canonical_variant(b"Times-Roman", Some(b"PDFDocEncoding")).is_none());
    }

    #[test]
    fn extra_entries_are_not_canonical_form() {
        let helvetica = canonical_font(b"Helvetica").unwrap();
        let mut dict = helvetica.dictionary().clone();
        dict.set("Name", "F1");
        assert!(!helvetica.is_canonical_form(&dict));
    }

    #[test]
    fn fonts_map_to_the_instance_with_their_encoding() {
        let doc = Document::with_version("1.5");
        let bare = Object::Dictionary(dictionary! { "Subtype" => "Type1", "BaseFont" => "Helvetica" });
        let mac = Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "MacRomanEncoding",
        });
        let differences = Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => dictionary! { "Differences" => vec![32.into(), Object::Name(b"bullet".to_vec())] },
        });

        let bare = FontResource::from_entry(&doc, &bare).unwrap();
        let target = canonical_for(&bare).unwrap();
        assert!(std::ptr::eq(target, canonical_font(b"Helvetica").unwrap()));
        assert!(target.matches(&bare));

        let mac = FontResource::from_entry(&doc, &mac).unwrap();
        assert_eq!(canonical_for(&mac).unwrap().encoding(), Some(&b"MacRomanEncoding"[..]));
        assert!(!target.matches(&mac));

        assert!(canonical_for(&FontResource::from_entry(&doc, &differences).unwrap()).is_none());
    }

    #[test]
    fn materialize_adds_one_object_per_font() {
        let mut doc = Document::with_version("1.5");
        let mut cache = CanonicalFonts::new();
        let helvetica = canonical_font(b"Helvetica").unwrap();
        let first = cache.materialize(&mut doc, helvetica);
        let second = cache.materialize(&mut doc, helvetica);
        assert_eq!(first, second);
        assert_eq!(doc.objects.len(), 1);
        assert_eq!(cache.object_id(helvetica), Some(first));
    }

    #[test]
    fn encodings_get_separate_objects() {
        let mut doc = Document::with_version("1.5");
        let mut cache = CanonicalFonts::new();
        let plain = cache.materialize(&mut doc, canonical_font(b"Courier").unwrap());
        let win = cache.materialize(
            &mut doc,
            canonical_variant(b"Courier", Some(b"WinAnsiEncoding")).unwrap(),
        );
        assert_ne!(plain, win);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn adopt_keeps_the_first_object() {
        let mut cache = CanonicalFonts::new();
        let courier = canonical_font(b"Courier").unwrap();
        cache.adopt(courier, (3, 0));
        cache.adopt(courier, (9, 0));
        assert_eq!(cache.object_id(courier), Some((3, 0)));
        assert_eq!(cache.len(), 1);
    }
}

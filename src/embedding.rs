use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use owned_ttf_parser::{AsFaceRef as _, Face, GlyphId, OwnedFace};

use crate::error::{ContextError, ErrorKind};

/// A block of consecutive `bfchar` entries, glyph ID to character.
type CmapBlock = Vec<(u16, char)>;

/// A whole TrueType or OpenType font file, ready to be embedded as a composite font.
pub(crate) struct EmbeddedFont {
    /// The byte data the font was loaded from.
    bytes: Vec<u8>,
    face: OwnedFace,
    /// The `BaseFont` name the font is embedded under.
    face_identifier: String,
}

impl std::fmt::Debug for EmbeddedFont {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("EmbeddedFont")
            .field("face_identifier", &self.face_identifier)
            .field("length", &self.bytes.len())
            .finish()
    }
}

impl EmbeddedFont {
    /// Load a font file. For collections (`.ttc`) the first face is used.
    pub(crate) fn from_path(path: &Path) -> Result<Self, ContextError> {
        let bytes = std::fs::read(path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Insertion,
                format!("Unable to read the font file {:?}", path),
                &error,
            )
        })?;
        let face = OwnedFace::from_vec(bytes.clone(), 0).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Insertion,
                format!("Failed to parse the font {:?}", path),
                &error,
            )
        })?;
        // PDF names cannot hold spaces, keep the file stem readable nevertheless
        let face_identifier: String = path
            .file_stem()
            .map(|stem| {
                stem.to_string_lossy()
                    .chars()
                    .filter(|character| character.is_ascii_alphanumeric() || *character == '-')
                    .collect()
            })
            .filter(|identifier: &String| !identifier.is_empty())
            .unwrap_or_else(|| "EmbeddedFont".to_string());

        Ok(Self {
            bytes,
            face,
            face_identifier,
        })
    }

    fn face(&self) -> &Face<'_> {
        self.face.as_face_ref()
    }

    pub(crate) fn name(&self) -> &str {
        &self.face_identifier
    }

    /// OpenType fonts with PostScript outlines are embedded as `FontFile3`, TrueType ones as `FontFile2`.
    fn has_cff_outlines(&self) -> bool {
        self.bytes.starts_with(b"OTTO")
    }

    /// Encode the text as big-endian glyph IDs, the encoding of an `Identity-H` font.
    pub(crate) fn encode(&self, text: &str) -> Result<Vec<u8>, ContextError> {
        let mut encoded = Vec::with_capacity(text.len() * 2);
        let mut missing = Vec::new();
        for character in text.chars() {
            match self.face().glyph_index(character) {
                Some(glyph_id) if glyph_id.0 != 0 => encoded.extend(glyph_id.0.to_be_bytes()),
                _ => missing.push(character),
            }
        }
        if !missing.is_empty() {
            return Err(ContextError::with_context(
                ErrorKind::Insertion,
                format!("The font {} has no glyph for {:?}", self.face_identifier, missing),
            ));
        }

        Ok(encoded)
    }

    /// The mapping between glyph IDs and the characters they draw, taken from the Unicode subtables.
    fn glyph_characters(&self) -> BTreeMap<u16, char> {
        let mut glyph_characters = BTreeMap::new();
        let Some(cmap) = self.face().tables().cmap else {
            return glyph_characters;
        };
        for subtable in cmap.subtables.into_iter().filter(|subtable| subtable.is_unicode()) {
            subtable.codepoints(|codepoint| {
                let Some(character) = char::from_u32(codepoint) else {
                    return;
                };
                if let Some(glyph_id) = subtable.glyph_index(codepoint).filter(|glyph_id| glyph_id.0 > 0) {
                    glyph_characters.entry(glyph_id.0).or_insert(character);
                }
            });
        }

        glyph_characters
    }

    /// Add the font and all its satellite objects to the document and return the ID of the `Type0` font dictionary.
    pub(crate) fn insert_into_document(&self, document: &mut Document) -> ObjectId {
        use lopdf::Object::{Array, Integer, Name, Reference};

        let face = self.face();
        let scale = 1000.0 / f32::from(face.units_per_em().max(1));
        let scaled = |value: i16| (f32::from(value) * scale).round() as i64;

        // Widths are grouped in runs of consecutive glyph IDs: `first [w1 w2 ...]`
        let mut width_objects = Vec::<Object>::new();
        let mut run_start = 0u16;
        let mut run = Vec::<Object>::new();
        for glyph_id in 0..face.number_of_glyphs() {
            let Some(advance) = face.glyph_hor_advance(GlyphId(glyph_id)) else {
                log::trace!("Glyph {} of {} has no advance", glyph_id, self.face_identifier);
                continue;
            };
            let width = Integer((f32::from(advance) * scale).round() as i64);
            if !run.is_empty() && usize::from(glyph_id) != usize::from(run_start) + run.len() {
                width_objects.push(Integer(i64::from(run_start)));
                width_objects.push(Array(std::mem::take(&mut run)));
            }
            if run.is_empty() {
                run_start = glyph_id;
            }
            run.push(width);
        }
        if !run.is_empty() {
            width_objects.push(Integer(i64::from(run_start)));
            width_objects.push(Array(run));
        }

        // Glyph IDs of one bfchar block must share their high byte, and a block holds at most 100 entries
        let mut blocks: Vec<CmapBlock> = Vec::new();
        let mut current_block = CmapBlock::new();
        let mut current_high_byte = 0u16;
        for (glyph_id, character) in self.glyph_characters() {
            if glyph_id >> 8 != current_high_byte || current_block.len() >= 100 {
                blocks.push(std::mem::take(&mut current_block));
                current_high_byte = glyph_id >> 8;
            }
            current_block.push((glyph_id, character));
        }
        blocks.push(current_block);
        let to_unicode = generate_cid_to_unicode_map(&self.face_identifier, blocks);
        let to_unicode_id = document.add_object(Stream::new(Dictionary::new(), to_unicode.into_bytes()));

        let (font_file_key, cid_font_subtype, font_stream) = if self.has_cff_outlines() {
            let dictionary = Dictionary::from_iter(vec![("Subtype", Name(b"OpenType".to_vec()))]);
            ("FontFile3", "CIDFontType0", Stream::new(dictionary, self.bytes.clone()))
        } else {
            let dictionary = Dictionary::from_iter(vec![("Length1", Integer(self.bytes.len() as i64))]);
            ("FontFile2", "CIDFontType2", Stream::new(dictionary, self.bytes.clone()))
        };
        let font_stream_id = document.add_object(font_stream.with_compression(false));

        let bounding_box = face.global_bounding_box();
        let ascent = scaled(face.ascender());
        let descriptor = Dictionary::from_iter(vec![
            ("Type", Name(b"FontDescriptor".to_vec())),
            ("FontName", Name(self.face_identifier.clone().into_bytes())),
            // Nonsymbolic: the font uses the standard Latin character set
            ("Flags", Integer(32)),
            (
                "FontBBox",
                Array(vec![
                    Integer(scaled(bounding_box.x_min)),
                    Integer(scaled(bounding_box.y_min)),
                    Integer(scaled(bounding_box.x_max)),
                    Integer(scaled(bounding_box.y_max)),
                ]),
            ),
            ("ItalicAngle", Integer(0)),
            ("Ascent", Integer(ascent)),
            ("Descent", Integer(scaled(face.descender()))),
            ("CapHeight", Integer(ascent)),
            ("StemV", Integer(80)),
            (font_file_key, Reference(font_stream_id)),
        ]);
        let descriptor_id = document.add_object(descriptor);

        let mut cid_font = Dictionary::from_iter(vec![
            ("Type", Name(b"Font".to_vec())),
            ("Subtype", Name(cid_font_subtype.as_bytes().to_vec())),
            ("BaseFont", Name(self.face_identifier.clone().into_bytes())),
            (
                "CIDSystemInfo",
                Object::Dictionary(Dictionary::from_iter(vec![
                    ("Registry", Object::String(b"Adobe".to_vec(), StringFormat::Literal)),
                    ("Ordering", Object::String(b"Identity".to_vec(), StringFormat::Literal)),
                    ("Supplement", Integer(0)),
                ])),
            ),
            ("FontDescriptor", Reference(descriptor_id)),
            ("W", Array(width_objects)),
            ("DW", Integer(1000)),
        ]);
        if cid_font_subtype == "CIDFontType2" {
            cid_font.set("CIDToGIDMap", Name(b"Identity".to_vec()));
        }
        let cid_font_id = document.add_object(cid_font);

        document.add_object(Dictionary::from_iter(vec![
            ("Type", Name(b"Font".to_vec())),
            ("Subtype", Name(b"Type0".to_vec())),
            ("BaseFont", Name(self.face_identifier.clone().into_bytes())),
            // Two-byte glyph IDs, horizontal writing
            ("Encoding", Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Array(vec![Reference(cid_font_id)])),
            ("ToUnicode", Reference(to_unicode_id)),
        ]))
    }
}

/// Build the `ToUnicode` CMap of an `Identity-H` font out of blocks of glyph ID to character entries.
fn generate_cid_to_unicode_map(face_name: &str, blocks: Vec<CmapBlock>) -> String {
    let mut cid_to_unicode_map = format!(include_str!("../assets/gid_to_unicode_beg.txt"), face_name);

    for block in blocks.into_iter().filter(|block| !block.is_empty()) {
        cid_to_unicode_map.push_str(&format!("{} beginbfchar\n", block.len()));
        for (glyph_id, character) in block {
            let mut units = [0u16; 2];
            let destination: String = character
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{unit:04X}"))
                .collect();
            cid_to_unicode_map.push_str(&format!("<{glyph_id:04X}> <{destination}>\n"));
        }
        cid_to_unicode_map.push_str("endbfchar\n");
    }

    cid_to_unicode_map.push_str(include_str!("../assets/gid_to_unicode_end.txt"));
    cid_to_unicode_map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmap::ToUnicodeMap;
    use crate::page_font::PageFont;

    fn test_font() -> EmbeddedFont {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fonts/DejaVuSans.ttf");
        EmbeddedFont::from_path(&path).unwrap()
    }

    #[test]
    fn test_generated_cmap_parses_back() {
        let map = generate_cid_to_unicode_map("Test", vec![vec![(3, ' '), (36, 'A')], vec![(300, '😀')]]);
        assert!(map.contains("/CMapName /Test-UCS def"));
        let parsed = ToUnicodeMap::parse(map.as_bytes());
        assert_eq!(parsed.get(36), Some("A"));
        assert_eq!(parsed.get(300), Some("😀"));
    }

    #[test]
    fn test_missing_glyphs_are_an_insertion_error() {
        let font = test_font();
        assert_eq!(font.encode("Hi").unwrap().len(), 4);
        let error = font.encode("\u{10FFFD}").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Insertion);
    }

    #[test]
    fn test_embedded_font_decodes_back_to_text() {
        let font = test_font();
        let mut document = Document::with_version("1.5");
        let font_id = font.insert_into_document(&mut document);
        let dictionary = document.get_object(font_id).unwrap().as_dict().unwrap().clone();

        let page_font = PageFont::load(&document, &dictionary);
        let codes = page_font.decode(&font.encode("Bonjour").unwrap());
        let text: String = codes.iter().map(|code| code.text.as_str()).collect();
        assert_eq!(text, "Bonjour");
        assert!(codes.iter().all(|code| code.width > 0.0));
        assert_eq!(&*page_font.name, "DejaVuSans");
    }
}

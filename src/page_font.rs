use std::collections::HashMap;
use std::rc::Rc;

use lopdf::{Dictionary, Document, Object};

use crate::cmap::ToUnicodeMap;
use crate::content::{decode_stream, dictionary_name, dictionary_number, object_to_f32, resolve, resolve_dictionary};
use crate::encoding::{glyph_name_to_char, win_ansi_to_char};
use crate::metrics::StandardFamily;

/// A single character code read out of a text string.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DecodedCode {
    /// Byte offset of the code inside the string.
    pub start: usize,
    /// Number of bytes the code takes.
    pub len: usize,
    /// The Unicode text the code stands for, U+FFFD when unknown.
    pub text: String,
    /// Horizontal advance in thousandths of text space units.
    pub width: f32,
    /// Whether word spacing applies to this code (single-byte code 32).
    pub is_space: bool,
}

#[derive(Debug)]
enum Widths {
    Simple {
        first_char: u32,
        widths: Vec<f32>,
        missing_width: Option<f32>,
    },
    Composite {
        widths: HashMap<u32, f32>,
        default_width: f32,
    },
}

/// The font model needed to turn the bytes of a text-showing operator into positioned characters.
#[derive(Debug)]
pub(crate) struct PageFont {
    /// The `BaseFont` of the font, subset tag included.
    pub(crate) name: Rc<str>,
    widths: Widths,
    standard: Option<StandardFamily>,
    encoding: Vec<Option<char>>,
    to_unicode: Option<ToUnicodeMap>,
    /// Glyph space to text space factor of Type3 fonts, 1 for every other kind.
    width_scale: f32,
    /// Ascent in thousandths of an em.
    pub(crate) ascent: f32,
    /// Descent in thousandths of an em, usually negative.
    pub(crate) descent: f32,
}

impl PageFont {
    /// Build the font model out of a font resource dictionary. Missing or malformed
    /// entries fall back to the standard metrics so that text stays locatable.
    pub(crate) fn load(document: &Document, font: &Dictionary) -> Self {
        let subtype = dictionary_name(document, font, b"Subtype").unwrap_or(b"Type1");
        let name: Rc<str> = match dictionary_name(document, font, b"BaseFont") {
            Some(name) => String::from_utf8_lossy(name).into(),
            None => String::from_utf8_lossy(subtype).into(),
        };
        let standard = StandardFamily::from_base_font(&name);

        let to_unicode = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|object| resolve(document, object))
            .and_then(|object| match object {
                Object::Stream(stream) => decode_stream(stream).ok(),
                _ => None,
            })
            .map(|data| ToUnicodeMap::parse(&data))
            .filter(|map| !map.is_empty());

        let (widths, descriptor) = if subtype == b"Type0" {
            let descendant = font
                .get(b"DescendantFonts")
                .ok()
                .and_then(|object| resolve(document, object))
                .and_then(|object| match object {
                    Object::Array(items) => items.first(),
                    _ => None,
                })
                .and_then(|object| resolve_dictionary(document, object));
            let widths = match descendant {
                Some(descendant) => Widths::Composite {
                    widths: composite_widths(document, descendant),
                    default_width: dictionary_number(document, descendant, b"DW").unwrap_or(1000.0),
                },
                None => Widths::Composite {
                    widths: HashMap::new(),
                    default_width: 1000.0,
                },
            };
            let descriptor = descendant.and_then(|descendant| font_descriptor(document, descendant));
            (widths, descriptor)
        } else {
            let descriptor = font_descriptor(document, font);
            let widths = Widths::Simple {
                first_char: dictionary_number(document, font, b"FirstChar").unwrap_or(0.0) as u32,
                widths: number_array(document, font.get(b"Widths").ok()),
                missing_width: descriptor
                    .and_then(|descriptor| dictionary_number(document, descriptor, b"MissingWidth"))
                    .filter(|width| *width > 0.0),
            };
            (widths, descriptor)
        };

        let width_scale = if subtype == b"Type3" {
            number_array(document, font.get(b"FontMatrix").ok())
                .first()
                .map_or(1.0, |scale| scale * 1000.0)
        } else {
            1.0
        };

        let (default_ascent, default_descent) = standard
            .map(StandardFamily::vertical_metrics)
            .unwrap_or((800.0, -200.0));
        let ascent = descriptor
            .and_then(|descriptor| dictionary_number(document, descriptor, b"Ascent"))
            .filter(|ascent| *ascent > 0.0)
            .unwrap_or(default_ascent);
        let descent = descriptor
            .and_then(|descriptor| dictionary_number(document, descriptor, b"Descent"))
            .filter(|descent| *descent < 0.0)
            .unwrap_or(default_descent);

        Self {
            name,
            widths,
            standard,
            encoding: simple_encoding(document, font),
            to_unicode,
            width_scale,
            ascent,
            descent,
        }
    }

    fn is_composite(&self) -> bool {
        matches!(self.widths, Widths::Composite { .. })
    }

    /// Split the bytes of a text string into character codes.
    pub(crate) fn decode(&self, bytes: &[u8]) -> Vec<DecodedCode> {
        let code_length = if self.is_composite() { 2 } else { 1 };
        bytes
            .chunks(code_length)
            .enumerate()
            .map(|(index, chunk)| {
                let code = chunk.iter().fold(0u32, |code, byte| (code << 8) | u32::from(*byte));
                let text = self.text_of(code);
                DecodedCode {
                    start: index * code_length,
                    len: chunk.len(),
                    width: self.width_of(code, &text),
                    is_space: code_length == 1 && code == 32,
                    text,
                }
            })
            .collect()
    }

    fn text_of(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|map| map.get(code)) {
            return text.to_string();
        }
        if !self.is_composite() {
            if let Some(Some(character)) = self.encoding.get(code as usize) {
                return character.to_string();
            }
        }
        char::REPLACEMENT_CHARACTER.to_string()
    }

    fn width_of(&self, code: u32, text: &str) -> f32 {
        match &self.widths {
            Widths::Simple {
                first_char,
                widths,
                missing_width,
            } => {
                let declared = code
                    .checked_sub(*first_char)
                    .and_then(|index| widths.get(index as usize));
                if let Some(width) = declared {
                    return width * self.width_scale;
                }
                if let Some(family) = self.standard {
                    return text
                        .chars()
                        .next()
                        .map_or(0.0, |character| family.char_width(character));
                }
                missing_width.unwrap_or(500.0)
            }
            Widths::Composite {
                widths,
                default_width,
            } => widths.get(&code).copied().unwrap_or(*default_width),
        }
    }
}

fn font_descriptor<'a>(document: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    font.get(b"FontDescriptor")
        .ok()
        .and_then(|object| resolve_dictionary(document, object))
}

fn number_array(document: &Document, object: Option<&Object>) -> Vec<f32> {
    match object.and_then(|object| resolve(document, object)) {
        Some(Object::Array(items)) => items
            .iter()
            .map(|item| resolve(document, item).and_then(object_to_f32).unwrap_or(0.0))
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse the `W` array of a CIDFont, made of `first [w1 w2 ...]` and `first last w` groups.
fn composite_widths(document: &Document, descendant: &Dictionary) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let Some(Object::Array(items)) = descendant
        .get(b"W")
        .ok()
        .and_then(|object| resolve(document, object))
    else {
        return widths;
    };

    let mut index = 0;
    while index < items.len() {
        let Some(first) = resolve(document, &items[index]).and_then(object_to_f32) else {
            break;
        };
        let first = first as u32;
        match items.get(index + 1).and_then(|object| resolve(document, object)) {
            Some(Object::Array(group)) => {
                for (offset, width) in group.iter().enumerate() {
                    if let Some(width) = resolve(document, width).and_then(object_to_f32) {
                        widths.insert(first + offset as u32, width);
                    }
                }
                index += 2;
            }
            Some(last) => {
                let last = object_to_f32(last).unwrap_or(first as f32) as u32;
                let width = items
                    .get(index + 2)
                    .and_then(|object| resolve(document, object))
                    .and_then(object_to_f32)
                    .unwrap_or(1000.0);
                for code in first..=last.min(first.saturating_add(0xFFFF)) {
                    widths.insert(code, width);
                }
                index += 3;
            }
            None => break,
        }
    }

    widths
}

/// The code to character table of a simple font: `WinAnsiEncoding` with the `Differences` applied on top.
/// Other base encodings share the printable ASCII range with it, which is what text search relies on.
fn simple_encoding(document: &Document, font: &Dictionary) -> Vec<Option<char>> {
    let mut table: Vec<Option<char>> = (0..=255u8).map(win_ansi_to_char).collect();

    let Some(Object::Dictionary(encoding)) = font
        .get(b"Encoding")
        .ok()
        .and_then(|object| resolve(document, object))
    else {
        return table;
    };
    let Some(Object::Array(differences)) = encoding
        .get(b"Differences")
        .ok()
        .and_then(|object| resolve(document, object))
    else {
        return table;
    };

    let mut code = 0usize;
    for item in differences {
        match resolve(document, item) {
            Some(Object::Name(name)) => {
                if let Some(slot) = table.get_mut(code) {
                    *slot = glyph_name_to_char(name);
                }
                code += 1;
            }
            Some(object) => {
                if let Some(start) = object_to_f32(object) {
                    code = start.max(0.0) as usize;
                }
            }
            None => {}
        }
    }

    table
}

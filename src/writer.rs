use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};

use crate::content::{append_isolated_content, register_page_font};
use crate::embedding::EmbeddedFont;
use crate::encoding::encode_win_ansi;
use crate::error::{ContextError, ErrorKind};
use crate::fonts::BuiltinFont;
use crate::geometry::Rect;
use crate::page::PdfPage;

/// The font a replacement text is drawn with.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FontChoice {
    Builtin(BuiltinFont),
    /// A font file loaded whole and embedded into the document.
    Embedded(PathBuf),
}

/// The font objects already added to one document, so that each font is embedded only once.
#[derive(Debug, Default)]
pub(crate) struct FontRegistry {
    builtin: HashMap<BuiltinFont, ObjectId>,
    embedded: HashMap<PathBuf, (ObjectId, Rc<EmbeddedFont>)>,
}

enum RegisteredFont {
    Builtin(BuiltinFont),
    Embedded(Rc<EmbeddedFont>),
}

impl FontRegistry {
    fn register(
        &mut self,
        document: &mut Document,
        font: &FontChoice,
    ) -> Result<(ObjectId, RegisteredFont), ContextError> {
        match font {
            FontChoice::Builtin(builtin) => {
                let id = *self.builtin.entry(*builtin).or_insert_with(|| {
                    let mut dictionary = dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type1",
                        "BaseFont" => builtin.base_font(),
                    };
                    if !builtin.is_symbolic() {
                        dictionary.set("Encoding", "WinAnsiEncoding");
                    }
                    document.add_object(dictionary)
                });
                Ok((id, RegisteredFont::Builtin(*builtin)))
            }
            FontChoice::Embedded(path) => {
                if let Some((id, font)) = self.embedded.get(path) {
                    return Ok((*id, RegisteredFont::Embedded(font.clone())));
                }
                let font = Rc::new(EmbeddedFont::from_path(path)?);
                let id = font.insert_into_document(document);
                log::debug!("Embedded the font {} from {:?}", font.name(), path);
                self.embedded.insert(path.clone(), (id, font.clone()));
                Ok((id, RegisteredFont::Embedded(font)))
            }
        }
    }
}

/// Operations appended on top of a page: white boxes and replacement texts.
/// Nothing reaches the document until [`PageOverlay::commit`] is called.
#[derive(Debug)]
pub(crate) struct PageOverlay {
    page_id: ObjectId,
    media_box: Rect,
    operations: Vec<Operation>,
}

impl PageOverlay {
    pub(crate) fn new(page: &PdfPage) -> Self {
        Self {
            page_id: page.id,
            media_box: page.media_box,
            operations: Vec::new(),
        }
    }

    fn to_user_space(&self, x: f32, y: f32) -> (f32, f32) {
        (x + self.media_box.x0, self.media_box.y1 - y)
    }

    /// Paint an opaque white rectangle, given in page space.
    pub(crate) fn fill_white_rect(&mut self, rect: &Rect) {
        let (x, y) = self.to_user_space(rect.x0, rect.y1);
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![1.into(), 1.into(), 1.into()]),
            Operation::new(
                "re",
                vec![x.into(), y.into(), rect.width().into(), rect.height().into()],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Draw `text` with its baseline starting at `origin` (page space). On failure the overlay is left untouched.
    pub(crate) fn write_text(
        &mut self,
        document: &mut Document,
        registry: &mut FontRegistry,
        font: &FontChoice,
        text: &str,
        origin: (f32, f32),
        size: f32,
        color: [f32; 3],
    ) -> Result<(), ContextError> {
        if text.is_empty() {
            return Ok(());
        }
        if !(size.is_finite() && size > 0.0) {
            return Err(ContextError::with_context(
                ErrorKind::Insertion,
                format!("Invalid font size {} for {:?}", size, text),
            ));
        }

        let (font_id, registered) = registry.register(document, font)?;
        let encoded = match &registered {
            RegisteredFont::Builtin(builtin) => {
                let bytes = encode_win_ansi(text).map_err(|missing| {
                    ContextError::with_context(
                        ErrorKind::Insertion,
                        format!(
                            "The builtin font {} cannot draw {:?}",
                            builtin.base_font(),
                            missing
                        ),
                    )
                })?;
                Object::String(bytes, StringFormat::Literal)
            }
            RegisteredFont::Embedded(embedded) => {
                Object::String(embedded.encode(text)?, StringFormat::Hexadecimal)
            }
        };
        let resource_name = register_page_font(document, self.page_id, font_id)?;

        let (x, y) = self.to_user_space(origin.0, origin.1);
        let [red, green, blue] = color.map(|component| component.clamp(0.0, 1.0));
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(resource_name), size.into()]),
            Operation::new(
                "Tm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
            ),
            Operation::new("rg", vec![red.into(), green.into(), blue.into()]),
            Operation::new("Tj", vec![encoded]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    /// Append the accumulated operations to the page, after its original content.
    pub(crate) fn commit(self, document: &mut Document) -> Result<(), ContextError> {
        if self.operations.is_empty() {
            return Ok(());
        }
        let content = Content {
            operations: self.operations,
        }
        .encode()
        .map_err(|error| {
            ContextError::with_error(ErrorKind::Strategy, "Failed to encode the page overlay", &error)
        })?;

        append_isolated_content(document, self.page_id, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{page_content, page_resources};
    use lopdf::Stream;
    use std::path::Path;

    fn one_page_document() -> (Document, PdfPage) {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let content_id = document.add_object(Stream::new(lopdf::Dictionary::new(), b"0 0 1 rg".to_vec()));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let page = PdfPage::load(&document, 1, page_id).unwrap();
        (document, page)
    }

    #[test]
    fn test_builtin_text_is_written_in_user_space() {
        let (mut document, page) = one_page_document();
        let mut registry = FontRegistry::default();
        let mut overlay = PageOverlay::new(&page);
        let font = FontChoice::Builtin(BuiltinFont::HELVETICA);
        overlay
            .write_text(&mut document, &mut registry, &font, "Bonjour", (72.0, 92.0), 14.0, [0.0, 0.0, 0.0])
            .unwrap();
        overlay.commit(&mut document).unwrap();

        let reloaded = PdfPage::load(&document, 1, page.id).unwrap();
        assert_eq!(reloaded.text_page().text(), "Bonjour");
        let content = String::from_utf8(page_content(&document, page.id).unwrap()).unwrap();
        assert!(content.contains("(Bonjour) Tj"));
        let fonts = page_resources(&document, page.id).unwrap().get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.get(b"RTF0").is_ok());
    }

    #[test]
    fn test_failed_write_leaves_no_operation() {
        let (mut document, page) = one_page_document();
        let mut registry = FontRegistry::default();
        let mut overlay = PageOverlay::new(&page);
        let font = FontChoice::Builtin(BuiltinFont::HELVETICA);
        let error = overlay
            .write_text(&mut document, &mut registry, &font, "日本", (72.0, 92.0), 14.0, [0.0, 0.0, 0.0])
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Insertion);

        let missing = FontChoice::Embedded(PathBuf::from("/nonexistent/font.ttf"));
        let error = overlay
            .write_text(&mut document, &mut registry, &missing, "Hi", (72.0, 92.0), 14.0, [0.0, 0.0, 0.0])
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Insertion);
        assert!(overlay.operations.is_empty());
    }

    #[test]
    fn test_embedded_fonts_are_added_once() {
        let (mut document, page) = one_page_document();
        let mut registry = FontRegistry::default();
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fonts/DejaVuSans.ttf");
        let font = FontChoice::Embedded(path);
        let mut overlay = PageOverlay::new(&page);
        for text in ["Grüße", "日本"] {
            // The CJK text has no glyph in the font, only the first write succeeds
            let _ = overlay.write_text(&mut document, &mut registry, &font, text, (72.0, 92.0), 12.0, [0.0, 0.0, 0.0]);
        }
        assert_eq!(registry.embedded.len(), 1);
        overlay.commit(&mut document).unwrap();

        let reloaded = PdfPage::load(&document, 1, page.id).unwrap();
        assert_eq!(reloaded.text_page().text(), "Grüße");
    }
}

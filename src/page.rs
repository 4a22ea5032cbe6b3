use lopdf::content::{Content, Operation};
use lopdf::{Document, ObjectId};

use crate::content::{media_box, page_content, page_resources};
use crate::error::{ContextError, ErrorKind};
use crate::geometry::Rect;
use crate::interpreter::{Interpreter, Mark};
use crate::layout::TextPage;

/// A read-only snapshot of one page: its decoded operations, what they draw and the resulting text layout.
#[derive(Clone, Debug)]
pub struct PdfPage {
    /// One-based page number.
    pub number: u32,
    pub id: ObjectId,
    /// The media box in PDF user space.
    pub media_box: Rect,
    pub(crate) operations: Vec<Operation>,
    pub(crate) marks: Vec<Mark>,
    text_page: TextPage,
}

impl PdfPage {
    /// Decode and interpret the content of a page.
    pub fn load(document: &Document, number: u32, id: ObjectId) -> Result<Self, ContextError> {
        let content = page_content(document, id)
            .map_err(|error| error.within(format!("Unable to read the content of page {}", number)))?;
        let operations = Content::decode(&content)
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Strategy,
                    format!("Unable to decode the content of page {}", number),
                    &error,
                )
            })?
            .operations;

        let media_box = media_box(document, id);
        let marks = Interpreter::new(document, media_box).run(&operations, page_resources(document, id));
        let text_page = TextPage::from_marks(&marks, None);
        log::trace!(
            "Page {} decoded into {} operations and {} marks",
            number,
            operations.len(),
            marks.len()
        );

        Ok(Self {
            number,
            id,
            media_box,
            operations,
            marks,
            text_page,
        })
    }

    /// The structured text of the whole page.
    pub fn text_page(&self) -> &TextPage {
        &self.text_page
    }

    /// The structured text restricted to the glyphs whose center lies inside `clip`.
    pub fn clipped_text_page(&self, clip: &Rect) -> TextPage {
        TextPage::from_marks(&self.marks, Some(clip))
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }
}

/// Load every page of the document, reporting the pages that could not be read instead of failing.
pub(crate) fn load_pages(document: &Document) -> Vec<Result<PdfPage, ContextError>> {
    document
        .get_pages()
        .into_iter()
        .map(|(number, id)| PdfPage::load(document, number, id))
        .collect()
}

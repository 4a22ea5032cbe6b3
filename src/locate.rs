use crate::error::{ContextError, ErrorKind};
use crate::geometry::Rect;
use crate::layout::collapse_whitespace;
use crate::page::PdfPage;

/// Find every verbatim occurrence of `text` on the page.
///
/// The match is exact and case-sensitive, but any run of whitespace (line breaks included) matches
/// any other run of whitespace. An occurrence that wraps over several lines produces one rectangle
/// per line. The order of the rectangles is not meaningful.
pub fn locate(page: &PdfPage, text: &str) -> Result<Vec<Rect>, ContextError> {
    if collapse_whitespace(text).is_empty() {
        return Err(ContextError::with_context(
            ErrorKind::Rule,
            "The text to search for must contain at least one visible character",
        ));
    }

    Ok(page.text_page().search(text))
}

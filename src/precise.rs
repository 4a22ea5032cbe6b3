use lopdf::content::Content;
use lopdf::Document;

use crate::content::replace_page_content;
use crate::error::ContextError;
use crate::events::EventSink;
use crate::fonts::{BuiltinFont, FontSource};
use crate::geometry::Rect;
use crate::page::load_pages;
use crate::redaction::redact_operations;
use crate::rules::RuleSet;
use crate::strategy::{collect_actions, resolve_font, PageCounts};
use crate::style::DEFAULT_FONT_NAME;
use crate::writer::{FontChoice, FontRegistry, PageOverlay};

/// Replace the occurrences by removing the original glyphs from the page content and writing the
/// replacements in their place.
///
/// Every page goes through three phases: all the occurrences are located and their style is
/// extracted first, then they are redacted in a single batch and finally the replacements are
/// written. Locating everything before the first mutation keeps the rectangles of overlapping
/// rules valid.
///
/// Occurrences whose replacement cannot be written are logged and skipped; pages whose content
/// cannot be read are logged and left untouched. Failing to update the page tree aborts the pass.
pub fn apply_precise(
    mut document: Document,
    rules: &RuleSet,
    fonts: &dyn FontSource,
    sink: &dyn EventSink,
) -> Result<(Document, PageCounts), ContextError> {
    let mut counts = PageCounts::new();
    let mut registry = FontRegistry::default();

    for page in load_pages(&document) {
        let page = match page {
            Ok(page) => page,
            Err(error) => {
                sink.error(&format!("Skipping a page: {}", error));
                continue;
            }
        };

        // 1. Locate every occurrence on the untouched page
        let actions = collect_actions(&page, rules, sink);
        if actions.is_empty() {
            continue;
        }

        // 2. Erase the original glyphs, images are left alone
        let regions: Vec<Rect> = actions.iter().map(|action| action.rect).collect();
        let redaction = redact_operations(&page.operations, &page.marks, &regions);
        sink.debug(&format!("Page {}: {} glyphs removed", page.number, redaction.removed));
        if redaction.unreachable > 0 {
            sink.warn(&format!(
                "Page {}: {} glyphs are drawn by form XObjects and cannot be removed",
                page.number, redaction.unreachable
            ));
        }
        let content = match (Content {
            operations: redaction.operations,
        })
        .encode()
        {
            Ok(content) => content,
            Err(error) => {
                sink.error(&format!("Page {}: unable to encode the redacted content: {}", page.number, error));
                continue;
            }
        };
        replace_page_content(&mut document, page.id, content)
            .map_err(|error| error.within(format!("Unable to rewrite the content of page {}", page.number)))?;

        // 3. Write the replacements
        let mut overlay = PageOverlay::new(&page);
        for action in &actions {
            let font = resolve_font(&action.style.font_name, fonts).unwrap_or_else(|error| {
                sink.warn(&format!("{}, using {} instead", error, DEFAULT_FONT_NAME));
                FontChoice::Builtin(BuiltinFont::HELVETICA)
            });
            if let Err(error) = action.write(&mut overlay, &mut document, &mut registry, &font) {
                sink.error(&format!(
                    "Failed to replace {:?} with {:?}: {}",
                    action.source, action.replacement, error
                ));
            }
        }
        overlay
            .commit(&mut document)
            .map_err(|error| error.within(format!("Unable to write the replacements of page {}", page.number)))?;

        sink.info(&format!("Page {}: {} replacements", page.number, actions.len()));
        counts.insert(page.number, actions.len());
    }

    Ok((document, counts))
}

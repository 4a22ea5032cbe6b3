use lopdf::Document;

use crate::error::ContextError;
use crate::events::EventSink;
use crate::fonts::{BuiltinFont, FontSource};
use crate::page::load_pages;
use crate::rules::RuleSet;
use crate::strategy::{collect_actions, resolve_font, PageCounts};
use crate::style::DEFAULT_FONT_NAME;
use crate::writer::{FontChoice, FontRegistry, PageOverlay};

/// Replace the occurrences by painting a white box over each of them and writing the replacement on top.
/// The original content streams are kept as they are, the boxes and texts are appended after them.
pub fn apply_overlay(
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

        let mut actions = collect_actions(&page, rules, sink);
        if actions.is_empty() {
            continue;
        }
        // Bottom-most occurrences first
        actions.sort_by(|first, second| {
            (second.rect.y0, second.rect.x0)
                .partial_cmp(&(first.rect.y0, first.rect.x0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut overlay = PageOverlay::new(&page);
        let fallback = FontChoice::Builtin(BuiltinFont::HELVETICA);
        for action in &actions {
            overlay.fill_white_rect(&action.rect);
            let font = resolve_font(&action.style.font_name, fonts).unwrap_or_else(|error| {
                sink.warn(&format!("{}, using {} instead", error, DEFAULT_FONT_NAME));
                fallback.clone()
            });
            let written = match action.write(&mut overlay, &mut document, &mut registry, &font) {
                // One retry with the standard font
                Err(error) if font != fallback => {
                    sink.debug(&format!(
                        "Using the original font {} failed ({}), using the standard font",
                        action.style.font_name, error
                    ));
                    action.write(&mut overlay, &mut document, &mut registry, &fallback)
                }
                written => written,
            };
            if let Err(error) = written {
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

use std::path::Path;

use lopdf::Document;

use crate::error::{ContextError, ErrorKind};
use crate::events::EventSink;
use crate::fonts::FontSource;
use crate::overlay::apply_overlay;
use crate::persistence::{save_document, write_beside, SaveMode, TemporaryFile};
use crate::precise::apply_precise;
use crate::rules::RuleSet;
use crate::strategy::PageCounts;
use crate::verify::first_remaining_source;

/// What the hybrid strategy ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridOutcome {
    pub page_counts: PageCounts,
    /// Whether the overlay strategy produced the output.
    pub fell_back: bool,
}

/// Run the precise strategy into a temporary file and keep its result only if none of the source
/// texts can be found in it anymore. Otherwise the overlay strategy is run on the original document.
/// Either way the result is saved to `output`, and the temporary file never outlives the call.
pub fn apply_hybrid(
    document: Document,
    output: &Path,
    rules: &RuleSet,
    fonts: &dyn FontSource,
    sink: &dyn EventSink,
) -> Result<HybridOutcome, ContextError> {
    match precise_into_temporary(document.clone(), output, rules, fonts, sink) {
        Ok((temporary, page_counts, None)) => {
            temporary.promote(output)?;
            return Ok(HybridOutcome {
                page_counts,
                fell_back: false,
            });
        }
        Ok((_temporary, _, Some(source))) => sink.warn(&format!(
            "The precise replacement left {:?} in the document, using the overlay method",
            source
        )),
        Err(error) => sink.warn(&format!(
            "The precise replacement failed ({}), using the overlay method",
            error
        )),
    }

    let (mut overlaid, page_counts) = apply_overlay(document, rules, fonts, sink)?;
    save_document(&mut overlaid, output, SaveMode::Deflate)?;

    Ok(HybridOutcome {
        page_counts,
        fell_back: true,
    })
}

/// The precise result written beside `output`, with the first source text it still contains.
fn precise_into_temporary(
    document: Document,
    output: &Path,
    rules: &RuleSet,
    fonts: &dyn FontSource,
    sink: &dyn EventSink,
) -> Result<(TemporaryFile, PageCounts, Option<String>), ContextError> {
    let (mut replaced, page_counts) = apply_precise(document, rules, fonts, sink)?;
    let temporary = write_beside(&mut replaced, output, SaveMode::Compact)?;

    let written = Document::load(temporary.path()).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Strategy,
            "The document produced by the precise replacement cannot be read back",
            &error,
        )
    })?;
    let remaining = first_remaining_source(&written, rules)?;

    Ok((temporary, page_counts, remaining))
}

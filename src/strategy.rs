use std::collections::BTreeMap;
use std::str::FromStr;

use lopdf::Document;
use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};
use crate::events::EventSink;
use crate::fonts::{is_custom_font, BuiltinFont, FontSource};
use crate::geometry::Rect;
use crate::locate::locate;
use crate::page::PdfPage;
use crate::rules::RuleSet;
use crate::style::{extract_style, Style};
use crate::writer::{FontChoice, FontRegistry, PageOverlay};

/// Number of processed occurrences per one-based page number.
pub type PageCounts = BTreeMap<u32, usize>;

/// How the occurrences are replaced.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Method {
    /// Remove the original glyphs from the content, then write the replacement.
    #[default]
    Precise,
    /// Paint a white box over the original text, then write the replacement on top.
    Overlay,
    /// Precise, falling back to Overlay when some source text survives.
    Hybrid,
}

impl FromStr for Method {
    type Err = ContextError;

    fn from_str(method: &str) -> Result<Self, Self::Err> {
        match method.trim().to_lowercase().as_str() {
            "precise" => Ok(Method::Precise),
            "overlay" => Ok(Method::Overlay),
            "hybrid" => Ok(Method::Hybrid),
            _ => Err(ContextError::with_context(
                ErrorKind::Configuration,
                format!(
                    "Unknown replacement method {:?}, expected one of precise, overlay or hybrid",
                    method
                ),
            )),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::Precise => "precise",
            Method::Overlay => "overlay",
            Method::Hybrid => "hybrid",
        };
        write!(formatter, "{}", name)
    }
}

/// One occurrence found on a page, waiting to be replaced.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingAction {
    /// The occurrence, in page space.
    pub(crate) rect: Rect,
    pub(crate) style: Style,
    pub(crate) source: String,
    pub(crate) replacement: String,
}

impl PendingAction {
    /// Where the replacement starts: the left edge of the occurrence, on the original baseline.
    pub(crate) fn insertion_point(&self) -> (f32, f32) {
        (self.rect.x0, self.style.baseline_y)
    }

    /// Draw the replacement with the given font, at the original size and color.
    pub(crate) fn write(
        &self,
        overlay: &mut PageOverlay,
        document: &mut Document,
        registry: &mut FontRegistry,
        font: &FontChoice,
    ) -> Result<(), ContextError> {
        overlay.write_text(
            document,
            registry,
            font,
            &self.replacement,
            self.insertion_point(),
            self.style.font_size,
            self.style.color,
        )
    }
}

/// Locate every rule on the page and extract the style of each occurrence. Nothing is modified,
/// so later occurrences are found on the original layout.
pub(crate) fn collect_actions(page: &PdfPage, rules: &RuleSet, sink: &dyn EventSink) -> Vec<PendingAction> {
    let mut actions = Vec::new();
    for rule in rules {
        let rects = match locate(page, &rule.source) {
            Ok(rects) => rects,
            Err(error) => {
                sink.warn(&format!("Skipping the rule {:?} on page {}: {}", rule.source, page.number, error));
                continue;
            }
        };
        if !rects.is_empty() {
            sink.debug(&format!(
                "Page {}: {} occurrences of {:?}",
                page.number,
                rects.len(),
                rule.source
            ));
        }
        actions.extend(rects.into_iter().map(|rect| PendingAction {
            rect,
            style: extract_style(page, &rect, &rule.source),
            source: rule.source.clone(),
            replacement: rule.replacement.clone(),
        }));
    }
    actions
}

/// Pick the font to draw with. Builtin names map to the standard fonts; custom names need a font file.
pub(crate) fn resolve_font(font_name: &str, fonts: &dyn FontSource) -> Result<FontChoice, ContextError> {
    if !is_custom_font(font_name) {
        let builtin = BuiltinFont::from_name(font_name).unwrap_or(BuiltinFont::HELVETICA);
        return Ok(FontChoice::Builtin(builtin));
    }

    fonts
        .resolve(font_name)
        .map(FontChoice::Embedded)
        .ok_or_else(|| {
            ContextError::with_context(
                ErrorKind::FontResolution,
                format!("No font file found for the font {:?}", font_name),
            )
        })
}

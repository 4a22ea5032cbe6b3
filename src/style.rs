use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::layout::{collapse_whitespace, Block};
use crate::page::PdfPage;

/// The builtin font used whenever the original font is unknown or unusable.
pub const DEFAULT_FONT_NAME: &str = "helv";
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// The visual properties of a piece of text, as needed to draw its replacement in the same place.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    /// The font name, without the subset tag.
    pub font_name: String,
    pub font_size: f32,
    /// RGB components in `[0, 1]`.
    pub color: [f32; 3],
    /// Baseline of the original glyphs, in page space.
    pub baseline_y: f32,
}

impl Style {
    /// The style used when no span of the page matches: default font, size and color, and the
    /// bottom edge of the rectangle as the baseline.
    pub fn fallback(rect: &Rect) -> Self {
        Self {
            font_name: DEFAULT_FONT_NAME.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            color: [0.0, 0.0, 0.0],
            baseline_y: rect.y1,
        }
    }
}

/// Remove the subset tag of an embedded font name (`ABCDEF+Arial` becomes `Arial`).
pub fn strip_subset_tag(font_name: &str) -> &str {
    font_name.rsplit('+').next().unwrap_or(font_name)
}

/// Unpack a `0xRRGGBB` color into normalized components.
pub fn unpack_color(packed: u32) -> [f32; 3] {
    [16, 8, 0].map(|shift| ((packed >> shift) & 0xFF) as f32 / 255.0)
}

/// Recover the style of `text` inside `rect`: the first span of the clipped layout containing the text
/// gives the font, size, color and baseline. Image blocks are ignored.
pub fn extract_style(page: &PdfPage, rect: &Rect, text: &str) -> Style {
    let needle = collapse_whitespace(text);
    let clipped = page.clipped_text_page(rect);

    let span = clipped
        .blocks
        .iter()
        .filter_map(|block| match block {
            Block::Text(block) => Some(block),
            Block::Image(_) => None,
        })
        .flat_map(|block| block.lines.iter())
        .flat_map(|line| line.spans.iter())
        .find(|span| collapse_whitespace(&span.text).contains(&needle));

    match span {
        Some(span) => Style {
            font_name: strip_subset_tag(&span.font).to_string(),
            font_size: if span.size > 0.0 { span.size } else { DEFAULT_FONT_SIZE },
            color: unpack_color(span.color),
            baseline_y: span.origin.1,
        },
        None => {
            log::debug!(
                "No span contains {:?} on page {}, using the default style",
                text,
                page.number
            );
            Style::fallback(rect)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_subset_tag() {
        assert_eq!(strip_subset_tag("ABCDEF+Helvetica-Bold"), "Helvetica-Bold");
        assert_eq!(strip_subset_tag("Helvetica"), "Helvetica");
        assert_eq!(strip_subset_tag("A+B+Arial"), "Arial");
    }

    #[test]
    fn test_unpack_color() {
        let [red, green, blue] = unpack_color(0xFF8000);
        assert_eq!(red, 1.0);
        assert!((green - 0.502).abs() < 1e-3);
        assert_eq!(blue, 0.0);
    }

    #[test]
    fn test_fallback_uses_the_bottom_edge() {
        let style = Style::fallback(&Rect::new(10.0, 20.0, 50.0, 34.0));
        assert_eq!(style.font_name, "helv");
        assert_eq!(style.font_size, 12.0);
        assert_eq!(style.baseline_y, 34.0);
    }
}

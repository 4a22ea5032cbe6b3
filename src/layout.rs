use crate::geometry::Rect;
use crate::interpreter::{Glyph, Mark};

/// Glyphs further apart than this fraction of the font size are separated by a space.
const SPACE_GAP_RATIO: f32 = 0.25;
/// Baselines closer than this fraction of the font size belong to the same line.
const BASELINE_TOLERANCE_RATIO: f32 = 0.3;
/// A horizontal jump larger than this many font sizes starts a new line, even on the same baseline.
const MAXIMUM_GAP_RATIO: f32 = 3.0;
/// Consecutive lines further apart than this many font sizes start a new block.
const BLOCK_DISTANCE_RATIO: f32 = 2.0;

/// The structured text of a page: blocks, lines, spans and characters, in content order.
#[derive(Clone, Debug, Default)]
pub struct TextPage {
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug)]
pub enum Block {
    Text(TextBlock),
    Image(Rect),
}

#[derive(Clone, Debug)]
pub struct TextBlock {
    pub bbox: Rect,
    pub lines: Vec<TextLine>,
}

#[derive(Clone, Debug)]
pub struct TextLine {
    pub bbox: Rect,
    pub spans: Vec<TextSpan>,
}

/// A maximal run of characters sharing one font, size and color within a line.
#[derive(Clone, Debug)]
pub struct TextSpan {
    pub text: String,
    /// The font name as declared by the document, subset tag included.
    pub font: String,
    pub size: f32,
    /// Packed `0xRRGGBB` fill color.
    pub color: u32,
    /// Baseline origin of the first character.
    pub origin: (f32, f32),
    pub bbox: Rect,
    pub chars: Vec<TextChar>,
}

#[derive(Clone, Debug)]
pub struct TextChar {
    pub text: String,
    pub origin: (f32, f32),
    pub bbox: Rect,
}

impl TextLine {
    fn baseline(&self) -> f32 {
        self.spans.first().map_or(0.0, |span| span.origin.1)
    }

    fn last_char(&self) -> Option<&TextChar> {
        self.spans.last().and_then(|span| span.chars.last())
    }

    /// The text of the line, spans concatenated.
    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }
}

impl TextSpan {
    fn new(glyph: &Glyph) -> Self {
        Self {
            text: String::new(),
            font: glyph.font.to_string(),
            size: glyph.size,
            color: glyph.color,
            origin: glyph.origin,
            bbox: glyph.bbox,
            chars: Vec::new(),
        }
    }

    fn matches_style(&self, glyph: &Glyph) -> bool {
        *self.font == *glyph.font && (self.size - glyph.size).abs() < 0.01 && self.color == glyph.color
    }

    fn push(&mut self, text: &str, origin: (f32, f32), bbox: Rect) {
        self.text.push_str(text);
        self.bbox = if self.chars.is_empty() { bbox } else { self.bbox.union(&bbox) };
        self.chars.push(TextChar {
            text: text.to_string(),
            origin,
            bbox,
        });
    }
}

impl TextPage {
    /// Organize the marks of a page into blocks. With a clip rectangle only the glyphs whose
    /// center lies inside it (and the images touching it) are kept.
    pub fn from_marks(marks: &[Mark], clip: Option<&Rect>) -> Self {
        let mut page = TextPage::default();
        for mark in marks {
            match mark {
                Mark::Image(bbox) => {
                    if clip.map_or(true, |clip| clip.intersects(bbox)) {
                        page.blocks.push(Block::Image(*bbox));
                    }
                }
                Mark::Glyph(glyph) => {
                    let (x, y) = glyph.bbox.center();
                    if clip.map_or(true, |clip| clip.contains_point(x, y)) {
                        page.push_glyph(glyph);
                    }
                }
            }
        }
        page
    }

    fn push_glyph(&mut self, glyph: &Glyph) {
        let size = glyph.size.max(1.0);

        if let Some(Block::Text(block)) = self.blocks.last_mut() {
            if let Some(line) = block.lines.last_mut() {
                let same_baseline = (glyph.origin.1 - line.baseline()).abs() <= BASELINE_TOLERANCE_RATIO * size;
                let previous = line.last_char().filter(|_| same_baseline).cloned();
                if let Some(previous) = previous {
                    let gap = glyph.origin.0 - previous.bbox.x1;
                    let going_back = glyph.origin.0 < previous.bbox.x0 - SPACE_GAP_RATIO * size;
                    if !going_back && gap <= MAXIMUM_GAP_RATIO * size {
                        let needs_space = gap > SPACE_GAP_RATIO * size
                            && !previous.text.trim().is_empty()
                            && !glyph.text.trim().is_empty();
                        let space_bbox = Rect::new(previous.bbox.x1, previous.bbox.y0, glyph.origin.0, previous.bbox.y1);
                        let space_origin = (previous.bbox.x1, previous.origin.1);
                        if let Some(span) = line.spans.last_mut() {
                            if needs_space {
                                span.push(" ", space_origin, space_bbox);
                            }
                        }
                        let continues_span = line.spans.last().map_or(false, |span| span.matches_style(glyph));
                        if !continues_span {
                            line.spans.push(TextSpan::new(glyph));
                        }
                        if let Some(span) = line.spans.last_mut() {
                            span.push(&glyph.text, glyph.origin, glyph.bbox);
                        }
                        line.bbox = line.bbox.union(&glyph.bbox);
                        block.bbox = block.bbox.union(&glyph.bbox);
                        return;
                    }
                }

                let distance = glyph.origin.1 - line.baseline();
                if distance > 0.0 && distance <= BLOCK_DISTANCE_RATIO * size {
                    block.lines.push(new_line(glyph));
                    block.bbox = block.bbox.union(&glyph.bbox);
                    return;
                }
            }
        }

        self.blocks.push(Block::Text(TextBlock {
            bbox: glyph.bbox,
            lines: vec![new_line(glyph)],
        }));
    }

    /// All the text lines of the page, in order.
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Text(block) => Some(block),
                Block::Image(_) => None,
            })
            .flat_map(|block| block.lines.iter())
    }

    /// The plain text of the page, one line per row.
    pub fn text(&self) -> String {
        self.lines().map(TextLine::text).collect::<Vec<_>>().join("\n")
    }

    /// Find every occurrence of `needle`. Runs of whitespace (line breaks included) match any other
    /// run of whitespace; the comparison is otherwise exact. An occurrence spanning several lines
    /// yields one rectangle per line.
    pub fn search(&self, needle: &str) -> Vec<Rect> {
        let needle: Vec<char> = collapse_whitespace(needle).chars().collect();
        if needle.is_empty() {
            return Vec::new();
        }

        let haystack = self.search_entries();
        let mut rects = Vec::new();
        let mut index = 0;
        while index + needle.len() <= haystack.len() {
            let window = &haystack[index..index + needle.len()];
            let found = window
                .iter()
                .zip(&needle)
                .all(|(entry, character)| entry.character == *character);
            if !found {
                index += 1;
                continue;
            }

            let mut per_line: Vec<(usize, Rect)> = Vec::new();
            for entry in window {
                let Some(bbox) = entry.bbox else {
                    continue;
                };
                match per_line.last_mut() {
                    Some((line, rect)) if *line == entry.line => *rect = rect.union(&bbox),
                    _ => per_line.push((entry.line, bbox)),
                }
            }
            rects.extend(per_line.into_iter().map(|(_, rect)| rect));
            index += needle.len();
        }

        rects
    }

    fn search_entries(&self) -> Vec<SearchEntry> {
        let mut entries: Vec<SearchEntry> = Vec::new();
        let push_space = |entries: &mut Vec<SearchEntry>, line: usize, bbox: Option<Rect>| {
            if entries.last().map_or(false, |entry| entry.character != ' ') {
                entries.push(SearchEntry {
                    character: ' ',
                    line,
                    bbox,
                });
            }
        };

        for (line_index, line) in self.lines().enumerate() {
            // Line breaks count as whitespace
            push_space(&mut entries, line_index, None);
            for character in line.spans.iter().flat_map(|span| span.chars.iter()) {
                for unit in character.text.chars() {
                    if unit.is_whitespace() {
                        push_space(&mut entries, line_index, Some(character.bbox));
                    } else {
                        entries.push(SearchEntry {
                            character: unit,
                            line: line_index,
                            bbox: Some(character.bbox),
                        });
                    }
                }
            }
        }

        entries
    }
}

struct SearchEntry {
    character: char,
    line: usize,
    bbox: Option<Rect>,
}

fn new_line(glyph: &Glyph) -> TextLine {
    let mut span = TextSpan::new(glyph);
    span.push(&glyph.text, glyph.origin, glyph.bbox);
    TextLine {
        bbox: glyph.bbox,
        spans: vec![span],
    }
}

/// Trim the text and replace every run of whitespace with a single space.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

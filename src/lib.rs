//! reTeXtr replaces pieces of text inside existing PDF documents while keeping their look: the
//! replacement is drawn with the same font, size and color, on the same baseline as the text it replaces.
//!
//! The entry point is the `Replacer` struct of the `pipeline` module, which opens a document, applies a
//! `RuleSet` with one of the three replacement methods and saves the result. The individual steps
//! (locating the text, extracting its style, resolving fonts, verifying the output) are exposed as well,
//! so that they can be used on their own on top of a `lopdf::Document`.

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// Every error carries an `ErrorKind`, which tells whether the pipeline can go on after it happened
/// (a font that cannot be found, a single replacement that cannot be written) or not (an unreadable
/// document, a malformed rule file, a failed save). The context string explains what was being done,
/// and the source error, when there is one, is kept as a string so that the error can be serialized.
pub mod error;

/// Rectangles and affine matrices, the two geometric primitives the rest of the crate works with.
pub mod geometry;

/// Low-level helpers over the `lopdf` object model: resolving references, reading inherited page
/// attributes, reading and rewriting the content streams of a page and registering fonts in its resources.
pub mod content;

mod cmap;
mod embedding;
mod encoding;
mod metrics;
mod page_font;
mod redaction;
mod writer;

/// The content stream interpreter.
///
/// # Introduction
///
/// PDF pages do not store text as text, but as a sequence of operators which select a font, move a
/// pen around and show strings of character codes. The `Interpreter` runs these operators while keeping
/// track of the graphics and text states, decodes the character codes through the fonts of the page
/// (standard fonts, simple fonts with their encodings and differences, composite fonts with their
/// `ToUnicode` maps) and reports every glyph it draws as a `Mark`, with its text, bounding box, size,
/// font and color in page space (origin at the top-left corner, y growing downward).
///
/// Each glyph also remembers where it came from in the content of the page, which is what makes it
/// possible to remove it later on without touching its neighbours. Glyphs drawn by form XObjects are
/// reported too, but cannot be traced back to the page content.
pub mod interpreter;

/// The structured text of a page, built from the glyphs reported by the interpreter: blocks made of
/// lines, made of spans sharing one font, size and color. It also hosts the whitespace-tolerant search.
pub mod layout;

/// The `PdfPage` snapshot: the decoded operations of a page, the marks they produce and the resulting text layout.
pub mod page;

/// Finding every occurrence of a text on a page.
pub mod locate;

/// Recovering the font, size, color and baseline of an occurrence.
///
/// The style is taken from the first span of the clipped page layout that contains the searched text;
/// the baseline in particular is the one of the original glyphs and not the bottom of the occurrence
/// rectangle, which is what makes the replacement line up with the text around it. When no span
/// contains the text, a default style is used instead.
pub mod style;

/// Mapping font names to local font files.
///
/// Only custom fonts need a file: the standard fonts (`helv`, `Times-Roman`, `Courier-Bold`...) are
/// available in every PDF reader. Custom fonts are looked up in a directory, by file name prefix.
pub mod fonts;

/// The structured diagnostic events of the pipeline and the sinks receiving them.
pub mod events;

/// The replacement rules and the parser of the `old|new` rule files.
pub mod rules;

/// The options of a run, read from a JSON file.
pub mod configuration;

/// What the replacement methods have in common: the `Method` selector, the read-only pass collecting
/// the occurrences of a page and the choice of the font to draw with.
pub mod strategy;

/// The precise method: the original glyphs are removed from the page content before the replacement is written.
pub mod precise;

/// The overlay method: the original text is covered by a white box and the replacement is written on top.
pub mod overlay;

/// The hybrid method: precise first, overlay when the precise result still contains some of the source texts.
pub mod hybrid;

/// Saving documents without ever leaving a half-written file behind.
pub mod persistence;

/// Checking a produced document against the rules.
pub mod verify;

/// The `Replacer`, tying everything together.
///
/// # Introduction
///
/// A `Replacer` is built from a `ReplacerConfiguration` (where to look for custom fonts) and an
/// `EventSink` (where the progress and diagnostic messages go). Its `replace` method validates the
/// arguments, opens the input document, runs the chosen method and saves the result, returning a
/// `ReplacementReport` with the number of replaced occurrences per page and the elapsed time. The
/// `verify` method reopens a produced document and tells, for every rule, whether it succeeded.
///
/// Errors which concern a single occurrence or a single page are reported to the sink and do not stop
/// the run; errors concerning the whole document are returned.
pub mod pipeline;

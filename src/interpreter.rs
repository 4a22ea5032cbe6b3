use std::collections::HashMap;
use std::rc::Rc;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::content::{decode_stream, object_to_f32, resolve, resolve_dictionary};
use crate::error::{ContextError, ErrorKind};
use crate::geometry::{Matrix, Rect};
use crate::page_font::PageFont;

/// Nesting limit for form XObjects drawing other form XObjects.
const MAXIMUM_FORM_DEPTH: usize = 8;

/// Where a glyph was found in the page content, so that it can be removed later on.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphSource {
    /// Index of the text-showing operation in the page content.
    pub operation: usize,
    /// Index of the string inside the operation (the array element for `TJ`).
    pub element: usize,
    /// Byte offset of the character code inside the string.
    pub byte_start: usize,
    /// Number of bytes of the character code.
    pub byte_len: usize,
    /// The `TJ` adjustment that moves the pen exactly as far as this glyph did.
    pub adjustment: f32,
}

/// A single character drawn on the page, in page space.
#[derive(Clone, Debug)]
pub struct Glyph {
    pub text: String,
    /// The pen position on the baseline before the glyph was drawn.
    pub origin: (f32, f32),
    pub bbox: Rect,
    /// Effective font size, text and current transformation matrices included.
    pub size: f32,
    pub font: Rc<str>,
    /// Fill color packed as `0xRRGGBB`.
    pub color: u32,
    /// `None` for glyphs drawn by form XObjects, which are not part of the page content.
    pub source: Option<GlyphSource>,
}

/// Everything the interpreter reports about the page.
#[derive(Clone, Debug)]
pub enum Mark {
    Glyph(Glyph),
    Image(Rect),
}

#[derive(Clone)]
struct TextState {
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
    font: Option<Rc<PageFont>>,
    size: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
            font: None,
            size: 0.0,
        }
    }
}

#[derive(Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    fill: u32,
    text: TextState,
}

/// Walks content streams and reports every glyph and image they draw.
pub(crate) struct Interpreter<'a> {
    document: &'a Document,
    /// Maps user space to page space (origin at the top-left corner, y downward).
    page_matrix: Matrix,
    fonts: HashMap<ObjectId, Rc<PageFont>>,
    marks: Vec<Mark>,
}

/// Scope of one content stream: the page itself or a form XObject.
struct Scope<'a> {
    resources: Option<&'a Dictionary>,
    /// Whether glyphs of this scope can be traced back to page operations.
    traceable: bool,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(document: &'a Document, media_box: Rect) -> Self {
        Self {
            document,
            page_matrix: Matrix::new(1.0, 0.0, 0.0, -1.0, -media_box.x0, media_box.y1),
            fonts: HashMap::new(),
            marks: Vec::new(),
        }
    }

    /// Run the page operations and return the marks they produce, in content order.
    pub(crate) fn run(
        mut self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
    ) -> Vec<Mark> {
        let scope = Scope {
            resources,
            traceable: true,
            depth: 0,
        };
        self.execute(operations, &scope, GraphicsState::default());
        self.marks
    }

    fn execute(&mut self, operations: &[Operation], scope: &Scope<'a>, initial: GraphicsState) {
        let mut state = initial;
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut text_matrix = Matrix::identity();
        let mut line_matrix = Matrix::identity();

        for (index, operation) in operations.iter().enumerate() {
            let operands = &operation.operands;
            let number = |position: usize| operands.get(position).and_then(object_to_f32);

            match operation.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let Some(matrix) = Matrix::from_operands(operands) {
                        state.ctm = matrix.multiply(&state.ctm);
                    }
                }
                "BT" => {
                    text_matrix = Matrix::identity();
                    line_matrix = Matrix::identity();
                }
                "Tc" => state.text.char_spacing = number(0).unwrap_or(0.0),
                "Tw" => state.text.word_spacing = number(0).unwrap_or(0.0),
                "Tz" => state.text.horizontal_scaling = number(0).unwrap_or(100.0) / 100.0,
                "TL" => state.text.leading = number(0).unwrap_or(0.0),
                "Ts" => state.text.rise = number(0).unwrap_or(0.0),
                "Tf" => {
                    state.text.font = operands
                        .first()
                        .and_then(|name| name.as_name().ok())
                        .and_then(|name| self.font(scope.resources, name));
                    state.text.size = number(1).unwrap_or(0.0);
                }
                "Td" | "TD" => {
                    let (tx, ty) = (number(0).unwrap_or(0.0), number(1).unwrap_or(0.0));
                    if operation.operator == "TD" {
                        state.text.leading = -ty;
                    }
                    line_matrix = Matrix::translation(tx, ty).multiply(&line_matrix);
                    text_matrix = line_matrix;
                }
                "Tm" => {
                    if let Some(matrix) = Matrix::from_operands(operands) {
                        line_matrix = matrix;
                        text_matrix = matrix;
                    }
                }
                "T*" => {
                    line_matrix = Matrix::translation(0.0, -state.text.leading).multiply(&line_matrix);
                    text_matrix = line_matrix;
                }
                "Tj" | "'" | "\"" => {
                    let string_position = match operation.operator.as_str() {
                        "\"" => {
                            state.text.word_spacing = number(0).unwrap_or(state.text.word_spacing);
                            state.text.char_spacing = number(1).unwrap_or(state.text.char_spacing);
                            2
                        }
                        _ => 0,
                    };
                    if operation.operator != "Tj" {
                        line_matrix = Matrix::translation(0.0, -state.text.leading).multiply(&line_matrix);
                        text_matrix = line_matrix;
                    }
                    if let Some(Object::String(bytes, _)) = operands.get(string_position) {
                        self.show_string(bytes, &state, &mut text_matrix, scope, index, string_position);
                    }
                }
                "TJ" => {
                    let Some(Object::Array(elements)) = operands.first() else {
                        continue;
                    };
                    for (element, item) in elements.iter().enumerate() {
                        match item {
                            Object::String(bytes, _) => {
                                self.show_string(bytes, &state, &mut text_matrix, scope, index, element)
                            }
                            other => {
                                if let Some(adjustment) = object_to_f32(other) {
                                    let tx = -adjustment / 1000.0
                                        * state.text.size
                                        * state.text.horizontal_scaling;
                                    text_matrix = Matrix::translation(tx, 0.0).multiply(&text_matrix);
                                }
                            }
                        }
                    }
                }
                "g" => state.fill = pack_gray(number(0).unwrap_or(0.0)),
                "rg" => {
                    state.fill = pack_rgb(
                        number(0).unwrap_or(0.0),
                        number(1).unwrap_or(0.0),
                        number(2).unwrap_or(0.0),
                    )
                }
                "k" => {
                    state.fill = pack_cmyk(
                        number(0).unwrap_or(0.0),
                        number(1).unwrap_or(0.0),
                        number(2).unwrap_or(0.0),
                        number(3).unwrap_or(0.0),
                    )
                }
                "cs" => state.fill = 0,
                "sc" | "scn" => {
                    let components: Vec<f32> = operands.iter().filter_map(object_to_f32).collect();
                    match components[..] {
                        [gray] => state.fill = pack_gray(gray),
                        [red, green, blue] => state.fill = pack_rgb(red, green, blue),
                        [cyan, magenta, yellow, black] => {
                            state.fill = pack_cmyk(cyan, magenta, yellow, black)
                        }
                        _ => {}
                    }
                }
                "Do" => {
                    if let Some(name) = operands.first().and_then(|name| name.as_name().ok()) {
                        self.draw_xobject(name, &state, scope);
                    }
                }
                // Inline images always fill the unit square of the current transformation
                "BI" => self.push_image(&state.ctm),
                _ => {}
            }
        }
    }

    fn show_string(
        &mut self,
        bytes: &[u8],
        state: &GraphicsState,
        text_matrix: &mut Matrix,
        scope: &Scope<'a>,
        operation: usize,
        element: usize,
    ) {
        let Some(font) = state.text.font.clone() else {
            log::debug!("Text shown without a font selected, operation {}", operation);
            return;
        };
        let text = &state.text;

        for code in font.decode(bytes) {
            let rendering_matrix = Matrix::new(
                text.size * text.horizontal_scaling,
                0.0,
                0.0,
                text.size,
                0.0,
                text.rise,
            )
            .multiply(text_matrix)
            .multiply(&state.ctm);
            let to_page = rendering_matrix.multiply(&self.page_matrix);

            let advance = code.width / 1000.0;
            let corners = [
                to_page.transform_point(0.0, font.descent / 1000.0),
                to_page.transform_point(advance, font.descent / 1000.0),
                to_page.transform_point(0.0, font.ascent / 1000.0),
                to_page.transform_point(advance, font.ascent / 1000.0),
            ];
            let spacing = text.char_spacing + if code.is_space { text.word_spacing } else { 0.0 };

            let adjustment = if text.size != 0.0 {
                -(code.width + 1000.0 * spacing / text.size)
            } else {
                0.0
            };
            self.marks.push(Mark::Glyph(Glyph {
                text: code.text.clone(),
                origin: to_page.transform_point(0.0, 0.0),
                bbox: Rect::bounding(&corners),
                size: rendering_matrix.vertical_scale(),
                font: font.name.clone(),
                color: state.fill,
                source: scope.traceable.then(|| GlyphSource {
                    operation,
                    element,
                    byte_start: code.start,
                    byte_len: code.len,
                    adjustment,
                }),
            }));

            let tx = (advance * text.size + spacing) * text.horizontal_scaling;
            *text_matrix = Matrix::translation(tx, 0.0).multiply(text_matrix);
        }
    }

    fn push_image(&mut self, ctm: &Matrix) {
        let to_page = ctm.multiply(&self.page_matrix);
        let corners = [
            to_page.transform_point(0.0, 0.0),
            to_page.transform_point(1.0, 0.0),
            to_page.transform_point(0.0, 1.0),
            to_page.transform_point(1.0, 1.0),
        ];
        self.marks.push(Mark::Image(Rect::bounding(&corners)));
    }

    fn draw_xobject(&mut self, name: &[u8], state: &GraphicsState, scope: &Scope<'a>) {
        let document = self.document;
        let Some(Object::Stream(stream)) = scope
            .resources
            .and_then(|resources| resources.get(b"XObject").ok())
            .and_then(|object| resolve_dictionary(document, object))
            .and_then(|xobjects| xobjects.get(name).ok())
            .and_then(|object| resolve(document, object))
        else {
            log::debug!("XObject {:?} not found in the resources", String::from_utf8_lossy(name));
            return;
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => self.push_image(&state.ctm),
            Ok(b"Form") => {
                if scope.depth >= MAXIMUM_FORM_DEPTH {
                    log::warn!("Form XObjects nested too deeply, skipping {:?}", String::from_utf8_lossy(name));
                    return;
                }
                let content = match decode_stream(stream).and_then(|data| {
                    Content::decode(&data).map_err(|error| {
                        ContextError::with_error(
                            ErrorKind::Strategy,
                            "Failed to decode form content",
                            &error,
                        )
                    })
                }) {
                    Ok(content) => content,
                    Err(error) => {
                        log::warn!("Skipping form XObject {:?}: {}", String::from_utf8_lossy(name), error);
                        return;
                    }
                };

                let mut form_state = state.clone();
                if let Some(matrix) = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|object| resolve(document, object))
                    .and_then(|object| object.as_array().ok())
                    .and_then(|operands| Matrix::from_operands(operands))
                {
                    form_state.ctm = matrix.multiply(&state.ctm);
                }
                let form_scope = Scope {
                    resources: stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|object| resolve_dictionary(document, object))
                        .or(scope.resources),
                    traceable: false,
                    depth: scope.depth + 1,
                };
                self.execute(&content.operations, &form_scope, form_state);
            }
            _ => {}
        }
    }

    fn font(&mut self, resources: Option<&'a Dictionary>, name: &[u8]) -> Option<Rc<PageFont>> {
        let document = self.document;
        let entry = resources?
            .get(b"Font")
            .ok()
            .and_then(|object| resolve_dictionary(document, object))?
            .get(name)
            .ok()?;

        match entry {
            Object::Reference(id) => {
                if let Some(font) = self.fonts.get(id) {
                    return Some(font.clone());
                }
                let dictionary = resolve_dictionary(document, entry)?;
                let font = Rc::new(PageFont::load(document, dictionary));
                self.fonts.insert(*id, font.clone());
                Some(font)
            }
            Object::Dictionary(dictionary) => Some(Rc::new(PageFont::load(document, dictionary))),
            _ => None,
        }
    }
}

fn to_channel(value: f32) -> u32 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u32
}

fn pack_rgb(red: f32, green: f32, blue: f32) -> u32 {
    (to_channel(red) << 16) | (to_channel(green) << 8) | to_channel(blue)
}

fn pack_gray(gray: f32) -> u32 {
    pack_rgb(gray, gray, gray)
}

fn pack_cmyk(cyan: f32, magenta: f32, yellow: f32, black: f32) -> u32 {
    pack_rgb(
        (1.0 - cyan) * (1.0 - black),
        (1.0 - magenta) * (1.0 - black),
        (1.0 - yellow) * (1.0 - black),
    )
}

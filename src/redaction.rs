use std::collections::{BTreeMap, HashMap};

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

use crate::content::object_to_f32;
use crate::geometry::Rect;
use crate::interpreter::{GlyphSource, Mark};

/// The page operations with the covered glyphs taken out.
#[derive(Debug)]
pub(crate) struct Redaction {
    pub(crate) operations: Vec<Operation>,
    /// Glyphs removed from the content.
    pub(crate) removed: usize,
    /// Glyphs inside a region that do not belong to the page content (form XObjects) and were left in place.
    pub(crate) unreachable: usize,
}

/// Byte ranges to cut out of the strings of one operation, per string element.
type Cuts = BTreeMap<usize, Vec<(usize, usize, f32)>>;

/// Remove every glyph whose bounding box center lies in one of the regions.
///
/// The text-showing operations that lose glyphs are rewritten as `TJ` arrays where each removed
/// glyph is replaced by the adjustment moving the pen by the same distance, so the remaining
/// glyphs keep their positions.
pub(crate) fn redact_operations(operations: &[Operation], marks: &[Mark], regions: &[Rect]) -> Redaction {
    let mut cuts: HashMap<usize, Cuts> = HashMap::new();
    let mut removed = 0;
    let mut unreachable = 0;

    for mark in marks {
        let Mark::Glyph(glyph) = mark else {
            continue;
        };
        let (x, y) = glyph.bbox.center();
        if !regions.iter().any(|region| region.contains_point(x, y)) {
            continue;
        }
        match &glyph.source {
            Some(GlyphSource {
                operation,
                element,
                byte_start,
                byte_len,
                adjustment,
            }) => {
                cuts.entry(*operation)
                    .or_default()
                    .entry(*element)
                    .or_default()
                    .push((*byte_start, *byte_len, *adjustment));
                removed += 1;
            }
            None => unreachable += 1,
        }
    }

    let mut redacted = Vec::with_capacity(operations.len());
    for (index, operation) in operations.iter().enumerate() {
        match cuts.get(&index) {
            Some(operation_cuts) => redacted.extend(rewrite_operation(operation, operation_cuts)),
            None => redacted.push(operation.clone()),
        }
    }

    Redaction {
        operations: redacted,
        removed,
        unreachable,
    }
}

fn rewrite_operation(operation: &Operation, cuts: &Cuts) -> Vec<Operation> {
    let operands = &operation.operands;
    let mut rewritten = Vec::new();

    let elements = match operation.operator.as_str() {
        "TJ" => match operands.first() {
            Some(Object::Array(elements)) => elements
                .iter()
                .enumerate()
                .flat_map(|(index, element)| cut_element(element, cuts.get(&index)))
                .collect(),
            _ => return vec![operation.clone()],
        },
        "Tj" => cut_element_at(operands, 0, cuts),
        "'" => {
            rewritten.push(Operation::new("T*", vec![]));
            cut_element_at(operands, 0, cuts)
        }
        "\"" => {
            let (Some(word_spacing), Some(char_spacing)) = (operands.first(), operands.get(1)) else {
                return vec![operation.clone()];
            };
            rewritten.push(Operation::new("Tw", vec![word_spacing.clone()]));
            rewritten.push(Operation::new("Tc", vec![char_spacing.clone()]));
            rewritten.push(Operation::new("T*", vec![]));
            cut_element_at(operands, 2, cuts)
        }
        _ => return vec![operation.clone()],
    };

    rewritten.push(Operation::new("TJ", vec![Object::Array(merge_adjustments(elements))]));
    rewritten
}

fn cut_element_at(operands: &[Object], position: usize, cuts: &Cuts) -> Vec<Object> {
    operands
        .get(position)
        .map(|element| cut_element(element, cuts.get(&position)))
        .unwrap_or_default()
}

/// Split a string around the removed character codes. Other elements pass through.
fn cut_element(element: &Object, cuts: Option<&Vec<(usize, usize, f32)>>) -> Vec<Object> {
    let (Object::String(bytes, format), Some(cuts)) = (element, cuts) else {
        return vec![element.clone()];
    };
    let mut cuts = cuts.clone();
    cuts.sort_by_key(|(start, _, _)| *start);

    let kept = |range: &[u8], format: &StringFormat| Object::String(range.to_vec(), format.clone());
    let mut pieces = Vec::new();
    let mut position = 0;
    for (start, length, adjustment) in cuts {
        if start < position || start + length > bytes.len() {
            continue;
        }
        if start > position {
            pieces.push(kept(&bytes[position..start], format));
        }
        pieces.push(Object::Real(adjustment));
        position = start + length;
    }
    if position < bytes.len() {
        pieces.push(kept(&bytes[position..], format));
    }

    pieces
}

/// Sum consecutive numbers of a `TJ` array.
fn merge_adjustments(elements: Vec<Object>) -> Vec<Object> {
    let mut merged: Vec<Object> = Vec::with_capacity(elements.len());
    for element in elements {
        if let (Some(number), Some(previous)) = (object_to_f32(&element), merged.last_mut()) {
            if let Some(previous_number) = object_to_f32(previous) {
                *previous = Object::Real(previous_number + number);
                continue;
            }
        }
        merged.push(element);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{Glyph, Interpreter};
    use crate::layout::{collapse_whitespace, TextPage};
    use lopdf::content::Content;
    use lopdf::{dictionary, Dictionary, Document};

    fn resources() -> Dictionary {
        dictionary! {
            "Font" => dictionary! {
                "F1" => dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                },
            },
        }
    }

    fn interpret(document: &Document, operations: &[Operation], resources: &Dictionary) -> Vec<Mark> {
        Interpreter::new(document, Rect::new(0.0, 0.0, 612.0, 792.0)).run(operations, Some(resources))
    }

    fn glyph_origins(marks: &[Mark]) -> Vec<(String, (f32, f32))> {
        marks
            .iter()
            .filter_map(|mark| match mark {
                Mark::Glyph(Glyph { text, origin, .. }) => Some((text.clone(), *origin)),
                Mark::Image(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_remaining_glyphs_keep_their_position() {
        let document = Document::with_version("1.5");
        let resources = resources();
        let operations = Content::decode(b"BT /F1 12 Tf 1 Tc 72 700 Td (Say Hello World) Tj ET")
            .unwrap()
            .operations;
        let marks = interpret(&document, &operations, &resources);
        let region = TextPage::from_marks(&marks, None).search("Hello")[0];

        let redaction = redact_operations(&operations, &marks, &[region]);
        assert_eq!(redaction.removed, 5);
        assert_eq!(redaction.unreachable, 0);
        assert_eq!(redaction.operations[4].operator, "TJ");

        let after = interpret(&document, &redaction.operations, &resources);
        assert_eq!(collapse_whitespace(&TextPage::from_marks(&after, None).text()), "Say World");
        let world_origin = |marks: &[Mark]| {
            glyph_origins(marks)
                .into_iter()
                .find(|(text, _)| text == "W")
                .map(|(_, origin)| origin)
                .unwrap()
        };
        assert!((world_origin(&marks).0 - world_origin(&after).0).abs() < 1e-3);
    }

    #[test]
    fn test_quote_operators_keep_their_line_movement() {
        let document = Document::with_version("1.5");
        let resources = resources();
        let operations = Content::decode(b"BT /F1 10 Tf 14 TL 72 700 Td (Top) Tj 2 1 (Gone) \" ET")
            .unwrap()
            .operations;
        let marks = interpret(&document, &operations, &resources);
        let region = TextPage::from_marks(&marks, None).search("Gone")[0];

        let redaction = redact_operations(&operations, &marks, &[region]);
        let operators: Vec<&str> = redaction.operations.iter().map(|operation| operation.operator.as_str()).collect();
        assert_eq!(operators, ["BT", "Tf", "TL", "Td", "Tj", "Tw", "Tc", "T*", "TJ", "ET"]);
        let after = interpret(&document, &redaction.operations, &resources);
        assert_eq!(TextPage::from_marks(&after, None).text(), "Top");
    }

    #[test]
    fn test_tj_arrays_merge_adjustments() {
        let document = Document::with_version("1.5");
        let resources = resources();
        let operations = Content::decode(b"BT /F1 10 Tf 72 700 Td [(AB) -50 (CD)] TJ ET")
            .unwrap()
            .operations;
        let marks = interpret(&document, &operations, &resources);
        let region = TextPage::from_marks(&marks, None).search("BC")[0];

        let redaction = redact_operations(&operations, &marks, &[region]);
        let Some(Object::Array(elements)) = redaction.operations[3].operands.first() else {
            panic!("TJ operand is not an array");
        };
        assert_eq!(elements.len(), 3);
        // Widths of "B" and "C" in Helvetica, plus the original kerning
        let Object::Real(adjustment) = elements[1] else {
            panic!("Expected a merged adjustment");
        };
        assert!((adjustment - -(667.0 + 50.0 + 722.0)).abs() < 1e-3);
    }

    #[test]
    fn test_form_glyphs_are_unreachable() {
        let mut document = Document::with_version("1.5");
        let form = document.add_object(lopdf::Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 200.into(), 100.into()],
            },
            b"BT /F1 12 Tf 72 700 Td (Inside) Tj ET".to_vec(),
        ));
        let mut resources = resources();
        resources.set("XObject", dictionary! { "Fm1" => form });
        let operations = Content::decode(b"/Fm1 Do").unwrap().operations;
        let marks = interpret(&document, &operations, &resources);
        let region = TextPage::from_marks(&marks, None).search("Inside")[0];

        let redaction = redact_operations(&operations, &marks, &[region]);
        assert_eq!(redaction.removed, 0);
        assert_eq!(redaction.unreachable, 6);
        assert_eq!(redaction.operations.len(), 1);
    }
}

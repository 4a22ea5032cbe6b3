use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{ContextError, ErrorKind};
use crate::geometry::Rect;

/// The page size used when neither the page nor its ancestors declare a `MediaBox` (US Letter).
const DEFAULT_MEDIA_BOX: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// How many `/Parent` links or indirect references are followed before giving up on a malformed file.
const MAXIMUM_INDIRECTION_DEPTH: usize = 32;

/// Convert a numeric PDF object (integer or real) into a float.
pub(crate) fn object_to_f32(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(integer) => Some(*integer as f32),
        Object::Real(real) => Some(*real),
        _ => None,
    }
}

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAXIMUM_INDIRECTION_DEPTH {
        match current {
            Object::Reference(id) => current = document.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// Resolve an object into a dictionary, looking through stream dictionaries as well.
pub(crate) fn resolve_dictionary<'a>(
    document: &'a Document,
    object: &'a Object,
) -> Option<&'a Dictionary> {
    match resolve(document, object)? {
        Object::Dictionary(dictionary) => Some(dictionary),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Retrieve the name stored under `key`, resolving indirect references.
pub(crate) fn dictionary_name<'a>(
    document: &'a Document,
    dictionary: &'a Dictionary,
    key: &[u8],
) -> Option<&'a [u8]> {
    match resolve(document, dictionary.get(key).ok()?)? {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

/// Retrieve the number stored under `key`, resolving indirect references.
pub(crate) fn dictionary_number(
    document: &Document,
    dictionary: &Dictionary,
    key: &[u8],
) -> Option<f32> {
    object_to_f32(resolve(document, dictionary.get(key).ok()?)?)
}

pub(crate) fn page_dictionary(
    document: &Document,
    page_id: ObjectId,
) -> Result<&Dictionary, ContextError> {
    document
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|error| {
            ContextError::with_error(
                ErrorKind::Strategy,
                format!("Unable to find the page dictionary {:?}", page_id),
                &error,
            )
        })
}

pub(crate) fn page_dictionary_mut(
    document: &mut Document,
    page_id: ObjectId,
) -> Result<&mut Dictionary, ContextError> {
    document
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|error| {
            ContextError::with_error(
                ErrorKind::Strategy,
                format!("Unable to find the page dictionary {:?}", page_id),
                &error,
            )
        })
}

/// Look up a key in the page dictionary, walking up the page tree
/// (via /Parent) if the key is not found on the page itself.
pub(crate) fn inherited_attribute<'a>(
    document: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = document.get_object(page_id).ok()?;
    for _ in 0..MAXIMUM_INDIRECTION_DEPTH {
        let dictionary = resolve_dictionary(document, current)?;
        if let Ok(value) = dictionary.get(key) {
            return Some(value);
        }
        current = dictionary.get(b"Parent").ok()?;
    }
    None
}

/// The media box of the page in PDF user space (origin bottom-left).
pub fn media_box(document: &Document, page_id: ObjectId) -> Rect {
    let Some(Object::Array(values)) = inherited_attribute(document, page_id, b"MediaBox")
        .and_then(|object| resolve(document, object))
    else {
        return DEFAULT_MEDIA_BOX;
    };
    let numbers: Vec<f32> = values
        .iter()
        .filter_map(|value| resolve(document, value).and_then(object_to_f32))
        .collect();
    match numbers[..] {
        [x0, y0, x1, y1] if x0 != x1 && y0 != y1 => Rect::new(x0, y0, x1, y1),
        _ => DEFAULT_MEDIA_BOX,
    }
}

/// The resources dictionary of the page, inherited from the page tree when needed.
pub(crate) fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    inherited_attribute(document, page_id, b"Resources")
        .and_then(|object| resolve_dictionary(document, object))
}

/// Decode a content stream, decompressing it if a filter is declared.
pub(crate) fn decode_stream(stream: &Stream) -> Result<Vec<u8>, ContextError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content().map_err(|error| {
            ContextError::with_error(
                ErrorKind::Strategy,
                "Failed to decompress content stream",
                &error,
            )
        })
    } else {
        Ok(stream.content.clone())
    }
}

/// The references held by the `Contents` entry of a page, whether it is a single stream or an array.
fn content_references(document: &Document, page_id: ObjectId) -> Result<Vec<Object>, ContextError> {
    let page = page_dictionary(document, page_id)?;
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };
    let references = match contents {
        Object::Reference(id) => match document.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Object::Array(items) => items.clone(),
        _ => Vec::new(),
    };

    Ok(references)
}

/// Concatenate all the decoded content streams of a page.
pub fn page_content(document: &Document, page_id: ObjectId) -> Result<Vec<u8>, ContextError> {
    let mut content = Vec::new();
    for reference in content_references(document, page_id)? {
        let Some(Object::Stream(stream)) = resolve(document, &reference) else {
            log::debug!("Skipping a content entry of page {:?} which is not a stream", page_id);
            continue;
        };
        if !content.is_empty() {
            content.push(b'\n');
        }
        content.extend(decode_stream(stream)?);
    }

    Ok(content)
}

/// Replace the whole content of a page with a single fresh stream. The previous streams
/// become unreferenced and are dropped when the document is compacted.
pub(crate) fn replace_page_content(
    document: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), ContextError> {
    let stream_id = document.add_object(Stream::new(Dictionary::new(), content));
    page_dictionary_mut(document, page_id)?.set("Contents", Object::Reference(stream_id));

    Ok(())
}

/// Isolate the current content of the page in a `q ... Q` pair and append the given operations after it,
/// so that whatever graphics state the original content leaves behind does not leak into them.
pub(crate) fn append_isolated_content(
    document: &mut Document,
    page_id: ObjectId,
    appended: Vec<u8>,
) -> Result<(), ContextError> {
    let mut contents = content_references(document, page_id)?;

    let head_id = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut tail = b"\nQ\n".to_vec();
    tail.extend(appended);
    let tail_id = document.add_object(Stream::new(Dictionary::new(), tail));

    contents.insert(0, Object::Reference(head_id));
    contents.push(Object::Reference(tail_id));
    page_dictionary_mut(document, page_id)?.set("Contents", Object::Array(contents));

    Ok(())
}

/// Make sure the font object is reachable from the page resources and return the name it is
/// registered under. Inherited or shared resources are copied onto the page before being modified.
pub(crate) fn register_page_font(
    document: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<Vec<u8>, ContextError> {
    let mut resources = page_resources(document, page_id)
        .cloned()
        .unwrap_or_default();
    let mut fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|object| resolve_dictionary(document, object))
        .cloned()
        .unwrap_or_default();

    let already_registered = fonts.iter().find_map(|(name, value)| match value {
        Object::Reference(id) if *id == font_id => Some(name.clone()),
        _ => None,
    });
    if let Some(name) = already_registered {
        return Ok(name);
    }

    let mut index = 0;
    let name = loop {
        let candidate = format!("RTF{index}").into_bytes();
        if fonts.get(&candidate).is_err() {
            break candidate;
        }
        index += 1;
    };
    fonts.set(name.clone(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));
    page_dictionary_mut(document, page_id)?.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

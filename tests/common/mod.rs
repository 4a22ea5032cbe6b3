#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document, Object, Stream};
use retextr::page::PdfPage;

/// Build a document with one US Letter page per content string. Every page shares the same resources:
///
/// - `F1`: Helvetica
/// - `F2`: a subset of Helvetica-Bold (`ABCDEF+Helvetica-Bold`)
/// - `F3`: a custom font which is not embedded (`GHIJKL+CustomSans`)
/// - `Fm1`: a form XObject drawing `Stamped` with `F1` at (72, 600)
/// - `Im1`: a one pixel gray image
pub fn document_with_pages(contents: &[&str]) -> Document {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();

    let helvetica_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let helvetica_bold_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "ABCDEF+Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let custom_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => "GHIJKL+CustomSans",
        "Encoding" => "WinAnsiEncoding",
        "FirstChar" => 32,
        "LastChar" => 126,
        "Widths" => (32..=126).map(|_| Object::Integer(550)).collect::<Vec<_>>(),
    });
    let form_id = document.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        },
        b"BT /F1 12 Tf 72 600 Td (Stamped) Tj ET".to_vec(),
    ));
    let image_id = document.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![128],
    ));
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => helvetica_id,
            "F2" => helvetica_bold_id,
            "F3" => custom_id,
        },
        "XObject" => dictionary! {
            "Fm1" => form_id,
            "Im1" => image_id,
        },
    });

    let mut kids = Vec::new();
    for content in contents {
        let content_id = document.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    document
}

/// Save the document under `directory` and return its path.
pub fn save_fixture(mut document: Document, directory: &Path, name: &str) -> PathBuf {
    let path = directory.join(name);
    document.save(&path).unwrap();
    path
}

pub fn load_page(document: &Document, number: u32) -> PdfPage {
    let id = document.get_pages()[&number];
    PdfPage::load(document, number, id).unwrap()
}

/// The text of a page, with every run of whitespace collapsed into a single space.
pub fn page_text(document: &Document, number: u32) -> String {
    let text = load_page(document, number).text_page().text();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The names of the files in the directory, sorted.
pub fn file_names(directory: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(directory)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

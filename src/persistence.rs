use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, StringFormat};
use time::OffsetDateTime;

use crate::error::{ContextError, ErrorKind};

const PRODUCER: &str = "retextr";

/// How much the document is cleaned up before being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Drop unreferenced objects and empty streams, renumber the objects and compress the streams.
    Compact,
    /// Only compress the streams.
    Deflate,
}

/// A file next to its final destination, removed when dropped unless it has been promoted.
#[derive(Debug)]
pub(crate) struct TemporaryFile {
    path: PathBuf,
    armed: bool,
}

impl TemporaryFile {
    /// A unique hidden path in the directory of `target`, so that promoting it is a plain rename.
    pub(crate) fn beside(target: &Path) -> Self {
        let directory = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        Self {
            path: directory.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4())),
            armed: true,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Move the file to `target`, replacing whatever is there.
    pub(crate) fn promote(mut self, target: &Path) -> Result<(), ContextError> {
        std::fs::rename(&self.path, target).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Persistence,
                format!("Unable to move the document into {:?}", target),
                &error,
            )
        })?;
        self.armed = false;

        Ok(())
    }
}

impl Drop for TemporaryFile {
    fn drop(&mut self) {
        if !self.armed || !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed the temporary file {:?}", self.path),
            Err(error) => log::warn!("Unable to remove the temporary file {:?}: {}", self.path, error),
        }
    }
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

/// Record the modification in the document information dictionary, creating it if needed.
fn stamp_document_info(document: &mut Document) {
    let timestamp = to_pdf_timestamp_format(&OffsetDateTime::now_utc());
    let stamp = |info: &mut Dictionary| {
        info.set("ModDate", Object::String(timestamp.clone().into_bytes(), StringFormat::Literal));
        info.set("Producer", Object::String(PRODUCER.as_bytes().to_vec(), StringFormat::Literal));
    };

    let info_id = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    if let Some(info) = info_id.and_then(|id| document.get_object_mut(id).and_then(Object::as_dict_mut).ok()) {
        stamp(info);
        return;
    }

    let mut info = match document.trailer.get(b"Info") {
        Ok(Object::Dictionary(info)) => info.clone(),
        _ => Dictionary::new(),
    };
    stamp(&mut info);
    let info_id = document.add_object(info);
    document.trailer.set("Info", Object::Reference(info_id));
}

fn write_document(document: &mut Document, path: &Path) -> Result<(), ContextError> {
    let file = File::create(path).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Persistence,
            format!("Unable to create the file {:?}", path),
            &error,
        )
    })?;
    let mut writer = BufWriter::new(file);
    document.save_to(&mut writer).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Persistence,
            format!("Error while writing the PDF document to {:?}", path),
            &error,
        )
    })?;
    writer.flush().map_err(|error| {
        ContextError::with_error(
            ErrorKind::Persistence,
            format!("Error while flushing the PDF document to {:?}", path),
            &error,
        )
    })
}

/// Clean up the document according to `mode` and write it to a temporary file beside `target`.
pub(crate) fn write_beside(
    document: &mut Document,
    target: &Path,
    mode: SaveMode,
) -> Result<TemporaryFile, ContextError> {
    stamp_document_info(document);
    match mode {
        SaveMode::Compact => {
            document.prune_objects();
            document.delete_zero_length_streams();
            document.renumber_objects();
            document.compress();
        }
        SaveMode::Deflate => document.compress(),
    }

    let temporary = TemporaryFile::beside(target);
    write_document(document, temporary.path())?;
    Ok(temporary)
}

/// Save the document to `path`. The file at `path` is replaced only once the whole document has been written.
pub fn save_document<P: AsRef<Path>>(document: &mut Document, path: P, mode: SaveMode) -> Result<(), ContextError> {
    let path = path.as_ref();
    write_beside(document, path, mode)?.promote(path)?;
    log::debug!("Saved the document to {:?}", path);

    Ok(())
}

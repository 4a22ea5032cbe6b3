use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};
use crate::fonts::FontAssociation;

/// The options of a replacement run, as read from a JSON file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplacerConfiguration {
    /// Where custom fonts are looked up, created if missing.
    pub fonts_directory: PathBuf,
    /// Font families mapped explicitly to a font file, consulted before the directory.
    pub font_associations: Vec<FontAssociation>,
}

impl Default for ReplacerConfiguration {
    fn default() -> Self {
        Self {
            fonts_directory: PathBuf::from("fonts"),
            font_associations: Vec::new(),
        }
    }
}

impl ReplacerConfiguration {
    pub fn with_fonts_directory<P: Into<PathBuf>>(fonts_directory: P) -> Self {
        Self {
            fonts_directory: fonts_directory.into(),
            ..Self::default()
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ContextError> {
        let path = path.as_ref();
        let configuration_data = std::fs::read_to_string(path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Configuration,
                format!("Unable to read the configuration file {:?}", path),
                &error,
            )
        })?;
        let configuration: ReplacerConfiguration =
            serde_json::from_str(&configuration_data).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    format!("Failed to parse the configuration file {:?}", path),
                    &error,
                )
            })?;

        Ok(configuration)
    }
}

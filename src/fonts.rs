use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};
use crate::metrics::StandardFamily;

/// Font names every PDF reader can draw without an embedded font file.
pub const BUILTIN_FONTS: [&str; 10] = [
    "helv",
    "cour",
    "timo",
    "symb",
    "zadb",
    "times",
    "courier",
    "helvetica",
    "symbol",
    "zapfdingbats",
];

/// Font file extensions, in order of preference.
pub const FONT_EXTENSIONS: [&str; 3] = [".ttf", ".otf", ".ttc"];

/// Whether the font needs a font file to be drawn: its lowercased name, cut at the first `-`,
/// is not one of the builtin fonts.
pub fn is_custom_font(font_name: &str) -> bool {
    let lowercased = font_name.to_lowercase();
    let family = lowercased.split('-').next().unwrap_or(&lowercased);
    !BUILTIN_FONTS.contains(&family)
}

/// One of the standard fonts, referenced by its `BaseFont` name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BuiltinFont {
    base_font: &'static str,
}

impl BuiltinFont {
    pub const HELVETICA: BuiltinFont = BuiltinFont {
        base_font: "Helvetica",
    };

    /// Map a builtin font name (`helv`, `Times-Bold`, `courier-oblique`...) to the matching standard font.
    /// Returns `None` for custom fonts.
    pub fn from_name(font_name: &str) -> Option<Self> {
        if is_custom_font(font_name) {
            return None;
        }
        let lowercased = font_name.to_lowercase();
        let (family, variant) = lowercased.split_once('-').unwrap_or((&lowercased, ""));
        let bold = variant.contains("bold");
        let italic = variant.contains("italic") || variant.contains("oblique");

        let base_font = match (family, bold, italic) {
            ("helv" | "helvetica", false, false) => "Helvetica",
            ("helv" | "helvetica", true, false) => "Helvetica-Bold",
            ("helv" | "helvetica", false, true) => "Helvetica-Oblique",
            ("helv" | "helvetica", true, true) => "Helvetica-BoldOblique",
            ("cour" | "courier", false, false) => "Courier",
            ("cour" | "courier", true, false) => "Courier-Bold",
            ("cour" | "courier", false, true) => "Courier-Oblique",
            ("cour" | "courier", true, true) => "Courier-BoldOblique",
            ("timo" | "times", false, false) => "Times-Roman",
            ("timo" | "times", true, false) => "Times-Bold",
            ("timo" | "times", false, true) => "Times-Italic",
            ("timo" | "times", true, true) => "Times-BoldItalic",
            ("symb" | "symbol", _, _) => "Symbol",
            ("zadb" | "zapfdingbats", _, _) => "ZapfDingbats",
            _ => return None,
        };

        Some(Self { base_font })
    }

    pub fn base_font(&self) -> &'static str {
        self.base_font
    }

    /// Symbolic fonts use their own builtin encoding and must not be given `WinAnsiEncoding`.
    pub(crate) fn is_symbolic(&self) -> bool {
        matches!(
            StandardFamily::from_base_font(self.base_font),
            Some(StandardFamily::Symbol | StandardFamily::ZapfDingbats)
        )
    }
}

/// Something able to map a font name to a local font file.
pub trait FontSource {
    fn resolve(&self, font_name: &str) -> Option<PathBuf>;
}

/// An explicit association between a font family and the file to use for it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FontAssociation {
    pub font_family: String,
    pub font_file_path: PathBuf,
}

/// Looks up font files in a directory by file name prefix.
#[derive(Debug, Clone)]
pub struct FontResolver {
    directory: PathBuf,
    associations: Vec<FontAssociation>,
}

impl FontResolver {
    /// Create a resolver over the given directory, creating the directory if it does not exist.
    pub fn new<P: Into<PathBuf>>(directory: P) -> Result<Self, ContextError> {
        let directory = directory.into();
        if !directory.is_dir() {
            std::fs::create_dir_all(&directory).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Configuration,
                    format!("Unable to create the fonts directory {:?}", directory),
                    &error,
                )
            })?;
            log::info!("Created the fonts directory {:?}", directory);
        }

        Ok(Self {
            directory,
            associations: Vec::new(),
        })
    }

    /// Font families that map to a given file, consulted before the directory.
    pub fn with_associations(mut self, associations: Vec<FontAssociation>) -> Self {
        self.associations = associations;
        self
    }
}

impl FontSource for FontResolver {
    /// The first file whose name starts with `font_name` (ignoring case) and ends with a known font
    /// extension. Extensions are tried in order; file names are sorted so the outcome is deterministic.
    fn resolve(&self, font_name: &str) -> Option<PathBuf> {
        if font_name.is_empty() {
            return None;
        }
        if let Some(association) = self
            .associations
            .iter()
            .find(|association| association.font_family.eq_ignore_ascii_case(font_name))
        {
            return Some(association.font_file_path.clone());
        }

        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(error) => {
                log::warn!("Unable to list the fonts directory {:?}: {}", self.directory, error);
                return None;
            }
        };
        let mut candidates: Vec<(String, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .map(|entry| (entry.file_name().to_string_lossy().to_lowercase(), entry.path()))
            .collect();
        candidates.sort();

        let prefix = font_name.to_lowercase();
        FONT_EXTENSIONS.iter().find_map(|extension| {
            candidates
                .iter()
                .find(|(file_name, _)| file_name.starts_with(&prefix) && file_name.ends_with(extension))
                .map(|(_, path)| path.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_font_detection() {
        assert!(!is_custom_font("Helvetica"));
        assert!(!is_custom_font("Helvetica-Bold"));
        assert!(!is_custom_font("helv"));
        assert!(!is_custom_font("Times-Roman"));
        assert!(is_custom_font("CustomSans"));
        assert!(is_custom_font("ArialMT"));
        assert!(is_custom_font("Times New Roman"));
    }

    #[test]
    fn test_builtin_font_names() {
        let base = |name| BuiltinFont::from_name(name).map(|font| font.base_font());
        assert_eq!(base("helv"), Some("Helvetica"));
        assert_eq!(base("Helvetica-BoldOblique"), Some("Helvetica-BoldOblique"));
        assert_eq!(base("Times-Roman"), Some("Times-Roman"));
        assert_eq!(base("times-bolditalic"), Some("Times-BoldItalic"));
        assert_eq!(base("Courier"), Some("Courier"));
        assert_eq!(base("CustomSans"), None);
        assert!(BuiltinFont::from_name("symb").unwrap().is_symbolic());
    }

    #[test]
    fn test_resolver_prefers_extensions_in_order() {
        let directory = tempfile::tempdir().unwrap();
        for file_name in ["CustomSans.otf", "CustomSans-Regular.ttf", "CustomSans-Bold.ttf", "Other.ttf"] {
            std::fs::write(directory.path().join(file_name), b"").unwrap();
        }
        let resolver = FontResolver::new(directory.path()).unwrap();

        // TrueType wins over OpenType, then the first name in sorted order
        let resolved = resolver.resolve("CustomSans").unwrap();
        assert_eq!(resolved.file_name().unwrap(), "CustomSans-Bold.ttf");
        let resolved = resolver.resolve("customsans-regular").unwrap();
        assert_eq!(resolved.file_name().unwrap(), "CustomSans-Regular.ttf");
        assert_eq!(resolver.resolve("Missing"), None);
        assert_eq!(resolver.resolve(""), None);
    }

    #[test]
    fn test_resolver_creates_the_directory_and_uses_associations() {
        let root = tempfile::tempdir().unwrap();
        let directory = root.path().join("nested").join("fonts");
        let resolver = FontResolver::new(&directory).unwrap().with_associations(vec![FontAssociation {
            font_family: "CustomSerif".into(),
            font_file_path: PathBuf::from("/somewhere/serif.ttf"),
        }]);
        assert!(directory.is_dir());
        assert_eq!(
            resolver.resolve("customserif"),
            Some(PathBuf::from("/somewhere/serif.ttf"))
        );
    }
}

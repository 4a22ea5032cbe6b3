// #![deny(clippy::unwrap_used, clippy::expect_used)]

use serde::{Deserialize, Serialize};

/// The category of a failure.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Unknown replacement method, unreadable input document or unusable fonts directory.
    Configuration,
    /// Malformed rule line, empty rule set or empty search text.
    Rule,
    /// A custom font could not be mapped to a local font file.
    FontResolution,
    /// The replacement text could not be written for a single occurrence.
    Insertion,
    /// A whole replacement pass could not be carried out.
    Strategy,
    /// The produced document could not be written to disk.
    Persistence,
}

/// A struct that represents an error with a context and possibly the propagated source error.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContextError {
    pub kind: ErrorKind,
    pub context: String,
    pub source_error: Option<String>,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_error {
            Some(source_error) => write!(
                formatter,
                "{}: {}",
                self.context,
                minimize_first_letter(source_error.to_string()),
            ),
            None => write!(formatter, "{}", self.context),
        }
    }
}

impl std::error::Error for ContextError {}

impl ContextError {
    /// Create a new `ContextError` of the given kind with the given context.
    pub fn with_context<S: Into<String>>(kind: ErrorKind, context: S) -> ContextError {
        ContextError {
            kind,
            context: context.into(),
            source_error: None,
        }
    }

    /// Create a new `ContextError` of the given kind with the given context and source error.
    pub fn with_error<S: Into<String>>(
        kind: ErrorKind,
        context: S,
        error: &dyn std::error::Error,
    ) -> ContextError {
        ContextError {
            kind,
            context: context.into(),
            source_error: Some(error.to_string()),
        }
    }

    /// Wraps the error into a wider context, keeping the original kind.
    pub fn within<S: Into<String>>(self, context: S) -> ContextError {
        let kind = self.kind;
        ContextError::with_error(kind, context, &self)
    }
}

/// Minimizes the first letter of a string, it is used for standardizing the error message.
fn minimize_first_letter(string: String) -> String {
    let mut characters = string.chars();
    match characters.next() {
        None => String::new(),
        Some(character) => character.to_lowercase().chain(characters).collect(),
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::{ContextError, ErrorKind};

/// Replace every occurrence of `source` with `replacement`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Rule {
    pub source: String,
    pub replacement: String,
}

/// What to do with a line of a rule file that is not of the form `old|new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Warn about the line and go on with the next one.
    SkipMalformed,
    /// Reject the whole file.
    RejectMalformed,
}

/// The replacement rules of a run. Source texts are unique and kept in insertion order.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set from `(source, replacement)` pairs. Texts are normalized to NFC.
    /// A repeated source keeps its first position and takes the last replacement.
    pub fn from_pairs<I, S, R>(pairs: I) -> Result<Self, ContextError>
    where
        I: IntoIterator<Item = (S, R)>,
        S: AsRef<str>,
        R: AsRef<str>,
    {
        let mut rule_set = RuleSet::default();
        for (source, replacement) in pairs {
            rule_set.insert(source.as_ref(), replacement.as_ref())?;
        }
        Ok(rule_set)
    }

    fn insert(&mut self, source: &str, replacement: &str) -> Result<(), ContextError> {
        if source.trim().is_empty() {
            return Err(ContextError::with_context(
                ErrorKind::Rule,
                format!("The rule towards {:?} has an empty source text", replacement),
            ));
        }
        let source: String = source.nfc().collect();
        let replacement: String = replacement.nfc().collect();

        match self.rules.iter_mut().find(|rule| rule.source == source) {
            Some(rule) => {
                log::debug!("The rule for {:?} is defined twice, keeping {:?}", source, replacement);
                rule.replacement = replacement;
            }
            None => self.rules.push(Rule { source, replacement }),
        }
        Ok(())
    }

    /// Parse the `old|new` line format. Empty lines and lines starting with `#` are ignored.
    pub fn parse(text: &str, policy: ParsePolicy) -> Result<Self, ContextError> {
        let mut rule_set = RuleSet::default();
        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split('|').collect();
            let parsed = match parts[..] {
                [source, replacement] => rule_set
                    .insert(source.trim(), replacement.trim())
                    .map_err(|error| error.within(format!("Invalid rule on line {}", line_number))),
                _ => Err(ContextError::with_context(
                    ErrorKind::Rule,
                    format!("Line {} is not of the form `old|new`: {:?}", line_number, line),
                )),
            };
            if let Err(error) = parsed {
                match policy {
                    ParsePolicy::SkipMalformed => log::warn!("Skipping the line {}: {}", line_number, error),
                    ParsePolicy::RejectMalformed => return Err(error),
                }
            }
        }

        Ok(rule_set)
    }

    /// Read a rule file, skipping its malformed lines.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ContextError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Configuration,
                format!("Unable to read the rule file {:?}", path),
                &error,
            )
        })?;
        let rule_set = RuleSet::parse(&text, ParsePolicy::SkipMalformed)?;
        log::info!("Loaded {} rules from {:?}", rule_set.len(), path);

        Ok(rule_set)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The replacement of the given source text.
    pub fn get(&self, source: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.source == source)
            .map(|rule| rule.replacement.as_str())
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

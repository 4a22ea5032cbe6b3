use std::path::Path;

use lopdf::Document;
use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};
use crate::events::EventSink;
use crate::layout::collapse_whitespace;
use crate::page::{load_pages, PdfPage};
use crate::rules::RuleSet;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RuleOutcome {
    /// The source text is gone and the replacement is present.
    Succeeded,
    /// The source text is still present somewhere in the document.
    Failed,
    /// Neither the source nor the replacement text can be found.
    NotApplicable,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleVerification {
    pub source: String,
    pub replacement: String,
    pub outcome: RuleOutcome,
}

/// The outcome of every rule, in rule order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct VerificationReport {
    pub rules: Vec<RuleVerification>,
}

impl VerificationReport {
    /// The source texts of the failed rules.
    pub fn failed(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.outcome == RuleOutcome::Failed)
            .map(|rule| rule.source.as_str())
            .collect()
    }

    fn count(&self, outcome: RuleOutcome) -> usize {
        self.rules.iter().filter(|rule| rule.outcome == outcome).count()
    }
}

fn occurs(pages: &[PdfPage], text: &str) -> bool {
    pages.iter().any(|page| !page.text_page().search(text).is_empty())
}

fn readable_pages(document: &Document, sink: &dyn EventSink) -> Vec<PdfPage> {
    load_pages(document)
        .into_iter()
        .filter_map(|page| {
            page.map_err(|error| sink.warn(&format!("Unable to verify a page: {}", error)))
                .ok()
        })
        .collect()
}

/// Check every rule against the document. Nothing is modified, and failed rules are reported, not raised.
pub fn verify_document(document: &Document, rules: &RuleSet, sink: &dyn EventSink) -> VerificationReport {
    let pages = readable_pages(document, sink);
    let mut report = VerificationReport::default();

    for rule in rules {
        let outcome = if occurs(&pages, &rule.source) {
            sink.warn(&format!("Not replaced (still present): {:?}", rule.source));
            RuleOutcome::Failed
        } else if collapse_whitespace(&rule.replacement).is_empty() || occurs(&pages, &rule.replacement) {
            // A deletion rule succeeds as soon as the source is gone
            sink.info(&format!("Replaced: {:?} -> {:?}", rule.source, rule.replacement));
            RuleOutcome::Succeeded
        } else {
            sink.info(&format!("Not found: {:?}", rule.source));
            RuleOutcome::NotApplicable
        };
        report.rules.push(RuleVerification {
            source: rule.source.clone(),
            replacement: rule.replacement.clone(),
            outcome,
        });
    }

    sink.info(&format!(
        "Verification: {} succeeded, {} failed, {} not applicable",
        report.count(RuleOutcome::Succeeded),
        report.count(RuleOutcome::Failed),
        report.count(RuleOutcome::NotApplicable)
    ));
    report
}

/// Open the document at `path` and verify it.
pub fn verify_file<P: AsRef<Path>>(
    path: P,
    rules: &RuleSet,
    sink: &dyn EventSink,
) -> Result<VerificationReport, ContextError> {
    let path = path.as_ref();
    let document = Document::load(path).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Configuration,
            format!("Unable to open {:?} for verification", path),
            &error,
        )
    })?;

    Ok(verify_document(&document, rules, sink))
}

/// The first source text still found in the document, if any. Existence only, styles are not looked at.
/// A page that cannot be read is an error, since nothing can be said about what it still contains.
pub(crate) fn first_remaining_source(document: &Document, rules: &RuleSet) -> Result<Option<String>, ContextError> {
    let pages = load_pages(document)
        .into_iter()
        .collect::<Result<Vec<PdfPage>, ContextError>>()
        .map_err(|error| error.within("Unable to look for the remaining source texts"))?;

    Ok(rules
        .iter()
        .find(|rule| occurs(&pages, &rule.source))
        .map(|rule| rule.source.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{RecordingSink, Severity};
    use lopdf::{dictionary, Object, Stream};

    fn document_with_streams(streams: Vec<Stream>) -> Document {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let mut kids = Vec::new();
        for stream in streams {
            let content_id = document.add_object(stream);
            let page_id = document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            });
            kids.push(Object::Reference(page_id));
        }
        let count = kids.len() as i64;
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => count }),
        );
        let catalog_id = document.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        document.trailer.set("Root", catalog_id);
        document
    }

    fn plain(content: &str) -> Stream {
        Stream::new(dictionary! {}, content.as_bytes().to_vec())
    }

    /// A stream whose `Filter` entry is neither a name nor an array of names.
    fn undecodable() -> Stream {
        Stream::new(dictionary! { "Filter" => 42 }, b"BT /F1 12 Tf 72 700 Td (Invoice) Tj ET".to_vec())
    }

    #[test]
    fn test_first_remaining_source_follows_rule_order() {
        let document = document_with_streams(vec![
            plain("BT /F1 12 Tf 72 700 Td (Total) Tj ET"),
            plain("BT /F1 12 Tf 72 700 Td (Invoice) Tj ET"),
        ]);
        let rules = RuleSet::from_pairs([("Date", "Datum"), ("Invoice", "Facture"), ("Total", "Montant")]).unwrap();

        assert_eq!(first_remaining_source(&document, &rules).unwrap(), Some("Invoice".to_string()));

        let cleaned = RuleSet::from_pairs([("Date", "Datum")]).unwrap();
        assert_eq!(first_remaining_source(&document, &cleaned).unwrap(), None);
    }

    #[test]
    fn test_unreadable_page_is_never_clean() {
        let document = document_with_streams(vec![plain("BT /F1 12 Tf 72 700 Td (Facture) Tj ET"), undecodable()]);
        let rules = RuleSet::from_pairs([("Invoice", "Facture")]).unwrap();

        assert!(first_remaining_source(&document, &rules).is_err());
    }

    #[test]
    fn test_verification_skips_unreadable_pages_with_a_warning() {
        let document = document_with_streams(vec![plain("BT /F1 12 Tf 72 700 Td (Facture) Tj ET"), undecodable()]);
        let rules = RuleSet::from_pairs([("Invoice", "Facture")]).unwrap();
        let sink = RecordingSink::new();

        let report = verify_document(&document, &rules, &sink);
        assert_eq!(report.rules[0].outcome, RuleOutcome::Succeeded);
        assert_eq!(sink.messages(Severity::Warning).len(), 1);
    }
}

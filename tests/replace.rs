mod common;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lopdf::Document;
use retextr::{
    configuration::ReplacerConfiguration,
    content::page_content,
    error::ErrorKind,
    events::{RecordingSink, Severity},
    fonts::FontSource,
    layout::TextSpan,
    pipeline::Replacer,
    rules::RuleSet,
    strategy::Method,
    verify::{verify_document, RuleOutcome},
};

use common::{document_with_pages, file_names, load_page, page_text, save_fixture};

const HELLO_PAGE: &str = "BT /F1 14 Tf 72 700 Td (Hello) Tj ET";

/// Looks fonts up in a fixed table and remembers every name it was asked for.
#[derive(Clone, Default)]
struct CountingSource {
    lookups: Arc<Mutex<Vec<String>>>,
    files: Vec<(String, PathBuf)>,
}

impl CountingSource {
    fn with_file(font_name: &str, path: PathBuf) -> Self {
        Self {
            files: vec![(font_name.to_string(), path)],
            ..Self::default()
        }
    }

    fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl FontSource for CountingSource {
    fn resolve(&self, font_name: &str) -> Option<PathBuf> {
        self.lookups.lock().unwrap().push(font_name.to_string());
        self.files
            .iter()
            .find(|(name, _)| name == font_name)
            .map(|(_, path)| path.clone())
    }
}

fn replacer(directory: &Path) -> (Replacer, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let configuration = ReplacerConfiguration::with_fonts_directory(directory.join("fonts"));
    (Replacer::with_sink(&configuration, sink.clone()).unwrap(), sink)
}

fn rules(pairs: &[(&str, &str)]) -> RuleSet {
    RuleSet::from_pairs(pairs.iter().copied()).unwrap()
}

fn load(path: &Path) -> Document {
    Document::load(path).unwrap()
}

fn span_containing(document: &Document, text: &str) -> TextSpan {
    let page = load_page(document, 1);
    let span = page
        .text_page()
        .lines()
        .flat_map(|line| line.spans.iter())
        .find(|span| span.text.contains(text))
        .cloned();
    span.unwrap_or_else(|| panic!("No span contains {:?}", text))
}

fn first_page_content(document: &Document) -> String {
    let id = document.get_pages()[&1];
    String::from_utf8_lossy(&page_content(document, id).unwrap()).into_owned()
}

#[test]
fn precise_replacement_keeps_the_style() {
    let directory = tempfile::tempdir().unwrap();
    let input = save_fixture(document_with_pages(&[HELLO_PAGE]), directory.path(), "input.pdf");
    let output = directory.path().join("output.pdf");
    let (replacer, _) = replacer(directory.path());
    let rules = rules(&[("Hello", "Bonjour")]);

    let report = replacer.replace(&input, &output, &rules, Method::Precise).unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.page_counts.get(&1), Some(&1));
    assert!(!report.overlay_fallback);

    let replaced = load(&output);
    assert_eq!(page_text(&replaced, 1), "Bonjour");
    let span = span_containing(&replaced, "Bonjour");
    assert_eq!(&*span.font, "Helvetica");
    assert!((span.size - 14.0).abs() < 1e-3);
    assert!((span.origin.0 - 72.0).abs() < 1e-3);
    assert!((span.origin.1 - 92.0).abs() < 1e-3);

    let verification = replacer.verify(&output, &rules).unwrap();
    assert!(verification.failed().is_empty());
    assert_eq!(verification.rules[0].outcome, RuleOutcome::Succeeded);
    // The input is left untouched
    assert_eq!(page_text(&load(&input), 1), "Hello");
}

#[test]
fn absent_sources_are_not_applicable() {
    let directory = tempfile::tempdir().unwrap();
    let input = save_fixture(document_with_pages(&[HELLO_PAGE]), directory.path(), "input.pdf");
    let output = directory.path().join("output.pdf");
    let (replacer, _) = replacer(directory.path());
    let rules = rules(&[("Goodbye", "Au revoir")]);

    let report = replacer.replace(&input, &output, &rules, Method::Precise).unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(page_text(&load(&output), 1), "Hello");

    let verification = replacer.verify(&output, &rules).unwrap();
    assert_eq!(verification.rules[0].outcome, RuleOutcome::NotApplicable);
}

#[test]
fn overlapping_rules_are_located_on_the_original_page() {
    let directory = tempfile::tempdir().unwrap();
    let content = "BT /F1 12 Tf 72 700 Td (Hello World) Tj ET BT /F1 12 Tf 72 600 Td (World) Tj ET";
    let input = save_fixture(document_with_pages(&[content]), directory.path(), "input.pdf");
    let output = directory.path().join("output.pdf");
    let (replacer, _) = replacer(directory.path());
    let rules = rules(&[("Hello World", "Salut"), ("World", "Monde")]);

    let report = replacer.replace(&input, &output, &rules, Method::Precise).unwrap();
    // One occurrence of the first rule, two of the second one
    assert_eq!(report.total, 3);

    let text = page_text(&load(&output), 1);
    assert!(!text.contains("Hello"), "{}", text);
    assert!(!text.contains("World"), "{}", text);
    assert!(text.contains("Salut"), "{}", text);
    assert!(text.contains("Monde"), "{}", text);
}

#[test]
fn replacements_are_counted_per_page() {
    let directory = tempfile::tempdir().unwrap();
    let document = document_with_pages(&[
        "BT /F1 12 Tf 72 700 Td (Total) Tj 0 -20 Td (Total) Tj ET",
        "BT /F1 12 Tf 72 700 Td (Nothing here) Tj ET",
        "BT /F2 12 Tf 72 700 Td (Total) Tj ET",
    ]);
    let input = save_fixture(document, directory.path(), "input.pdf");
    let output = directory.path().join("output.pdf");
    let (replacer, _) = replacer(directory.path());

    let report = replacer
        .replace(&input, &output, &rules(&[("Total", "Somme")]), Method::Overlay)
        .unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.page_counts.get(&1), Some(&2));
    assert_eq!(report.page_counts.get(&2).copied().unwrap_or(0), 0);
    assert_eq!(report.page_counts.get(&3), Some(&1));
    assert_eq!(report.method, Method::Overlay);
}

#[test]
fn overlay_covers_the_original_text() {
    let directory = tempfile::tempdir().unwrap();
    let input = save_fixture(document_with_pages(&[HELLO_PAGE]), directory.path(), "input.pdf");
    let output = directory.path().join("output.pdf");
    let (replacer, _) = replacer(directory.path());
    let rules = rules(&[("Hello", "Bonjour")]);

    let report = replacer.replace(&input, &output, &rules, Method::Overlay).unwrap();
    assert_eq!(report.total, 1);

    let overlaid = load(&output);
    let content = first_page_content(&overlaid);
    assert!(content.contains("(Hello) Tj"), "{}", content);
    assert!(content.contains("1 1 1 rg"), "{}", content);
    assert!(content.contains(" re"), "{}", content);

    // The original glyphs are hidden, not removed
    let text = page_text(&overlaid, 1);
    assert!(text.contains("Hello") && text.contains("Bonjour"), "{}", text);
    let verification = replacer.verify(&output, &rules).unwrap();
    assert_eq!(verification.failed(), ["Hello"]);
}

#[test]
fn hybrid_keeps_the_precise_result_when_it_is_clean() {
    let directory = tempfile::tempdir().unwrap();
    let input = save_fixture(document_with_pages(&[HELLO_PAGE]), directory.path(), "input.pdf");
    let output = directory.path().join("output.pdf");
    let (replacer, _) = replacer(directory.path());

    let report = replacer
        .replace(&input, &output, &rules(&[("Hello", "Bonjour")]), Method::Hybrid)
        .unwrap();
    assert!(!report.overlay_fallback);
    assert_eq!(report.method, Method::Hybrid);

    let replaced = load(&output);
    assert_eq!(page_text(&replaced, 1), "Bonjour");
    assert!(!first_page_content(&replaced).contains("1 1 1 rg"));
    assert_eq!(file_names(directory.path()), ["fonts", "input.pdf", "output.pdf"]);
}

#[test]
fn hybrid_falls_back_to_overlay_for_form_text() {
    let directory = tempfile::tempdir().unwrap();
    let input = save_fixture(document_with_pages(&["q /Fm1 Do Q"]), directory.path(), "input.pdf");
    let hybrid_output = directory.path().join("hybrid.pdf");
    let overlay_output = directory.path().join("overlay.pdf");
    let (replacer, sink) = replacer(directory.path());
    let rules = rules(&[("Stamped", "Signed")]);

    let report = replacer.replace(&input, &hybrid_output, &rules, Method::Hybrid).unwrap();
    assert!(report.overlay_fallback);
    assert_eq!(report.total, 1);
    let warnings = sink.messages(Severity::Warning);
    assert!(warnings.iter().any(|message| message.contains("overlay")), "{:?}", warnings);

    replacer.replace(&input, &overlay_output, &rules, Method::Overlay).unwrap();
    similar_asserts::assert_eq!(
        first_page_content(&load(&hybrid_output)),
        first_page_content(&load(&overlay_output))
    );
    assert_eq!(
        file_names(directory.path()),
        ["fonts", "hybrid.pdf", "input.pdf", "overlay.pdf"]
    );
}

#[test]
fn invalid_arguments_are_rejected() {
    let directory = tempfile::tempdir().unwrap();
    let input = save_fixture(document_with_pages(&[HELLO_PAGE]), directory.path(), "input.pdf");
    let output = directory.path().join("output.pdf");
    let (replacer, _) = replacer(directory.path());
    let hello = rules(&[("Hello", "Bonjour")]);

    let error = "fastest".parse::<Method>().unwrap_err();
    assert_eq!(error.kind, ErrorKind::Configuration);

    let error = replacer
        .replace(&input, &output, &RuleSet::default(), Method::Precise)
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::Rule);

    let error = replacer
        .replace(directory.path().join("missing.pdf"), &output, &hello, Method::Precise)
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::Configuration);

    let error = replacer.replace(&input, &input, &hello, Method::Overlay).unwrap_err();
    assert_eq!(error.kind, ErrorKind::Configuration);

    assert!(!output.exists());
    assert_eq!(page_text(&load(&input), 1), "Hello");
}

#[test]
fn only_custom_fonts_are_looked_up() {
    let directory = tempfile::tempdir().unwrap();
    let content = "BT /F1 12 Tf 72 700 Td (Hello) Tj ET BT /F3 12 Tf 72 600 Td (Custom) Tj ET";
    let input = save_fixture(document_with_pages(&[content]), directory.path(), "input.pdf");
    let output = directory.path().join("output.pdf");
    let source = CountingSource::default();
    let sink = Arc::new(RecordingSink::new());
    let replacer = Replacer::with_font_source(source.clone(), sink.clone());

    let report = replacer
        .replace(
            &input,
            &output,
            &rules(&[("Hello", "Bonjour"), ("Custom", "Special")]),
            Method::Precise,
        )
        .unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(source.lookups(), ["CustomSans"]);

    // The unresolved font is reported and the standard font is used instead
    let warnings = sink.messages(Severity::Warning);
    assert!(warnings.iter().any(|message| message.contains("CustomSans")), "{:?}", warnings);
    let span = span_containing(&load(&output), "Special");
    assert_eq!(&*span.font, "Helvetica");
}

#[test]
fn resolved_custom_fonts_are_embedded() {
    let directory = tempfile::tempdir().unwrap();
    let content = "BT /F3 12 Tf 72 600 Td (Custom) Tj ET";
    let input = save_fixture(document_with_pages(&[content]), directory.path(), "input.pdf");
    let output = directory.path().join("output.pdf");
    let font_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fonts/DejaVuSans.ttf");
    let source = CountingSource::with_file("CustomSans", font_path);
    let replacer = Replacer::with_font_source(source, Arc::new(RecordingSink::new()));
    let rules = rules(&[("Custom", "Łódź")]);

    replacer.replace(&input, &output, &rules, Method::Precise).unwrap();

    let replaced = load(&output);
    assert_eq!(page_text(&replaced, 1), "Łódź");
    let span = span_containing(&replaced, "Łódź");
    assert!(span.font.contains("DejaVuSans"), "{}", span.font);
    assert!((span.size - 12.0).abs() < 1e-3);
    let verification = replacer.verify(&output, &rules).unwrap();
    assert_eq!(verification.rules[0].outcome, RuleOutcome::Succeeded);
}

#[test]
fn verification_is_repeatable() {
    let directory = tempfile::tempdir().unwrap();
    let content = "BT /F1 12 Tf 72 700 Td (Hello) Tj 0 -20 Td (World) Tj ET";
    let document = document_with_pages(&[content]);
    let rules = rules(&[("Hello", "Bonjour"), ("World", ""), ("Missing", "Absent")]);
    let sink = RecordingSink::new();

    let first = verify_document(&document, &rules, &sink);
    let second = verify_document(&document, &rules, &sink);
    assert_eq!(first, second);
    let outcomes: Vec<_> = first.rules.iter().map(|rule| rule.outcome).collect();
    assert_eq!(
        outcomes,
        [RuleOutcome::Failed, RuleOutcome::Failed, RuleOutcome::NotApplicable]
    );

    let input = save_fixture(document, directory.path(), "input.pdf");
    let output = directory.path().join("output.pdf");
    let (replacer, _) = replacer(directory.path());
    replacer.replace(&input, &output, &rules, Method::Precise).unwrap();
    let outcomes: Vec<_> = replacer
        .verify(&output, &rules)
        .unwrap()
        .rules
        .iter()
        .map(|rule| rule.outcome)
        .collect();
    assert_eq!(
        outcomes,
        [RuleOutcome::Succeeded, RuleOutcome::Succeeded, RuleOutcome::NotApplicable]
    );
}

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lopdf::Document;
use serde::{Deserialize, Serialize};

use crate::configuration::ReplacerConfiguration;
use crate::error::{ContextError, ErrorKind};
use crate::events::{EventSink, LogSink};
use crate::fonts::{FontResolver, FontSource};
use crate::hybrid::apply_hybrid;
use crate::overlay::apply_overlay;
use crate::persistence::{save_document, SaveMode};
use crate::precise::apply_precise;
use crate::rules::RuleSet;
use crate::strategy::{Method, PageCounts};
use crate::verify::{verify_file, VerificationReport};

/// The summary of a replacement run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementReport {
    pub method: Method,
    /// Occurrences processed over the whole document.
    pub total: usize,
    pub page_counts: PageCounts,
    pub elapsed: Duration,
    /// Set when the hybrid method had to use the overlay strategy.
    pub overlay_fallback: bool,
}

/// Opens documents, runs the chosen replacement strategy and saves the result.
pub struct Replacer {
    fonts: Box<dyn FontSource + Send + Sync>,
    sink: Arc<dyn EventSink>,
}

impl Replacer {
    /// A replacer looking up custom fonts as configured and logging through the `log` facade.
    pub fn new(configuration: &ReplacerConfiguration) -> Result<Self, ContextError> {
        Self::with_sink(configuration, Arc::new(LogSink))
    }

    pub fn with_sink(
        configuration: &ReplacerConfiguration,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ContextError> {
        let resolver = FontResolver::new(&configuration.fonts_directory)?
            .with_associations(configuration.font_associations.clone());

        Ok(Self::with_font_source(resolver, sink))
    }

    pub fn with_font_source<F: FontSource + Send + Sync + 'static>(fonts: F, sink: Arc<dyn EventSink>) -> Self {
        Self {
            fonts: Box::new(fonts),
            sink,
        }
    }

    /// Apply the rules to the document at `input` and save the result to `output`.
    ///
    /// The input file is never modified, and `output` is only replaced once the new document has
    /// been written completely.
    pub fn replace<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
        rules: &RuleSet,
        method: Method,
    ) -> Result<ReplacementReport, ContextError> {
        let (input, output) = (input.as_ref(), output.as_ref());
        check_arguments(input, output, rules)?;

        let document = Document::load(input).map_err(|error| {
            ContextError::with_error(
                ErrorKind::Configuration,
                format!("Unable to open the document {:?}", input),
                &error,
            )
        })?;
        self.sink.info(&format!(
            "Opened {:?} ({} pages), replacing with the {} method",
            input,
            document.get_pages().len(),
            method
        ));

        let start = Instant::now();
        let fonts = self.fonts.as_ref();
        let sink = self.sink.as_ref();
        let (page_counts, overlay_fallback) = match method {
            Method::Precise => {
                let (mut replaced, page_counts) = apply_precise(document, rules, fonts, sink)?;
                save_document(&mut replaced, output, SaveMode::Compact)?;
                (page_counts, false)
            }
            Method::Overlay => {
                let (mut replaced, page_counts) = apply_overlay(document, rules, fonts, sink)?;
                save_document(&mut replaced, output, SaveMode::Deflate)?;
                (page_counts, false)
            }
            Method::Hybrid => {
                let outcome = apply_hybrid(document, output, rules, fonts, sink)?;
                (outcome.page_counts, outcome.fell_back)
            }
        };
        let elapsed = start.elapsed();

        let total = page_counts.values().sum();
        self.sink.info(&format!("Total replacements: {}", total));
        self.sink.info(&format!("Elapsed time: {:.2} s", elapsed.as_secs_f32()));
        self.sink.info(&format!("Output file: {:?}", output));

        Ok(ReplacementReport {
            method,
            total,
            page_counts,
            elapsed,
            overlay_fallback,
        })
    }

    /// Check the rules against a produced document.
    pub fn verify<P: AsRef<Path>>(&self, output: P, rules: &RuleSet) -> Result<VerificationReport, ContextError> {
        verify_file(output, rules, self.sink.as_ref())
    }
}

fn check_arguments(input: &Path, output: &Path, rules: &RuleSet) -> Result<(), ContextError> {
    if rules.is_empty() {
        return Err(ContextError::with_context(ErrorKind::Rule, "There are no rules to apply"));
    }
    if !input.is_file() {
        return Err(ContextError::with_context(
            ErrorKind::Configuration,
            format!("The input document {:?} does not exist", input),
        ));
    }
    let same_file = match (input.canonicalize(), output.canonicalize()) {
        (Ok(input), Ok(output)) => input == output,
        _ => false,
    };
    if same_file {
        return Err(ContextError::with_context(
            ErrorKind::Configuration,
            format!("The output {:?} would overwrite the input document", output),
        ));
    }

    Ok(())
}

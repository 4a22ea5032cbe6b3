#![warn(clippy::unwrap_used)]

use std::path::PathBuf;

use clap::Parser;
use retextr::{
    configuration::ReplacerConfiguration, error::ContextError, pipeline::Replacer, rules::RuleSet,
    strategy::Method,
};

#[derive(Parser, Debug)]
#[command(version, about = "Replace text inside a PDF document while keeping its style", long_about = None)]
struct CliArguments {
    #[arg(value_name = "input_pdf", help = "The document to read")]
    input_pdf: PathBuf,
    #[arg(value_name = "output_pdf", help = "Where the modified document is written")]
    output_pdf: PathBuf,
    #[arg(value_name = "rules_file", help = "One `old|new` rule per line, `#` starts a comment")]
    rules_file: PathBuf,
    #[arg(
        short = 'm',
        long = "method",
        default_value = "precise",
        help = "The replacement method: precise, overlay or hybrid"
    )]
    method: String,
    #[arg(long = "verify", help = "Check the output document against the rules once written")]
    verify: bool,
    #[arg(long = "fonts-directory", value_name = "directory", help = "Where custom fonts are looked up")]
    fonts_directory: Option<PathBuf>,
    #[arg(
        short = 'c',
        long = "configuration",
        value_name = "json_file",
        help = "Configuration file, the fonts directory given on the command line takes precedence"
    )]
    configuration_path: Option<PathBuf>,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let arguments = CliArguments::parse();
    log::debug!("{:?}", arguments);

    // Fail on the method before doing any work
    let method: Method = arguments.method.parse()?;
    let mut configuration = match &arguments.configuration_path {
        Some(configuration_path) => ReplacerConfiguration::from_path(configuration_path)?,
        None => ReplacerConfiguration::default(),
    };
    if let Some(fonts_directory) = arguments.fonts_directory {
        configuration.fonts_directory = fonts_directory;
    }

    let rules = RuleSet::from_path(&arguments.rules_file)?;
    let replacer = Replacer::new(&configuration)?;
    let report = replacer.replace(&arguments.input_pdf, &arguments.output_pdf, &rules, method)?;
    if report.overlay_fallback {
        log::info!("The output was produced with the overlay method");
    }

    if arguments.verify {
        let verification = replacer.verify(&arguments.output_pdf, &rules)?;
        let failed = verification.failed();
        if !failed.is_empty() {
            log::warn!("{} rules were not applied: {:?}", failed.len(), failed);
            if method == Method::Precise {
                log::warn!("Try again with `--method overlay` or `--method hybrid`");
            }
        }
    }

    Ok(())
}

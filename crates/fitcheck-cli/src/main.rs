// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fitcheck CLI — validate a scanned fit note image from the command line.
//
// Prints the validation report as JSON on stdout; logs go to stderr. Exits 0
// when the page is recognised (`SUCCESS`) and 1 otherwise.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use fitcheck_core::{ScanConfig, SessionId};
use fitcheck_document::scan::ocr::{OcrConfig, RecognizerFactory, default_model_dir};
use fitcheck_document::{DocumentValidator, ValidationReport};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "fitcheck")]
#[command(
    about = "Check that a scanned image is a readable fit note, whichever way up it was scanned"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one image and print the report as JSON.
    Validate(ValidateArgs),

    /// Print the built-in configuration as JSON, as a starting point for --config.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct ValidateArgs {
    /// Path to the scanned image (JPEG, PNG, etc.).
    #[arg(long)]
    image: PathBuf,

    /// JSON configuration file. Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding text-detection.rten and text-recognition.rten.
    /// Overrides `model_dir` from the configuration.
    #[arg(long)]
    models: Option<PathBuf>,

    /// Session identifier to tag logs and the report with (UUID).
    #[arg(long)]
    session: Option<SessionId>,

    /// Where to write the upright page (JPEG) when validation succeeds.
    #[arg(long)]
    corrected: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("fitcheck: {}", error_message(err.as_ref()));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Validate(args) => run_validate(&args).await,
        Commands::DefaultConfig => {
            println!("{}", serde_json::to_string_pretty(&ScanConfig::default())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// The error and its sources in display form, outermost first.
fn error_message(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.ends_with(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

// ── validate ───────────────────────────────────────────────────────────

async fn run_validate(args: &ValidateArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let models = config.model_dir.clone().unwrap_or_else(default_model_dir);
    tracing::info!("Using OCR models from {}", models.display());

    let factory = recognizer_factory(OcrConfig::from_dir(&models))?;
    let validator = DocumentValidator::new(config, factory)?;

    let data = std::fs::read(&args.image)?;
    tracing::info!("Loaded {} ({} bytes)", args.image.display(), data.len());

    let session = args.session.unwrap_or_default();
    let report = validator.validate_bytes(&data, session).await?;

    write_corrected(&report, args.corrected.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn load_config(args: &ValidateArgs) -> CliResult<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration: {}", path.display());
            ScanConfig::from_json_file(path)?
        }
        None => ScanConfig::default(),
    };
    if let Some(models) = &args.models {
        config.model_dir = Some(models.clone());
    }
    Ok(config)
}

fn write_corrected(report: &ValidationReport, path: Option<&PathBuf>) -> CliResult<()> {
    let Some(path) = path else {
        return Ok(());
    };
    match &report.corrected_image {
        Some(jpeg) => {
            std::fs::write(path, jpeg)?;
            tracing::info!("Corrected image written to {}", path.display());
        }
        None => tracing::warn!("No corrected image: verdict was {}", report.verdict),
    }
    Ok(())
}

#[cfg(feature = "ocr")]
fn recognizer_factory(config: OcrConfig) -> CliResult<Arc<dyn RecognizerFactory>> {
    config.validate()?;
    Ok(Arc::new(fitcheck_document::OcrsFactory::new(config)))
}

#[cfg(not(feature = "ocr"))]
fn recognizer_factory(_config: OcrConfig) -> CliResult<Arc<dyn RecognizerFactory>> {
    Err("fitcheck was built without the `ocr` feature; rebuild with --features ocr".into())
}

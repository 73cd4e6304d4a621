//! NeuroDx: Alzheimer's disease stage classification
//!
//! Command-line entry point. Reads one assessment record as JSON, classifies
//! it with the loaded model and prints the diagnosis as JSON.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use neurodx::adapters::sanitize::SanitizingMakeWriter;
use neurodx::config::{LogMode, Settings};
use neurodx::{Feature, FeatureRecord, InferenceEngine, NeuroDxError};

#[derive(Parser)]
#[command(name = "neurodx", version, about = "Alzheimer's disease stage classification")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one assessment record
    Classify {
        /// Model artifact (file, or directory containing classifier.json)
        #[arg(long)]
        model: Option<PathBuf>,

        /// JSON object of field -> value; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,

        /// Reject artifacts without a signed manifest
        #[arg(long)]
        require_signed: bool,
    },
    /// Print the input schema in canonical order
    Schema,
}

fn init_logging(settings: &Settings) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let (writer, guard) = match settings.log_mode {
        LogMode::File => {
            if let Some(parent) = settings.log_file.parent() {
                // Best-effort: the open below reports the real failure.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&settings.log_file)
                .with_context(|| format!("opening log file {:?}", settings.log_file))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {p:?}")),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

/// Decode a JSON object and validate it. Non-feature keys may hold any type.
fn parse_record(text: &str) -> Result<FeatureRecord> {
    let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)
        .map_err(NeuroDxError::from)
        .context("input must be a JSON object")?;
    Ok(FeatureRecord::validate_json(&raw).map_err(NeuroDxError::from)?)
}

fn classify(settings: &Settings, input: Option<&PathBuf>) -> Result<()> {
    let engine = InferenceEngine::load_with(&settings.model_path, settings)
        .map_err(NeuroDxError::from)?;

    let record = parse_record(&read_input(input)?)?;
    let diagnosis = engine.assess(&record).map_err(NeuroDxError::from)?;

    println!("{}", serde_json::to_string_pretty(&diagnosis)?);
    Ok(())
}

fn schema() -> Result<()> {
    let fields: Vec<serde_json::Value> = Feature::ALL
        .iter()
        .map(|f| {
            serde_json::json!({
                "index": f.index(),
                "name": f.name(),
                "description": f.description(),
                "domain": f.domain(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

/// Exit code per failure family: 2 input, 3 model load, 4 inference.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<NeuroDxError>() {
        Some(NeuroDxError::Validation(_)) | Some(NeuroDxError::Serialization(_)) => 2,
        Some(NeuroDxError::Load(_)) => 3,
        Some(NeuroDxError::Inference(_)) => 4,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut settings = Settings::from_env();

    let _guard = match init_logging(&settings) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(1);
        }
    };
    settings.warn_unrecognized();

    let outcome = match &cli.command {
        Command::Classify {
            model,
            input,
            require_signed,
        } => {
            if let Some(model) = model {
                settings.model_path = model.clone();
            }
            settings.require_signed_model |= *require_signed;
            classify(&settings, input.as_ref())
        }
        Command::Schema => schema(),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = exit_code(&e);
            tracing::error!("Command failed with exit code {code}");
            eprintln!("error: {e:#}");
            ExitCode::from(code)
        }
    }
}

//! JSON:API Codec CLI
//!
//! Command-line interface for checking JSON:API documents and applying sparse fieldsets.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jsonapi_codec::{
    check_document, load_document, DecodingOptions, Fieldsets, GenericDocument, ValidateError,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsonapi-codec")]
#[command(about = "Check JSON:API documents and project sparse fieldsets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a document's envelope and decode every resource in it
    Check {
        /// Document file to check
        document: PathBuf,

        /// Reject documents carrying both `errors` and `data`
        #[arg(long)]
        strict: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Keep only the listed attributes of each resource type
    Project {
        /// Document file to project
        document: PathBuf,

        /// Sparse fieldset as TYPE=key,key (repeatable)
        #[arg(long = "fields", value_name = "TYPE=KEYS", required = true, value_parser = Fieldsets::parse)]
        fields: Vec<Fieldsets>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

/// Log to stderr so stdout stays machine-readable. `RUST_LOG` overrides the `warn` default.
fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    setup_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            document,
            strict,
            json,
        } => run_check(&document, strict, json),

        Commands::Project {
            document,
            fields,
            output,
            pretty,
        } => run_project(&document, fields, output, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_check(path: &Path, strict: bool, json_output: bool) -> Result<(), u8> {
    let document = load_document(path).map_err(|e| {
        report_error(json_output, &format!("loading document: {}", e));
        e.exit_code() as u8
    })?;

    let options = DecodingOptions::new().strict(strict);

    match check_document(&document, &options) {
        Ok(decoded) => {
            let summary = summarize(&decoded);
            if json_output {
                let mut output = serde_json::json!({ "valid": true });
                if let Some(object) = output.as_object_mut() {
                    object.extend(summary);
                }
                println!("{}", output);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Counts reported by `check --json`.
fn summarize(document: &GenericDocument) -> serde_json::Map<String, serde_json::Value> {
    let mut summary = serde_json::Map::new();
    match (document.primary(), document.errors()) {
        (_, Some(errors)) => {
            summary.insert("kind".into(), "errors".into());
            summary.insert("errors".into(), errors.len().into());
        }
        (Some(primary), None) => {
            summary.insert("kind".into(), "data".into());
            summary.insert("resources".into(), primary.len().into());
            let included = document.includes().map_or(0, |includes| includes.len());
            summary.insert("included".into(), included.into());
        }
        (None, None) => {}
    }
    summary
}

fn run_project(
    path: &Path,
    fields: Vec<Fieldsets>,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let document = load_document(path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let decoded = GenericDocument::decode(&document).map_err(|e| {
        eprintln!("Error: {}", e);
        1u8
    })?;

    let mut fieldsets = Fieldsets::new();
    for entry in fields {
        fieldsets.merge(entry);
    }

    let projected = decoded.encode_sparse(&fieldsets).map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&projected)
    } else {
        serde_json::to_string(&projected)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

//! Blueprint Validator CLI
//!
//! Validates CIP-57 blueprints, lists their validators, describes parameters
//! and checks values against slot schemas.

use anyhow::{bail, Context};
use blueprint_schemas::config::BlueprintConfig;
use blueprint_schemas::discovery::discover;
use blueprint_schemas::{
    build_descriptors, load_blueprint, value, BlueprintError, ParsedDocument, StructuralError,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blueprint-validator")]
#[command(about = "Validate CIP-57 Plutus blueprints")]
struct Cli {
    /// Configuration file (layered over blueprint.toml and BLUEPRINT__* variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate blueprint files or every blueprint under a directory
    Validate {
        /// Files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// List validators and their purposes
    Validators {
        /// Blueprint file
        file: PathBuf,
    },

    /// Print the parameter descriptors of a validator
    Params {
        /// Blueprint file
        file: PathBuf,
        /// Validator title without purpose (e.g. "gift_card.gift_card")
        validator: String,
    },

    /// Check a JSON value against a schema of the blueprint
    Check {
        /// Blueprint file
        file: PathBuf,
        /// Reference, definition key or "<validator>.<purpose>.<datum|redeemer>"
        #[arg(short, long)]
        schema: String,
        /// Value as JSON
        #[arg(short, long)]
        value: String,
    },

    /// Generate a JSON report for a blueprint
    Report {
        /// Blueprint file
        file: PathBuf,
        /// Output file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or create configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        #[arg(default_value = "blueprint.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct FileOutcome {
    file: PathBuf,
    ok: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<StructuralError>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let config = BlueprintConfig::load_from(config_path.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Validate { paths, json } => {
            let mut outcomes = Vec::new();
            for root in &paths {
                if !root.exists() {
                    bail!("{} does not exist", root.display());
                }
                for file in discover(root, &config.discovery) {
                    let errors = match std::fs::read_to_string(&file) {
                        Ok(text) => load_blueprint(text.as_str()).err().unwrap_or_default(),
                        Err(e) => bail!("reading {}: {}", file.display(), e),
                    };
                    outcomes.push(FileOutcome {
                        ok: errors.is_empty(),
                        file,
                        errors,
                    });
                }
            }

            if json {
                println!("{}", config.output.format.render(&outcomes)?);
            } else {
                for outcome in &outcomes {
                    if outcome.ok {
                        println!("✅ {}", outcome.file.display());
                    } else {
                        println!("❌ {} - {} problem(s)", outcome.file.display(), outcome.errors.len());
                        for error in &outcome.errors {
                            println!("   └─ {}", error);
                        }
                    }
                }
                if outcomes.is_empty() {
                    println!("No blueprint files found");
                }
            }

            if outcomes.iter().any(|o| !o.ok) {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Validators { file } => {
            let parsed = load(&file)?;
            println!(
                "📦 {} {} (plutus {})",
                parsed.preamble.title,
                parsed.preamble.version,
                parsed.preamble.plutus_version.as_str()
            );
            for (name, validator) in &parsed.validators {
                let purposes: Vec<&str> = validator.purposes.keys().map(|p| p.as_str()).collect();
                println!();
                println!("  {}", name);
                println!("    purposes:   {}", purposes.join(", "));
                println!("    parameters: {}", validator.parameters.len());
                if let Some(hash) = &validator.hash {
                    println!("    hash:       {}", hash);
                }
            }
            Ok(())
        }

        Commands::Params { file, validator } => {
            let parsed = load(&file)?;
            let record = parsed.require_validator(&validator)?;
            let descriptors = build_descriptors(record, &parsed.definitions);
            println!("{}", config.output.format.render(&descriptors)?);
            Ok(())
        }

        Commands::Check { file, schema, value: raw } => {
            let parsed = load(&file)?;
            let node = parsed.select_schema(&schema)?;
            let json: serde_json::Value =
                serde_json::from_str(&raw).context("--value is not valid JSON")?;
            let report = value::check_report(&node, &json, &parsed.definitions, &config.value_check);
            match &report.message {
                None => println!("✅ value matches {}", schema),
                Some(message) => println!("❌ {}", message),
            }
            if !report.ok {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Report { file, output } => {
            let report = build_report(&file)?;
            let report_json = config.output.format.render(&report)?;

            if let Some(path) = output {
                std::fs::write(&path, &report_json)?;
                println!("✅ Report written to {:?}", path);
            } else {
                println!("{}", report_json);
            }
            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigAction::Init { path, force } => {
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                BlueprintConfig::default().save(&path)?;
                println!("✅ Wrote {}", path.display());
                Ok(())
            }
        },
    }
}

/// Load a blueprint, printing every problem when it is invalid
fn load(file: &Path) -> anyhow::Result<ParsedDocument> {
    match blueprint_schemas::load_blueprint_file(file) {
        Ok(parsed) => Ok(parsed),
        Err(BlueprintError::Invalid(errors)) => {
            println!("❌ {} - {} problem(s)", file.display(), errors.len());
            for error in &errors {
                println!("   └─ {}", error);
            }
            std::process::exit(1);
        }
        Err(e) => Err(e).with_context(|| format!("loading {}", file.display())),
    }
}

fn build_report(file: &Path) -> anyhow::Result<serde_json::Value> {
    let text = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;

    let mut report = serde_json::json!({
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "file": file,
    });

    match load_blueprint(text.as_str()) {
        Ok(parsed) => {
            let validators: serde_json::Map<String, serde_json::Value> = parsed
                .validators
                .iter()
                .map(|(name, validator)| {
                    let descriptors = build_descriptors(validator, &parsed.definitions);
                    let entry = serde_json::json!({
                        "purposes": validator.purposes.keys().collect::<Vec<_>>(),
                        "hash": validator.hash,
                        "parameters": descriptors,
                    });
                    (name.clone(), entry)
                })
                .collect();
            report["ok"] = true.into();
            report["preamble"] = serde_json::to_value(&parsed.preamble)?;
            report["definitions"] = parsed.definitions.len().into();
            report["validators"] = validators.into();
        }
        Err(errors) => {
            report["ok"] = false.into();
            report["errors"] = serde_json::to_value(&errors)?;
        }
    }
    Ok(report)
}
